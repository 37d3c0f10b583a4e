use clap::Args;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use xirr_core::estimator::annualized_return_estimate;
use xirr_core::with_metadata;

use super::{display_rate, load_solver, DisplayRate};
use crate::input::rows::{load_groups, FlowArg};

/// Arguments for the seed estimate and Newton trace
#[derive(Args)]
pub struct EstimateArgs {
    /// Path to a JSON or CSV file of rows with group, amount and date
    #[arg(long)]
    pub input: Option<String>,

    /// Inline flows for a single group (e.g. "-1000@2020-01-01,1100@2021-01-01")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub flows: Option<Vec<FlowArg>>,

    /// Path to a JSON solver configuration (max_iterations, tolerance)
    #[arg(long)]
    pub config: Option<String>,

    /// Decimal places for reported rates
    #[arg(long, default_value = "10")]
    pub precision: u32,
}

#[derive(Debug, Serialize)]
struct TraceRow {
    group: String,
    step: String,
    rate: DisplayRate,
    epsilon: Option<f64>,
}

/// Annualized-return seed per group followed by every Newton round.
pub fn run_estimate(args: EstimateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let base = load_solver(args.config.as_deref())?;
    let grouped = load_groups(args.input.as_deref(), args.flows, None)?;

    let mut warnings = Vec::new();
    let mut rows = Vec::new();

    for (group, state) in grouped.groups() {
        let flows = state.finalize();
        let seed = annualized_return_estimate(flows);
        rows.push(TraceRow {
            group: group.clone(),
            step: "seed".into(),
            rate: display_rate(seed, args.precision),
            epsilon: None,
        });

        let rounds = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&rounds);
        let solver = base.clone().with_observer(move |round: u32, rate: f64, eps: f64| {
            if let Ok(mut rounds) = sink.lock() {
                rounds.push((round, rate, eps));
            }
        });

        if let Err(failure) = solver.solve(flows, None) {
            warnings.push(format!("{group}: no XIRR ({failure})"));
        }

        let rounds = rounds.lock().map_err(|_| "iteration trace poisoned")?;
        for &(round, rate, eps) in rounds.iter() {
            rows.push(TraceRow {
                group: group.clone(),
                step: (round + 1).to_string(),
                rate: display_rate(rate, args.precision),
                epsilon: eps.is_finite().then_some(eps),
            });
        }
    }

    let elapsed = start.elapsed().as_micros() as u64;
    let output = with_metadata(
        "Annualized return (1 + end/debit)^(year/span) - 1, then Newton-Raphson",
        &serde_json::json!({ "max_iterations": base.config().max_iterations }),
        warnings,
        elapsed,
        rows,
    );
    Ok(serde_json::to_value(output)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(spec: &[&str]) -> EstimateArgs {
        EstimateArgs {
            input: None,
            flows: Some(spec.iter().map(|s| s.parse().unwrap()).collect()),
            config: None,
            precision: 10,
        }
    }

    fn rate_of(row: &Value) -> f64 {
        match &row["rate"] {
            Value::String(s) => s.parse().unwrap(),
            other => other.as_f64().unwrap_or(f64::NAN),
        }
    }

    #[test]
    fn test_estimate_seed_then_rounds() {
        let value = run_estimate(args(&["-1000@2019-01-01", "1100@2020-01-01"])).unwrap();
        let rows = value["result"].as_array().unwrap();

        assert_eq!(rows[0]["step"], "seed");
        assert!(rows[0]["epsilon"].is_null());
        assert!((rate_of(&rows[0]) - 0.10).abs() < 1e-8);

        assert!(rows.len() >= 2);
        for (i, row) in rows.iter().enumerate().skip(1) {
            assert_eq!(row["group"], "default");
            assert_eq!(row["step"], i.to_string());
            assert!(row["epsilon"].is_number());
        }
        assert!((rate_of(rows.last().unwrap()) - 0.10).abs() < 1e-8);
        assert!(value["warnings"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_estimate_trace_matches_solver_rounds() {
        let value = run_estimate(args(&[
            "-1000@2019-01-01",
            "-500@2019-04-01",
            "300@2019-06-30",
            "1400@2020-01-01",
        ]))
        .unwrap();
        let rows = value["result"].as_array().unwrap();

        let flows: Vec<_> = args(&[
            "-1000@2019-01-01",
            "-500@2019-04-01",
            "300@2019-06-30",
            "1400@2020-01-01",
        ])
        .flows
        .unwrap()
        .into_iter()
        .map(|f| xirr_core::CashFlowRecord::new(f.amount, f.timestamp))
        .collect();
        let solution = xirr_core::XirrSolver::default().solve(&flows, None).unwrap();

        assert_eq!(rows.len() as u32, solution.iterations + 1);
    }

    #[test]
    fn test_estimate_no_result_warns() {
        let value = run_estimate(args(&["100@2019-01-01", "200@2020-01-01"])).unwrap();
        let rows = value["result"].as_array().unwrap();

        assert_eq!(rows[0]["step"], "seed");
        // The diverging round is still traced
        assert_eq!(rows.len(), 2);
        assert!(rows[1]["rate"].is_null());
        let warnings = value["warnings"].as_array().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].as_str().unwrap().contains("no XIRR"));
    }
}
