use clap::Args;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use tracing::debug;

use xirr_core::with_metadata;

use super::{display_rate, load_solver, DisplayRate};
use crate::input::rows::{load_groups, FlowArg};

/// Arguments for XIRR calculation
#[derive(Args)]
pub struct ComputeArgs {
    /// Path to a JSON or CSV file of rows with group, amount and date
    #[arg(long)]
    pub input: Option<String>,

    /// Inline flows for a single group (e.g. "-1000@2020-01-01,1100@2021-01-01")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub flows: Option<Vec<FlowArg>>,

    /// Initial guess for every group, replacing the annualized-return estimate
    #[arg(long, allow_hyphen_values = true)]
    pub guess: Option<f64>,

    /// Path to a JSON solver configuration (max_iterations, tolerance)
    #[arg(long)]
    pub config: Option<String>,

    /// Decimal places for reported rates
    #[arg(long, default_value = "10")]
    pub precision: u32,
}

#[derive(Debug, Serialize)]
struct GroupRow {
    group: String,
    records: usize,
    xirr: Option<DisplayRate>,
    iterations: Option<u32>,
    status: &'static str,
}

pub fn run_compute(args: ComputeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let solver = load_solver(args.config.as_deref())?;
    let grouped = load_groups(args.input.as_deref(), args.flows, args.guess)?;
    debug!(groups = grouped.len(), "Loaded cash-flow groups");

    let mut warnings = Vec::new();
    let rows: Vec<GroupRow> = grouped
        .finalize_all(&solver)?
        .into_iter()
        .map(|result| {
            if let Some(failure) = &result.failure {
                warnings.push(format!("{}: no XIRR ({failure})", result.group));
            }
            GroupRow {
                xirr: result.xirr.map(|r| display_rate(r, args.precision)),
                status: if result.xirr.is_some() { "ok" } else { "no_result" },
                group: result.group,
                records: result.records,
                iterations: result.iterations,
            }
        })
        .collect();

    let config = solver.config();
    let elapsed = start.elapsed().as_micros() as u64;
    let output = with_metadata(
        "XIRR: annualized-return seed refined by Newton-Raphson, Actual/365",
        &serde_json::json!({
            "guess": args.guess,
            "max_iterations": config.max_iterations,
            "tolerance": config.tolerance,
        }),
        warnings,
        elapsed,
        rows,
    );
    Ok(serde_json::to_value(output)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn flows(spec: &[&str]) -> Option<Vec<FlowArg>> {
        Some(spec.iter().map(|s| s.parse().unwrap()).collect())
    }

    fn args(flows: Option<Vec<FlowArg>>, guess: Option<f64>) -> ComputeArgs {
        ComputeArgs {
            input: None,
            flows,
            guess,
            config: None,
            precision: 10,
        }
    }

    fn rate_of(row: &Value) -> f64 {
        match &row["xirr"] {
            Value::String(s) => s.parse().unwrap(),
            other => other.as_f64().unwrap(),
        }
    }

    #[test]
    fn test_compute_single_group_from_flows() {
        let value = run_compute(args(flows(&["-1000@2019-01-01", "1100@2020-01-01"]), None)).unwrap();
        let rows = value["result"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["group"], "default");
        assert_eq!(rows[0]["records"], 2);
        assert_eq!(rows[0]["status"], "ok");
        assert!((rate_of(&rows[0]) - 0.10).abs() < 1e-8);
        assert!(value["warnings"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_compute_no_result_is_null_with_warning() {
        let value = run_compute(args(flows(&["-1000@2019-01-01"]), None)).unwrap();
        let row = &value["result"][0];
        assert_eq!(row["status"], "no_result");
        assert!(row["xirr"].is_null());
        let warnings = value["warnings"].as_array().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].as_str().unwrap().starts_with("default: no XIRR"));
    }

    #[test]
    fn test_compute_rate_beyond_decimal_range_is_reported() {
        let value = run_compute(args(flows(&["-1@2000-01-01", "1e29@2000-12-31"]), None)).unwrap();
        let row = &value["result"][0];
        assert_eq!(row["status"], "ok");
        let rate = row["xirr"].as_f64().unwrap();
        assert!((rate / 1e29 - 1.0).abs() < 1e-6, "got {rate}");
    }

    #[test]
    fn test_compute_guess_applies_to_group() {
        let seeded = run_compute(args(flows(&["-1000@2019-01-01", "1100@2020-01-01"]), None)).unwrap();
        let guessed =
            run_compute(args(flows(&["-1000@2019-01-01", "1100@2020-01-01"]), Some(-0.5))).unwrap();

        assert_eq!(guessed["assumptions"]["guess"], -0.5);
        let seeded_row = &seeded["result"][0];
        let guessed_row = &guessed["result"][0];
        assert!((rate_of(guessed_row) - 0.10).abs() < 1e-8);
        // Starting far from the root costs extra rounds
        assert!(guessed_row["iterations"].as_u64() > seeded_row["iterations"].as_u64());
    }

    #[test]
    fn test_compute_csv_groups_in_first_seen_order() {
        let path = std::env::temp_dir().join(format!("xirr_compute_{}.csv", std::process::id()));
        fs::write(
            &path,
            "group,amount,date\na,-1000,2020-01-01\nb,500,2020-01-01\na,1100,2020-12-31\n",
        )
        .unwrap();

        let result = run_compute(ComputeArgs {
            input: Some(path.to_string_lossy().into_owned()),
            ..args(None, Some(0.2))
        });
        let _ = fs::remove_file(&path);
        let value = result.unwrap();

        let rows = value["result"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["group"], "a");
        assert_eq!(rows[0]["status"], "ok");
        assert!((rate_of(&rows[0]) - 0.10).abs() < 1e-8);
        assert_eq!(rows[1]["group"], "b");
        assert_eq!(rows[1]["status"], "no_result");
        assert!(rows[1]["xirr"].is_null());
        assert_eq!(value["warnings"].as_array().unwrap().len(), 1);
    }
}
