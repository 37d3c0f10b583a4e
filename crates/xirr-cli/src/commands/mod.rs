pub mod compute;
pub mod estimate;

use rust_decimal::Decimal;
use serde::Serialize;
use xirr_core::{SolverConfig, XirrSolver};

use crate::input;

/// Solver from `--config`, or the default configuration.
pub fn load_solver(config: Option<&str>) -> Result<XirrSolver, Box<dyn std::error::Error>> {
    let config: SolverConfig = match config {
        Some(path) => input::file::read_json(path)?,
        None => SolverConfig::default(),
    };
    Ok(XirrSolver::new(config)?)
}

/// A rate as reported: rounded when it fits a `Decimal`, the raw float
/// otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DisplayRate {
    Rounded(Decimal),
    Raw(f64),
}

/// Round a rate for display. Non-finite values have no decimal form.
pub fn round_rate(rate: f64, precision: u32) -> Option<Decimal> {
    Decimal::from_f64_retain(rate).map(|d| d.round_dp(precision))
}

/// Rounded rate, falling back to the unrounded value for rates outside the
/// `Decimal` range so a real result is never shown as missing.
pub fn display_rate(rate: f64, precision: u32) -> DisplayRate {
    round_rate(rate, precision).map_or(DisplayRate::Raw(rate), DisplayRate::Rounded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_round_rate() {
        assert_eq!(
            round_rate(0.123456789, 4),
            Some(Decimal::from_str("0.1235").unwrap())
        );
        assert_eq!(round_rate(f64::NAN, 4), None);
    }

    #[test]
    fn test_display_rate_out_of_decimal_range_keeps_value() {
        assert_eq!(display_rate(1e29, 10), DisplayRate::Raw(1e29));
        assert_eq!(
            display_rate(0.123456789, 4),
            DisplayRate::Rounded(Decimal::from_str("0.1235").unwrap())
        );
        let json = serde_json::to_value(display_rate(1e29, 10)).unwrap();
        assert_eq!(json.as_f64(), Some(1e29));
    }

    #[test]
    fn test_default_solver() {
        let solver = load_solver(None).unwrap();
        assert_eq!(*solver.config(), SolverConfig::default());
    }
}
