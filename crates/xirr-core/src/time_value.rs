use crate::types::{CashFlowRecord, Timestamp, USECS_PER_YEAR};

/// Fraction of an Actual/365 year elapsed between `origin` and `at`.
/// Negative when `at` precedes `origin`.
pub fn year_fraction(origin: Timestamp, at: Timestamp) -> f64 {
    at.micros_since(origin) / USECS_PER_YEAR
}

/// Net Present Value of dated cash flows, discounted to the timestamp of the
/// first record (positionally first, not chronologically earliest).
pub fn xnpv(rate: f64, flows: &[CashFlowRecord]) -> f64 {
    npv_and_derivative(rate, flows).0
}

/// NPV and its derivative with respect to `rate`, evaluated in one pass.
///
/// The first record defines time zero, so it contributes its amount to the
/// NPV unchanged and nothing to the derivative. No guarding is done for
/// `rate <= -1`: `powf` yields non-finite values there and callers decide
/// what to do with them.
pub fn npv_and_derivative(rate: f64, flows: &[CashFlowRecord]) -> (f64, f64) {
    let Some((first, rest)) = flows.split_first() else {
        return (0.0, 0.0);
    };

    let r = rate + 1.0;
    let mut npv = first.amount;
    let mut deriv = 0.0;

    for flow in rest {
        let years = year_fraction(first.timestamp, flow.timestamp);
        npv += flow.amount / r.powf(years);
        // d/dr [a * r^(-t)] = -t * a * r^(-t-1)
        deriv -= years * flow.amount / r.powf(years + 1.0);
    }

    (npv, deriv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flow(amount: f64, day: i64) -> CashFlowRecord {
        CashFlowRecord::new(amount, Timestamp::from_days(day))
    }

    #[test]
    fn test_year_fraction_actual_365() {
        let t0 = Timestamp::from_days(0);
        assert_relative_eq!(year_fraction(t0, Timestamp::from_days(365)), 1.0);
        assert_relative_eq!(year_fraction(t0, Timestamp::from_days(73)), 0.2);
        assert_relative_eq!(year_fraction(Timestamp::from_days(365), t0), -1.0);
    }

    #[test]
    fn test_xnpv_zero_rate_is_sum() {
        let flows = vec![flow(-100.0, 0), flow(50.0, 100), flow(75.0, 400)];
        assert_relative_eq!(xnpv(0.0, &flows), 25.0);
    }

    #[test]
    fn test_xnpv_known_answer() {
        // 1100 one year out at 10% is worth exactly 1000 today
        let flows = vec![flow(-1000.0, 0), flow(1100.0, 365)];
        assert!(xnpv(0.10, &flows).abs() < 1e-9);
    }

    #[test]
    fn test_xnpv_empty() {
        assert_eq!(xnpv(0.10, &[]), 0.0);
    }

    #[test]
    fn test_derivative_matches_finite_difference() {
        let flows = vec![
            flow(-1000.0, 0),
            flow(-500.0, 90),
            flow(300.0, 180),
            flow(1400.0, 365),
        ];
        let rate = 0.12;
        let h = 1e-6;
        let (_, deriv) = npv_and_derivative(rate, &flows);
        let numeric = (xnpv(rate + h, &flows) - xnpv(rate - h, &flows)) / (2.0 * h);
        assert_relative_eq!(deriv, numeric, max_relative = 1e-6);
    }

    #[test]
    fn test_origin_is_first_record_not_earliest() {
        // Second record lies before the first; it is compounded, not discounted
        let flows = vec![flow(-1000.0, 365), flow(100.0, 0)];
        assert_relative_eq!(xnpv(0.10, &flows), -1000.0 + 110.0, max_relative = 1e-12);
    }

    #[test]
    fn test_total_loss_rate_is_not_finite() {
        let flows = vec![flow(-1000.0, 0), flow(500.0, 200)];
        let (npv, _) = npv_and_derivative(-1.0, &flows);
        assert!(!npv.is_finite());
    }
}
