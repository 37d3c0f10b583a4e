use crate::types::{CashFlowRecord, USECS_PER_YEAR};

/// Closed-form annualized return used to seed Newton's method.
///
/// Treats the flows as one investment (`debit`, the sum of outflows) growing
/// into `debit + sum(amounts)` over the span between the earliest and latest
/// timestamps: `(1 + end_value / debit) ^ (year / span) - 1`. When the
/// positionally first flow is an inflow the exponent is negated, which
/// handles sequences written from the borrower's side.
///
/// Meaningful for two or more flows. Degenerate inputs are not rejected: no
/// outflows gives `-1` or NaN, a zero span gives an infinite exponent. Newton's
/// method then fails to converge and reports no result.
pub fn annualized_return_estimate(flows: &[CashFlowRecord]) -> f64 {
    let (Some(first), Some(last)) = (flows.first(), flows.last()) else {
        return f64::NAN;
    };

    let mut end_value = 0.0;
    let mut debit = 0.0;
    // Seeded positionally, correct as-is for sorted input
    let mut min_time = first.timestamp;
    let mut max_time = last.timestamp;

    for flow in flows {
        end_value += flow.amount;
        if flow.amount < 0.0 {
            debit -= flow.amount;
        }
        if flow.timestamp < min_time {
            min_time = flow.timestamp;
        }
        if flow.timestamp > max_time {
            max_time = flow.timestamp;
        }
    }

    let mut power = USECS_PER_YEAR / max_time.micros_since(min_time);
    if first.amount > 0.0 {
        power = -power;
    }

    (1.0 + end_value / debit).powf(power) - 1.0
}
