use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Microseconds in one day.
pub const USECS_PER_DAY: i64 = 86_400_000_000;

/// Actual/365: every year is exactly 365 days regardless of leap years.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Length of an Actual/365 year in timestamp units.
pub const USECS_PER_YEAR: f64 = USECS_PER_DAY as f64 * DAYS_PER_YEAR;

/// Offset between the Unix epoch and the 2000-01-01 timestamp epoch.
const EPOCH_OFFSET_USECS: i64 = 946_684_800 * 1_000_000;

/// A point in time: microseconds since 2000-01-01 00:00:00 UTC.
///
/// The extreme values are reserved as open-ended sentinels and are never
/// accepted as cash-flow dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const NEG_INFINITY: Timestamp = Timestamp(i64::MIN);
    pub const INFINITY: Timestamp = Timestamp(i64::MAX);
    pub const EPOCH: Timestamp = Timestamp(0);

    pub const fn from_micros(micros: i64) -> Self {
        Timestamp(micros)
    }

    pub const fn as_micros(self) -> i64 {
        self.0
    }

    /// Midnight UTC, `days` whole days after the epoch.
    pub const fn from_days(days: i64) -> Self {
        Timestamp(days * USECS_PER_DAY)
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Timestamp(dt.timestamp_micros() - EPOCH_OFFSET_USECS)
    }

    /// Midnight UTC on the given calendar date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::from_datetime(date.and_time(NaiveTime::MIN).and_utc())
    }

    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        if !self.is_finite() {
            return None;
        }
        self.0
            .checked_add(EPOCH_OFFSET_USECS)
            .and_then(DateTime::from_timestamp_micros)
    }

    pub fn is_finite(self) -> bool {
        self != Self::INFINITY && self != Self::NEG_INFINITY
    }

    /// Elapsed time from `origin` to `self`, in timestamp units.
    pub fn micros_since(self, origin: Timestamp) -> f64 {
        (i128::from(self.0) - i128::from(origin.0)) as f64
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::INFINITY => write!(f, "infinity"),
            Self::NEG_INFINITY => write!(f, "-infinity"),
            ts => match ts.to_datetime() {
                Some(dt) => write!(f, "{}", dt.to_rfc3339()),
                None => write!(f, "{}us", ts.0),
            },
        }
    }
}

/// One dated cash flow. Negative amounts are investments, positive amounts
/// are returns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CashFlowRecord {
    pub amount: f64,
    pub timestamp: Timestamp,
}

impl CashFlowRecord {
    pub fn new(amount: f64, timestamp: Timestamp) -> Self {
        Self { amount, timestamp }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "f64".to_string(),
        },
    }
}
