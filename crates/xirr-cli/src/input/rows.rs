use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::str::FromStr;

use xirr_core::aggregate::GroupedXirr;
use xirr_core::Timestamp;

use super::file::{is_csv, read_csv, read_json};
use super::stdin::read_stdin;

/// Group used for rows without one and for `--flows`.
pub const DEFAULT_GROUP: &str = "default";

/// One input row. Amount and date are optional here so that a missing value
/// reaches the aggregate as a null and is rejected there.
#[derive(Debug, Clone, Deserialize)]
pub struct CashFlowRow {
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default, alias = "timestamp")]
    pub date: Option<String>,
}

impl CashFlowRow {
    pub fn group(&self) -> &str {
        self.group
            .as_deref()
            .filter(|g| !g.is_empty())
            .unwrap_or(DEFAULT_GROUP)
    }

    pub fn timestamp(&self) -> Result<Option<Timestamp>, String> {
        self.date
            .as_deref()
            .filter(|d| !d.is_empty())
            .map(parse_when)
            .transpose()
    }
}

/// `YYYY-MM-DD` (midnight UTC), `YYYY-MM-DD HH:MM:SS` (UTC) or RFC 3339.
pub fn parse_when(s: &str) -> Result<Timestamp, String> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(Timestamp::from_date(date));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(Timestamp::from_datetime(dt.with_timezone(&Utc)));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(Timestamp::from_datetime(naive.and_utc()));
    }
    Err(format!(
        "unrecognised date '{s}': expected YYYY-MM-DD or RFC 3339"
    ))
}

/// An inline `amount@date` flow, e.g. `-1000@2020-01-01`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowArg {
    pub amount: f64,
    pub timestamp: Timestamp,
}

impl FromStr for FlowArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (amount, when) = s
            .split_once('@')
            .ok_or_else(|| format!("expected AMOUNT@DATE, got '{s}'"))?;
        let amount = amount
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid amount '{amount}': {e}"))?;
        Ok(FlowArg {
            amount,
            timestamp: parse_when(when)?,
        })
    }
}

/// Feed every input row, in order, into one accumulator per group.
///
/// Precedence: `--flows`, then `--input`, then piped JSON.
pub fn load_groups(
    input: Option<&str>,
    flows: Option<Vec<FlowArg>>,
    guess: Option<f64>,
) -> Result<GroupedXirr<String>, Box<dyn std::error::Error>> {
    let mut grouped = match guess {
        Some(guess) => GroupedXirr::with_guess(guess)?,
        None => GroupedXirr::new(),
    };

    if let Some(flows) = flows {
        for flow in flows {
            grouped.feed(
                DEFAULT_GROUP.to_string(),
                Some(flow.amount),
                Some(flow.timestamp),
            )?;
        }
        return Ok(grouped);
    }

    let rows: Vec<CashFlowRow> = if let Some(path) = input {
        if is_csv(path) {
            read_csv(path)?
        } else {
            read_json(path)?
        }
    } else if let Some(rows) = read_stdin()? {
        rows
    } else {
        return Err("--flows, --input <file> or piped JSON rows required".into());
    };

    feed_rows(&mut grouped, &rows)?;
    Ok(grouped)
}

pub fn feed_rows(
    grouped: &mut GroupedXirr<String>,
    rows: &[CashFlowRow],
) -> Result<(), Box<dyn std::error::Error>> {
    for (i, row) in rows.iter().enumerate() {
        let timestamp = row.timestamp().map_err(|e| format!("row {}: {e}", i + 1))?;
        grouped
            .feed(row.group().to_string(), row.amount, timestamp)
            .map_err(|e| format!("row {}: {e}", i + 1))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_plain_date() {
        let ts = parse_when("2000-01-02").unwrap();
        assert_eq!(ts, Timestamp::from_days(1));
    }

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let ts = parse_when("2000-01-01T01:00:00+01:00").unwrap();
        assert_eq!(ts, Timestamp::EPOCH);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_when("next tuesday").is_err());
    }

    #[test]
    fn test_flow_arg() {
        let flow: FlowArg = "-1000@2000-01-01".parse().unwrap();
        assert_eq!(
            flow,
            FlowArg {
                amount: -1000.0,
                timestamp: Timestamp::EPOCH
            }
        );
        assert!("1000".parse::<FlowArg>().is_err());
        assert!("abc@2000-01-01".parse::<FlowArg>().is_err());
    }

    #[test]
    fn test_json_rows_grouped_in_order() {
        let rows: Vec<CashFlowRow> = serde_json::from_str(
            r#"[
                {"group": "a", "amount": -1000, "date": "2020-01-01"},
                {"amount": -50, "timestamp": "2020-01-01"},
                {"group": "a", "amount": 1100, "date": "2020-12-31"}
            ]"#,
        )
        .unwrap();
        let mut grouped = GroupedXirr::new();
        feed_rows(&mut grouped, &rows).unwrap();

        let keys: Vec<&str> = grouped.groups().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", DEFAULT_GROUP]);
        assert_eq!(grouped.get(&"a".to_string()).unwrap().len(), 2);
    }

    #[test]
    fn test_missing_amount_aborts() {
        let rows: Vec<CashFlowRow> =
            serde_json::from_str(r#"[{"group": "a", "date": "2020-01-01"}]"#).unwrap();
        let mut grouped = GroupedXirr::new();
        let err = feed_rows(&mut grouped, &rows).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }
}
