use serde_json::Value;

use super::result_rows;

/// Print just the rate: bare for a single group, `group: rate` otherwise.
pub fn print_minimal(value: &Value) {
    let rows = result_rows(value);
    let single = rows.len() == 1;

    for row in rows {
        let rate = ["xirr", "rate"]
            .iter()
            .find_map(|key| row.get(*key))
            .map(format_minimal)
            .unwrap_or_else(|| format_minimal(row));

        match row.get("group").and_then(Value::as_str) {
            Some(group) if !single => {
                let step = row.get("step").and_then(Value::as_str);
                match step {
                    Some(step) => println!("{} [{}]: {}", group, step, rate),
                    None => println!("{}: {}", group, rate),
                }
            }
            _ => println!("{}", rate),
        }
    }
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
