pub mod csv_out;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(value) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("JSON serialization error: {}", e),
        },
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The per-group rows of an output envelope. Anything else is treated as a
/// single row.
pub fn result_rows(value: &Value) -> Vec<&Value> {
    match value.get("result").unwrap_or(value) {
        Value::Array(rows) => rows.iter().collect(),
        other => vec![other],
    }
}

/// Column names taken from the first row, in field order.
pub fn headers(rows: &[&Value]) -> Vec<String> {
    rows.first()
        .and_then(|row| row.as_object())
        .map(|obj| obj.keys().cloned().collect())
        .unwrap_or_default()
}

pub fn format_cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_rows_from_envelope() {
        let envelope = json!({"result": [{"group": "a"}, {"group": "b"}], "warnings": []});
        let rows = result_rows(&envelope);
        assert_eq!(rows.len(), 2);
        assert_eq!(headers(&rows), vec!["group".to_string()]);
    }

    #[test]
    fn test_null_cell_is_blank() {
        assert_eq!(format_cell(&Value::Null), "");
        assert_eq!(format_cell(&json!("0.1")), "0.1");
    }
}
