use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::{format_cell, headers, result_rows};

/// One table row per group, then warnings and methodology.
pub fn print_table(value: &Value) {
    let rows = result_rows(value);
    if rows.is_empty() {
        println!("(no groups)");
    } else {
        let headers = headers(&rows);
        let mut builder = Builder::default();
        builder.push_record(&headers);
        for row in &rows {
            builder.push_record(headers.iter().map(|h| {
                row.get(h.as_str())
                    .map(|v| match v {
                        Value::Null => "null".to_string(),
                        v => format_cell(v),
                    })
                    .unwrap_or_default()
            }));
        }
        println!("{}", Table::from(builder));
    }

    if let Some(Value::Array(warnings)) = value.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = value.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}
