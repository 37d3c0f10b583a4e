use serde_json::Value;
use std::io;

use super::{format_cell, headers, result_rows};

/// Write one CSV record per group to stdout. Missing rates are empty fields.
pub fn print_csv(value: &Value) {
    let rows = result_rows(value);
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let headers = headers(&rows);
    if headers.is_empty() {
        for row in &rows {
            let _ = wtr.write_record([format_cell(row)]);
        }
    } else {
        let _ = wtr.write_record(&headers);
        for row in &rows {
            let record: Vec<String> = headers
                .iter()
                .map(|h| row.get(h.as_str()).map(format_cell).unwrap_or_default())
                .collect();
            let _ = wtr.write_record(&record);
        }
    }

    let _ = wtr.flush();
}
