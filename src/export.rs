//! CSV and JSON export of record lists.

use std::mem::take;

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// Render records as CSV: a header from the first record's field names, then
/// one fully quoted row per record. Rows are joined by `\n`.
///
/// Returns `None` for an empty list so callers never write a header-only file.
pub fn to_csv<T: Serialize>(records: &[T]) -> Result<Option<String>> {
    let mut rows: Vec<serde_json::Map<String, Value>> = Vec::with_capacity(records.len());
    for record in records {
        if let Value::Object(map) = serde_json::to_value(record)? {
            rows.push(map);
        }
    }

    let Some(first) = rows.first() else {
        return Ok(None);
    };
    let headers: Vec<String> = first.keys().cloned().collect();

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(headers.join(","));
    for row in &rows {
        let values: Vec<String> = headers
            .iter()
            .map(|header| quote(&cell_text(row.get(header))))
            .collect();
        lines.push(values.join(","));
    }

    Ok(Some(lines.join("\n")))
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Read CSV text back into rows. Handles quoted fields with doubled quotes,
/// embedded separators and line breaks, and CRLF line endings.
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => row.push(take(&mut field)),
            '\r' | '\n' if !in_quotes => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(take(&mut field));
                rows.push(take(&mut row));
            }
            _ => field.push(ch),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows
}

/// Two-space indented JSON, the clipboard form of a record list.
pub fn to_json_pretty<T: Serialize + ?Sized>(records: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// `shipping_data_YYYY-MM-DD.csv` for the given local date.
pub fn default_csv_filename(date: chrono::NaiveDate) -> String {
    format!("shipping_data_{}.csv", date.format("%Y-%m-%d"))
}
