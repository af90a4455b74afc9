//! Dashboard export encoders.
//!
//! CSV output is a single record: nested objects flatten to dotted column
//! names (`system.storage.usedBytes`) and arrays to bracketed indices
//! (`users.usersByRole[0].label`). Object keys come out sorted.

use serde_json::Value;

/// Flatten a JSON value into `(column, cell)` pairs in document order.
pub fn flatten_json(value: &Value) -> Vec<(String, String)> {
    let mut columns = Vec::new();
    flatten_into(value, String::new(), &mut columns);
    columns
}

fn flatten_into(value: &Value, path: String, columns: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                flatten_into(child, child_path, columns);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(child, format!("{}[{}]", path, index), columns);
            }
        }
        scalar => {
            let column = if path.is_empty() {
                "value".to_string()
            } else {
                path
            };
            columns.push((column, scalar_cell(scalar)));
        }
    }
}

fn scalar_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Quote a cell if it contains a comma, quote, CR or LF; inner quotes double.
pub fn escape_csv_cell(cell: &str) -> String {
    if cell.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// Header row plus one value row, each terminated by `\n`.
pub fn to_csv(value: &Value) -> String {
    let columns = flatten_json(value);

    let header = columns
        .iter()
        .map(|(column, _)| escape_csv_cell(column))
        .collect::<Vec<_>>()
        .join(",");
    let row = columns
        .iter()
        .map(|(_, cell)| escape_csv_cell(cell))
        .collect::<Vec<_>>()
        .join(",");

    format!("{}\n{}\n", header, row)
}
