use serde_json::Value;

use crate::database::QueryOutput;

/// Render a query result as CSV: one header line with the result columns in
/// driver order, then one line per row in the same column order
pub fn to_csv(output: &QueryOutput) -> String {
    if output.columns.is_empty() {
        return String::new();
    }

    let header = output.columns.iter().map(|c| escape_field(c)).collect::<Vec<_>>();
    let mut csv = header.join(",");
    csv.push('\n');

    for row in &output.rows {
        let fields = output
            .columns
            .iter()
            .map(|col| row.get(col).map(format_value).unwrap_or_default())
            .collect::<Vec<_>>();
        csv.push_str(&fields.join(","));
        csv.push('\n');
    }

    csv
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => escape_field(s),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(_) | Value::Object(_) => escape_field(&value.to_string()),
    }
}

/// Quote fields containing a delimiter, quote or line break; double embedded quotes
fn escape_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
