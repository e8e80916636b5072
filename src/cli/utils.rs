use std::io::Read;

use anyhow::{anyhow, bail, Context};
use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::database::ColumnSpec;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({ "message": message });
            if let (Some(Value::Object(extra)), Some(target)) = (data, response.as_object_mut()) {
                target.extend(extra);
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Print a JSON value pretty in JSON mode, or compact per line in text mode
pub fn output_value(output_format: &OutputFormat, value: &Value) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => match value {
            Value::Array(items) => {
                for item in items {
                    println!("{}", text_line(item));
                }
            }
            other => println!("{}", text_line(other)),
        },
    }
    Ok(())
}

fn text_line(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Read a JSON object from `--data` or, when absent, from stdin
pub fn read_payload(data: Option<&str>) -> anyhow::Result<Value> {
    let raw = match data {
        Some(d) => d.to_string(),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read JSON from stdin")?;
            buf
        }
    };
    parse_payload(&raw)
}

pub fn parse_payload(raw: &str) -> anyhow::Result<Value> {
    let value: Value = serde_json::from_str(raw.trim()).context("payload is not valid JSON")?;
    if !value.is_object() {
        bail!("payload must be a JSON object of column values");
    }
    Ok(value)
}

/// Parse `name:type[:constraints]`; constraints may themselves contain ':'
pub fn parse_column_spec(raw: &str) -> anyhow::Result<ColumnSpec> {
    let mut parts = raw.splitn(3, ':');
    let name = parts.next().map(str::trim).filter(|s| !s.is_empty());
    let data_type = parts.next().map(str::trim).filter(|s| !s.is_empty());
    let constraints = parts.next().map(str::trim).filter(|s| !s.is_empty());

    match (name, data_type) {
        (Some(name), Some(data_type)) => Ok(ColumnSpec {
            name: name.to_string(),
            data_type: data_type.to_string(),
            constraints: constraints.map(str::to_string),
        }),
        _ => Err(anyhow!("invalid column '{}', expected name:type[:constraints]", raw)),
    }
}
