use reqwest::Method;
use serde_json::{json, Value};

use crate::cli::client::ApiClient;
use crate::cli::utils::{output_success, output_value, parse_column_spec};
use crate::cli::OutputFormat;

pub async fn execute(client: &ApiClient, query: &str, csv: bool, output_format: OutputFormat) -> anyhow::Result<()> {
    let body = json!({ "query": query });

    if csv {
        let text = client
            .post_text("/api/sql-playground", &[("download", "csv")], &body)
            .await?;
        print!("{}", text);
        return Ok(());
    }

    let result = client.send_json(Method::POST, "/api/sql-playground", &body).await?;
    match output_format {
        OutputFormat::Json => output_value(&output_format, &result),
        OutputFormat::Text => {
            output_value(&output_format, result.get("rows").unwrap_or(&Value::Null))?;
            println!("({} rows)", result["rowCount"]);
            Ok(())
        }
    }
}

pub async fn create_table(
    client: &ApiClient,
    name: &str,
    columns: &[String],
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let columns = columns
        .iter()
        .map(|c| parse_column_spec(c))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let body = json!({ "tableName": name, "columns": columns });
    let result = client.send_json(Method::POST, "/api/create-table", &body).await?;
    output_success(&output_format, &format!("Created table {}", name), Some(result))
}
