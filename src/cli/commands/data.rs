use reqwest::Method;
use serde_json::Value;

use crate::cli::client::{api_path, ApiClient};
use crate::cli::utils::{output_success, output_value, read_payload};
use crate::cli::OutputFormat;

pub async fn tables(client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    let tables = client.get_json("/api/tables", &[]).await?;
    output_value(&output_format, &tables)
}

pub async fn select(
    client: &ApiClient,
    table: &str,
    page: Option<u32>,
    limit: Option<u32>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let mut query = Vec::new();
    if let Some(page) = page {
        query.push(("page", page.to_string()));
    }
    if let Some(limit) = limit {
        query.push(("limit", limit.to_string()));
    }

    let page = client.get_json(&api_path(&["api", table])?, &query).await?;
    match output_format {
        OutputFormat::Json => output_value(&output_format, &page),
        OutputFormat::Text => {
            println!(
                "page {} of {} ({} rows total)",
                page["currentPage"], page["totalPages"], page["totalItems"]
            );
            output_value(&output_format, page.get("data").unwrap_or(&Value::Null))
        }
    }
}

pub async fn insert(client: &ApiClient, table: &str, data: Option<&str>, output_format: OutputFormat) -> anyhow::Result<()> {
    let payload = read_payload(data)?;
    let row = client.send_json(Method::POST, &api_path(&["api", table])?, &payload).await?;
    output_value(&output_format, &row)
}

pub async fn update(
    client: &ApiClient,
    table: &str,
    id: &str,
    data: Option<&str>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let payload = read_payload(data)?;
    let row = client
        .send_json(Method::PUT, &api_path(&["api", table, id])?, &payload)
        .await?;
    output_value(&output_format, &row)
}

pub async fn delete(client: &ApiClient, table: &str, id: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    client.delete(&api_path(&["api", table, id])?).await?;
    output_success(&output_format, &format!("Deleted {} from {}", id, table), None)
}
