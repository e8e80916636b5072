use std::time::Duration;

use anyhow::{anyhow, Context};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;

/// Thin HTTP client for the Table API with Basic auth applied to every request
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    user: Option<String>,
    password: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, user: Option<String>, password: Option<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            user,
            password,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match &self.user {
            Some(user) => builder.basic_auth(user, self.password.as_deref()),
            None => builder,
        }
    }

    pub async fn get_json(&self, path: &str, query: &[(&str, String)]) -> anyhow::Result<Value> {
        let response = self.request(Method::GET, path).query(query).send().await?;
        json_body(response).await
    }

    pub async fn send_json(&self, method: Method, path: &str, body: &Value) -> anyhow::Result<Value> {
        let response = self.request(method, path).json(body).send().await?;
        json_body(response).await
    }

    /// POST returning the raw body; used for CSV downloads
    pub async fn post_text(&self, path: &str, query: &[(&str, &str)], body: &Value) -> anyhow::Result<String> {
        let response = self.request(Method::POST, path).query(query).json(body).send().await?;
        let response = check_status(response).await?;
        Ok(response.text().await?)
    }

    pub async fn delete(&self, path: &str) -> anyhow::Result<StatusCode> {
        let response = self.request(Method::DELETE, path).send().await?;
        Ok(check_status(response).await?.status())
    }
}

async fn json_body(response: Response) -> anyhow::Result<Value> {
    let response = check_status(response).await?;
    if response.status() == StatusCode::NO_CONTENT {
        return Ok(Value::Null);
    }
    Ok(response.json().await?)
}

/// Turn a non-2xx response into an error carrying the API's message
async fn check_status(response: Response) -> anyhow::Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(anyhow!("{} ({})", error_message(&body), status))
}

/// Join path segments into an absolute path, percent-encoding each one so that
/// `/`, `?` and `#` inside a table name or id stay inside that segment
pub fn api_path(segments: &[&str]) -> anyhow::Result<String> {
    let mut url = url::Url::parse("http://localhost/")?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("cannot build a path on this URL"))?
        .clear()
        .extend(segments);
    Ok(url.path().to_string())
}

pub fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
