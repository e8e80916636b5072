use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};

use crate::config::SecurityConfig;
use crate::error::ApiError;
use crate::server::AppState;

/// Authenticated operator, injected into request extensions by [`basic_auth_middleware`]
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub username: String,
}

/// Operator credentials, held as SHA-256 digests and compared without early exit
#[derive(Clone)]
pub struct Credentials {
    username: [u8; 32],
    password: [u8; 32],
}

impl Credentials {
    /// `None` unless both username and password are configured and non-empty
    pub fn from_config(security: &SecurityConfig) -> Option<Self> {
        let username = security.auth_username.as_deref().filter(|u| !u.is_empty())?;
        let password = security.auth_password.as_deref().filter(|p| !p.is_empty())?;
        Some(Self {
            username: digest(username),
            password: digest(password),
        })
    }

    pub fn verify(&self, username: &str, password: &str) -> bool {
        let user_ok = digests_equal(&self.username, &digest(username));
        let pass_ok = digests_equal(&self.password, &digest(password));
        user_ok & pass_ok
    }
}

fn digest(s: &str) -> [u8; 32] {
    Sha256::digest(s.as_bytes()).into()
}

fn digests_equal(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// HTTP Basic authentication gate for `/api/*`
pub async fn basic_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(credentials) = state.credentials.as_ref() else {
        tracing::error!("Rejecting API request: AUTH_USERNAME/AUTH_PASSWORD not configured");
        return challenge("Authentication is not configured on this server");
    };

    let (username, password) = match extract_basic_credentials(&headers) {
        Ok(pair) => pair,
        Err(msg) => return challenge(msg),
    };

    if !credentials.verify(&username, &password) {
        tracing::warn!("Failed login attempt for user '{}'", username);
        return challenge("Invalid username or password");
    }

    request.extensions_mut().insert(AuthUser { username });
    next.run(request).await
}

/// 401 with a `WWW-Authenticate` challenge so browsers prompt for credentials
fn challenge(message: impl Into<String>) -> Response {
    let mut response = ApiError::unauthorized(message).into_response();
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"table-api\", charset=\"UTF-8\""),
    );
    response
}

/// Extract `username:password` from a `Basic` Authorization header
fn extract_basic_credentials(headers: &HeaderMap) -> Result<(String, String), &'static str> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or("Missing Authorization header")?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format")?;

    let encoded = auth_str
        .strip_prefix("Basic ")
        .ok_or("Authorization header must use Basic format")?;

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| "Invalid Basic credentials encoding")?;
    let decoded = String::from_utf8(decoded).map_err(|_| "Invalid Basic credentials encoding")?;

    let (username, password) = decoded
        .split_once(':')
        .ok_or("Basic credentials must be username:password")?;

    Ok((username.to_string(), password.to_string()))
}
