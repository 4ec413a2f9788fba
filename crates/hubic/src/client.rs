//! hubiC API client interface

use async_trait::async_trait;
use duck_core::{Error, OAuth2Client, OAuthTokens, Result};
use http::StatusCode;
use jiff::{SignedDuration, Timestamp};
use serde::Deserialize;

/// Storage endpoint and token issued for an OAuth2 access token
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageCredentials {
    pub token: String,
    pub endpoint: String,
    #[serde(default)]
    pub expires: Option<String>,
}

/// The hubiC account API plus its OAuth2 token endpoint
#[async_trait]
pub trait HubicClient: OAuth2Client {
    /// Exchange an access token for storage credentials. An invalid or
    /// expired access token is a login failure.
    async fn storage_credentials(&self, access_token: &str) -> Result<StorageCredentials>;
}

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl TokenResponse {
    pub fn into_tokens(self) -> OAuthTokens {
        let expires_at = self
            .expires_in
            .and_then(|secs| Timestamp::now().checked_add(SignedDuration::from_secs(secs)).ok());
        OAuthTokens::new(self.access_token, self.refresh_token, expires_at)
    }
}

/// OAuth2 error body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthErrorResponse {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Map an OAuth2 error response to the error taxonomy
pub fn map_oauth_error(status: StatusCode, error: &OAuthErrorResponse) -> Error {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        return Error::Connectivity(format!("{} {}", status.as_u16(), error.error));
    }
    let description = error
        .error_description
        .as_deref()
        .filter(|d| !d.is_empty())
        .unwrap_or(error.error.as_str());
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::login_failure("Login failed", description)
        }
        StatusCode::NOT_FOUND => Error::NotFound(description.to_string()),
        _ => Error::General(format!("{} {description}", status.as_u16())),
    }
}
