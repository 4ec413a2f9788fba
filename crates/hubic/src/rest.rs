//! hubiC client over HTTPS

use async_trait::async_trait;
use duck_core::{Error, Host, OAuth2Client, OAuthConfig, OAuthTokens, Result, RetryPolicy};
use http::StatusCode;
use serde::de::DeserializeOwned;

use crate::client::{
    HubicClient, OAuthErrorResponse, StorageCredentials, TokenResponse, map_oauth_error,
};

/// hubiC client using reqwest
pub struct HttpHubicClient {
    http: reqwest::Client,
    credentials_url: url::Url,
    oauth: OAuthConfig,
    retry: RetryPolicy,
}

impl HttpHubicClient {
    /// Client for `host`. The protocol must carry an OAuth2 registration.
    pub fn new(host: &Host, retry: RetryPolicy) -> Result<Self> {
        let oauth = host
            .protocol
            .oauth
            .clone()
            .ok_or_else(|| Error::Config(format!("{} has no OAuth2 configuration", host.protocol.description)))?;
        let credentials_url = host
            .url()?
            .join("1.0/account/credentials")
            .map_err(|e| Error::Config(format!("Invalid credentials URL: {e}")))?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("duck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Connectivity(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            credentials_url,
            oauth,
            retry,
        })
    }

    /// Authorization URL the user opens to obtain a code
    pub fn authorization_url(&self) -> Result<url::Url> {
        let mut url = url::Url::parse(&self.oauth.authorization_url)
            .map_err(|e| Error::Config(format!("Invalid authorization URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.oauth.client_id)
            .append_pair("redirect_uri", &self.oauth.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.oauth.scopes.join(","));
        Ok(url)
    }

    async fn token(&self, form: &[(&str, &str)]) -> Result<OAuthTokens> {
        let http = &self.http;
        let oauth = &self.oauth;
        let response: TokenResponse = self
            .retry
            .run("oauth_token", || async move {
                let response = http
                    .post(&oauth.token_url)
                    .basic_auth(&oauth.client_id, Some(&oauth.client_secret))
                    .form(form)
                    .send()
                    .await
                    .map_err(transport_error)?;
                parse_response(response).await
            })
            .await?;
        Ok(response.into_tokens())
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Connectivity(format!("Request timeout: {e}"))
    } else {
        Error::Connectivity(e.to_string())
    }
}

async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status: StatusCode = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| Error::General(format!("Invalid hubiC response: {e}")));
    }
    let text = response.text().await.map_err(transport_error)?;
    let error = serde_json::from_str::<OAuthErrorResponse>(&text).unwrap_or_else(|_| {
        OAuthErrorResponse {
            error: text,
            error_description: None,
        }
    });
    Err(map_oauth_error(status, &error))
}

#[async_trait]
impl OAuth2Client for HttpHubicClient {
    async fn authorize(&self, code: &str) -> Result<OAuthTokens> {
        tracing::debug!("Exchanging OAuth2 authorization code");
        self.token(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.oauth.redirect_uri.as_str()),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<OAuthTokens> {
        self.token(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }
}

#[async_trait]
impl HubicClient for HttpHubicClient {
    async fn storage_credentials(&self, access_token: &str) -> Result<StorageCredentials> {
        let http = &self.http;
        let url = self.credentials_url.as_str();
        self.retry
            .run("account_credentials", || async move {
                let response = http
                    .get(url)
                    .bearer_auth(access_token)
                    .send()
                    .await
                    .map_err(transport_error)?;
                parse_response(response).await
            })
            .await
    }
}
