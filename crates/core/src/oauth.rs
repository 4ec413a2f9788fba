//! OAuth2 token handling shared by OAuth based backends
//!
//! Tokens live in the [`PasswordStore`] under account names derived from
//! the protocol description and username. [`OAuth2Authorization`] loads
//! them, refreshes them through an [`OAuth2Client`] and falls back to an
//! interactive authorization code prompt.

use async_trait::async_trait;
use jiff::Timestamp;

use crate::callback::{CancelCallback, LoginCallback, PasswordStore};
use crate::error::{Error, Result};
use crate::host::Host;

/// Access and refresh token pair
#[derive(Clone, Default, PartialEq, Eq)]
pub struct OAuthTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<Timestamp>,
}

impl OAuthTokens {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_at: Option<Timestamp>,
    ) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|t| t <= Timestamp::now())
    }

    /// An access token that has not expired
    pub fn usable_access_token(&self) -> Option<&str> {
        if self.is_expired() {
            return None;
        }
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }
}

impl std::fmt::Debug for OAuthTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthTokens")
            .field("access_token", &self.access_token.as_ref().map(|_| "********"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "********"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Token endpoint of an OAuth2 provider
#[async_trait]
pub trait OAuth2Client: Send + Sync {
    /// Exchange an authorization code for tokens
    async fn authorize(&self, code: &str) -> Result<OAuthTokens>;

    /// Obtain a fresh access token
    async fn refresh(&self, refresh_token: &str) -> Result<OAuthTokens>;
}

/// Token persistence and acquisition for one host
pub struct OAuth2Authorization<'a> {
    host: &'a Host,
    client: &'a dyn OAuth2Client,
}

impl<'a> OAuth2Authorization<'a> {
    pub fn new(host: &'a Host, client: &'a dyn OAuth2Client) -> Self {
        Self { host, client }
    }

    fn account(&self, kind: &str) -> String {
        format!(
            "{} ({}) OAuth2 {kind}",
            self.host.protocol.description, self.host.credentials.username
        )
    }

    pub fn access_token_account(&self) -> String {
        self.account("Access Token")
    }

    pub fn refresh_token_account(&self) -> String {
        self.account("Refresh Token")
    }

    pub fn expiry_account(&self) -> String {
        self.account("Token Expiry")
    }

    /// Tokens saved for this host
    pub fn load(&self, keychain: &dyn PasswordStore) -> OAuthTokens {
        let find = |account: String| {
            keychain
                .find_password(
                    self.host.protocol.scheme,
                    self.host.port,
                    &self.host.hostname,
                    &account,
                )
                .filter(|v| !v.is_empty())
        };
        OAuthTokens {
            access_token: find(self.access_token_account()),
            refresh_token: find(self.refresh_token_account()),
            expires_at: find(self.expiry_account())
                .and_then(|ms| ms.parse::<i64>().ok())
                .and_then(|ms| Timestamp::from_millisecond(ms).ok()),
        }
    }

    pub fn save(&self, keychain: &dyn PasswordStore, tokens: &OAuthTokens) -> Result<()> {
        let add = |account: String, value: &str| {
            keychain.add_password(
                self.host.protocol.scheme,
                self.host.port,
                &self.host.hostname,
                &account,
                value,
            )
        };
        if let Some(access) = &tokens.access_token {
            add(self.access_token_account(), access)?;
        }
        if let Some(refresh) = &tokens.refresh_token {
            add(self.refresh_token_account(), refresh)?;
        }
        if let Some(expiry) = tokens.expires_at {
            add(self.expiry_account(), &expiry.as_millisecond().to_string())?;
        }
        Ok(())
    }

    /// Refresh `tokens`, keeping the previous refresh token when the
    /// provider does not rotate it, and persist the result.
    pub async fn refresh(
        &self,
        keychain: &dyn PasswordStore,
        tokens: &OAuthTokens,
    ) -> Result<OAuthTokens> {
        let Some(refresh_token) = tokens.refresh_token.as_deref() else {
            return Err(Error::login_failure(
                "Login failed",
                "Missing refresh token",
            ));
        };
        tracing::debug!(host = %self.host.hostname, "Refreshing OAuth2 access token");
        let mut refreshed = self.client.refresh(refresh_token).await?;
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token = Some(refresh_token.to_string());
        }
        self.save(keychain, &refreshed)?;
        Ok(refreshed)
    }

    /// Prompt for an authorization code and exchange it for tokens.
    /// `cause` is the failure that made the prompt necessary; its detail is
    /// shown to the user and carried by a cancellation.
    pub async fn authorize(
        &self,
        keychain: &dyn PasswordStore,
        prompt: &dyn LoginCallback,
        cancel: &dyn CancelCallback,
        cause: Option<&Error>,
    ) -> Result<OAuthTokens> {
        let reason = cause
            .and_then(Error::detail)
            .unwrap_or("Paste the authentication code from your web browser");
        let credentials = prompt
            .prompt(self.host, "OAuth2 Authentication", reason)
            .map_err(|e| match cause {
                Some(cause) => e.with_cause_detail(cause),
                None => e,
            })?;
        cancel.verify()?;
        let Some(code) = credentials.password() else {
            return Err(Error::LoginCanceled {
                detail: cause.and_then(Error::detail).map(str::to_string),
            });
        };
        let tokens = self.client.authorize(code).await?;
        self.save(keychain, &tokens)?;
        Ok(tokens)
    }
}
