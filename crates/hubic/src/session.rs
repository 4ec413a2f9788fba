//! hubiC session
//!
//! Login validates the stored OAuth2 access token by requesting storage
//! credentials. An invalid token is refreshed with the stored refresh
//! token; when that fails too, the user is asked for a new authorization
//! code.

use std::sync::Arc;

use async_trait::async_trait;
use duck_core::{
    CancelCallback, Error, Host, HostKeyCallback, LoginCallback, OAuth2Authorization, OAuthTokens,
    PasswordStore, Result, Session, SessionState,
};

use crate::client::{HubicClient, StorageCredentials};

pub struct HubicSession {
    host: Host,
    client: Arc<dyn HubicClient>,
    state: SessionState,
    storage: Option<StorageCredentials>,
}

impl HubicSession {
    pub fn new(host: Host, client: Arc<dyn HubicClient>) -> Self {
        Self {
            host,
            client,
            state: SessionState::default(),
            storage: None,
        }
    }

    /// Storage credentials obtained by the last login
    pub fn storage(&self) -> Option<&StorageCredentials> {
        self.storage.as_ref()
    }

    async fn credentials_for(&self, tokens: &OAuthTokens) -> Result<StorageCredentials> {
        match tokens.usable_access_token() {
            Some(token) => self.client.storage_credentials(token).await,
            None => Err(Error::login_failure("Login failed", "Missing access token")),
        }
    }

    async fn refresh(
        &self,
        auth: &OAuth2Authorization<'_>,
        keychain: &dyn PasswordStore,
        tokens: &OAuthTokens,
    ) -> Result<StorageCredentials> {
        let refreshed = auth.refresh(keychain, tokens).await?;
        self.credentials_for(&refreshed).await
    }
}

#[async_trait]
impl Session for HubicSession {
    fn host(&self) -> &Host {
        &self.host
    }

    fn state(&self) -> SessionState {
        self.state
    }

    async fn open(&mut self, _key: &dyn HostKeyCallback) -> Result<()> {
        let url = self.host.url()?;
        tracing::debug!(url = %url, "Opening hubiC session");
        self.state = SessionState::Open;
        Ok(())
    }

    async fn login(
        &mut self,
        keychain: &dyn PasswordStore,
        prompt: &dyn LoginCallback,
        cancel: &dyn CancelCallback,
    ) -> Result<()> {
        self.state.ensure_open()?;
        let client = self.client.clone();
        let auth = OAuth2Authorization::new(&self.host, client.as_ref());
        let tokens = auth.load(keychain);

        let storage = match self.credentials_for(&tokens).await {
            Ok(storage) => storage,
            Err(e) if e.is_login_failure() => {
                tracing::debug!(error = %e, "Access token rejected");
                let refreshed = if tokens.refresh_token.is_some() {
                    self.refresh(&auth, keychain, &tokens).await
                } else {
                    Err(e)
                };
                match refreshed {
                    Ok(storage) => storage,
                    Err(cause) if cause.is_login_failure() => {
                        tracing::debug!(error = %cause, "Requesting new OAuth2 authorization");
                        let tokens = auth.authorize(keychain, prompt, cancel, Some(&cause)).await?;
                        self.credentials_for(&tokens).await?
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(e) => return Err(e),
        };
        tracing::debug!(endpoint = %storage.endpoint, "Obtained hubiC storage credentials");
        self.storage = Some(storage);
        self.state = SessionState::Authenticated;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        tracing::debug!(host = %self.host.hostname, "Closing hubiC session");
        self.storage = None;
        self.state = SessionState::Closed;
        Ok(())
    }
}
