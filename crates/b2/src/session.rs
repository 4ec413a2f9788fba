//! B2 session
//!
//! Authenticates with an application key id (username) and application
//! key (password) and hands out the B2 features.

use std::sync::Arc;

use async_trait::async_trait;
use duck_core::{
    CancelCallback, Config, Credentials, Delete, Directory, Error, Host, HostKeyCallback,
    ListService, LoginCallback, PasswordStore, Result, Session, SessionState, Touch, Write,
};

use crate::client::{B2Account, B2Client};
use crate::delete::B2DeleteFeature;
use crate::directory::B2DirectoryFeature;
use crate::fileid::B2FileIdProvider;
use crate::list::B2ListService;
use crate::protocol::BucketType;
use crate::touch::B2TouchFeature;
use crate::write::B2WriteFeature;

/// Tunables of a B2 session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct B2Options {
    /// Versions requested per listing page
    pub chunk_size: u32,
    /// Bucket type of new buckets when no region is given
    pub bucket_type: BucketType,
}

impl Default for B2Options {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            bucket_type: BucketType::AllPrivate,
        }
    }
}

impl B2Options {
    pub fn with_chunk_size(mut self, chunk_size: u32) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

impl TryFrom<&Config> for B2Options {
    type Error = Error;

    fn try_from(config: &Config) -> Result<Self> {
        Ok(Self {
            chunk_size: config.listing.chunk_size.max(1),
            bucket_type: config.b2.bucket_type.parse()?,
        })
    }
}

/// Session against the B2 native API
pub struct B2Session {
    host: Host,
    client: Arc<dyn B2Client>,
    options: B2Options,
    state: SessionState,
    account: Option<B2Account>,
}

impl B2Session {
    pub fn new(host: Host, client: Arc<dyn B2Client>) -> Self {
        Self::with_options(host, client, B2Options::default())
    }

    pub fn with_options(host: Host, client: Arc<dyn B2Client>, options: B2Options) -> Self {
        Self {
            host,
            client,
            options,
            state: SessionState::default(),
            account: None,
        }
    }

    pub fn client(&self) -> &dyn B2Client {
        self.client.as_ref()
    }

    pub fn options(&self) -> &B2Options {
        &self.options
    }

    /// Authorization of the logged in account
    pub fn account(&self) -> Option<&B2Account> {
        self.account.as_ref()
    }

    /// Fail unless the session is authenticated
    pub fn ensure_authenticated(&self) -> Result<()> {
        self.state.ensure_authenticated()
    }

    pub fn file_id_provider(&self) -> B2FileIdProvider<'_> {
        B2FileIdProvider::new(self)
    }

    fn credentials(
        &self,
        keychain: &dyn PasswordStore,
        prompt: &dyn LoginCallback,
    ) -> Result<(Credentials, bool)> {
        let credentials = &self.host.credentials;
        if credentials.password().is_some() {
            return Ok((credentials.clone(), false));
        }
        if !credentials.username.is_empty()
            && let Some(key) = keychain
                .find_password(
                    self.host.protocol.scheme,
                    self.host.port,
                    &self.host.hostname,
                    &credentials.username,
                )
                .filter(|k| !k.is_empty())
        {
            return Ok((Credentials::new(&credentials.username, key), false));
        }
        let prompted = prompt.prompt(
            &self.host,
            &format!("Login {}", self.host.hostname),
            "Enter your application key ID and application key",
        )?;
        Ok((prompted, true))
    }
}

#[async_trait]
impl Session for B2Session {
    fn host(&self) -> &Host {
        &self.host
    }

    fn state(&self) -> SessionState {
        self.state
    }

    async fn open(&mut self, _key: &dyn HostKeyCallback) -> Result<()> {
        let url = self.host.url()?;
        tracing::debug!(url = %url, "Opening B2 session");
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
        let (credentials, prompted) = self.credentials(keychain, prompt)?;
        cancel.verify()?;
        let key = credentials.password().ok_or_else(|| Error::LoginCanceled {
            detail: Some("No application key provided".to_string()),
        })?;
        let account = self
            .client
            .authorize_account(&credentials.username, key)
            .await?;
        if prompted {
            keychain.add_password(
                self.host.protocol.scheme,
                self.host.port,
                &self.host.hostname,
                &credentials.username,
                key,
            )?;
        }
        tracing::debug!(account = %account.account_id, api_url = %account.api_url, "Authorized B2 account");
        self.account = Some(account);
        self.state = SessionState::Authenticated;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        tracing::debug!(host = %self.host.hostname, "Closing B2 session");
        self.account = None;
        self.state = SessionState::Closed;
        Ok(())
    }

    fn list_service(&self) -> Result<Box<dyn ListService + '_>> {
        Ok(Box::new(B2ListService::new(self)))
    }

    fn directory(&self) -> Result<Box<dyn Directory + '_>> {
        Ok(Box::new(B2DirectoryFeature::new(self)))
    }

    fn touch(&self) -> Result<Box<dyn Touch + '_>> {
        Ok(Box::new(B2TouchFeature::new(self)))
    }

    fn write(&self) -> Result<Box<dyn Write + '_>> {
        Ok(Box::new(B2WriteFeature::new(self)))
    }

    fn delete(&self) -> Result<Box<dyn Delete + '_>> {
        Ok(Box::new(B2DeleteFeature::new(self)))
    }
}
