//! duck: storage sessions for Backblaze B2 and hubiC
//!
//! [`SessionFactory`] resolves a protocol identifier to a [`Protocol`],
//! built in or read from a `*.duckprofile`, and creates the matching
//! backend [`Session`].

use std::sync::Arc;

use duck_b2::{B2Client, B2Options, B2Session, HttpB2Client};
use duck_hubic::{HttpHubicClient, HubicClient, HubicSession};

pub use duck_core::*;

pub use duck_b2 as b2;
pub use duck_hubic as hubic;

/// Protocols available without any profile
pub fn builtin_protocols() -> Vec<Protocol> {
    vec![duck_b2::protocol(), duck_hubic::swift(), duck_hubic::protocol()]
}

/// Creates sessions for hosts of the registered protocols
pub struct SessionFactory {
    protocols: ProtocolFactory,
    b2_options: B2Options,
    retry: RetryPolicy,
    b2_client: Option<Arc<dyn B2Client>>,
    hubic_client: Option<Arc<dyn HubicClient>>,
}

impl SessionFactory {
    /// Factory for `config`. Profiles in `profiles_dir` replace built-in
    /// protocols with the same identifier.
    pub fn new(config: &Config) -> Result<Self> {
        let mut protocols = ProtocolFactory::new(builtin_protocols());
        if let Some(dir) = &config.profiles_dir {
            let loaded = protocols.load_profiles(dir)?;
            tracing::debug!(dir = %dir.display(), loaded, "Loaded protocol profiles");
        }
        Ok(Self {
            protocols,
            b2_options: B2Options::try_from(config)?,
            retry: RetryPolicy::new(config.retry.clone()),
            b2_client: None,
            hubic_client: None,
        })
    }

    /// Use `client` for every B2 session instead of the HTTP client
    pub fn with_b2_client(mut self, client: Arc<dyn B2Client>) -> Self {
        self.b2_client = Some(client);
        self
    }

    /// Use `client` for every hubiC session instead of the HTTP client
    pub fn with_hubic_client(mut self, client: Arc<dyn HubicClient>) -> Self {
        self.hubic_client = Some(client);
        self
    }

    pub fn protocols(&self) -> &ProtocolFactory {
        &self.protocols
    }

    /// Host for the protocol `identifier`. Without a hostname the
    /// protocol's default hostname is used.
    pub fn host(
        &self,
        identifier: &str,
        hostname: Option<&str>,
        credentials: Credentials,
    ) -> Result<Host> {
        let protocol = self
            .protocols
            .find(identifier)
            .cloned()
            .ok_or_else(|| Error::Config(format!("Unknown protocol {identifier}")))?;
        Ok(match hostname {
            Some(hostname) => Host::new(protocol, hostname, credentials),
            None => Host::with_default_hostname(protocol, credentials),
        })
    }

    /// Session for `host`. The session is not yet opened.
    pub fn create(&self, host: Host) -> Result<Box<dyn Session>> {
        tracing::debug!(protocol = %host.protocol.identifier, host = %host.hostname, "Creating session");
        match host.protocol.kind {
            ProtocolType::B2 => {
                let client: Arc<dyn B2Client> = match &self.b2_client {
                    Some(client) => client.clone(),
                    None => Arc::new(HttpB2Client::new(&host, self.retry.clone())?),
                };
                Ok(Box::new(B2Session::with_options(
                    host,
                    client,
                    self.b2_options.clone(),
                )))
            }
            ProtocolType::Swift if duck_hubic::is_hubic(&host.protocol) => {
                let client: Arc<dyn HubicClient> = match &self.hubic_client {
                    Some(client) => client.clone(),
                    None => Arc::new(HttpHubicClient::new(&host, self.retry.clone())?),
                };
                Ok(Box::new(HubicSession::new(host, client)))
            }
            _ => Err(Error::UnsupportedFeature(format!(
                "No session for protocol {}",
                host.protocol.description
            ))),
        }
    }

    /// Create, open and authenticate a session for `host`
    pub async fn connect(
        &self,
        host: Host,
        keychain: &dyn PasswordStore,
        prompt: &dyn LoginCallback,
        cancel: &dyn CancelCallback,
    ) -> Result<Box<dyn Session>> {
        let mut session = self.create(host)?;
        session.open(&DisabledHostKeyCallback).await?;
        if let Err(e) = session.login(keychain, prompt, cancel).await {
            if let Err(close) = session.close().await {
                tracing::warn!(error = %close, "Failed to close session after login failure");
            }
            return Err(e);
        }
        Ok(session)
    }
}
