//! Session lifecycle
//!
//! A session owns the connection to one backend. It moves through
//! `Disconnected -> Open -> Authenticated -> Closed`; features are only
//! usable while authenticated. A session is driven by one task at a time;
//! use one session per concurrent transfer.

use async_trait::async_trait;

use crate::callback::{CancelCallback, HostKeyCallback, LoginCallback, PasswordStore};
use crate::error::{Error, Result};
use crate::features::{Delete, Directory, ListService, Touch, Write};
use crate::host::Host;

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Open,
    Authenticated,
    Closed,
}

impl SessionState {
    /// Fail unless the session is authenticated. Operations on a closed
    /// or never opened session are connectivity failures.
    pub fn ensure_authenticated(&self) -> Result<()> {
        match self {
            SessionState::Authenticated => Ok(()),
            SessionState::Open => Err(Error::LoginFailure {
                message: "Login required".to_string(),
                detail: "The session is connected but not authenticated.".to_string(),
            }),
            SessionState::Disconnected => {
                Err(Error::Connectivity("Session is not connected".to_string()))
            }
            SessionState::Closed => Err(Error::Connectivity("Session is closed".to_string())),
        }
    }

    pub fn ensure_open(&self) -> Result<()> {
        match self {
            SessionState::Open | SessionState::Authenticated => Ok(()),
            SessionState::Disconnected => {
                Err(Error::Connectivity("Session is not connected".to_string()))
            }
            SessionState::Closed => Err(Error::Connectivity("Session is closed".to_string())),
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Disconnected => write!(f, "disconnected"),
            SessionState::Open => write!(f, "open"),
            SessionState::Authenticated => write!(f, "authenticated"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

/// Connection to one backend plus the features it supports
///
/// Feature accessors act as the per-backend factory; backends override
/// the ones they implement.
#[async_trait]
pub trait Session: Send + Sync {
    fn host(&self) -> &Host;

    fn state(&self) -> SessionState;

    /// Establish the transport
    async fn open(&mut self, key: &dyn HostKeyCallback) -> Result<()>;

    /// Authenticate, consulting `keychain` for secrets and `prompt` when
    /// none are usable.
    async fn login(
        &mut self,
        keychain: &dyn PasswordStore,
        prompt: &dyn LoginCallback,
        cancel: &dyn CancelCallback,
    ) -> Result<()>;

    /// Release the transport. Closing twice is a no-op.
    async fn close(&mut self) -> Result<()>;

    fn list_service(&self) -> Result<Box<dyn ListService + '_>> {
        Err(unsupported(self.host(), "list"))
    }

    fn directory(&self) -> Result<Box<dyn Directory + '_>> {
        Err(unsupported(self.host(), "directory"))
    }

    fn touch(&self) -> Result<Box<dyn Touch + '_>> {
        Err(unsupported(self.host(), "touch"))
    }

    fn write(&self) -> Result<Box<dyn Write + '_>> {
        Err(unsupported(self.host(), "write"))
    }

    fn delete(&self) -> Result<Box<dyn Delete + '_>> {
        Err(unsupported(self.host(), "delete"))
    }
}

fn unsupported(host: &Host, feature: &str) -> Error {
    Error::UnsupportedFeature(format!(
        "{feature} is not supported by {}",
        host.protocol.description
    ))
}
