//! Collaborators a session consults while it works
//!
//! Front-ends implement these traits to prompt users, store secrets and
//! show progress. The `Disabled*` implementations are deterministic stubs
//! for headless use: they never prompt and never block.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::host::{Credentials, Host, Scheme};
use crate::path::Path;

/// Secret storage keyed by service location and account name
#[cfg_attr(test, mockall::automock)]
pub trait PasswordStore: Send + Sync {
    fn find_password(&self, scheme: Scheme, port: u16, hostname: &str, user: &str)
    -> Option<String>;

    fn add_password(
        &self,
        scheme: Scheme,
        port: u16,
        hostname: &str,
        user: &str,
        password: &str,
    ) -> Result<()>;
}

/// Interactive credential prompt
pub trait LoginCallback: Send + Sync {
    /// Ask for credentials. Returns [`Error::LoginCanceled`] when the user
    /// declines.
    fn prompt(&self, host: &Host, title: &str, reason: &str) -> Result<Credentials>;
}

/// Cooperative cancellation of a login in progress
pub trait CancelCallback: Send + Sync {
    fn verify(&self) -> Result<()>;
}

/// Verification of a server's host key on connect
pub trait HostKeyCallback: Send + Sync {
    fn verify(&self, hostname: &str, port: u16, fingerprint: &str) -> Result<bool>;
}

/// Warnings raised while a connection is used, e.g. insecure transport
pub trait ConnectionCallback: Send + Sync {
    fn warn(&self, host: &Host, title: &str, message: &str) -> Result<()>;
}

/// Passive sink for listing progress
pub trait ListProgressListener: Send + Sync {
    /// Called after each page with the number of entries collected so far
    fn chunk(&self, directory: &Path, count: usize);
}

/// Notified before each path of a batch delete
pub trait DeleteCallback: Send + Sync {
    fn delete(&self, file: &Path);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledPasswordStore;

impl PasswordStore for DisabledPasswordStore {
    fn find_password(&self, _: Scheme, _: u16, _: &str, _: &str) -> Option<String> {
        None
    }

    fn add_password(&self, _: Scheme, _: u16, _: &str, _: &str, _: &str) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledLoginCallback;

impl LoginCallback for DisabledLoginCallback {
    fn prompt(&self, _: &Host, _: &str, _: &str) -> Result<Credentials> {
        Err(Error::LoginCanceled { detail: None })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCancelCallback;

impl CancelCallback for DisabledCancelCallback {
    fn verify(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledHostKeyCallback;

impl HostKeyCallback for DisabledHostKeyCallback {
    fn verify(&self, _: &str, _: u16, _: &str) -> Result<bool> {
        Ok(true)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledConnectionCallback;

impl ConnectionCallback for DisabledConnectionCallback {
    fn warn(&self, _: &Host, _: &str, _: &str) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledListProgressListener;

impl ListProgressListener for DisabledListProgressListener {
    fn chunk(&self, _: &Path, _: usize) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledDeleteCallback;

impl DeleteCallback for DisabledDeleteCallback {
    fn delete(&self, _: &Path) {}
}

/// In-memory password store keyed by hostname and account name
#[derive(Debug, Default)]
pub struct MemoryPasswordStore {
    passwords: Mutex<HashMap<(String, String), String>>,
}

impl MemoryPasswordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a secret
    pub fn with(self, hostname: &str, user: &str, password: &str) -> Self {
        if let Ok(mut map) = self.passwords.lock() {
            map.insert((hostname.to_string(), user.to_string()), password.to_string());
        }
        self
    }

    pub fn len(&self) -> usize {
        self.passwords.lock().map(|m| m.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PasswordStore for MemoryPasswordStore {
    fn find_password(&self, _: Scheme, _: u16, hostname: &str, user: &str) -> Option<String> {
        self.passwords
            .lock()
            .ok()?
            .get(&(hostname.to_string(), user.to_string()))
            .cloned()
    }

    fn add_password(
        &self,
        _: Scheme,
        _: u16,
        hostname: &str,
        user: &str,
        password: &str,
    ) -> Result<()> {
        let mut map = self
            .passwords
            .lock()
            .map_err(|_| Error::General("password store lock poisoned".to_string()))?;
        map.insert((hostname.to_string(), user.to_string()), password.to_string());
        Ok(())
    }
}
