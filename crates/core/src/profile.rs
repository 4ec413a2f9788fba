//! Protocol registry and vendor profiles
//!
//! Profiles are TOML files (`*.duckprofile`) deriving a vendor protocol
//! from a registered base protocol, for example hubiC on top of Swift.

use std::path::Path as FsPath;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::host::{OAuthConfig, Protocol, ProtocolType, Scheme};

/// Extension of profile files
pub const PROFILE_EXTENSION: &str = "duckprofile";

/// Contents of a profile file
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    /// Identifier of the base protocol
    pub protocol: String,
    pub vendor: String,
    pub description: String,
    #[serde(default)]
    pub default_hostname: Option<String>,
    #[serde(default)]
    pub default_port: Option<u16>,
    #[serde(default)]
    pub scheme: Option<Scheme>,
    #[serde(default)]
    pub oauth: Option<OAuthConfig>,
}

/// Registered protocols, looked up by identifier or type
#[derive(Debug, Clone, Default)]
pub struct ProtocolFactory {
    protocols: Vec<Protocol>,
}

impl ProtocolFactory {
    pub fn new(protocols: impl IntoIterator<Item = Protocol>) -> Self {
        Self {
            protocols: protocols.into_iter().collect(),
        }
    }

    /// Register a protocol, replacing one with the same identifier
    pub fn register(&mut self, protocol: Protocol) {
        self.protocols.retain(|p| p.identifier != protocol.identifier);
        self.protocols.push(protocol);
    }

    pub fn find(&self, identifier: &str) -> Option<&Protocol> {
        self.protocols
            .iter()
            .find(|p| p.identifier.eq_ignore_ascii_case(identifier))
    }

    /// First registered protocol of the given type
    pub fn for_type(&self, kind: ProtocolType) -> Option<&Protocol> {
        self.protocols.iter().find(|p| p.kind == kind)
    }

    pub fn protocols(&self) -> &[Protocol] {
        &self.protocols
    }

    /// Parse a profile and derive its protocol from the registered base
    pub fn parse_profile(&self, content: &str) -> Result<Protocol> {
        let profile: Profile = toml::from_str(content)?;
        let base = self
            .find(&profile.protocol)
            .ok_or_else(|| Error::Config(format!("Unknown base protocol {}", profile.protocol)))?;
        let mut protocol = base.clone();
        protocol.identifier = profile.vendor;
        protocol.description = profile.description;
        if let Some(hostname) = profile.default_hostname {
            protocol.default_hostname = hostname;
        }
        if let Some(scheme) = profile.scheme {
            protocol.scheme = scheme;
        }
        if profile.default_port.is_some() {
            protocol.default_port = profile.default_port;
        }
        if profile.oauth.is_some() {
            protocol.oauth = profile.oauth;
        }
        Ok(protocol)
    }

    /// Read a profile file
    pub fn read(&self, file: &FsPath) -> Result<Protocol> {
        let content = std::fs::read_to_string(file)?;
        self.parse_profile(&content)
    }

    /// Register every profile found in `dir`. Unreadable profiles are
    /// skipped with a warning. Returns the number registered.
    pub fn load_profiles(&mut self, dir: &FsPath) -> Result<usize> {
        let mut loaded = 0;
        for entry in std::fs::read_dir(dir)? {
            let file = entry?.path();
            if file.extension().and_then(|e| e.to_str()) != Some(PROFILE_EXTENSION) {
                continue;
            }
            match self.read(&file) {
                Ok(protocol) => {
                    tracing::debug!(profile = %file.display(), identifier = %protocol.identifier, "Loaded profile");
                    self.register(protocol);
                    loaded += 1;
                }
                Err(e) => {
                    tracing::warn!(profile = %file.display(), error = %e, "Skipping invalid profile");
                }
            }
        }
        Ok(loaded)
    }
}
