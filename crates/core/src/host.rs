//! Backend descriptors: protocols, hosts and credentials

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// URL scheme of a protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
    Ftp,
    Sftp,
}

impl Scheme {
    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
            Scheme::Ftp => 21,
            Scheme::Sftp => 22,
        }
    }

    pub fn is_secure(&self) -> bool {
        matches!(self, Scheme::Https | Scheme::Sftp)
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scheme::Http => write!(f, "http"),
            Scheme::Https => write!(f, "https"),
            Scheme::Ftp => write!(f, "ftp"),
            Scheme::Sftp => write!(f, "sftp"),
        }
    }
}

/// Protocol family a session implementation is selected by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolType {
    B2,
    Swift,
    S3,
    Dav,
    Ftp,
    Sftp,
}

impl std::fmt::Display for ProtocolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProtocolType::B2 => "b2",
            ProtocolType::Swift => "swift",
            ProtocolType::S3 => "s3",
            ProtocolType::Dav => "dav",
            ProtocolType::Ftp => "ftp",
            ProtocolType::Sftp => "sftp",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ProtocolType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "b2" => Ok(ProtocolType::B2),
            "swift" => Ok(ProtocolType::Swift),
            "s3" => Ok(ProtocolType::S3),
            "dav" | "webdav" => Ok(ProtocolType::Dav),
            "ftp" => Ok(ProtocolType::Ftp),
            "sftp" => Ok(ProtocolType::Sftp),
            _ => Err(Error::Config(format!("Unknown protocol type: {s}"))),
        }
    }
}

/// OAuth2 endpoints and client registration of a protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub authorization_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
}

/// Description of a backend protocol, optionally specialised by a vendor
/// profile (for example hubiC on top of Swift).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    #[serde(rename = "protocol")]
    pub kind: ProtocolType,

    /// Unique identifier, e.g. "b2" or "hubic"
    pub identifier: String,

    /// Human-readable name, also used to label stored secrets
    pub description: String,

    pub scheme: Scheme,

    pub default_hostname: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth: Option<OAuthConfig>,
}

impl Protocol {
    pub fn new(
        kind: ProtocolType,
        identifier: impl Into<String>,
        description: impl Into<String>,
        default_hostname: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            identifier: identifier.into(),
            description: description.into(),
            scheme: Scheme::Https,
            default_hostname: default_hostname.into(),
            default_port: None,
            oauth: None,
        }
    }

    pub fn with_oauth(mut self, oauth: OAuthConfig) -> Self {
        self.oauth = Some(oauth);
        self
    }

    pub fn port(&self) -> u16 {
        self.default_port.unwrap_or_else(|| self.scheme.default_port())
    }
}

/// Username and secret for a host. The secret may be absent, in which
/// case sessions consult the password store.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Some(password.into()),
        }
    }

    /// Credentials with a username only
    pub fn user(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: None,
        }
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .finish()
    }
}

/// A protocol, a hostname and the credentials to use there
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub protocol: Protocol,
    pub hostname: String,
    pub port: u16,
    pub credentials: Credentials,
}

impl Host {
    pub fn new(protocol: Protocol, hostname: impl Into<String>, credentials: Credentials) -> Self {
        let port = protocol.port();
        Self {
            protocol,
            hostname: hostname.into(),
            port,
            credentials,
        }
    }

    /// Host at the protocol's default hostname
    pub fn with_default_hostname(protocol: Protocol, credentials: Credentials) -> Self {
        let hostname = protocol.default_hostname.clone();
        Self::new(protocol, hostname, credentials)
    }

    /// Base URL of the host
    pub fn url(&self) -> Result<url::Url> {
        let scheme = self.protocol.scheme;
        let raw = if self.port == scheme.default_port() {
            format!("{scheme}://{}/", self.hostname)
        } else {
            format!("{scheme}://{}:{}/", self.hostname, self.port)
        };
        url::Url::parse(&raw).map_err(|e| Error::Config(format!("Invalid host URL {raw}: {e}")))
    }
}

impl std::fmt::Display for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}@{} ({})",
            self.credentials.username, self.hostname, self.protocol.description
        )
    }
}
