//! B2 protocol descriptor and constants

use duck_core::{Error, Protocol, ProtocolType, Result};

/// Name of the zero-length object marking a directory
pub const PLACEHOLDER: &str = ".bzEmpty";

/// Content type of uploads that do not declare one
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Sent instead of a SHA-1 digest when the upload is not verified
pub const DO_NOT_VERIFY: &str = "do_not_verify";

pub const DEFAULT_HOSTNAME: &str = "api.backblazeb2.com";

/// The built-in B2 protocol
pub fn protocol() -> Protocol {
    Protocol::new(ProtocolType::B2, "b2", "B2 Cloud Storage", DEFAULT_HOSTNAME)
}

/// Visibility of a bucket, carried as the region of a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketType {
    AllPrivate,
    AllPublic,
}

impl BucketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketType::AllPrivate => "allPrivate",
            BucketType::AllPublic => "allPublic",
        }
    }
}

impl std::fmt::Display for BucketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BucketType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "allPrivate" => Ok(BucketType::AllPrivate),
            "allPublic" => Ok(BucketType::AllPublic),
            _ => Err(Error::Config(format!("Unknown bucket type: {s}"))),
        }
    }
}
