//! Content checksums
//!
//! A checksum is an algorithm plus a lowercase hex digest.

use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
}

impl HashAlgorithm {
    /// Length of the hex encoded digest
    pub fn hex_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 40,
            HashAlgorithm::Sha256 => 64,
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashAlgorithm::Sha1 => write!(f, "sha1"),
            HashAlgorithm::Sha256 => write!(f, "sha256"),
        }
    }
}

/// Algorithm and hex digest of some content
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum {
    pub algorithm: HashAlgorithm,
    pub hash: String,
}

impl Checksum {
    pub fn new(algorithm: HashAlgorithm, hash: impl Into<String>) -> Self {
        Self {
            algorithm,
            hash: hash.into().to_lowercase(),
        }
    }

    /// Parse a hex digest, inferring the algorithm from its length.
    ///
    /// Returns `None` for anything that is not a SHA-1 or SHA-256 hex digest.
    pub fn parse(hash: &str) -> Option<Self> {
        let hash = hash.trim();
        if hex::decode(hash).is_err() {
            return None;
        }
        match hash.len() {
            40 => Some(Self::new(HashAlgorithm::Sha1, hash)),
            64 => Some(Self::new(HashAlgorithm::Sha256, hash)),
            _ => None,
        }
    }

    /// SHA-1 of the given content
    pub fn sha1(data: &[u8]) -> Self {
        let mut hasher = ChecksumCompute::new(HashAlgorithm::Sha1);
        hasher.update(data);
        hasher.finish()
    }

    /// SHA-256 of the given content
    pub fn sha256(data: &[u8]) -> Self {
        let mut hasher = ChecksumCompute::new(HashAlgorithm::Sha256);
        hasher.update(data);
        hasher.finish()
    }
}

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hash)
    }
}

/// Incremental checksum computation over streamed content
pub enum ChecksumCompute {
    Sha1(Sha1),
    Sha256(Sha256),
}

impl ChecksumCompute {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha1 => ChecksumCompute::Sha1(Sha1::new()),
            HashAlgorithm::Sha256 => ChecksumCompute::Sha256(Sha256::new()),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            ChecksumCompute::Sha1(h) => h.update(data),
            ChecksumCompute::Sha256(h) => h.update(data),
        }
    }

    pub fn finish(self) -> Checksum {
        match self {
            ChecksumCompute::Sha1(h) => {
                Checksum::new(HashAlgorithm::Sha1, hex::encode(h.finalize()))
            }
            ChecksumCompute::Sha256(h) => {
                Checksum::new(HashAlgorithm::Sha256, hex::encode(h.finalize()))
            }
        }
    }
}
