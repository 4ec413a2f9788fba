//! Per-operation transfer state

use crate::checksum::Checksum;
use crate::path::{Path, PathAttributes};

/// Parameters of a single upload, mkdir or touch
///
/// Built with the `with_*` methods before the operation starts. Once the
/// operation finishes the status is frozen inside a [`CompletedTransfer`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferStatus {
    length: Option<u64>,
    offset: u64,
    checksum: Option<Checksum>,
    mime: Option<String>,
    region: Option<String>,
}

impl TransferStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expected number of bytes
    pub fn with_length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Digest the backend must verify the content against
    pub fn with_checksum(mut self, checksum: Checksum) -> Self {
        self.checksum = Some(checksum);
        self
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn length(&self) -> Option<u64> {
        self.length
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn checksum(&self) -> Option<&Checksum> {
        self.checksum.as_ref()
    }

    pub fn mime(&self) -> Option<&str> {
        self.mime.as_deref()
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

/// Result of a finished write: the status it ran with and the attributes
/// the backend assigned to the new revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTransfer {
    path: Path,
    status: TransferStatus,
    response: PathAttributes,
}

impl CompletedTransfer {
    pub fn new(path: Path, status: TransferStatus, response: PathAttributes) -> Self {
        Self {
            path,
            status,
            response,
        }
    }

    pub fn status(&self) -> &TransferStatus {
        &self.status
    }

    /// Attributes reported by the backend (version id, digest, size)
    pub fn response(&self) -> &PathAttributes {
        &self.response
    }

    /// Version id assigned to the written revision
    pub fn version_id(&self) -> Option<&str> {
        self.response.version_id.as_deref()
    }

    /// The written path carrying the response attributes
    pub fn path(&self) -> Path {
        self.path.clone().with_attributes(self.response.clone())
    }
}
