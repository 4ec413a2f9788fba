//! Feature traits implemented once per backend
//!
//! A session hands out feature implementations borrowing itself, see
//! [`crate::Session`]. All operations require an authenticated session.

use async_trait::async_trait;

use crate::callback::{ConnectionCallback, DeleteCallback, ListProgressListener, LoginCallback};
use crate::error::{Error, Result};
use crate::list::AttributedList;
use crate::path::Path;
use crate::transfer::{CompletedTransfer, TransferStatus};

/// Listing of the direct children of a directory
#[async_trait]
pub trait ListService: Send + Sync {
    /// List direct children of `directory`. Pagination is exhausted before
    /// returning; an existing but empty directory yields an empty list.
    async fn list(
        &self,
        directory: &Path,
        listener: &dyn ListProgressListener,
    ) -> Result<AttributedList>;
}

/// Creation of containers and directories
#[async_trait]
pub trait Directory: Send + Sync {
    async fn mkdir(
        &self,
        folder: &Path,
        region: Option<&str>,
        status: &TransferStatus,
    ) -> Result<Path>;
}

/// Creation of zero-length files
#[async_trait]
pub trait Touch: Send + Sync {
    async fn touch(&self, file: &Path, status: &TransferStatus) -> Result<Path>;
}

/// Streaming upload
#[async_trait]
pub trait Write: Send + Sync {
    /// Open a sink for `file`. Bytes written to the sink are uploaded when
    /// it is closed.
    async fn write<'a>(
        &'a self,
        file: &Path,
        status: TransferStatus,
        callback: &dyn ConnectionCallback,
    ) -> Result<Box<dyn StatusOutputStream + 'a>>;
}

/// Output sink bound to a transfer status
///
/// `close` consumes the sink, so finalization happens at most once.
/// Dropping the sink without closing discards the upload.
#[async_trait]
pub trait StatusOutputStream: Send {
    async fn write(&mut self, buf: &[u8]) -> Result<()>;

    /// Finalize the upload and return the completed transfer
    async fn close(self: Box<Self>) -> Result<CompletedTransfer>;

    fn status(&self) -> &TransferStatus;
}

/// Batch deletion
#[async_trait]
pub trait Delete: Send + Sync {
    /// Delete every path in `files`. A failing path does not stop the
    /// remaining ones; the report holds one outcome per path.
    async fn delete(
        &self,
        files: &[Path],
        prompt: &dyn LoginCallback,
        callback: &dyn DeleteCallback,
    ) -> Result<DeleteReport>;
}

/// Outcome of deleting one path
#[derive(Debug)]
pub struct DeleteOutcome {
    pub path: Path,
    pub result: Result<()>,
}

/// Per-path outcomes of a batch delete
#[derive(Debug, Default)]
pub struct DeleteReport {
    outcomes: Vec<DeleteOutcome>,
}

impl DeleteReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, path: Path, result: Result<()>) {
        self.outcomes.push(DeleteOutcome { path, result });
    }

    pub fn outcomes(&self) -> &[DeleteOutcome] {
        &self.outcomes
    }

    pub fn deleted(&self) -> impl Iterator<Item = &Path> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_ok())
            .map(|o| &o.path)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Path, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.path, e)))
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    /// Collapse into the first failure, if any
    pub fn into_result(self) -> Result<()> {
        match self.outcomes.into_iter().find_map(|o| o.result.err()) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
