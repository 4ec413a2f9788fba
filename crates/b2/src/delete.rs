//! B2 batch delete
//!
//! Files are deleted before buckets so that a bucket emptied by the same
//! call can be removed. A file path without a version id deletes only its
//! latest version; older versions stay listed.

use async_trait::async_trait;
use duck_core::{Delete, DeleteCallback, DeleteReport, Error, LoginCallback, Path, Result};

use crate::protocol::PLACEHOLDER;
use crate::session::B2Session;

pub struct B2DeleteFeature<'a> {
    session: &'a B2Session,
}

impl<'a> B2DeleteFeature<'a> {
    pub fn new(session: &'a B2Session) -> Self {
        Self { session }
    }

    async fn delete_bucket(&self, bucket: &Path) -> Result<()> {
        let bucket = self.session.file_id_provider().bucket(bucket).await?;
        self.session.client().delete_bucket(&bucket.bucket_id).await?;
        Ok(())
    }

    /// Remove every version of the directory's marker
    async fn delete_directory(&self, directory: &Path) -> Result<()> {
        let key = directory.key().unwrap_or_default();
        let marker = format!("{key}/{PLACEHOLDER}");
        let provider = self.session.file_id_provider();
        let bucket_id = provider.bucket_id(directory).await?;
        let versions = provider.versions(&bucket_id, &marker).await?;
        if versions.is_empty() {
            return Err(Error::NotFound(directory.to_string()));
        }
        for version in versions {
            if let Some(file_id) = version.file_id {
                self.session
                    .client()
                    .delete_file_version(&marker, &file_id)
                    .await?;
            }
        }
        Ok(())
    }

    async fn delete_file(&self, file: &Path) -> Result<()> {
        let key = file.key().unwrap_or_default();
        let file_id = self.session.file_id_provider().file_id(file).await?;
        self.session
            .client()
            .delete_file_version(key, &file_id)
            .await
    }

    async fn delete_one(&self, path: &Path) -> Result<()> {
        if path.is_root() {
            Err(Error::InvalidPath("Cannot delete the root".to_string()))
        } else if path.is_container() {
            self.delete_bucket(path).await
        } else if path.is_directory() {
            self.delete_directory(path).await
        } else {
            self.delete_file(path).await
        }
    }
}

#[async_trait]
impl Delete for B2DeleteFeature<'_> {
    async fn delete(
        &self,
        files: &[Path],
        _prompt: &dyn LoginCallback,
        callback: &dyn DeleteCallback,
    ) -> Result<DeleteReport> {
        self.session.ensure_authenticated()?;
        let (containers, others): (Vec<&Path>, Vec<&Path>) =
            files.iter().partition(|p| p.is_container());
        let mut report = DeleteReport::new();
        for path in others.into_iter().chain(containers) {
            callback.delete(path);
            let result = self.delete_one(path).await;
            match &result {
                Ok(()) => tracing::debug!(path = %path, version = ?path.attributes().version_id, "Deleted"),
                Err(e) => tracing::warn!(path = %path, error = %e, "Delete failed"),
            }
            report.record(path.clone(), result);
        }
        Ok(report)
    }
}
