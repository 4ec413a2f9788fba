//! Resolution of bucket names and file paths to B2 identifiers

use duck_core::{Error, Path, Result};

use crate::client::{Action, B2Bucket, B2FileInfo, ListFileVersionsRequest};
use crate::session::B2Session;

/// Looks up bucket ids and file version ids for paths
pub struct B2FileIdProvider<'a> {
    session: &'a B2Session,
}

impl<'a> B2FileIdProvider<'a> {
    pub fn new(session: &'a B2Session) -> Self {
        Self { session }
    }

    /// Bucket holding `path`
    pub async fn bucket(&self, path: &Path) -> Result<B2Bucket> {
        let container = path
            .container()
            .ok_or_else(|| Error::InvalidPath("The root is not a bucket".to_string()))?;
        self.session
            .client()
            .list_buckets()
            .await?
            .into_iter()
            .find(|b| b.bucket_name == container.name())
            .ok_or_else(|| Error::NotFound(format!("Bucket {} not found", container.name())))
    }

    pub async fn bucket_id(&self, path: &Path) -> Result<String> {
        Ok(self.bucket(path).await?.bucket_id)
    }

    /// All versions stored under exactly `key`, newest first
    pub async fn versions(&self, bucket_id: &str, key: &str) -> Result<Vec<B2FileInfo>> {
        let chunk_size = self.session.options().chunk_size;
        let mut request = ListFileVersionsRequest {
            bucket_id: bucket_id.to_string(),
            start_file_name: Some(key.to_string()),
            max_file_count: chunk_size,
            prefix: Some(key.to_string()),
            ..Default::default()
        };
        let mut versions = Vec::new();
        loop {
            let page = self.session.client().list_file_versions(&request).await?;
            let past_key = page.files.iter().any(|f| f.file_name != key);
            versions.extend(page.files.into_iter().filter(|f| f.file_name == key));
            match page.next_file_name {
                Some(name) if !past_key && name == key => {
                    request.start_file_name = Some(name);
                    request.start_file_id = page.next_file_id;
                }
                _ => break,
            }
        }
        Ok(versions)
    }

    /// Version id of `file`: the explicit one it carries, otherwise the
    /// latest version unless that is a hide marker.
    pub async fn file_id(&self, file: &Path) -> Result<String> {
        if let Some(version_id) = &file.attributes().version_id {
            return Ok(version_id.clone());
        }
        let key = file
            .key()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::InvalidPath(format!("{file} is not a file")))?;
        let bucket_id = self.bucket_id(file).await?;
        let latest = self.versions(&bucket_id, key).await?.into_iter().next();
        match latest {
            Some(B2FileInfo {
                action: Action::Upload,
                file_id: Some(id),
                ..
            }) => Ok(id),
            _ => Err(Error::NotFound(file.to_string())),
        }
    }
}
