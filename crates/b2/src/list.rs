//! B2 listing service
//!
//! Lists all versions below the directory's prefix without a delimiter
//! and folds them into direct children with [`ListingBuilder`], so that
//! `.bzEmpty` markers of subdirectories are observed.

use std::cmp::Ordering;

use async_trait::async_trait;
use duck_core::{
    AttributedList, Checksum, ListProgressListener, ListService, ListingBuilder, ObjectKind, Path,
    PathAttributes, PathType, RemoteObject, Result, RevisionOrdering,
};

use crate::client::{Action, B2FileInfo, ListFileVersionsRequest};
use crate::protocol::PLACEHOLDER;
use crate::session::B2Session;

/// Newest upload first. Ties keep the order B2 returned them in.
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadTimestampOrdering;

impl RevisionOrdering for UploadTimestampOrdering {
    fn compare(&self, a: &RemoteObject, b: &RemoteObject) -> Ordering {
        b.modified.cmp(&a.modified)
    }
}

impl From<B2FileInfo> for RemoteObject {
    fn from(info: B2FileInfo) -> Self {
        let kind = match info.action {
            Action::Upload => ObjectKind::File,
            Action::Hide => ObjectKind::Hidden,
            Action::Folder => ObjectKind::Folder,
            Action::Start => ObjectKind::Incomplete,
        };
        RemoteObject {
            checksum: info.sha1().and_then(Checksum::parse),
            modified: info.uploaded(),
            key: info.file_name,
            kind,
            version_id: info.file_id,
            size: info.content_length,
        }
    }
}

pub struct B2ListService<'a> {
    session: &'a B2Session,
}

impl<'a> B2ListService<'a> {
    pub fn new(session: &'a B2Session) -> Self {
        Self { session }
    }

    async fn list_buckets(
        &self,
        directory: &Path,
        listener: &dyn ListProgressListener,
    ) -> Result<AttributedList> {
        let list: AttributedList = self
            .session
            .client()
            .list_buckets()
            .await?
            .into_iter()
            .map(|bucket| {
                directory
                    .child(&bucket.bucket_name, PathType::DIRECTORY | PathType::VOLUME)
                    .with_attributes(PathAttributes::new().with_region(bucket.bucket_type))
            })
            .collect();
        listener.chunk(directory, list.len());
        Ok(list)
    }
}

#[async_trait]
impl ListService for B2ListService<'_> {
    async fn list(
        &self,
        directory: &Path,
        listener: &dyn ListProgressListener,
    ) -> Result<AttributedList> {
        self.session.ensure_authenticated()?;
        if directory.is_root() {
            return self.list_buckets(directory, listener).await;
        }
        let bucket_id = self.session.file_id_provider().bucket_id(directory).await?;
        let prefix = match directory.key() {
            Some(key) if !key.is_empty() => format!("{key}/"),
            _ => String::new(),
        };
        let ordering = UploadTimestampOrdering;
        let mut builder = ListingBuilder::new(directory, prefix.clone(), Some(PLACEHOLDER), &ordering);
        let mut request = ListFileVersionsRequest {
            bucket_id,
            max_file_count: self.session.options().chunk_size,
            prefix: (!prefix.is_empty()).then_some(prefix),
            ..Default::default()
        };
        loop {
            let page = self.session.client().list_file_versions(&request).await?;
            tracing::debug!(
                directory = %directory,
                files = page.files.len(),
                next = ?page.next_file_name,
                "Fetched B2 listing page"
            );
            for file in page.files {
                builder.add(file.into());
            }
            listener.chunk(directory, builder.len());
            match page.next_file_name {
                Some(name) => {
                    request.start_file_name = Some(name);
                    request.start_file_id = page.next_file_id;
                }
                None => break,
            }
        }
        let list = builder.build();
        tracing::debug!(directory = %directory, entries = list.len(), "Listed directory");
        Ok(list)
    }
}
