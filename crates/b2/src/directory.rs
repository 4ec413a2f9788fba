//! B2 bucket and directory creation

use async_trait::async_trait;
use duck_core::{
    Checksum, DisabledConnectionCallback, Directory, Path, PathAttributes, PathType, Result,
    TransferStatus, Write,
};

use crate::protocol::{BucketType, PLACEHOLDER};
use crate::session::B2Session;
use crate::write::B2WriteFeature;

pub struct B2DirectoryFeature<'a> {
    session: &'a B2Session,
}

impl<'a> B2DirectoryFeature<'a> {
    pub fn new(session: &'a B2Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Directory for B2DirectoryFeature<'_> {
    /// Containers become buckets whose type is taken from `region`, then
    /// the status region, then the session default. Other directories are
    /// created by uploading an empty `.bzEmpty` marker below them.
    async fn mkdir(
        &self,
        folder: &Path,
        region: Option<&str>,
        status: &TransferStatus,
    ) -> Result<Path> {
        self.session.ensure_authenticated()?;
        if folder.is_container() {
            let bucket_type = match region.or(status.region()) {
                Some(region) => region.parse::<BucketType>()?,
                None => self.session.options().bucket_type,
            };
            let bucket = self
                .session
                .client()
                .create_bucket(folder.name(), bucket_type.as_str())
                .await?;
            tracing::debug!(bucket = %bucket.bucket_name, bucket_type = %bucket.bucket_type, "Created bucket");
            return Ok(Path::new(folder.absolute(), PathType::DIRECTORY | PathType::VOLUME)
                .with_attributes(PathAttributes::new().with_region(bucket.bucket_type)));
        }
        let marker = folder.child(PLACEHOLDER, PathType::FILE);
        let status = TransferStatus::new()
            .with_length(0)
            .with_checksum(Checksum::sha1(&[]));
        let writer = B2WriteFeature::new(self.session);
        let out = writer
            .write(&marker, status, &DisabledConnectionCallback)
            .await?;
        out.close().await?;
        tracing::debug!(directory = %folder, "Created directory marker");
        Ok(Path::new(folder.absolute(), PathType::DIRECTORY))
    }
}
