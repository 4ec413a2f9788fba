//! Zero-length file creation on B2

use async_trait::async_trait;
use duck_core::{
    Checksum, DisabledConnectionCallback, Error, Path, Result, Touch, TransferStatus, Write,
};

use crate::session::B2Session;
use crate::write::B2WriteFeature;

pub struct B2TouchFeature<'a> {
    session: &'a B2Session,
}

impl<'a> B2TouchFeature<'a> {
    pub fn new(session: &'a B2Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Touch for B2TouchFeature<'_> {
    async fn touch(&self, file: &Path, status: &TransferStatus) -> Result<Path> {
        if !file.is_file() || file.is_container() {
            return Err(Error::InvalidPath(format!("Cannot touch {file}")));
        }
        let status = status
            .clone()
            .with_length(0)
            .with_checksum(Checksum::sha1(&[]));
        let writer = B2WriteFeature::new(self.session);
        let out = writer
            .write(file, status, &DisabledConnectionCallback)
            .await?;
        Ok(out.close().await?.path())
    }
}
