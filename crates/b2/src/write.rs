//! B2 upload feature
//!
//! Bytes are buffered in the output stream and sent with a single
//! `b2_upload_file` call when the stream is closed.

use async_trait::async_trait;
use bytes::Bytes;
use duck_core::{
    Checksum, ChecksumCompute, CompletedTransfer, ConnectionCallback, Error, HashAlgorithm, Path,
    PathAttributes, Result, Session, StatusOutputStream, TransferStatus, Write,
};
use humansize::{DECIMAL, format_size};

use crate::client::{B2UploadUrl, UploadRequest};
use crate::protocol::DEFAULT_CONTENT_TYPE;
use crate::session::B2Session;

pub struct B2WriteFeature<'a> {
    session: &'a B2Session,
}

impl<'a> B2WriteFeature<'a> {
    pub fn new(session: &'a B2Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Write for B2WriteFeature<'_> {
    async fn write<'a>(
        &'a self,
        file: &Path,
        status: TransferStatus,
        callback: &dyn ConnectionCallback,
    ) -> Result<Box<dyn StatusOutputStream + 'a>> {
        self.session.ensure_authenticated()?;
        let key = file
            .key()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::InvalidPath(format!("Cannot write to {file}")))?
            .to_string();
        let bucket_id = self.session.file_id_provider().bucket_id(file).await?;
        let url = self.session.client().get_upload_url(&bucket_id).await?;
        if !url.upload_url.starts_with("https://") {
            callback.warn(
                self.session.host(),
                "Unsecured connection",
                &format!("The upload of {} is not encrypted", file.name()),
            )?;
        }
        Ok(Box::new(B2OutputStream {
            session: self.session,
            file: file.clone(),
            key,
            url,
            status,
            buffer: Vec::new(),
        }))
    }
}

/// Buffered upload of one file version
pub struct B2OutputStream<'a> {
    session: &'a B2Session,
    file: Path,
    key: String,
    url: B2UploadUrl,
    status: TransferStatus,
    buffer: Vec<u8>,
}

#[async_trait]
impl StatusOutputStream for B2OutputStream<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(buf);
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<CompletedTransfer> {
        let this = *self;
        if let Some(expected) = this
            .status
            .checksum()
            .filter(|c| c.algorithm != HashAlgorithm::Sha1)
        {
            verify_local(expected, &this.buffer)?;
        }
        // B2 only verifies SHA-1
        let declared = this
            .status
            .checksum()
            .filter(|c| c.algorithm == HashAlgorithm::Sha1)
            .cloned();
        let size = this.buffer.len() as u64;
        tracing::debug!(
            file = %this.file,
            size = %format_size(size, DECIMAL),
            verify = declared.is_some(),
            "Uploading to B2"
        );
        let response = this
            .session
            .client()
            .upload_file(
                &this.url,
                UploadRequest {
                    file_name: this.key,
                    content_type: this
                        .status
                        .mime()
                        .unwrap_or(DEFAULT_CONTENT_TYPE)
                        .to_string(),
                    content_sha1: declared.as_ref().map(|c| c.hash.clone()),
                    data: Bytes::from(this.buffer),
                },
            )
            .await?;

        let reported = response.sha1().and_then(Checksum::parse);
        if let Some(expected) = &declared {
            match &reported {
                Some(actual) if actual == expected => {}
                other => {
                    return Err(Error::Integrity {
                        expected: expected.hash.clone(),
                        actual: other
                            .as_ref()
                            .map(|c| c.hash.clone())
                            .unwrap_or_else(|| "none".to_string()),
                    });
                }
            }
        }

        let mut attributes = PathAttributes::new().with_size(response.content_length);
        attributes.modified = response.uploaded();
        attributes.version_id = response.file_id;
        attributes.checksum = reported;
        Ok(CompletedTransfer::new(this.file, this.status, attributes))
    }

    fn status(&self) -> &TransferStatus {
        &self.status
    }
}

/// Compare `expected` with the digest of the buffered content
fn verify_local(expected: &Checksum, content: &[u8]) -> Result<()> {
    let mut compute = ChecksumCompute::new(expected.algorithm);
    compute.update(content);
    let actual = compute.finish();
    if actual.hash.eq_ignore_ascii_case(&expected.hash) {
        return Ok(());
    }
    tracing::warn!(expected = %expected, actual = %actual, "Checksum mismatch before upload");
    Err(Error::Integrity {
        expected: expected.hash.clone(),
        actual: actual.hash,
    })
}
