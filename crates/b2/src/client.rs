//! B2 native API client interface
//!
//! [`B2Client`] is the opaque protocol client the features talk to. The
//! request and response types mirror the B2 JSON API (v2). Implementations
//! keep the account authorization obtained by `authorize_account` and use
//! it for every later call.

use async_trait::async_trait;
use bytes::Bytes;
use duck_core::{Error, Result};
use http::StatusCode;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Account authorization returned by `b2_authorize_account`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct B2Account {
    pub account_id: String,
    pub authorization_token: String,
    pub api_url: String,
    pub download_url: String,
    #[serde(default)]
    pub recommended_part_size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct B2Bucket {
    pub bucket_id: String,
    pub bucket_name: String,
    pub bucket_type: String,
}

/// Kind of a file version entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Uploaded content
    Upload,
    /// Marker hiding older versions
    Hide,
    /// Common prefix of a delimiter listing
    Folder,
    /// Unfinished large file
    Start,
}

/// One file version as returned by listing and upload calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct B2FileInfo {
    /// Absent for folder entries
    #[serde(default)]
    pub file_id: Option<String>,
    pub file_name: String,
    pub action: Action,
    #[serde(default)]
    pub content_length: u64,
    #[serde(default)]
    pub content_sha1: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    /// Milliseconds since the epoch
    #[serde(default)]
    pub upload_timestamp: i64,
}

impl B2FileInfo {
    pub fn uploaded(&self) -> Option<Timestamp> {
        Timestamp::from_millisecond(self.upload_timestamp).ok()
    }

    /// Hex SHA-1 digest, without the `unverified:` prefix B2 puts on
    /// digests it did not check. `None` when B2 reports no digest.
    pub fn sha1(&self) -> Option<&str> {
        let sha1 = self.content_sha1.as_deref()?;
        let sha1 = sha1.strip_prefix("unverified:").unwrap_or(sha1);
        (sha1 != "none").then_some(sha1)
    }
}

/// Parameters of `b2_list_file_versions`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFileVersionsRequest {
    pub bucket_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_file_id: Option<String>,
    pub max_file_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFileVersionsResponse {
    pub files: Vec<B2FileInfo>,
    #[serde(default)]
    pub next_file_name: Option<String>,
    #[serde(default)]
    pub next_file_id: Option<String>,
}

/// Target of an upload, valid for one upload at a time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct B2UploadUrl {
    pub bucket_id: String,
    pub upload_url: String,
    pub authorization_token: String,
}

/// Content and headers of `b2_upload_file`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file_name: String,
    pub content_type: String,
    /// Hex SHA-1 to verify against, `None` to skip verification
    pub content_sha1: Option<String>,
    pub data: Bytes,
}

/// Error body of a failed B2 call
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct B2ErrorResponse {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Map a B2 error response to the error taxonomy
pub fn map_b2_error(status: StatusCode, error: &B2ErrorResponse) -> Error {
    let message = if error.message.is_empty() {
        error.code.as_str()
    } else {
        error.message.as_str()
    };
    match (status, error.code.as_str()) {
        (StatusCode::UNAUTHORIZED, _) | (_, "bad_auth_token" | "expired_auth_token" | "unauthorized") => {
            Error::login_failure("Login failed", message)
        }
        (_, "duplicate_bucket_name" | "cannot_delete_non_empty_bucket") => {
            Error::Conflict(message.to_string())
        }
        (StatusCode::NOT_FOUND, _) | (_, "not_found" | "file_not_present" | "no_such_file") => {
            Error::NotFound(message.to_string())
        }
        (StatusCode::BAD_REQUEST, _) if message.contains("Sha1 did not match") => {
            Error::Integrity {
                expected: "declared SHA-1".to_string(),
                actual: message.to_string(),
            }
        }
        (s, _) if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => {
            Error::Connectivity(format!("{} {message}", s.as_u16()))
        }
        (s, code) => Error::General(format!("{} {code}: {message}", s.as_u16())),
    }
}

/// Protocol client for the B2 native API
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait B2Client: Send + Sync {
    /// Authorize with an application key; later calls use the result
    async fn authorize_account(&self, key_id: &str, application_key: &str) -> Result<B2Account>;

    async fn list_buckets(&self) -> Result<Vec<B2Bucket>>;

    async fn create_bucket(&self, bucket_name: &str, bucket_type: &str) -> Result<B2Bucket>;

    /// Fails with [`Error::Conflict`] while the bucket holds file versions
    async fn delete_bucket(&self, bucket_id: &str) -> Result<B2Bucket>;

    /// One page of file versions ordered by name, newest version first
    async fn list_file_versions(
        &self,
        request: &ListFileVersionsRequest,
    ) -> Result<ListFileVersionsResponse>;

    async fn get_upload_url(&self, bucket_id: &str) -> Result<B2UploadUrl>;

    async fn upload_file(&self, url: &B2UploadUrl, request: UploadRequest) -> Result<B2FileInfo>;

    /// Add a hide marker for `file_name`. No feature hides files; this
    /// reproduces hidden revisions written by other B2 clients.
    async fn hide_file(&self, bucket_id: &str, file_name: &str) -> Result<B2FileInfo>;

    async fn delete_file_version(&self, file_name: &str, file_id: &str) -> Result<()>;
}
