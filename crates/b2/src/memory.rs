//! In-memory B2 client
//!
//! Keeps buckets and file versions in process and answers with the same
//! ordering, pagination and error behavior as the B2 service. Used for
//! offline sessions and tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use duck_core::{Checksum, Error, Result};
use jiff::Timestamp;

use crate::client::{
    Action, B2Account, B2Bucket, B2Client, B2FileInfo, B2UploadUrl, ListFileVersionsRequest,
    ListFileVersionsResponse, UploadRequest,
};
use crate::protocol::BucketType;

const ACCOUNT_ID: &str = "memory-account";

#[derive(Debug)]
struct Bucket {
    id: String,
    bucket_type: String,
    /// Versions in insertion order
    versions: Vec<B2FileInfo>,
}

#[derive(Debug, Default)]
struct State {
    keys: BTreeMap<String, String>,
    authorized: bool,
    offline: bool,
    upload_scheme: Option<String>,
    buckets: BTreeMap<String, Bucket>,
    sequence: u64,
    epoch_ms: i64,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.sequence += 1;
        format!("{prefix}_{:012}", self.sequence)
    }

    /// Strictly increasing upload timestamps
    fn next_timestamp(&mut self) -> i64 {
        self.sequence += 1;
        self.epoch_ms + self.sequence as i64
    }

    fn bucket_by_id(&mut self, bucket_id: &str) -> Result<&mut Bucket> {
        self.buckets
            .values_mut()
            .find(|b| b.id == bucket_id)
            .ok_or_else(|| Error::NotFound(format!("Bucket {bucket_id} does not exist")))
    }
}

/// B2 client backed by process memory
#[derive(Debug)]
pub struct MemoryB2Client {
    state: Mutex<State>,
}

impl Default for MemoryB2Client {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryB2Client {
    pub fn new() -> Self {
        let epoch_ms = Timestamp::now().as_millisecond();
        Self {
            state: Mutex::new(State {
                epoch_ms,
                ..State::default()
            }),
        }
    }

    /// Accept `application_key` for `key_id`
    pub fn with_account(self, key_id: &str, application_key: &str) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state
                .keys
                .insert(key_id.to_string(), application_key.to_string());
        }
        self
    }

    /// Hand out upload URLs with another scheme, e.g. `http`
    pub fn with_upload_scheme(self, scheme: &str) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.upload_scheme = Some(scheme.to_string());
        }
        self
    }

    /// Fail every call with a connectivity error while offline
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.offline = offline;
        }
    }

    /// Number of stored versions across all buckets
    pub fn version_count(&self) -> usize {
        self.state
            .lock()
            .map(|s| s.buckets.values().map(|b| b.versions.len()).sum())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        let state = self
            .state
            .lock()
            .map_err(|_| Error::General("B2 state lock poisoned".to_string()))?;
        if state.offline {
            return Err(Error::Connectivity(
                "Connection refused: api.backblazeb2.com".to_string(),
            ));
        }
        Ok(state)
    }

    fn authorized(&self) -> Result<MutexGuard<'_, State>> {
        let state = self.lock()?;
        if !state.authorized {
            return Err(Error::login_failure("Login failed", "Invalid authorization token"));
        }
        Ok(state)
    }
}

/// All versions of a bucket in listing order: by name, newest first
fn sorted_versions(bucket: &Bucket) -> Vec<B2FileInfo> {
    let mut versions = bucket.versions.clone();
    versions.sort_by(|a, b| {
        a.file_name
            .cmp(&b.file_name)
            .then_with(|| b.upload_timestamp.cmp(&a.upload_timestamp))
    });
    versions
}

/// Collapse versions below a delimiter into one folder entry each
fn collapse_folders(versions: Vec<B2FileInfo>, prefix: &str, delimiter: &str) -> Vec<B2FileInfo> {
    let mut entries: Vec<B2FileInfo> = Vec::with_capacity(versions.len());
    for version in versions {
        let remainder = &version.file_name[prefix.len()..];
        match remainder.find(delimiter) {
            Some(index) => {
                let folder = format!("{prefix}{}", &remainder[..index + delimiter.len()]);
                if entries.last().is_some_and(|last| last.file_name == folder) {
                    continue;
                }
                entries.push(B2FileInfo {
                    file_id: None,
                    file_name: folder,
                    action: Action::Folder,
                    content_length: 0,
                    content_sha1: None,
                    content_type: None,
                    upload_timestamp: 0,
                });
            }
            None => entries.push(version),
        }
    }
    entries
}

#[async_trait]
impl B2Client for MemoryB2Client {
    async fn authorize_account(&self, key_id: &str, application_key: &str) -> Result<B2Account> {
        let mut state = self.lock()?;
        if state.keys.get(key_id).map(String::as_str) != Some(application_key) {
            state.authorized = false;
            return Err(Error::login_failure("Login failed", "Invalid accountId or applicationKeyId"));
        }
        state.authorized = true;
        let token = state.next_id("token");
        Ok(B2Account {
            account_id: ACCOUNT_ID.to_string(),
            authorization_token: token,
            api_url: "https://api000.backblazeb2.com".to_string(),
            download_url: "https://f000.backblazeb2.com".to_string(),
            recommended_part_size: Some(100_000_000),
        })
    }

    async fn list_buckets(&self) -> Result<Vec<B2Bucket>> {
        let state = self.authorized()?;
        Ok(state
            .buckets
            .iter()
            .map(|(name, bucket)| B2Bucket {
                bucket_id: bucket.id.clone(),
                bucket_name: name.clone(),
                bucket_type: bucket.bucket_type.clone(),
            })
            .collect())
    }

    async fn create_bucket(&self, bucket_name: &str, bucket_type: &str) -> Result<B2Bucket> {
        let mut state = self.authorized()?;
        bucket_type.parse::<BucketType>()?;
        let valid_name = (6..=50).contains(&bucket_name.len())
            && bucket_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid_name {
            return Err(Error::InvalidPath(format!("Invalid bucket name {bucket_name}")));
        }
        if state.buckets.contains_key(bucket_name) {
            return Err(Error::Conflict(format!("Bucket name is already in use: {bucket_name}")));
        }
        let id = state.next_id("bucket");
        state.buckets.insert(
            bucket_name.to_string(),
            Bucket {
                id: id.clone(),
                bucket_type: bucket_type.to_string(),
                versions: Vec::new(),
            },
        );
        Ok(B2Bucket {
            bucket_id: id,
            bucket_name: bucket_name.to_string(),
            bucket_type: bucket_type.to_string(),
        })
    }

    async fn delete_bucket(&self, bucket_id: &str) -> Result<B2Bucket> {
        let mut state = self.authorized()?;
        let name = state
            .buckets
            .iter()
            .find(|(_, b)| b.id == bucket_id)
            .map(|(name, _)| name.clone())
            .ok_or_else(|| Error::NotFound(format!("Bucket {bucket_id} does not exist")))?;
        if state.buckets.get(&name).is_some_and(|b| !b.versions.is_empty()) {
            return Err(Error::Conflict(format!("Cannot delete non-empty bucket {name}")));
        }
        let bucket = state
            .buckets
            .remove(&name)
            .ok_or_else(|| Error::NotFound(format!("Bucket {bucket_id} does not exist")))?;
        Ok(B2Bucket {
            bucket_id: bucket.id,
            bucket_name: name,
            bucket_type: bucket.bucket_type,
        })
    }

    async fn list_file_versions(
        &self,
        request: &ListFileVersionsRequest,
    ) -> Result<ListFileVersionsResponse> {
        let mut state = self.authorized()?;
        let bucket = state.bucket_by_id(&request.bucket_id)?;
        let prefix = request.prefix.as_deref().unwrap_or_default();
        let versions: Vec<B2FileInfo> = sorted_versions(bucket)
            .into_iter()
            .filter(|v| v.file_name.starts_with(prefix))
            .collect();
        let entries = match request.delimiter.as_deref() {
            Some(delimiter) if !delimiter.is_empty() => collapse_folders(versions, prefix, delimiter),
            _ => versions,
        };

        let start = match request.start_file_name.as_deref() {
            None => 0,
            Some(name) => {
                let exact = request.start_file_id.as_deref().and_then(|id| {
                    entries
                        .iter()
                        .position(|e| e.file_name == name && e.file_id.as_deref() == Some(id))
                });
                exact.unwrap_or_else(|| {
                    entries
                        .iter()
                        .position(|e| e.file_name.as_str() >= name)
                        .unwrap_or(entries.len())
                })
            }
        };
        let count = request.max_file_count.max(1) as usize;
        let end = (start + count).min(entries.len());
        let next = entries.get(end);
        Ok(ListFileVersionsResponse {
            files: entries[start..end].to_vec(),
            next_file_name: next.map(|e| e.file_name.clone()),
            next_file_id: next.and_then(|e| e.file_id.clone()),
        })
    }

    async fn get_upload_url(&self, bucket_id: &str) -> Result<B2UploadUrl> {
        let mut state = self.authorized()?;
        state.bucket_by_id(bucket_id)?;
        let scheme = state.upload_scheme.clone().unwrap_or_else(|| "https".to_string());
        let token = state.next_id("upload");
        Ok(B2UploadUrl {
            bucket_id: bucket_id.to_string(),
            upload_url: format!("{scheme}://pod-000-1000-00.backblaze.com/b2api/v2/b2_upload_file/{bucket_id}"),
            authorization_token: token,
        })
    }

    async fn upload_file(&self, url: &B2UploadUrl, request: UploadRequest) -> Result<B2FileInfo> {
        let mut state = self.authorized()?;
        let actual = Checksum::sha1(&request.data);
        if let Some(expected) = &request.content_sha1
            && !expected.eq_ignore_ascii_case(&actual.hash)
        {
            return Err(Error::Integrity {
                expected: expected.clone(),
                actual: actual.hash,
            });
        }
        let id = state.next_id("4_z");
        let timestamp = state.next_timestamp();
        let info = B2FileInfo {
            file_id: Some(id),
            file_name: request.file_name,
            action: Action::Upload,
            content_length: request.data.len() as u64,
            content_sha1: Some(actual.hash),
            content_type: Some(request.content_type),
            upload_timestamp: timestamp,
        };
        state.bucket_by_id(&url.bucket_id)?.versions.push(info.clone());
        Ok(info)
    }

    async fn hide_file(&self, bucket_id: &str, file_name: &str) -> Result<B2FileInfo> {
        let mut state = self.authorized()?;
        let id = state.next_id("4_z");
        let timestamp = state.next_timestamp();
        let bucket = state.bucket_by_id(bucket_id)?;
        if !bucket.versions.iter().any(|v| v.file_name == file_name) {
            return Err(Error::NotFound(format!("File not present: {file_name}")));
        }
        let info = B2FileInfo {
            file_id: Some(id),
            file_name: file_name.to_string(),
            action: Action::Hide,
            content_length: 0,
            content_sha1: None,
            content_type: None,
            upload_timestamp: timestamp,
        };
        bucket.versions.push(info.clone());
        Ok(info)
    }

    async fn delete_file_version(&self, file_name: &str, file_id: &str) -> Result<()> {
        let mut state = self.authorized()?;
        for bucket in state.buckets.values_mut() {
            if let Some(index) = bucket
                .versions
                .iter()
                .position(|v| v.file_name == file_name && v.file_id.as_deref() == Some(file_id))
            {
                bucket.versions.remove(index);
                return Ok(());
            }
        }
        Err(Error::NotFound(format!("File not present: {file_name} {file_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    async fn client() -> (MemoryB2Client, String) {
        let client = MemoryB2Client::new().with_account("key", "secret");
        client.authorize_account("key", "secret").await.unwrap();
        let bucket = client.create_bucket("test-bucket", "allPrivate").await.unwrap();
        (client, bucket.bucket_id)
    }

    async fn upload(client: &MemoryB2Client, bucket_id: &str, name: &str, data: &'static [u8]) -> B2FileInfo {
        let url = client.get_upload_url(bucket_id).await.unwrap();
        client
            .upload_file(
                &url,
                UploadRequest {
                    file_name: name.to_string(),
                    content_type: "text/plain".to_string(),
                    content_sha1: None,
                    data: Bytes::from_static(data),
                },
            )
            .await
            .unwrap()
    }

    fn names(response: &ListFileVersionsResponse) -> Vec<&str> {
        response.files.iter().map(|f| f.file_name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_rejects_invalid_key() {
        let client = MemoryB2Client::new().with_account("key", "secret");
        let err = client.authorize_account("key", "wrong").await.unwrap_err();
        assert!(err.is_login_failure());
        assert!(client.list_buckets().await.unwrap_err().is_login_failure());
    }

    #[tokio::test]
    async fn test_versions_sorted_by_name_newest_first() {
        let (client, bucket_id) = client().await;
        let first = upload(&client, &bucket_id, "b", b"1").await;
        upload(&client, &bucket_id, "a", b"2").await;
        let second = upload(&client, &bucket_id, "b", b"3").await;

        let response = client
            .list_file_versions(&ListFileVersionsRequest {
                bucket_id: bucket_id.clone(),
                max_file_count: 100,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(names(&response), vec!["a", "b", "b"]);
        assert_eq!(response.files[1].file_id, second.file_id);
        assert_eq!(response.files[2].file_id, first.file_id);
        assert!(response.next_file_name.is_none());
    }

    #[tokio::test]
    async fn test_pagination_resumes_at_next_version() {
        let (client, bucket_id) = client().await;
        upload(&client, &bucket_id, "a", b"1").await;
        upload(&client, &bucket_id, "a", b"2").await;
        upload(&client, &bucket_id, "b", b"3").await;

        let mut request = ListFileVersionsRequest {
            bucket_id,
            max_file_count: 1,
            ..Default::default()
        };
        let mut seen = Vec::new();
        loop {
            let page = client.list_file_versions(&request).await.unwrap();
            assert!(page.files.len() <= 1);
            seen.extend(page.files.iter().map(|f| f.file_id.clone()));
            match page.next_file_name {
                Some(name) => {
                    request.start_file_name = Some(name);
                    request.start_file_id = page.next_file_id;
                }
                None => break,
            }
        }
        assert_eq!(seen.len(), 3);
        seen.dedup();
        assert_eq!(seen.len(), 3);
    }

    #[tokio::test]
    async fn test_delimiter_collapses_folders() {
        let (client, bucket_id) = client().await;
        upload(&client, &bucket_id, "dir/a", b"1").await;
        upload(&client, &bucket_id, "dir/b", b"1").await;
        upload(&client, &bucket_id, "dir/sub/c", b"1").await;
        upload(&client, &bucket_id, "file", b"1").await;

        let response = client
            .list_file_versions(&ListFileVersionsRequest {
                bucket_id: bucket_id.clone(),
                max_file_count: 100,
                delimiter: Some("/".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(names(&response), vec!["dir/", "file"]);
        assert_eq!(response.files[0].action, Action::Folder);

        let nested = client
            .list_file_versions(&ListFileVersionsRequest {
                bucket_id,
                max_file_count: 100,
                prefix: Some("dir/".into()),
                delimiter: Some("/".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(names(&nested), vec!["dir/a", "dir/b", "dir/sub/"]);
    }

    #[tokio::test]
    async fn test_upload_checks_declared_sha1() {
        let (client, bucket_id) = client().await;
        let url = client.get_upload_url(&bucket_id).await.unwrap();
        let err = client
            .upload_file(
                &url,
                UploadRequest {
                    file_name: "f".into(),
                    content_type: "text/plain".into(),
                    content_sha1: Some(Checksum::sha1(b"other").hash),
                    data: Bytes::from_static(b"content"),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Integrity { .. }));
        assert_eq!(client.version_count(), 0);
    }

    #[tokio::test]
    async fn test_bucket_lifecycle() {
        let (client, bucket_id) = client().await;
        assert!(matches!(
            client.create_bucket("test-bucket", "allPrivate").await,
            Err(Error::Conflict(_))
        ));
        assert!(client.create_bucket("bad", "allPrivate").await.is_err());
        assert!(client.create_bucket("other-bucket", "snapshot").await.is_err());

        let file = upload(&client, &bucket_id, "f", b"1").await;
        assert!(matches!(
            client.delete_bucket(&bucket_id).await,
            Err(Error::Conflict(_))
        ));
        client
            .delete_file_version("f", file.file_id.as_deref().unwrap())
            .await
            .unwrap();
        client.delete_bucket(&bucket_id).await.unwrap();
        assert!(client.list_buckets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_offline() {
        let (client, _) = client().await;
        client.set_offline(true);
        assert!(matches!(
            client.list_buckets().await,
            Err(Error::Connectivity(_))
        ));
        client.set_offline(false);
        assert_eq!(client.list_buckets().await.unwrap().len(), 1);
    }
}
