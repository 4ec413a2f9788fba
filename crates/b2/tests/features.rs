//! Write, directory, touch and delete features of the B2 backend

use std::sync::{Arc, Mutex};

use duck_b2::{B2Session, MemoryB2Client, PLACEHOLDER, protocol};
use duck_core::{
    Checksum, Credentials, DeleteCallback, DisabledCancelCallback, DisabledConnectionCallback,
    DisabledDeleteCallback, DisabledHostKeyCallback, DisabledListProgressListener,
    DisabledLoginCallback, DisabledPasswordStore, Error, Host, Path, PathType, Session,
    TransferStatus,
};

async fn session() -> (Arc<MemoryB2Client>, B2Session) {
    let client = Arc::new(MemoryB2Client::new().with_account("key-id", "app-key"));
    let host = Host::with_default_hostname(protocol(), Credentials::new("key-id", "app-key"));
    let mut session = B2Session::new(host, client.clone());
    session.open(&DisabledHostKeyCallback).await.unwrap();
    session
        .login(&DisabledPasswordStore, &DisabledLoginCallback, &DisabledCancelCallback)
        .await
        .unwrap();
    (client, session)
}

async fn bucket(session: &B2Session) -> Path {
    session
        .directory()
        .unwrap()
        .mkdir(
            &Path::new("/test-bucket", PathType::DIRECTORY | PathType::VOLUME),
            None,
            &TransferStatus::new(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_write_then_list() {
    let (_, session) = session().await;
    let bucket = bucket(&session).await;
    let file = bucket.child("dir/file.txt", PathType::FILE);
    let content = b"Hello, B2!";
    let checksum = Checksum::sha1(content);

    let feature = session.write().unwrap();
    let mut out = feature
        .write(
            &file,
            TransferStatus::new()
                .with_length(content.len() as u64)
                .with_checksum(checksum.clone())
                .with_mime("text/plain"),
            &DisabledConnectionCallback,
        )
        .await
        .unwrap();
    out.write(&content[..5]).await.unwrap();
    out.write(&content[5..]).await.unwrap();
    assert_eq!(out.status().length(), Some(content.len() as u64));
    let transfer = out.close().await.unwrap();
    assert!(transfer.version_id().is_some());
    assert_eq!(transfer.response().checksum.as_ref(), Some(&checksum));

    let listing = session
        .list_service()
        .unwrap()
        .list(&file.parent().unwrap(), &DisabledListProgressListener)
        .await
        .unwrap();
    let entry = listing.get(&transfer.path()).unwrap();
    assert_eq!(entry, &file);
    assert_eq!(entry.attributes().revision, Some(1));
    assert_eq!(entry.attributes().size, content.len() as u64);
    assert_eq!(entry.attributes().checksum.as_ref(), Some(&checksum));
}

#[tokio::test]
async fn test_write_with_wrong_checksum_fails() {
    let (client, session) = session().await;
    let bucket = bucket(&session).await;
    let feature = session.write().unwrap();
    let mut out = feature
        .write(
            &bucket.child("file", PathType::FILE),
            TransferStatus::new().with_checksum(Checksum::sha1(b"something else")),
            &DisabledConnectionCallback,
        )
        .await
        .unwrap();
    out.write(b"content").await.unwrap();
    assert!(matches!(out.close().await, Err(Error::Integrity { .. })));
    assert_eq!(client.version_count(), 0);
}

#[tokio::test]
async fn test_write_with_wrong_sha256_uploads_nothing() {
    let (client, session) = session().await;
    let bucket = bucket(&session).await;
    let feature = session.write().unwrap();
    let mut out = feature
        .write(
            &bucket.child("file", PathType::FILE),
            TransferStatus::new().with_checksum(Checksum::sha256(b"something else")),
            &DisabledConnectionCallback,
        )
        .await
        .unwrap();
    out.write(b"content").await.unwrap();
    assert!(matches!(out.close().await, Err(Error::Integrity { .. })));
    assert_eq!(client.version_count(), 0);
}

#[tokio::test]
async fn test_write_with_sha256_stores_revision() {
    let (client, session) = session().await;
    let bucket = bucket(&session).await;
    let feature = session.write().unwrap();
    let mut out = feature
        .write(
            &bucket.child("file", PathType::FILE),
            TransferStatus::new().with_checksum(Checksum::sha256(b"content")),
            &DisabledConnectionCallback,
        )
        .await
        .unwrap();
    out.write(b"content").await.unwrap();
    let transfer = out.close().await.unwrap();
    assert!(transfer.version_id().is_some());
    assert_eq!(
        transfer.response().checksum.as_ref(),
        Some(&Checksum::sha1(b"content"))
    );
    assert_eq!(client.version_count(), 1);
}

#[tokio::test]
async fn test_dropped_stream_uploads_nothing() {
    let (client, session) = session().await;
    let bucket = bucket(&session).await;
    let feature = session.write().unwrap();
    let mut out = feature
        .write(
            &bucket.child("file", PathType::FILE),
            TransferStatus::new(),
            &DisabledConnectionCallback,
        )
        .await
        .unwrap();
    out.write(b"content").await.unwrap();
    drop(out);
    assert_eq!(client.version_count(), 0);
}

#[tokio::test]
async fn test_mkdir_creates_marker() {
    let (client, session) = session().await;
    let bucket = bucket(&session).await;
    let folder = session
        .directory()
        .unwrap()
        .mkdir(&bucket.child("folder", PathType::DIRECTORY), None, &TransferStatus::new())
        .await
        .unwrap();
    assert!(folder.is_directory());
    assert!(!folder.is_placeholder());
    assert!(folder.attributes().version_id.is_none());
    assert_eq!(client.version_count(), 1);

    let provider = session.file_id_provider();
    let bucket_id = provider.bucket_id(&bucket).await.unwrap();
    let markers = provider
        .versions(&bucket_id, &format!("folder/{PLACEHOLDER}"))
        .await
        .unwrap();
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].content_length, 0);
}

#[tokio::test]
async fn test_mkdir_bucket_type_from_region() {
    let (_, session) = session().await;
    let directory = session.directory().unwrap();
    let public = directory
        .mkdir(
            &Path::new("/public-bucket", PathType::DIRECTORY | PathType::VOLUME),
            Some("allPublic"),
            &TransferStatus::new(),
        )
        .await
        .unwrap();
    assert_eq!(public.attributes().region.as_deref(), Some("allPublic"));
    assert!(public.is_volume());

    let invalid = directory
        .mkdir(
            &Path::new("/other-bucket", PathType::DIRECTORY | PathType::VOLUME),
            Some("snapshot"),
            &TransferStatus::new(),
        )
        .await;
    assert!(matches!(invalid, Err(Error::Config(_))));

    let duplicate = directory
        .mkdir(
            &Path::new("/public-bucket", PathType::DIRECTORY | PathType::VOLUME),
            None,
            &TransferStatus::new(),
        )
        .await;
    assert!(matches!(duplicate, Err(Error::Conflict(_))));
}

#[tokio::test]
async fn test_touch_returns_version() {
    let (_, session) = session().await;
    let bucket = bucket(&session).await;
    let file = session
        .touch()
        .unwrap()
        .touch(&bucket.child("empty", PathType::FILE), &TransferStatus::new())
        .await
        .unwrap();
    assert!(file.is_file());
    assert_eq!(file.attributes().size, 0);
    assert!(file.attributes().version_id.is_some());

    let touch_bucket = session
        .touch()
        .unwrap()
        .touch(&bucket, &TransferStatus::new())
        .await;
    assert!(matches!(touch_bucket, Err(Error::InvalidPath(_))));
}

#[derive(Default)]
struct RecordingCallback {
    deleted: Mutex<Vec<String>>,
}

impl DeleteCallback for RecordingCallback {
    fn delete(&self, file: &Path) {
        if let Ok(mut deleted) = self.deleted.lock() {
            deleted.push(file.absolute().to_string());
        }
    }
}

#[tokio::test]
async fn test_delete_partial_failure_continues() {
    let (_, session) = session().await;
    let bucket = bucket(&session).await;
    let touch = session.touch().unwrap();
    let a = touch
        .touch(&bucket.child("a", PathType::FILE), &TransferStatus::new())
        .await
        .unwrap();
    let missing = bucket.child("missing", PathType::FILE);
    let synthetic = bucket.child("synthetic", PathType::DIRECTORY | PathType::PLACEHOLDER);
    let b = touch
        .touch(&bucket.child("b", PathType::FILE), &TransferStatus::new())
        .await
        .unwrap();

    let callback = RecordingCallback::default();
    let report = session
        .delete()
        .unwrap()
        .delete(
            &[bucket.clone(), a.clone(), missing.clone(), synthetic.clone(), b.clone()],
            &DisabledLoginCallback,
            &callback,
        )
        .await
        .unwrap();

    assert!(!report.is_success());
    let deleted: Vec<&Path> = report.deleted().collect();
    assert_eq!(deleted, vec![&a, &b, &bucket]);
    let failures: Vec<(&Path, &Error)> = report.failures().collect();
    assert_eq!(failures.len(), 2);
    assert!(failures.iter().all(|(_, e)| e.is_not_found()));
    assert_eq!(
        *callback.deleted.lock().unwrap(),
        vec![
            "/test-bucket/a",
            "/test-bucket/missing",
            "/test-bucket/synthetic",
            "/test-bucket/b",
            "/test-bucket",
        ]
    );

    let root = session
        .list_service()
        .unwrap()
        .list(&Path::root(), &DisabledListProgressListener)
        .await
        .unwrap();
    assert!(!root.contains(&bucket));
}

#[tokio::test]
async fn test_delete_non_empty_bucket_conflicts() {
    let (_, session) = session().await;
    let bucket = bucket(&session).await;
    session
        .touch()
        .unwrap()
        .touch(&bucket.child("a", PathType::FILE), &TransferStatus::new())
        .await
        .unwrap();
    let report = session
        .delete()
        .unwrap()
        .delete(&[bucket], &DisabledLoginCallback, &DisabledDeleteCallback)
        .await
        .unwrap();
    assert!(matches!(report.into_result(), Err(Error::Conflict(_))));
}

#[tokio::test]
async fn test_features_require_login() {
    let client = Arc::new(MemoryB2Client::new().with_account("key-id", "app-key"));
    let host = Host::with_default_hostname(protocol(), Credentials::new("key-id", "app-key"));
    let mut session = B2Session::new(host, client);
    session.open(&DisabledHostKeyCallback).await.unwrap();
    let result = session
        .directory()
        .unwrap()
        .mkdir(
            &Path::new("/test-bucket", PathType::DIRECTORY | PathType::VOLUME),
            None,
            &TransferStatus::new(),
        )
        .await;
    assert!(result.unwrap_err().is_login_failure());
}

#[tokio::test]
async fn test_login_with_wrong_key_fails() {
    let client = Arc::new(MemoryB2Client::new().with_account("key-id", "app-key"));
    let host = Host::with_default_hostname(protocol(), Credentials::new("key-id", "wrong"));
    let mut session = B2Session::new(host, client);
    session.open(&DisabledHostKeyCallback).await.unwrap();
    let err = session
        .login(&DisabledPasswordStore, &DisabledLoginCallback, &DisabledCancelCallback)
        .await
        .unwrap_err();
    assert!(err.is_login_failure());
    assert!(!err.is_canceled());
    assert!(err.detail().unwrap().contains("Please contact"));
}
