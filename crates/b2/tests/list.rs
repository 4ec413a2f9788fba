//! Listing behavior of the B2 backend against the in-memory client

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use duck_b2::{B2Options, B2Session, MemoryB2Client, protocol};
use duck_core::{
    AttributedList, Checksum, Credentials, DisabledCancelCallback, DisabledConnectionCallback,
    DisabledDeleteCallback, DisabledHostKeyCallback, DisabledListProgressListener,
    DisabledLoginCallback, DisabledPasswordStore, Error, Host, ListProgressListener, Path,
    PathType, Session, TransferStatus,
};

async fn session_with(client: Arc<MemoryB2Client>, chunk_size: u32) -> B2Session {
    let host = Host::with_default_hostname(protocol(), Credentials::new("key-id", "app-key"));
    let options = B2Options::default().with_chunk_size(chunk_size);
    let mut session = B2Session::with_options(host, client, options);
    session.open(&DisabledHostKeyCallback).await.unwrap();
    session
        .login(&DisabledPasswordStore, &DisabledLoginCallback, &DisabledCancelCallback)
        .await
        .unwrap();
    session
}

async fn session(chunk_size: u32) -> B2Session {
    let client = Arc::new(MemoryB2Client::new().with_account("key-id", "app-key"));
    session_with(client, chunk_size).await
}

fn bucket() -> Path {
    Path::new("/test-bucket", PathType::DIRECTORY | PathType::VOLUME)
}

async fn mkdir(session: &B2Session, folder: &Path) -> Path {
    session
        .directory()
        .unwrap()
        .mkdir(folder, None, &TransferStatus::new())
        .await
        .unwrap()
}

async fn touch(session: &B2Session, file: &Path) -> Path {
    session
        .touch()
        .unwrap()
        .touch(file, &TransferStatus::new())
        .await
        .unwrap()
}

async fn upload(session: &B2Session, file: &Path, content: &[u8]) -> Path {
    let status = TransferStatus::new()
        .with_length(content.len() as u64)
        .with_checksum(Checksum::sha1(content));
    let feature = session.write().unwrap();
    let mut out = feature
        .write(file, status, &DisabledConnectionCallback)
        .await
        .unwrap();
    out.write(content).await.unwrap();
    out.close().await.unwrap().path()
}

async fn list(session: &B2Session, directory: &Path) -> AttributedList {
    session
        .list_service()
        .unwrap()
        .list(directory, &DisabledListProgressListener)
        .await
        .unwrap()
}

async fn delete(session: &B2Session, files: &[Path]) {
    session
        .delete()
        .unwrap()
        .delete(files, &DisabledLoginCallback, &DisabledDeleteCallback)
        .await
        .unwrap()
        .into_result()
        .unwrap();
}

#[tokio::test]
async fn test_list() {
    let session = session(1000).await;
    let bucket = mkdir(&session, &bucket()).await;
    let file = bucket.child("f", PathType::FILE);
    touch(&session, &file).await;

    let listing = list(&session, &bucket).await;
    let entry = listing.find_simple(&file).unwrap();
    assert_eq!(entry.attributes().revision, Some(1));
    assert_eq!(entry.attributes().size, 0);
    assert!(!entry.attributes().duplicate);

    delete(&session, &[file.clone()]).await;
    assert!(!list(&session, &bucket).await.contains(&file));
    delete(&session, &[bucket.clone()]).await;
    assert!(!list(&session, &Path::root()).await.contains(&bucket));
}

#[tokio::test]
async fn test_list_twice_is_equal() {
    let session = session(2).await;
    let bucket = mkdir(&session, &bucket()).await;
    mkdir(&session, &bucket.child("d", PathType::DIRECTORY)).await;
    touch(&session, &bucket.child("d/nested/f", PathType::FILE)).await;
    upload(&session, &bucket.child("f", PathType::FILE), b"1").await;
    upload(&session, &bucket.child("f", PathType::FILE), b"2").await;

    assert_eq!(list(&session, &bucket).await, list(&session, &bucket).await);
}

#[tokio::test]
async fn test_list_chunking() {
    let session = session(1).await;
    let bucket = mkdir(&session, &bucket()).await;
    let file1 = touch(&session, &bucket.child("a", PathType::FILE)).await;
    let file2 = touch(&session, &bucket.child("b", PathType::FILE)).await;

    let listing = list(&session, &bucket).await;
    assert_eq!(listing.len(), 2);
    assert!(listing.contains(&file1));
    assert!(listing.contains(&file2));

    delete(&session, &[bucket.clone(), file1, file2]).await;
    assert!(list(&session, &Path::root()).await.is_empty());
}

#[tokio::test]
async fn test_list_revisions() {
    let session = session(1000).await;
    let bucket = mkdir(&session, &bucket()).await;
    let name = bucket.child("versioned", PathType::FILE);

    let file1 = upload(&session, &name, b"1").await;
    {
        let listing = list(&session, &bucket).await;
        assert!(listing.contains(&file1));
        let entry = listing.find_simple(&file1).unwrap();
        assert_eq!(entry.attributes().revision, Some(1));
        assert_eq!(entry.attributes().size, 1);
        assert_eq!(entry.parent(), Some(bucket.clone()));
    }

    let file2 = upload(&session, &name, b"2").await;
    {
        let listing = list(&session, &bucket).await;
        assert_eq!(listing.len(), 2);
        let latest = listing.get(&file2).unwrap();
        assert_eq!(latest.attributes().revision, Some(1));
        assert!(!latest.attributes().duplicate);
        let older = listing.get(&file1).unwrap();
        assert_eq!(older.attributes().revision, Some(2));
        assert!(older.attributes().duplicate);
        assert_eq!(older.parent(), Some(bucket.clone()));
        assert_eq!(listing.find_simple(&name), Some(latest));
    }

    delete(&session, &[file1.clone(), file2.clone()]).await;
    {
        let listing = list(&session, &bucket).await;
        assert!(listing.find_simple(&file1).is_none());
        assert!(listing.find_simple(&file2).is_none());
    }
    delete(&session, &[bucket]).await;
}

#[tokio::test]
async fn test_delete_without_version_removes_latest_only() {
    let session = session(1000).await;
    let bucket = mkdir(&session, &bucket()).await;
    let name = bucket.child("versioned", PathType::FILE);
    let file1 = upload(&session, &name, b"1").await;
    let file2 = upload(&session, &name, b"2").await;

    delete(&session, &[name.clone()]).await;
    let listing = list(&session, &bucket).await;
    assert!(!listing.contains(&file2));
    let remaining = listing.get(&file1).unwrap();
    assert_eq!(remaining.attributes().revision, Some(1));
    assert!(!remaining.attributes().duplicate);
}

#[tokio::test]
async fn test_list_folder() {
    let session = session(1000).await;
    let bucket = mkdir(&session, &bucket()).await;
    let folder1 = mkdir(&session, &bucket.child("folder1", PathType::DIRECTORY)).await;
    let folder2 = mkdir(&session, &folder1.child("folder2", PathType::DIRECTORY)).await;
    let file1 = touch(&session, &folder1.child("file1", PathType::FILE)).await;
    let file2 = touch(&session, &folder2.child("file2", PathType::FILE)).await;

    let listing = list(&session, &folder1).await;
    assert_eq!(listing.len(), 2);
    assert!(listing.find_simple(&file1).is_some());
    let folder = listing.find_simple(&folder2).unwrap();
    assert!(!folder.is_placeholder());
    assert!(listing.find_simple(&file2).is_none());
    assert!(listing.find_simple(&folder1).is_none());
    assert_eq!(listing.find_simple(&file1).unwrap().parent(), Some(folder1.clone()));
    assert_eq!(folder.parent(), Some(folder1.clone()));

    delete(&session, &[bucket, folder1, file1, folder2, file2]).await;
}

#[tokio::test]
async fn test_display_folder_in_bucket_missing_placeholder() {
    let session = session(1000).await;
    let bucket = mkdir(&session, &bucket()).await;
    let folder1 = bucket.child("1-d", PathType::DIRECTORY);
    let file1 = folder1.child("2-f", PathType::FILE);
    touch(&session, &file1).await;

    let listing = list(&session, &bucket).await;
    assert_eq!(listing.len(), 1);
    let entry = listing.first().unwrap();
    assert_eq!(entry, &folder1);
    assert!(entry.is_directory());
    assert!(entry.is_placeholder());

    delete(&session, &[bucket, file1]).await;
}

#[tokio::test]
async fn test_display_folder_in_folder_missing_placeholder() {
    let session = session(1000).await;
    let bucket = mkdir(&session, &bucket()).await;
    let folder1 = bucket.child("1-d", PathType::DIRECTORY);
    let folder2 = folder1.child("2-d", PathType::DIRECTORY);
    let file11 = folder2.child("31-f", PathType::FILE);
    let file12 = folder2.child("32-f", PathType::FILE);
    touch(&session, &file11).await;
    touch(&session, &file12).await;

    let listing = list(&session, &folder1).await;
    assert_eq!(listing.len(), 1);
    let entry = listing.first().unwrap();
    assert_eq!(entry, &folder2);
    assert!(entry.is_placeholder());
    assert_eq!(entry.parent(), Some(folder1.clone()));

    let top = list(&session, &bucket).await;
    assert_eq!(top.len(), 1);
    assert_eq!(top.first(), Some(&folder1));

    delete(&session, &[bucket, file11, file12]).await;
}

#[tokio::test]
async fn test_identical_naming_file_folder() {
    let session = session(1000).await;
    let bucket = mkdir(&session, &bucket()).await;
    let folder1 = mkdir(&session, &bucket.child("same", PathType::DIRECTORY)).await;
    let file1 = touch(&session, &bucket.child("same", PathType::FILE)).await;

    let listing = list(&session, &bucket).await;
    assert_eq!(listing.len(), 2);
    assert!(listing.contains(&file1));
    assert!(listing.contains(&folder1));
    assert!(listing.find_simple(&folder1).unwrap().is_directory());
    assert!(listing.find_simple(&file1).unwrap().is_file());

    delete(&session, &[file1, folder1, bucket]).await;
}

#[tokio::test]
async fn test_hidden_file_is_duplicate() {
    let client = Arc::new(MemoryB2Client::new().with_account("key-id", "app-key"));
    let session = session_with(client.clone(), 1000).await;
    let bucket = mkdir(&session, &bucket()).await;
    let file = upload(&session, &bucket.child("hidden", PathType::FILE), b"x").await;

    let bucket_id = session.file_id_provider().bucket_id(&bucket).await.unwrap();
    duck_b2::B2Client::hide_file(client.as_ref(), &bucket_id, "hidden")
        .await
        .unwrap();

    let listing = list(&session, &bucket).await;
    assert_eq!(listing.len(), 1);
    assert!(listing.get(&file).unwrap().attributes().duplicate);
}

#[tokio::test]
async fn test_list_root_shows_buckets() {
    let session = session(1000).await;
    mkdir(&session, &bucket()).await;
    session
        .directory()
        .unwrap()
        .mkdir(
            &Path::new("/public-bucket", PathType::DIRECTORY | PathType::VOLUME),
            Some("allPublic"),
            &TransferStatus::new(),
        )
        .await
        .unwrap();

    let listing = list(&session, &Path::root()).await;
    assert_eq!(listing.len(), 2);
    let public = listing.find_any("/public-bucket").unwrap();
    assert!(public.is_volume());
    assert_eq!(public.attributes().region.as_deref(), Some("allPublic"));
    assert_eq!(
        listing.find_any("/test-bucket").unwrap().attributes().region.as_deref(),
        Some("allPrivate")
    );
}

#[tokio::test]
async fn test_list_missing_bucket_fails() {
    let session = session(1000).await;
    let result = session
        .list_service()
        .unwrap()
        .list(&bucket(), &DisabledListProgressListener)
        .await;
    assert!(result.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_list_missing_directory_is_empty() {
    let session = session(1000).await;
    let bucket = mkdir(&session, &bucket()).await;
    let listing = list(&session, &bucket.child("missing", PathType::DIRECTORY)).await;
    assert!(listing.is_empty());
}

struct CountingListener {
    chunks: AtomicUsize,
    last: AtomicUsize,
}

impl ListProgressListener for CountingListener {
    fn chunk(&self, _: &Path, count: usize) {
        self.chunks.fetch_add(1, Ordering::SeqCst);
        self.last.store(count, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_progress_reported_per_page() {
    let session = session(1).await;
    let bucket = mkdir(&session, &bucket()).await;
    for name in ["a", "b", "c"] {
        touch(&session, &bucket.child(name, PathType::FILE)).await;
    }
    let listener = CountingListener {
        chunks: AtomicUsize::new(0),
        last: AtomicUsize::new(0),
    };
    let listing = session
        .list_service()
        .unwrap()
        .list(&bucket, &listener)
        .await
        .unwrap();
    assert_eq!(listing.len(), 3);
    assert_eq!(listener.chunks.load(Ordering::SeqCst), 3);
    assert_eq!(listener.last.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_offline_listing_is_connectivity_failure() {
    let client = Arc::new(MemoryB2Client::new().with_account("key-id", "app-key"));
    let session = session_with(client.clone(), 1000).await;
    let bucket = mkdir(&session, &bucket()).await;
    client.set_offline(true);
    let result = session
        .list_service()
        .unwrap()
        .list(&bucket, &DisabledListProgressListener)
        .await;
    assert!(matches!(result, Err(Error::Connectivity(_))));
}

#[tokio::test]
async fn test_list_after_close_fails() {
    let mut session = session(1000).await;
    let bucket = mkdir(&session, &bucket()).await;
    session.close().await.unwrap();
    let result = session
        .list_service()
        .unwrap()
        .list(&bucket, &DisabledListProgressListener)
        .await;
    assert!(matches!(result, Err(Error::Connectivity(_))));
}
