//! Directory semantics over a flat object store.
//!
//! The store only knows keys. A directory exists when a zero-byte marker
//! object sits at its directory-form key (`a/b/`), or when a non-recursive
//! listing reports it as a common prefix. All prefix matching lives here so
//! no other layer assumes real directory entries.
//!
//! Recursive deletes and moves list first and then act on the listed keys.
//! Objects written under the prefix between those two steps are not seen,
//! and concurrent operations on overlapping prefixes interleave per object.

use crate::{
    models::object::StorageObjectInfo,
    paths::grammar,
    storage::client::{ByteStream, ListedObject, ObjectReader, ObjectStore, StorageResult},
};
use futures::{StreamExt, stream};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Directory-aware access to one bucket of an [`ObjectStore`].
#[derive(Clone)]
pub struct ObjectStoreGateway {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ObjectStoreGateway {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Make sure the bucket exists; called once at startup.
    pub async fn ensure_bucket(&self) -> StorageResult<()> {
        self.store.ensure_bucket(&self.bucket).await
    }

    /// Look up the file or directory at `key`.
    ///
    /// Directory keys are resolved by listing the trimmed key as a prefix and
    /// picking the directory entry carrying the same name. File keys are
    /// stated directly. A missing key is `Ok(None)`.
    pub async fn find_info(&self, key: &str) -> StorageResult<Option<StorageObjectInfo>> {
        if grammar::is_directory(key) {
            let name = grammar::extract_name(key);
            let prefix = grammar::trim_trailing_delimiter(key);
            let listed = self.store.list_objects(&self.bucket, prefix, false).await?;
            return Ok(listed
                .into_iter()
                .find(|entry| entry.is_dir && grammar::extract_name(&entry.key) == name)
                .map(describe));
        }

        match self.store.stat_object(&self.bucket, key).await {
            Ok(stat) => Ok(Some(StorageObjectInfo {
                name: grammar::extract_name(&stat.key).to_string(),
                key: stat.key,
                size: stat.size,
                is_directory: false,
            })),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.find_info(key).await?.is_some())
    }

    /// Write the zero-byte marker recording the directory at `key`.
    pub async fn create_directory(&self, key: &str) -> StorageResult<StorageObjectInfo> {
        debug_assert!(grammar::is_directory(key), "directory keys end with '/'");
        let stat = self
            .store
            .put_object(&self.bucket, key, empty_body(), Some(0))
            .await?;
        debug!("created directory marker {}", stat.key);
        Ok(StorageObjectInfo {
            name: grammar::extract_name(&stat.key).to_string(),
            key: stat.key,
            size: 0,
            is_directory: true,
        })
    }

    /// Stream a file body to `key`.
    pub async fn put_file(
        &self,
        key: &str,
        body: ByteStream<'_>,
        length: Option<u64>,
    ) -> StorageResult<StorageObjectInfo> {
        let stat = self.store.put_object(&self.bucket, key, body, length).await?;
        Ok(StorageObjectInfo {
            name: grammar::extract_name(&stat.key).to_string(),
            key: stat.key,
            size: stat.size,
            is_directory: false,
        })
    }

    /// Open the payload of the file at `key`, or `Ok(None)` when absent.
    pub async fn open_file(&self, key: &str) -> StorageResult<Option<ObjectReader>> {
        match self.store.get_object(&self.bucket, key).await {
            Ok(reader) => Ok(Some(reader)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Direct children of the directory at `key`, without its own marker.
    pub async fn list_directory(&self, key: &str) -> StorageResult<Vec<StorageObjectInfo>> {
        let listed = self.store.list_objects(&self.bucket, key, false).await?;
        Ok(listed
            .into_iter()
            .filter(|entry| entry.key != key)
            .map(describe)
            .collect())
    }

    /// Every object under `prefix`, markers included.
    ///
    /// Directories that only exist through nested objects are reported as
    /// well, the same way a non-recursive listing reports them.
    pub async fn list_recursive(&self, prefix: &str) -> StorageResult<Vec<StorageObjectInfo>> {
        let listed = self.store.list_objects(&self.bucket, prefix, true).await?;
        let mut entries: BTreeMap<String, StorageObjectInfo> = BTreeMap::new();
        for entry in listed {
            for directory in implied_directories(prefix, &entry.key) {
                entries.entry(directory.to_string()).or_insert_with(|| {
                    describe(ListedObject {
                        key: directory.to_string(),
                        size: 0,
                        is_dir: true,
                    })
                });
            }
            entries.insert(entry.key.clone(), describe(entry));
        }
        Ok(entries.into_values().collect())
    }

    /// Delete the file or directory at `key`.
    ///
    /// Directories are removed by listing every key under the prefix and
    /// bulk-deleting them. Keys that fail to delete are logged and skipped.
    /// Deleting something that does not exist succeeds.
    pub async fn delete_object(&self, key: &str) -> StorageResult<()> {
        if !grammar::is_directory(key) {
            return self.store.remove_object(&self.bucket, key).await;
        }

        let keys: Vec<String> = self
            .store
            .list_objects(&self.bucket, key, true)
            .await?
            .into_iter()
            .map(|entry| entry.key)
            .collect();
        let total = keys.len();
        debug!("deleting {} objects under {}", total, key);

        let failures = self.store.remove_objects(&self.bucket, keys).await?;
        for failure in &failures {
            error!("failed to delete object {}: {}", failure.key, failure.message);
        }
        if !failures.is_empty() {
            warn!(
                "deleted {} of {} objects under {}",
                total - failures.len(),
                total,
                key
            );
        }
        Ok(())
    }

    /// Move the file or directory at `source` to `target`.
    ///
    /// Files are copied and then removed. Directories have every object
    /// under the source prefix copied below the target prefix before the
    /// source subtree is deleted.
    pub async fn move_object(&self, source: &str, target: &str) -> StorageResult<()> {
        if !grammar::is_directory(source) {
            self.store.copy_object(&self.bucket, source, target).await?;
            return self.store.remove_object(&self.bucket, source).await;
        }

        let listed = self.store.list_objects(&self.bucket, source, true).await?;
        for entry in &listed {
            let suffix = &entry.key[source.len()..];
            let destination = format!("{}{}", target, suffix);
            self.store
                .copy_object(&self.bucket, &entry.key, &destination)
                .await?;
        }
        debug!("copied {} objects from {} to {}", listed.len(), source, target);
        self.delete_object(source).await
    }

    /// Round-trip a throwaway marker through the store.
    pub async fn probe(&self) -> StorageResult<()> {
        let key = format!(".readyz-{}/", Uuid::new_v4());
        self.store
            .put_object(&self.bucket, &key, empty_body(), Some(0))
            .await?;
        let stat = self.store.stat_object(&self.bucket, &key).await;
        self.store.remove_object(&self.bucket, &key).await?;
        stat.map(|_| ())
    }
}

fn empty_body() -> ByteStream<'static> {
    stream::empty().boxed()
}

/// Directory keys strictly between `prefix` and `key`.
fn implied_directories<'a>(prefix: &str, key: &'a str) -> impl Iterator<Item = &'a str> {
    let start = prefix.len();
    key.match_indices(grammar::DELIMITER)
        .filter(move |(idx, _)| *idx >= start && idx + 1 < key.len())
        .map(move |(idx, _)| &key[..=idx])
}

fn describe(entry: ListedObject) -> StorageObjectInfo {
    StorageObjectInfo {
        name: grammar::extract_name(&entry.key).to_string(),
        size: entry.size,
        is_directory: entry.is_dir,
        key: entry.key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryObjectStore;
    use bytes::Bytes;

    const BUCKET: &str = "user-files";

    async fn gateway() -> (ObjectStoreGateway, MemoryObjectStore) {
        let store = MemoryObjectStore::new();
        let gateway = ObjectStoreGateway::new(Arc::new(store.clone()), BUCKET);
        gateway.ensure_bucket().await.unwrap();
        (gateway, store)
    }

    fn body(data: &'static [u8]) -> ByteStream<'static> {
        stream::iter(vec![Ok(Bytes::from_static(data))]).boxed()
    }

    #[tokio::test]
    async fn test_find_info_for_directory_marker() {
        let (gateway, _) = gateway().await;
        gateway.create_directory("u/folder/").await.unwrap();
        gateway.put_file("u/folder.txt", body(b"abc"), None).await.unwrap();
        gateway.create_directory("u/folder2/").await.unwrap();

        let info = gateway.find_info("u/folder/").await.unwrap().unwrap();
        assert_eq!(info.key, "u/folder/");
        assert_eq!(info.name, "folder");
        assert!(info.is_directory);
    }

    #[tokio::test]
    async fn test_find_info_does_not_confuse_file_and_directory() {
        let (gateway, _) = gateway().await;
        gateway.put_file("u/notes", body(b"abc"), None).await.unwrap();

        assert!(gateway.find_info("u/notes/").await.unwrap().is_none());
        let file = gateway.find_info("u/notes").await.unwrap().unwrap();
        assert!(!file.is_directory);
        assert_eq!(file.size, 3);
    }

    #[tokio::test]
    async fn test_find_info_missing_file_is_none() {
        let (gateway, _) = gateway().await;
        assert!(gateway.find_info("u/none.txt").await.unwrap().is_none());
        assert!(!gateway.exists("u/none/").await.unwrap());
    }

    #[tokio::test]
    async fn test_directory_implied_by_nested_objects() {
        let (gateway, _) = gateway().await;
        gateway.put_file("u/a/b/c.txt", body(b"abc"), None).await.unwrap();
        assert!(gateway.exists("u/a/").await.unwrap());
        assert!(gateway.exists("u/a/b/").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_directory_excludes_own_marker() {
        let (gateway, _) = gateway().await;
        gateway.create_directory("u/d/").await.unwrap();
        gateway.create_directory("u/d/sub/").await.unwrap();
        gateway.put_file("u/d/sub/deep.txt", body(b"x"), None).await.unwrap();
        gateway.put_file("u/d/f.txt", body(b"xy"), None).await.unwrap();

        let children = gateway.list_directory("u/d/").await.unwrap();
        let names: Vec<_> = children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["f.txt", "sub"]);
        assert_eq!(children[0].size, 2);
        assert!(children[1].is_directory);
    }

    #[tokio::test]
    async fn test_delete_directory_removes_subtree() {
        let (gateway, store) = gateway().await;
        gateway.create_directory("u/d/").await.unwrap();
        gateway.put_file("u/d/a.txt", body(b"a"), None).await.unwrap();
        gateway.put_file("u/d/s/b.txt", body(b"b"), None).await.unwrap();
        gateway.put_file("u/dx.txt", body(b"keep"), None).await.unwrap();

        gateway.delete_object("u/d/").await.unwrap();

        assert_eq!(store.keys(BUCKET).await, vec!["u/dx.txt".to_string()]);
        assert!(!gateway.exists("u/d/").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_continues_past_failures() {
        let (gateway, store) = gateway().await;
        gateway.create_directory("u/d/").await.unwrap();
        gateway.put_file("u/d/a.txt", body(b"a"), None).await.unwrap();
        gateway.put_file("u/d/b.txt", body(b"b"), None).await.unwrap();
        store.protect("u/d/a.txt").await;

        gateway.delete_object("u/d/").await.unwrap();
        assert_eq!(store.keys(BUCKET).await, vec!["u/d/a.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let (gateway, _) = gateway().await;
        gateway.delete_object("u/ghost.txt").await.unwrap();
        gateway.delete_object("u/ghost/").await.unwrap();
    }

    #[tokio::test]
    async fn test_move_directory() {
        let (gateway, store) = gateway().await;
        gateway.create_directory("u/old/").await.unwrap();
        gateway.put_file("u/old/a.txt", body(b"a"), None).await.unwrap();
        gateway.create_directory("u/old/s/").await.unwrap();

        gateway.move_object("u/old/", "u/new/").await.unwrap();

        assert_eq!(
            store.keys(BUCKET).await,
            vec!["u/new/".to_string(), "u/new/a.txt".to_string(), "u/new/s/".to_string()]
        );
    }

    #[tokio::test]
    async fn test_move_file() {
        let (gateway, store) = gateway().await;
        gateway.put_file("u/a.txt", body(b"a"), None).await.unwrap();
        gateway.move_object("u/a.txt", "u/b.txt").await.unwrap();
        assert_eq!(store.keys(BUCKET).await, vec!["u/b.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_list_recursive_reports_implied_directories() {
        let (gateway, _) = gateway().await;
        gateway.create_directory("u/a/").await.unwrap();
        gateway.put_file("u/a/b/c/d.txt", body(b"d"), None).await.unwrap();
        gateway.put_file("u/top.txt", body(b"t"), None).await.unwrap();

        let listed = gateway.list_recursive("u/").await.unwrap();
        let keys: Vec<_> = listed.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(
            keys,
            vec!["u/a/", "u/a/b/", "u/a/b/c/", "u/a/b/c/d.txt", "u/top.txt"]
        );
        assert!(listed[1].is_directory && listed[2].is_directory);
        assert_eq!(listed[2].name, "c");
        assert_eq!(listed[3].size, 1);
    }

    #[test]
    fn test_implied_directories_stay_below_prefix() {
        let dirs: Vec<_> = implied_directories("u/", "u/a/b/c.txt").collect();
        assert_eq!(dirs, vec!["u/a/", "u/a/b/"]);
        let dirs: Vec<_> = implied_directories("u/a/", "u/a/").collect();
        assert!(dirs.is_empty());
    }

    #[tokio::test]
    async fn test_probe_leaves_no_trace() {
        let (gateway, store) = gateway().await;
        gateway.probe().await.unwrap();
        assert!(store.keys(BUCKET).await.is_empty());
    }
}
