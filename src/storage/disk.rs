//! src/storage/disk.rs
//!
//! DiskObjectStore: a flat, S3-like object store backed by SQLite for
//! metadata and local disk for payloads. Payloads are sharded beneath
//! `base_path/{bucket}/{shard}/{shard}/{md5(bucket/key)}`, so object keys
//! never turn into filesystem paths and `/` inside a key has no on-disk
//! meaning.

use crate::{
    models::{bucket::Bucket, object::StoredObject},
    storage::{
        client::{
            ByteStream, ListedObject, ObjectReader, ObjectStat, ObjectStore, StorageError,
            StorageResult,
        },
        listing::group_listing,
    },
};
use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use md5::Context;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

const MAX_OBJECT_KEY_LEN: usize = 4096;
const BUCKET_NAME_MIN_LEN: usize = 3;
const BUCKET_NAME_MAX_LEN: usize = 63;
const INIT_MIGRATION: &str = include_str!("../../migrations/0001_init.sql");

/// Object store keeping metadata in SQLite and payloads on local disk.
#[derive(Clone)]
pub struct DiskObjectStore {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where object payloads are stored.
    pub base_path: PathBuf,
}

impl DiskObjectStore {
    /// Create a store backed by the provided SQLite pool, using `base_path`
    /// as the root directory for object payloads.
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
        }
    }

    /// Run the embedded schema migration statement by statement.
    pub async fn migrate(db: &SqlitePool) -> StorageResult<()> {
        let statements = INIT_MIGRATION
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        tracing::info!("Running {} migration statements...", statements.len());

        for stmt in statements {
            debug!("Executing migration SQL: {}", stmt);
            sqlx::query(stmt).execute(db).await?;
        }
        Ok(())
    }

    /// Reject keys the store cannot hold.
    ///
    /// Keys are never used as filesystem paths, so this only guards against
    /// empty, oversized, absolute or control-character keys.
    fn ensure_key_safe(&self, key: &str) -> StorageResult<()> {
        let invalid = key.is_empty()
            || key.len() > MAX_OBJECT_KEY_LEN
            || key.starts_with('/')
            || key.bytes().any(|b| b.is_ascii_control() || b == b'\\');
        if invalid {
            return Err(StorageError::InvalidObjectKey(key.to_string()));
        }
        Ok(())
    }

    /// Validate bucket name format.
    ///
    /// Enforces the S3 basics: 3–63 characters of lowercase letters, digits,
    /// dots and hyphens, starting and ending with a letter or digit.
    fn ensure_bucket_name_safe(&self, name: &str) -> StorageResult<()> {
        let invalid = |reason: &str| StorageError::InvalidBucketName {
            name: name.to_string(),
            reason: reason.into(),
        };

        let len = name.len();
        if !(BUCKET_NAME_MIN_LEN..=BUCKET_NAME_MAX_LEN).contains(&len) {
            return Err(invalid("must be between 3 and 63 characters"));
        }
        if !name
            .chars()
            .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '.' | '-'))
        {
            return Err(invalid(
                "allowed characters are lowercase letters, digits, dots, and hyphens",
            ));
        }
        if name.starts_with(['.', '-']) || name.ends_with(['.', '-']) {
            return Err(invalid("must start and end with a lowercase letter or digit"));
        }
        Ok(())
    }

    /// Physical base folder of a bucket. Does not check for existence.
    fn bucket_root(&self, bucket: &str) -> PathBuf {
        self.base_path.join(bucket)
    }

    /// Payload location: `bucket/{digest[0]}/{digest[1]}/{digest}`.
    ///
    /// Parent directories may not exist yet.
    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        let digest = md5::compute(format!("{}/{}", bucket, key));
        let mut path = self.bucket_root(bucket);
        path.push(format!("{:02x}", digest[0]));
        path.push(format!("{:02x}", digest[1]));
        path.push(format!("{:x}", digest));
        path
    }

    /// Fetch bucket metadata from SQLite, or BucketNotFound.
    async fn fetch_bucket(&self, bucket: &str) -> StorageResult<Bucket> {
        self.ensure_bucket_name_safe(bucket)?;
        sqlx::query_as::<Sqlite, Bucket>("SELECT name, created_at FROM buckets WHERE name = ?")
            .bind(bucket)
            .fetch_one(&*self.db)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => StorageError::BucketNotFound(bucket.to_string()),
                other => StorageError::Sqlx(other),
            })
    }

    /// Fetch an object metadata row, or ObjectNotFound.
    async fn fetch_object(&self, bucket: &str, key: &str) -> StorageResult<StoredObject> {
        self.ensure_key_safe(key)?;
        sqlx::query_as::<_, StoredObject>(
            "SELECT id, bucket, key, size_bytes, etag, last_modified
             FROM objects
             WHERE bucket = ? AND key = ?",
        )
        .bind(bucket)
        .bind(key)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => StorageError::not_found(bucket, key),
            other => StorageError::Sqlx(other),
        })
    }

    /// Insert or overwrite the metadata row of `key`.
    async fn upsert_object(
        &self,
        bucket: &str,
        key: &str,
        size_bytes: i64,
        etag: &str,
    ) -> StorageResult<StoredObject> {
        let row = sqlx::query_as::<_, StoredObject>(
            r#"
            INSERT INTO objects (id, bucket, key, size_bytes, etag, last_modified)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(bucket, key) DO UPDATE SET
                size_bytes = excluded.size_bytes,
                etag = excluded.etag,
                last_modified = excluded.last_modified
            RETURNING id, bucket, key, size_bytes, etag, last_modified
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(bucket)
        .bind(key)
        .bind(size_bytes)
        .bind(etag)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await?;
        Ok(row)
    }

    /// Create the parent of `file_path` and return a fresh temp path beside it.
    async fn temp_path_for(file_path: &Path) -> StorageResult<PathBuf> {
        let parent = file_path.parent().ok_or_else(|| {
            StorageError::Io(io::Error::new(
                ErrorKind::Other,
                "object path missing parent directory",
            ))
        })?;
        fs::create_dir_all(parent).await?;
        Ok(parent.join(format!(".tmp-{}", Uuid::new_v4())))
    }

    /// Move a finished temp file over the final payload location.
    async fn commit_temp(tmp_path: &Path, file_path: &Path) -> StorageResult<()> {
        if let Err(err) = fs::rename(tmp_path, file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(file_path).await?;
                fs::rename(tmp_path, file_path).await?;
            } else {
                let _ = fs::remove_file(tmp_path).await;
                return Err(StorageError::Io(err));
            }
        }
        Ok(())
    }

    /// Stream `body` into a temp file, returning its size and MD5.
    ///
    /// The temp file is removed again on any error.
    async fn write_temp(tmp_path: &Path, mut body: ByteStream<'_>) -> StorageResult<(u64, String)> {
        let mut file = File::create(tmp_path).await?;
        let mut size: u64 = 0;
        let mut digest = Context::new();

        let outcome: io::Result<()> = async {
            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                size += chunk.len() as u64;
                digest.consume(&chunk);
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            file.sync_all().await
        }
        .await;

        if let Err(err) = outcome {
            let _ = fs::remove_file(tmp_path).await;
            return Err(StorageError::Io(err));
        }
        Ok((size, format!("{:x}", digest.compute())))
    }

    /// Recursively remove empty directories up to `stop`.
    ///
    /// Stops at the first non-empty or missing directory, at `stop` itself,
    /// or on unexpected I/O errors.
    async fn prune_empty_dirs(&self, start: &Path, stop: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

impl From<StoredObject> for ObjectStat {
    fn from(row: StoredObject) -> Self {
        Self {
            key: row.key,
            size: row.size_bytes.max(0) as u64,
            etag: row.etag,
            last_modified: row.last_modified,
        }
    }
}

#[async_trait]
impl ObjectStore for DiskObjectStore {
    async fn ensure_bucket(&self, bucket: &str) -> StorageResult<()> {
        self.ensure_bucket_name_safe(bucket)?;
        fs::create_dir_all(self.bucket_root(bucket)).await?;

        let inserted = sqlx::query(
            "INSERT INTO buckets (name, created_at) VALUES (?, ?)
             ON CONFLICT(name) DO NOTHING",
        )
        .bind(bucket)
        .bind(Utc::now())
        .execute(&*self.db)
        .await?;

        if inserted.rows_affected() > 0 {
            tracing::info!("Created bucket {}", bucket);
        }
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ByteStream<'_>,
        length: Option<u64>,
    ) -> StorageResult<ObjectStat> {
        self.ensure_key_safe(key)?;
        let bucket_rec = self.fetch_bucket(bucket).await?;

        let file_path = self.object_path(&bucket_rec.name, key);
        let tmp_path = Self::temp_path_for(&file_path).await?;
        let (size, etag) = Self::write_temp(&tmp_path, body).await?;

        if let Some(expected) = length.filter(|expected| *expected != size) {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::LengthMismatch {
                key: key.to_string(),
                expected,
                actual: size,
            });
        }

        Self::commit_temp(&tmp_path, &file_path).await?;

        match self.upsert_object(bucket, key, size as i64, &etag).await {
            Ok(row) => {
                debug!("stored {} bytes at {}/{}", size, bucket, key);
                Ok(row.into())
            }
            Err(err) => {
                let _ = fs::remove_file(&file_path).await;
                Err(err)
            }
        }
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectReader> {
        self.fetch_object(bucket, key).await?;

        let file_path = self.object_path(bucket, key);
        let file = File::open(&file_path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                StorageError::not_found(bucket, key)
            } else {
                StorageError::Io(err)
            }
        })?;
        Ok(Box::pin(file))
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectStat> {
        Ok(self.fetch_object(bucket, key).await?.into())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        recursive: bool,
    ) -> StorageResult<Vec<ListedObject>> {
        let bucket_rec = self.fetch_bucket(bucket).await?;

        // Non-recursive listings fold each sub-directory into one row in SQL.
        // substr/instr count characters, so the prefix length does too.
        let prefix_chars = prefix.chars().count() as i64;
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT ");
        if recursive {
            builder.push("key, size_bytes FROM objects");
        } else {
            builder.push("CASE WHEN instr(substr(key, ");
            builder.push_bind(prefix_chars + 1);
            builder.push("), '/') > 0 THEN substr(key, 1, ");
            builder.push_bind(prefix_chars);
            builder.push(" + instr(substr(key, ");
            builder.push_bind(prefix_chars + 1);
            builder.push("), '/')) ELSE key END AS entry, MAX(size_bytes) FROM objects");
        }
        builder.push(" WHERE bucket = ");
        builder.push_bind(&bucket_rec.name);
        // A key range keeps the (bucket, key) index usable and, unlike LIKE,
        // is case-sensitive with no wildcard characters.
        if !prefix.is_empty() {
            builder.push(" AND key >= ");
            builder.push_bind(prefix);
            if let Some(upper) = prefix_upper_bound(prefix) {
                builder.push(" AND key < ");
                builder.push_bind(upper);
            }
        }
        if recursive {
            builder.push(" ORDER BY key ASC");
        } else {
            builder.push(" GROUP BY entry ORDER BY entry ASC");
        }

        let rows: Vec<(String, i64)> = builder.build_query_as().fetch_all(&*self.db).await?;
        debug!("listed {} rows under {}/{}", rows.len(), bucket, prefix);

        Ok(group_listing(
            prefix,
            rows.into_iter()
                .map(|(key, size)| (key, size.max(0) as u64)),
            recursive,
        ))
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.ensure_key_safe(key)?;

        let result = sqlx::query("DELETE FROM objects WHERE bucket = ? AND key = ?")
            .bind(bucket)
            .bind(key)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            debug!("object {}/{} already absent", bucket, key);
        }

        let file_path = self.object_path(bucket, key);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed physical file {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(StorageError::Io(err)),
        }

        if let Some(parent) = file_path.parent() {
            let bucket_root = self.bucket_root(bucket);
            self.prune_empty_dirs(parent, &bucket_root).await;
        }
        Ok(())
    }

    async fn copy_object(
        &self,
        bucket: &str,
        source: &str,
        target: &str,
    ) -> StorageResult<ObjectStat> {
        self.ensure_key_safe(target)?;
        let source_rec = self.fetch_object(bucket, source).await?;

        let source_path = self.object_path(bucket, source);
        let target_path = self.object_path(bucket, target);
        let tmp_path = Self::temp_path_for(&target_path).await?;

        if let Err(err) = fs::copy(&source_path, &tmp_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(if err.kind() == ErrorKind::NotFound {
                StorageError::not_found(bucket, source)
            } else {
                StorageError::Io(err)
            });
        }
        Self::commit_temp(&tmp_path, &target_path).await?;

        let etag = source_rec.etag.unwrap_or_default();
        let row = self
            .upsert_object(bucket, target, source_rec.size_bytes, &etag)
            .await?;
        Ok(row.into())
    }
}

/// Smallest string greater than every string starting with `prefix`, or
/// `None` when no such bound exists.
///
/// The last character is bumped to its successor; `char::MAX` is dropped
/// and the bump carries into the character before it. UTF-8 orders bytes
/// the same way as code points, so this is also a bound under SQLite's
/// binary collation.
fn prefix_upper_bound(prefix: &str) -> Option<String> {
    let mut chars: Vec<char> = prefix.chars().collect();
    while let Some(last) = chars.pop() {
        let next = match last {
            char::MAX => continue,
            '\u{D7FF}' => Some('\u{E000}'),
            c => char::from_u32(c as u32 + 1),
        };
        if let Some(next) = next {
            chars.push(next);
            return Some(chars.into_iter().collect());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream;
    use sqlx::sqlite::SqlitePoolOptions;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    const BUCKET: &str = "user-files";

    async fn store() -> (DiskObjectStore, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        DiskObjectStore::migrate(&pool).await.unwrap();
        let store = DiskObjectStore::new(Arc::new(pool), dir.path());
        store.ensure_bucket(BUCKET).await.unwrap();
        (store, dir)
    }

    fn body(chunks: &[&'static [u8]]) -> ByteStream<'static> {
        let chunks: Vec<io::Result<Bytes>> =
            chunks.iter().map(|c| Ok(Bytes::from_static(c))).collect();
        stream::iter(chunks).boxed()
    }

    async fn read_all(mut reader: ObjectReader) -> Vec<u8> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await.unwrap();
        buf
    }

    #[tokio::test]
    async fn test_put_stat_and_get() {
        let (store, _dir) = store().await;
        let stat = store
            .put_object(BUCKET, "u/docs/a.txt", body(&[b"hello ", b"world"]), Some(11))
            .await
            .unwrap();
        assert_eq!(stat.size, 11);
        assert_eq!(stat.etag.as_deref(), Some("5eb63bbbe01eeed093cb22bb8f5acdc3"));

        let stat = store.stat_object(BUCKET, "u/docs/a.txt").await.unwrap();
        assert_eq!(stat.size, 11);

        let reader = store.get_object(BUCKET, "u/docs/a.txt").await.unwrap();
        assert_eq!(read_all(reader).await, b"hello world");
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let (store, _dir) = store().await;
        store.put_object(BUCKET, "k", body(&[b"first"]), None).await.unwrap();
        store.put_object(BUCKET, "k", body(&[b"2nd"]), None).await.unwrap();

        let reader = store.get_object(BUCKET, "k").await.unwrap();
        assert_eq!(read_all(reader).await, b"2nd");
        assert_eq!(store.stat_object(BUCKET, "k").await.unwrap().size, 3);
    }

    #[tokio::test]
    async fn test_stat_missing_is_not_found() {
        let (store, _dir) = store().await;
        let err = store.stat_object(BUCKET, "missing").await.unwrap_err();
        assert!(err.is_not_found());
        let err = store.get_object(BUCKET, "missing").await.err().unwrap();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_length_mismatch_leaves_nothing_behind() {
        let (store, _dir) = store().await;
        let err = store
            .put_object(BUCKET, "k", body(&[b"abc"]), Some(10))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::LengthMismatch { expected: 10, actual: 3, .. }));
        assert!(store.stat_object(BUCKET, "k").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_stream_error_aborts_upload() {
        let (store, _dir) = store().await;
        let failing: ByteStream<'static> = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::new(ErrorKind::ConnectionReset, "client went away")),
        ])
        .boxed();
        let err = store.put_object(BUCKET, "k", failing, None).await.unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
        assert!(store.stat_object(BUCKET, "k").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_recursive_and_grouped() {
        let (store, _dir) = store().await;
        for key in ["u/a/", "u/a/x.txt", "u/a/b/", "u/a/b/y.txt", "u/c.txt"] {
            store.put_object(BUCKET, key, body(&[]), Some(0)).await.unwrap();
        }

        let grouped = store.list_objects(BUCKET, "u/a/", false).await.unwrap();
        let keys: Vec<_> = grouped.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["u/a/", "u/a/b/", "u/a/x.txt"]);

        let all = store.list_objects(BUCKET, "u/", true).await.unwrap();
        assert_eq!(all.len(), 5);
    }

    #[tokio::test]
    async fn test_list_prefix_is_case_sensitive() {
        let (store, _dir) = store().await;
        store.put_object(BUCKET, "u/Docs/a", body(&[]), None).await.unwrap();
        store.put_object(BUCKET, "u/docs/b", body(&[]), None).await.unwrap();

        let listed = store.list_objects(BUCKET, "u/docs/", true).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, "u/docs/b");
    }

    #[tokio::test]
    async fn test_remove_is_idempotent_and_drops_payload() {
        let (store, dir) = store().await;
        store.put_object(BUCKET, "k", body(&[b"x"]), None).await.unwrap();
        let payload = store.object_path(BUCKET, "k");
        assert!(payload.exists());

        store.remove_object(BUCKET, "k").await.unwrap();
        store.remove_object(BUCKET, "k").await.unwrap();

        assert!(!payload.exists());
        assert!(dir.path().join(BUCKET).exists());
        assert!(store.stat_object(BUCKET, "k").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_remove_objects_reports_nothing_on_success() {
        let (store, _dir) = store().await;
        store.put_object(BUCKET, "a", body(&[b"1"]), None).await.unwrap();
        store.put_object(BUCKET, "b", body(&[b"2"]), None).await.unwrap();

        let failures = store
            .remove_objects(BUCKET, vec!["a".into(), "b".into(), "never-existed".into()])
            .await
            .unwrap();
        assert!(failures.is_empty());
        assert!(store.list_objects(BUCKET, "", true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_copy_object() {
        let (store, _dir) = store().await;
        store.put_object(BUCKET, "src", body(&[b"payload"]), None).await.unwrap();

        let stat = store.copy_object(BUCKET, "src", "dst").await.unwrap();
        assert_eq!(stat.size, 7);

        let reader = store.get_object(BUCKET, "dst").await.unwrap();
        assert_eq!(read_all(reader).await, b"payload");
        assert!(store.stat_object(BUCKET, "src").await.is_ok());

        let err = store.copy_object(BUCKET, "nope", "dst2").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_bucket_rules() {
        let (store, _dir) = store().await;
        let err = store.ensure_bucket("Bad_Bucket").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidBucketName { .. }));

        let err = store
            .put_object("other-bucket", "k", body(&[b"x"]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::BucketNotFound(_)));

        store.ensure_bucket(BUCKET).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_unsafe_keys() {
        let (store, _dir) = store().await;
        for key in ["", "/abs", "a\\b", "a\nb"] {
            let err = store.put_object(BUCKET, key, body(&[]), None).await.unwrap_err();
            assert!(matches!(err, StorageError::InvalidObjectKey(_)), "{key:?}");
        }
    }

    #[test]
    fn test_prefix_upper_bound() {
        assert_eq!(prefix_upper_bound("u/a/").as_deref(), Some("u/a0"));
        assert_eq!(prefix_upper_bound("ab").as_deref(), Some("ac"));
        assert_eq!(prefix_upper_bound("a\u{D7FF}").as_deref(), Some("a\u{E000}"));
        assert_eq!(prefix_upper_bound("a\u{10FFFF}").as_deref(), Some("b"));
        assert_eq!(prefix_upper_bound(""), None);
        assert_eq!(prefix_upper_bound("\u{10FFFF}"), None);
    }

    #[tokio::test]
    async fn test_prefix_range_excludes_neighbours() {
        let (store, _dir) = store().await;
        for key in ["u/a", "u/a/", "u/a/x.txt", "u/a0", "u/a.txt", "u/b/", "v/a/"] {
            store.put_object(BUCKET, key, body(&[]), Some(0)).await.unwrap();
        }

        let listed = store.list_objects(BUCKET, "u/a/", true).await.unwrap();
        let keys: Vec<_> = listed.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["u/a/", "u/a/x.txt"]);

        let trimmed = store.list_objects(BUCKET, "u/a", false).await.unwrap();
        let keys: Vec<_> = trimmed.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["u/a", "u/a.txt", "u/a/", "u/a0"]);
    }

    #[tokio::test]
    async fn test_grouped_listing_keeps_file_sizes() {
        let (store, _dir) = store().await;
        store.put_object(BUCKET, "u/d/f.txt", body(&[b"12345"]), None).await.unwrap();
        store.put_object(BUCKET, "u/d/deep/g.txt", body(&[b"1234567"]), None).await.unwrap();

        let listed = store.list_objects(BUCKET, "u/d/", false).await.unwrap();
        assert_eq!(
            listed,
            vec![
                ListedObject { key: "u/d/deep/".into(), size: 0, is_dir: true },
                ListedObject { key: "u/d/f.txt".into(), size: 5, is_dir: false },
            ]
        );
    }

    #[tokio::test]
    async fn test_listing_uses_bucket_key_index() {
        let (store, _dir) = store().await;
        let plan: Vec<(i64, i64, i64, String)> = sqlx::query_as(
            "EXPLAIN QUERY PLAN SELECT key, size_bytes FROM objects \
             WHERE bucket = ? AND key >= ? AND key < ? ORDER BY key ASC",
        )
        .bind(BUCKET)
        .bind("u/a/")
        .bind("u/a0")
        .fetch_all(&*store.db)
        .await
        .unwrap();
        let detail = plan.iter().map(|row| row.3.as_str()).collect::<Vec<_>>().join("; ");
        assert!(detail.contains("key>? AND key<?"), "{detail}");
    }
}
