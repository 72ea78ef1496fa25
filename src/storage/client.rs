//! The object store capability the drive is built on.
//!
//! Stores are flat: keys are opaque strings, `/` has no meaning to them apart
//! from being the delimiter used to group non-recursive listings.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use std::{io, pin::Pin};
use thiserror::Error;
use tokio::io::AsyncRead;
use tracing::debug;

/// Streamed object body supplied by the caller of `put_object`.
pub type ByteStream<'a> = BoxStream<'a, io::Result<Bytes>>;

/// Streamed object body returned by `get_object`.
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("bucket `{0}` not found")]
    BucketNotFound(String),
    #[error("bucket `{name}` invalid: {reason}")]
    InvalidBucketName { name: String, reason: String },
    #[error("object `{key}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: String, key: String },
    #[error("invalid object key `{0}`")]
    InvalidObjectKey(String),
    #[error("object `{key}` declared {expected} bytes but received {actual}")]
    LengthMismatch {
        key: String,
        expected: u64,
        actual: u64,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl StorageError {
    pub fn not_found(bucket: &str, key: &str) -> Self {
        Self::ObjectNotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    }

    /// True for the "no such key" answer, which callers fold into absence.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ObjectNotFound { .. })
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Result of stating a single object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectStat {
    pub key: String,
    pub size: u64,
    pub etag: Option<String>,
    pub last_modified: DateTime<Utc>,
}

/// One entry of a listing.
///
/// `is_dir` is set for common prefixes of non-recursive listings and for
/// zero-byte marker objects whose key ends with `/`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListedObject {
    pub key: String,
    pub size: u64,
    pub is_dir: bool,
}

/// A key that a bulk removal could not delete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteFailure {
    pub key: String,
    pub message: String,
}

/// Primitive operations of an S3-compatible object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create `bucket` when it does not exist yet.
    async fn ensure_bucket(&self, bucket: &str) -> StorageResult<()>;

    /// Write `body` at `key`, replacing any existing object.
    ///
    /// When `length` is known it is checked against the streamed byte count.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ByteStream<'_>,
        length: Option<u64>,
    ) -> StorageResult<ObjectStat>;

    /// Open the payload of `key` for streaming.
    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectReader>;

    /// Size and etag of `key`, or [`StorageError::ObjectNotFound`].
    async fn stat_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectStat>;

    /// Entries whose key starts with `prefix`, in key order.
    ///
    /// Non-recursive listings collapse everything past the next `/` after
    /// `prefix` into one directory entry.
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        recursive: bool,
    ) -> StorageResult<Vec<ListedObject>>;

    /// Delete `key`. Deleting a missing key succeeds.
    async fn remove_object(&self, bucket: &str, key: &str) -> StorageResult<()>;

    /// Server-side copy of `source` to `target`.
    async fn copy_object(&self, bucket: &str, source: &str, target: &str)
    -> StorageResult<ObjectStat>;

    /// Delete every key in `keys`, reporting the ones that failed.
    ///
    /// A failure on one key does not stop the remaining deletions.
    async fn remove_objects(
        &self,
        bucket: &str,
        keys: Vec<String>,
    ) -> StorageResult<Vec<DeleteFailure>> {
        let mut failures = Vec::new();
        for key in keys {
            match self.remove_object(bucket, &key).await {
                Ok(()) => debug!("removed object {}", key),
                Err(err) => failures.push(DeleteFailure {
                    key,
                    message: err.to_string(),
                }),
            }
        }
        Ok(failures)
    }
}
