//! Represents objects stored in a bucket, both as persisted rows and as the
//! normalized entries the gateway hands to the resource layer.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Metadata row for a single object held by the disk object store.
///
/// The payload bytes live on disk; this row only records where they belong
/// and what they look like.
#[derive(Clone, FromRow, Debug)]
pub struct StoredObject {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Name of the owning bucket.
    pub bucket: String,

    /// Flat object key, e.g. `user-<id>-files/docs/report.pdf`.
    pub key: String,

    /// Size in bytes.
    pub size_bytes: i64,

    /// MD5 of the payload, hex encoded.
    pub etag: Option<String>,

    /// Timestamp when the object was last written.
    pub last_modified: DateTime<Utc>,
}

/// The gateway's view of one object-store entry.
///
/// Directories surface here either as zero-byte marker objects or as common
/// prefixes of a listing; both carry `is_directory = true`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageObjectInfo {
    /// Absolute object key.
    pub key: String,
    /// Final path segment of `key`.
    pub name: String,
    pub size: u64,
    pub is_directory: bool,
}
