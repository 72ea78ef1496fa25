//! Represents a logical bucket, the top-level container for objects.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// A storage bucket known to the disk object store.
///
/// The drive keeps every user's files in one shared bucket and partitions it
/// by key prefix, so in practice a deployment holds a single row here.
#[derive(Clone, FromRow, Debug)]
pub struct Bucket {
    /// Bucket name (lowercase letters, digits, dots and hyphens).
    pub name: String,

    /// When this bucket was created.
    pub created_at: DateTime<Utc>,
}
