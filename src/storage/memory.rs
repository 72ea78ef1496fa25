//! In-process object store.
//!
//! Holds payloads in a `BTreeMap` per bucket and shares its listing rules
//! with the disk store. Used by tests and by `--in-memory` runs.

use crate::storage::{
    client::{
        ByteStream, ListedObject, ObjectReader, ObjectStat, ObjectStore, StorageError,
        StorageResult,
    },
    listing::group_listing,
};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::{
    collections::{BTreeMap, HashSet},
    io::{self, Cursor, ErrorKind},
    sync::Arc,
};
use tokio::sync::RwLock;

#[derive(Clone, Debug)]
struct MemoryObject {
    data: Bytes,
    etag: String,
    last_modified: DateTime<Utc>,
}

impl MemoryObject {
    fn stat(&self, key: &str) -> ObjectStat {
        ObjectStat {
            key: key.to_string(),
            size: self.data.len() as u64,
            etag: Some(self.etag.clone()),
            last_modified: self.last_modified,
        }
    }
}

#[derive(Default)]
struct Inner {
    buckets: BTreeMap<String, BTreeMap<String, MemoryObject>>,
    protected: HashSet<String>,
}

/// Object store held entirely in memory.
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make removals of `key` fail with a permission error.
    pub async fn protect(&self, key: impl Into<String>) {
        self.inner.write().await.protected.insert(key.into());
    }

    /// Every key currently stored in `bucket`, in order.
    pub async fn keys(&self, bucket: &str) -> Vec<String> {
        self.inner
            .read()
            .await
            .buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn ensure_bucket(&self, bucket: &str) -> StorageResult<()> {
        self.inner
            .write()
            .await
            .buckets
            .entry(bucket.to_string())
            .or_default();
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        mut body: ByteStream<'_>,
        length: Option<u64>,
    ) -> StorageResult<ObjectStat> {
        if key.is_empty() {
            return Err(StorageError::InvalidObjectKey(key.to_string()));
        }

        let mut data = BytesMut::new();
        let mut digest = md5::Context::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            digest.consume(&chunk);
            data.extend_from_slice(&chunk);
        }

        let size = data.len() as u64;
        if let Some(expected) = length.filter(|expected| *expected != size) {
            return Err(StorageError::LengthMismatch {
                key: key.to_string(),
                expected,
                actual: size,
            });
        }

        let object = MemoryObject {
            data: data.freeze(),
            etag: format!("{:x}", digest.compute()),
            last_modified: Utc::now(),
        };
        let stat = object.stat(key);

        let mut inner = self.inner.write().await;
        let objects = inner
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))?;
        objects.insert(key.to_string(), object);
        Ok(stat)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectReader> {
        let inner = self.inner.read().await;
        let object = inner
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .ok_or_else(|| StorageError::not_found(bucket, key))?;
        Ok(Box::pin(Cursor::new(object.data.clone())))
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectStat> {
        let inner = self.inner.read().await;
        inner
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| object.stat(key))
            .ok_or_else(|| StorageError::not_found(bucket, key))
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        recursive: bool,
    ) -> StorageResult<Vec<ListedObject>> {
        let inner = self.inner.read().await;
        let objects = inner
            .buckets
            .get(bucket)
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))?;
        let entries = objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| (key.clone(), object.data.len() as u64));
        Ok(group_listing(prefix, entries, recursive))
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let mut inner = self.inner.write().await;
        if inner.protected.contains(key) {
            return Err(StorageError::Io(io::Error::new(
                ErrorKind::PermissionDenied,
                format!("removal of `{}` denied", key),
            )));
        }
        if let Some(objects) = inner.buckets.get_mut(bucket) {
            objects.remove(key);
        }
        Ok(())
    }

    async fn copy_object(
        &self,
        bucket: &str,
        source: &str,
        target: &str,
    ) -> StorageResult<ObjectStat> {
        let mut inner = self.inner.write().await;
        let objects = inner
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))?;
        let mut object = objects
            .get(source)
            .cloned()
            .ok_or_else(|| StorageError::not_found(bucket, source))?;
        object.last_modified = Utc::now();
        let stat = object.stat(target);
        objects.insert(target.to_string(), object);
        Ok(stat)
    }
}
