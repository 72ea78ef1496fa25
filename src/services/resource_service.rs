//! src/services/resource_service.rs
//!
//! ResourceService is the resource-level contract of the drive. It is the only
//! layer that knows both who the user is and what a path means: input is
//! validated, resolved into the user's key namespace, handed to the gateway,
//! and the result is shaped into [`ResourceDescriptor`]s or domain errors.

use crate::{
    models::{object::StorageObjectInfo, resource::ResourceDescriptor},
    paths::{
        grammar::{self, ROOT},
        namespace,
        validator::{self, ValidationError},
    },
    storage::{
        client::{ByteStream, ObjectReader, StorageError},
        gateway::ObjectStoreGateway,
    },
};
use regex::RegexBuilder;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    AlreadyExists(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type ResourceResult<T> = Result<T, ResourceError>;

/// A file opened for download.
pub struct Download {
    pub resource: ResourceDescriptor,
    pub reader: ObjectReader,
}

#[derive(Clone)]
pub struct ResourceService {
    gateway: ObjectStoreGateway,
}

impl ResourceService {
    pub fn new(gateway: ObjectStoreGateway) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &ObjectStoreGateway {
        &self.gateway
    }

    /// Describe the file or directory at `path`.
    pub async fn get_resource(&self, user_id: Uuid, path: &str) -> ResourceResult<ResourceDescriptor> {
        validator::validate_path("path", path)?;
        if grammar::is_root(path) {
            return Ok(ResourceDescriptor::directory(ROOT, ""));
        }

        let info = self.find(user_id, path).await?.ok_or_else(|| not_found(path))?;
        Ok(describe(&info))
    }

    /// Delete the file or directory at `path`.
    ///
    /// Succeeds whether or not the resource existed.
    pub async fn delete_resource(&self, user_id: Uuid, path: &str) -> ResourceResult<()> {
        validator::validate_path("path", path)?;
        if grammar::is_root(path) {
            return Err(ValidationError::new("path", "must not be the root directory").into());
        }

        let key = namespace::to_absolute(user_id, path);
        self.gateway.delete_object(&key).await?;
        info!("user {} deleted {}", user_id, path);
        Ok(())
    }

    /// Create the directory at `path`.
    ///
    /// Only the last segment is created; the parent must already exist.
    pub async fn create_directory(
        &self,
        user_id: Uuid,
        path: &str,
    ) -> ResourceResult<ResourceDescriptor> {
        validator::validate_directory_path("path", path)?;
        if grammar::is_root(path) {
            return Err(already_exists(path));
        }

        let parent = grammar::remove_name(path);
        if !self.directory_exists(user_id, parent).await? {
            return Err(ResourceError::NotFound(format!(
                "parent directory `{}` does not exist",
                parent
            )));
        }
        if self.find(user_id, path).await?.is_some() {
            return Err(already_exists(path));
        }

        let key = namespace::to_absolute(user_id, path);
        self.gateway.create_directory(&key).await?;
        info!("user {} created directory {}", user_id, path);
        Ok(ResourceDescriptor::directory(
            parent,
            grammar::extract_name(path),
        ))
    }

    /// Direct children of the directory at `path`.
    pub async fn list_directory(
        &self,
        user_id: Uuid,
        path: &str,
    ) -> ResourceResult<Vec<ResourceDescriptor>> {
        validator::validate_directory_path("path", path)?;
        if !self.directory_exists(user_id, path).await? {
            return Err(not_found(path));
        }

        let key = namespace::to_absolute(user_id, path);
        let children = self.gateway.list_directory(&key).await?;
        Ok(children.iter().map(describe).collect())
    }

    /// Move or rename the resource at `from` to `to`.
    pub async fn move_resource(
        &self,
        user_id: Uuid,
        from: &str,
        to: &str,
    ) -> ResourceResult<ResourceDescriptor> {
        validator::validate_path("from", from)?;
        validator::validate_path("to", to)?;
        if grammar::is_root(from) || grammar::is_root(to) {
            return Err(ValidationError::new("from", "root directory cannot be moved").into());
        }
        if grammar::is_directory(from) != grammar::is_directory(to) {
            return Err(ValidationError::new(
                "to",
                "must be the same kind of resource as `from`",
            )
            .into());
        }
        if grammar::is_directory(from) && to.starts_with(from) {
            return Err(ValidationError::new(
                "to",
                "must not be inside the directory being moved",
            )
            .into());
        }

        let source = self.find(user_id, from).await?.ok_or_else(|| not_found(from))?;
        if self.find(user_id, to).await?.is_some() {
            return Err(already_exists(to));
        }
        let parent = grammar::remove_name(to);
        if !self.directory_exists(user_id, parent).await? {
            return Err(ResourceError::NotFound(format!(
                "target directory `{}` does not exist",
                parent
            )));
        }

        let target_key = namespace::to_absolute(user_id, to);
        self.gateway.move_object(&source.key, &target_key).await?;
        info!("user {} moved {} to {}", user_id, from, to);

        Ok(describe(&StorageObjectInfo {
            name: grammar::extract_name(&target_key).to_string(),
            key: target_key,
            ..source
        }))
    }

    /// Files and directories whose name contains `query`, ignoring case.
    pub async fn search_resources(
        &self,
        user_id: Uuid,
        query: &str,
    ) -> ResourceResult<Vec<ResourceDescriptor>> {
        validator::validate_query("query", query)?;
        let pattern = RegexBuilder::new(&grammar::escape_for_pattern(query))
            .case_insensitive(true)
            .build()
            .map_err(|err| ValidationError::new("query", err.to_string()))?;

        let root = namespace::user_root(user_id);
        let everything = self.gateway.list_recursive(&root).await?;
        Ok(everything
            .iter()
            .filter(|info| info.key != root && pattern.is_match(&info.name))
            .map(describe)
            .collect())
    }

    /// Stream a new file named `filename` into `directory`.
    ///
    /// `filename` may contain sub-directories; any that are missing below
    /// `directory` get their markers once the body has been stored, so a
    /// failed upload leaves no empty directories behind.
    pub async fn upload_file(
        &self,
        user_id: Uuid,
        directory: &str,
        filename: &str,
        body: ByteStream<'_>,
    ) -> ResourceResult<ResourceDescriptor> {
        validator::validate_directory_path("path", directory)?;
        validator::validate_file_path("filename", filename)?;
        let path = grammar::join(directory, filename);
        validator::validate_file_path("path", &path)?;

        if !self.directory_exists(user_id, directory).await? {
            return Err(not_found(directory));
        }
        if self.find(user_id, &path).await?.is_some() {
            return Err(already_exists(&path));
        }
        let missing = self.missing_ancestors(user_id, directory, &path).await?;

        let key = namespace::to_absolute(user_id, &path);
        let info = self.gateway.put_file(&key, body, None).await?;
        for ancestor in missing.into_iter().rev() {
            let ancestor_key = namespace::to_absolute(user_id, ancestor);
            self.gateway.create_directory(&ancestor_key).await?;
        }
        info!("user {} uploaded {} ({} bytes)", user_id, path, info.size);
        Ok(describe(&info))
    }

    /// Open the file at `path` for streaming.
    pub async fn download_file(&self, user_id: Uuid, path: &str) -> ResourceResult<Download> {
        validator::validate_path("path", path)?;
        if grammar::is_directory(path) {
            return Err(ValidationError::new("path", "directories cannot be downloaded").into());
        }

        let info = self.find(user_id, path).await?.ok_or_else(|| not_found(path))?;
        let reader = self
            .gateway
            .open_file(&info.key)
            .await?
            .ok_or_else(|| not_found(path))?;
        Ok(Download {
            resource: describe(&info),
            reader,
        })
    }

    async fn find(&self, user_id: Uuid, path: &str) -> ResourceResult<Option<StorageObjectInfo>> {
        let key = namespace::to_absolute(user_id, path);
        debug_assert!(namespace::owns(user_id, &key));
        Ok(self.gateway.find_info(&key).await?)
    }

    /// The root always exists; any other directory needs an entry in the store.
    async fn directory_exists(&self, user_id: Uuid, path: &str) -> ResourceResult<bool> {
        if grammar::is_root(path) {
            return Ok(true);
        }
        Ok(self.find(user_id, path).await?.is_some())
    }

    /// Directories strictly between `base` and the file `path` that do not
    /// exist yet, deepest first.
    async fn missing_ancestors<'p>(
        &self,
        user_id: Uuid,
        base: &str,
        path: &'p str,
    ) -> ResourceResult<Vec<&'p str>> {
        let mut missing = Vec::new();
        let mut current = grammar::remove_name(path);
        while current != base && !grammar::is_root(current) {
            if self.directory_exists(user_id, current).await? {
                break;
            }
            missing.push(current);
            current = grammar::remove_name(current);
        }
        Ok(missing)
    }
}

/// Project a gateway entry onto the user-relative descriptor.
fn describe(info: &StorageObjectInfo) -> ResourceDescriptor {
    let relative = namespace::to_relative(&info.key);
    let parent = grammar::remove_name(&relative);
    if info.is_directory {
        ResourceDescriptor::directory(parent, info.name.as_str())
    } else {
        ResourceDescriptor::file(parent, info.name.as_str(), info.size)
    }
}

fn not_found(path: &str) -> ResourceError {
    ResourceError::NotFound(format!("resource `{}` not found", path))
}

fn already_exists(path: &str) -> ResourceError {
    ResourceError::AlreadyExists(format!("resource `{}` already exists", path))
}
