//! Resource descriptors returned to API callers.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourceType {
    File,
    Directory,
}

/// A file or directory inside a user's drive.
///
/// `path` is the user-relative parent directory, always in directory form
/// (`/` for entries at the root). `size` is omitted for directories.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub path: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(rename = "type")]
    pub kind: ResourceType,
}

impl ResourceDescriptor {
    pub fn directory(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            size: None,
            kind: ResourceType::Directory,
        }
    }

    pub fn file(path: impl Into<String>, name: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            size: Some(size),
            kind: ResourceType::File,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_serializes_without_size() {
        let json = serde_json::to_value(ResourceDescriptor::directory("/", "folder")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"path": "/", "name": "folder", "type": "DIRECTORY"})
        );
    }

    #[test]
    fn test_file_serializes_with_size() {
        let json =
            serde_json::to_value(ResourceDescriptor::file("folder/sub/", "file.txt", 42)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"path": "folder/sub/", "name": "file.txt", "size": 42, "type": "FILE"})
        );
    }
}
