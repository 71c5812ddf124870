//! Folder paths and `/folder/.../KEY` secret locations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{KeysmithError, Result};

/// A normalized folder path.
///
/// Always starts with `/`; the trailing slash is stripped except for the
/// root, and empty segments are dropped.
///
/// ```
/// use keysmith_core::FolderPath;
///
/// assert_eq!(FolderPath::new("folder1/folder2/").as_str(), "/folder1/folder2");
/// assert!(FolderPath::new("").is_root());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct FolderPath(String);

impl FolderPath {
    /// Normalize a raw path.
    pub fn new(raw: &str) -> Self {
        let segments: Vec<&str> = raw
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        if segments.is_empty() {
            Self::root()
        } else {
            Self(format!("/{}", segments.join("/")))
        }
    }

    /// The implicit root folder, `/`.
    pub fn root() -> Self {
        Self("/".to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path of a direct child folder.
    pub fn join(&self, name: &str) -> Self {
        if self.is_root() {
            Self::new(name)
        } else {
            Self::new(&format!("{}/{}", self.0, name))
        }
    }

    /// Full `/path/KEY` for a secret stored in this folder.
    pub fn key_path(&self, key: &str) -> String {
        if self.is_root() {
            format!("/{}", key)
        } else {
            format!("{}/{}", self.0, key)
        }
    }
}

impl Default for FolderPath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for FolderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FolderPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for FolderPath {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl From<FolderPath> for String {
    fn from(path: FolderPath) -> Self {
        path.0
    }
}

/// Split `/folder1/folder2/KEY` into its raw folder prefix and key.
///
/// The prefix keeps its trailing slash (`/folder1/folder2/`); a bare `KEY`
/// yields an empty prefix.
pub fn split_key_path(key_path: &str) -> Result<(&str, &str)> {
    let (prefix, key) = match key_path.rfind('/') {
        Some(idx) => (&key_path[..=idx], &key_path[idx + 1..]),
        None => ("", key_path),
    };

    if key.trim().is_empty() {
        return Err(KeysmithError::InvalidPath {
            path: key_path.to_string(),
            message: "no secret key after the last '/'".to_string(),
        });
    }

    Ok((prefix, key))
}

/// A secret addressed by folder and key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretLocation {
    pub folder: FolderPath,
    pub key: String,
}

impl SecretLocation {
    /// Parse a `/folder/.../KEY` string.
    pub fn parse(key_path: &str) -> Result<Self> {
        let (prefix, key) = split_key_path(key_path)?;
        Ok(Self {
            folder: FolderPath::new(prefix),
            key: key.to_string(),
        })
    }
}

impl fmt::Display for SecretLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.folder.key_path(&self.key))
    }
}

/// A folder as returned by the remote service.
///
/// `parent_id` is `None` only for the implicit root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, rename = "envId", skip_serializing_if = "Option::is_none")]
    pub environment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Full path of the folder; filled in by the client, not the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<FolderPath>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_path_normalization() {
        assert_eq!(FolderPath::new("/").as_str(), "/");
        assert_eq!(FolderPath::new("").as_str(), "/");
        assert_eq!(FolderPath::new("/a/b/").as_str(), "/a/b");
        assert_eq!(FolderPath::new("a/b").as_str(), "/a/b");
        assert_eq!(FolderPath::new("//a//b//").as_str(), "/a/b");
    }

    #[test]
    fn test_folder_path_keeps_whitespace_in_names() {
        assert_eq!(FolderPath::new("/ cfg /x").as_str(), "/ cfg /x");
        assert_ne!(FolderPath::new("/ cfg "), FolderPath::new("/cfg"));
    }

    #[test]
    fn test_folder_path_join() {
        let root = FolderPath::root();
        let a = root.join("A");
        assert_eq!(a.as_str(), "/A");
        assert_eq!(a.join("A1").as_str(), "/A/A1");
    }

    #[test]
    fn test_key_path() {
        assert_eq!(FolderPath::root().key_path("KEY"), "/KEY");
        assert_eq!(FolderPath::new("/a/b").key_path("KEY"), "/a/b/KEY");
    }

    #[test]
    fn test_split_nested_key_path() {
        let (path, key) = split_key_path("/folder1/folder2/KEY").unwrap();
        assert_eq!(path, "/folder1/folder2/");
        assert_eq!(key, "KEY");
    }

    #[test]
    fn test_split_root_key_path() {
        let (path, key) = split_key_path("/KEY").unwrap();
        assert_eq!(path, "/");
        assert_eq!(key, "KEY");

        let (path, key) = split_key_path("KEY").unwrap();
        assert_eq!(path, "");
        assert_eq!(key, "KEY");
    }

    #[test]
    fn test_split_rejects_trailing_slash() {
        let result = split_key_path("/folder1/");
        assert!(matches!(result, Err(KeysmithError::InvalidPath { .. })));
    }

    #[test]
    fn test_secret_location_normalizes_folder() {
        let location = SecretLocation::parse("/folder1/folder2/KEY").unwrap();
        assert_eq!(location.folder.as_str(), "/folder1/folder2");
        assert_eq!(location.key, "KEY");
        assert_eq!(location.to_string(), "/folder1/folder2/KEY");

        let location = SecretLocation::parse("KEY").unwrap();
        assert!(location.folder.is_root());
    }

    #[test]
    fn test_folder_deserializes_wire_format() {
        let folder: Folder = serde_json::from_value(serde_json::json!({
            "id": "f-1",
            "name": "database",
            "parentId": null,
            "envId": "env-1",
            "version": 1,
            "createdAt": "2024-01-10T08:00:00.000Z",
            "updatedAt": "2024-01-10T08:00:00.000Z"
        }))
        .unwrap();

        assert_eq!(folder.id, "f-1");
        assert_eq!(folder.name, "database");
        assert!(folder.parent_id.is_none());
        assert_eq!(folder.environment_id.as_deref(), Some("env-1"));
        assert!(folder.path.is_none());
    }
}
