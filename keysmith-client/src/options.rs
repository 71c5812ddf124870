//! Immutable option structs for the secret operations.
//!
//! Each struct carries the defaults of its operation; the `with_*` methods
//! return an updated copy.

use keysmith_core::{FolderPath, SecretType};

/// Options for listing secrets. Defaults to the root folder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListSecretsOptions {
    pub path: FolderPath,
}

impl ListSecretsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = FolderPath::new(path);
        self
    }
}

/// Options for reading one secret. Defaults to the root folder and
/// [`SecretType::Personal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrieveSecretOptions {
    pub path: FolderPath,
    pub secret_type: SecretType,
}

impl Default for RetrieveSecretOptions {
    fn default() -> Self {
        Self {
            path: FolderPath::root(),
            secret_type: SecretType::Personal,
        }
    }
}

impl RetrieveSecretOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = FolderPath::new(path);
        self
    }

    pub fn with_type(mut self, secret_type: SecretType) -> Self {
        self.secret_type = secret_type;
        self
    }
}

/// Options for creating a secret. Defaults to the root folder and
/// [`SecretType::Shared`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSecretOptions {
    pub path: FolderPath,
    pub secret_type: SecretType,
    pub comment: Option<String>,
}

impl Default for CreateSecretOptions {
    fn default() -> Self {
        Self {
            path: FolderPath::root(),
            secret_type: SecretType::Shared,
            comment: None,
        }
    }
}

impl CreateSecretOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = FolderPath::new(path);
        self
    }

    pub fn with_type(mut self, secret_type: SecretType) -> Self {
        self.secret_type = secret_type;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Options for updating a secret. Defaults to the root folder and
/// [`SecretType::Shared`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSecretOptions {
    pub path: FolderPath,
    pub secret_type: SecretType,
    pub comment: Option<String>,
}

impl Default for UpdateSecretOptions {
    fn default() -> Self {
        Self {
            path: FolderPath::root(),
            secret_type: SecretType::Shared,
            comment: None,
        }
    }
}

impl UpdateSecretOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = FolderPath::new(path);
        self
    }

    pub fn with_type(mut self, secret_type: SecretType) -> Self {
        self.secret_type = secret_type;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Options for deleting a secret. Defaults to the root folder and
/// [`SecretType::Personal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteSecretOptions {
    pub path: FolderPath,
    pub secret_type: SecretType,
}

impl Default for DeleteSecretOptions {
    fn default() -> Self {
        Self {
            path: FolderPath::root(),
            secret_type: SecretType::Personal,
        }
    }
}

impl DeleteSecretOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = FolderPath::new(path);
        self
    }

    pub fn with_type(mut self, secret_type: SecretType) -> Self {
        self.secret_type = secret_type;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_per_operation() {
        assert_eq!(ListSecretsOptions::new().path.as_str(), "/");
        assert_eq!(RetrieveSecretOptions::new().secret_type, SecretType::Personal);
        assert_eq!(CreateSecretOptions::new().secret_type, SecretType::Shared);
        assert_eq!(UpdateSecretOptions::new().secret_type, SecretType::Shared);
        assert_eq!(DeleteSecretOptions::new().secret_type, SecretType::Personal);
        assert!(CreateSecretOptions::new().path.is_root());
    }

    #[test]
    fn test_builders_normalize_paths() {
        let options = CreateSecretOptions::new()
            .with_path("folder1/folder2/")
            .with_comment("note");
        assert_eq!(options.path.as_str(), "/folder1/folder2");
        assert_eq!(options.comment.as_deref(), Some("note"));
    }
}
