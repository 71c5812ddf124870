//! # Keysmith Core
//!
//! Core library for Keysmith secret access.
//!
//! This crate provides:
//! - Domain types for credentials, secrets and folders
//! - The AES-256-GCM envelope used by end-to-end encrypted workspaces
//! - The [`SecretCodec`] that turns wire secrets into plaintext secrets
//! - Folder tree traversal over a [`FolderSource`]
//! - The [`TokenManager`] trait for machine-identity sessions
//!
//! No network code lives here; see `keysmith-client`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use keysmith_core::{ProjectKey, SecretCodec, SecretField};
//!
//! fn roundtrip(key: &ProjectKey) -> keysmith_core::Result<String> {
//!     let codec = SecretCodec::new(key, "workspace-id");
//!     let sealed = codec.seal(SecretField::Value, "secret123")?;
//!     codec.open(SecretField::Value, &sealed)
//! }
//! ```

pub mod codec;
pub mod crypto;
pub mod error;
pub mod model;
pub mod path;
pub mod secret;
pub mod sensitive;
pub mod token;
pub mod walk;

// Re-export commonly used types at crate root
pub use model::{
    AuthRequirement,
    Credential,
    CredentialKind,
    CredentialStore,
    MachineIdentity,
    WorkspaceId,
    WorkspaceToken,
};

pub use crypto::{
    CryptoError,
    ProjectKey,
    SealedField,
};

pub use codec::{plain_secret, SecretCodec};

pub use error::{KeysmithError, RemoteErrorKind, Result};

pub use path::{split_key_path, Folder, FolderPath, SecretLocation};

pub use secret::{FieldValue, RawSecret, Secret, SecretField, SecretType};

pub use sensitive::Sensitive;

pub use token::{SessionToken, TokenInfo, TokenManager};

pub use walk::{walk_folders, FolderSource};
