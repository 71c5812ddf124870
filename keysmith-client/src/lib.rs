//! Keysmith Client Library
//!
//! Async client for reading and writing secrets stored in a remote
//! secrets-management service, with client-side end-to-end encryption.
//!
//! # Features
//!
//! - **Credential resolution**: each endpoint declares what it needs; the
//!   client picks the API key, a workspace token or a machine-identity
//!   session accordingly
//! - **Session lifecycle**: machine-identity login and renewal behind one
//!   shared, single-flight token cache
//! - **End-to-end encryption**: project keys are recovered from service-token
//!   metadata and used to seal and open secret fields locally
//! - **Folder traversal**: list every secret of an environment across its
//!   whole folder tree
//!
//! # Quick Start
//!
//! ```no_run
//! use keysmith_client::{KeysmithClient, SecretType, WorkspaceToken};
//!
//! #[tokio::main]
//! async fn main() -> keysmith_client::Result<()> {
//!     let client = KeysmithClient::builder()
//!         .api_key("ak-...")
//!         .workspace_token("6512a9f0c3", WorkspaceToken::e2ee("st.6512a9f0c3.abc.def"))
//!         .build()?;
//!
//!     let value = client
//!         .retrieve_secret_value("/app/DATABASE_URL", &"6512a9f0c3".into(), "dev", SecretType::Shared)
//!         .await?;
//!     println!("{} bytes", value.expose().len());
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! [`ClientConfig`] reads `<config dir>/keysmith/config.toml`; see its
//! module docs for the layout.

mod api;
mod auth;
mod client;
mod config;
mod folders;
mod options;
mod organizations;
mod project_key;
mod secrets;
mod session;
mod transport;

pub use api::{Organization, ServiceToken, Workspace, WorkspaceEnvironment};
pub use auth::{plan, AuthHeaders, AuthPlan, AuthResolver};
pub use client::{KeysmithClient, KeysmithClientBuilder};
pub use config::{ClientConfig, ENV_API_KEY, ENV_BASE_URL, ENV_CLIENT_ID, ENV_CLIENT_SECRET};
pub use options::{
    CreateSecretOptions, DeleteSecretOptions, ListSecretsOptions, RetrieveSecretOptions,
    UpdateSecretOptions,
};
pub use project_key::ProjectKeyCache;
pub use session::SessionManager;
pub use transport::{
    ApiRequest, ApiResponse, HttpTransport, Transport, API_KEY_HEADER, AUTHORIZATION_HEADER,
    DEFAULT_BASE_URL, DEFAULT_TIMEOUT,
};

pub use keysmith_core::{
    AuthRequirement, Credential, CredentialKind, CredentialStore, Folder, FolderPath,
    KeysmithError, MachineIdentity, Result, Secret, SecretLocation, SecretType, SessionToken,
    Sensitive, TokenInfo, TokenManager, WorkspaceId, WorkspaceToken,
};

/// Re-exported so callers can name request methods.
pub use reqwest::Method;
