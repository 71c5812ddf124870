//! Domain model types for Keysmith.
//!
//! This module defines the identity side of the model:
//! - [`WorkspaceId`] - Identifier for a workspace (project)
//! - [`Credential`] - One piece of caller-supplied identity material
//! - [`CredentialStore`] - The immutable set of credentials a client holds
//! - [`AuthRequirement`] - What an endpoint needs to authorize a request

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::sensitive::Sensitive;

/// Identifier for a workspace (called a project by the remote service).
///
/// # Examples
///
/// ```
/// use keysmith_core::WorkspaceId;
///
/// let workspace = WorkspaceId::new("65a1f0c2e4b0d1a2b3c4d5e6");
/// assert_eq!(workspace.as_str(), "65a1f0c2e4b0d1a2b3c4d5e6");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(String);

impl WorkspaceId {
    /// Create a new workspace ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the workspace ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for WorkspaceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for WorkspaceId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Kind of credential, used to name what is missing in errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    /// Long-lived account API key.
    ApiKey,
    /// Any source of a bearer token (workspace token or machine identity).
    BearerToken,
    /// Workspace-scoped service token.
    WorkspaceToken,
    /// Client-id/client-secret pair for machine-identity login.
    MachineIdentity,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey => write!(f, "API key"),
            Self::BearerToken => write!(f, "bearer token"),
            Self::WorkspaceToken => write!(f, "workspace token"),
            Self::MachineIdentity => write!(f, "machine identity"),
        }
    }
}

/// A workspace-scoped service token and whether the workspace is E2EE-enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceToken {
    /// The raw token string, `<prefix>.<...>.<secret>`.
    pub token: Sensitive,

    /// Whether secrets in this workspace are end-to-end encrypted.
    #[serde(default)]
    pub e2ee: bool,
}

impl WorkspaceToken {
    /// Create a token for a workspace without end-to-end encryption.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Sensitive::new(token),
            e2ee: false,
        }
    }

    /// Create a token for an E2EE-enabled workspace.
    pub fn e2ee(token: impl Into<String>) -> Self {
        Self {
            token: Sensitive::new(token),
            e2ee: true,
        }
    }
}

/// Client-id/client-secret pair exchanged for short-lived session tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineIdentity {
    pub client_id: String,
    pub client_secret: Sensitive,
}

impl MachineIdentity {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: Sensitive::new(client_secret),
        }
    }
}

/// One piece of identity material supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Static account API key, sent as `X-API-KEY`.
    ApiKey(Sensitive),

    /// Bearer token scoped to a single workspace.
    WorkspaceToken {
        workspace: WorkspaceId,
        token: WorkspaceToken,
    },

    /// Machine identity used for universal-auth login.
    MachineIdentity(MachineIdentity),
}

/// The credentials a client was constructed with.
///
/// Populated once and immutable afterwards; holds no behavior beyond
/// existence checks. Empty strings count as absent.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    api_key: Option<Sensitive>,
    workspace_tokens: HashMap<WorkspaceId, WorkspaceToken>,
    machine_identity: Option<MachineIdentity>,
}

impl CredentialStore {
    /// Create an empty credential store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a credential, replacing any previous one of the same slot.
    pub fn with(mut self, credential: Credential) -> Self {
        match credential {
            Credential::ApiKey(key) => {
                self.api_key = (!key.is_empty()).then_some(key);
            }
            Credential::WorkspaceToken { workspace, token } => {
                if !token.token.is_empty() {
                    self.workspace_tokens.insert(workspace, token);
                }
            }
            Credential::MachineIdentity(identity) => {
                if !identity.client_id.is_empty() && !identity.client_secret.is_empty() {
                    self.machine_identity = Some(identity);
                }
            }
        }
        self
    }

    /// The static API key, if configured.
    pub fn api_key(&self) -> Option<&Sensitive> {
        self.api_key.as_ref()
    }

    /// The service token configured for a workspace.
    pub fn workspace_token(&self, workspace: &WorkspaceId) -> Option<&WorkspaceToken> {
        self.workspace_tokens.get(workspace)
    }

    /// The machine identity, if configured.
    pub fn machine_identity(&self) -> Option<&MachineIdentity> {
        self.machine_identity.as_ref()
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn has_machine_identity(&self) -> bool {
        self.machine_identity.is_some()
    }

    /// Whether a bearer token can be obtained for requests against `workspace`.
    ///
    /// A workspace token only counts for its own workspace; a machine
    /// identity counts everywhere.
    pub fn has_token_source(&self, workspace: Option<&WorkspaceId>) -> bool {
        let workspace_token = workspace
            .map(|w| self.workspace_tokens.contains_key(w))
            .unwrap_or(false);
        workspace_token || self.has_machine_identity()
    }

    /// Whether the workspace was configured as end-to-end encrypted.
    pub fn is_e2ee(&self, workspace: &WorkspaceId) -> bool {
        self.workspace_tokens
            .get(workspace)
            .map(|t| t.e2ee)
            .unwrap_or(false)
    }

    /// Workspaces with a configured token, sorted.
    pub fn workspaces(&self) -> Vec<&WorkspaceId> {
        let mut ids: Vec<_> = self.workspace_tokens.keys().collect();
        ids.sort();
        ids
    }
}

impl FromIterator<Credential> for CredentialStore {
    fn from_iter<I: IntoIterator<Item = Credential>>(iter: I) -> Self {
        iter.into_iter()
            .fold(CredentialStore::new(), |store, credential| store.with(credential))
    }
}

/// What an endpoint needs in order to authorize a request.
///
/// Fixed per API call and resolved through one exhaustive match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthRequirement {
    /// No credential headers (login, renew).
    None,
    /// `X-API-KEY` only.
    ApiKeyOnly,
    /// `Authorization: Bearer` only.
    TokenOnly,
    /// Bearer token when one is obtainable, API key otherwise.
    EitherPreferToken,
    /// Both headers.
    Both,
}

impl AuthRequirement {
    pub fn needs_api_key(&self) -> bool {
        matches!(self, Self::ApiKeyOnly | Self::Both)
    }

    pub fn needs_token(&self) -> bool {
        matches!(self, Self::TokenOnly | Self::Both)
    }
}
