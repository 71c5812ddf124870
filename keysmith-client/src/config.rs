//! Client configuration file.
//!
//! ```toml
//! base_url = "https://app.infisical.com/api"
//! timeout_secs = 10
//! api_key = "..."
//!
//! [machine_identity]
//! client_id = "..."
//! client_secret = "..."
//!
//! [workspaces.6512a9f0c3]
//! token = "st.6512a9f0c3.abc.def"
//! e2ee = true
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use keysmith_core::{
    Credential, CredentialStore, KeysmithError, MachineIdentity, Result, Sensitive, WorkspaceId,
    WorkspaceToken,
};

use crate::transport::DEFAULT_BASE_URL;

pub const ENV_API_KEY: &str = "KEYSMITH_API_KEY";
pub const ENV_CLIENT_ID: &str = "KEYSMITH_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "KEYSMITH_CLIENT_SECRET";
pub const ENV_BASE_URL: &str = "KEYSMITH_BASE_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API root.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Dump requests and responses at debug level.
    #[serde(default)]
    pub verbose: bool,

    /// Renew session tokens this many seconds before expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_buffer_secs: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<Sensitive>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_identity: Option<MachineIdentity>,

    /// Workspace tokens keyed by workspace id.
    #[serde(default)]
    pub workspaces: BTreeMap<String, WorkspaceToken>,

    /// Path of the file this was loaded from.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            verbose: false,
            expiry_buffer_secs: None,
            api_key: None,
            machine_identity: None,
            workspaces: BTreeMap::new(),
            config_path: None,
        }
    }
}

impl ClientConfig {
    /// Default location: `<config dir>/keysmith/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "keysmith").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from the default location, or defaults if no file exists.
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from_path(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load from an explicit file.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        debug!("loading client config from {:?}", path);

        let contents = std::fs::read_to_string(path).map_err(|e| KeysmithError::Config {
            message: format!("failed to read config from {}: {}", path.display(), e),
        })?;
        let mut config: ClientConfig = toml::from_str(&contents).map_err(|e| KeysmithError::Config {
            message: format!("failed to parse config from {}: {}", path.display(), e),
        })?;

        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Apply `KEYSMITH_*` environment variables on top of the file.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(api_key) = lookup(ENV_API_KEY) {
            self.api_key = Some(Sensitive::new(api_key));
        }
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.base_url = base_url;
        }

        let client_id = lookup(ENV_CLIENT_ID);
        let client_secret = lookup(ENV_CLIENT_SECRET);
        if client_id.is_some() || client_secret.is_some() {
            let current = self.machine_identity.take();
            let client_id = client_id
                .or_else(|| current.as_ref().map(|m| m.client_id.clone()))
                .unwrap_or_default();
            let client_secret = client_secret
                .or_else(|| current.as_ref().map(|m| m.client_secret.expose().to_string()))
                .unwrap_or_default();
            self.machine_identity = Some(MachineIdentity::new(client_id, client_secret));
        }
        self
    }

    /// The immutable credential set described by this file.
    pub fn credentials(&self) -> CredentialStore {
        let mut credentials = CredentialStore::new();
        if let Some(api_key) = &self.api_key {
            credentials = credentials.with(Credential::ApiKey(api_key.clone()));
        }
        if let Some(identity) = &self.machine_identity {
            credentials = credentials.with(Credential::MachineIdentity(identity.clone()));
        }
        for (workspace, token) in &self.workspaces {
            credentials = credentials.with(Credential::WorkspaceToken {
                workspace: WorkspaceId::new(workspace.as_str()),
                token: token.clone(),
            });
        }
        credentials
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, 10);
        assert!(!config.verbose);
        assert!(config.credentials().api_key().is_none());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_API_KEY, "ak-env"),
            (ENV_CLIENT_ID, "id-env"),
            (ENV_BASE_URL, ""),
        ]
        .into_iter()
        .collect();

        let config = ClientConfig {
            machine_identity: Some(MachineIdentity::new("id-file", "secret-file")),
            ..ClientConfig::default()
        }
        .with_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.api_key.as_ref().unwrap().expose(), "ak-env");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        let identity = config.machine_identity.unwrap();
        assert_eq!(identity.client_id, "id-env");
        assert_eq!(identity.client_secret.expose(), "secret-file");
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let config = ClientConfig {
            api_key: Some(Sensitive::new("ak-secret")),
            ..ClientConfig::default()
        };
        assert!(!format!("{:?}", config).contains("ak-secret"));
    }
}
