//! Secret operations.
//!
//! Each operation resolves credentials, seals or opens fields when the
//! workspace is end-to-end encrypted, and issues exactly one request.
//! [`KeysmithClient::retrieve_all_secrets`] is the exception: it walks the
//! folder tree and lists every folder in turn.

use std::sync::Arc;
use tracing::{debug, info, warn};

use keysmith_core::{
    plain_secret, walk_folders, AuthRequirement, FolderPath, KeysmithError, ProjectKey, RawSecret,
    Result, Secret, SecretCodec, SecretField, SecretLocation, SecretType, Sensitive, WorkspaceId,
};

use crate::api::{SecretEnvelope, SecretWriteBody, SecretsEnvelope};
use crate::client::KeysmithClient;
use crate::options::{
    CreateSecretOptions, DeleteSecretOptions, ListSecretsOptions, RetrieveSecretOptions,
    UpdateSecretOptions,
};
use crate::transport::ApiRequest;

const RAW_SECRETS_PATH: &str = "/v3/secrets/raw";
const SEALED_SECRETS_PATH: &str = "/v3/secrets";

impl KeysmithClient {
    fn secrets_route(&self, workspace: &WorkspaceId) -> &'static str {
        if self.is_e2ee(workspace) {
            SEALED_SECRETS_PATH
        } else {
            RAW_SECRETS_PATH
        }
    }

    /// Credential requirement of the single-secret read.
    ///
    /// Reading one secret from an E2EE workspace needs the API key alongside
    /// the workspace token.
    pub fn single_read_requirement(&self, workspace: &WorkspaceId) -> AuthRequirement {
        if self.is_e2ee(workspace) {
            AuthRequirement::Both
        } else {
            AuthRequirement::EitherPreferToken
        }
    }

    /// The project key when `workspace` is end-to-end encrypted.
    async fn workspace_key(&self, workspace: &WorkspaceId) -> Result<Option<Arc<ProjectKey>>> {
        if self.is_e2ee(workspace) {
            Ok(Some(self.project_key(workspace).await?))
        } else {
            Ok(None)
        }
    }

    fn open_secrets(
        workspace: &WorkspaceId,
        key: Option<&ProjectKey>,
        raws: Vec<RawSecret>,
        folder: &FolderPath,
    ) -> Result<Vec<Secret>> {
        match key {
            Some(key) => SecretCodec::new(key, workspace.as_str()).decrypt_secrets(raws, folder),
            None => raws
                .into_iter()
                .map(|raw| plain_secret(raw, folder))
                .collect(),
        }
    }

    /// List the secrets of one folder.
    pub async fn retrieve_secrets(
        &self,
        workspace: &WorkspaceId,
        environment: &str,
        options: &ListSecretsOptions,
    ) -> Result<Vec<Secret>> {
        let key = self.workspace_key(workspace).await?;
        let request = ApiRequest::get(format!("{}/", self.secrets_route(workspace)))
            .with_query("workspaceId", workspace.as_str())
            .with_query("environment", environment)
            .with_query("secretPath", options.path.as_str());

        let envelope: SecretsEnvelope = self
            .send(request, AuthRequirement::EitherPreferToken, Some(workspace), "list secrets")
            .await?
            .json()?;

        debug!(
            workspace = %workspace,
            path = %options.path,
            count = envelope.secrets.len(),
            "Retrieved secrets"
        );
        Self::open_secrets(workspace, key.as_deref(), envelope.secrets, &options.path)
    }

    /// List the secrets of the folder at `path`.
    pub async fn retrieve_secrets_at_path(
        &self,
        path: &str,
        workspace: &WorkspaceId,
        environment: &str,
    ) -> Result<Vec<Secret>> {
        self.retrieve_secrets(workspace, environment, &ListSecretsOptions::new().with_path(path))
            .await
    }

    /// List the secrets of every folder, root first, then each folder in
    /// walk order. Each secret carries the path it was read from.
    pub async fn retrieve_all_secrets(
        &self,
        workspace: &WorkspaceId,
        environment: &str,
    ) -> Result<Vec<Secret>> {
        let root = FolderPath::root();
        let mut paths = vec![root.clone()];
        paths.extend(walk_folders(self, workspace, environment, &root).await?);

        let mut secrets = Vec::new();
        for path in &paths {
            let options = ListSecretsOptions {
                path: path.clone(),
            };
            secrets.extend(self.retrieve_secrets(workspace, environment, &options).await?);
        }

        info!(
            workspace = %workspace,
            folders = paths.len(),
            secrets = secrets.len(),
            "Retrieved all secrets"
        );
        Ok(secrets)
    }

    /// Read one secret by key.
    pub async fn retrieve_secret(
        &self,
        key: &str,
        workspace: &WorkspaceId,
        environment: &str,
        options: &RetrieveSecretOptions,
    ) -> Result<Secret> {
        let project_key = self.workspace_key(workspace).await?;
        let request = ApiRequest::get(self.secrets_route(workspace))
            .with_segment(key)
            .with_query("workspaceId", workspace.as_str())
            .with_query("environment", environment)
            .with_query("secretPath", options.path.as_str())
            .with_query("type", options.secret_type.as_str());

        let envelope: SecretEnvelope = self
            .send(
                request,
                self.single_read_requirement(workspace),
                Some(workspace),
                "retrieve secret",
            )
            .await?
            .json()?;

        let mut secrets = Self::open_secrets(
            workspace,
            project_key.as_deref(),
            vec![envelope.secret],
            &options.path,
        )?;
        secrets
            .pop()
            .ok_or_else(|| KeysmithError::remote(404, format!("secret {} not found", key)))
    }

    /// Read the value at `/folder/.../KEY`.
    ///
    /// Uses the single-secret read. When its credential requirement cannot
    /// be met, lists the folder and picks the secret by key and type instead.
    pub async fn retrieve_secret_value(
        &self,
        key_path: &str,
        workspace: &WorkspaceId,
        environment: &str,
        secret_type: SecretType,
    ) -> Result<Sensitive> {
        let location = SecretLocation::parse(key_path)?;
        let options = RetrieveSecretOptions::new()
            .with_path(location.folder.as_str())
            .with_type(secret_type);

        let requirement = self.single_read_requirement(workspace);
        match self.auth.check(requirement, Some(workspace), "retrieve secret") {
            Ok(_) => {
                let secret = self
                    .retrieve_secret(&location.key, workspace, environment, &options)
                    .await?;
                Ok(secret.value)
            }
            Err(KeysmithError::MissingCredential { credential, .. }) => {
                warn!(
                    key_path,
                    missing = %credential,
                    "Single-secret read unavailable, listing folder instead"
                );
                let listing = ListSecretsOptions {
                    path: location.folder.clone(),
                };
                self.retrieve_secrets(workspace, environment, &listing)
                    .await?
                    .into_iter()
                    .find(|secret| secret.key == location.key && secret.secret_type == secret_type)
                    .map(|secret| secret.value)
                    .ok_or_else(|| {
                        KeysmithError::remote(404, format!("secret {} not found", location))
                    })
            }
            Err(e) => Err(e),
        }
    }

    /// Create a secret.
    pub async fn create_secret(
        &self,
        key: &str,
        workspace: &WorkspaceId,
        environment: &str,
        value: &str,
        options: &CreateSecretOptions,
    ) -> Result<()> {
        let mut body = SecretWriteBody {
            workspace_id: workspace.to_string(),
            environment: environment.to_string(),
            secret_path: options.path.to_string(),
            secret_type: options.secret_type.to_string(),
            ..SecretWriteBody::default()
        };

        if self.is_e2ee(workspace) {
            let project_key = self.project_key(workspace).await?;
            let codec = SecretCodec::new(&project_key, workspace.as_str());
            body.seal_key(codec.seal(SecretField::Key, key)?);
            body.seal_value(codec.seal(SecretField::Value, value)?);
            if let Some(comment) = &options.comment {
                body.seal_comment(codec.seal(SecretField::Comment, comment)?);
            }
        } else {
            body.secret_value = Some(value.to_string());
            body.secret_comment = options.comment.clone();
        }

        let request = ApiRequest::post(self.secrets_route(workspace))
            .with_segment(key)
            .with_json(&body)?;
        self.send(request, AuthRequirement::EitherPreferToken, Some(workspace), "create secret")
            .await?;

        info!(workspace = %workspace, key_path = %options.path.key_path(key), "Created secret");
        Ok(())
    }

    /// Update the value (and optionally the comment) of a secret.
    pub async fn update_secret(
        &self,
        key: &str,
        workspace: &WorkspaceId,
        environment: &str,
        value: &str,
        options: &UpdateSecretOptions,
    ) -> Result<()> {
        let mut body = SecretWriteBody {
            workspace_id: workspace.to_string(),
            environment: environment.to_string(),
            secret_path: options.path.to_string(),
            secret_type: options.secret_type.to_string(),
            ..SecretWriteBody::default()
        };

        if self.is_e2ee(workspace) {
            let project_key = self.project_key(workspace).await?;
            let codec = SecretCodec::new(&project_key, workspace.as_str());
            body.seal_value(codec.seal(SecretField::Value, value)?);
            if let Some(comment) = &options.comment {
                body.seal_comment(codec.seal(SecretField::Comment, comment)?);
            }
        } else {
            body.secret_value = Some(value.to_string());
            body.secret_comment = options.comment.clone();
        }

        let request = ApiRequest::patch(self.secrets_route(workspace))
            .with_segment(key)
            .with_json(&body)?;
        self.send(request, AuthRequirement::EitherPreferToken, Some(workspace), "update secret")
            .await?;

        info!(workspace = %workspace, key_path = %options.path.key_path(key), "Updated secret");
        Ok(())
    }

    /// Delete a secret.
    pub async fn delete_secret(
        &self,
        key: &str,
        workspace: &WorkspaceId,
        environment: &str,
        options: &DeleteSecretOptions,
    ) -> Result<()> {
        let body = SecretWriteBody {
            workspace_id: workspace.to_string(),
            environment: environment.to_string(),
            secret_path: options.path.to_string(),
            secret_type: options.secret_type.to_string(),
            ..SecretWriteBody::default()
        };

        let request = ApiRequest::delete(self.secrets_route(workspace))
            .with_segment(key)
            .with_json(&body)?;
        self.send(request, AuthRequirement::EitherPreferToken, Some(workspace), "delete secret")
            .await?;

        info!(workspace = %workspace, key_path = %options.path.key_path(key), "Deleted secret");
        Ok(())
    }
}
