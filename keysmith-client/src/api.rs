//! Request and response bodies for the pass-through endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keysmith_core::{Folder, KeysmithError, RawSecret, Result, SealedField};

/// Service-token metadata from `GET /v2/service-token/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceToken {
    #[serde(default, rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub workspace: String,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub encrypted_key: Option<String>,
    #[serde(default)]
    pub iv: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl ServiceToken {
    /// The sealed project key; every part must be present and non-empty.
    pub fn key_material(&self) -> Result<SealedField> {
        fn part(value: &Option<String>, field: &'static str) -> Result<String> {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or(KeysmithError::MalformedServiceToken { field })
        }

        Ok(SealedField {
            ciphertext: part(&self.encrypted_key, "encryptedKey")?,
            iv: part(&self.iv, "iv")?,
            tag: part(&self.tag, "tag")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "WireOrganization")]
pub struct Organization {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub customer_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceEnvironment {
    pub name: String,
    pub slug: String,
}

/// A project (workspace) inside an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "WireWorkspace")]
pub struct Workspace {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub environments: Vec<WorkspaceEnvironment>,
    #[serde(default)]
    pub auto_capitalization: bool,
}

// The service may send `_id`, `id` or both; `_id` wins.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireOrganization {
    #[serde(default, rename = "_id")]
    mongo_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    customer_id: Option<String>,
}

impl From<WireOrganization> for Organization {
    fn from(wire: WireOrganization) -> Self {
        Self {
            id: wire.mongo_id.or(wire.id).unwrap_or_default(),
            name: wire.name,
            customer_id: wire.customer_id,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireWorkspace {
    #[serde(default, rename = "_id")]
    mongo_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    organization: Option<String>,
    #[serde(default)]
    environments: Vec<WorkspaceEnvironment>,
    #[serde(default)]
    auto_capitalization: bool,
}

impl From<WireWorkspace> for Workspace {
    fn from(wire: WireWorkspace) -> Self {
        Self {
            id: wire.mongo_id.or(wire.id).unwrap_or_default(),
            name: wire.name,
            organization: wire.organization,
            environments: wire.environments,
            auto_capitalization: wire.auto_capitalization,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrganizationsEnvelope {
    #[serde(default)]
    pub organizations: Vec<Organization>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkspacesEnvelope {
    #[serde(default)]
    pub workspaces: Vec<Workspace>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SecretsEnvelope {
    #[serde(default)]
    pub secrets: Vec<RawSecret>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SecretEnvelope {
    pub secret: RawSecret,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FoldersEnvelope {
    #[serde(default)]
    pub folders: Vec<Folder>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FolderEnvelope {
    pub folder: Folder,
}

/// JSON body of secret create/update/delete.
///
/// Plaintext workspaces use the `secretValue`-style fields; E2EE workspaces
/// send the ciphertext groups instead.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SecretWriteBody {
    pub workspace_id: String,
    pub environment: String,
    pub secret_path: String,
    #[serde(rename = "type")]
    pub secret_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_comment: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key_ciphertext: Option<String>,
    #[serde(rename = "secretKeyIV", skip_serializing_if = "Option::is_none")]
    pub secret_key_iv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key_tag: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_value_ciphertext: Option<String>,
    #[serde(rename = "secretValueIV", skip_serializing_if = "Option::is_none")]
    pub secret_value_iv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_value_tag: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_comment_ciphertext: Option<String>,
    #[serde(rename = "secretCommentIV", skip_serializing_if = "Option::is_none")]
    pub secret_comment_iv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_comment_tag: Option<String>,
}

impl SecretWriteBody {
    pub fn seal_key(&mut self, sealed: SealedField) {
        self.secret_key_ciphertext = Some(sealed.ciphertext);
        self.secret_key_iv = Some(sealed.iv);
        self.secret_key_tag = Some(sealed.tag);
    }

    pub fn seal_value(&mut self, sealed: SealedField) {
        self.secret_value_ciphertext = Some(sealed.ciphertext);
        self.secret_value_iv = Some(sealed.iv);
        self.secret_value_tag = Some(sealed.tag);
    }

    pub fn seal_comment(&mut self, sealed: SealedField) {
        self.secret_comment_ciphertext = Some(sealed.ciphertext);
        self.secret_comment_iv = Some(sealed.iv);
        self.secret_comment_tag = Some(sealed.tag);
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateFolderBody<'a> {
    pub workspace_id: &'a str,
    pub environment: &'a str,
    pub name: &'a str,
    pub path: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateFolderBody<'a> {
    pub workspace_id: &'a str,
    pub environment: &'a str,
    pub name: &'a str,
    pub path: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeleteFolderBody<'a> {
    pub workspace_id: &'a str,
    pub environment: &'a str,
    pub path: &'a str,
}
