//! Secret DTOs.
//!
//! - [`RawSecret`] - A secret as received, each field plaintext or sealed
//! - [`Secret`] - A secret with every field in plaintext, handed to callers

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::SealedField;
use crate::error::KeysmithError;
use crate::path::FolderPath;
use crate::sensitive::Sensitive;

/// Whether a secret is shared by the workspace or personal to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretType {
    #[default]
    Shared,
    Personal,
}

impl SecretType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shared => "shared",
            Self::Personal => "personal",
        }
    }
}

impl fmt::Display for SecretType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SecretType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "shared" => Ok(Self::Shared),
            "personal" => Ok(Self::Personal),
            _ => Err(format!("unknown secret type: {}", s)),
        }
    }
}

/// The independently encrypted fields of a secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretField {
    Key,
    Value,
    Comment,
}

impl fmt::Display for SecretField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key => write!(f, "key"),
            Self::Value => write!(f, "value"),
            Self::Comment => write!(f, "comment"),
        }
    }
}

/// One field of a received secret: plaintext or sealed, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Plain(String),
    Sealed(SealedField),
}

impl FieldValue {
    pub fn is_sealed(&self) -> bool {
        matches!(self, Self::Sealed(_))
    }
}

/// Flat wire layout of a secret.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSecret {
    #[serde(default, rename = "_id")]
    mongo_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    version: i64,
    #[serde(default)]
    workspace: String,
    #[serde(default, rename = "type")]
    secret_type: SecretType,
    #[serde(default)]
    environment: String,
    #[serde(default)]
    secret_path: Option<String>,

    secret_key: Option<String>,
    secret_key_ciphertext: Option<String>,
    #[serde(rename = "secretKeyIV")]
    secret_key_iv: Option<String>,
    secret_key_tag: Option<String>,

    secret_value: Option<String>,
    secret_value_ciphertext: Option<String>,
    #[serde(rename = "secretValueIV")]
    secret_value_iv: Option<String>,
    secret_value_tag: Option<String>,

    secret_comment: Option<String>,
    secret_comment_ciphertext: Option<String>,
    #[serde(rename = "secretCommentIV")]
    secret_comment_iv: Option<String>,
    secret_comment_tag: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Validate one field group: the three sealed parts together, or plaintext.
fn field_group(
    field: SecretField,
    plain: Option<String>,
    ciphertext: Option<String>,
    iv: Option<String>,
    tag: Option<String>,
) -> Result<Option<FieldValue>, KeysmithError> {
    let plain = present(plain);
    match (present(ciphertext), present(iv), present(tag)) {
        (None, None, None) => Ok(plain.map(FieldValue::Plain)),
        (Some(ciphertext), Some(iv), Some(tag)) => {
            if plain.is_some() {
                return Err(KeysmithError::MalformedSecret {
                    field,
                    message: "both plaintext and ciphertext are present".to_string(),
                });
            }
            Ok(Some(FieldValue::Sealed(SealedField { ciphertext, iv, tag })))
        }
        _ => Err(KeysmithError::MalformedSecret {
            field,
            message: "ciphertext, IV and tag must be present together".to_string(),
        }),
    }
}

/// A secret as received from the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "WireSecret")]
pub struct RawSecret {
    pub id: String,
    pub version: i64,
    pub workspace: String,
    pub environment: String,
    pub secret_type: SecretType,
    pub path: Option<FolderPath>,
    pub key: FieldValue,
    pub value: FieldValue,
    pub comment: Option<FieldValue>,
}

impl TryFrom<WireSecret> for RawSecret {
    type Error = KeysmithError;

    fn try_from(wire: WireSecret) -> Result<Self, Self::Error> {
        let key = field_group(
            SecretField::Key,
            wire.secret_key,
            wire.secret_key_ciphertext,
            wire.secret_key_iv,
            wire.secret_key_tag,
        )?
        .ok_or_else(|| KeysmithError::MalformedSecret {
            field: SecretField::Key,
            message: "neither plaintext nor ciphertext is present".to_string(),
        })?;

        // An empty value is legitimate and arrives as "" or not at all.
        let value = field_group(
            SecretField::Value,
            wire.secret_value,
            wire.secret_value_ciphertext,
            wire.secret_value_iv,
            wire.secret_value_tag,
        )?
        .unwrap_or_else(|| FieldValue::Plain(String::new()));

        let comment = field_group(
            SecretField::Comment,
            wire.secret_comment,
            wire.secret_comment_ciphertext,
            wire.secret_comment_iv,
            wire.secret_comment_tag,
        )?;

        Ok(Self {
            id: wire.mongo_id.or(wire.id).unwrap_or_default(),
            version: wire.version,
            workspace: wire.workspace,
            environment: wire.environment,
            secret_type: wire.secret_type,
            path: wire.secret_path.as_deref().map(FolderPath::new),
            key,
            value,
            comment,
        })
    }
}

/// A secret with every field in plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Secret {
    pub id: String,
    pub version: i64,
    pub workspace: String,
    pub environment: String,
    pub secret_type: SecretType,
    /// Folder the secret was read from.
    pub path: FolderPath,
    pub key: String,
    pub value: Sensitive,
    pub comment: Option<String>,
}

impl Secret {
    /// Full `/path/KEY` of this secret.
    pub fn key_path(&self) -> String {
        self.path.key_path(&self.key)
    }
}
