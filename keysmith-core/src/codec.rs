//! Conversion between wire secrets and plaintext secrets.
//!
//! [`SecretCodec`] seals and opens fields for one E2EE workspace.
//! [`plain_secret`] handles workspaces whose secrets arrive in plaintext.

use crate::crypto::{self, CryptoError, ProjectKey, SealedField};
use crate::error::{KeysmithError, Result};
use crate::path::FolderPath;
use crate::secret::{FieldValue, RawSecret, Secret, SecretField};
use crate::sensitive::Sensitive;

/// Seals and opens secret fields under one workspace's project key.
pub struct SecretCodec<'a> {
    key: &'a ProjectKey,
    workspace: &'a str,
}

impl<'a> SecretCodec<'a> {
    pub fn new(key: &'a ProjectKey, workspace: &'a str) -> Self {
        Self { key, workspace }
    }

    /// Seal one plaintext field for sending.
    pub fn seal(&self, field: SecretField, plaintext: &str) -> Result<SealedField> {
        crypto::encrypt_field(self.key, plaintext.as_bytes()).map_err(|source| {
            KeysmithError::EncryptionFailed {
                workspace: self.workspace.to_string(),
                field,
                source,
            }
        })
    }

    /// Open one sealed field. The plaintext must be UTF-8.
    pub fn open(&self, field: SecretField, sealed: &SealedField) -> Result<String> {
        let fail = |source| KeysmithError::DecryptionFailed {
            workspace: self.workspace.to_string(),
            field,
            source,
        };
        let bytes = crypto::decrypt_field(self.key, sealed).map_err(fail)?;
        String::from_utf8(bytes).map_err(|_| fail(CryptoError::InvalidUtf8))
    }

    fn field(&self, field: SecretField, value: FieldValue) -> Result<String> {
        match value {
            FieldValue::Plain(plain) => Ok(plain),
            FieldValue::Sealed(sealed) => self.open(field, &sealed),
        }
    }

    /// Decrypt every field of one secret read from `folder`.
    pub fn decrypt_secret(&self, raw: RawSecret, folder: &FolderPath) -> Result<Secret> {
        let key = self.field(SecretField::Key, raw.key)?;
        let value = self.field(SecretField::Value, raw.value)?;
        let comment = raw
            .comment
            .map(|comment| self.field(SecretField::Comment, comment))
            .transpose()?;

        Ok(Secret {
            id: raw.id,
            version: raw.version,
            workspace: raw.workspace,
            environment: raw.environment,
            secret_type: raw.secret_type,
            path: raw.path.unwrap_or_else(|| folder.clone()),
            key,
            value: Sensitive::new(value),
            comment,
        })
    }

    /// Decrypt a listing. The first failure aborts the whole batch.
    pub fn decrypt_secrets(&self, raws: Vec<RawSecret>, folder: &FolderPath) -> Result<Vec<Secret>> {
        raws.into_iter()
            .map(|raw| self.decrypt_secret(raw, folder))
            .collect()
    }
}

/// Accept a secret from a plaintext workspace.
///
/// Sealed fields cannot be opened without a project key, so they are
/// rejected rather than passed through as ciphertext.
pub fn plain_secret(raw: RawSecret, folder: &FolderPath) -> Result<Secret> {
    fn plain(field: SecretField, value: FieldValue) -> Result<String> {
        match value {
            FieldValue::Plain(plain) => Ok(plain),
            FieldValue::Sealed(_) => Err(KeysmithError::MalformedSecret {
                field,
                message: "sealed field in a workspace without end-to-end encryption".to_string(),
            }),
        }
    }

    let key = plain(SecretField::Key, raw.key)?;
    let value = plain(SecretField::Value, raw.value)?;
    let comment = raw
        .comment
        .map(|comment| plain(SecretField::Comment, comment))
        .transpose()?;

    Ok(Secret {
        id: raw.id,
        version: raw.version,
        workspace: raw.workspace,
        environment: raw.environment,
        secret_type: raw.secret_type,
        path: raw.path.unwrap_or_else(|| folder.clone()),
        key,
        value: Sensitive::new(value),
        comment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::SecretType;

    fn sealed_raw(codec: &SecretCodec<'_>, key: &str, value: &str, comment: Option<&str>) -> RawSecret {
        RawSecret {
            id: "s-1".to_string(),
            version: 1,
            workspace: "ws-1".to_string(),
            environment: "dev".to_string(),
            secret_type: SecretType::Shared,
            path: None,
            key: FieldValue::Sealed(codec.seal(SecretField::Key, key).unwrap()),
            value: FieldValue::Sealed(codec.seal(SecretField::Value, value).unwrap()),
            comment: comment.map(|c| FieldValue::Sealed(codec.seal(SecretField::Comment, c).unwrap())),
        }
    }

    #[test]
    fn test_decrypt_secret_opens_every_field() {
        let key = ProjectKey::generate();
        let codec = SecretCodec::new(&key, "ws-1");
        let raw = sealed_raw(&codec, "API_TOKEN", "secret123", Some("rotated monthly"));

        let secret = codec.decrypt_secret(raw, &FolderPath::new("/app")).unwrap();
        assert_eq!(secret.key, "API_TOKEN");
        assert_eq!(secret.value.expose(), "secret123");
        assert_eq!(secret.comment.as_deref(), Some("rotated monthly"));
        assert_eq!(secret.path.as_str(), "/app");
        assert_eq!(secret.key_path(), "/app/API_TOKEN");
    }

    #[test]
    fn test_wrong_key_names_the_field() {
        let key = ProjectKey::generate();
        let other = ProjectKey::generate();
        let raw = sealed_raw(&SecretCodec::new(&key, "ws-1"), "KEY", "value", None);

        let err = SecretCodec::new(&other, "ws-1")
            .decrypt_secret(raw, &FolderPath::root())
            .unwrap_err();
        match err {
            KeysmithError::DecryptionFailed { field, workspace, .. } => {
                assert_eq!(field, SecretField::Key);
                assert_eq!(workspace, "ws-1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_batch_fails_on_first_bad_secret() {
        let key = ProjectKey::generate();
        let codec = SecretCodec::new(&key, "ws-1");
        let good = sealed_raw(&codec, "A", "1", None);
        let mut bad = sealed_raw(&codec, "B", "2", None);
        if let FieldValue::Sealed(field) = &mut bad.value {
            field.tag = "AAAAAAAAAAAAAAAAAAAAAA==".to_string();
        }

        let result = codec.decrypt_secrets(vec![good, bad], &FolderPath::root());
        assert!(matches!(
            result,
            Err(KeysmithError::DecryptionFailed {
                field: SecretField::Value,
                ..
            })
        ));
    }

    #[test]
    fn test_plain_secret_rejects_sealed_fields() {
        let key = ProjectKey::generate();
        let raw = sealed_raw(&SecretCodec::new(&key, "ws-1"), "KEY", "value", None);
        assert!(matches!(
            plain_secret(raw, &FolderPath::root()),
            Err(KeysmithError::MalformedSecret { .. })
        ));
    }

    #[test]
    fn test_plain_secret_keeps_reported_path() {
        let raw = RawSecret {
            id: "s-2".to_string(),
            version: 2,
            workspace: "ws-1".to_string(),
            environment: "dev".to_string(),
            secret_type: SecretType::Personal,
            path: Some(FolderPath::new("/nested")),
            key: FieldValue::Plain("KEY".to_string()),
            value: FieldValue::Plain("value".to_string()),
            comment: None,
        };

        let secret = plain_secret(raw, &FolderPath::root()).unwrap();
        assert_eq!(secret.path.as_str(), "/nested");
        assert_eq!(secret.value.expose(), "value");
    }
}
