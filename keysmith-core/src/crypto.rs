//! AES-256-GCM primitives for the end-to-end encryption envelope.
//!
//! The remote service stores every encrypted field as three base64 strings:
//! ciphertext, IV (nonce) and authentication tag. GCM produces the tag
//! appended to the ciphertext, so [`seal`] splits the last [`TAG_LENGTH`]
//! bytes off and [`open`] concatenates them back before verification.
//!
//! The per-workspace [`ProjectKey`] is itself shipped sealed inside the
//! service-token metadata; [`decrypt_project_key`] recovers it using the
//! final `.`-separated segment of the workspace token as the key.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{Aes256Gcm, AesGcm, Nonce};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Key length in bytes (256 bits for AES-256).
pub const KEY_LENGTH: usize = 32;

/// Nonce length used when sealing fields (96 bits).
pub const NONCE_LENGTH: usize = 12;

/// GCM authentication tag length.
pub const TAG_LENGTH: usize = 16;

/// Older service tokens were sealed with a 128-bit IV.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Error type for envelope cryptography.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("key must be {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("unsupported nonce length {actual}")]
    InvalidNonceLength { actual: usize },

    #[error("authentication tag must be {TAG_LENGTH} bytes, got {actual}")]
    InvalidTagLength { actual: usize },

    #[error("invalid base64 in {part}: {source}")]
    Base64 {
        part: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("encryption failed")]
    Seal,

    /// Wrong key, corrupted ciphertext or tampered tag/IV.
    #[error("authentication failed: wrong key or corrupted data")]
    Open,

    #[error("decrypted value is not valid UTF-8")]
    InvalidUtf8,
}

/// The symmetric key of a workspace.
///
/// Debug output is redacted and the bytes are zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ProjectKey([u8; KEY_LENGTH]);

impl ProjectKey {
    /// Build a key from exactly [`KEY_LENGTH`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; KEY_LENGTH] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: KEY_LENGTH,
                    actual: bytes.len(),
                })?;
        Ok(Self(key))
    }

    /// Generate a random key.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LENGTH];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for ProjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ProjectKey([REDACTED])")
    }
}

/// One encrypted field in transport form: three base64 strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedField {
    pub ciphertext: String,
    pub iv: String,
    pub tag: String,
}

/// Raw output of [`seal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBytes {
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    pub tag: Vec<u8>,
}

/// Encrypt with a fresh random 12-byte nonce.
///
/// `key` must be 32 bytes.
pub fn seal(key: &[u8], plaintext: &[u8]) -> Result<SealedBytes, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| invalid_key(key))?;

    let mut nonce = [0u8; NONCE_LENGTH];
    OsRng.fill_bytes(&mut nonce);

    let mut sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| CryptoError::Seal)?;

    let tag = sealed.split_off(sealed.len() - TAG_LENGTH);

    Ok(SealedBytes {
        ciphertext: sealed,
        nonce: nonce.to_vec(),
        tag,
    })
}

/// Verify and decrypt. Accepts 12- and 16-byte nonces.
///
/// `key` must be 32 bytes.
pub fn open(key: &[u8], ciphertext: &[u8], nonce: &[u8], tag: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if key.len() != KEY_LENGTH {
        return Err(invalid_key(key));
    }
    if tag.len() != TAG_LENGTH {
        return Err(CryptoError::InvalidTagLength { actual: tag.len() });
    }

    let mut combined = Vec::with_capacity(ciphertext.len() + TAG_LENGTH);
    combined.extend_from_slice(ciphertext);
    combined.extend_from_slice(tag);

    match nonce.len() {
        12 => Aes256Gcm::new_from_slice(key)
            .map_err(|_| invalid_key(key))?
            .decrypt(Nonce::from_slice(nonce), combined.as_slice())
            .map_err(|_| CryptoError::Open),
        16 => Aes256Gcm16::new_from_slice(key)
            .map_err(|_| invalid_key(key))?
            .decrypt(Nonce::<U16>::from_slice(nonce), combined.as_slice())
            .map_err(|_| CryptoError::Open),
        actual => Err(CryptoError::InvalidNonceLength { actual }),
    }
}

fn invalid_key(key: &[u8]) -> CryptoError {
    CryptoError::InvalidKeyLength {
        expected: KEY_LENGTH,
        actual: key.len(),
    }
}

fn decode(part: &'static str, encoded: &str) -> Result<Vec<u8>, CryptoError> {
    BASE64
        .decode(encoded)
        .map_err(|source| CryptoError::Base64 { part, source })
}

/// Seal one field under the project key and encode it for transport.
pub fn encrypt_field(key: &ProjectKey, plaintext: &[u8]) -> Result<SealedField, CryptoError> {
    let sealed = seal(key.as_bytes(), plaintext)?;
    Ok(SealedField {
        ciphertext: BASE64.encode(&sealed.ciphertext),
        iv: BASE64.encode(&sealed.nonce),
        tag: BASE64.encode(&sealed.tag),
    })
}

/// Decode and open one transported field under the project key.
pub fn decrypt_field(key: &ProjectKey, field: &SealedField) -> Result<Vec<u8>, CryptoError> {
    let ciphertext = decode("ciphertext", &field.ciphertext)?;
    let iv = decode("iv", &field.iv)?;
    let tag = decode("tag", &field.tag)?;
    open(key.as_bytes(), &ciphertext, &iv, &tag)
}

/// The key-material segment of a service token: everything after the last `.`.
pub fn service_token_secret(token: &str) -> &str {
    token.rsplit('.').next().unwrap_or(token)
}

/// Recover the project key sealed inside service-token metadata.
///
/// `encrypted_key` holds the service's `encryptedKey`, `iv` and `tag`.
pub fn decrypt_project_key(
    workspace_token: &str,
    encrypted_key: &SealedField,
) -> Result<ProjectKey, CryptoError> {
    let secret = service_token_secret(workspace_token);

    let ciphertext = decode("encryptedKey", &encrypted_key.ciphertext)?;
    let iv = decode("iv", &encrypted_key.iv)?;
    let tag = decode("tag", &encrypted_key.tag)?;

    let mut key_bytes = open(secret.as_bytes(), &ciphertext, &iv, &tag)?;
    let key = ProjectKey::from_slice(&key_bytes);
    key_bytes.zeroize();
    key
}

/// Seal `key` the way the service does when issuing a service token.
///
/// Used to build fixtures; the secret segment must be 32 bytes.
pub fn seal_project_key(workspace_token: &str, key: &ProjectKey) -> Result<SealedField, CryptoError> {
    let sealed = seal(service_token_secret(workspace_token).as_bytes(), key.as_bytes())?;
    Ok(SealedField {
        ciphertext: BASE64.encode(&sealed.ciphertext),
        iv: BASE64.encode(&sealed.nonce),
        tag: BASE64.encode(&sealed.tag),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "st.6512a9f0.0123456789abcdef0123456789abcdef";

    #[test]
    fn test_field_round_trip() {
        let key = ProjectKey::generate();
        for plaintext in [&b""[..], b"x", b"secret123", "ünïcødé ✓".as_bytes()] {
            let sealed = encrypt_field(&key, plaintext).unwrap();
            assert_eq!(decrypt_field(&key, &sealed).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_sealed_parts_have_wire_lengths() {
        let key = ProjectKey::generate();
        let sealed = seal(key.as_bytes(), b"hello").unwrap();
        assert_eq!(sealed.nonce.len(), NONCE_LENGTH);
        assert_eq!(sealed.tag.len(), TAG_LENGTH);
        assert_eq!(sealed.ciphertext.len(), 5);
    }

    #[test]
    fn test_nonce_is_fresh_per_call() {
        let key = ProjectKey::generate();
        let first = encrypt_field(&key, b"same plaintext").unwrap();
        let second = encrypt_field(&key, b"same plaintext").unwrap();
        assert_ne!(first.iv, second.iv);
        assert_ne!(first.ciphertext, second.ciphertext);
    }

    #[test]
    fn test_tampering_is_detected() {
        let key = ProjectKey::generate();
        let sealed = seal(key.as_bytes(), b"do not touch").unwrap();

        for (part, len) in [(0, sealed.ciphertext.len()), (1, sealed.nonce.len()), (2, sealed.tag.len())] {
            for byte in 0..len {
                for bit in 0..8 {
                    let mut tampered = sealed.clone();
                    let target = match part {
                        0 => &mut tampered.ciphertext,
                        1 => &mut tampered.nonce,
                        _ => &mut tampered.tag,
                    };
                    target[byte] ^= 1 << bit;

                    let result = open(
                        key.as_bytes(),
                        &tampered.ciphertext,
                        &tampered.nonce,
                        &tampered.tag,
                    );
                    assert!(matches!(result, Err(CryptoError::Open)));
                }
            }
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = encrypt_field(&ProjectKey::generate(), b"value").unwrap();
        let result = decrypt_field(&ProjectKey::generate(), &sealed);
        assert!(matches!(result, Err(CryptoError::Open)));
    }

    #[test]
    fn test_key_length_is_checked() {
        assert!(matches!(
            seal(b"short", b"x"),
            Err(CryptoError::InvalidKeyLength { actual: 5, .. })
        ));
        assert!(ProjectKey::from_slice(&[0u8; 31]).is_err());
    }

    #[test]
    fn test_bad_base64_is_reported() {
        let key = ProjectKey::generate();
        let mut sealed = encrypt_field(&key, b"value").unwrap();
        sealed.tag = "***".to_string();
        assert!(matches!(
            decrypt_field(&key, &sealed),
            Err(CryptoError::Base64 { part: "tag", .. })
        ));
    }

    #[test]
    fn test_service_token_secret_is_last_segment() {
        assert_eq!(
            service_token_secret(TOKEN),
            "0123456789abcdef0123456789abcdef"
        );
        assert_eq!(service_token_secret("no-dots"), "no-dots");
    }

    #[test]
    fn test_project_key_round_trip_through_service_token() {
        let key = ProjectKey::generate();
        let encrypted = seal_project_key(TOKEN, &key).unwrap();
        let recovered = decrypt_project_key(TOKEN, &encrypted).unwrap();
        assert_eq!(recovered.as_bytes(), key.as_bytes());
    }

    #[test]
    fn test_project_key_needs_matching_token() {
        let key = ProjectKey::generate();
        let encrypted = seal_project_key(TOKEN, &key).unwrap();
        let other = "st.6512a9f0.fedcba9876543210fedcba9876543210";
        assert!(matches!(
            decrypt_project_key(other, &encrypted),
            Err(CryptoError::Open)
        ));
    }

    #[test]
    fn test_sixteen_byte_iv_is_accepted() {
        let key = [7u8; KEY_LENGTH];
        let nonce = [9u8; 16];
        let cipher = Aes256Gcm16::new_from_slice(&key).unwrap();
        let mut sealed = cipher
            .encrypt(Nonce::<U16>::from_slice(&nonce), b"legacy".as_slice())
            .unwrap();
        let tag = sealed.split_off(sealed.len() - TAG_LENGTH);

        let opened = open(&key, &sealed, &nonce, &tag).unwrap();
        assert_eq!(opened, b"legacy");
    }

    #[test]
    fn test_project_key_debug_redacted() {
        let debug = format!("{:?}", ProjectKey::generate());
        assert!(debug.contains("REDACTED"));
    }
}
