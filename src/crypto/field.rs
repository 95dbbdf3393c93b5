//! Symmetric encryption for sensitive fields at rest.
//!
//! # Algorithm
//!
//! AES-256-GCM with a fresh random 16-byte IV per encryption. The stored
//! form is `hex(iv):hex(ciphertext || tag)`. Every update re-encrypts the
//! whole value under a new IV.
//!
//! Values written under AES-256-CBC share the `iv:ciphertext` shape but carry
//! no tag. They fail authentication and surface as data-integrity errors;
//! they have to be re-encrypted from the plaintext before they can be read.
//!
//! # Failure classes
//!
//! - A key that is absent or not exactly 64 hex characters is a
//!   configuration error and is caught when the key is loaded
//! - A stored value that is truncated, has the wrong number of delimiters or
//!   fails authentication is a data-integrity error. Messages never contain
//!   the stored value or any key material.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::types::{AuthError, Result};

// =============================================================================
// Constants
// =============================================================================

/// Key length in bytes (256 bits)
pub const KEY_LEN: usize = 32;

/// Key length as hex characters
pub const KEY_HEX_LEN: usize = KEY_LEN * 2;

/// Initialization vector length (16 bytes)
pub const IV_LEN: usize = 16;

/// GCM auth tag length (16 bytes)
pub const AUTH_TAG_LEN: usize = 16;

/// Separator between the IV and ciphertext halves
pub const DELIMITER: char = ':';

/// Placeholder shown in front of the last four characters
pub const MASK_PREFIX: &str = "XXXX-XXXX-XXXX-";

type Aes256Gcm16 = AesGcm<Aes256, U16>;

// =============================================================================
// Key
// =============================================================================

/// Process-wide field encryption key. Wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct FieldKey([u8; KEY_LEN]);

impl FieldKey {
    /// Parse a key from exactly 64 hex characters.
    ///
    /// Never truncates or pads: any other length is a configuration error.
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        if hex_key.len() != KEY_HEX_LEN {
            return Err(AuthError::Config(format!(
                "ENCRYPTION_KEY must be exactly {KEY_HEX_LEN} hexadecimal characters (got {})",
                hex_key.len()
            )));
        }

        let mut bytes = [0u8; KEY_LEN];
        hex::decode_to_slice(hex_key, &mut bytes).map_err(|_| {
            AuthError::Config("ENCRYPTION_KEY must contain only hexadecimal characters".into())
        })?;
        Ok(Self(bytes))
    }

    /// Generate a random key (for provisioning and tests)
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }
}

impl fmt::Debug for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FieldKey(<redacted>)")
    }
}

// =============================================================================
// Encrypted Field
// =============================================================================

/// Stored form of an encrypted value: `hex(iv):hex(ciphertext)`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedField(String);

impl EncryptedField {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Split and decode both halves
    fn decode(&self) -> Result<([u8; IV_LEN], Vec<u8>)> {
        let mut parts = self.0.split(DELIMITER);
        let (iv_hex, ct_hex) = match (parts.next(), parts.next(), parts.next()) {
            (Some(iv), Some(ct), None) => (iv, ct),
            _ => return Err(integrity("expected exactly one delimiter")),
        };

        let mut iv = [0u8; IV_LEN];
        if iv_hex.len() != IV_LEN * 2 {
            return Err(integrity("initialization vector has wrong length"));
        }
        hex::decode_to_slice(iv_hex, &mut iv)
            .map_err(|_| integrity("initialization vector is not valid hex"))?;

        let ciphertext =
            hex::decode(ct_hex).map_err(|_| integrity("ciphertext is not valid hex"))?;
        if ciphertext.len() < AUTH_TAG_LEN {
            return Err(integrity("ciphertext is truncated"));
        }

        Ok((iv, ciphertext))
    }
}

impl From<String> for EncryptedField {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for EncryptedField {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for EncryptedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for EncryptedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptedField({} chars)", self.0.len())
    }
}

fn integrity(reason: &str) -> AuthError {
    warn!(reason, "Encrypted field failed integrity check");
    AuthError::DataIntegrity(reason.to_string())
}

// =============================================================================
// Cipher
// =============================================================================

/// Encrypts, decrypts and masks sensitive fields with the process-wide key
#[derive(Clone)]
pub struct FieldCipher {
    cipher: Aes256Gcm16,
}

impl FieldCipher {
    pub fn new(key: &FieldKey) -> Result<Self> {
        let cipher = Aes256Gcm16::new_from_slice(&key.0)
            .map_err(|e| AuthError::Config(format!("Invalid field encryption key: {e}")))?;
        Ok(Self { cipher })
    }

    /// Build a cipher straight from the configured hex key
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        Self::new(&FieldKey::from_hex(hex_key)?)
    }

    /// Encrypt under a fresh random IV
    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedField> {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::<U16>::from_slice(&iv), plaintext.as_bytes())
            .map_err(|e| AuthError::Internal(format!("Encryption failed: {e}")))?;

        Ok(EncryptedField(format!(
            "{}{}{}",
            hex::encode(iv),
            DELIMITER,
            hex::encode(ciphertext)
        )))
    }

    /// Decrypt a stored field
    pub fn decrypt(&self, stored: &EncryptedField) -> Result<String> {
        let (iv, ciphertext) = stored.decode()?;

        let plaintext = self
            .cipher
            .decrypt(Nonce::<U16>::from_slice(&iv), ciphertext.as_slice())
            .map_err(|_| integrity("authentication failed"))?;

        String::from_utf8(plaintext).map_err(|e| {
            let mut bytes = e.into_bytes();
            bytes.zeroize();
            integrity("plaintext is not valid UTF-8")
        })
    }

    /// Decrypt a stored field and return only its masked view
    pub fn reveal_masked(&self, stored: &EncryptedField) -> Result<String> {
        let plaintext = Zeroizing::new(self.decrypt(stored)?);
        Ok(mask(&plaintext))
    }
}

impl fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FieldCipher(<redacted>)")
    }
}

/// Fixed prefix plus the last four characters of the value
pub fn mask(plaintext: &str) -> String {
    let chars: Vec<char> = plaintext.chars().collect();
    let start = chars.len().saturating_sub(4);
    let tail: String = chars[start..].iter().collect();
    format!("{MASK_PREFIX}{tail}")
}

// =============================================================================
// Tests
// =============================================================================
