//! Credential cipher built from the shared secret.
//!
//! Login and password are padded to a fixed-width field, sealed with
//! AES-256-GCM, and carried base64-encoded in process state until the feed
//! synchronizer needs them. The fixed field width keeps the ciphertext
//! length independent of the credential length.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::errors::CryptoError;
use crate::secret::Secret;

/// Width of the padded credential field, in characters.
pub const CREDENTIAL_FIELD_WIDTH: usize = 128;

/// AES-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

/// Symmetric cipher handle keyed by the shared secret.
pub struct Cipher {
    aead: Aes256Gcm,
}

impl Cipher {
    /// Build a cipher from the 32-byte shared secret.
    pub fn new(secret: &Secret) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(secret.as_bytes());
        Self {
            aead: Aes256Gcm::new(key),
        }
    }

    /// Encrypt a credential value into a base64 `nonce || ciphertext` string.
    ///
    /// The plaintext is left-padded with spaces to a
    /// [`CREDENTIAL_FIELD_WIDTH`]-character field; longer values are kept
    /// whole.
    pub fn encrypt_field(&self, plaintext: &str) -> Result<String, CryptoError> {
        let padded = format!("{:>width$}", plaintext, width = CREDENTIAL_FIELD_WIDTH);
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .aead
            .encrypt(&nonce, padded.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;

        let mut wire = Vec::with_capacity(NONCE_LEN + sealed.len());
        wire.extend_from_slice(&nonce);
        wire.extend_from_slice(&sealed);
        Ok(BASE64.encode(wire))
    }

    /// Decrypt a base64 field produced by [`encrypt_field`](Self::encrypt_field)
    /// and strip the field padding.
    pub fn decrypt_field(&self, encoded: &str) -> Result<String, CryptoError> {
        let wire = BASE64.decode(encoded.trim())?;
        if wire.len() < NONCE_LEN {
            return Err(CryptoError::Truncated);
        }
        let (nonce, sealed) = wire.split_at(NONCE_LEN);
        let opened = self
            .aead
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CryptoError::Decrypt)?;
        let text = String::from_utf8(opened).map_err(|_| CryptoError::NotUtf8)?;
        Ok(text.trim_start().to_string())
    }
}
