//! Shared-secret loading for the credential cipher.
//!
//! The secret is read once at startup from the file named by
//! `security.secret_file`, validated, and padded to exactly [`SECRET_LEN`]
//! bytes so it can key the cipher directly.

use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::errors::ConfigError;

/// Exact stored length of the shared secret, in bytes.
pub const SECRET_LEN: usize = 32;

/// Filler character used to right-pad short secrets.
const SECRET_FILL: char = '#';

/// A validated, fixed-length shared secret.
///
/// Always exactly [`SECRET_LEN`] bytes. The `Debug` impl does not reveal
/// the contents.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Validate and pad a raw secret string.
    ///
    /// The input is trimmed; the result must be non-empty and at most
    /// [`SECRET_LEN`] bytes. Shorter secrets are right-padded with `#`.
    pub fn from_raw(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.len() > SECRET_LEN {
            return Err(ConfigError::SecretLength {
                len: trimmed.len(),
                max: SECRET_LEN,
            });
        }
        let mut padded = String::with_capacity(SECRET_LEN);
        padded.push_str(trimmed);
        while padded.len() < SECRET_LEN {
            padded.push(SECRET_FILL);
        }
        Ok(Self(padded))
    }

    /// Load and validate the secret from the file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading secret key file");
        let raw =
            std::fs::read_to_string(path).map_err(|e| ConfigError::SecretFileUnreadable {
                path: path.display().to_string(),
                detail: e.to_string(),
            })?;
        Self::from_raw(&raw)
    }

    /// The padded secret bytes (always [`SECRET_LEN`] long).
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// The padded secret as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(<{} bytes>)", SECRET_LEN)
    }
}
