//! Error types for the DirBridge core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation, including the shared
/// secret contract.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// The `security.secret_file` setting is absent or blank.
    #[error(
        "configuration 'security.secret_file' is missing or empty; \
         check your configuration file"
    )]
    MissingSecretFile,

    /// The secret key file could not be opened or read.
    #[error("cannot open secret key file '{path}': {detail}")]
    SecretFileUnreadable { path: String, detail: String },

    /// The secret is empty or longer than the fixed key width.
    #[error("secret key must be a non-empty string of at most {max} bytes, got {len}")]
    SecretLength { len: usize, max: usize },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Database errors
// ---------------------------------------------------------------------------

/// Errors from the SQLite persistence layer.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Underlying rusqlite error.
    #[error("database error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// A migration failed.
    #[error("database migration failed (version {version}): {detail}")]
    MigrationFailed { version: u32, detail: String },

    /// A record was not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Generic I/O error (e.g. file permissions).
    #[error("database I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Guard errors
// ---------------------------------------------------------------------------

/// Errors raised by the membership interceptor chain.
///
/// `PermissionDenied` is the expected, user-facing outcome of a vetoed
/// change; the remaining variants are lookup failures.
#[derive(Debug, Error)]
pub enum GuardError {
    /// The change targets a restricted group and the actor may not touch it.
    #[error("insufficient permissions to administrate '{subject}' in the '{group}' group")]
    PermissionDenied { subject: String, group: String },

    /// The target group id does not exist.
    #[error("unknown group id {0}")]
    UnknownGroup(i64),

    /// The administered account id does not exist.
    #[error("unknown account id {0}")]
    UnknownAccount(i64),

    /// Storage error while resolving the change.
    #[error("guard storage error: {0}")]
    Database(#[from] DatabaseError),
}

// ---------------------------------------------------------------------------
// Credential capture errors
// ---------------------------------------------------------------------------

/// Errors from credential capture.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The interactive prompt failed (terminal closed, I/O error).
    #[error("credential prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    /// A referenced environment variable is unset or empty.
    #[error("environment variable '{var}' is not set or empty")]
    MissingEnv { var: String },
}

// ---------------------------------------------------------------------------
// Cipher errors
// ---------------------------------------------------------------------------

/// Errors from the credential cipher.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// AEAD sealing failed.
    #[error("credential encryption failed")]
    Encrypt,

    /// AEAD opening failed (wrong key or tampered ciphertext).
    #[error("credential decryption failed")]
    Decrypt,

    /// The wire value is not valid base64.
    #[error("ciphertext is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// The wire value is shorter than a nonce.
    #[error("ciphertext is truncated")]
    Truncated,

    /// The decrypted field is not valid UTF-8.
    #[error("decrypted field is not valid UTF-8")]
    NotUtf8,
}

// ---------------------------------------------------------------------------
// Directory errors
// ---------------------------------------------------------------------------

/// Errors from feed-source settings and the destination directory connection.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// A required setting is absent from the source record's config text.
    #[error("feed source setting '{0}' is missing")]
    MissingSetting(&'static str),

    /// LDAP connection or bind error.
    #[error("LDAP error: {0}")]
    Ldap(#[from] ldap3::LdapError),
}

// ---------------------------------------------------------------------------
// Bootstrap errors
// ---------------------------------------------------------------------------

/// Errors from the startup feed bootstrap.
///
/// `SourceCount` and `SourceType` are data/integrity errors: the stored
/// source state is unexpected. They are distinct from [`ConfigError`],
/// which describes a bad configuration file. Both kinds abort startup.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Zero or several records carry the fixed feed source name.
    #[error("expected exactly one source named '{name}', found {found}")]
    SourceCount { name: String, found: usize },

    /// The feed source record has an unexpected type.
    #[error("source '{name}' must be of '{expected}' type, found '{found}'")]
    SourceType {
        name: String,
        expected: String,
        found: String,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// Storage error while provisioning or validating the source.
    #[error("bootstrap storage error: {0}")]
    Database(#[from] DatabaseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = ConfigError::SecretLength { len: 40, max: 32 };
        assert_eq!(
            err.to_string(),
            "secret key must be a non-empty string of at most 32 bytes, got 40"
        );

        let err = GuardError::PermissionDenied {
            subject: "Ada Lovelace".into(),
            group: "managers".into(),
        };
        assert_eq!(
            err.to_string(),
            "insufficient permissions to administrate 'Ada Lovelace' in the 'managers' group"
        );

        let err = BootstrapError::SourceCount {
            name: "dirbridge-feed".into(),
            found: 2,
        };
        assert!(err.to_string().contains("found 2"));
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let guard_err = GuardError::UnknownGroup(7);
        let core_err: CoreError = guard_err.into();
        assert!(matches!(core_err, CoreError::Guard(_)));

        let boot_err = BootstrapError::SourceType {
            name: "dirbridge-feed".into(),
            expected: "ldapfeed".into(),
            found: "native".into(),
        };
        let core_err: CoreError = boot_err.into();
        assert!(matches!(core_err, CoreError::Bootstrap(_)));
    }
}
