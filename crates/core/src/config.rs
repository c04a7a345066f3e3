//! TOML-based configuration for DirBridge.
//!
//! The configuration is loaded once at startup into an immutable
//! [`AppConfig`] value and passed by reference to whichever components need
//! it. Secrets never live in the file itself: the cipher seed is a file
//! path, and non-interactive credentials are environment variable names.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Daemon settings.
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Shared-secret settings.
    #[serde(default)]
    pub security: SecurityConfig,

    /// External LDAP feed settings.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Membership guard settings.
    #[serde(default)]
    pub guard: GuardConfig,

    /// Credential capture settings.
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

// ---------------------------------------------------------------------------
// Daemon
// ---------------------------------------------------------------------------

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory for persistent data (the SQLite database).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Optional directory for rolling log files; stderr only when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".into()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("/var/lib/dirbridge")
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
            log_dir: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Security
// ---------------------------------------------------------------------------

/// Shared-secret configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Path to the file holding the cipher seed (at most 32 bytes).
    #[serde(default)]
    pub secret_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

/// External LDAP feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Disable the feed entirely: the source record is still provisioned,
    /// but validation and identity-cache seeding are skipped.
    #[serde(default)]
    pub disabled: bool,

    /// Directory server URL written into the feed source record.
    #[serde(default = "default_feed_url")]
    pub url: String,

    /// Settings text stored in the feed source record
    /// (newline-separated `key = value` lines).
    #[serde(default)]
    pub settings: String,
}

fn default_feed_url() -> String {
    "ldap://localhost".into()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            url: default_feed_url(),
            settings: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Guard
// ---------------------------------------------------------------------------

/// Membership guard configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Group names only administrators may administrate.
    #[serde(default = "default_restricted_groups")]
    pub restricted_groups: Vec<String>,
}

fn default_restricted_groups() -> Vec<String> {
    ["managers", "users", "guests", "moderators"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            restricted_groups: default_restricted_groups(),
        }
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Where the destination directory credentials come from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CredentialMode {
    /// Interactive terminal prompts at startup.
    #[default]
    Prompt,
    /// Environment variables, for non-interactive deployments.
    Env,
}

/// Credential capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Capture mode.
    #[serde(default)]
    pub mode: CredentialMode,

    /// Environment variable holding the bind login (env mode).
    #[serde(default = "default_login_env")]
    pub login_env: String,

    /// Environment variable holding the bind password (env mode).
    #[serde(default = "default_password_env")]
    pub password_env: String,
}

fn default_login_env() -> String {
    "DIRBRIDGE_FEED_LOGIN".into()
}
fn default_password_env() -> String {
    "DIRBRIDGE_FEED_PASSWORD".into()
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            mode: CredentialMode::default(),
            login_env: default_login_env(),
            password_env: default_password_env(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Validate that all present fields are sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.daemon.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "daemon.log_level".into(),
                detail: format!("'{}' is not a log level", self.daemon.log_level),
            });
        }
        if self.feed.url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "feed.url".into(),
                detail: "feed URL must not be empty".into(),
            });
        }
        if self.credentials.mode == CredentialMode::Env {
            if self.credentials.login_env.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "credentials.login_env".into(),
                    detail: "env mode requires a login variable name".into(),
                });
            }
            if self.credentials.password_env.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "credentials.password_env".into(),
                    detail: "env mode requires a password variable name".into(),
                });
            }
        }
        Ok(())
    }

    /// Convenience: load and validate in one call.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// The secret file path, or [`ConfigError::MissingSecretFile`] when the
    /// setting is absent or blank.
    pub fn secret_file(&self) -> Result<&Path, ConfigError> {
        match &self.security.secret_file {
            Some(path) if !path.as_os_str().is_empty() => Ok(path),
            _ => Err(ConfigError::MissingSecretFile),
        }
    }
}
