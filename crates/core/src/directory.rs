//! Feed-source settings and the destination directory connection.
//!
//! The feed source record stores its directory layout as plain
//! `key = value` settings text. [`FeedSettings::configure`] turns a
//! validated record plus the captured bind credentials into the connection
//! configuration the feed synchronizer consumes; [`FeedConnection`] adds a
//! deferred reachability check over `ldap3`.

use std::collections::HashMap;
use std::fmt;

use ldap3::LdapConn;
use tracing::{debug, info};

use crate::errors::DirectoryError;
use crate::models::{Credentials, SourceRecord};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Resolved connection settings for the LDAP feed.
#[derive(Clone)]
pub struct FeedSettings {
    pub source_id: i64,
    pub name: String,
    pub source_type: String,
    pub url: String,
    /// Search base for account entries, when configured.
    pub user_base_dn: Option<String>,
    /// Search base for group entries; mandatory.
    pub group_base_dn: String,
    pub bind_login: String,
    pub bind_password: String,
}

impl FeedSettings {
    /// Build settings from a validated source record and the captured bind
    /// credentials.
    ///
    /// The record's `config` field holds `key = value` lines; blank lines
    /// and `#` comments are ignored. `group-base-dn` is required. A `url`
    /// line overrides the record's own URL column.
    pub fn configure(
        source: &SourceRecord,
        creds: &Credentials,
    ) -> Result<Self, DirectoryError> {
        let settings = parse_settings(&source.config);
        let group_base_dn = settings
            .get("group-base-dn")
            .cloned()
            .ok_or(DirectoryError::MissingSetting("group-base-dn"))?;
        let url = settings
            .get("url")
            .cloned()
            .unwrap_or_else(|| source.url.clone());

        debug!(
            source = %source.name,
            %group_base_dn,
            "configured feed connection settings"
        );
        Ok(Self {
            source_id: source.id,
            name: source.name.clone(),
            source_type: source.source_type.clone(),
            url,
            user_base_dn: settings.get("user-base-dn").cloned(),
            group_base_dn,
            bind_login: creds.login.clone(),
            bind_password: creds.password.clone(),
        })
    }

    /// Directory key for a group entry under the group base DN.
    pub fn group_dn(&self, group_name: &str) -> String {
        format!("cn={},{}", group_name, self.group_base_dn)
    }
}

impl fmt::Debug for FeedSettings {
    // The bind password must never reach logs or error output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedSettings")
            .field("source_id", &self.source_id)
            .field("name", &self.name)
            .field("url", &self.url)
            .field("group_base_dn", &self.group_base_dn)
            .field("bind_login", &self.bind_login)
            .field("bind_password", &"<redacted>")
            .finish()
    }
}

/// Parse `key = value` settings text into a map.
fn parse_settings(text: &str) -> HashMap<String, String> {
    let mut settings = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            settings.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    settings
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// Destination directory connection with a deferred bind.
pub struct FeedConnection {
    settings: FeedSettings,
}

impl FeedConnection {
    pub fn new(settings: FeedSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &FeedSettings {
        &self.settings
    }

    /// Open a connection and attempt a simple bind with the captured
    /// credentials, then disconnect. Proves the feed source is reachable
    /// before the synchronizer relies on it.
    pub fn verify(&self) -> Result<(), DirectoryError> {
        info!(url = %self.settings.url, "checking destination directory bind");
        let mut conn = LdapConn::new(&self.settings.url)?;
        conn.simple_bind(&self.settings.bind_login, &self.settings.bind_password)?
            .success()?;
        conn.unbind()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(config: &str) -> SourceRecord {
        SourceRecord {
            id: 7,
            name: "dirbridge-feed".into(),
            source_type: "ldapfeed".into(),
            url: "ldap://directory.example.com".into(),
            config: config.into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    fn creds() -> Credentials {
        Credentials {
            login: "svc-bind".into(),
            password: "s3cret".into(),
        }
    }

    #[test]
    fn test_parse_settings_skips_comments_and_blanks() {
        let parsed = parse_settings(
            "# directory layout\n\n\
             user-base-dn = ou=people,dc=example,dc=com\n\
             group-base-dn= ou=groups,dc=example,dc=com \n\
             malformed-line\n",
        );
        assert_eq!(parsed.len(), 2);
        assert_eq!(
            parsed.get("group-base-dn").map(String::as_str),
            Some("ou=groups,dc=example,dc=com")
        );
    }

    #[test]
    fn test_configure_requires_group_base_dn() {
        let result = FeedSettings::configure(
            &record("user-base-dn = ou=people,dc=example,dc=com"),
            &creds(),
        );
        assert!(matches!(
            result,
            Err(DirectoryError::MissingSetting("group-base-dn"))
        ));
    }

    #[test]
    fn test_configure_merges_record_and_credentials() {
        let settings = FeedSettings::configure(
            &record(
                "user-base-dn = ou=people,dc=example,dc=com\n\
                 group-base-dn = ou=groups,dc=example,dc=com",
            ),
            &creds(),
        )
        .unwrap();

        assert_eq!(settings.source_id, 7);
        assert_eq!(settings.url, "ldap://directory.example.com");
        assert_eq!(
            settings.user_base_dn.as_deref(),
            Some("ou=people,dc=example,dc=com")
        );
        assert_eq!(settings.bind_login, "svc-bind");
    }

    #[test]
    fn test_config_url_overrides_record_url() {
        let settings = FeedSettings::configure(
            &record(
                "url = ldaps://other.example.com\n\
                 group-base-dn = ou=groups,dc=example,dc=com",
            ),
            &creds(),
        )
        .unwrap();
        assert_eq!(settings.url, "ldaps://other.example.com");
    }

    #[test]
    fn test_group_dn_format() {
        let settings = FeedSettings::configure(
            &record("group-base-dn = ou=groups,dc=example,dc=com"),
            &creds(),
        )
        .unwrap();
        assert_eq!(
            settings.group_dn("moderators"),
            "cn=moderators,ou=groups,dc=example,dc=com"
        );
    }

    #[test]
    fn test_debug_redacts_bind_password() {
        let settings = FeedSettings::configure(
            &record("group-base-dn = ou=groups,dc=example,dc=com"),
            &creds(),
        )
        .unwrap();
        assert!(!format!("{:?}", settings).contains("s3cret"));
    }
}
