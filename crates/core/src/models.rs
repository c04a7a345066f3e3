//! Domain model types shared by the guard, bootstrap, and storage layers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the administrative group whose members bypass the guard chain.
pub const ADMIN_GROUP: &str = "managers";

// ---------------------------------------------------------------------------
// Accounts and groups
// ---------------------------------------------------------------------------

/// A local account, possibly mirrored from the external directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub login: String,
    pub firstname: Option<String>,
    pub surname: Option<String>,
}

impl Account {
    /// Human-readable label: "firstname surname" when both parts are known,
    /// otherwise the login.
    pub fn display_label(&self) -> String {
        match (&self.firstname, &self.surname) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            _ => self.login.clone(),
        }
    }
}

/// A named group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Group {
    pub id: i64,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Membership mutations
// ---------------------------------------------------------------------------

/// Direction of a pending membership mutation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MembershipAction {
    Add,
    Remove,
}

impl fmt::Display for MembershipAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

/// A pending account-to-group relation change, observed before it commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MembershipChange {
    /// The account whose membership is being administered.
    pub account_id: i64,
    /// The target group.
    pub group_id: i64,
    pub action: MembershipAction,
}

/// The user performing a membership mutation: the account plus the names of
/// the groups it belongs to.
#[derive(Debug, Clone)]
pub struct Actor {
    pub account: Account,
    pub groups: Vec<String>,
}

impl Actor {
    /// Whether the actor belongs to the administrative group.
    pub fn is_admin(&self) -> bool {
        self.groups.iter().any(|g| g == ADMIN_GROUP)
    }
}

// ---------------------------------------------------------------------------
// External source records
// ---------------------------------------------------------------------------

/// A stored external-source record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceRecord {
    pub id: i64,
    pub name: String,
    pub source_type: String,
    pub url: String,
    /// Newline-separated `key = value` settings text.
    pub config: String,
    pub updated_at: String,
}

/// Fields used to create-or-update a source record.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    pub name: String,
    pub source_type: String,
    pub url: String,
    pub config: String,
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// A captured login/password pair for the external directory bind.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    // The password must never reach logs or error output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_label_prefers_full_name() {
        let account = Account {
            id: 1,
            login: "alovelace".into(),
            firstname: Some("Ada".into()),
            surname: Some("Lovelace".into()),
        };
        assert_eq!(account.display_label(), "Ada Lovelace");
    }

    #[test]
    fn test_display_label_falls_back_to_login() {
        let account = Account {
            id: 1,
            login: "alovelace".into(),
            firstname: Some("Ada".into()),
            surname: None,
        };
        assert_eq!(account.display_label(), "alovelace");

        let account = Account {
            id: 2,
            login: "bbabbage".into(),
            firstname: None,
            surname: None,
        };
        assert_eq!(account.display_label(), "bbabbage");
    }

    #[test]
    fn test_actor_admin_check() {
        let account = Account {
            id: 1,
            login: "root".into(),
            firstname: None,
            surname: None,
        };
        let admin = Actor {
            account: account.clone(),
            groups: vec!["users".into(), "managers".into()],
        };
        assert!(admin.is_admin());

        let plain = Actor {
            account,
            groups: vec!["users".into(), "moderators".into()],
        };
        assert!(!plain.is_admin());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials {
            login: "svc-bind".into(),
            password: "hunter2".into(),
        };
        let printed = format!("{:?}", creds);
        assert!(printed.contains("svc-bind"));
        assert!(!printed.contains("hunter2"));
    }
}
