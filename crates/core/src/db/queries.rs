//! Typed query helpers and repository implementations for [`Database`].

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::Database;
use crate::errors::DatabaseError;
use crate::models::{Account, Group, SourceDescriptor, SourceRecord};
use crate::repo::{
    AccountRepository, GroupRepository, MembershipRepository, SourceRepository,
};

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        login: row.get(1)?,
        firstname: row.get(2)?,
        surname: row.get(3)?,
    })
}

fn source_from_row(row: &Row<'_>) -> rusqlite::Result<SourceRecord> {
    Ok(SourceRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        source_type: row.get(2)?,
        url: row.get(3)?,
        config: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

// ---------------------------------------------------------------------------
// Seed helpers
// ---------------------------------------------------------------------------

impl Database {
    /// Insert an account, returning its id.
    pub fn insert_account(
        &self,
        login: &str,
        firstname: Option<&str>,
        surname: Option<&str>,
    ) -> Result<i64, DatabaseError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO accounts (login, firstname, surname) VALUES (?1, ?2, ?3)",
            params![login, firstname, surname],
        )?;
        let id = conn.last_insert_rowid();
        debug!(id, login, "inserted account");
        Ok(id)
    }

    /// Insert a group, returning its id.
    pub fn insert_group(&self, name: &str) -> Result<i64, DatabaseError> {
        let conn = self.conn();
        conn.execute("INSERT INTO groups (name) VALUES (?1)", params![name])?;
        let id = conn.last_insert_rowid();
        debug!(id, name, "inserted group");
        Ok(id)
    }

    /// Create the group if it does not exist yet, returning its id.
    pub fn ensure_group(&self, name: &str) -> Result<i64, DatabaseError> {
        if let Some(group) = self.find_group_by_name(name)? {
            return Ok(group.id);
        }
        self.insert_group(name)
    }

    /// Accounts belonging to the given group.
    pub fn list_members(&self, group_id: i64) -> Result<Vec<Account>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT a.id, a.login, a.firstname, a.surname
             FROM accounts a
             JOIN memberships m ON m.account_id = a.id
             WHERE m.group_id = ?1
             ORDER BY a.login",
        )?;
        let rows = stmt.query_map(params![group_id], account_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

// ---------------------------------------------------------------------------
// Repository implementations
// ---------------------------------------------------------------------------

impl AccountRepository for Database {
    fn find_account(&self, id: i64) -> Result<Option<Account>, DatabaseError> {
        let conn = self.conn();
        let account = conn
            .query_row(
                "SELECT id, login, firstname, surname FROM accounts WHERE id = ?1",
                params![id],
                account_from_row,
            )
            .optional()?;
        Ok(account)
    }

    fn find_account_by_login(&self, login: &str) -> Result<Option<Account>, DatabaseError> {
        let conn = self.conn();
        let account = conn
            .query_row(
                "SELECT id, login, firstname, surname FROM accounts WHERE login = ?1",
                params![login],
                account_from_row,
            )
            .optional()?;
        Ok(account)
    }

    fn group_names_of(&self, account_id: i64) -> Result<Vec<String>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT g.name
             FROM groups g
             JOIN memberships m ON m.group_id = g.id
             WHERE m.account_id = ?1
             ORDER BY g.name",
        )?;
        let rows = stmt.query_map(params![account_id], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

impl GroupRepository for Database {
    fn find_group(&self, id: i64) -> Result<Option<Group>, DatabaseError> {
        let conn = self.conn();
        let group = conn
            .query_row(
                "SELECT id, name FROM groups WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Group {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(group)
    }

    fn find_group_by_name(&self, name: &str) -> Result<Option<Group>, DatabaseError> {
        let conn = self.conn();
        let group = conn
            .query_row(
                "SELECT id, name FROM groups WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Group {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(group)
    }

    fn list_groups(&self) -> Result<Vec<Group>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, name FROM groups ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Group {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

impl SourceRepository for Database {
    fn find_sources_by_name(&self, name: &str) -> Result<Vec<SourceRecord>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, type, url, config, updated_at
             FROM sources WHERE name = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![name], source_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn upsert_source(&self, desc: &SourceDescriptor) -> Result<i64, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.transaction(|conn| {
            let existing: Option<i64> = conn
                .query_row(
                    "SELECT id FROM sources WHERE name = ?1 ORDER BY id LIMIT 1",
                    params![desc.name],
                    |row| row.get(0),
                )
                .optional()?;

            match existing {
                Some(id) => {
                    conn.execute(
                        "UPDATE sources SET type = ?1, url = ?2, config = ?3, updated_at = ?4
                         WHERE id = ?5",
                        params![desc.source_type, desc.url, desc.config, now, id],
                    )?;
                    debug!(id, name = %desc.name, "updated source record");
                    Ok(id)
                }
                None => {
                    conn.execute(
                        "INSERT INTO sources (name, type, url, config, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![desc.name, desc.source_type, desc.url, desc.config, now],
                    )?;
                    let id = conn.last_insert_rowid();
                    debug!(id, name = %desc.name, "created source record");
                    Ok(id)
                }
            }
        })
    }
}

impl MembershipRepository for Database {
    fn add_membership(&self, account_id: i64, group_id: i64) -> Result<(), DatabaseError> {
        let conn = self.conn();
        conn.execute(
            "INSERT OR IGNORE INTO memberships (account_id, group_id) VALUES (?1, ?2)",
            params![account_id, group_id],
        )?;
        debug!(account_id, group_id, "membership added");
        Ok(())
    }

    fn remove_membership(&self, account_id: i64, group_id: i64) -> Result<(), DatabaseError> {
        let conn = self.conn();
        conn.execute(
            "DELETE FROM memberships WHERE account_id = ?1 AND group_id = ?2",
            params![account_id, group_id],
        )?;
        debug!(account_id, group_id, "membership removed");
        Ok(())
    }

    fn is_member(&self, account_id: i64, group_id: i64) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM memberships WHERE account_id = ?1 AND group_id = ?2",
            params![account_id, group_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        let db = Database::in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    #[test]
    fn test_account_round_trip() {
        let db = db();
        let id = db
            .insert_account("alovelace", Some("Ada"), Some("Lovelace"))
            .unwrap();

        let account = db.find_account(id).unwrap().unwrap();
        assert_eq!(account.login, "alovelace");
        assert_eq!(account.firstname.as_deref(), Some("Ada"));

        let by_login = db.find_account_by_login("alovelace").unwrap().unwrap();
        assert_eq!(by_login.id, id);

        assert!(db.find_account(9999).unwrap().is_none());
    }

    #[test]
    fn test_group_membership_round_trip() {
        let db = db();
        let account = db.insert_account("jdoe", None, None).unwrap();
        let devs = db.insert_group("devs").unwrap();
        let ops = db.insert_group("ops").unwrap();

        db.add_membership(account, devs).unwrap();
        db.add_membership(account, ops).unwrap();
        // Adding twice is a no-op.
        db.add_membership(account, devs).unwrap();

        assert!(db.is_member(account, devs).unwrap());
        assert_eq!(
            db.group_names_of(account).unwrap(),
            vec!["devs".to_string(), "ops".to_string()]
        );

        db.remove_membership(account, devs).unwrap();
        assert!(!db.is_member(account, devs).unwrap());
        assert_eq!(db.list_members(devs).unwrap().len(), 0);
        assert_eq!(db.list_members(ops).unwrap().len(), 1);
    }

    #[test]
    fn test_ensure_group_is_idempotent() {
        let db = db();
        let first = db.ensure_group("devs").unwrap();
        let second = db.ensure_group("devs").unwrap();
        assert_eq!(first, second);
        assert_eq!(db.list_groups().unwrap().len(), 1);
    }

    #[test]
    fn test_upsert_source_creates_then_updates() {
        let db = db();
        let desc = SourceDescriptor {
            name: "feed".into(),
            source_type: "ldapfeed".into(),
            url: "ldap://one".into(),
            config: "group-base-dn = ou=groups,dc=example,dc=com".into(),
        };

        let id = db.upsert_source(&desc).unwrap();
        let updated = SourceDescriptor {
            url: "ldap://two".into(),
            ..desc
        };
        let same_id = db.upsert_source(&updated).unwrap();
        assert_eq!(id, same_id);

        let rows = db.find_sources_by_name("feed").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].url, "ldap://two");
        assert_eq!(rows[0].source_type, "ldapfeed");
    }

    #[test]
    fn test_find_sources_returns_all_matches() {
        let db = db();
        let now = Utc::now().to_rfc3339();
        for url in ["ldap://one", "ldap://two"] {
            db.conn()
                .execute(
                    "INSERT INTO sources (name, type, url, config, updated_at)
                     VALUES ('feed', 'ldapfeed', ?1, '', ?2)",
                    params![url, now],
                )
                .unwrap();
        }
        let rows = db.find_sources_by_name("feed").unwrap();
        assert_eq!(rows.len(), 2);
    }
}
