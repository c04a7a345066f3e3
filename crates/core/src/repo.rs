//! Typed repository interfaces exposed by the storage layer.
//!
//! The guard and the startup bootstrap depend on these traits rather than
//! on SQL, so the storage backend can be swapped or mocked without touching
//! either.

use crate::errors::DatabaseError;
use crate::models::{Account, Group, SourceDescriptor, SourceRecord};

/// Account lookups.
pub trait AccountRepository {
    /// Look up an account by id.
    fn find_account(&self, id: i64) -> Result<Option<Account>, DatabaseError>;

    /// Look up an account by login.
    fn find_account_by_login(&self, login: &str) -> Result<Option<Account>, DatabaseError>;

    /// Names of the groups the account belongs to.
    fn group_names_of(&self, account_id: i64) -> Result<Vec<String>, DatabaseError>;
}

/// Group lookups.
pub trait GroupRepository {
    /// Look up a group by id.
    fn find_group(&self, id: i64) -> Result<Option<Group>, DatabaseError>;

    /// Look up a group by name.
    fn find_group_by_name(&self, name: &str) -> Result<Option<Group>, DatabaseError>;

    /// All stored groups.
    fn list_groups(&self) -> Result<Vec<Group>, DatabaseError>;
}

/// External source records.
pub trait SourceRepository {
    /// All source records carrying `name`, in insertion order.
    ///
    /// Returns a list rather than a single record: the bootstrap treats any
    /// count other than one as a data error.
    fn find_sources_by_name(&self, name: &str) -> Result<Vec<SourceRecord>, DatabaseError>;

    /// Create the named source, or update its type/url/config in place.
    /// Returns the record id.
    fn upsert_source(&self, desc: &SourceDescriptor) -> Result<i64, DatabaseError>;
}

/// Account-to-group relation writes.
pub trait MembershipRepository {
    /// Record the membership; adding an existing membership is a no-op.
    fn add_membership(&self, account_id: i64, group_id: i64) -> Result<(), DatabaseError>;

    /// Remove the membership; removing an absent membership is a no-op.
    fn remove_membership(&self, account_id: i64, group_id: i64) -> Result<(), DatabaseError>;

    /// Whether the account currently belongs to the group.
    fn is_member(&self, account_id: i64, group_id: i64) -> Result<bool, DatabaseError>;
}
