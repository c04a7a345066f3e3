//! Membership mutations gated by the interceptor chain.

use std::sync::Arc;

use tracing::info;

use crate::db::Database;
use crate::errors::CoreError;
use crate::hooks::{HookContext, HookRegistry};
use crate::models::{Actor, MembershipAction, MembershipChange};
use crate::repo::{AccountRepository, MembershipRepository};

/// Commit path for account-to-group relation changes.
///
/// Every mutation dispatches the membership chain first; a vetoed change
/// leaves the stored relation untouched.
pub struct MembershipService {
    db: Arc<Database>,
    hooks: Arc<HookRegistry>,
}

impl MembershipService {
    pub fn new(db: Arc<Database>, hooks: Arc<HookRegistry>) -> Self {
        Self { db, hooks }
    }

    /// Add `account_id` to `group_id` on behalf of `actor`.
    pub fn add_member(
        &self,
        actor: &Actor,
        account_id: i64,
        group_id: i64,
    ) -> Result<(), CoreError> {
        self.apply(
            actor,
            MembershipChange {
                account_id,
                group_id,
                action: MembershipAction::Add,
            },
        )
    }

    /// Remove `account_id` from `group_id` on behalf of `actor`.
    pub fn remove_member(
        &self,
        actor: &Actor,
        account_id: i64,
        group_id: i64,
    ) -> Result<(), CoreError> {
        self.apply(
            actor,
            MembershipChange {
                account_id,
                group_id,
                action: MembershipAction::Remove,
            },
        )
    }

    /// Load an actor (account plus group names) by login.
    pub fn actor_by_login(&self, login: &str) -> Result<Option<Actor>, CoreError> {
        let Some(account) = self.db.find_account_by_login(login)? else {
            return Ok(None);
        };
        let groups = self.db.group_names_of(account.id)?;
        Ok(Some(Actor { account, groups }))
    }

    fn apply(&self, actor: &Actor, change: MembershipChange) -> Result<(), CoreError> {
        let ctx = HookContext {
            change: &change,
            actor,
            accounts: self.db.as_ref(),
            groups: self.db.as_ref(),
        };
        self.hooks.dispatch_membership(&ctx)?;

        match change.action {
            MembershipAction::Add => self.db.add_membership(change.account_id, change.group_id)?,
            MembershipAction::Remove => self
                .db
                .remove_membership(change.account_id, change.group_id)?,
        }
        info!(
            actor = %actor.account.login,
            account_id = change.account_id,
            group_id = change.group_id,
            action = %change.action,
            "membership change committed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::GuardError;
    use crate::guard::MembershipGuard;
    use crate::models::Account;

    struct Fixture {
        service: MembershipService,
        db: Arc<Database>,
        subject_id: i64,
        managers_id: i64,
        devs_id: i64,
    }

    fn fixture() -> Fixture {
        let db = Arc::new(Database::in_memory().unwrap());
        db.initialize().unwrap();
        let subject_id = db.insert_account("alovelace", None, None).unwrap();
        let managers_id = db.insert_group("managers").unwrap();
        let devs_id = db.insert_group("devs").unwrap();

        let mut hooks = HookRegistry::new();
        hooks.register_membership(Box::new(MembershipGuard::new(vec![
            "managers".into(),
            "users".into(),
        ])));

        Fixture {
            service: MembershipService::new(db.clone(), Arc::new(hooks)),
            db,
            subject_id,
            managers_id,
            devs_id,
        }
    }

    fn plain_actor() -> Actor {
        Actor {
            account: Account {
                id: 50,
                login: "mod".into(),
                firstname: None,
                surname: None,
            },
            groups: vec!["moderators".into()],
        }
    }

    fn admin_actor() -> Actor {
        Actor {
            account: Account {
                id: 51,
                login: "root".into(),
                firstname: None,
                surname: None,
            },
            groups: vec!["managers".into()],
        }
    }

    #[test]
    fn test_vetoed_change_writes_nothing() {
        let f = fixture();
        let result = f
            .service
            .add_member(&plain_actor(), f.subject_id, f.managers_id);
        assert!(matches!(
            result,
            Err(CoreError::Guard(GuardError::PermissionDenied { .. }))
        ));
        assert!(!f.db.is_member(f.subject_id, f.managers_id).unwrap());
    }

    #[test]
    fn test_admin_change_commits() {
        let f = fixture();
        f.service
            .add_member(&admin_actor(), f.subject_id, f.managers_id)
            .unwrap();
        assert!(f.db.is_member(f.subject_id, f.managers_id).unwrap());

        f.service
            .remove_member(&admin_actor(), f.subject_id, f.managers_id)
            .unwrap();
        assert!(!f.db.is_member(f.subject_id, f.managers_id).unwrap());
    }

    #[test]
    fn test_unrestricted_change_commits_for_plain_actor() {
        let f = fixture();
        f.service
            .add_member(&plain_actor(), f.subject_id, f.devs_id)
            .unwrap();
        assert!(f.db.is_member(f.subject_id, f.devs_id).unwrap());
    }

    #[test]
    fn test_actor_by_login() {
        let f = fixture();
        f.db.add_membership(f.subject_id, f.devs_id).unwrap();

        let actor = f.service.actor_by_login("alovelace").unwrap().unwrap();
        assert_eq!(actor.account.id, f.subject_id);
        assert_eq!(actor.groups, vec!["devs".to_string()]);

        assert!(f.service.actor_by_login("ghost").unwrap().is_none());
    }
}
