//! Membership guard: vetoes changes to restricted groups.

use tracing::debug;

use crate::errors::GuardError;
use crate::hooks::{HookContext, MembershipHook};

/// Interceptor rejecting membership changes that target a restricted group,
/// for any actor outside the administrative group.
///
/// The guard only decides; it never mutates state.
pub struct MembershipGuard {
    restricted: Vec<String>,
}

impl MembershipGuard {
    /// Build a guard over the configured restricted group names.
    pub fn new(restricted: Vec<String>) -> Self {
        Self { restricted }
    }
}

impl MembershipHook for MembershipGuard {
    fn name(&self) -> &'static str {
        "membership-guard"
    }

    /// Administrators bypass the guard entirely.
    fn applies(&self, ctx: &HookContext<'_>) -> bool {
        !ctx.actor.is_admin()
    }

    fn before_change(&self, ctx: &HookContext<'_>) -> Result<(), GuardError> {
        let change = ctx.change;
        let group = ctx
            .groups
            .find_group(change.group_id)?
            .ok_or(GuardError::UnknownGroup(change.group_id))?;

        if !self.restricted.iter().any(|name| name == &group.name) {
            return Ok(());
        }

        let subject = ctx
            .accounts
            .find_account(change.account_id)?
            .ok_or(GuardError::UnknownAccount(change.account_id))?;

        debug!(
            actor = %ctx.actor.account.login,
            group = %group.name,
            action = %change.action,
            "membership change rejected"
        );
        Err(GuardError::PermissionDenied {
            subject: subject.display_label(),
            group: group.name,
        })
    }
}
