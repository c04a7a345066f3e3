//! Event interceptor chains.
//!
//! DirBridge reacts to two event categories: pre-commit membership
//! mutations and process startup. Interceptors register on a
//! [`HookRegistry`] and run in registration order; the first error vetoes
//! the triggering operation. Membership interceptors additionally carry a
//! predicate gate so a chain entry can opt out per event (the guard uses it
//! to bypass administrators).

use tracing::debug;

use crate::bootstrap::FeedState;
use crate::config::AppConfig;
use crate::credentials::CredentialProvider;
use crate::errors::{CoreError, GuardError};
use crate::models::{Actor, MembershipChange};
use crate::repo::{AccountRepository, GroupRepository, SourceRepository};

// ---------------------------------------------------------------------------
// Contexts
// ---------------------------------------------------------------------------

/// Context handed to membership interceptors before a change commits.
pub struct HookContext<'a> {
    pub change: &'a MembershipChange,
    pub actor: &'a Actor,
    pub accounts: &'a dyn AccountRepository,
    pub groups: &'a dyn GroupRepository,
}

/// Context handed to startup interceptors, dispatched once per process.
pub struct StartupContext<'a> {
    pub config: &'a AppConfig,
    pub sources: &'a dyn SourceRepository,
    pub groups: &'a dyn GroupRepository,
    pub credentials: &'a dyn CredentialProvider,
    /// Filled by the feed bootstrap; read-only once dispatch completes.
    pub feed: FeedState,
}

// ---------------------------------------------------------------------------
// Interceptor traits
// ---------------------------------------------------------------------------

/// Interceptor on the membership chain.
pub trait MembershipHook: Send + Sync {
    fn name(&self) -> &'static str;

    /// Predicate gate: when false, the interceptor is skipped for this
    /// event.
    fn applies(&self, ctx: &HookContext<'_>) -> bool {
        let _ = ctx;
        true
    }

    /// Runs synchronously before the change commits; an error vetoes it.
    fn before_change(&self, ctx: &HookContext<'_>) -> Result<(), GuardError>;
}

/// Interceptor on the startup chain.
pub trait StartupHook: Send + Sync {
    fn name(&self) -> &'static str;

    fn on_startup(&self, ctx: &mut StartupContext<'_>) -> Result<(), CoreError>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Registry of interceptors keyed by event category.
#[derive(Default)]
pub struct HookRegistry {
    membership: Vec<Box<dyn MembershipHook>>,
    startup: Vec<Box<dyn StartupHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_membership(&mut self, hook: Box<dyn MembershipHook>) {
        debug!(hook = hook.name(), "registered membership interceptor");
        self.membership.push(hook);
    }

    pub fn register_startup(&mut self, hook: Box<dyn StartupHook>) {
        debug!(hook = hook.name(), "registered startup interceptor");
        self.startup.push(hook);
    }

    /// Run the membership chain; the first error vetoes the change.
    pub fn dispatch_membership(&self, ctx: &HookContext<'_>) -> Result<(), GuardError> {
        for hook in &self.membership {
            if !hook.applies(ctx) {
                debug!(hook = hook.name(), "interceptor skipped by predicate");
                continue;
            }
            hook.before_change(ctx)?;
        }
        Ok(())
    }

    /// Run the startup chain, in registration order. Any error aborts
    /// startup.
    pub fn dispatch_startup(&self, ctx: &mut StartupContext<'_>) -> Result<(), CoreError> {
        for hook in &self.startup {
            debug!(hook = hook.name(), "running startup interceptor");
            hook.on_startup(ctx)?;
        }
        Ok(())
    }
}
