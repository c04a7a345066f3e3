//! Startup bootstrap of the external LDAP feed.
//!
//! Runs once on the startup chain: loads the shared secret, captures and
//! encrypts the destination credentials, provisions the feed source record,
//! validates it, and seeds the external-identity cache used for identity
//! reconciliation during feed synchronization.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::config::AppConfig;
use crate::crypto::Cipher;
use crate::directory::FeedSettings;
use crate::errors::{BootstrapError, CoreError};
use crate::hooks::{StartupContext, StartupHook};
use crate::models::{SourceDescriptor, SourceRecord};
use crate::repo::SourceRepository;
use crate::secret::Secret;

/// Fixed name of the feed source record.
pub const FEED_SOURCE_NAME: &str = "dirbridge-feed";

/// Expected type of the feed source record.
pub const FEED_SOURCE_TYPE: &str = "ldapfeed";

/// Built-in groups never mirrored to the external directory.
pub const RESERVED_GROUPS: [&str; 4] = ["guests", "managers", "users", "owners"];

// ---------------------------------------------------------------------------
// Process state
// ---------------------------------------------------------------------------

/// Write-once process state produced by the bootstrap.
///
/// Written exactly once during startup dispatch, then shared read-only (via
/// `Arc`) with the rest of the process. No locking: writes precede any
/// concurrent reader.
#[derive(Debug, Default)]
pub struct FeedState {
    /// Shared secret backing the credential cipher.
    pub secret: Option<Secret>,
    /// Base64 ciphertext of the destination login.
    pub dest_login: Option<String>,
    /// Base64 ciphertext of the destination password.
    pub dest_password: Option<String>,
    /// Whether the feed is disabled by configuration.
    pub disabled: bool,
    /// External directory key (`cn=<group>,<group-base-dn>`) to local
    /// group id.
    pub extid_cache: HashMap<String, i64>,
}

// ---------------------------------------------------------------------------
// Bootstrap interceptor
// ---------------------------------------------------------------------------

/// Startup interceptor provisioning the LDAP feed.
pub struct FeedBootstrap;

impl StartupHook for FeedBootstrap {
    fn name(&self) -> &'static str {
        "feed-bootstrap"
    }

    fn on_startup(&self, ctx: &mut StartupContext<'_>) -> Result<(), CoreError> {
        run(ctx).map_err(CoreError::from)
    }
}

fn run(ctx: &mut StartupContext<'_>) -> Result<(), BootstrapError> {
    let config = ctx.config;

    // The secret must load before any prompt is issued.
    let secret = Secret::load(config.secret_file()?)?;

    // Capture and encrypt the destination credentials for later use by the
    // feed synchronizer.
    let cipher = Cipher::new(&secret);
    let creds = ctx.credentials.obtain()?;
    ctx.feed.dest_login = Some(cipher.encrypt_field(&creds.login)?);
    ctx.feed.dest_password = Some(cipher.encrypt_field(&creds.password)?);
    ctx.feed.secret = Some(secret);

    // Create-or-update the feed source record.
    ctx.sources.upsert_source(&feed_descriptor(config))?;

    // A disabled feed keeps its credentials but skips validation and cache
    // seeding.
    if config.feed.disabled {
        warn!(source = FEED_SOURCE_NAME, "LDAP feed is disabled by configuration");
        ctx.feed.disabled = true;
        return Ok(());
    }

    let source = validated_source(ctx.sources)?;

    // Seed the external-identity cache: one entry per non-reserved group.
    let settings = FeedSettings::configure(&source, &creds)?;
    for group in ctx.groups.list_groups()? {
        if RESERVED_GROUPS.contains(&group.name.as_str()) {
            continue;
        }
        ctx.feed
            .extid_cache
            .insert(settings.group_dn(&group.name), group.id);
    }
    info!(
        source_id = source.id,
        entries = ctx.feed.extid_cache.len(),
        "seeded external-identity cache"
    );
    Ok(())
}

/// The feed source record as described by the `[feed]` config section.
pub fn feed_descriptor(config: &AppConfig) -> SourceDescriptor {
    SourceDescriptor {
        name: FEED_SOURCE_NAME.into(),
        source_type: FEED_SOURCE_TYPE.into(),
        url: config.feed.url.clone(),
        config: config.feed.settings.clone(),
    }
}

/// Fetch the feed source record, requiring exactly one row of the expected
/// type.
pub fn validated_source(
    sources: &dyn SourceRepository,
) -> Result<SourceRecord, BootstrapError> {
    let mut rows = sources.find_sources_by_name(FEED_SOURCE_NAME)?;
    if rows.len() != 1 {
        return Err(BootstrapError::SourceCount {
            name: FEED_SOURCE_NAME.into(),
            found: rows.len(),
        });
    }
    let source = rows.remove(0);
    if source.source_type != FEED_SOURCE_TYPE {
        return Err(BootstrapError::SourceType {
            name: FEED_SOURCE_NAME.into(),
            expected: FEED_SOURCE_TYPE.into(),
            found: source.source_type,
        });
    }
    Ok(source)
}
