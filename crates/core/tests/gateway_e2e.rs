//! End-to-end tests for the gateway startup and guard paths.
//!
//! These tests exercise the real interceptor chains with:
//! - A real SQLite database (on disk, via `tempfile`)
//! - A real secret file
//! - A scripted credential provider in place of the terminal prompts
//!
//! No network I/O: the LDAP bind check is out of scope here, everything
//! else runs for real.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use dirbridge_core::bootstrap::{FeedBootstrap, FeedState, FEED_SOURCE_NAME, RESERVED_GROUPS};
use dirbridge_core::config::AppConfig;
use dirbridge_core::credentials::CredentialProvider;
use dirbridge_core::db::Database;
use dirbridge_core::errors::{CoreError, CredentialError, GuardError};
use dirbridge_core::guard::MembershipGuard;
use dirbridge_core::hooks::{HookRegistry, StartupContext};
use dirbridge_core::membership::MembershipService;
use dirbridge_core::models::Credentials;
use dirbridge_core::repo::{GroupRepository, MembershipRepository, SourceRepository};

// ===========================================================================
// Helpers
// ===========================================================================

struct ScriptedProvider;

impl CredentialProvider for ScriptedProvider {
    fn obtain(&self) -> Result<Credentials, CredentialError> {
        Ok(Credentials {
            login: "svc-bind".into(),
            password: "s3cret".into(),
        })
    }
}

fn write_secret(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("seed");
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    path
}

fn gateway_config(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.security.secret_file = Some(write_secret(dir, "integration-seed"));
    config.feed.url = "ldap://directory.example.com".into();
    config.feed.settings = "user-base-dn = ou=people,dc=example,dc=com\n\
                            group-base-dn = ou=groups,dc=example,dc=com"
        .into();
    config
}

fn open_database(dir: &TempDir) -> Arc<Database> {
    let db = Database::new(dir.path().join("gateway.db")).unwrap();
    db.initialize().unwrap();
    for name in RESERVED_GROUPS {
        db.ensure_group(name).unwrap();
    }
    Arc::new(db)
}

fn run_startup(config: &AppConfig, db: &Database) -> Result<FeedState, CoreError> {
    let mut registry = HookRegistry::new();
    registry.register_startup(Box::new(FeedBootstrap));
    let mut ctx = StartupContext {
        config,
        sources: db,
        groups: db,
        credentials: &ScriptedProvider,
        feed: FeedState::default(),
    };
    registry.dispatch_startup(&mut ctx)?;
    Ok(ctx.feed)
}

// ===========================================================================
// Startup bootstrap
// ===========================================================================

#[test]
fn startup_provisions_source_and_seeds_cache() {
    let dir = TempDir::new().unwrap();
    let config = gateway_config(&dir);
    let db = open_database(&dir);
    let moderators = db.insert_group("moderators").unwrap();
    db.insert_group("devs").unwrap();

    let feed = run_startup(&config, &db).unwrap();

    let sources = db.find_sources_by_name(FEED_SOURCE_NAME).unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].source_type, "ldapfeed");
    assert_eq!(sources[0].url, "ldap://directory.example.com");

    assert_eq!(feed.extid_cache.len(), 2);
    assert_eq!(
        feed.extid_cache
            .get("cn=moderators,ou=groups,dc=example,dc=com"),
        Some(&moderators)
    );

    // Credentials are held encrypted, never in the clear.
    let sealed_login = feed.dest_login.as_deref().unwrap();
    assert!(!sealed_login.contains("svc-bind"));
}

#[test]
fn startup_survives_a_restart_without_duplicating_the_source() {
    let dir = TempDir::new().unwrap();
    let config = gateway_config(&dir);
    let db = open_database(&dir);

    run_startup(&config, &db).unwrap();
    run_startup(&config, &db).unwrap();

    assert_eq!(db.find_sources_by_name(FEED_SOURCE_NAME).unwrap().len(), 1);
}

// ===========================================================================
// Guarded membership changes
// ===========================================================================

#[test]
fn guarded_membership_end_to_end() {
    let dir = TempDir::new().unwrap();
    let config = gateway_config(&dir);
    let db = open_database(&dir);

    let admin_id = db.insert_account("root", None, None).unwrap();
    let moderator_id = db.insert_account("mod", None, None).unwrap();
    let subject_id = db
        .insert_account("alovelace", Some("Ada"), Some("Lovelace"))
        .unwrap();
    let managers = db.find_group_by_name("managers").unwrap().unwrap().id;
    let moderators = db.insert_group("moderators").unwrap();
    let devs = db.insert_group("devs").unwrap();
    db.add_membership(admin_id, managers).unwrap();
    db.add_membership(moderator_id, moderators).unwrap();

    let mut hooks = HookRegistry::new();
    hooks.register_membership(Box::new(MembershipGuard::new(
        config.guard.restricted_groups.clone(),
    )));
    let service = MembershipService::new(db.clone(), Arc::new(hooks));

    let admin = service.actor_by_login("root").unwrap().unwrap();
    let moderator = service.actor_by_login("mod").unwrap().unwrap();

    // A moderator may not administrate the restricted group...
    let denied = service.add_member(&moderator, subject_id, managers);
    match denied {
        Err(CoreError::Guard(GuardError::PermissionDenied { subject, group })) => {
            assert_eq!(subject, "Ada Lovelace");
            assert_eq!(group, "managers");
        }
        other => panic!("expected PermissionDenied, got {:?}", other),
    }
    assert!(!db.is_member(subject_id, managers).unwrap());

    // ...but may administrate an unrestricted one.
    service.add_member(&moderator, subject_id, devs).unwrap();
    assert!(db.is_member(subject_id, devs).unwrap());

    // An administrator may administrate anything, including removals.
    service.add_member(&admin, subject_id, managers).unwrap();
    assert!(db.is_member(subject_id, managers).unwrap());
    service.remove_member(&admin, subject_id, managers).unwrap();
    assert!(!db.is_member(subject_id, managers).unwrap());
}
