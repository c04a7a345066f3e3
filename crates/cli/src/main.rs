//! DirBridge command-line management tool.
//!
//! Provides subcommands for generating and validating configuration,
//! managing the cipher seed, checking the destination directory bind, and
//! administrating group memberships through the guarded commit path.

mod init;
mod style;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::Table;
use tracing_subscriber::EnvFilter;

use dirbridge_core::bootstrap::{feed_descriptor, validated_source, RESERVED_GROUPS};
use dirbridge_core::config::AppConfig;
use dirbridge_core::credentials::provider_from_config;
use dirbridge_core::crypto::Cipher;
use dirbridge_core::db::Database;
use dirbridge_core::directory::{FeedConnection, FeedSettings};
use dirbridge_core::guard::MembershipGuard;
use dirbridge_core::hooks::HookRegistry;
use dirbridge_core::membership::MembershipService;
use dirbridge_core::repo::{GroupRepository, SourceRepository};
use dirbridge_core::secret::{Secret, SECRET_LEN};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// DirBridge command-line management tool.
#[derive(Parser, Debug)]
#[command(
    name = "dirbridge",
    version,
    about = "Manage and inspect a DirBridge gateway"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(
        short,
        long,
        global = true,
        default_value = "/etc/dirbridge/config.toml"
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a configuration file interactively.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./dirbridge.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,

    /// Manage the cipher seed.
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },

    /// Provision the feed source and check the destination directory bind.
    Check,

    /// Inspect stored groups.
    Group {
        #[command(subcommand)]
        action: GroupAction,
    },

    /// Administrate group memberships (guarded).
    Member {
        #[command(subcommand)]
        action: MemberAction,
    },
}

#[derive(Subcommand, Debug)]
enum SecretAction {
    /// Write a new random cipher seed file.
    Generate {
        /// Output path for the seed file.
        #[arg(short, long, default_value = "/etc/dirbridge/seed")]
        output: PathBuf,

        /// Overwrite an existing seed file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum GroupAction {
    /// List all groups with their member counts.
    List {
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
enum MemberAction {
    /// Add an account to a group.
    Add {
        /// Login of the account to add.
        login: String,
        /// Target group name.
        group: String,
        /// Login of the acting user.
        #[arg(long = "as", value_name = "LOGIN")]
        actor: String,
    },
    /// Remove an account from a group.
    Remove {
        /// Login of the account to remove.
        login: String,
        /// Target group name.
        group: String,
        /// Login of the acting user.
        #[arg(long = "as", value_name = "LOGIN")]
        actor: String,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let filter =
        EnvFilter::try_from_env("DIRBRIDGE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style::error(&format!("{e:#}")));
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { output } => init::run_init(&output),
        Commands::Validate => cmd_validate(&cli.config),
        Commands::Secret {
            action: SecretAction::Generate { output, force },
        } => cmd_secret_generate(&output, force),
        Commands::Check => cmd_check(&cli.config),
        Commands::Group {
            action: GroupAction::List { json },
        } => cmd_group_list(&cli.config, json),
        Commands::Member { action } => cmd_member(&cli.config, action),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_validate(config_path: &PathBuf) -> Result<()> {
    let config = AppConfig::load(config_path).context("configuration is invalid")?;
    // The secret file must at least be named; its contents are checked at
    // startup.
    match config.secret_file() {
        Ok(path) => println!("{}", style::dim(&format!("secret file: {}", path.display()))),
        Err(_) => println!(
            "{}",
            style::warn("security.secret_file is not set; the daemon will refuse to start")
        ),
    }
    println!("{}", style::success("Configuration is valid."));
    Ok(())
}

fn cmd_secret_generate(output: &PathBuf, force: bool) -> Result<()> {
    use rand::distributions::Alphanumeric;
    use rand::Rng;

    if output.exists() && !force {
        bail!(
            "{} already exists (pass --force to overwrite)",
            output.display()
        );
    }

    let seed: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SECRET_LEN)
        .map(char::from)
        .collect();

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    std::fs::write(output, &seed)
        .with_context(|| format!("failed to write seed to {}", output.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(output, std::fs::Permissions::from_mode(0o600))
            .context("failed to restrict seed file permissions")?;
    }

    println!(
        "{}",
        style::success(&format!("Seed written to {}", output.display()))
    );
    Ok(())
}

fn cmd_check(config_path: &PathBuf) -> Result<()> {
    let config = AppConfig::load(config_path)?;

    // Same fail-fast order as the daemon bootstrap: secret before prompt.
    let secret = Secret::load(config.secret_file()?)?;
    let _cipher = Cipher::new(&secret);
    println!("{}", style::success("Cipher seed loads and keys the cipher."));

    let provider = provider_from_config(&config.credentials);
    let creds = provider.obtain()?;

    let db = open_database(&config)?;
    db.upsert_source(&feed_descriptor(&config))?;
    let source = validated_source(db.as_ref())?;
    println!(
        "{}",
        style::success(&format!(
            "Feed source '{}' provisioned (id {}).",
            source.name, source.id
        ))
    );

    let settings = FeedSettings::configure(&source, &creds)?;
    println!(
        "{}",
        style::dim(&format!("group base DN: {}", settings.group_base_dn))
    );

    FeedConnection::new(settings)
        .verify()
        .context("destination directory bind failed")?;
    println!("{}", style::success("Destination directory bind succeeded."));
    Ok(())
}

fn cmd_group_list(config_path: &PathBuf, json: bool) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    let db = open_database(&config)?;

    let groups = db.list_groups()?;

    if json {
        let rows: Vec<serde_json::Value> = groups
            .iter()
            .map(|g| {
                let members = db.list_members(g.id).map(|m| m.len()).unwrap_or(0);
                serde_json::json!({
                    "id": g.id,
                    "name": g.name,
                    "members": members,
                    "restricted": config.guard.restricted_groups.contains(&g.name),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(["ID", "Name", "Members", "Restricted"]);
    for group in &groups {
        let members = db.list_members(group.id)?.len();
        let restricted = config.guard.restricted_groups.contains(&group.name);
        table.add_row([
            group.id.to_string(),
            group.name.clone(),
            members.to_string(),
            if restricted { "yes".into() } else { String::new() },
        ]);
    }
    println!("{table}");
    Ok(())
}

fn cmd_member(config_path: &PathBuf, action: MemberAction) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    let db = open_database(&config)?;

    let mut hooks = HookRegistry::new();
    hooks.register_membership(Box::new(MembershipGuard::new(
        config.guard.restricted_groups.clone(),
    )));
    let service = MembershipService::new(db.clone(), Arc::new(hooks));

    let (login, group_name, actor_login, add) = match &action {
        MemberAction::Add {
            login,
            group,
            actor,
        } => (login, group, actor, true),
        MemberAction::Remove {
            login,
            group,
            actor,
        } => (login, group, actor, false),
    };

    let actor = service
        .actor_by_login(actor_login)?
        .with_context(|| format!("acting user '{actor_login}' is not a known account"))?;
    let account = service
        .actor_by_login(login)?
        .with_context(|| format!("account '{login}' does not exist"))?
        .account;
    let group = db
        .find_group_by_name(group_name)?
        .with_context(|| format!("group '{group_name}' does not exist"))?;

    let result = if add {
        service.add_member(&actor, account.id, group.id)
    } else {
        service.remove_member(&actor, account.id, group.id)
    };

    match result {
        Ok(()) => {
            let verb = if add { "added to" } else { "removed from" };
            println!(
                "{}",
                style::success(&format!("'{}' {} '{}'.", account.login, verb, group.name))
            );
            Ok(())
        }
        Err(e) => Err(e).context("membership change rejected"),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open_database(config: &AppConfig) -> Result<Arc<Database>> {
    std::fs::create_dir_all(&config.daemon.data_dir)
        .context("failed to create data directory")?;
    let db = Database::new(config.daemon.data_dir.join("dirbridge.db"))
        .context("failed to open database")?;
    db.initialize()
        .context("failed to initialize database schema")?;
    for name in RESERVED_GROUPS {
        db.ensure_group(name)?;
    }
    Ok(Arc::new(db))
}
