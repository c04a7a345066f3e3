//! Interactive init wizard.
//!
//! Walks the user through configuring a gateway instance and writes the
//! resulting TOML configuration file.

use std::path::Path;

use anyhow::{Context, Result};
use console::Style;
use dialoguer::{Confirm, Input, Select};

use crate::style;

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Run the interactive init wizard and write the config to `output_path`.
pub fn run_init(output_path: &Path) -> Result<()> {
    // Guard against overwriting an existing file.
    if output_path.exists() {
        let overwrite = Confirm::new()
            .with_prompt(format!("{} already exists. Overwrite?", output_path.display()))
            .default(false)
            .interact()
            .context("failed to read confirmation")?;

        if !overwrite {
            println!(
                "{}",
                style::warn("Init cancelled. Existing file was not modified.")
            );
            return Ok(());
        }
    }

    let accent = Style::new().cyan().bold();
    println!();
    println!("{}", accent.apply_to("=== DirBridge Setup Wizard ==="));
    println!();
    println!("This wizard will guide you through creating a gateway configuration.");
    println!("The resulting TOML file can be used with `dirbridge-daemon --config`.");
    println!();

    // -----------------------------------------------------------------
    // 1. Daemon settings
    // -----------------------------------------------------------------
    println!("{}", style::header("1/4  Daemon"));
    println!();

    let default_data_dir = dirs::data_local_dir()
        .map(|d| d.join("dirbridge").display().to_string())
        .unwrap_or_else(|| "/var/lib/dirbridge".into());

    let data_dir: String = Input::new()
        .with_prompt("Data directory (database location)")
        .default(default_data_dir)
        .interact_text()
        .context("failed to read data directory")?;

    println!();

    // -----------------------------------------------------------------
    // 2. Directory feed
    // -----------------------------------------------------------------
    println!("{}", style::header("2/4  Directory feed"));
    println!();

    let feed_url: String = Input::new()
        .with_prompt("Directory server URL (e.g. ldap://directory.example.com)")
        .interact_text()
        .context("failed to read feed URL")?;

    let user_base_dn: String = Input::new()
        .with_prompt("User base DN (e.g. ou=people,dc=example,dc=com)")
        .interact_text()
        .context("failed to read user base DN")?;

    let group_base_dn: String = Input::new()
        .with_prompt("Group base DN (e.g. ou=groups,dc=example,dc=com)")
        .interact_text()
        .context("failed to read group base DN")?;

    let feed_disabled = Confirm::new()
        .with_prompt("Disable the feed for now (provision only)?")
        .default(false)
        .interact()
        .context("failed to read feed toggle")?;

    println!();

    // -----------------------------------------------------------------
    // 3. Security
    // -----------------------------------------------------------------
    println!("{}", style::header("3/4  Security"));
    println!();

    let secret_file: String = Input::new()
        .with_prompt("Path to the cipher seed file (generate one with `dirbridge secret generate`)")
        .default("/etc/dirbridge/seed".into())
        .interact_text()
        .context("failed to read secret file path")?;

    let restricted: String = Input::new()
        .with_prompt("Restricted groups (comma-separated)")
        .default("managers, users, guests, moderators".into())
        .interact_text()
        .context("failed to read restricted groups")?;

    let restricted_groups: Vec<String> = restricted
        .split(',')
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .collect();

    println!();

    // -----------------------------------------------------------------
    // 4. Credentials
    // -----------------------------------------------------------------
    println!("{}", style::header("4/4  Credentials"));
    println!();

    let mode_options = &[
        "prompt: ask on the terminal at daemon startup",
        "env:    read from environment variables (non-interactive)",
    ];

    let mode_choice = Select::new()
        .with_prompt("How should the daemon obtain the directory bind credentials?")
        .items(mode_options)
        .default(0)
        .interact()
        .context("failed to read credential mode selection")?;

    let credential_mode = if mode_choice == 1 { "env" } else { "prompt" };

    let (login_env, password_env) = if credential_mode == "env" {
        let login_env: String = Input::new()
            .with_prompt("Environment variable that holds the bind login")
            .default("DIRBRIDGE_FEED_LOGIN".into())
            .interact_text()
            .context("failed to read login env var name")?;
        let password_env: String = Input::new()
            .with_prompt("Environment variable that holds the bind password")
            .default("DIRBRIDGE_FEED_PASSWORD".into())
            .interact_text()
            .context("failed to read password env var name")?;
        (login_env, password_env)
    } else {
        (
            "DIRBRIDGE_FEED_LOGIN".to_string(),
            "DIRBRIDGE_FEED_PASSWORD".to_string(),
        )
    };

    println!();

    // -----------------------------------------------------------------
    // Summary and confirmation
    // -----------------------------------------------------------------
    let label = Style::new().bold();
    let value = Style::new().cyan();

    println!("  {}:", label.apply_to("Daemon"));
    println!("    Data dir       : {}", value.apply_to(&data_dir));
    println!();
    println!("  {}:", label.apply_to("Feed"));
    println!("    URL            : {}", value.apply_to(&feed_url));
    println!("    User base DN   : {}", value.apply_to(&user_base_dn));
    println!("    Group base DN  : {}", value.apply_to(&group_base_dn));
    println!(
        "    Disabled       : {}",
        value.apply_to(if feed_disabled { "yes" } else { "no" })
    );
    println!();
    println!("  {}:", label.apply_to("Security"));
    println!("    Secret file    : {}", value.apply_to(&secret_file));
    println!(
        "    Restricted     : {}",
        value.apply_to(restricted_groups.join(", "))
    );
    println!();
    println!("  {}:", label.apply_to("Credentials"));
    println!("    Mode           : {}", value.apply_to(credential_mode));
    println!();
    println!(
        "  Config will be written to: {}",
        Style::new().yellow().apply_to(output_path.display())
    );
    println!();

    let confirmed = Confirm::new()
        .with_prompt("Write this configuration?")
        .default(true)
        .interact()
        .context("failed to read confirmation")?;

    if !confirmed {
        println!("{}", style::warn("Init cancelled. No file was written."));
        return Ok(());
    }

    // -----------------------------------------------------------------
    // Generate TOML with comments
    // -----------------------------------------------------------------
    let restricted_toml = restricted_groups
        .iter()
        .map(|g| format!("\"{}\"", escape_toml_string(g)))
        .collect::<Vec<_>>()
        .join(", ");

    let toml_content = format!(
        r##"# DirBridge gateway configuration
# Generated by `dirbridge init`

[daemon]
# Minimum log level: trace, debug, info, warn, error.
log_level = "info"

# Directory for persistent data (the SQLite database).
data_dir = "{data_dir}"

# Uncomment to also write rolling daily log files:
# log_dir = "/var/log/dirbridge"

[security]
# File holding the cipher seed used to encrypt the directory credentials.
# At most 32 bytes; generate one with `dirbridge secret generate`.
secret_file = "{secret_file}"

[feed]
# Set to true to provision the feed source without validating or seeding it.
disabled = {feed_disabled}

# Directory server URL written into the feed source record.
url = "{feed_url}"

# Settings stored in the feed source record (key = value lines).
settings = """
user-base-dn = {user_base_dn}
group-base-dn = {group_base_dn}
"""

[guard]
# Groups only administrators may administrate.
restricted_groups = [{restricted_toml}]

[credentials]
# "prompt" asks on the terminal at startup; "env" reads the variables below.
mode = "{credential_mode}"
login_env = "{login_env}"
password_env = "{password_env}"
"##,
        data_dir = escape_toml_string(&data_dir),
        secret_file = escape_toml_string(&secret_file),
        feed_disabled = feed_disabled,
        feed_url = escape_toml_string(&feed_url),
        user_base_dn = user_base_dn,
        group_base_dn = group_base_dn,
        restricted_toml = restricted_toml,
        credential_mode = credential_mode,
        login_env = escape_toml_string(&login_env),
        password_env = escape_toml_string(&password_env),
    );

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }

    std::fs::write(output_path, &toml_content)
        .with_context(|| format!("failed to write configuration to {}", output_path.display()))?;

    println!();
    println!(
        "{}",
        style::success(&format!(
            "Configuration written to {}",
            output_path.display()
        ))
    );
    println!();
    println!("{}", style::header("Next steps:"));
    println!();
    println!("  1. Generate the cipher seed:");
    println!("       dirbridge secret generate --output {}", secret_file);
    println!();
    println!("  2. Validate the config:");
    println!("       dirbridge validate --config {}", output_path.display());
    println!();
    println!("  3. Start the daemon:");
    println!(
        "       dirbridge-daemon --config {}",
        output_path.display()
    );
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Escape a string for safe inclusion inside a TOML double-quoted value.
fn escape_toml_string(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_toml_string_plain() {
        assert_eq!(escape_toml_string("hello"), "hello");
    }

    #[test]
    fn test_escape_toml_string_with_quotes() {
        assert_eq!(escape_toml_string(r#"say "hi""#), r#"say \"hi\""#);
    }

    #[test]
    fn test_escape_toml_string_with_backslash() {
        assert_eq!(escape_toml_string(r"C:\Users"), r"C:\\Users");
    }
}
