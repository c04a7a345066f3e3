//! Credential capture for the external directory bind.
//!
//! The bootstrap needs a login/password pair exactly once, before anything
//! else proceeds. [`CredentialProvider`] abstracts where the pair comes
//! from: an interactive terminal prompt, or environment variables for
//! non-interactive deployments. The selection is made by configuration.

use dialoguer::{Input, Password};
use tracing::debug;

use crate::config::{CredentialMode, CredentialsConfig};
use crate::errors::CredentialError;
use crate::models::Credentials;

/// One-shot source of the destination directory credentials.
pub trait CredentialProvider: Send + Sync {
    /// Obtain the login/password pair. Blocking; no retry, no timeout.
    fn obtain(&self) -> Result<Credentials, CredentialError>;
}

// ---------------------------------------------------------------------------
// Terminal prompts
// ---------------------------------------------------------------------------

/// Interactive terminal prompts: plain login input, echo-suppressed
/// password.
pub struct PromptProvider;

impl CredentialProvider for PromptProvider {
    fn obtain(&self) -> Result<Credentials, CredentialError> {
        let login: String = Input::new()
            .with_prompt("Destination directory login")
            .interact_text()?;
        let password = Password::new()
            .with_prompt("Destination directory password")
            .interact()?;
        Ok(Credentials { login, password })
    }
}

// ---------------------------------------------------------------------------
// Environment variables
// ---------------------------------------------------------------------------

/// Non-interactive provider reading two environment variables.
pub struct EnvProvider {
    login_var: String,
    password_var: String,
}

impl EnvProvider {
    pub fn new(login_var: impl Into<String>, password_var: impl Into<String>) -> Self {
        Self {
            login_var: login_var.into(),
            password_var: password_var.into(),
        }
    }

    fn read(var: &str) -> Result<String, CredentialError> {
        match std::env::var(var) {
            Ok(value) if !value.is_empty() => Ok(value),
            _ => Err(CredentialError::MissingEnv {
                var: var.to_string(),
            }),
        }
    }
}

impl CredentialProvider for EnvProvider {
    fn obtain(&self) -> Result<Credentials, CredentialError> {
        debug!(
            login_var = %self.login_var,
            password_var = %self.password_var,
            "reading destination credentials from environment"
        );
        Ok(Credentials {
            login: Self::read(&self.login_var)?,
            password: Self::read(&self.password_var)?,
        })
    }
}

/// Build the provider selected by the `[credentials]` config section.
pub fn provider_from_config(config: &CredentialsConfig) -> Box<dyn CredentialProvider> {
    match config.mode {
        CredentialMode::Prompt => Box::new(PromptProvider),
        CredentialMode::Env => Box::new(EnvProvider::new(
            config.login_env.clone(),
            config.password_env.clone(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_provider_reads_both_variables() {
        std::env::set_var("TEST_DB_FEED_LOGIN", "svc-bind");
        std::env::set_var("TEST_DB_FEED_PASSWORD", "s3cret");

        let provider = EnvProvider::new("TEST_DB_FEED_LOGIN", "TEST_DB_FEED_PASSWORD");
        let creds = provider.obtain().unwrap();
        assert_eq!(creds.login, "svc-bind");
        assert_eq!(creds.password, "s3cret");

        std::env::remove_var("TEST_DB_FEED_LOGIN");
        std::env::remove_var("TEST_DB_FEED_PASSWORD");
    }

    #[test]
    fn test_env_provider_rejects_missing_variable() {
        let provider = EnvProvider::new("TEST_DB_FEED_ABSENT", "TEST_DB_FEED_ABSENT_PW");
        let result = provider.obtain();
        assert!(matches!(
            result,
            Err(CredentialError::MissingEnv { ref var }) if var == "TEST_DB_FEED_ABSENT"
        ));
    }

    #[test]
    fn test_env_provider_rejects_empty_variable() {
        std::env::set_var("TEST_DB_FEED_EMPTY", "");
        let provider = EnvProvider::new("TEST_DB_FEED_EMPTY", "TEST_DB_FEED_EMPTY_PW");
        assert!(matches!(
            provider.obtain(),
            Err(CredentialError::MissingEnv { .. })
        ));
        std::env::remove_var("TEST_DB_FEED_EMPTY");
    }
}
