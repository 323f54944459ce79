//! Guard rails applied to a parsed registry configuration.

use once_cell::sync::Lazy;
use regex::Regex;
use testusers_model::ModelError;
use thiserror::Error;

use super::config::RegistryConfig;

static PREFIX_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_-]{3,}$")
        .expect("username prefix pattern is valid")
});

#[derive(Debug, Error)]
pub enum ConfigGuardRailError {
    #[error("Please configure the drush-alias setting in your suite configuration.")]
    MissingDrushAlias,
    #[error("the drush setting must name an executable")]
    EmptyDrushCommand,
    #[error(
        "Drupal username prefix '{prefix}' is invalid: it must start with a letter, contain at least 4 characters and only use letters, digits, '_' or '-'."
    )]
    InvalidUsernamePrefix { prefix: String },
    #[error("user '{key}' has an empty name")]
    EmptyUsername { key: String },
    #[error("invalid test user '{key}': {source}")]
    InvalidUser {
        key: String,
        #[source]
        source: ModelError,
    },
    #[error("username '{name}' is configured more than once")]
    DuplicateUsername { name: String },
    #[error(
        "only one root user may be configured, found '{first}' and '{second}'"
    )]
    MultipleRootUsers { first: String, second: String },
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

pub fn validate_username_prefix(prefix: &str) -> Result<(), ConfigGuardRailError> {
    if PREFIX_PATTERN.is_match(prefix) {
        Ok(())
    } else {
        Err(ConfigGuardRailError::InvalidUsernamePrefix {
            prefix: prefix.to_string(),
        })
    }
}

/// Check the runner settings: executable present, alias present when required.
pub fn validate_drush_settings(
    config: &RegistryConfig,
) -> Result<(), ConfigGuardRailError> {
    if config.drush.trim().is_empty() {
        return Err(ConfigGuardRailError::EmptyDrushCommand);
    }
    if config.alias_required && config.alias().is_none() {
        return Err(ConfigGuardRailError::MissingDrushAlias);
    }
    Ok(())
}

/// Run every guard rail and collect non-fatal findings.
pub fn apply_guard_rails(
    config: &RegistryConfig,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    validate_drush_settings(config)?;
    let users = config.test_users()?;

    if users.is_empty() {
        warnings.push_with_hint(
            "no test users configured; create and delete will do nothing",
            "Add entries under `users` in the suite configuration",
        );
    }

    if !users.iter().any(|user| user.is_root) {
        warnings.push("no root user configured; root lookups will return nothing");
    }

    for user in &users {
        if user.roles.is_empty() {
            warnings.push(format!(
                "user '{}' has no roles and cannot be found by role",
                user.name
            ));
        }
        if user.pass.is_empty() && !user.is_root {
            warnings.push_with_hint(
                format!("user '{}' has an empty password", user.name),
                "Drush will create the account but tests will not be able to log in with it",
            );
        }
    }

    if !config.alias_required && config.alias().is_none() {
        warnings.push(
            "no drush-alias configured; commands will run against the default site",
        );
    }

    Ok(warnings)
}
