use thiserror::Error;

use crate::{runner::CommandError, validation::ConfigGuardRailError};

/// Errors surfaced by the registry, the manager and the command runner.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Required configuration is missing or invalid.
    #[error(transparent)]
    Configuration(#[from] ConfigGuardRailError),
    /// The caller asked for a lifecycle operation that does not exist.
    #[error("Invalid operation {0} when managing users.")]
    InvalidOperation(String),
    /// The remote existence check could not be executed.
    #[error("could not check whether user '{username}' exists")]
    Registry {
        username: String,
        #[source]
        source: CommandError,
    },
    /// The external command could not be located or started.
    #[error(transparent)]
    CommandExecution(#[from] CommandError),
}

impl RegistryError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, RegistryError::Configuration(_))
    }
}
