//! Drush-backed test user provisioning for Drupal test suites.
//!
//! This crate turns a declarative user/role configuration into test accounts
//! on a Drupal site, creating and deleting them through Drush, and exposes a
//! small registry API that test steps use to look users up by name or exact
//! role set and to track which test user is currently logged in. The
//! `testusersctl` binary drives the same lifecycle from a shell or CI job.

pub mod config;
pub mod error;
pub mod loader;
pub mod manager;
pub mod registry;
pub mod runner;
pub mod validation;

pub use config::{RegistryConfig, UserEntries, UserEntry};
pub use error::RegistryError;
pub use loader::{ConfigLoad, ConfigLoader, error::ConfigLoadError};
pub use manager::{TestUserManager, UserOutcome, UserReport};
pub use registry::{RoleQuery, UserOperation, UserRegistry};
pub use runner::{
    CommandError, CommandExecutor, CommandOutput, CommandRunner, CommandSpec,
    ShellExecutor,
};
pub use testusers_model::{ModelError, TestUser};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
