//! The test-facing registry of configured users.
//!
//! A [`UserRegistry`] is built once per suite from a [`RegistryConfig`]. Test
//! steps use it to find users by name or by exact role set, and to record
//! which user is currently logged in. The host is expected to call
//! [`UserRegistry::remove_logged_in_user`] before each test.

use std::{collections::HashSet, fmt, str::FromStr};

use testusers_model::TestUser;
use tracing::info;

use crate::{
    config::RegistryConfig,
    error::RegistryError,
    manager::{TestUserManager, UserReport},
    runner::{CommandExecutor, CommandRunner, ShellExecutor},
};

/// Lifecycle operations applied to every configured user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserOperation {
    Create,
    Delete,
}

impl UserOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            UserOperation::Create => "create",
            UserOperation::Delete => "delete",
        }
    }
}

impl fmt::Display for UserOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserOperation {
    type Err = RegistryError;

    fn from_str(op: &str) -> Result<Self, Self::Err> {
        match op {
            "create" => Ok(UserOperation::Create),
            "delete" => Ok(UserOperation::Delete),
            other => Err(RegistryError::InvalidOperation(other.to_string())),
        }
    }
}

/// One role or a list of roles to look a user up by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleQuery {
    One(String),
    Many(Vec<String>),
}

impl RoleQuery {
    pub fn roles(&self) -> &[String] {
        match self {
            RoleQuery::One(role) => std::slice::from_ref(role),
            RoleQuery::Many(roles) => roles,
        }
    }
}

impl From<&str> for RoleQuery {
    fn from(role: &str) -> Self {
        RoleQuery::One(role.to_string())
    }
}

impl From<String> for RoleQuery {
    fn from(role: String) -> Self {
        RoleQuery::One(role)
    }
}

impl From<Vec<String>> for RoleQuery {
    fn from(roles: Vec<String>) -> Self {
        RoleQuery::Many(roles)
    }
}

impl From<&[&str]> for RoleQuery {
    fn from(roles: &[&str]) -> Self {
        RoleQuery::Many(roles.iter().map(|r| r.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for RoleQuery {
    fn from(roles: [&str; N]) -> Self {
        RoleQuery::Many(roles.iter().map(|r| r.to_string()).collect())
    }
}

#[derive(Debug)]
pub struct UserRegistry<E = ShellExecutor> {
    users: Vec<TestUser>,
    manager: TestUserManager<E>,
    create_enabled: bool,
    delete_enabled: bool,
    logged_in: Option<TestUser>,
}

impl UserRegistry<ShellExecutor> {
    /// Registry that runs Drush through the local shell.
    pub fn from_config(config: &RegistryConfig) -> Result<Self, RegistryError> {
        Self::new(config, ShellExecutor)
    }
}

impl<E: CommandExecutor> UserRegistry<E> {
    /// Build users and the Drush runner from `config`.
    ///
    /// Fails on a missing alias, an invalid username prefix or invalid user
    /// entries; nothing is usable after a failure.
    pub fn new(config: &RegistryConfig, executor: E) -> Result<Self, RegistryError> {
        let runner = CommandRunner::new(config, executor)?;
        let users = config.test_users()?;
        Ok(Self {
            users,
            manager: TestUserManager::new(runner),
            create_enabled: config.create,
            delete_enabled: config.delete,
            logged_in: None,
        })
    }

    pub fn manager(&self) -> &TestUserManager<E> {
        &self.manager
    }

    /// All configured users, in configuration order.
    pub fn users(&self) -> &[TestUser] {
        &self.users
    }

    pub fn root_user(&self) -> Option<&TestUser> {
        self.users.iter().find(|user| user.is_root)
    }

    pub fn user(&self, name: &str) -> Option<&TestUser> {
        self.users.iter().find(|user| user.name == name)
    }

    /// The user whose roles are exactly `roles`, ignoring order.
    ///
    /// A user holding more or fewer roles than requested does not match.
    pub fn user_by_role(&self, roles: impl Into<RoleQuery>) -> Option<&TestUser> {
        let query = roles.into();
        self.users
            .iter()
            .find(|user| user.has_exact_roles(query.roles()))
    }

    /// Every distinct role, in the order first seen.
    pub fn roles(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.users
            .iter()
            .flat_map(|user| user.roles.iter())
            .filter(|role| seen.insert(role.as_str()))
            .cloned()
            .collect()
    }

    pub fn logged_in_user(&self) -> Option<&TestUser> {
        self.logged_in.as_ref()
    }

    pub fn set_logged_in_user(&mut self, user: TestUser) {
        self.logged_in = Some(user);
    }

    pub fn remove_logged_in_user(&mut self) {
        self.logged_in = None;
    }

    /// Create or delete every configured user, if enabled in configuration.
    pub fn manage_test_users(
        &self,
        op: UserOperation,
    ) -> Result<Vec<UserReport>, RegistryError> {
        let enabled = match op {
            UserOperation::Create => self.create_enabled,
            UserOperation::Delete => self.delete_enabled,
        };
        if !enabled {
            info!(operation = %op, "Test user {op} disabled in configuration");
            return Ok(Vec::new());
        }

        let reports = match op {
            UserOperation::Create => self.manager.create_users(&self.users),
            UserOperation::Delete => self.manager.delete_users(&self.users),
        };
        Ok(reports)
    }

    /// [`Self::manage_test_users`] for an operation given by name.
    pub fn manage_test_users_str(
        &self,
        op: &str,
    ) -> Result<Vec<UserReport>, RegistryError> {
        self.manage_test_users(op.parse()?)
    }
}
