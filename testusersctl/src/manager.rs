//! Create and delete test users through Drush.

use testusers_model::TestUser;
use tracing::{debug, info, warn};

use crate::{
    error::RegistryError,
    runner::{CommandExecutor, CommandOutput, CommandRunner, escape_arg},
};

/// What happened to a single user during create or delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserOutcome {
    /// The account was created. Lists roles whose assignment failed.
    Created { failed_roles: Vec<String> },
    /// A non-root account already existed.
    Skipped,
    /// The root account exists, as expected.
    RootPresent,
    /// The root account does not exist; it is never created.
    RootMissing,
    /// The delete command was issued. `false` when Drush exited non-zero.
    Deleted { succeeded: bool },
    /// Root accounts are never deleted.
    RootProtected,
}

/// Per-user result of a bulk operation.
#[derive(Debug)]
pub struct UserReport {
    pub name: String,
    pub result: Result<UserOutcome, RegistryError>,
}

impl UserReport {
    pub fn is_err(&self) -> bool {
        self.result.is_err()
    }
}

#[derive(Debug)]
pub struct TestUserManager<E> {
    runner: CommandRunner<E>,
}

impl<E: CommandExecutor> TestUserManager<E> {
    pub fn new(runner: CommandRunner<E>) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &CommandRunner<E> {
        &self.runner
    }

    /// Create `user` unless it already exists or is the root user.
    ///
    /// Role assignments are best effort: failures are logged and listed in
    /// the outcome, and nothing is rolled back.
    pub fn create_user(
        &self,
        user: &TestUser,
    ) -> Result<UserOutcome, RegistryError> {
        let email = user.effective_email();
        debug!(
            user = %user.name,
            email = %email,
            "Trying to create test user"
        );

        if self.user_exists(&user.name)? {
            if user.is_root {
                return Ok(UserOutcome::RootPresent);
            }
            info!(user = %user.name, "User '{}' already exists, skipping.", user.name);
            return Ok(UserOutcome::Skipped);
        }

        if user.is_root {
            warn!(
                user = %user.name,
                "The user '{}' specified as 'root' does not exist. The root user should be the user with UID=1",
                user.name
            );
            return Ok(UserOutcome::RootMissing);
        }

        info!(user = %user.name, "Creating test user '{}'.", user.name);
        let created = self.runner.run(&format!(
            "user-create {} --mail={} --password={}",
            escape_arg(&user.name),
            escape_arg(&email),
            escape_arg(&user.pass)
        ))?;
        if !created.success() {
            warn!(
                user = %user.name,
                code = ?created.code,
                "user-create exited unsuccessfully"
            );
        }

        let mut failed_roles = Vec::new();
        for role in user.assignable_roles() {
            let result = self.runner.run(&format!(
                "user-add-role {} --name={}",
                escape_arg(role),
                escape_arg(&user.name)
            ));
            match result {
                Ok(output) if output.success() => {}
                Ok(CommandOutput { code, .. }) => {
                    warn!(user = %user.name, role, ?code, "Failed to add role");
                    failed_roles.push(role.to_string());
                }
                Err(err) => {
                    warn!(user = %user.name, role, error = %err, "Failed to add role");
                    failed_roles.push(role.to_string());
                }
            }
        }

        Ok(UserOutcome::Created { failed_roles })
    }

    /// Create each user in order; one failure does not stop the rest.
    pub fn create_users<'a, I>(&self, users: I) -> Vec<UserReport>
    where
        I: IntoIterator<Item = &'a TestUser>,
    {
        users
            .into_iter()
            .map(|user| UserReport {
                name: user.name.clone(),
                result: self.create_user(user),
            })
            .collect()
    }

    /// Delete `user` and its content. The root user is left alone.
    pub fn delete_user(
        &self,
        user: &TestUser,
    ) -> Result<UserOutcome, RegistryError> {
        if user.is_root {
            return Ok(UserOutcome::RootProtected);
        }

        info!(user = %user.name, "Deleting test user '{}'.", user.name);
        let output = self.runner.run(&format!(
            "user-cancel {} --delete-content",
            escape_arg(&user.name)
        ))?;
        if !output.success() {
            warn!(
                user = %user.name,
                code = ?output.code,
                "user-cancel exited unsuccessfully"
            );
        }
        Ok(UserOutcome::Deleted {
            succeeded: output.success(),
        })
    }

    /// Delete each user in order; one failure does not stop the rest.
    pub fn delete_users<'a, I>(&self, users: I) -> Vec<UserReport>
    where
        I: IntoIterator<Item = &'a TestUser>,
    {
        users
            .into_iter()
            .map(|user| UserReport {
                name: user.name.clone(),
                result: self.delete_user(user),
            })
            .collect()
    }

    /// Ask the site how many accounts have `username`.
    ///
    /// Only a first output line of exactly `0` means the user is missing; any
    /// other output, including none at all, counts as present.
    pub fn user_exists(&self, username: &str) -> Result<bool, RegistryError> {
        let output = self
            .runner
            .run(&user_count_command(username))
            .map_err(|source| RegistryError::Registry {
                username: username.to_string(),
                source,
            })?;
        Ok(output.first_line() != Some("0"))
    }
}

fn user_count_command(username: &str) -> String {
    let quoted = username.replace('\\', r"\\").replace('"', r#"\""#);
    let query =
        format!("select count(uid) from users_field_data where name = \"{quoted}\"");
    format!("sqlq {}", escape_arg(&query))
}
