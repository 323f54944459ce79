#![allow(dead_code)]

use std::cell::RefCell;

use testusersctl::{
    CommandError, CommandExecutor, CommandOutput, CommandSpec, RegistryConfig,
    UserEntry,
};

/// Registry settings matching the acceptance suite fixture.
pub fn valid_config() -> RegistryConfig {
    let mut config = RegistryConfig {
        create: false,
        delete: false,
        drush_alias: Some("@d7.local".into()),
        ..RegistryConfig::default()
    };
    config.users.push(
        "administrator",
        user(
            "test.administrator",
            "test.administrator@example.com",
            &["administrator", "editor"],
            true,
        ),
    );
    config.users.push(
        "editor",
        user(
            "test.editor",
            "test.editor@example.com",
            &["editor", "moderator"],
            false,
        ),
    );
    config.users.push(
        "moderator",
        user(
            "test.moderator",
            "test.moderator@example.com",
            &["moderator"],
            false,
        ),
    );
    config
}

fn user(name: &str, email: &str, roles: &[&str], root: bool) -> UserEntry {
    UserEntry {
        name: Some(name.into()),
        pass: "foo".into(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        email: Some(email.into()),
        root,
    }
}

/// Records every command line and answers user count queries from a list
/// of usernames that "exist" on the fake site.
#[derive(Debug, Default)]
pub struct FakeSite {
    existing: Vec<String>,
    failing: Vec<String>,
    commands: RefCell<Vec<String>>,
}

impl FakeSite {
    pub fn with_existing(names: &[&str]) -> Self {
        Self {
            existing: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Commands containing `needle` fail to start.
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.failing.push(needle.to_string());
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }

    pub fn mutations(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|line| !line.contains(" sqlq "))
            .collect()
    }
}

impl CommandExecutor for FakeSite {
    fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        let line = spec.command_line();
        self.commands.borrow_mut().push(line.clone());

        if self.failing.iter().any(|needle| line.contains(needle.as_str())) {
            return Err(CommandError::Spawn {
                command: line,
                source: std::io::Error::other("fake site refused to start"),
            });
        }

        if line.contains(" sqlq ") {
            let exists = self
                .existing
                .iter()
                .any(|name| line.contains(&format!("name = \"{name}\"")));
            let count = if exists { "1" } else { "0" };
            return Ok(CommandOutput::new(
                0,
                [
                    "Warning: Permanently added 'd7.local' (ECDSA) to the list of known hosts.",
                    count,
                ],
            ));
        }

        Ok(CommandOutput::new(0, Vec::<String>::new()))
    }
}
