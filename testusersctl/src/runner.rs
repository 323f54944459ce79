//! Drush command assembly and execution.
//!
//! Commands are described by a [`CommandSpec`] so they can be asserted on
//! without spawning anything; [`ShellExecutor`] runs a spec as a single
//! `sh -c` invocation and captures its standard output. [`CommandRunner`]
//! prefixes every command with the Drush executable, `-y` and the site alias.

use std::{
    fmt::{self, Display},
    io,
    process::{Command, Stdio},
};

use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    config::RegistryConfig,
    validation::{ConfigGuardRailError, validate_drush_settings},
};

/// Output lines starting with this text are SSH chatter, not Drush output.
pub const NOISE_PREFIX: &str = "Warning: Permanently added";

/// Abstract command representation so we can test without spawning processes.
///
/// `args` are shell words that have already been escaped; they are joined
/// verbatim into the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

/// Display raw command line
impl Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// The full line handed to the shell.
    pub fn command_line(&self) -> String {
        self.to_string()
    }

    /// First word of `program`, the thing that has to exist on `PATH`.
    pub fn executable(&self) -> &str {
        self.program
            .split_whitespace()
            .next()
            .unwrap_or(self.program.as_str())
    }
}

pub fn to_command(spec: &CommandSpec) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(spec.command_line());
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());
    cmd
}

/// Quote `value` for a POSIX shell.
pub fn escape_arg(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Captured result of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub lines: Vec<String>,
}

impl CommandOutput {
    pub fn new<I, S>(code: i32, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            code: Some(code),
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn first_line(&self) -> Option<&str> {
        self.lines.first().map(String::as_str)
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("could not locate executable '{program}'")]
    NotFound {
        program: String,
        #[source]
        source: which::Error,
    },
    #[error("failed to run `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
}

/// Runs a [`CommandSpec`] and captures its output.
#[cfg_attr(test, mockall::automock)]
pub trait CommandExecutor {
    fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError>;
}

impl<T: CommandExecutor + ?Sized> CommandExecutor for &T {
    fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        (**self).execute(spec)
    }
}

impl<T: CommandExecutor + ?Sized> CommandExecutor for Box<T> {
    fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        (**self).execute(spec)
    }
}

/// Blocking executor backed by `sh -c`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellExecutor;

impl CommandExecutor for ShellExecutor {
    fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        let program = spec.executable();
        which::which(program).map_err(|source| CommandError::NotFound {
            program: program.to_string(),
            source,
        })?;

        let output =
            to_command(spec)
                .output()
                .map_err(|source| CommandError::Spawn {
                    command: spec.command_line(),
                    source,
                })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(CommandOutput {
            code: output.status.code(),
            lines: stdout.lines().map(str::to_string).collect(),
        })
    }
}

/// Prefixes commands with the Drush executable and alias, then runs them.
#[derive(Debug)]
pub struct CommandRunner<E> {
    drush: String,
    alias: Option<String>,
    executor: E,
}

impl<E: CommandExecutor> CommandRunner<E> {
    /// Fails when the alias is required but not configured.
    pub fn new(
        config: &RegistryConfig,
        executor: E,
    ) -> Result<Self, ConfigGuardRailError> {
        validate_drush_settings(config)?;
        Ok(Self {
            drush: config.drush.trim().to_string(),
            alias: config.alias().map(str::to_string),
            executor,
        })
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Build the spec for `tail`, a Drush command whose arguments are escaped.
    pub fn spec(&self, tail: &str) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.drush).arg("-y");
        if let Some(alias) = &self.alias {
            spec = spec.arg(escape_arg(alias));
        }
        spec.arg(tail)
    }

    /// The full command line for `tail`, e.g. `drush -y '@d7.local' st`.
    pub fn prepare(&self, tail: &str) -> String {
        self.spec(tail).command_line()
    }

    /// Run `tail` and return its output without SSH noise lines.
    ///
    /// A non-zero exit status is returned as part of the output, not as an
    /// error.
    pub fn run(&self, tail: &str) -> Result<CommandOutput, CommandError> {
        let spec = self.spec(tail);
        debug!(command = %spec, "Running drush command");

        let mut output = self.executor.execute(&spec)?;
        output.lines.retain(|line| !line.starts_with(NOISE_PREFIX));

        trace!(
            command = %spec,
            code = ?output.code,
            lines = output.lines.len(),
            "Drush command finished"
        );
        Ok(output)
    }
}
