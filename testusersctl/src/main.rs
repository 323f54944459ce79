use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use testusersctl::{
    ConfigLoad, ConfigLoader, TestUser, UserOperation, UserOutcome,
    UserRegistry, UserReport,
};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "testusersctl",
    about = "Create and delete Drupal test users through Drush"
)]
struct Cli {
    /// Registry or Codeception suite configuration (YAML, TOML or JSON)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create every configured test user that does not exist yet
    Create {
        /// Create users even when `create` is disabled in configuration
        #[arg(long)]
        force: bool,
    },
    /// Delete every configured test user except root
    Delete {
        /// Delete users even when `delete` is disabled in configuration
        #[arg(long)]
        force: bool,
    },
    /// Run a lifecycle operation by name (`create` or `delete`)
    Manage { operation: String },
    /// List configured test users
    List {
        #[arg(long)]
        json: bool,
    },
    /// List distinct roles across configured users
    Roles,
    /// Validate configuration and print warnings
    Check,
    /// Report whether a user exists on the site
    Exists { name: String },
    /// Print the full drush command line for a drush command without running it
    Prepare {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        tail: Vec<String>,
    },
}

fn load(config: Option<PathBuf>) -> Result<ConfigLoad> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = config {
        loader = loader.with_config_path(path);
    }
    let load = loader.load().context("failed to load test user configuration")?;
    for warning in &load.warnings.items {
        match &warning.hint {
            Some(hint) => eprintln!("warning: {} ({hint})", warning.message),
            None => eprintln!("warning: {}", warning.message),
        }
    }
    Ok(load)
}

fn describe(user: &TestUser) -> String {
    let mut line = format!("{}\t{}", user.name, user.roles.join(","));
    if user.is_root {
        line.push_str("\troot");
    }
    line
}

fn print_reports(reports: &[UserReport]) -> ExitCode {
    let mut failed = false;
    for report in reports {
        match &report.result {
            Ok(UserOutcome::Created { failed_roles }) if failed_roles.is_empty() => {
                println!("{}: created", report.name)
            }
            Ok(UserOutcome::Created { failed_roles }) => println!(
                "{}: created, failed to add roles {}",
                report.name,
                failed_roles.join(",")
            ),
            Ok(UserOutcome::Skipped) => println!("{}: already exists", report.name),
            Ok(UserOutcome::RootPresent) => println!("{}: root present", report.name),
            Ok(UserOutcome::RootMissing) => {
                println!("{}: root missing (not created)", report.name)
            }
            Ok(UserOutcome::Deleted { succeeded: true }) => {
                println!("{}: deleted", report.name)
            }
            Ok(UserOutcome::Deleted { succeeded: false }) => {
                println!("{}: delete command failed", report.name)
            }
            Ok(UserOutcome::RootProtected) => {
                println!("{}: root left in place", report.name)
            }
            Err(err) => {
                failed = true;
                error!(user = %report.name, error = %err, "Test user operation failed");
                println!("{}: error: {err}", report.name);
            }
        }
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Create { force } => {
            let mut load = load(cli.config)?;
            load.config.create |= force;
            let registry = UserRegistry::from_config(&load.config)?;
            Ok(print_reports(
                &registry.manage_test_users(UserOperation::Create)?,
            ))
        }
        Command::Delete { force } => {
            let mut load = load(cli.config)?;
            load.config.delete |= force;
            let registry = UserRegistry::from_config(&load.config)?;
            Ok(print_reports(
                &registry.manage_test_users(UserOperation::Delete)?,
            ))
        }
        Command::Manage { operation } => {
            let load = load(cli.config)?;
            let registry = UserRegistry::from_config(&load.config)?;
            Ok(print_reports(&registry.manage_test_users_str(&operation)?))
        }
        Command::List { json } => {
            let load = load(cli.config)?;
            let users = load.config.test_users()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&users)?);
            } else {
                for user in &users {
                    println!("{}", describe(user));
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Roles => {
            let load = load(cli.config)?;
            let registry = UserRegistry::from_config(&load.config)?;
            for role in registry.roles() {
                println!("{role}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Check => {
            let load = load(cli.config)?;
            println!(
                "{}: {} users, {} warnings",
                load.path.display(),
                load.config.users.len(),
                load.warnings.len()
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Exists { name } => {
            let load = load(cli.config)?;
            let registry = UserRegistry::from_config(&load.config)?;
            let exists = registry.manager().user_exists(&name)?;
            println!("{name}: {}", if exists { "exists" } else { "missing" });
            Ok(if exists {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            })
        }
        Command::Prepare { tail } => {
            let load = load(cli.config)?;
            let registry = UserRegistry::from_config(&load.config)?;
            println!("{}", registry.manager().runner().prepare(&tail.join(" ")));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
