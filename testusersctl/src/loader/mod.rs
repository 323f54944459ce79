//! Locate, parse and validate the registry configuration.
//!
//! Files may be YAML, TOML or JSON (picked by extension, YAML otherwise). A
//! file can either hold the registry settings at its top level or be a full
//! Codeception suite file with the settings under
//! `modules.config.DrupalUserRegistry`. Environment overrides are applied
//! after parsing and before the guard rails run.

pub mod error;

use std::{
    fs,
    path::{Path, PathBuf},
};

use once_cell::sync::Lazy;
use serde_json::Value;
use tracing::debug;

pub use error::ConfigLoadError;

use crate::{
    config::RegistryConfig,
    validation::{self, ConfigWarnings},
};

/// Where the registry settings live inside a Codeception suite file.
pub const SUITE_SETTINGS_POINTER: &str = "/modules/config/DrupalUserRegistry";

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("testusers.yml"),
        PathBuf::from("testusers.toml"),
        PathBuf::from("tests/acceptance.suite.yml"),
    ]
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
    Json,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("toml") => ConfigFormat::Toml,
            Some("json") => ConfigFormat::Json,
            _ => ConfigFormat::Yaml,
        }
    }
}

/// Values taken from the process environment.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    pub config_path: Option<PathBuf>,
    pub drush: Option<String>,
    pub drush_alias: Option<String>,
}

impl EnvOverrides {
    pub fn gather() -> Self {
        Self {
            config_path: non_empty_var("TESTUSERS_CONFIG").map(PathBuf::from),
            drush: non_empty_var("TESTUSERS_DRUSH"),
            drush_alias: non_empty_var("TESTUSERS_DRUSH_ALIAS"),
        }
    }

    fn apply(&self, config: &mut RegistryConfig) {
        if let Some(drush) = &self.drush {
            config.drush = drush.clone();
        }
        if let Some(alias) = &self.drush_alias {
            config.drush_alias = Some(alias.clone());
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env: EnvOverrides,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: RegistryConfig,
    pub path: PathBuf,
    pub warnings: ConfigWarnings,
}

impl ConfigLoader {
    /// Loader seeded with overrides from the process environment.
    pub fn new() -> Self {
        Self::with_options(ConfigLoaderOptions {
            config_path: None,
            env: EnvOverrides::gather(),
        })
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env(mut self, env: EnvOverrides) -> Self {
        self.options.env = env;
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let path = self.resolve_path()?;
        let contents =
            fs::read_to_string(&path).map_err(|source| ConfigLoadError::Io {
                path: path.clone(),
                source,
            })?;

        let mut config = parse_config(&contents, &path)?;
        self.options.env.apply(&mut config);

        let warnings = validation::apply_guard_rails(&config)?;
        debug!(
            path = %path.display(),
            users = config.users.len(),
            warnings = warnings.len(),
            "Loaded test user configuration"
        );

        Ok(ConfigLoad {
            config,
            path,
            warnings,
        })
    }

    fn resolve_path(&self) -> Result<PathBuf, ConfigLoadError> {
        let explicit = self
            .options
            .config_path
            .clone()
            .or_else(|| self.options.env.config_path.clone());

        match explicit {
            Some(path) if path.exists() => Ok(path),
            Some(path) => Err(ConfigLoadError::MissingConfig { path }),
            None => DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
                .cloned()
                .ok_or(ConfigLoadError::NoConfigFound),
        }
    }
}

/// Parse `contents` in the format implied by `path`.
pub fn parse_config(
    contents: &str,
    path: &Path,
) -> Result<RegistryConfig, ConfigLoadError> {
    let value: Value = match ConfigFormat::from_path(path) {
        ConfigFormat::Yaml => serde_yaml::from_str(contents).map_err(|source| {
            ConfigLoadError::Yaml {
                path: path.to_path_buf(),
                source,
            }
        })?,
        ConfigFormat::Toml => {
            toml::from_str(contents).map_err(|source| ConfigLoadError::Toml {
                path: path.to_path_buf(),
                source,
            })?
        }
        ConfigFormat::Json => {
            serde_json::from_str(contents).map_err(|source| {
                ConfigLoadError::Json {
                    path: path.to_path_buf(),
                    source,
                }
            })?
        }
    };

    let settings = match value.pointer(SUITE_SETTINGS_POINTER) {
        Some(nested) => nested.clone(),
        None => value,
    };
    let settings = match settings {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };

    serde_json::from_value(settings).map_err(|source| ConfigLoadError::Settings {
        path: path.to_path_buf(),
        source,
    })
}
