//! Configuration loading and typed config structures for the Opengold server.
//!
//! The configuration file (`opengold.yaml` by default) holds one section per
//! run *mode*. The binary is started with the mode name and only that
//! section is used:
//!
//! ```yaml
//! production:
//!   port: 8000
//!   cookie_secret: 6f1c...
//!   longpoll_timeout_secs: 20
//!   js_path: /js/build
//! test:
//!   port: 8002
//!   cookie_secret: 0d42...
//! ```
//!
//! If the file does not exist a default one is generated with a fresh
//! signing secret per mode and written to disk, so a first run works
//! without any setup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::server::ServerConfig;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "opengold.yaml";

/// Modes written into a freshly generated configuration file.
pub const DEFAULT_MODES: [&str; 3] = ["production", "staging", "test"];

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write the configuration file.
    #[error("failed to access config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse or emit YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML error.
        source: serde_yml::Error,
    },

    /// The requested mode has no section in the file.
    #[error("mode {mode:?} is not defined (available: {available})")]
    UnknownMode {
        /// The requested mode.
        mode: String,
        /// Comma-separated list of defined modes.
        available: String,
    },

    /// The mode has no signing secret.
    #[error("mode {0:?} has an empty cookie_secret")]
    MissingSecret(String),

    /// A value (from the file or an environment override) is invalid.
    #[error("invalid value for {key}: {message}")]
    Invalid {
        /// The offending key or environment variable.
        key: String,
        /// What was wrong with it.
        message: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// The whole configuration file: mode name to mode settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigFile {
    /// Settings keyed by mode name.
    pub modes: BTreeMap<String, ModeConfig>,
}

impl ConfigFile {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Build a configuration with every default mode and a random
    /// signing secret for each.
    pub fn generate() -> Self {
        let modes = DEFAULT_MODES
            .iter()
            .map(|mode| {
                let config = ModeConfig {
                    cookie_secret: uuid::Uuid::new_v4().simple().to_string(),
                    ..ModeConfig::default()
                };
                ((*mode).to_owned(), config)
            })
            .collect();
        Self { modes }
    }

    /// Write the configuration to `path` as YAML.
    pub fn write(&self, path: &Path) -> Result<(), ConfigError> {
        let yaml = serde_yml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Load the file at `path`, generating and writing a default one first
    /// if it does not exist.
    pub fn load_or_generate(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }

        info!(path = %path.display(), "No config file found, writing a default one");
        let config = Self::generate();
        config.write(path)?;
        Ok(config)
    }

    /// Select `mode`, apply environment overrides, and validate it.
    pub fn mode(&self, mode: &str) -> Result<ModeConfig, ConfigError> {
        let mut config = self
            .modes
            .get(mode)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownMode {
                mode: mode.to_owned(),
                available: self.modes.keys().cloned().collect::<Vec<_>>().join(", "),
            })?;
        config.apply_env_overrides()?;
        config.validate(mode)?;
        Ok(config)
    }
}

/// Settings for one run mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Secret used to sign session credentials.
    #[serde(default)]
    pub cookie_secret: String,

    /// How long a long-poll request may be held open.
    #[serde(default = "default_longpoll_timeout_secs")]
    pub longpoll_timeout_secs: u64,

    /// URL prefix of the client-side scripts, passed to HTML pages.
    #[serde(default = "default_js_path")]
    pub js_path: String,

    /// Directory with page templates overriding the built-in ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<PathBuf>,
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cookie_secret: String::new(),
            longpoll_timeout_secs: default_longpoll_timeout_secs(),
            js_path: default_js_path(),
            templates_dir: None,
        }
    }
}

impl ModeConfig {
    /// Apply overrides from process environment variables:
    ///
    /// - `OPENGOLD_HOST` overrides `host`
    /// - `OPENGOLD_PORT` overrides `port`
    /// - `OPENGOLD_COOKIE_SECRET` overrides `cookie_secret`
    /// - `OPENGOLD_LONGPOLL_TIMEOUT_SECS` overrides `longpoll_timeout_secs`
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup, keyed by the same
    /// variable names as [`ModeConfig::apply_env_overrides`].
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("OPENGOLD_HOST") {
            self.host = val;
        }
        if let Some(val) = lookup("OPENGOLD_PORT") {
            self.port = parse_override("OPENGOLD_PORT", &val)?;
        }
        if let Some(val) = lookup("OPENGOLD_COOKIE_SECRET") {
            self.cookie_secret = val;
        }
        if let Some(val) = lookup("OPENGOLD_LONGPOLL_TIMEOUT_SECS") {
            self.longpoll_timeout_secs = parse_override("OPENGOLD_LONGPOLL_TIMEOUT_SECS", &val)?;
        }
        Ok(())
    }

    fn validate(&self, mode: &str) -> Result<(), ConfigError> {
        if self.cookie_secret.trim().is_empty() {
            return Err(ConfigError::MissingSecret(mode.to_owned()));
        }
        if self.longpoll_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: String::from("longpoll_timeout_secs"),
                message: String::from("must be at least 1"),
            });
        }
        Ok(())
    }

    /// Listener settings for [`start_server`](crate::server::start_server).
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
        }
    }

    /// Runtime settings injected into the application state.
    pub fn settings(&self) -> Settings {
        Settings {
            cookie_secret: self.cookie_secret.clone(),
            longpoll_timeout: Duration::from_secs(self.longpoll_timeout_secs),
            js_path: self.js_path.clone(),
            templates_dir: self.templates_dir.clone(),
        }
    }
}

/// Values the request handlers need, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Secret used to sign session credentials.
    pub cookie_secret: String,
    /// Deadline for a single long-poll request.
    pub longpoll_timeout: Duration,
    /// URL prefix of the client-side scripts.
    pub js_path: String,
    /// Optional template override directory.
    pub templates_dir: Option<PathBuf>,
}

fn parse_override<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| ConfigError::Invalid {
        key: key.to_owned(),
        message: format!("{value:?}: {e}"),
    })
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8000
}

const fn default_longpoll_timeout_secs() -> u64 {
    20
}

fn default_js_path() -> String {
    "/js/build".to_owned()
}
