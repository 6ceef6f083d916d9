//! Configuration management for Trellis services
//!
//! [`AppConfig`] is assembled in layers, each overriding the previous one:
//!
//! 1. built-in defaults,
//! 2. an optional TOML or JSON file,
//! 3. an optional `.env` file,
//! 4. the process environment.
//!
//! ```
//! use trellis_config::{ConfigLoader, EnvLoader};
//!
//! let config = ConfigLoader::new()
//!     .env(EnvLoader::from_map([("APP_PORT", "8080"), ("APP_ENVIRONMENT", "test")]))
//!     .load()
//!     .unwrap();
//!
//! assert_eq!(config.port, 8080);
//! assert!(!config.error_reporting_enabled());
//! ```

pub mod env;
pub mod error;
pub mod loader;

pub use env::{EnvLoader, read_dotenv};
pub use error::{ConfigError, Result};
pub use loader::{FileFormat, FileLoader};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use trellis_core::logging::{LogConfig, LogFormat, LogLevel};
use tracing::debug;

/// Environments in which errors are not sent to the reporter
const QUIET_ENVIRONMENTS: [&str; 2] = ["development", "test"];

/// Service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// `APP_PORT`
    pub port: u16,
    /// `APP_HOST`
    pub host: String,
    /// `LOG`
    pub log_level: String,
    /// `LOG_FORMAT`
    pub log_format: String,
    /// `APP_ENVIRONMENT`: development, test, staging, production...
    pub environment: String,
    /// `APP_ENV`
    pub app_env: String,
    /// `NAMESPACE`
    pub namespace: String,
    /// `ERROR_REPORTING_TOKEN`
    pub error_reporting_token: Option<String>,
    /// `DOCS_PATH`
    pub docs_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
            log_level: "info".to_string(),
            log_format: "json".to_string(),
            environment: "development".to_string(),
            app_env: "local".to_string(),
            namespace: "default".to_string(),
            error_reporting_token: None,
            docs_path: "/public/docs".to_string(),
        }
    }
}

impl AppConfig {
    /// Apply variables by their environment names
    fn apply_vars(&mut self, vars: &HashMap<String, String>) -> Result<()> {
        for (key, value) in vars {
            match key.as_str() {
                "APP_PORT" => {
                    self.port = value
                        .trim()
                        .parse()
                        .map_err(|_| ConfigError::invalid("APP_PORT", format!("'{}' is not a port number", value)))?;
                }
                "APP_HOST" => self.host = value.clone(),
                "LOG" => self.log_level = value.clone(),
                "LOG_FORMAT" => self.log_format = value.clone(),
                "APP_ENVIRONMENT" => self.environment = value.clone(),
                "APP_ENV" => self.app_env = value.clone(),
                "NAMESPACE" => self.namespace = value.clone(),
                "ERROR_REPORTING_TOKEN" => {
                    self.error_reporting_token = Some(value.clone()).filter(|t| !t.is_empty());
                }
                "DOCS_PATH" => self.docs_path = value.clone(),
                _ => {}
            }
        }
        Ok(())
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(ConfigError::invalid("APP_PORT", "must not be 0"));
        }
        self.host
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::invalid("APP_HOST", format!("'{}' is not an IP address", self.host)))?;
        if !self.docs_path.starts_with('/') {
            return Err(ConfigError::invalid("DOCS_PATH", "must start with '/'"));
        }
        self.log_level
            .parse::<LogLevel>()
            .map_err(|e| ConfigError::invalid("LOG", e.to_string()))?;
        self.log_format
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::invalid("LOG_FORMAT", e.to_string()))?;
        Ok(())
    }

    /// Address the server binds to
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ConfigError::invalid("APP_HOST", format!("'{}' is not an IP address", self.host)))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Logging setup derived from `LOG` and `LOG_FORMAT`
    pub fn log_config(&self) -> Result<LogConfig> {
        let level = self
            .log_level
            .parse::<LogLevel>()
            .map_err(|e| ConfigError::invalid("LOG", e.to_string()))?;
        let format = self
            .log_format
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::invalid("LOG_FORMAT", e.to_string()))?;

        Ok(LogConfig::new()
            .level(level)
            .format(format)
            .with_colors(format != LogFormat::Json))
    }

    /// Errors are reported everywhere except development and test
    pub fn error_reporting_enabled(&self) -> bool {
        !QUIET_ENVIRONMENTS.contains(&self.environment.as_str())
    }

    /// Environment tag attached to reported errors: `APP_ENV-NAMESPACE`
    pub fn reporting_environment(&self) -> String {
        format!("{}-{}", self.app_env, self.namespace)
    }
}

/// Builds an [`AppConfig`] from its layers
#[derive(Debug, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    dotenv: Option<PathBuf>,
    env: Option<EnvLoader>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// TOML or JSON file, detected by extension
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// `.env` file; missing files are ignored
    pub fn dotenv(mut self, path: impl Into<PathBuf>) -> Self {
        self.dotenv = Some(path.into());
        self
    }

    /// Environment source, the process environment by default
    pub fn env(mut self, env: EnvLoader) -> Self {
        self.env = Some(env);
        self
    }

    pub fn load(self) -> Result<AppConfig> {
        let mut config = match &self.file {
            Some(path) => {
                let value = FileLoader::auto(path)?.load_file(path)?;
                debug!(path = %path.display(), "Loaded configuration file");
                serde_json::from_value(value).map_err(|e| ConfigError::DeserializationError(e.to_string()))?
            }
            None => AppConfig::default(),
        };

        if let Some(path) = &self.dotenv {
            let vars = read_dotenv(path)?;
            debug!(path = %path.display(), variables = vars.len(), "Loaded .env file");
            config.apply_vars(&vars)?;
        }

        let env = self.env.unwrap_or_default();
        config.apply_vars(&env.load())?;

        config.validate()?;
        Ok(config)
    }
}
