// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;
use std::path::Path;

/// Where variables are read from
#[derive(Debug, Clone)]
enum Source {
    Process,
    Fixed(HashMap<String, String>),
}

/// Environment variable loader
#[derive(Debug, Clone)]
pub struct EnvLoader {
    prefix: Option<String>,
    source: Source,
}

impl EnvLoader {
    /// Read the process environment
    pub fn new(prefix: Option<String>) -> Self {
        Self {
            prefix,
            source: Source::Process,
        }
    }

    /// Read a fixed set of variables instead of the process environment
    pub fn from_map<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prefix: None,
            source: Source::Fixed(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    fn vars(&self) -> Vec<(String, String)> {
        match &self.source {
            Source::Process => env::vars().collect(),
            Source::Fixed(vars) => vars.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }

    /// Load all variables, keyed by their upper-case name without the prefix
    pub fn load(&self) -> HashMap<String, String> {
        let mut config = HashMap::new();

        for (key, value) in self.vars() {
            match &self.prefix {
                Some(prefix) => {
                    if let Some(rest) = key.strip_prefix(prefix.as_str()) {
                        config.insert(rest.trim_start_matches('_').to_uppercase(), value);
                    }
                }
                None => {
                    config.insert(key.to_uppercase(), value);
                }
            }
        }

        config
    }

    /// Load a specific variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        };

        let value = match &self.source {
            Source::Process => env::var(&full_key).ok(),
            Source::Fixed(vars) => vars.get(&full_key).cloned(),
        };
        value.ok_or(ConfigError::KeyNotFound(full_key))
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Read a `.env` file without touching the process environment.
///
/// A missing file yields no variables.
pub fn read_dotenv(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let iter = dotenvy::from_path_iter(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
    let mut vars = HashMap::new();
    for item in iter {
        let (key, value) = item.map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;
        vars.insert(key, value);
    }
    Ok(vars)
}
