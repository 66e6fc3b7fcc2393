mod loader;
pub mod value;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub use value::{ConfigValue, FromConfigValue};

/// Error type for configuration operations.
#[derive(Debug)]
pub enum ConfigError {
    /// The requested key was not found in the configuration.
    NotFound(String),
    /// The value could not be converted to the requested type.
    TypeMismatch { key: String, expected: &'static str },
    /// An I/O or YAML parsing error occurred while loading config files.
    Load(String),
    /// A value was present but not acceptable for its key.
    Invalid { key: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(key) => write!(f, "Config key not found: {key}"),
            ConfigError::TypeMismatch { key, expected } => {
                write!(f, "Config type mismatch for '{key}': expected {expected}")
            }
            ConfigError::Load(msg) => write!(f, "Config load error: {msg}"),
            ConfigError::Invalid { key, message } => {
                write!(f, "Invalid config value for '{key}': {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Flat, dot-keyed configuration.
///
/// Resolution order (lowest to highest priority):
/// 1. `tablekit.yaml`
/// 2. `tablekit-{profile}.yaml`
/// 3. `.env`, then `.env.{profile}` (loaded into the process environment,
///    never overwriting variables that are already set)
/// 4. Environment variables: `DATABASE_URL` overrides `database.url`,
///    `DATABASE_MAX_CONNECTIONS` overrides `database.max_connections`.
///
/// The profile comes from `TABLEKIT_PROFILE`, falling back to the argument.
#[derive(Debug, Clone)]
pub struct Config {
    values: HashMap<String, ConfigValue>,
    profile: String,
}

impl Config {
    /// Load configuration from the current working directory.
    pub fn load(profile: &str) -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."), profile)
    }

    /// Load configuration from the files found in `dir`.
    pub fn load_from(dir: &Path, profile: &str) -> Result<Self, ConfigError> {
        let active_profile =
            std::env::var("TABLEKIT_PROFILE").unwrap_or_else(|_| profile.to_string());

        let mut values = HashMap::new();
        loader::load_yaml_file(&dir.join("tablekit.yaml"), &mut values)?;
        loader::load_yaml_file(&dir.join(format!("tablekit-{active_profile}.yaml")), &mut values)?;

        load_dotenv(dir.join(".env"));
        load_dotenv(dir.join(format!(".env.{active_profile}")));

        loader::overlay_env(std::env::vars(), &mut values);

        tracing::debug!(profile = %active_profile, keys = values.len(), "configuration loaded");
        Ok(Config {
            values,
            profile: active_profile,
        })
    }

    /// Create a config from a YAML string (useful for testing).
    pub fn from_yaml_str(yaml: &str, profile: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        loader::load_yaml_str(yaml, &mut values)?;
        Ok(Config {
            values,
            profile: profile.to_string(),
        })
    }

    pub fn empty() -> Self {
        Config {
            values: HashMap::new(),
            profile: "test".to_string(),
        }
    }

    /// Set a value programmatically.
    pub fn set(&mut self, key: &str, value: ConfigValue) {
        self.values.insert(key.to_string(), value);
    }

    /// Get a typed value for the given dot-separated key.
    pub fn get<V: FromConfigValue>(&self, key: &str) -> Result<V, ConfigError> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))?;
        V::from_config_value(value, key)
    }

    /// Get a typed value, falling back to `default` only when the key is
    /// missing. A present value of the wrong type is still an error.
    pub fn get_or<V: FromConfigValue>(&self, key: &str, default: V) -> Result<V, ConfigError> {
        match self.values.get(key) {
            Some(value) => V::from_config_value(value, key),
            None => Ok(default),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }
}

fn load_dotenv(path: PathBuf) {
    if let Err(err) = dotenvy::from_path(&path) {
        if !err.not_found() {
            tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable env file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_and_get() {
        let yaml = r#"
database:
  url: "postgres://localhost/app"
  max_connections: 5
  read_only: true
"#;
        let config = Config::from_yaml_str(yaml, "test").unwrap();
        assert_eq!(
            config.get::<String>("database.url").unwrap(),
            "postgres://localhost/app"
        );
        assert_eq!(config.get::<u32>("database.max_connections").unwrap(), 5);
        assert!(config.get::<bool>("database.read_only").unwrap());
    }

    #[test]
    fn test_get_or_only_defaults_missing_keys() {
        let mut config = Config::empty();
        config.set("database.max_connections", ConfigValue::String("lots".into()));
        assert_eq!(config.get_or("database.min_connections", 0u32).unwrap(), 0);
        assert!(matches!(
            config.get_or("database.max_connections", 10u32),
            Err(ConfigError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_key() {
        let config = Config::empty();
        assert!(matches!(
            config.get::<String>("database.url"),
            Err(ConfigError::NotFound(_))
        ));
    }
}
