pub mod validation;

use serde::{Deserialize, Serialize};

use crate::message::{Key, Timestamp};

use self::validation::validate_config;

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub base_path: String,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_worker_threads: Option<usize>,
}

fn default_port() -> u16 {
    8080
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            base_path: String::new(),
            max_body_bytes: default_max_body_bytes(),
            runtime_worker_threads: None,
        }
    }
}

/// Log line encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Feature flags and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

/// A key the in-memory directory starts with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedKeyConfig {
    pub app_id: String,
    #[serde(default)]
    pub format: String,
    pub key: String,
    /// RFC3339, e.g. `2015-05-18T23:58:36Z`.
    #[serde(default)]
    pub creation_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedUserConfig {
    pub user_id: String,
    #[serde(default)]
    pub keys: Vec<SeedKeyConfig>,
}

/// Initial contents of the in-memory directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default)]
    pub users: Vec<SeedUserConfig>,
}

impl DirectoryConfig {
    /// Seed users as directory keys, in config order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when a `creation_time` is not
    /// RFC3339.
    pub fn seed_users(&self) -> Result<Vec<(String, Vec<Key>)>, ConfigError> {
        self.users
            .iter()
            .map(|user| {
                let keys = user
                    .keys
                    .iter()
                    .map(|seed| seed_key(&user.user_id, seed))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((user.user_id.clone(), keys))
            })
            .collect()
    }
}

fn seed_key(user_id: &str, seed: &SeedKeyConfig) -> Result<Key, ConfigError> {
    let creation_time = seed
        .creation_time
        .as_deref()
        .map(Timestamp::from_rfc3339)
        .transpose()
        .map_err(|err| {
            ConfigError::Validation(format!(
                "directory.users['{user_id}'].keys['{}'].creation_time: {err}",
                seed.app_id
            ))
        })?;
    Ok(Key {
        app_id: seed.app_id.clone(),
        format: seed.format.clone(),
        key: seed.key.clone(),
        creation_time,
    })
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
}

/// Load configuration from a YAML file and validate it.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when reading the file fails, [`ConfigError::Yaml`]
/// when parsing fails, or [`ConfigError::Validation`] when semantic validation fails.
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse and validate configuration from YAML text.
///
/// # Errors
///
/// Returns [`ConfigError::Yaml`] or [`ConfigError::Validation`].
pub fn parse_config(contents: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_yaml::from_str(contents)?;
    validate_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_example_config() {
        // The example config should load and validate successfully
        let config = load_config("config.example.yaml");
        assert!(
            config.is_ok(),
            "Failed to load example config: {:?}",
            config.err()
        );
        let config = config.unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.max_body_bytes, 1024 * 1024);
        assert_eq!(config.features.log_level, "INFO");
        assert!(!config.directory.users.is_empty());
        let seeds = config.directory.seed_users().unwrap();
        assert!(seeds.iter().all(|(_, keys)| !keys.is_empty()));
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.base_path, "");
        assert_eq!(config.server.runtime_worker_threads, None);
        assert_eq!(config.features.log_format, LogFormat::Text);
        assert!(config.directory.users.is_empty());
    }

    #[test]
    fn test_log_format_serde() {
        let config = parse_config("features:\n  log_format: json\n").unwrap();
        assert_eq!(config.features.log_format, LogFormat::Json);
        assert!(parse_config("features:\n  log_format: xml\n").is_err());
    }

    #[test]
    fn test_seed_users_parse_creation_time() {
        let config = parse_config(
            r#"
directory:
  users:
    - user_id: alice@example.com
      keys:
        - app_id: gmail
          key: a2V5
          creation_time: "2015-05-18T23:58:36.000Z"
"#,
        )
        .unwrap();
        let seeds = config.directory.seed_users().unwrap();
        assert_eq!(seeds.len(), 1);
        assert_eq!(
            seeds[0].1[0].creation_time,
            Some(Timestamp {
                seconds: 1_431_993_516,
                nanos: 0,
            })
        );
    }
}
