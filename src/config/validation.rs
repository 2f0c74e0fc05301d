use rustc_hash::FxHashSet;

use super::{AppConfig, ConfigError};

const VALID_LOG_LEVELS: &[&str] = &[
    "TRACE", "DEBUG", "INFO", "WARNING", "WARN", "ERROR", "CRITICAL", "DISABLED",
];

/// Validate the full application config, returning an error if any rule is violated.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when any configuration invariant is violated.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_server_config(config)?;
    validate_log_level(config)?;
    validate_directory(config)?;
    Ok(())
}

fn validation_err(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

fn validate_server_config(config: &AppConfig) -> Result<(), ConfigError> {
    let server = &config.server;
    if server.host.trim().is_empty() {
        return Err(validation_err("server.host cannot be empty"));
    }
    if server.max_body_bytes == 0 {
        return Err(validation_err("server.max_body_bytes must be greater than 0"));
    }
    if let Some(worker_threads) = server.runtime_worker_threads {
        if worker_threads == 0 {
            return Err(validation_err(
                "server.runtime_worker_threads must be greater than 0 when set",
            ));
        }
    }
    if server.base_path.contains(['?', '#', '{', '}']) {
        return Err(validation_err(
            "server.base_path must be a plain path prefix",
        ));
    }
    Ok(())
}

fn validate_log_level(config: &AppConfig) -> Result<(), ConfigError> {
    if !VALID_LOG_LEVELS.contains(&config.features.log_level.to_uppercase().as_str()) {
        return Err(validation_err(format!(
            "log_level must be one of {VALID_LOG_LEVELS:?}"
        )));
    }
    Ok(())
}

fn validate_directory(config: &AppConfig) -> Result<(), ConfigError> {
    let mut seen_users = FxHashSet::default();
    for user in &config.directory.users {
        if user.user_id.trim().is_empty() {
            return Err(validation_err("directory.users contains an empty user_id"));
        }
        if !seen_users.insert(user.user_id.as_str()) {
            return Err(validation_err(format!(
                "directory.users has duplicate user_id '{}'",
                user.user_id
            )));
        }

        let mut seen_apps = FxHashSet::default();
        for key in &user.keys {
            if key.app_id.trim().is_empty() {
                return Err(validation_err(format!(
                    "directory.users['{}'] has a key with an empty app_id",
                    user.user_id
                )));
            }
            if !seen_apps.insert(key.app_id.as_str()) {
                return Err(validation_err(format!(
                    "directory.users['{}'] has duplicate app_id '{}'",
                    user.user_id, key.app_id
                )));
            }
        }
    }
    config.directory.seed_users().map(|_| ())
}
