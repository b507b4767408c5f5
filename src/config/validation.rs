use crate::config::types::{Config, StorageConfig};
use crate::ConfigError;

/// Upper bound for `busy-timeout-ms` (ten minutes)
pub const MAX_BUSY_TIMEOUT_MS: u64 = 600_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.database_path.contains('\0') {
        return Err(ConfigError::Validation(
            "database_path cannot contain NUL bytes".to_string(),
        ));
    }

    if config.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
        return Err(ConfigError::Validation(format!(
            "busy_timeout_ms must be <= {}ms, got {}ms",
            MAX_BUSY_TIMEOUT_MS, config.busy_timeout_ms
        )));
    }

    Ok(())
}
