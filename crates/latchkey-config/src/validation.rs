// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as power-of-two KDF costs, non-zero windows, and ordered delay bounds.

use crate::diagnostic::ConfigError;
use crate::model::LatchkeyConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &LatchkeyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // KDF parameters
    if config.kdf.n < 2 || !config.kdf.n.is_power_of_two() {
        errors.push(ConfigError::Validation {
            message: format!(
                "kdf.n must be a power of two and at least 2, got {}",
                config.kdf.n
            ),
        });
    }

    if config.kdf.r < 1 {
        errors.push(ConfigError::Validation {
            message: format!("kdf.r must be at least 1, got {}", config.kdf.r),
        });
    }

    if config.kdf.p < 1 {
        errors.push(ConfigError::Validation {
            message: format!("kdf.p must be at least 1, got {}", config.kdf.p),
        });
    }

    if config.session.idle_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "session.idle_timeout_secs must be greater than 0".to_string(),
        });
    }

    if config.rate_limit.window_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "rate_limit.window_secs must be greater than 0".to_string(),
        });
    }

    if config.rate_limit.max_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "rate_limit.max_attempts must be greater than 0".to_string(),
        });
    }

    if config.backoff.base_delay_ms > config.backoff.max_delay_ms {
        errors.push(ConfigError::Validation {
            message: format!(
                "backoff.base_delay_ms ({}) must not exceed backoff.max_delay_ms ({})",
                config.backoff.base_delay_ms, config.backoff.max_delay_ms
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if !LOG_LEVELS.contains(&config.log.level.to_ascii_lowercase().as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "log.level `{}` is not one of: {}",
                config.log.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&LatchkeyConfig::default()).is_ok());
    }

    #[test]
    fn non_power_of_two_kdf_n_is_rejected() {
        let mut config = LatchkeyConfig::default();
        config.kdf.n = 10_000;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("kdf.n"));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = LatchkeyConfig::default();
        config.kdf.r = 0;
        config.session.idle_timeout_secs = 0;
        config.rate_limit.max_attempts = 0;
        config.backoff.base_delay_ms = 5000;
        config.storage.database_path = "  ".to_string();
        config.log.level = "verbose".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 6);
    }

    #[test]
    fn log_level_is_case_insensitive() {
        let mut config = LatchkeyConfig::default();
        config.log.level = "DEBUG".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
