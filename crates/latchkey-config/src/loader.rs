// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./latchkey.toml` > `~/.config/latchkey/latchkey.toml` > `/etc/latchkey/latchkey.toml`
//! with environment variable overrides via `LATCHKEY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::LatchkeyConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/latchkey/latchkey.toml";

/// Config file in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "latchkey.toml";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/latchkey/latchkey.toml` (system-wide)
/// 3. `~/.config/latchkey/latchkey.toml` (user XDG config)
/// 4. `./latchkey.toml` (local directory)
/// 5. `LATCHKEY_*` environment variables
pub fn load_config() -> Result<LatchkeyConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<LatchkeyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LatchkeyConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<LatchkeyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LatchkeyConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(LatchkeyConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// `~/.config/latchkey/latchkey.toml`, if the platform has a config dir.
pub fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("latchkey").join(LOCAL_CONFIG_FILE))
}

/// Top-level config sections. None is a prefix of another.
const SECTIONS: &[&str] = &["rate_limit", "session", "backoff", "storage", "kdf", "log"];

/// Map an env key (already stripped of `LATCHKEY_`) to a dotted config path.
///
/// Section names contain underscores, so `Env::split("_")` cannot be used:
/// `RATE_LIMIT_MAX_ATTEMPTS` must become `rate_limit.max_attempts`. Only a
/// leading section name is rewritten; keys with no known section pass
/// through lowercased and are rejected by `deny_unknown_fields`.
pub(crate) fn env_key_to_path(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    SECTIONS
        .iter()
        .find_map(|section| {
            key.strip_prefix(section)
                .and_then(|rest| rest.strip_prefix('_'))
                .filter(|field| !field.is_empty())
                .map(|field| format!("{section}.{field}"))
        })
        .unwrap_or(key)
}

/// `LATCHKEY_*` provider. `LATCHKEY_MASTER_PASSWORD` is read by the
/// passphrase prompt, not here.
fn env_provider() -> Env {
    Env::prefixed("LATCHKEY_")
        .ignore(&["master_password"])
        .map(|key| env_key_to_path(key.as_str()).into())
}
