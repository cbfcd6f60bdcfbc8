// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Master-password acquisition via TTY prompt or the LATCHKEY_MASTER_PASSWORD
//! environment variable.

use std::io::IsTerminal;

use latchkey_core::LatchkeyError;
use secrecy::SecretString;

/// The environment variable name for providing the master password.
pub const MASTER_PASSWORD_ENV_VAR: &str = "LATCHKEY_MASTER_PASSWORD";

const NO_PASSWORD: &str =
    "No master password provided. Set LATCHKEY_MASTER_PASSWORD or run interactively.";

fn from_env() -> Option<SecretString> {
    match std::env::var(MASTER_PASSWORD_ENV_VAR) {
        Ok(value) if !value.is_empty() => Some(SecretString::from(value)),
        _ => None,
    }
}

fn read_tty(label: &str) -> Result<String, LatchkeyError> {
    if !std::io::stdin().is_terminal() {
        return Err(LatchkeyError::InvalidInput(NO_PASSWORD.to_string()));
    }
    eprint!("{label}: ");
    rpassword::read_password()
        .map_err(|e| LatchkeyError::Internal(format!("failed to read password: {e}")))
}

/// Prompt on the TTY, ignoring the environment.
pub fn prompt_secret(label: &str) -> Result<SecretString, LatchkeyError> {
    let value = read_tty(label)?;
    if value.is_empty() {
        return Err(LatchkeyError::InvalidInput(
            "empty password not allowed".to_string(),
        ));
    }
    Ok(SecretString::from(value))
}

/// Get the master password from the environment or an interactive prompt.
///
/// Priority:
/// 1. `LATCHKEY_MASTER_PASSWORD` (for scripted use)
/// 2. Interactive TTY prompt via `rpassword`
pub fn master_password() -> Result<SecretString, LatchkeyError> {
    if let Some(password) = from_env() {
        return Ok(password);
    }
    prompt_secret("Master password")
}

/// Get a new master password, prompting twice on a TTY.
///
/// The environment variable does not need confirmation.
pub fn new_master_password() -> Result<SecretString, LatchkeyError> {
    if let Some(password) = from_env() {
        return Ok(password);
    }

    let first = read_tty("New master password")?;
    let second = read_tty("Confirm master password")?;
    if first != second {
        return Err(LatchkeyError::InvalidInput(
            "passwords do not match".to_string(),
        ));
    }
    if first.is_empty() {
        return Err(LatchkeyError::InvalidInput(
            "empty password not allowed".to_string(),
        ));
    }
    Ok(SecretString::from(first))
}
