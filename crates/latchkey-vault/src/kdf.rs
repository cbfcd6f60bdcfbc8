// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! scrypt key derivation from a master password.
//!
//! Cost parameters come from [`KdfParameters`] and are persisted next to the
//! salt, so a vault keeps deriving with the parameters it was created with.
//! Neither the password nor the derived key is ever logged.

use latchkey_core::{KdfParameters, LatchkeyError, SALT_LEN};
use ring::rand::{SecureRandom, SystemRandom};

use crate::secret::MasterKey;

/// Derive the vault key from `password` and `salt`.
///
/// Deterministic for fixed inputs. Expensive by design; async callers should
/// run it on a blocking thread.
pub fn derive_key(
    password: &[u8],
    salt: &[u8],
    params: &KdfParameters,
) -> Result<MasterKey, LatchkeyError> {
    params.validate()?;
    let scrypt_params = scrypt::Params::new(params.log_n(), params.r, params.p, params.length)
        .map_err(|e| LatchkeyError::Crypto(format!("invalid scrypt parameters: {e}")))?;

    let mut key = MasterKey::zeroed();
    scrypt::scrypt(password, salt, &scrypt_params, key.as_mut_bytes())
        .map_err(|e| LatchkeyError::Crypto(format!("scrypt key derivation failed: {e}")))?;
    Ok(key)
}

/// Generate a random salt.
pub fn generate_salt() -> Result<[u8; SALT_LEN], LatchkeyError> {
    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| LatchkeyError::Crypto("failed to generate random salt".to_string()))?;
    Ok(salt)
}
