// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Versioned AES-256-GCM envelope codec.
//!
//! An envelope is `"v1:<base64url(nonce)>:<base64url(ciphertext || tag)>"`.
//! Every call to [`encrypt`] draws a fresh random 96-bit nonce from the system
//! CSPRNG. Nonce reuse under one key would be catastrophic for GCM security.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use latchkey_core::LatchkeyError;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

use crate::secret::MasterKey;

/// Current envelope format tag.
pub const ENVELOPE_VERSION: &str = "v1";

const SEPARATOR: char = ':';

/// Plaintext sealed into the verify blob.
const VERIFY_SENTINEL: &[u8] = b"vault-check";

/// Associated data reserved for vault metadata. Never produced by
/// [`record_aad`], which always starts with `item:`.
const VERIFY_AAD: &[u8] = b"meta";

/// Associated data binding a record's ciphertext to its declared type.
pub fn record_aad(record_type: &str) -> Vec<u8> {
    format!("item:{record_type}").into_bytes()
}

fn aead_key(key: &MasterKey) -> Result<LessSafeKey, LatchkeyError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key.as_bytes())
        .map_err(|_| LatchkeyError::Crypto("failed to create AES-256-GCM key".to_string()))?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt `plaintext`, binding `associated_data` as integrity-only context.
pub fn encrypt(
    key: &MasterKey,
    plaintext: &[u8],
    associated_data: &[u8],
) -> Result<String, LatchkeyError> {
    let sealing = aead_key(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce_bytes)
        .map_err(|_| LatchkeyError::Crypto("failed to generate random nonce".to_string()))?;
    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    let mut in_out = plaintext.to_vec();
    sealing
        .seal_in_place_append_tag(nonce, Aad::from(associated_data), &mut in_out)
        .map_err(|_| LatchkeyError::Crypto("AES-256-GCM encryption failed".to_string()))?;

    Ok(format!(
        "{ENVELOPE_VERSION}{SEPARATOR}{}{SEPARATOR}{}",
        URL_SAFE.encode(nonce_bytes),
        URL_SAFE.encode(&in_out)
    ))
}

/// Decrypt an envelope produced by [`encrypt`].
///
/// Fails with [`LatchkeyError::MalformedEnvelope`] unless the envelope has
/// exactly three well-formed parts, [`LatchkeyError::UnsupportedVersion`] for
/// an unknown version tag, and [`LatchkeyError::AuthenticationFailed`] for a
/// wrong key, tampered bytes, or mismatched associated data.
pub fn decrypt(
    key: &MasterKey,
    envelope: &str,
    associated_data: &[u8],
) -> Result<Zeroizing<Vec<u8>>, LatchkeyError> {
    let parts: Vec<&str> = envelope.split(SEPARATOR).collect();
    let [version, nonce_b64, ciphertext_b64] = parts.as_slice() else {
        return Err(LatchkeyError::MalformedEnvelope(format!(
            "expected 3 parts, found {}",
            parts.len()
        )));
    };

    if *version != ENVELOPE_VERSION {
        return Err(LatchkeyError::UnsupportedVersion(version.to_string()));
    }

    let nonce_vec = URL_SAFE
        .decode(nonce_b64)
        .map_err(|_| LatchkeyError::MalformedEnvelope("nonce is not valid base64".to_string()))?;
    let nonce_bytes: [u8; NONCE_LEN] = nonce_vec.try_into().map_err(|v: Vec<u8>| {
        LatchkeyError::MalformedEnvelope(format!(
            "nonce must be {NONCE_LEN} bytes, found {}",
            v.len()
        ))
    })?;
    let mut in_out = Zeroizing::new(URL_SAFE.decode(ciphertext_b64).map_err(|_| {
        LatchkeyError::MalformedEnvelope("ciphertext is not valid base64".to_string())
    })?);

    let opening = aead_key(key)?;
    let plaintext_len = opening
        .open_in_place(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::from(associated_data),
            &mut in_out,
        )
        .map_err(|_| LatchkeyError::AuthenticationFailed)?
        .len();

    in_out.truncate(plaintext_len);
    Ok(in_out)
}

/// Seal the fixed sentinel so a candidate key can later be checked.
pub fn make_verify_blob(key: &MasterKey) -> Result<String, LatchkeyError> {
    encrypt(key, VERIFY_SENTINEL, VERIFY_AAD)
}

/// True only if `blob` opens under `key` and holds the sentinel. Never errors.
pub fn check_verify_blob(key: &MasterKey, blob: &str) -> bool {
    decrypt(key, blob, VERIFY_AAD)
        .map(|plaintext| plaintext.as_slice() == VERIFY_SENTINEL)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use proptest::prelude::*;

    fn key(byte: u8) -> MasterKey {
        MasterKey::new([byte; 32])
    }

    fn split(envelope: &str) -> (Vec<u8>, Vec<u8>) {
        let parts: Vec<&str> = envelope.split(':').collect();
        (
            URL_SAFE.decode(parts[1]).unwrap(),
            URL_SAFE.decode(parts[2]).unwrap(),
        )
    }

    fn join(nonce: &[u8], ciphertext: &[u8]) -> String {
        format!("v1:{}:{}", URL_SAFE.encode(nonce), URL_SAFE.encode(ciphertext))
    }

    #[test]
    fn envelope_has_three_parts_and_version_tag() {
        let envelope = encrypt(&key(1), b"hello", b"item:note").unwrap();
        let parts: Vec<&str> = envelope.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "v1");

        let (nonce, ciphertext) = split(&envelope);
        assert_eq!(nonce.len(), 12);
        // 16-byte GCM tag.
        assert_eq!(ciphertext.len(), 5 + 16);
    }

    #[test]
    fn empty_plaintext_round_trips() {
        let envelope = encrypt(&key(1), b"", b"").unwrap();
        assert!(decrypt(&key(1), &envelope, b"").unwrap().is_empty());
    }

    #[test]
    fn wrong_part_count_is_malformed() {
        for envelope in ["", "v1", "v1:abc", "v1:a:b:c"] {
            let err = decrypt(&key(1), envelope, b"").unwrap_err();
            assert!(
                matches!(err, LatchkeyError::MalformedEnvelope(_)),
                "{envelope:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn unknown_version_is_unsupported() {
        let envelope = encrypt(&key(1), b"x", b"").unwrap().replacen("v1", "v2", 1);
        let err = decrypt(&key(1), &envelope, b"").unwrap_err();
        assert!(matches!(err, LatchkeyError::UnsupportedVersion(v) if v == "v2"));
    }

    #[test]
    fn bad_base64_and_short_nonce_are_malformed() {
        let err = decrypt(&key(1), "v1:!!!:AAAA", b"").unwrap_err();
        assert!(matches!(err, LatchkeyError::MalformedEnvelope(_)));

        let short_nonce = join(&[0u8; 8], &[0u8; 32]);
        let err = decrypt(&key(1), &short_nonce, b"").unwrap_err();
        assert!(matches!(err, LatchkeyError::MalformedEnvelope(_)));
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let envelope = encrypt(&key(1), b"secret", b"item:web").unwrap();
        let err = decrypt(&key(2), &envelope, b"item:web").unwrap_err();
        assert!(matches!(err, LatchkeyError::AuthenticationFailed));
    }

    #[test]
    fn relabelled_record_type_fails_authentication() {
        let envelope = encrypt(&key(1), b"secret", &record_aad("web")).unwrap();
        let err = decrypt(&key(1), &envelope, &record_aad("note")).unwrap_err();
        assert!(matches!(err, LatchkeyError::AuthenticationFailed));
    }

    #[test]
    fn truncated_ciphertext_fails_authentication() {
        let envelope = encrypt(&key(1), b"secret", b"").unwrap();
        let (nonce, _) = split(&envelope);
        let err = decrypt(&key(1), &join(&nonce, &[1, 2, 3]), b"").unwrap_err();
        assert!(matches!(err, LatchkeyError::AuthenticationFailed));
    }

    #[test]
    fn errors_never_include_plaintext() {
        let envelope = encrypt(&key(1), b"hunter2-plaintext", b"").unwrap();
        let err = decrypt(&key(2), &envelope, b"").unwrap_err();
        assert!(!err.to_string().contains("hunter2"));
    }

    #[test]
    fn verify_blob_accepts_only_its_key() {
        let blob = make_verify_blob(&key(7)).unwrap();
        assert!(check_verify_blob(&key(7), &blob));
        assert!(!check_verify_blob(&key(8), &blob));
        assert!(!check_verify_blob(&key(7), "garbage"));
        assert!(!check_verify_blob(&key(7), ""));
    }

    #[test]
    fn record_envelope_is_not_a_verify_blob() {
        let envelope = encrypt(&key(7), VERIFY_SENTINEL, &record_aad("note")).unwrap();
        assert!(!check_verify_blob(&key(7), &envelope));
    }

    #[test]
    fn nonces_do_not_repeat_across_ten_thousand_encryptions() {
        let k = key(3);
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let envelope = encrypt(&k, b"same plaintext", b"").unwrap();
            let nonce = envelope.split(':').nth(1).unwrap().to_string();
            assert!(seen.insert(nonce), "nonce repeated");
        }
    }

    proptest! {
        #[test]
        fn round_trip(
            key_bytes in any::<[u8; 32]>(),
            plaintext in proptest::collection::vec(any::<u8>(), 0..512),
            aad in proptest::collection::vec(any::<u8>(), 0..64),
        ) {
            let k = MasterKey::new(key_bytes);
            let envelope = encrypt(&k, &plaintext, &aad).unwrap();
            let opened = decrypt(&k, &envelope, &aad).unwrap();
            prop_assert_eq!(opened.as_slice(), plaintext.as_slice());
        }

        #[test]
        fn flipping_a_ciphertext_bit_fails_authentication(
            plaintext in proptest::collection::vec(any::<u8>(), 0..128),
            index in any::<proptest::sample::Index>(),
            bit in 0u8..8,
        ) {
            let k = key(9);
            let envelope = encrypt(&k, &plaintext, b"item:note").unwrap();
            let (nonce, mut ciphertext) = split(&envelope);
            let i = index.index(ciphertext.len());
            ciphertext[i] ^= 1 << bit;
            let err = decrypt(&k, &join(&nonce, &ciphertext), b"item:note").unwrap_err();
            prop_assert!(matches!(err, LatchkeyError::AuthenticationFailed));
        }

        #[test]
        fn flipping_a_nonce_bit_fails_authentication(
            index in 0usize..12,
            bit in 0u8..8,
        ) {
            let k = key(9);
            let envelope = encrypt(&k, b"payload", b"item:note").unwrap();
            let (mut nonce, ciphertext) = split(&envelope);
            nonce[index] ^= 1 << bit;
            let err = decrypt(&k, &join(&nonce, &ciphertext), b"item:note").unwrap_err();
            prop_assert!(matches!(err, LatchkeyError::AuthenticationFailed));
        }

        #[test]
        fn flipping_an_aad_bit_fails_authentication(
            aad in proptest::collection::vec(any::<u8>(), 1..32),
            index in any::<proptest::sample::Index>(),
            bit in 0u8..8,
        ) {
            let k = key(9);
            let envelope = encrypt(&k, b"payload", &aad).unwrap();
            let mut tampered = aad.clone();
            let i = index.index(tampered.len());
            tampered[i] ^= 1 << bit;
            let err = decrypt(&k, &envelope, &tampered).unwrap_err();
            prop_assert!(matches!(err, LatchkeyError::AuthenticationFailed));
        }
    }
}
