// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key buffer that is overwritten with zeros before it is freed.

use latchkey_core::KEY_LEN;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A derived vault key.
///
/// Every copy (including clones handed out by the session store) zeroizes its
/// own buffer on drop. `Debug` never prints the bytes.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_LEN]);

impl MasterKey {
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Copy a key out of a slice, or `None` if the length is wrong.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() != KEY_LEN {
            return None;
        }
        let mut key = Self::zeroed();
        key.0.copy_from_slice(slice);
        Some(key)
    }

    pub(crate) fn zeroed() -> Self {
        Self([0u8; KEY_LEN])
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    pub(crate) fn as_mut_bytes(&mut self) -> &mut [u8; KEY_LEN] {
        &mut self.0
    }
}

impl AsRef<[u8]> for MasterKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_slice_checks_length() {
        assert!(MasterKey::from_slice(&[0u8; 32]).is_some());
        assert!(MasterKey::from_slice(&[0u8; 16]).is_none());
        assert!(MasterKey::from_slice(&[]).is_none());
    }

    #[test]
    fn debug_is_redacted() {
        let key = MasterKey::new([0xAB; 32]);
        let rendered = format!("{key:?}");
        assert_eq!(rendered, "MasterKey([REDACTED])");
        assert!(!rendered.contains("171"));
    }

    #[test]
    fn zeroize_overwrites_buffer() {
        let mut key = MasterKey::new([0x5A; 32]);
        key.zeroize();
        assert_eq!(key.as_bytes(), &[0u8; 32]);
    }

    #[test]
    fn key_is_zeroized_on_drop() {
        fn assert_zeroize_on_drop<T: ZeroizeOnDrop>() {}
        assert_zeroize_on_drop::<MasterKey>();
    }
}
