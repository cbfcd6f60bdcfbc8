// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Password policy for the Latchkey vault.
//!
//! Provides the default [`PasswordStrength`](latchkey_core::PasswordStrength)
//! oracle consulted before a master password is accepted at initialization
//! and at rotation.

pub mod strength;

pub use strength::{ZxcvbnEstimator, MIN_OK_SCORE};
