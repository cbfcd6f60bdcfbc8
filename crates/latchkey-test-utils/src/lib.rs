// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Latchkey integration tests.
//!
//! [`TestVault`] assembles a complete [`VaultService`](latchkey_vault::VaultService)
//! over a temp SQLite database, cheap KDF parameters, a manual clock and
//! millisecond backoff delays, so vault flows run fast and deterministically.

pub mod harness;

pub use harness::{secret, TestVault, TestVaultBuilder, TEST_PASSWORD};
