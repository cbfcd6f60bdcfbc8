// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits consumed by the vault engine.
//!
//! The engine never talks to SQLite or a strength heuristic directly; it
//! goes through these seams so each can be swapped or mocked in tests.

pub mod storage;
pub mod strength;

pub use storage::{TransactionFn, VaultStore, VaultTransaction};
pub use strength::PasswordStrength;
