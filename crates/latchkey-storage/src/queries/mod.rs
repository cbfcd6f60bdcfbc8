// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for CRUD operations on storage entities.
//!
//! Each module exposes synchronous helpers over a `rusqlite::Connection` so
//! the same SQL runs both standalone and inside a rotation transaction.

pub mod metadata;
pub mod record_types;
pub mod records;
