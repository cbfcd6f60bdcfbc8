// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Password-strength oracle.

use crate::types::StrengthReport;

/// Judges whether a candidate master password is acceptable.
///
/// The vault treats `ok == false` as a hard rejection and surfaces the
/// report's feedback to the caller.
pub trait PasswordStrength: Send + Sync {
    fn evaluate(&self, password: &str) -> StrengthReport;
}
