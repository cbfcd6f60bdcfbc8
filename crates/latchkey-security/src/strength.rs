// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pattern-aware password strength estimation backed by `zxcvbn`.
//!
//! zxcvbn scores a password by the cheapest way to guess it: dictionary
//! words, repeats, sequences, keyboard walks, dates and leetspeak are all
//! matched, so a long run of one character scores as badly as it deserves.

use latchkey_core::{PasswordStrength, StrengthReport};
use tracing::debug;
use zxcvbn::zxcvbn;

/// Lowest score accepted for a master password.
pub const MIN_OK_SCORE: u8 = 3;

/// Default strength oracle.
///
/// Optional user inputs (an account name, the vault's path) are treated as
/// dictionary words so a password built from them scores low.
#[derive(Debug, Clone, Default)]
pub struct ZxcvbnEstimator {
    user_inputs: Vec<String>,
}

impl ZxcvbnEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Penalize passwords containing any of `inputs`.
    pub fn with_user_inputs<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user_inputs: inputs.into_iter().map(Into::into).collect(),
        }
    }
}

impl PasswordStrength for ZxcvbnEstimator {
    fn evaluate(&self, password: &str) -> StrengthReport {
        if password.is_empty() {
            return StrengthReport {
                ok: false,
                score: 0,
                warning: Some("Password is empty".to_string()),
                suggestions: Vec::new(),
            };
        }

        let inputs: Vec<&str> = self.user_inputs.iter().map(String::as_str).collect();
        let estimate = zxcvbn(password, &inputs);
        let score = estimate.score() as u8;
        let ok = score >= MIN_OK_SCORE;
        debug!(score, ok, "password strength evaluated");

        let (warning, suggestions) = match estimate.feedback() {
            Some(feedback) => (
                feedback.warning().map(|w| w.to_string()),
                feedback.suggestions().iter().map(|s| s.to_string()).collect(),
            ),
            None => (None, Vec::new()),
        };

        StrengthReport {
            ok,
            score,
            warning,
            suggestions,
        }
    }
}
