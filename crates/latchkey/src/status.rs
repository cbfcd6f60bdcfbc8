// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `latchkey status` command implementation.

use std::io::IsTerminal;

use latchkey_config::model::LatchkeyConfig;
use latchkey_core::LatchkeyError;
use serde::Serialize;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub initialized: bool,
    pub database_path: String,
}

/// Run the `latchkey status` command.
///
/// If `--json` is passed, outputs structured JSON for scripting.
/// If `--plain` is passed or stdout is not a TTY, disables colors.
pub async fn run_status(
    config: &LatchkeyConfig,
    json: bool,
    plain: bool,
) -> Result<(), LatchkeyError> {
    let (store, service) = crate::open_vault(config).await?;
    let status = service.status().await?;
    crate::close_vault(store, service).await?;

    let response = StatusResponse {
        initialized: status.initialized,
        database_path: config.storage.database_path.clone(),
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&response).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print!("{}", render_status(&response, use_color));
    }
    Ok(())
}

fn render_status(response: &StatusResponse, use_color: bool) -> String {
    use colored::Colorize;

    let mut out = String::new();
    out.push('\n');
    out.push_str("  latchkey status\n");
    out.push_str(&format!("  {}\n", "-".repeat(35)));

    let state = match (response.initialized, use_color) {
        (true, true) => format!("{} {}", "✓".green(), "initialized".green()),
        (true, false) => "[OK] initialized".to_string(),
        (false, true) => format!("{} {}", "✗".yellow(), "not initialized".yellow()),
        (false, false) => "[--] not initialized".to_string(),
    };
    out.push_str(&format!("    Vault:    {state}\n"));
    out.push_str(&format!("    Database: {}\n", response.database_path));

    if !response.initialized {
        out.push_str("\n  Create one with: latchkey init\n");
    }
    out.push('\n');
    out
}
