// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `latchkey shell` command implementation.
//!
//! Launches an interactive REPL with a colored prompt and readline history.
//! The session token lives only in this process; quitting locks the vault.

use colored::Colorize;
use latchkey_config::model::LatchkeyConfig;
use latchkey_core::LatchkeyError;
use latchkey_vault::{ItemView, VaultService};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

const HELP: &str = "\
commands:
  unlock                 unlock the vault with the master password
  lock                   end the current session
  add <type> <title>     store a new record (payload is prompted as JSON)
  list                   list records, most recently updated first
  get <id>               show a record's payload
  edit <id> [title]      replace a record's payload (and title)
  rm <id>                delete a record
  types                  list known record types
  passwd                 change the master password
  quit                   lock and exit";

/// A parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ShellCommand {
    Unlock,
    Lock,
    Add { record_type: String, title: String },
    List,
    Get { id: String },
    Edit { id: String, title: Option<String> },
    Remove { id: String },
    Types,
    Passwd,
    Help,
    Quit,
}

/// Parse one input line. The error is a usage message for the user.
fn parse_command(line: &str) -> Result<ShellCommand, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let single_arg = |usage: &str| -> Result<String, String> {
        match rest.split_whitespace().collect::<Vec<_>>().as_slice() {
            [id] => Ok((*id).to_string()),
            _ => Err(format!("usage: {usage}")),
        }
    };

    match verb.to_ascii_lowercase().as_str() {
        "unlock" => Ok(ShellCommand::Unlock),
        "lock" => Ok(ShellCommand::Lock),
        "list" | "ls" => Ok(ShellCommand::List),
        "types" => Ok(ShellCommand::Types),
        "passwd" => Ok(ShellCommand::Passwd),
        "help" | "?" => Ok(ShellCommand::Help),
        "quit" | "exit" | "/quit" | "/exit" => Ok(ShellCommand::Quit),
        "add" => match rest.split_once(char::is_whitespace) {
            Some((record_type, title)) if !title.trim().is_empty() => Ok(ShellCommand::Add {
                record_type: record_type.to_string(),
                title: title.trim().to_string(),
            }),
            _ => Err("usage: add <type> <title>".to_string()),
        },
        "get" => single_arg("get <id>").map(|id| ShellCommand::Get { id }),
        "rm" | "delete" => single_arg("rm <id>").map(|id| ShellCommand::Remove { id }),
        "edit" => {
            if rest.is_empty() {
                return Err("usage: edit <id> [title]".to_string());
            }
            let (id, title) = match rest.split_once(char::is_whitespace) {
                Some((id, title)) => (id, Some(title.trim().to_string())),
                None => (rest, None),
            };
            Ok(ShellCommand::Edit {
                id: id.to_string(),
                title,
            })
        }
        other => Err(format!("unknown command `{other}`, type `help`")),
    }
}

/// Where the shell reads follow-up input from.
trait ShellInput {
    fn line(&mut self, prompt: &str) -> Result<String, LatchkeyError>;

    fn secret(&mut self, label: &str) -> Result<SecretString, LatchkeyError>;

    fn master_password(&mut self) -> Result<SecretString, LatchkeyError> {
        self.secret("Master password")
    }
}

struct Terminal {
    editor: DefaultEditor,
}

impl ShellInput for Terminal {
    fn line(&mut self, prompt: &str) -> Result<String, LatchkeyError> {
        self.editor
            .readline(prompt)
            .map_err(|e| LatchkeyError::InvalidInput(format!("input aborted: {e}")))
    }

    fn secret(&mut self, label: &str) -> Result<SecretString, LatchkeyError> {
        latchkey_vault::prompt_secret(label)
    }

    fn master_password(&mut self) -> Result<SecretString, LatchkeyError> {
        latchkey_vault::master_password()
    }
}

enum Flow {
    Continue,
    Quit,
}

/// REPL state: the service and the current session token, if unlocked.
struct Shell<'a> {
    service: &'a VaultService,
    token: Option<String>,
}

impl<'a> Shell<'a> {
    fn new(service: &'a VaultService) -> Self {
        Self {
            service,
            token: None,
        }
    }

    fn token(&self) -> Result<&str, LatchkeyError> {
        self.token.as_deref().ok_or(LatchkeyError::Unauthorized)
    }

    async fn execute(
        &mut self,
        command: ShellCommand,
        input: &mut dyn ShellInput,
    ) -> Result<Flow, LatchkeyError> {
        match command {
            ShellCommand::Unlock => {
                let password = input.master_password()?;
                let token = self.service.unlock(&password).await?;
                if let Some(previous) = self.token.replace(token) {
                    self.service.lock(&previous);
                }
                println!("{}", "unlocked".green());
            }
            ShellCommand::Lock => {
                match self.token.take() {
                    Some(token) => {
                        self.service.lock(&token);
                        println!("{}", "locked".yellow());
                    }
                    None => println!("{}", "already locked".dimmed()),
                }
            }
            ShellCommand::Add { record_type, title } => {
                let token = self.token()?.to_string();
                let payload = read_payload(input)?;
                let summary = self
                    .service
                    .create_item(&token, &record_type, &title, &payload)
                    .await?;
                println!("{} {}", "created".green(), summary.id);
            }
            ShellCommand::List => {
                let items = self.service.list_items(self.token()?).await?;
                if items.is_empty() {
                    println!("{}", "no records".dimmed());
                }
                for item in &items {
                    println!("{}", format_item_line(item));
                }
            }
            ShellCommand::Get { id } => {
                let item = self.service.get_item(self.token()?, &id).await?;
                println!("{} ({})", item.title.bold(), item.record_type);
                println!(
                    "{}",
                    serde_json::to_string_pretty(&item.payload).unwrap_or_else(|_| "{}".to_string())
                );
            }
            ShellCommand::Edit { id, title } => {
                let token = self.token()?.to_string();
                let payload = read_payload(input)?;
                let summary = self
                    .service
                    .update_item(&token, &id, title.as_deref(), &payload)
                    .await?;
                println!("{} {}", "updated".green(), summary.id);
            }
            ShellCommand::Remove { id } => {
                self.service.delete_item(self.token()?, &id).await?;
                println!("{} {id}", "deleted".green());
            }
            ShellCommand::Types => {
                for info in self.service.record_types().await? {
                    println!("  {:<8} {}", info.name, info.display_name.dimmed());
                }
            }
            ShellCommand::Passwd => {
                let token = self.token()?.to_string();
                let current = input.secret("Current master password")?;
                let new = input.secret("New master password")?;
                let confirm = input.secret("Confirm new master password")?;
                if new.expose_secret() != confirm.expose_secret() {
                    return Err(LatchkeyError::InvalidInput(
                        "passwords do not match".to_string(),
                    ));
                }
                let report = self.service.change_password(&token, &current, &new).await?;
                self.token = None;
                println!(
                    "{} {} records re-encrypted; unlock again with the new password",
                    "master password changed:".green(),
                    report.records
                );
            }
            ShellCommand::Help => println!("{HELP}"),
            ShellCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Report a failed command, dropping the token when the session is gone.
    fn report(&mut self, err: &LatchkeyError) {
        match err {
            LatchkeyError::Unauthorized => {
                self.token = None;
                eprintln!("{}", "vault is locked; run `unlock`".yellow());
            }
            LatchkeyError::RateLimited { retry_after } => {
                eprintln!(
                    "{}: too many attempts, retry in {}s",
                    "error".red(),
                    retry_after.as_secs().max(1)
                );
            }
            LatchkeyError::WeakPassword {
                warning,
                suggestions,
                ..
            } => {
                eprintln!("{}: {err}", "error".red());
                print_strength_hints(warning.as_deref(), suggestions);
            }
            _ => eprintln!("{}: {err}", "error".red()),
        }
    }

    fn close(&mut self) {
        if let Some(token) = self.token.take() {
            self.service.lock(&token);
        }
    }
}

/// Read a JSON object payload from the user.
fn read_payload(input: &mut dyn ShellInput) -> Result<Value, LatchkeyError> {
    let raw = input.line("payload (JSON)> ")?;
    let payload: Value = serde_json::from_str(raw.trim())
        .map_err(|e| LatchkeyError::InvalidInput(format!("payload is not valid JSON: {e}")))?;
    if !payload.is_object() {
        return Err(LatchkeyError::InvalidInput(
            "payload must be a JSON object".to_string(),
        ));
    }
    Ok(payload)
}

fn format_item_line(item: &ItemView) -> String {
    match item {
        ItemView::Decrypted(item) => {
            format!("  {}  {:<6} {}", item.id, item.record_type, item.title)
        }
        ItemView::Unreadable {
            id,
            record_type,
            title,
        } => format!(
            "  {id}  {record_type:<6} {title}  {}",
            "[unreadable]".red()
        ),
    }
}

/// Print the strength oracle's feedback after a rejected password.
pub(crate) fn print_strength_hints(warning: Option<&str>, suggestions: &[String]) {
    if let Some(warning) = warning {
        eprintln!("  {}", warning.yellow());
    }
    for suggestion in suggestions {
        eprintln!("  - {suggestion}");
    }
}

/// Runs the `latchkey shell` interactive REPL.
pub async fn run_shell(config: &LatchkeyConfig) -> Result<(), LatchkeyError> {
    let (store, service) = crate::open_vault(config).await?;
    if !service.status().await?.initialized {
        crate::close_vault(store, service).await?;
        return Err(LatchkeyError::NotInitialized);
    }

    let editor = DefaultEditor::new()
        .map_err(|e| LatchkeyError::Internal(format!("failed to initialize readline: {e}")))?;
    let mut terminal = Terminal { editor };
    let mut shell = Shell::new(&service);

    println!("{}", "latchkey shell".bold().green());
    println!("Type {} for commands, {} to exit.\n", "help".yellow(), "quit".yellow());

    loop {
        let prompt = if shell.token.is_some() {
            format!("{}> ", "latchkey".green())
        } else {
            format!("{}> ", "latchkey (locked)".yellow())
        };

        match terminal.editor.readline(&prompt) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = terminal.editor.add_history_entry(&line);

                let command = match parse_command(&line) {
                    Ok(command) => command,
                    Err(usage) => {
                        eprintln!("{}", usage.yellow());
                        continue;
                    }
                };
                match shell.execute(command, &mut terminal).await {
                    Ok(Flow::Quit) => break,
                    Ok(Flow::Continue) => {}
                    Err(e) => shell.report(&e),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    shell.close();
    crate::close_vault(store, service).await?;
    println!("{}", "goodbye".dimmed());
    Ok(())
}
