// SPDX-FileCopyrightText: 2026 Latchkey Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Config diagnostics rendered through miette.
//!
//! Every section is seeded from compiled defaults, so a Latchkey config can
//! only go wrong in four ways: a key or section that does not exist, an enum
//! value outside its variants (`backoff.scope`), a value of the wrong type,
//! or a value that fails [`validate_config`](crate::validation::validate_config).
//! Errors raised from a TOML file point at the offending line; errors raised
//! from `LATCHKEY_*` variables name the environment as their origin.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity for a "did you mean" hint.
const SUGGESTION_THRESHOLD: f64 = 0.75;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key (or a whole section) the config model does not define.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(latchkey::config::unknown_key),
        help("{}", choices_help(suggestion.as_deref(), "valid keys", valid_keys, origin.as_deref()))
    )]
    UnknownKey {
        /// Dotted path, e.g. `session.idle_timout_secs`.
        key: String,
        suggestion: Option<String>,
        valid_keys: String,
        origin: Option<String>,
        #[label("not a latchkey setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// An enum-valued setting holds a value outside its variants.
    #[error("`{value}` is not a valid value for `{key}`")]
    #[diagnostic(
        code(latchkey::config::unknown_variant),
        help("{}", choices_help(suggestion.as_deref(), "expected one of", allowed, origin.as_deref()))
    )]
    UnknownVariant {
        key: String,
        value: String,
        suggestion: Option<String>,
        allowed: String,
        origin: Option<String>,
        #[label("unsupported value")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value that does not deserialize into the setting's type.
    #[error("invalid type for `{key}`: {detail}")]
    #[diagnostic(
        code(latchkey::config::invalid_type),
        help("{}", origin_help(origin.as_deref()))
    )]
    InvalidType {
        key: String,
        detail: String,
        origin: Option<String>,
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A well-typed value that breaks a semantic rule.
    #[error("validation error: {message}")]
    #[diagnostic(code(latchkey::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(latchkey::config::other))]
    Other(String),
}

fn choices_help(
    suggestion: Option<&str>,
    label: &str,
    choices: &str,
    origin: Option<&str>,
) -> String {
    let mut help = match suggestion {
        Some(s) => format!("did you mean `{s}`? {label}: {choices}"),
        None => format!("{label}: {choices}"),
    };
    if let Some(origin) = origin {
        help.push_str(&format!(" (set by {origin})"));
    }
    help
}

fn origin_help(origin: Option<&str>) -> String {
    match origin {
        Some(origin) => format!("check the value set by {origin}"),
        None => "check the value's type against the documented default".to_string(),
    }
}

/// Where an error points inside a config file, if it came from one.
#[derive(Default)]
struct Location {
    span: Option<SourceSpan>,
    src: Option<NamedSource<String>>,
}

/// Convert a `figment::Error` (possibly several chained errors) into
/// diagnostics. `toml_sources` holds `(path, content)` for every config file
/// that was read, so file-backed errors can carry a span.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let origin = error.metadata.as_ref().map(|m| m.name.to_string());
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let section = error.path.clone();
                    let location = locate(&error, &section, field, toml_sources);
                    ConfigError::UnknownKey {
                        key: dotted(&section, field),
                        suggestion: suggest_key(field, expected),
                        valid_keys: expected.join(", "),
                        origin,
                        span: location.span,
                        src: location.src,
                    }
                }
                Kind::UnknownVariant(value, allowed) => {
                    let (section, key) = split_path(&error.path);
                    let location = locate(&error, section, key, toml_sources);
                    ConfigError::UnknownVariant {
                        key: dotted(section, key),
                        value: value.clone(),
                        suggestion: suggest_key(value, allowed),
                        allowed: allowed.join(", "),
                        origin,
                        span: location.span,
                        src: location.src,
                    }
                }
                Kind::InvalidType(actual, expected) => {
                    let (section, key) = split_path(&error.path);
                    let location = locate(&error, section, key, toml_sources);
                    ConfigError::InvalidType {
                        key: dotted(section, key),
                        detail: format!("found {actual}, expected {expected}"),
                        origin,
                        span: location.span,
                        src: location.src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

fn split_path(path: &[String]) -> (&[String], &str) {
    match path.split_last() {
        Some((key, section)) => (section, key.as_str()),
        None => (path, ""),
    }
}

fn dotted(section: &[String], key: &str) -> String {
    if section.is_empty() {
        key.to_string()
    } else {
        format!("{}.{key}", section.join("."))
    }
}

/// Resolve the span of `key` when the error came from one of the files read.
fn locate(
    error: &figment::Error,
    section: &[String],
    key: &str,
    toml_sources: &[(String, String)],
) -> Location {
    let Some(figment::Source::File(path)) = error.metadata.as_ref().and_then(|m| m.source.as_ref())
    else {
        return Location::default();
    };
    let path = path.display().to_string();
    let Some((name, content)) = toml_sources.iter().find(|(p, _)| *p == path) else {
        return Location::default();
    };

    match find_key_offset(content, section, key) {
        Some(offset) => Location {
            span: Some(SourceSpan::new(offset.into(), key.len())),
            src: Some(NamedSource::new(name, content.clone())),
        },
        None => Location::default(),
    }
}

/// Byte offset of `key = ...` inside the table `section` of `content`.
///
/// An empty `section` means the top level, before any table header. Only
/// assignments are matched, so a key name inside a comment or a value is
/// skipped, and a key of the same name in another table is not confused
/// with this one.
pub fn find_key_offset(content: &str, section: &[String], key: &str) -> Option<usize> {
    if key.is_empty() {
        return None;
    }
    let wanted = section.join(".");
    let mut current = String::new();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();

        if let Some(header) = trimmed.strip_prefix('[') {
            if let Some(end) = header.find(']') {
                current = header[..end].trim().to_string();
            }
        } else if current == wanted {
            let assigns = trimmed
                .strip_prefix(key)
                .is_some_and(|rest| rest.trim_start().starts_with('='));
            if assigns {
                return Some(offset + indent);
            }
        }
        offset += line.len();
    }

    None
}

/// Closest candidate to `unknown` by Jaro-Winkler similarity, if any is close.
pub fn suggest_key(unknown: &str, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .map(|&c| (strsim::jaro_winkler(unknown, c), c))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, c)| c.to_string())
}

/// Print every diagnostic to stderr, preceded by a count.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let noun = if errors.len() == 1 { "error" } else { "errors" };
    eprintln!("latchkey: {} configuration {noun}", errors.len());

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        match handler.render_report(&mut buf, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{buf}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(name: &str) -> Vec<String> {
        vec![name.to_string()]
    }

    #[test]
    fn suggests_closest_key() {
        let valid = &["window_secs", "max_attempts"];
        assert_eq!(
            suggest_key("max_attemps", valid),
            Some("max_attempts".to_string())
        );
        assert_eq!(suggest_key("zzzzzz", &["n", "r", "p"]), None);
    }

    #[test]
    fn suggests_scope_variant() {
        assert_eq!(
            suggest_key("per_callr", &["process", "per_caller"]),
            Some("per_caller".to_string())
        );
    }

    #[test]
    fn offset_is_scoped_to_its_table() {
        let content = "[kdf]\nn = 1024\n\n[session]\n# n = 1\nn = 5\n";
        let offset = find_key_offset(content, &section("session"), "n").unwrap();
        assert_eq!(&content[offset..offset + 5], "n = 5");

        let offset = find_key_offset(content, &section("kdf"), "n").unwrap();
        assert_eq!(&content[offset..offset + 8], "n = 1024");
    }

    #[test]
    fn offset_requires_an_assignment() {
        let content = "[log]\nlevels = \"x\"\n  level= \"debug\"\n";
        let offset = find_key_offset(content, &section("log"), "level").unwrap();
        assert_eq!(&content[offset..offset + 6], "level=");
    }

    #[test]
    fn top_level_offset_stops_at_first_table() {
        let content = "ratelimit = 3\n[kdf]\nratelimit = 4\n";
        assert_eq!(find_key_offset(content, &[], "ratelimit"), Some(0));
        assert!(find_key_offset(content, &section("backoff"), "scope").is_none());
    }

    #[test]
    fn help_mentions_origin() {
        let help = choices_help(
            Some("per_caller"),
            "expected one of",
            "process, per_caller",
            Some("`LATCHKEY_` environment variable(s)"),
        );
        assert!(help.starts_with("did you mean `per_caller`?"));
        assert!(help.ends_with("(set by `LATCHKEY_` environment variable(s))"));
    }
}
