// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge.
//!
//! Deserialization errors are turned into diagnostics that name the TOML
//! table they occurred in, point at the offending line when the source file
//! is known, and suggest the closest valid key for typos. Values with a
//! Herald-specific shape (intervals in seconds, cron schedules, month
//! counts) get a concrete example in the help text.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity score to suggest a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error with rich diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key that no struct in the named table accepts.
    #[error("unknown key `{key}` in {}", describe_table(table))]
    #[diagnostic(
        code(herald::config::unknown_key),
        help("{}", format_unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        /// The unrecognized key name.
        key: String,
        /// Dotted table path, empty for the document root.
        table: String,
        /// Closest valid key, if one is similar enough.
        suggestion: Option<String>,
        /// Keys the table accepts, comma separated.
        valid_keys: String,
        /// Where the key appears in the source file.
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        /// The file the key was read from.
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value that does not deserialize into the expected type.
    #[error("invalid type for `{key}`: {detail}")]
    #[diagnostic(code(herald::config::invalid_type), help("{hint}"))]
    InvalidType {
        /// Full dotted key, e.g. `push.flush_interval_secs`.
        key: String,
        /// Found-versus-expected summary from the deserializer.
        detail: String,
        /// What to write instead.
        hint: String,
        /// Where the key appears in the source file.
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        /// The file the key was read from.
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A required key is absent.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(herald::config::missing_key),
        help("add `{key} = <value>` to your herald.toml")
    )]
    MissingKey {
        /// The missing key, dotted when nested.
        key: String,
    },

    /// A value that parsed but breaks a semantic rule (see `validation`).
    #[error("validation error: {message}")]
    #[diagnostic(code(herald::config::validation))]
    Validation { message: String },

    /// Anything figment reports that the variants above do not cover.
    #[error("configuration error: {0}")]
    #[diagnostic(code(herald::config::other))]
    Other(String),
}

fn describe_table(table: &str) -> String {
    if table.is_empty() {
        "the top level".to_string()
    } else {
        format!("[{table}]")
    }
}

fn format_unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Help text for a wrongly typed value, with an example for known key shapes.
pub fn type_hint(key: &str, expected: &str) -> String {
    let leaf = key.rsplit('.').next().unwrap_or(key);
    match leaf {
        k if k.ends_with("_secs") => {
            format!("expected {expected}: a whole number of seconds, e.g. `{k} = 14400`")
        }
        "schedule" => format!(
            "expected {expected}: a 6-field cron string with seconds, e.g. `schedule = \"0 0 9 * * *\"`"
        ),
        "history_keep_months" => {
            format!("expected {expected}: a month count of at least 1, e.g. `history_keep_months = 12`")
        }
        "receivers" => format!("expected {expected}: a list of names, e.g. `receivers = [\"default\"]`"),
        "mode" => format!("expected {expected}: `\"now\"` or `\"delayed\"`"),
        _ => format!("expected {expected}"),
    }
}

/// Dotted table path from a figment error path, with array indices dropped.
fn table_path(segments: &[String]) -> String {
    segments
        .iter()
        .filter(|s| s.parse::<usize>().is_err())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(".")
}

/// Convert a `figment::Error` (which may hold several errors) into diagnostics.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    let mut errors = Vec::new();

    for error in err {
        let path: Vec<String> = error.path.iter().map(|s| s.to_string()).collect();
        let config_error = match &error.kind {
            Kind::UnknownField(field, expected) => {
                let valid_keys: Vec<&str> = expected.to_vec();
                let table = table_path(&path);
                let (span, src) = locate(&error, &table, field, toml_sources);

                ConfigError::UnknownKey {
                    key: field.clone(),
                    suggestion: suggest_key(field, &valid_keys),
                    table,
                    valid_keys: valid_keys.join(", "),
                    span,
                    src,
                }
            }
            Kind::MissingField(field) => {
                let table = table_path(&path);
                let key = if table.is_empty() {
                    field.to_string()
                } else {
                    format!("{table}.{field}")
                };
                ConfigError::MissingKey { key }
            }
            Kind::InvalidType(actual, expected) => {
                let (table, leaf) = match path.split_last() {
                    Some((leaf, parents)) => (table_path(parents), leaf.clone()),
                    None => (String::new(), String::new()),
                };
                let key = if table.is_empty() {
                    leaf.clone()
                } else {
                    format!("{table}.{leaf}")
                };
                let (span, src) = locate(&error, &table, &leaf, toml_sources);
                let expected = expected.to_string();

                ConfigError::InvalidType {
                    detail: format!("found {actual}, expected {expected}"),
                    hint: type_hint(&key, &expected),
                    key,
                    span,
                    src,
                }
            }
            _ => ConfigError::Other(format!("{error}")),
        };

        errors.push(config_error);
    }

    errors
}

/// Source file and span of `field` under `table`, when the file is known.
fn locate(
    error: &figment::error::Error,
    table: &str,
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    if field.is_empty() {
        return (None, None);
    }

    let source_path = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    // Inline strings carry no file path; use the single source if that is all there is.
    let source = match source_path {
        Some(path) => toml_sources.iter().find(|(p, _)| *p == path),
        None if toml_sources.len() == 1 => toml_sources.first(),
        None => None,
    };

    source
        .and_then(|(path, content)| {
            find_key_offset(content, table, field).map(|offset| {
                (
                    Some(SourceSpan::new(offset.into(), field.len())),
                    Some(NamedSource::new(path, content.clone())),
                )
            })
        })
        .unwrap_or((None, None))
}

/// Byte offset of `field` inside the TOML table `table` (dotted, empty for
/// the root). Both `[table]` and `[[table]]` headers are recognized; root
/// keys are only searched before the first header.
pub fn find_key_offset(content: &str, table: &str, field: &str) -> Option<usize> {
    let start = if table.is_empty() {
        0
    } else {
        let array_header = format!("[[{table}]]");
        let header = format!("[{table}]");
        content
            .find(&array_header)
            .map(|pos| pos + array_header.len())
            .or_else(|| content.find(&header).map(|pos| pos + header.len()))?
    };

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') && (table.is_empty() || offset > start) {
            return None;
        }
        if let Some(after) = trimmed.strip_prefix(field)
            && after.trim_start().starts_with('=')
        {
            return Some(offset + (line.len() - trimmed.len()));
        }
        offset += line.len();
    }

    None
}

/// Best valid key above the Jaro-Winkler threshold, if any.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|&key| (strsim::jaro_winkler(unknown, key), key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Render diagnostics to stderr using miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        let diagnostic: &dyn Diagnostic = error;
        if handler.render_report(&mut buf, diagnostic).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}
