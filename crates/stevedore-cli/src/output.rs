//! Formatted output helpers for CLI commands.
//!
//! Provides section rules, pluralized counts, secret masking for resolved
//! environments, and YAML/JSON serialization of command results.

use clap::ValueEnum;
use serde::Serialize;
use stevedore_compose::ResolvedDocument;
use stevedore_runbook::invocation::{MASK, is_sensitive_key};

/// Machine-readable output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// YAML document.
    #[default]
    Yaml,
    /// Pretty-printed JSON.
    Json,
}

/// Serializes `value` in the requested format, ending with a newline.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize<T: Serialize>(value: &T, format: Format) -> anyhow::Result<String> {
    let mut text = match format {
        Format::Yaml => serde_yaml::to_string(value)?,
        Format::Json => serde_json::to_string_pretty(value)?,
    };
    if !text.ends_with('\n') {
        text.push('\n');
    }
    Ok(text)
}

/// A horizontal rule as wide as `title`.
#[must_use]
pub fn rule(title: &str) -> String {
    "\u{2550}".repeat(title.chars().count())
}

/// `1 service`, `2 services`.
#[must_use]
pub fn count(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

/// Replaces values of sensitive environment keys with a mask.
pub fn mask_secrets(document: &mut ResolvedDocument) {
    for service in &mut document.services {
        for (key, value) in &mut service.environment {
            if is_sensitive_key(key) {
                MASK.clone_into(value);
            }
        }
    }
}
