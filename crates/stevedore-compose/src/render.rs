//! Canonical text form of a [`ComposeDocument`].
//!
//! Output uses two-space indentation and the list form for every sequence.
//! Literal `$` in environment values is written as `$$`, and scalars the
//! lexer would otherwise trim, truncate or misread are double-quoted, so
//! the output parses back to the same document.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::parser::ast::{ComposeDocument, ServiceDescriptor};

const INDENT: &str = "  ";

/// First characters that cannot start a plain scalar.
const RESERVED_STARTS: [char; 10] = ['"', '\'', '#', '[', '{', '&', '*', '!', '|', '>'];

fn needs_quotes(text: &str) -> bool {
    text.is_empty()
        || text.trim() != text
        || text.starts_with(RESERVED_STARTS)
        || text.contains(" #")
        || text.contains("\t#")
        || text.chars().any(char::is_control)
}

/// Writes `text` as a scalar, double-quoting it when required.
fn scalar(text: &str) -> Cow<'_, str> {
    if !needs_quotes(text) {
        return Cow::Borrowed(text);
    }
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    Cow::Owned(quoted)
}

fn write_list<I>(out: &mut String, depth: usize, key: &str, items: I)
where
    I: IntoIterator<Item = String>,
{
    let mut items = items.into_iter().peekable();
    if items.peek().is_none() {
        return;
    }
    let pad = INDENT.repeat(depth);
    let _ = writeln!(out, "{pad}{key}:");
    for item in items {
        let _ = writeln!(out, "{pad}{INDENT}- {}", scalar(&item));
    }
}

fn write_service(out: &mut String, service: &ServiceDescriptor) {
    let _ = writeln!(out, "{INDENT}{}:", service.name);
    let _ = writeln!(out, "{INDENT}{INDENT}image: {}", scalar(&service.image.to_string()));
    if let Some(container) = &service.container_name {
        let _ = writeln!(out, "{INDENT}{INDENT}container_name: {}", scalar(container.as_str()));
    }
    write_list(
        out,
        2,
        "environment",
        service
            .environment
            .iter()
            .map(|e| format!("{}={}", e.key, e.value)),
    );
    write_list(out, 2, "volumes", service.volumes.iter().map(ToString::to_string));
    write_list(out, 2, "ports", service.ports.iter().map(ToString::to_string));
    write_list(out, 2, "depends_on", service.depends_on.iter().cloned());
}

/// Renders a document in canonical form.
///
/// Keys are emitted in a fixed order, empty sections are omitted and
/// `environment` always uses the list form.
#[must_use]
pub fn render(document: &ComposeDocument) -> String {
    tracing::debug!(services = document.services.len(), "rendering compose document");
    let mut out = String::new();
    if let Some(name) = &document.name {
        let _ = writeln!(out, "name: {}", scalar(name));
    }
    if let Some(version) = &document.version {
        let _ = writeln!(out, "version: {}", scalar(version));
    }
    out.push_str("services:\n");
    for service in &document.services {
        write_service(&mut out, service);
    }
    out
}
