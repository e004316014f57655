//! Compose document parser.
//!
//! Transforms raw document text into validated [`ComposeDocument`]s through
//! lexing, block parsing, and static analysis phases.

pub mod ast;
pub mod entry;
pub mod lexer;
pub mod validator;

use std::collections::HashSet;

use stevedore_common::types::{ContainerName, ImageRef};

use crate::error::{ParseError, ParseErrorKind, ParseResult};

use self::ast::{ComposeDocument, EnvEntry, ServiceDescriptor};
use self::lexer::{Line, LineKind};

/// Cursor into a line stream for recursive-descent parsing.
struct LineCursor<'a> {
    lines: &'a [Line],
    pos: usize,
}

impl<'a> LineCursor<'a> {
    const fn new(lines: &'a [Line]) -> Self {
        Self { lines, pos: 0 }
    }

    fn peek(&self) -> Option<&'a Line> {
        self.lines.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Line> {
        let line = self.lines.get(self.pos);
        if line.is_some() {
            self.pos += 1;
        }
        line
    }

    /// Indentation of the block nested under a header at `parent`, or
    /// `None` if the header has no children.
    ///
    /// With `compact_items`, list items at the header's own indentation
    /// also count as children (`key:\n- item`).
    fn block_indent(&self, parent: usize, compact_items: bool) -> Option<usize> {
        let next = self.peek()?;
        let nested = next.indent > parent
            || (compact_items && next.indent == parent && next.kind.is_item());
        nested.then_some(next.indent)
    }

    /// Returns the next line belonging to the block at `indent`.
    fn next_in_block(&mut self, indent: usize) -> ParseResult<Option<&'a Line>> {
        match self.peek() {
            Some(line) if line.indent > indent => Err(ParseError::at(
                ParseErrorKind::Syntax,
                line.number,
                "unexpected indentation",
            )),
            Some(line) if line.indent == indent => Ok(self.advance()),
            _ => Ok(None),
        }
    }
}

/// Parses a compose document from its source text.
///
/// # Errors
///
/// Returns an error if the input contains syntax errors, malformed or
/// missing entries, or fails validation.
pub fn parse_compose(input: &str) -> ParseResult<ComposeDocument> {
    tracing::info!("parsing compose document");
    let lines = lexer::tokenize(input)?;
    let mut cursor = LineCursor::new(&lines);
    let document = parse_document(&mut cursor)?;
    validator::validate(&document)?;
    tracing::debug!(services = document.services.len(), "compose document parsed");
    Ok(document)
}

fn syntax(line: &Line, message: impl Into<String>) -> ParseError {
    ParseError::at(ParseErrorKind::Syntax, line.number, message)
}

fn check_duplicate_key<'a>(
    seen: &mut HashSet<&'a str>,
    key: &'a str,
    line: &Line,
) -> ParseResult<()> {
    if seen.insert(key) {
        Ok(())
    } else {
        Err(ParseError::at(
            ParseErrorKind::DuplicateKey,
            line.number,
            format!("key `{key}` appears more than once"),
        ))
    }
}

/// Checks a project name against compose's rules: lowercase letters,
/// digits, `_` and `-`, starting with a letter or digit.
fn check_project_name(name: &str, line: &Line) -> ParseResult<()> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(ParseError::at(
            ParseErrorKind::InvalidValue,
            line.number,
            format!("project name \"{name}\" must be lowercase [a-z0-9_-]"),
        ))
    }
}

fn parse_document(cursor: &mut LineCursor<'_>) -> ParseResult<ComposeDocument> {
    let mut document = ComposeDocument::default();
    let mut services = None;
    let mut seen = HashSet::new();

    while let Some(line) = cursor.next_in_block(0)? {
        let Some(key) = line.kind.key() else {
            return Err(syntax(line, "unexpected list item at top level"));
        };
        check_duplicate_key(&mut seen, key, line)?;

        match (key, &line.kind) {
            ("services", LineKind::Section(_)) => services = Some(parse_services(cursor)?),
            ("version", LineKind::Entry(_, value)) => {
                tracing::warn!(version = %value, "the top-level `version` key is obsolete");
                document.version = Some(value.clone());
            }
            ("name", LineKind::Entry(_, value)) => {
                check_project_name(value, line)?;
                document.name = Some(value.clone());
            }
            ("services", LineKind::Entry(..)) => {
                return Err(syntax(line, "`services` must be a mapping of service names"));
            }
            ("version" | "name", _) => {
                return Err(ParseError::at(
                    ParseErrorKind::InvalidValue,
                    line.number,
                    format!("`{key}` must have a value"),
                ));
            }
            _ => {
                return Err(ParseError::at(
                    ParseErrorKind::UnknownKey,
                    line.number,
                    format!("unknown top-level key `{key}`"),
                ));
            }
        }
    }

    document.services = services.ok_or_else(|| {
        ParseError::new(
            ParseErrorKind::MissingRequiredField,
            "document has no `services` section",
        )
    })?;
    Ok(document)
}

fn parse_services(cursor: &mut LineCursor<'_>) -> ParseResult<Vec<ServiceDescriptor>> {
    let mut services = Vec::new();
    let Some(indent) = cursor.block_indent(0, false) else {
        return Ok(services);
    };

    while let Some(line) = cursor.next_in_block(indent)? {
        match &line.kind {
            LineKind::Section(name) => services.push(parse_service(cursor, name, line)?),
            LineKind::Entry(name, _) => {
                return Err(syntax(line, format!("service `{name}` must be a mapping")));
            }
            LineKind::Item(_) => {
                return Err(syntax(line, "expected a service name, got a list item"));
            }
        }
    }
    Ok(services)
}

fn parse_service(
    cursor: &mut LineCursor<'_>,
    name: &str,
    header: &Line,
) -> ParseResult<ServiceDescriptor> {
    tracing::debug!(service = name, line = header.number, "parsing service");
    let mut image = None;
    let mut container_name = None;
    let mut environment = Vec::new();
    let mut volumes = Vec::new();
    let mut ports = Vec::new();
    let mut depends_on = Vec::new();
    let mut seen = HashSet::new();

    if let Some(indent) = cursor.block_indent(header.indent, false) {
        while let Some(line) = cursor.next_in_block(indent)? {
            let Some(key) = line.kind.key() else {
                return Err(syntax(line, format!("unexpected list item in service `{name}`")));
            };
            check_duplicate_key(&mut seen, key, line)?;

            match (key, &line.kind) {
                ("image", LineKind::Entry(_, value)) => {
                    let parsed = ImageRef::parse(value).map_err(|e| {
                        ParseError::at(ParseErrorKind::InvalidValue, line.number, e.to_string())
                    })?;
                    image = Some(parsed);
                }
                ("image", LineKind::Section(_)) => {
                    return Err(ParseError::at(
                        ParseErrorKind::MissingRequiredField,
                        line.number,
                        format!("service \"{name}\" has an empty image"),
                    ));
                }
                ("container_name", LineKind::Entry(_, value)) => {
                    let checked = ContainerName::new(value.as_str()).map_err(|e| {
                        ParseError::at(ParseErrorKind::InvalidValue, line.number, e.to_string())
                    })?;
                    container_name = Some(checked);
                }
                ("container_name", LineKind::Section(_)) => {
                    return Err(ParseError::at(
                        ParseErrorKind::InvalidValue,
                        line.number,
                        "`container_name` must have a value",
                    ));
                }
                ("environment", LineKind::Section(_)) => {
                    environment = parse_environment(cursor, line)?;
                }
                ("volumes", LineKind::Section(_)) => {
                    volumes = parse_items(cursor, line, entry::parse_volume)?;
                }
                ("ports", LineKind::Section(_)) => {
                    ports = parse_items(cursor, line, entry::parse_port)?;
                }
                ("depends_on", LineKind::Section(_)) => {
                    depends_on = parse_items(cursor, line, |text| {
                        if text.is_empty() {
                            Err(ParseError::new(
                                ParseErrorKind::MalformedEntry,
                                "depends_on entry is empty",
                            ))
                        } else {
                            Ok(text.to_string())
                        }
                    })?;
                }
                ("environment" | "volumes" | "ports" | "depends_on", LineKind::Entry(..)) => {
                    return Err(syntax(line, format!("`{key}` must be a list")));
                }
                _ => {
                    return Err(ParseError::at(
                        ParseErrorKind::UnknownKey,
                        line.number,
                        format!("unknown key `{key}` in service `{name}`"),
                    ));
                }
            }
        }
    }

    let image = image.ok_or_else(|| {
        ParseError::at(
            ParseErrorKind::MissingRequiredField,
            header.number,
            format!("service \"{name}\" has no image"),
        )
    })?;

    Ok(ServiceDescriptor {
        name: name.to_string(),
        image,
        container_name,
        environment,
        volumes,
        ports,
        depends_on,
    })
}

/// Collects the list items under `header`, converting each with `convert`.
fn parse_items<T>(
    cursor: &mut LineCursor<'_>,
    header: &Line,
    mut convert: impl FnMut(&str) -> ParseResult<T>,
) -> ParseResult<Vec<T>> {
    let mut items = Vec::new();
    let Some(indent) = cursor.block_indent(header.indent, true) else {
        return Ok(items);
    };
    let compact = indent == header.indent;

    while let Some(line) = cursor.peek() {
        if line.indent < indent || (compact && !line.kind.is_item()) {
            break;
        }
        if line.indent > indent {
            return Err(syntax(line, "unexpected indentation"));
        }
        let _ = cursor.advance();
        match &line.kind {
            LineKind::Item(text) => items.push(convert(text).map_err(|e| e.or_line(line.number))?),
            _ => {
                let section = header.kind.key().unwrap_or_default();
                return Err(syntax(line, format!("expected a list item under `{section}`")));
            }
        }
    }
    Ok(items)
}

/// Parses `environment` in either list (`- KEY=value`) or mapping
/// (`KEY: value`) form.
fn parse_environment(cursor: &mut LineCursor<'_>, header: &Line) -> ParseResult<Vec<EnvEntry>> {
    let entries = match cursor.peek() {
        Some(first) if first.kind.is_item() => parse_items(cursor, header, entry::parse_env_item)?,
        _ => parse_env_mapping(cursor, header)?,
    };

    let mut seen = HashSet::new();
    for entry in &entries {
        if !seen.insert(entry.key.as_str()) {
            return Err(ParseError::at(
                ParseErrorKind::DuplicateKey,
                header.number,
                format!("environment variable `{}` is set more than once", entry.key),
            ));
        }
    }
    Ok(entries)
}

fn parse_env_mapping(cursor: &mut LineCursor<'_>, header: &Line) -> ParseResult<Vec<EnvEntry>> {
    let mut entries = Vec::new();
    let Some(indent) = cursor.block_indent(header.indent, false) else {
        return Ok(entries);
    };

    while let Some(line) = cursor.next_in_block(indent)? {
        let entry = match &line.kind {
            LineKind::Entry(key, value) => entry::env_pair(key, value),
            LineKind::Section(key) => entry::env_pair(key, ""),
            LineKind::Item(_) => {
                return Err(syntax(line, "cannot mix list items into an environment mapping"));
            }
        };
        entries.push(entry.map_err(|e| e.or_line(line.number))?);
    }
    Ok(entries)
}
