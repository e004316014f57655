//! Line lexing of compose documents using `nom`.
//!
//! Produces one [`Line`] per significant source line for the parser to
//! consume. Blank lines and `#` comments are discarded. Each line carries its
//! indentation so the parser can recover block structure.

use nom::{
    IResult, Parser,
    bytes::complete::{take_while, take_while1},
    character::complete::char,
};

use crate::error::{ParseError, ParseErrorKind, ParseResult};

/// Shape of a significant line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// `key:` with nothing after the colon; opens a nested block.
    Section(String),
    /// `key: value`
    Entry(String, String),
    /// `- value`
    Item(String),
}

impl LineKind {
    /// The mapping key, if this line has one.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Section(key) | Self::Entry(key, _) => Some(key),
            Self::Item(_) => None,
        }
    }

    /// Returns `true` for list items.
    #[must_use]
    pub const fn is_item(&self) -> bool {
        matches!(self, Self::Item(_))
    }
}

/// A significant source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// 1-based line number in the source.
    pub number: usize,
    /// Count of leading spaces.
    pub indent: usize,
    /// What the line holds.
    pub kind: LineKind,
}

const fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

/// Characters that would start YAML constructs this format does not support.
const UNSUPPORTED_STARTS: [char; 7] = ['[', '{', '&', '*', '!', '|', '>'];

fn indentation(input: &str) -> IResult<&str, &str> {
    take_while(|c: char| c == ' ').parse(input)
}

/// Parses a double-quoted scalar with basic escape support.
fn double_quoted(input: &str) -> IResult<&str, String> {
    let (input, _) = char('"').parse(input)?;
    let mut result = String::new();
    let mut chars = input.char_indices();
    loop {
        match chars.next() {
            Some((idx, '"')) => return Ok((&input[idx + 1..], result)),
            Some((_, '\\')) => match chars.next() {
                Some((_, 'n')) => result.push('\n'),
                Some((_, 't')) => result.push('\t'),
                Some((_, '\\')) => result.push('\\'),
                Some((_, '"')) => result.push('"'),
                Some((_, c)) => {
                    result.push('\\');
                    result.push(c);
                }
                None => {
                    return Err(nom::Err::Failure(nom::error::Error::new(
                        input,
                        nom::error::ErrorKind::Char,
                    )));
                }
            },
            Some((_, c)) => result.push(c),
            None => {
                return Err(nom::Err::Failure(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::Char,
                )));
            }
        }
    }
}

/// Parses a single-quoted scalar; `''` stands for one quote.
fn single_quoted(input: &str) -> IResult<&str, String> {
    let (input, _) = char('\'').parse(input)?;
    let mut result = String::new();
    let mut remaining = input;
    loop {
        match remaining.find('\'') {
            Some(idx) => {
                result.push_str(&remaining[..idx]);
                let after = &remaining[idx + 1..];
                if let Some(tail) = after.strip_prefix('\'') {
                    result.push('\'');
                    remaining = tail;
                } else {
                    return Ok((after, result));
                }
            }
            None => {
                return Err(nom::Err::Failure(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::Char,
                )));
            }
        }
    }
}

/// Strips a trailing ` # comment` from a plain scalar.
fn strip_comment(text: &str) -> &str {
    let mut prev_is_space = true;
    for (idx, c) in text.char_indices() {
        if c == '#' && prev_is_space {
            return &text[..idx];
        }
        prev_is_space = c == ' ' || c == '\t';
    }
    text
}

/// Returns `true` if nothing but whitespace and an optional comment remains.
fn only_trivia(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Reads the scalar that makes up the rest of a line.
fn scalar(text: &str, number: usize) -> ParseResult<String> {
    let syntax = |message: String| ParseError::at(ParseErrorKind::Syntax, number, message);
    let text = text.trim_start();

    let quoted = match text.chars().next() {
        Some('"') => Some(double_quoted(text)),
        Some('\'') => Some(single_quoted(text)),
        Some(c) if UNSUPPORTED_STARTS.contains(&c) => {
            return Err(syntax(format!(
                "unsupported YAML construct starting with '{c}'; write the value in quotes"
            )));
        }
        _ => None,
    };

    match quoted {
        Some(Ok((after, value))) => {
            if only_trivia(after) {
                Ok(value)
            } else {
                Err(syntax(format!(
                    "unexpected text after quoted value: \"{}\"",
                    after.trim()
                )))
            }
        }
        Some(Err(_)) => Err(syntax("unterminated quoted value".into())),
        None => Ok(strip_comment(text).trim_end().to_string()),
    }
}

/// `key:` followed by the remainder of the line.
fn key_and_colon(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, key) = take_while1(is_key_char).parse(input)?;
    let (remainder, _) = char(':').parse(input)?;
    Ok(("", (key, remainder)))
}

fn lex_line(content: &str, number: usize) -> ParseResult<LineKind> {
    if content == "-" {
        return Ok(LineKind::Item(String::new()));
    }
    if let Some(item) = content.strip_prefix("- ") {
        return Ok(LineKind::Item(scalar(item, number)?));
    }

    let (_, (key, remainder)) = key_and_colon(content).map_err(|_| {
        ParseError::at(
            ParseErrorKind::Syntax,
            number,
            format!("expected `key:`, `key: value` or `- item`, got \"{content}\""),
        )
    })?;

    if only_trivia(remainder) {
        return Ok(LineKind::Section(key.to_string()));
    }
    if !remainder.starts_with([' ', '\t']) {
        return Err(ParseError::at(
            ParseErrorKind::Syntax,
            number,
            format!("missing space after `{key}:`"),
        ));
    }
    Ok(LineKind::Entry(key.to_string(), scalar(remainder, number)?))
}

/// Splits a document into significant lines.
///
/// Blank lines and full-line `#` comments are dropped.
///
/// # Errors
///
/// Returns a [`ParseErrorKind::Syntax`] error for tab indentation,
/// unterminated quotes, unsupported YAML constructs, or lines that are
/// neither `key:`, `key: value` nor `- item`.
pub fn tokenize(input: &str) -> ParseResult<Vec<Line>> {
    let mut lines = Vec::new();

    for (idx, raw) in input.lines().enumerate() {
        let number = idx + 1;
        let (content, spaces) = indentation(raw).map_err(|e| {
            ParseError::at(
                ParseErrorKind::Syntax,
                number,
                format!("lexer error reading indentation: {e}"),
            )
        })?;

        if content.starts_with('\t') {
            return Err(ParseError::at(
                ParseErrorKind::Syntax,
                number,
                "tabs are not allowed in indentation",
            ));
        }
        let content = content.trim_end();
        if content.is_empty() || content.starts_with('#') {
            continue;
        }

        let kind = lex_line(content, number)?;
        lines.push(Line {
            number,
            indent: spaces.len(),
            kind,
        });
    }

    Ok(lines)
}
