//! Environment value expressions with `${VAR}` placeholders.
//!
//! A value is a sequence of literal text and placeholders. Supported forms:
//! `${NAME}`, `${NAME:-default}` (default when unset or empty),
//! `${NAME-default}` (default when unset) and `$$` for a literal dollar.
//! A `$` followed by anything else is kept as-is.

use std::fmt;

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, satisfy},
    combinator::{opt, recognize},
    sequence::pair,
};
use serde::{Deserialize, Serialize};

/// What a placeholder falls back to when its variable is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fallback {
    /// `${NAME:-default}`: used when the variable is unset or empty.
    UnsetOrEmpty(String),
    /// `${NAME-default}`: used only when the variable is unset.
    Unset(String),
}

/// A `${NAME}` reference inside a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Variable name.
    pub name: String,
    /// Optional default.
    pub fallback: Option<Fallback>,
}

/// One piece of a [`ValueExpr`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text taken verbatim (already unescaped).
    Literal(String),
    /// A variable reference.
    Placeholder(Placeholder),
}

/// A parsed environment value.
///
/// Adjacent literal text is always merged, so two expressions that render
/// the same compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ValueExpr {
    segments: Vec<Segment>,
}

const fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

const fn is_name_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Parses what follows `${` up to and including the closing brace.
fn placeholder_body(input: &str) -> IResult<&str, Placeholder> {
    let (input, name) =
        recognize(pair(satisfy(is_name_start), take_while(is_name_continue))).parse(input)?;
    let (input, fallback) = opt(pair(
        alt((tag(":-"), tag("-"))),
        take_while(|c: char| c != '}'),
    ))
    .parse(input)?;
    let (input, _) = char('}').parse(input)?;

    let fallback = fallback.map(|(op, default): (&str, &str)| {
        if op == ":-" {
            Fallback::UnsetOrEmpty(default.to_string())
        } else {
            Fallback::Unset(default.to_string())
        }
    });
    Ok((
        input,
        Placeholder {
            name: name.to_string(),
            fallback,
        },
    ))
}

impl ValueExpr {
    /// Parses a raw value.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if a `${` is not closed or does
    /// not hold a valid variable name.
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut expr = Self::default();
        let mut literal = String::new();
        let mut rest = text;

        while let Some(idx) = rest.find('$') {
            literal.push_str(&rest[..idx]);
            let after = &rest[idx + 1..];
            if let Some(tail) = after.strip_prefix('$') {
                literal.push('$');
                rest = tail;
            } else if let Some(body) = after.strip_prefix('{') {
                if !body.contains('}') {
                    return Err(format!("unterminated placeholder in \"{text}\""));
                }
                let (tail, placeholder) = placeholder_body(body)
                    .map_err(|_| format!("invalid placeholder in \"{text}\""))?;
                expr.push_literal(&std::mem::take(&mut literal));
                expr.segments.push(Segment::Placeholder(placeholder));
                rest = tail;
            } else {
                literal.push('$');
                rest = after;
            }
        }
        literal.push_str(rest);
        expr.push_literal(&literal);
        Ok(expr)
    }

    /// Wraps plain text with no placeholders.
    #[must_use]
    pub fn literal(text: impl Into<String>) -> Self {
        let mut expr = Self::default();
        expr.push_literal(&text.into());
        expr
    }

    fn push_literal(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Segment::Literal(last)) = self.segments.last_mut() {
            last.push_str(text);
        } else {
            self.segments.push(Segment::Literal(text.to_string()));
        }
    }

    /// Returns the segments in order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns `true` if the value contains no placeholders.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.placeholders().next().is_none()
    }

    /// Iterates over the placeholders in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &Placeholder> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(p) => Some(p),
            Segment::Literal(_) => None,
        })
    }

    /// Substitutes every placeholder using `lookup`.
    ///
    /// # Errors
    ///
    /// Returns the name of the first variable that `lookup` does not know
    /// and that has no applicable default.
    pub fn evaluate<'v, F>(&self, mut lookup: F) -> Result<String, &str>
    where
        F: FnMut(&str) -> Option<&'v str>,
    {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(p) => {
                    let value = lookup(&p.name);
                    match (&p.fallback, value) {
                        (Some(Fallback::UnsetOrEmpty(default)), None | Some("")) => {
                            out.push_str(default);
                        }
                        (Some(Fallback::Unset(default)), None) => out.push_str(default),
                        (_, Some(v)) => out.push_str(v),
                        (None, None) => return Err(p.name.as_str()),
                    }
                }
            }
        }
        Ok(out)
    }
}

impl fmt::Display for ValueExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => f.write_str(&text.replace('$', "$$"))?,
                Segment::Placeholder(p) => match &p.fallback {
                    None => write!(f, "${{{}}}", p.name)?,
                    Some(Fallback::UnsetOrEmpty(d)) => write!(f, "${{{}:-{d}}}", p.name)?,
                    Some(Fallback::Unset(d)) => write!(f, "${{{}-{d}}}", p.name)?,
                },
            }
        }
        Ok(())
    }
}

impl TryFrom<String> for ValueExpr {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ValueExpr> for String {
    fn from(value: ValueExpr) -> Self {
        value.to_string()
    }
}
