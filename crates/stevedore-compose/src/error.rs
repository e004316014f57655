//! Error types for parsing, validating and resolving service definitions.

use std::fmt;

use stevedore_common::error::StevedoreError;
use thiserror::Error;

/// Category of a [`ParseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// The text does not follow the indentation-scoped layout.
    Syntax,
    /// An entry cannot be split into the expected number of fields.
    MalformedEntry,
    /// A required key is absent.
    MissingRequiredField,
    /// Two services (or two container names) share a name.
    DuplicateName,
    /// A key appears twice in the same mapping.
    DuplicateKey,
    /// A key is not part of the format.
    UnknownKey,
    /// A field has the right shape but an unacceptable value.
    InvalidValue,
    /// `depends_on` names a service that is not declared.
    UnknownReference,
    /// `depends_on` edges form a cycle.
    DependencyCycle,
    /// Two port mappings publish the same host port.
    PortConflict,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Syntax => "syntax error",
            Self::MalformedEntry => "malformed entry",
            Self::MissingRequiredField => "missing required field",
            Self::DuplicateName => "duplicate name",
            Self::DuplicateKey => "duplicate key",
            Self::UnknownKey => "unknown key",
            Self::InvalidValue => "invalid value",
            Self::UnknownReference => "unknown reference",
            Self::DependencyCycle => "dependency cycle",
            Self::PortConflict => "port conflict",
        };
        f.write_str(label)
    }
}

/// A document could not be turned into descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}{kind}: {message}", line_prefix(.line))]
pub struct ParseError {
    /// What went wrong.
    pub kind: ParseErrorKind,
    /// 1-based source line, when the problem is tied to one.
    pub line: Option<usize>,
    /// Human-readable detail.
    pub message: String,
}

impl ParseError {
    /// Creates an error not tied to a source line.
    #[must_use]
    pub fn new(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            line: None,
            message: message.into(),
        }
    }

    /// Creates an error pointing at a source line.
    #[must_use]
    pub fn at(kind: ParseErrorKind, line: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            line: Some(line),
            message: message.into(),
        }
    }

    /// Attaches a line number unless one is already set.
    #[must_use]
    pub fn or_line(mut self, line: usize) -> Self {
        if self.line.is_none() {
            self.line = Some(line);
        }
        self
    }
}

#[allow(clippy::ref_option)]
fn line_prefix(line: &Option<usize>) -> String {
    line.map(|line| format!("line {line}: ")).unwrap_or_default()
}

/// Placeholder substitution failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// A `${VAR}` placeholder names a variable the caller did not supply.
    #[error("undefined variable \"{name}\" referenced by {service}.environment.{key}")]
    UndefinedVariable {
        /// The variable name inside the placeholder.
        name: String,
        /// Service whose environment references it.
        service: String,
        /// Environment key whose value references it.
        key: String,
    },
}

impl ResolveError {
    /// Name of the variable that could not be resolved.
    #[must_use]
    pub fn variable(&self) -> &str {
        match self {
            Self::UndefinedVariable { name, .. } => name,
        }
    }
}

/// Any failure while loading, parsing or resolving a document.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// The document text is not acceptable.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A placeholder could not be substituted.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Reading the document failed.
    #[error(transparent)]
    Common(#[from] StevedoreError),
}

/// Result alias for parse and validation.
pub type ParseResult<T> = std::result::Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_line_when_known() {
        let err = ParseError::at(ParseErrorKind::MalformedEntry, 7, "port entry \"27017\"");
        assert_eq!(
            err.to_string(),
            "line 7: malformed entry: port entry \"27017\""
        );
    }

    #[test]
    fn display_without_line() {
        let err = ParseError::new(ParseErrorKind::DuplicateName, "service \"mongo\"");
        assert_eq!(err.to_string(), "duplicate name: service \"mongo\"");
    }

    #[test]
    fn parse_error_is_a_std_error_with_no_source() {
        let err = ParseError::at(ParseErrorKind::UnknownKey, 2, "\"build\"");
        let dynamic: &dyn std::error::Error = &err;
        assert!(dynamic.source().is_none());
        assert_eq!(dynamic.to_string(), "line 2: unknown key: \"build\"");
    }

    #[test]
    fn or_line_keeps_existing_line() {
        let err = ParseError::at(ParseErrorKind::Syntax, 3, "x").or_line(9);
        assert_eq!(err.line, Some(3));
        let err = ParseError::new(ParseErrorKind::Syntax, "x").or_line(9);
        assert_eq!(err.line, Some(9));
    }

    #[test]
    fn undefined_variable_names_the_variable() {
        let err = ResolveError::UndefinedVariable {
            name: "MONGOUSER".into(),
            service: "mongo".into(),
            key: "MONGO_INITDB_ROOT_USERNAME".into(),
        };
        assert_eq!(err.variable(), "MONGOUSER");
        assert!(err.to_string().contains("MONGOUSER"));
    }
}
