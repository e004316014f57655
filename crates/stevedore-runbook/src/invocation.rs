//! External command lines with maskable secret arguments.

use std::fmt;

use serde::Serialize;

/// Placeholder printed instead of a secret.
pub const MASK: &str = "***";

/// Substrings that mark an environment key as holding a secret.
const SENSITIVE_PATTERNS: [&str; 8] = [
    "secret",
    "password",
    "token",
    "api_key",
    "apikey",
    "private_key",
    "auth",
    "credential",
];

/// Returns `true` if values of `key` should not be shown by default.
#[must_use]
pub fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    SENSITIVE_PATTERNS.iter().any(|p| lower.contains(p))
}

/// One command-line argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// Shown as-is.
    Plain(String),
    /// Masked when displayed.
    Secret(String),
}

impl Arg {
    /// The real argument text.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Plain(v) | Self::Secret(v) => v,
        }
    }

    /// Returns `true` for secret arguments.
    #[must_use]
    pub const fn is_secret(&self) -> bool {
        matches!(self, Self::Secret(_))
    }
}

/// A program and its arguments, ready to be printed or spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<Arg>,
}

impl Invocation {
    /// Starts an invocation of `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends a plain argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(Arg::Plain(arg.into()));
        self
    }

    /// Appends several plain arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|a| Arg::Plain(a.into())));
        self
    }

    /// Appends an argument that must not be displayed.
    #[must_use]
    pub fn secret(mut self, arg: impl Into<String>) -> Self {
        self.args.push(Arg::Secret(arg.into()));
        self
    }

    /// The program to run.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The arguments, without the program.
    #[must_use]
    pub fn arguments(&self) -> &[Arg] {
        &self.args
    }

    /// Program followed by the real argument strings, secrets included.
    #[must_use]
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(Arg::value))
            .collect()
    }

    /// Returns `true` if any argument is secret.
    #[must_use]
    pub fn has_secrets(&self) -> bool {
        self.args.iter().any(Arg::is_secret)
    }

    /// Shell-quoted command line with secrets in clear text.
    #[must_use]
    pub fn reveal(&self) -> String {
        self.render(false)
    }

    fn render(&self, mask: bool) -> String {
        let mut line = shell_quote(&self.program);
        for arg in &self.args {
            line.push(' ');
            if mask && arg.is_secret() {
                line.push_str(MASK);
            } else {
                line.push_str(&shell_quote(arg.value()));
            }
        }
        line
    }
}

/// Masked, shell-quoted command line.
impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(true))
    }
}

/// Serializes as the masked argv.
impl Serialize for Invocation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let masked: Vec<&str> = std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(|a| if a.is_secret() { MASK } else { a.value() }))
            .collect();
        masked.serialize(serializer)
    }
}

const fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '=' | '@' | ',' | '+')
}

/// Wraps `word` in single quotes unless it is made only of characters a
/// POSIX shell leaves alone.
fn shell_quote(word: &str) -> String {
    if !word.is_empty() && word.chars().all(is_shell_safe) {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}
