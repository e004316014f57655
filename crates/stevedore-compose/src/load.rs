//! Compose file discovery and reading.

use std::path::{Path, PathBuf};

use stevedore_common::constants::COMPOSE_FILE_CANDIDATES;
use stevedore_common::error::{Result, StevedoreError};

use crate::error::ComposeError;
use crate::parser::ast::ComposeDocument;
use crate::parser::parse_compose;

/// Returns the first conventional compose file name present in `dir`.
///
/// Candidates are tried in the order `compose.yaml`, `compose.yml`,
/// `docker-compose.yaml`, `docker-compose.yml`.
///
/// # Errors
///
/// Returns [`StevedoreError::NotFound`] if none of them exists.
pub fn find_compose_file(dir: &Path) -> Result<PathBuf> {
    COMPOSE_FILE_CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
        .ok_or_else(|| StevedoreError::NotFound {
            kind: "compose file",
            id: dir.display().to_string(),
        })
}

/// Reads and parses a compose file.
///
/// # Errors
///
/// Returns [`ComposeError::Common`] if the file cannot be read and
/// [`ComposeError::Parse`] if its contents are rejected.
pub fn load_file(path: &Path) -> std::result::Result<ComposeDocument, ComposeError> {
    tracing::info!(path = %path.display(), "loading compose file");
    let content = std::fs::read_to_string(path).map_err(|source| StevedoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_compose(&content)?)
}
