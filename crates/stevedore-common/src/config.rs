//! Run configuration assembled by the CLI before loading a document.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Where a document and its variables come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StevedoreConfig {
    /// Compose document to load.
    pub compose_file: PathBuf,
    /// `.env` file merged beneath the process environment, if any.
    pub env_file: Option<PathBuf>,
    /// Whether process environment variables take part in resolution.
    pub inherit_process_env: bool,
    /// Explicit `KEY=VALUE` overrides, highest precedence.
    pub overrides: Vec<(String, String)>,
    /// Project name overriding the document's `name:` and the directory.
    pub project_name: Option<String>,
}

impl StevedoreConfig {
    /// Configuration for `compose_file` with the env file beside it, the
    /// process environment inherited, and no overrides.
    #[must_use]
    pub fn new(compose_file: impl Into<PathBuf>) -> Self {
        Self {
            compose_file: compose_file.into(),
            env_file: None,
            inherit_process_env: true,
            overrides: Vec::new(),
            project_name: None,
        }
    }

    /// Directory the compose file lives in, used as the project directory.
    #[must_use]
    pub fn project_dir(&self) -> &Path {
        match self.compose_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// The env file to read: the explicit one, else `.env` beside the
    /// compose file.
    #[must_use]
    pub fn effective_env_file(&self) -> PathBuf {
        self.env_file
            .clone()
            .unwrap_or_else(|| self.project_dir().join(crate::constants::DEFAULT_ENV_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_file_name_uses_current_dir() {
        let config = StevedoreConfig::new("docker-compose.yml");
        assert!(config.inherit_process_env);
        assert!(config.overrides.is_empty());
        assert_eq!(config.project_dir(), Path::new("."));
        assert_eq!(config.effective_env_file(), PathBuf::from("./.env"));
    }

    #[test]
    fn env_file_sits_beside_compose_file() {
        let config = StevedoreConfig::new("deploy/mongo/compose.yaml");
        assert_eq!(
            config.effective_env_file(),
            PathBuf::from("deploy/mongo/.env")
        );
    }

    #[test]
    fn explicit_env_file_wins() {
        let config = StevedoreConfig {
            env_file: Some(PathBuf::from("/etc/stevedore/prod.env")),
            ..StevedoreConfig::new("compose.yaml")
        };
        assert_eq!(
            config.effective_env_file(),
            PathBuf::from("/etc/stevedore/prod.env")
        );
    }
}
