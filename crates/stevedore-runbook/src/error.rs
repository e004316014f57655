//! Error types for building invocations.

use std::path::PathBuf;

use thiserror::Error;

/// A command line could not be built from the resolved document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunbookError {
    /// No bind mount of the service maps the requested host directory.
    #[error("no bind mount of service \"{service}\" covers host directory {}", host_dir.display())]
    UnmappedDirectory {
        /// Service whose volumes were searched.
        service: String,
        /// The host directory that has no container counterpart.
        host_dir: PathBuf,
    },

    /// The dump directory is mounted read-only in the container.
    #[error("service \"{service}\" mounts {container_dir} read-only; mongodump cannot write there")]
    ReadOnlyDirectory {
        /// Service whose volume was selected.
        service: String,
        /// The container path the host directory maps to.
        container_dir: String,
    },

    /// Only one of the root username and password is set.
    #[error("service \"{service}\" sets {present} but not {missing}")]
    IncompleteCredentials {
        /// Service whose environment was inspected.
        service: String,
        /// The credential variable that is set.
        present: &'static str,
        /// The credential variable that is absent.
        missing: &'static str,
    },

    /// No project name can be derived from the compose directory.
    #[error("cannot derive a project name from {}; set `name:` in the compose file", dir.display())]
    NoProjectName {
        /// Directory holding the compose file.
        dir: PathBuf,
    },
}

/// Result alias for runbook operations.
pub type Result<T> = std::result::Result<T, RunbookError>;
