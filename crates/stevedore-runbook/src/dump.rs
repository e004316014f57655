//! MongoDB dump and restore command lines.
//!
//! The tools run inside the database container through `docker exec`, so
//! the host directory an operator names is translated to the container
//! path its volume is mounted at.

use std::path::{Component, Path, PathBuf};

use stevedore_common::constants::{
    CONTAINER_CLI, MONGO_AUTH_DATABASE, MONGO_ROOT_PASSWORD_KEY, MONGO_ROOT_USERNAME_KEY,
};
use stevedore_compose::{ResolvedDescriptor, VolumeMapping};

use crate::error::{Result, RunbookError};
use crate::invocation::Invocation;

/// Which tool to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpOp {
    /// `mongodump`
    Dump,
    /// `mongorestore`, dropping each collection first when `drop` is set.
    Restore {
        /// Pass `--drop`.
        drop: bool,
    },
}

/// Path components with `.` removed, for lexical comparison.
fn normalized(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Translates `host_dir` into the container through the longest matching
/// bind mount. Named volumes live outside the host directory tree and are
/// never matched.
fn container_dir<'a>(
    service: &'a ResolvedDescriptor,
    host_dir: &Path,
) -> Result<(String, &'a VolumeMapping)> {
    let wanted = normalized(host_dir);
    let best = service
        .volumes
        .iter()
        .filter(|volume| volume.is_bind_mount())
        .filter_map(|volume| {
            let host = normalized(Path::new(&volume.host_path));
            let rest = wanted.strip_prefix(&host).ok()?;
            Some((host.components().count(), rest.to_path_buf(), volume))
        })
        .max_by_key(|(depth, _, _)| *depth);

    let Some((_, rest, volume)) = best else {
        return Err(RunbookError::UnmappedDirectory {
            service: service.name.clone(),
            host_dir: host_dir.to_path_buf(),
        });
    };

    let mut dir = volume.container_path.trim_end_matches('/').to_string();
    for part in rest.components() {
        dir.push('/');
        dir.push_str(&part.as_os_str().to_string_lossy());
    }
    if dir.is_empty() {
        dir.push('/');
    }
    Ok((dir, volume))
}

/// Root credentials from the resolved environment, if both are set.
fn credentials(service: &ResolvedDescriptor) -> Result<Option<(&str, &str)>> {
    match (
        service.env(MONGO_ROOT_USERNAME_KEY),
        service.env(MONGO_ROOT_PASSWORD_KEY),
    ) {
        (Some(user), Some(password)) => Ok(Some((user, password))),
        (None, None) => Ok(None),
        (Some(_), None) => Err(RunbookError::IncompleteCredentials {
            service: service.name.clone(),
            present: MONGO_ROOT_USERNAME_KEY,
            missing: MONGO_ROOT_PASSWORD_KEY,
        }),
        (None, Some(_)) => Err(RunbookError::IncompleteCredentials {
            service: service.name.clone(),
            present: MONGO_ROOT_PASSWORD_KEY,
            missing: MONGO_ROOT_USERNAME_KEY,
        }),
    }
}

/// Builds `docker exec <container> mongodump|mongorestore ...` for `service`.
///
/// Credentials come from `MONGO_INITDB_ROOT_USERNAME` and
/// `MONGO_INITDB_ROOT_PASSWORD` and authenticate against `admin`; the
/// password is a secret argument.
///
/// # Errors
///
/// Returns [`RunbookError::UnmappedDirectory`] if no bind mount covers
/// `host_dir`, [`RunbookError::ReadOnlyDirectory`] if a dump would write to
/// a read-only mount, and [`RunbookError::IncompleteCredentials`] if only one
/// of the two credential variables is set.
pub fn dump_restore(
    service: &ResolvedDescriptor,
    container: &str,
    op: DumpOp,
    host_dir: &Path,
) -> Result<Invocation> {
    tracing::info!(service = %service.name, container, ?op, "building dump/restore command");
    let (target, volume) = container_dir(service, host_dir)?;
    if op == DumpOp::Dump && volume.is_read_only() {
        return Err(RunbookError::ReadOnlyDirectory {
            service: service.name.clone(),
            container_dir: target,
        });
    }

    let mut invocation = Invocation::new(CONTAINER_CLI).args(["exec", container]);
    invocation = match op {
        DumpOp::Dump => invocation.arg("mongodump"),
        DumpOp::Restore { drop: false } => invocation.arg("mongorestore"),
        DumpOp::Restore { drop: true } => invocation.args(["mongorestore", "--drop"]),
    };
    if let Some((user, password)) = credentials(service)? {
        invocation = invocation
            .args(["--username", user, "--password"])
            .secret(password)
            .args(["--authenticationDatabase", MONGO_AUTH_DATABASE]);
    }
    Ok(match op {
        DumpOp::Dump => invocation.args(["--out", target.as_str()]),
        DumpOp::Restore { .. } => invocation.arg(target),
    })
}
