//! Orchestration tool command lines and compose naming conventions.

use std::fmt;
use std::path::Path;

use stevedore_common::constants::CONTAINER_CLI;
use stevedore_compose::ComposeDocument;
use stevedore_compose::ServiceDescriptor;

use crate::error::{Result, RunbookError};
use crate::invocation::Invocation;

/// Lifecycle action passed to the orchestration tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// Create and start the services, detached.
    Up,
    /// Stop and remove the services.
    Down,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Up => "up",
            Self::Down => "down",
        })
    }
}

/// Builds `docker compose -f <file> [-p <project>] up -d` or `... down`.
#[must_use]
pub fn orchestration(compose_file: &Path, project: Option<&str>, verb: Verb) -> Invocation {
    tracing::debug!(file = %compose_file.display(), %verb, "building orchestration command");
    let mut invocation = Invocation::new(CONTAINER_CLI)
        .args(["compose", "-f"])
        .arg(compose_file.display().to_string());
    if let Some(project) = project {
        invocation = invocation.args(["-p", project]);
    }
    match verb {
        Verb::Up => invocation.args(["up", "-d"]),
        Verb::Down => invocation.arg("down"),
    }
}

/// Name of the container running `service`.
///
/// An explicit `container_name` wins; otherwise the orchestration tool's
/// default `<project>-<service>-1` applies.
#[must_use]
pub fn container_name(project: &str, service: &ServiceDescriptor) -> String {
    service.container_name.as_ref().map_or_else(
        || format!("{project}-{}-1", service.name),
        ToString::to_string,
    )
}

/// Lowercases `raw` and drops characters a project name may not hold.
fn sanitize_project_name(raw: &str) -> String {
    raw.chars()
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-'))
        .skip_while(|c| !c.is_ascii_alphanumeric())
        .collect()
}

/// Project name for a document loaded from `compose_dir`.
///
/// Uses the document's `name:` if set, else the sanitized final component
/// of `compose_dir`.
///
/// # Errors
///
/// Returns [`RunbookError::NoProjectName`] if the directory name has no
/// usable characters.
pub fn project_name(document: &ComposeDocument, compose_dir: &Path) -> Result<String> {
    if let Some(name) = &document.name {
        return Ok(name.clone());
    }
    let derived = compose_dir
        .file_name()
        .map(|n| sanitize_project_name(&n.to_string_lossy()))
        .unwrap_or_default();
    if derived.is_empty() {
        return Err(RunbookError::NoProjectName {
            dir: compose_dir.to_path_buf(),
        });
    }
    Ok(derived)
}

#[cfg(test)]
mod tests {
    use stevedore_common::types::{ContainerName, ImageRef};

    use super::*;

    fn service(name: &str) -> ServiceDescriptor {
        ServiceDescriptor::new(name, ImageRef::parse("mongo:7.0.4").expect("image"))
    }

    #[test]
    fn up_with_project() {
        let invocation = orchestration(Path::new("docker-compose.yml"), Some("db"), Verb::Up);
        assert_eq!(
            invocation.to_string(),
            "docker compose -f docker-compose.yml -p db up -d"
        );
    }

    #[test]
    fn down_without_project() {
        let invocation = orchestration(Path::new("/srv/app/compose.yaml"), None, Verb::Down);
        assert_eq!(
            invocation.argv(),
            vec!["docker", "compose", "-f", "/srv/app/compose.yaml", "down"]
        );
    }

    #[test]
    fn container_name_prefers_explicit() {
        let mut mongo = service("mongo");
        assert_eq!(container_name("db", &mongo), "db-mongo-1");
        mongo.container_name = Some(ContainerName::new("mongodb").expect("valid"));
        assert_eq!(container_name("db", &mongo), "mongodb");
    }

    #[test]
    fn project_name_from_document() {
        let doc = ComposeDocument {
            name: Some("inventory".into()),
            ..ComposeDocument::default()
        };
        assert_eq!(
            project_name(&doc, Path::new("/srv/Other")).expect("name"),
            "inventory"
        );
    }

    #[test]
    fn project_name_from_directory() {
        let doc = ComposeDocument::default();
        assert_eq!(
            project_name(&doc, Path::new("/home/me/My Mongo.Setup")).expect("name"),
            "mymongosetup"
        );
        assert_eq!(
            project_name(&doc, Path::new("/srv/_local-db")).expect("name"),
            "local-db"
        );
    }

    #[test]
    fn project_name_without_usable_directory_fails() {
        let doc = ComposeDocument::default();
        assert!(project_name(&doc, Path::new("/")).is_err());
        assert!(project_name(&doc, Path::new("/srv/..."))
            .is_err_and(|e| matches!(e, RunbookError::NoProjectName { .. })));
    }
}
