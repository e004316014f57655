//! Static analysis and validation of a parsed document.
//!
//! Checks for duplicate names, undefined references, dependency cycles and
//! clashing published ports before the document is handed to an
//! orchestration tool.

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;

use stevedore_common::types::ContainerName;

use crate::error::{ParseError, ParseErrorKind, ParseResult};
use crate::graph;

use super::ast::{ComposeDocument, Protocol};

/// Validates a parsed document for semantic correctness.
///
/// # Checks performed
///
/// 1. Every service has a non-empty name.
/// 2. No duplicate service names.
/// 3. No duplicate explicit container names.
/// 4. Every `depends_on` entry references a declared service.
/// 5. `depends_on` edges are acyclic.
/// 6. No two port mappings publish the same host port and protocol on
///    overlapping bind addresses.
///
/// # Errors
///
/// Returns an error if any semantic check fails.
pub fn validate(document: &ComposeDocument) -> ParseResult<()> {
    tracing::info!(services = document.services.len(), "validating compose document");
    check_names_present(document)?;
    check_duplicate_services(document)?;
    check_duplicate_container_names(document)?;
    check_dependency_references(document)?;
    let _ = graph::deployment_order(document)?;
    check_port_conflicts(document)?;
    Ok(())
}

fn check_names_present(document: &ComposeDocument) -> ParseResult<()> {
    if document.services.iter().any(|s| s.name.is_empty()) {
        return Err(ParseError::new(
            ParseErrorKind::MissingRequiredField,
            "a service has an empty name",
        ));
    }
    Ok(())
}

fn check_duplicate_services(document: &ComposeDocument) -> ParseResult<()> {
    let mut seen = HashSet::new();
    for service in &document.services {
        if !seen.insert(service.name.as_str()) {
            return Err(ParseError::new(
                ParseErrorKind::DuplicateName,
                format!("duplicate service name: \"{}\"", service.name),
            ));
        }
    }
    Ok(())
}

fn check_duplicate_container_names(document: &ComposeDocument) -> ParseResult<()> {
    let mut owners: HashMap<&str, &str> = HashMap::new();
    for service in &document.services {
        let Some(container) = service.container_name.as_ref().map(ContainerName::as_str) else {
            continue;
        };
        if let Some(first) = owners.insert(container, service.name.as_str()) {
            return Err(ParseError::new(
                ParseErrorKind::DuplicateName,
                format!(
                    "container name \"{container}\" is used by both \"{first}\" and \"{}\"",
                    service.name
                ),
            ));
        }
    }
    Ok(())
}

fn check_dependency_references(document: &ComposeDocument) -> ParseResult<()> {
    let names: HashSet<&str> = document.services.iter().map(|s| s.name.as_str()).collect();

    for service in &document.services {
        for dependency in &service.depends_on {
            if !names.contains(dependency.as_str()) {
                return Err(ParseError::new(
                    ParseErrorKind::UnknownReference,
                    format!(
                        "service \"{}\" depends on undefined service \"{dependency}\"",
                        service.name
                    ),
                ));
            }
        }
    }
    Ok(())
}

/// Two bind addresses overlap if either listens on all interfaces or they
/// are the same address.
fn binds_overlap(a: Option<IpAddr>, b: Option<IpAddr>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.is_unspecified() || b.is_unspecified() || a == b,
        _ => true,
    }
}

fn check_port_conflicts(document: &ComposeDocument) -> ParseResult<()> {
    let mut published: HashMap<(u16, Protocol), Vec<(Option<IpAddr>, &str)>> = HashMap::new();

    for service in &document.services {
        for port in &service.ports {
            let key = (port.host_port, port.effective_protocol());
            let holders = published.entry(key).or_default();
            if let Some((_, owner)) = holders
                .iter()
                .find(|(bind, _)| binds_overlap(*bind, port.bind_address))
            {
                return Err(ParseError::new(
                    ParseErrorKind::PortConflict,
                    format!(
                        "host port {}/{} is published by both \"{owner}\" and \"{}\"",
                        port.host_port,
                        key.1.as_str(),
                        service.name
                    ),
                ));
            }
            holders.push((port.bind_address, service.name.as_str()));
        }
    }
    Ok(())
}
