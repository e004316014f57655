//! Placeholder substitution in environment values.
//!
//! Resolution is pure: variables come from a caller-supplied
//! [`VariableSource`], never from the process environment. Resolved values
//! may hold credentials and are never logged.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use serde::Serialize;
use stevedore_common::types::{ContainerName, ImageRef};

use crate::error::ResolveError;
use crate::parser::ast::{ComposeDocument, PortMapping, ServiceDescriptor, VolumeMapping};

/// Supplies values for `${VAR}` placeholders.
pub trait VariableSource {
    /// Returns the value bound to `name`, if any.
    fn lookup(&self, name: &str) -> Option<&str>;
}

impl<S: BuildHasher> VariableSource for HashMap<String, String, S> {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl VariableSource for BTreeMap<String, String> {
    fn lookup(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

/// A service with every environment value substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDescriptor {
    /// Service name.
    pub name: String,
    /// Image the container runs.
    pub image: ImageRef,
    /// Explicit container name, if declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<ContainerName>,
    /// Concrete `(key, value)` pairs in declaration order.
    pub environment: Vec<(String, String)>,
    /// Host to container volume mappings.
    pub volumes: Vec<VolumeMapping>,
    /// Published ports.
    pub ports: Vec<PortMapping>,
    /// Services that must start before this one.
    pub depends_on: Vec<String>,
}

impl ResolvedDescriptor {
    /// Looks up a resolved environment value by key.
    #[must_use]
    pub fn env(&self, key: &str) -> Option<&str> {
        self.environment
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A document whose services have all been resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDocument {
    /// Project name, if declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Resolved services in declaration order.
    pub services: Vec<ResolvedDescriptor>,
}

impl ResolvedDocument {
    /// Looks up a resolved service by name.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<&ResolvedDescriptor> {
        self.services.iter().find(|s| s.name == name)
    }
}

/// Resolves the placeholders of a single service.
///
/// # Errors
///
/// Returns [`ResolveError::UndefinedVariable`] for the first placeholder
/// whose variable is absent from `vars` and has no applicable default.
pub fn resolve_service(
    service: &ServiceDescriptor,
    vars: &impl VariableSource,
) -> Result<ResolvedDescriptor, ResolveError> {
    tracing::debug!(service = %service.name, "resolving service");
    let mut environment = Vec::with_capacity(service.environment.len());

    for entry in &service.environment {
        let value = entry
            .value
            .evaluate(|name| vars.lookup(name))
            .map_err(|name| ResolveError::UndefinedVariable {
                name: name.to_string(),
                service: service.name.clone(),
                key: entry.key.clone(),
            })?;
        environment.push((entry.key.clone(), value));
    }

    Ok(ResolvedDescriptor {
        name: service.name.clone(),
        image: service.image.clone(),
        container_name: service.container_name.clone(),
        environment,
        volumes: service.volumes.clone(),
        ports: service.ports.clone(),
        depends_on: service.depends_on.clone(),
    })
}

/// Resolves every service of a document in declaration order.
///
/// # Errors
///
/// Stops at the first [`ResolveError::UndefinedVariable`].
pub fn resolve(
    document: &ComposeDocument,
    vars: &impl VariableSource,
) -> Result<ResolvedDocument, ResolveError> {
    tracing::info!(services = document.services.len(), "resolving placeholders");
    let services = document
        .services
        .iter()
        .map(|service| resolve_service(service, vars))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ResolvedDocument {
        name: document.name.clone(),
        services,
    })
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;
    use crate::parser::parse_compose;

    const MONGO: &str = "services:
  mongo:
    image: mongo:7.0.4
    environment:
      - MONGO_INITDB_ROOT_USERNAME=${MONGOUSER}
      - MONGO_INITDB_ROOT_PASSWORD=${MONGOPASSWORD}
    volumes:
      - ./mongodb:/data
    ports:
      - 127.0.0.1:27017:27017
";

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn resolve_empty_document() {
        let resolved = resolve(&ComposeDocument::default(), &vars(&[])).expect("should resolve");
        assert!(resolved.services.is_empty());
    }

    #[test]
    fn resolve_mongo_scenario() {
        let doc = parse_compose(MONGO).expect("should parse");
        let env = vars(&[("MONGOUSER", "admin"), ("MONGOPASSWORD", "secret")]);
        let resolved = resolve(&doc, &env).expect("should resolve");

        let mongo = resolved.service("mongo").expect("mongo");
        assert_eq!(
            mongo.environment,
            vec![
                ("MONGO_INITDB_ROOT_USERNAME".to_string(), "admin".to_string()),
                ("MONGO_INITDB_ROOT_PASSWORD".to_string(), "secret".to_string()),
            ]
        );
        assert_eq!(mongo.ports.len(), 1);
        assert_eq!(mongo.ports[0].bind_address, Some(IpAddr::V4(Ipv4Addr::LOCALHOST)));
        assert_eq!(mongo.ports[0].host_port, 27017);
        assert_eq!(mongo.ports[0].container_port, 27017);
        assert_eq!(mongo.image.to_string(), "mongo:7.0.4");
    }

    #[test]
    fn resolve_missing_variable_fails() {
        let doc = parse_compose(MONGO).expect("should parse");
        let err = resolve(&doc, &vars(&[("MONGOPASSWORD", "secret")])).unwrap_err();
        assert_eq!(
            err,
            ResolveError::UndefinedVariable {
                name: "MONGOUSER".into(),
                service: "mongo".into(),
                key: "MONGO_INITDB_ROOT_USERNAME".into(),
            }
        );
    }

    #[test]
    fn resolve_with_btree_map() {
        let doc = parse_compose(MONGO).expect("should parse");
        let env: BTreeMap<String, String> = vars(&[("MONGOUSER", "u"), ("MONGOPASSWORD", "p")])
            .into_iter()
            .collect();
        let resolved = resolve(&doc, &env).expect("should resolve");
        assert_eq!(resolved.services[0].env("MONGO_INITDB_ROOT_USERNAME"), Some("u"));
    }

    #[test]
    fn resolve_literals_and_defaults_without_vars() {
        let input = "services:\n  m:\n    image: mongo\n    environment:\n      - TZ=UTC\n      - TAG=${TAG:-7.0.4}\n      - COST=$$5\n";
        let doc = parse_compose(input).expect("should parse");
        let resolved = resolve(&doc, &vars(&[])).expect("should resolve");
        let m = &resolved.services[0];
        assert_eq!(m.env("TZ"), Some("UTC"));
        assert_eq!(m.env("TAG"), Some("7.0.4"));
        assert_eq!(m.env("COST"), Some("$5"));
    }

    #[test]
    fn resolve_does_not_reexpand_substituted_values() {
        let input = "services:\n  m:\n    image: mongo\n    environment:\n      - A=${X}\n";
        let doc = parse_compose(input).expect("should parse");
        let resolved = resolve(&doc, &vars(&[("X", "${Y}")])).expect("should resolve");
        assert_eq!(resolved.services[0].env("A"), Some("${Y}"));
    }

    #[test]
    fn resolve_service_keeps_other_fields() {
        let doc = parse_compose(MONGO).expect("should parse");
        let env = vars(&[("MONGOUSER", "a"), ("MONGOPASSWORD", "b")]);
        let resolved = resolve_service(&doc.services[0], &env).expect("should resolve");
        assert_eq!(resolved.volumes, doc.services[0].volumes);
        assert_eq!(resolved.ports, doc.services[0].ports);
        assert_eq!(resolved.container_name, None);
    }

    #[test]
    fn resolve_stops_at_first_failing_service() {
        let input = "services:\n  a:\n    image: a\n    environment:\n      - K=${ONE}\n  b:\n    image: b\n    environment:\n      - K=${TWO}\n";
        let doc = parse_compose(input).expect("should parse");
        let err = resolve(&doc, &vars(&[])).unwrap_err();
        assert_eq!(err.variable(), "ONE");
    }
}
