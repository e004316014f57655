//! Dependency graph management using `petgraph`.
//!
//! Builds a directed acyclic graph from `depends_on` declarations and
//! resolves the order services should be started in.

use std::collections::HashMap;

use petgraph::graph::NodeIndex;

use crate::error::{ParseError, ParseErrorKind, ParseResult};
use crate::parser::ast::ComposeDocument;

/// A dependency graph of services.
#[derive(Debug)]
pub struct DependencyGraph {
    /// Internal petgraph representation.
    graph: petgraph::Graph<String, ()>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: petgraph::Graph::new(),
        }
    }

    /// Adds a service node to the graph.
    pub fn add_service(&mut self, name: impl Into<String>) -> NodeIndex {
        self.graph.add_node(name.into())
    }

    /// Adds a dependency edge: `dependent` depends on `dependency`.
    ///
    /// The graph edge points from `dependency` to `dependent`
    /// so that topological sort yields dependencies first.
    pub fn add_dependency(&mut self, dependent: NodeIndex, dependency: NodeIndex) {
        let _ = self.graph.add_edge(dependency, dependent, ());
    }

    /// Returns a topological ordering of services for deployment.
    ///
    /// Dependencies appear before the services that depend on them.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseErrorKind::DependencyCycle`] error naming one
    /// service on the cycle.
    pub fn resolve_order(&self) -> ParseResult<Vec<String>> {
        match petgraph::algo::toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .iter()
                .filter_map(|&idx| self.graph.node_weight(idx).cloned())
                .collect()),
            Err(cycle) => {
                let name = self
                    .graph
                    .node_weight(cycle.node_id())
                    .map_or("<unknown>", String::as_str);
                Err(ParseError::new(
                    ParseErrorKind::DependencyCycle,
                    format!("service \"{name}\" is part of a depends_on cycle"),
                ))
            }
        }
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Orders a document's services so every service follows its dependencies.
///
/// Dependencies that name undeclared services are ignored here; the
/// validator reports them separately.
///
/// # Errors
///
/// Returns a [`ParseErrorKind::DependencyCycle`] error if `depends_on`
/// edges form a cycle.
pub fn deployment_order(document: &ComposeDocument) -> ParseResult<Vec<String>> {
    let mut graph = DependencyGraph::new();
    let mut nodes = HashMap::new();

    for service in &document.services {
        let idx = graph.add_service(&service.name);
        let _ = nodes.insert(service.name.as_str(), idx);
    }
    for service in &document.services {
        for dependency in &service.depends_on {
            if let (Some(&dependent), Some(&target)) = (
                nodes.get(service.name.as_str()),
                nodes.get(dependency.as_str()),
            ) {
                graph.add_dependency(dependent, target);
            }
        }
    }

    let order = graph.resolve_order()?;
    tracing::debug!(?order, "resolved deployment order");
    Ok(order)
}

#[cfg(test)]
mod tests {
    use stevedore_common::types::ImageRef;

    use super::*;
    use crate::parser::ast::ServiceDescriptor;

    #[test]
    fn empty_graph_resolves_to_empty() {
        let graph = DependencyGraph::new();
        let order = graph.resolve_order().expect("should resolve");
        assert!(order.is_empty());
    }

    #[test]
    fn linear_dependency_chain() {
        let mut graph = DependencyGraph::new();
        let app = graph.add_service("app");
        let mongo = graph.add_service("mongo");
        graph.add_dependency(app, mongo);

        let order = graph.resolve_order().expect("should resolve");
        let app_pos = order.iter().position(|n| n == "app").expect("app");
        let mongo_pos = order.iter().position(|n| n == "mongo").expect("mongo");
        assert!(mongo_pos < app_pos, "mongo should come before app: {order:?}");
    }

    #[test]
    fn diamond_dependency() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_service("a");
        let b = graph.add_service("b");
        let c = graph.add_service("c");
        let d = graph.add_service("d");
        graph.add_dependency(a, b);
        graph.add_dependency(a, c);
        graph.add_dependency(b, d);
        graph.add_dependency(c, d);

        let order = graph.resolve_order().expect("should resolve");
        assert_eq!(order.len(), 4);
        let pos = |name: &str| order.iter().position(|n| n == name).expect(name);
        assert!(pos("d") < pos("b"));
        assert!(pos("d") < pos("c"));
        assert!(pos("b") < pos("a"));
        assert!(pos("c") < pos("a"));
    }

    #[test]
    fn cycle_detection() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_service("a");
        let b = graph.add_service("b");
        graph.add_dependency(a, b);
        graph.add_dependency(b, a);

        let err = graph.resolve_order().unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::DependencyCycle);
        assert!(err.message.contains("cycle"), "got: {err}");
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_service("a");
        graph.add_dependency(a, a);
        assert!(graph.resolve_order().is_err());
    }

    #[test]
    fn document_order_puts_dependencies_first() {
        let image = ImageRef::parse("img:1").expect("image");
        let mut app = ServiceDescriptor::new("app", image.clone());
        app.depends_on = vec!["mongo".into(), "cache".into()];
        let doc = ComposeDocument {
            services: vec![
                app,
                ServiceDescriptor::new("mongo", image.clone()),
                ServiceDescriptor::new("cache", image),
            ],
            ..ComposeDocument::default()
        };

        let order = deployment_order(&doc).expect("should resolve");
        assert_eq!(order.len(), 3);
        assert_eq!(order.last().map(String::as_str), Some("app"));
    }
}
