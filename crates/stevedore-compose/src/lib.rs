//! # stevedore-compose
//!
//! Loader and validator for compose-style service definition documents.
//!
//! Handles:
//! - **Parser**: Line lexing, descriptor construction, and validation.
//! - **Value**: `${VAR}` placeholder expressions inside environment values.
//! - **Resolver**: Substitution of placeholders from a caller-supplied map.
//! - **Render**: Canonical text form of a parsed document.
//! - **Graph**: `depends_on` ordering for deployment.
//! - **Load**: Compose file discovery and reading.

pub mod error;
pub mod graph;
pub mod load;
pub mod parser;
pub mod render;
pub mod resolver;
pub mod value;

pub use error::{ComposeError, ParseError, ParseErrorKind, ResolveError};
pub use parser::ast::{
    AccessMode, ComposeDocument, EnvEntry, PortMapping, Protocol, ServiceDescriptor,
    VolumeMapping,
};
pub use parser::parse_compose;
pub use render::render;
pub use resolver::{ResolvedDescriptor, ResolvedDocument, VariableSource, resolve, resolve_service};
