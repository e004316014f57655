//! Descriptor types produced by parsing a compose document.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use stevedore_common::types::{ContainerName, ImageRef};

use crate::value::ValueExpr;

/// Root of a parsed document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeDocument {
    /// Project name (`name:`), if declared.
    pub name: Option<String>,
    /// Legacy `version:` string, kept so rendering preserves it.
    pub version: Option<String>,
    /// Services in declaration order.
    pub services: Vec<ServiceDescriptor>,
}

impl ComposeDocument {
    /// Looks up a service by name.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.services.iter().find(|s| s.name == name)
    }
}

/// One container's declared image, environment, volumes and ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Service name, unique within the document.
    pub name: String,
    /// Image the container runs.
    pub image: ImageRef,
    /// Explicit container name overriding the runtime's default.
    pub container_name: Option<ContainerName>,
    /// Environment bindings in declaration order.
    pub environment: Vec<EnvEntry>,
    /// Host to container volume mappings.
    pub volumes: Vec<VolumeMapping>,
    /// Published ports.
    pub ports: Vec<PortMapping>,
    /// Services that must start before this one.
    pub depends_on: Vec<String>,
}

impl ServiceDescriptor {
    /// Creates a descriptor with only a name and image.
    #[must_use]
    pub fn new(name: impl Into<String>, image: ImageRef) -> Self {
        Self {
            name: name.into(),
            image,
            container_name: None,
            environment: Vec::new(),
            volumes: Vec::new(),
            ports: Vec::new(),
            depends_on: Vec::new(),
        }
    }
}

/// A `KEY=value` environment binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvEntry {
    /// Variable name exported into the container.
    pub key: String,
    /// Value, possibly containing placeholders.
    pub value: ValueExpr,
}

/// Access mode of a volume mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// `ro`
    ReadOnly,
    /// `rw`
    ReadWrite,
}

impl AccessMode {
    /// Parses `ro` / `rw`.
    #[must_use]
    pub fn from_suffix(text: &str) -> Option<Self> {
        match text {
            "ro" => Some(Self::ReadOnly),
            "rw" => Some(Self::ReadWrite),
            _ => None,
        }
    }

    /// The suffix written after the container path.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "ro",
            Self::ReadWrite => "rw",
        }
    }
}

/// A `hostPath:containerPath[:mode]` mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMapping {
    /// Path on the host (relative paths are relative to the project dir).
    pub host_path: String,
    /// Mount point inside the container.
    pub container_path: String,
    /// Explicit access mode, if written.
    pub mode: Option<AccessMode>,
}

impl VolumeMapping {
    /// Whether the source is a host path rather than a named volume.
    ///
    /// Short syntax treats a source starting with `.`, `/` or `~` as a bind
    /// mount and anything else as the name of a volume.
    #[must_use]
    pub fn is_bind_mount(&self) -> bool {
        self.host_path.starts_with(['.', '/', '~'])
    }

    /// Whether the mount is read-only inside the container.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.mode == Some(AccessMode::ReadOnly)
    }
}

impl fmt::Display for VolumeMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host_path, self.container_path)?;
        if let Some(mode) = self.mode {
            write!(f, ":{}", mode.as_str())?;
        }
        Ok(())
    }
}

/// Transport protocol of a published port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// `tcp` (the default)
    Tcp,
    /// `udp`
    Udp,
}

impl Protocol {
    /// Parses `tcp` / `udp`.
    #[must_use]
    pub fn from_suffix(text: &str) -> Option<Self> {
        match text {
            "tcp" => Some(Self::Tcp),
            "udp" => Some(Self::Udp),
            _ => None,
        }
    }

    /// Lower-case protocol name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

/// A `[bindAddress:]hostPort:containerPort[/protocol]` mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    /// Interface to bind on the host; all interfaces when `None`.
    pub bind_address: Option<IpAddr>,
    /// Port published on the host.
    pub host_port: u16,
    /// Port the service listens on inside the container.
    pub container_port: u16,
    /// Explicit protocol, if written.
    pub protocol: Option<Protocol>,
}

impl PortMapping {
    /// Protocol in effect: the explicit one or TCP.
    #[must_use]
    pub fn effective_protocol(&self) -> Protocol {
        self.protocol.unwrap_or(Protocol::Tcp)
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bind_address {
            Some(IpAddr::V6(addr)) => write!(f, "[{addr}]:")?,
            Some(IpAddr::V4(addr)) => write!(f, "{addr}:")?,
            None => {}
        }
        write!(f, "{}:{}", self.host_port, self.container_port)?;
        if let Some(protocol) = self.protocol {
            write!(f, "/{}", protocol.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::*;

    #[test]
    fn port_display_with_ipv4_bind() {
        let port = PortMapping {
            bind_address: Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            host_port: 27017,
            container_port: 27017,
            protocol: None,
        };
        assert_eq!(port.to_string(), "127.0.0.1:27017:27017");
        assert_eq!(port.effective_protocol(), Protocol::Tcp);
    }

    #[test]
    fn port_display_with_ipv6_bind_and_protocol() {
        let port = PortMapping {
            bind_address: Some(IpAddr::V6(Ipv6Addr::LOCALHOST)),
            host_port: 5353,
            container_port: 53,
            protocol: Some(Protocol::Udp),
        };
        assert_eq!(port.to_string(), "[::1]:5353:53/udp");
    }

    #[test]
    fn volume_display_with_mode() {
        let volume = VolumeMapping {
            host_path: "./mongodb".into(),
            container_path: "/data".into(),
            mode: Some(AccessMode::ReadOnly),
        };
        assert_eq!(volume.to_string(), "./mongodb:/data:ro");
    }

    #[test]
    fn volume_source_kinds() {
        let volume = |host: &str| VolumeMapping {
            host_path: host.into(),
            container_path: "/data/db".into(),
            mode: None,
        };
        assert!(volume("./mongodb").is_bind_mount());
        assert!(volume("/srv/mongo").is_bind_mount());
        assert!(volume("~/mongo").is_bind_mount());
        assert!(volume("..").is_bind_mount());
        assert!(!volume("mongodata").is_bind_mount());
        assert!(!volume("mongodata").is_read_only());
    }

    #[test]
    fn service_deserialization_checks_container_name() {
        let json = r#"{"name":"mongo","image":"mongo:7.0.4","container_name":"%s",
            "environment":[],"volumes":[],"ports":[],"depends_on":[]}"#;
        let ok: ServiceDescriptor =
            serde_json::from_str(&json.replace("%s", "mongo")).expect("valid name");
        assert_eq!(ok.container_name.as_ref().map(ContainerName::as_str), Some("mongo"));
        assert!(serde_json::from_str::<ServiceDescriptor>(&json.replace("%s", "-mongo")).is_err());
    }

    #[test]
    fn document_service_lookup() {
        let image = ImageRef::parse("mongo:7.0.4").expect("image");
        let doc = ComposeDocument {
            services: vec![ServiceDescriptor::new("mongo", image)],
            ..ComposeDocument::default()
        };
        assert!(doc.service("mongo").is_some());
        assert!(doc.service("redis").is_none());
    }
}
