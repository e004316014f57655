//! Field splitting for `environment`, `volumes` and `ports` entries.
//!
//! Errors returned here carry no line number; the caller attaches the line
//! of the entry being parsed.

use std::net::IpAddr;

use crate::error::{ParseError, ParseErrorKind, ParseResult};
use crate::value::ValueExpr;

use super::ast::{AccessMode, EnvEntry, PortMapping, Protocol, VolumeMapping};

fn malformed(message: String) -> ParseError {
    ParseError::new(ParseErrorKind::MalformedEntry, message)
}

fn invalid(message: String) -> ParseError {
    ParseError::new(ParseErrorKind::InvalidValue, message)
}

/// Checks an environment variable name against POSIX conventions.
///
/// # Errors
///
/// Returns [`ParseErrorKind::InvalidValue`] if the name does not match
/// `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_env_key(key: &str) -> ParseResult<()> {
    let mut chars = key.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(invalid(format!(
            "environment variable name \"{key}\" must match [A-Za-z_][A-Za-z0-9_]*"
        )))
    }
}

/// Builds an environment entry from an already-split key and raw value.
///
/// # Errors
///
/// Fails if the key is not a valid variable name or the value holds a
/// malformed placeholder.
pub fn env_pair(key: &str, raw_value: &str) -> ParseResult<EnvEntry> {
    if key.is_empty() {
        return Err(malformed(format!(
            "environment entry \"{key}={raw_value}\" has an empty name"
        )));
    }
    validate_env_key(key)?;
    let value = ValueExpr::parse(raw_value)
        .map_err(|e| malformed(format!("environment entry \"{key}\": {e}")))?;
    Ok(EnvEntry {
        key: key.to_string(),
        value,
    })
}

/// Parses a `KEY=VALUE` list item. The value may itself contain `=`.
///
/// # Errors
///
/// Returns [`ParseErrorKind::MalformedEntry`] when there is no `=` or the
/// name is empty.
pub fn parse_env_item(text: &str) -> ParseResult<EnvEntry> {
    let (key, value) = text
        .split_once('=')
        .ok_or_else(|| malformed(format!("environment entry \"{text}\" is not KEY=VALUE")))?;
    env_pair(key, value)
}

/// Parses a `hostPath:containerPath[:ro|rw]` list item.
///
/// # Errors
///
/// Returns [`ParseErrorKind::MalformedEntry`] for the wrong number of fields
/// or empty paths, [`ParseErrorKind::InvalidValue`] for a relative container
/// path or an unknown mode.
pub fn parse_volume(text: &str) -> ParseResult<VolumeMapping> {
    let fields: Vec<&str> = text.split(':').collect();
    let (host_path, container_path, mode) = match fields.as_slice() {
        [host, container] => (*host, *container, None),
        [host, container, mode] => {
            let mode = AccessMode::from_suffix(mode).ok_or_else(|| {
                invalid(format!(
                    "volume \"{text}\" has unknown mode \"{mode}\" (expected ro or rw)"
                ))
            })?;
            (*host, *container, Some(mode))
        }
        _ => {
            return Err(malformed(format!(
                "volume \"{text}\" is not hostPath:containerPath[:mode]"
            )));
        }
    };

    if host_path.is_empty() || container_path.is_empty() {
        return Err(malformed(format!(
            "volume \"{text}\" has an empty host or container path"
        )));
    }
    if !container_path.starts_with('/') {
        return Err(invalid(format!(
            "volume \"{text}\": container path must be absolute"
        )));
    }

    Ok(VolumeMapping {
        host_path: host_path.to_string(),
        container_path: container_path.to_string(),
        mode,
    })
}

fn port_number(field: &str, entry: &str) -> ParseResult<u16> {
    if field.is_empty() {
        return Err(malformed(format!("port entry \"{entry}\" has an empty port")));
    }
    if field.contains('-') {
        return Err(invalid(format!(
            "port entry \"{entry}\": port ranges are not supported"
        )));
    }
    if !field.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid(format!(
            "port entry \"{entry}\": \"{field}\" is not a number"
        )));
    }
    match field.parse::<u16>() {
        Ok(port) if port >= 1 => Ok(port),
        _ => Err(invalid(format!(
            "port entry \"{entry}\": {field} is outside 1-65535"
        ))),
    }
}

fn bind_address(field: &str, entry: &str) -> ParseResult<IpAddr> {
    if field.is_empty() {
        return Err(malformed(format!(
            "port entry \"{entry}\" has an empty bind address"
        )));
    }
    field.parse().map_err(|_| {
        invalid(format!(
            "port entry \"{entry}\": \"{field}\" is not an IP address"
        ))
    })
}

/// Parses a `[bindAddress:]hostPort:containerPort[/protocol]` list item.
///
/// IPv6 bind addresses are written in brackets: `[::1]:27017:27017`.
///
/// # Errors
///
/// Returns [`ParseErrorKind::MalformedEntry`] when the entry does not split
/// into two or three fields, [`ParseErrorKind::InvalidValue`] for ports
/// outside 1-65535, bad addresses, or unknown protocols.
pub fn parse_port(text: &str) -> ParseResult<PortMapping> {
    let (body, protocol) = match text.rsplit_once('/') {
        Some((body, suffix)) => {
            let protocol = Protocol::from_suffix(suffix).ok_or_else(|| {
                invalid(format!(
                    "port entry \"{text}\" has unknown protocol \"{suffix}\""
                ))
            })?;
            (body, Some(protocol))
        }
        None => (text, None),
    };

    let (bracketed, rest) = match body.strip_prefix('[') {
        Some(stripped) => {
            let (addr, rest) = stripped.split_once("]:").ok_or_else(|| {
                malformed(format!(
                    "port entry \"{text}\": bracketed address must be followed by ':'"
                ))
            })?;
            (Some(addr), rest)
        }
        None => (None, body),
    };

    let fields: Vec<&str> = rest.split(':').collect();
    let (bind, host, container) = match (bracketed, fields.as_slice()) {
        (Some(addr), [host, container]) => (Some(bind_address(addr, text)?), *host, *container),
        (None, [addr, host, container]) => {
            (Some(bind_address(addr, text)?), *host, *container)
        }
        (None, [host, container]) => (None, *host, *container),
        _ => {
            return Err(malformed(format!(
                "port entry \"{text}\" is not [bindAddress:]hostPort:containerPort"
            )));
        }
    };

    Ok(PortMapping {
        bind_address: bind,
        host_port: port_number(host, text)?,
        container_port: port_number(container, text)?,
        protocol,
    })
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::*;

    #[test]
    fn env_item_splits_on_first_equals() {
        let entry = parse_env_item("OPTS=a=b").expect("should parse");
        assert_eq!(entry.key, "OPTS");
        assert_eq!(entry.value.to_string(), "a=b");
    }

    #[test]
    fn env_item_allows_empty_value() {
        let entry = parse_env_item("EMPTY=").expect("should parse");
        assert!(entry.value.segments().is_empty());
    }

    #[test]
    fn env_item_without_equals_is_malformed() {
        let err = parse_env_item("MONGOUSER").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MalformedEntry);
    }

    #[test]
    fn env_item_with_empty_key_is_malformed() {
        let err = parse_env_item("=value").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MalformedEntry);
    }

    #[test]
    fn env_item_with_bad_key_is_invalid() {
        let err = parse_env_item("1BAD=x").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidValue);
        let err = parse_env_item("MY-VAR=x").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidValue);
    }

    #[test]
    fn env_item_with_broken_placeholder_is_malformed() {
        let err = parse_env_item("USER=${MONGOUSER").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MalformedEntry);
    }

    #[test]
    fn volume_pair() {
        let v = parse_volume("./mongodb:/data").expect("should parse");
        assert_eq!(v.host_path, "./mongodb");
        assert_eq!(v.container_path, "/data");
        assert_eq!(v.mode, None);
    }

    #[test]
    fn volume_with_mode() {
        let v = parse_volume("/etc/mongod.conf:/etc/mongod.conf:ro").expect("should parse");
        assert_eq!(v.mode, Some(AccessMode::ReadOnly));
    }

    #[test]
    fn volume_errors() {
        assert_eq!(
            parse_volume("./mongodb").unwrap_err().kind,
            ParseErrorKind::MalformedEntry
        );
        assert_eq!(
            parse_volume(":/data").unwrap_err().kind,
            ParseErrorKind::MalformedEntry
        );
        assert_eq!(
            parse_volume("a:/b:c:d").unwrap_err().kind,
            ParseErrorKind::MalformedEntry
        );
        assert_eq!(
            parse_volume("./mongodb:/data:rx").unwrap_err().kind,
            ParseErrorKind::InvalidValue
        );
        assert_eq!(
            parse_volume("./mongodb:data").unwrap_err().kind,
            ParseErrorKind::InvalidValue
        );
    }

    #[test]
    fn port_with_bind_address() {
        let p = parse_port("127.0.0.1:27017:27017").expect("should parse");
        assert_eq!(p.bind_address, Some(IpAddr::V4(Ipv4Addr::LOCALHOST)));
        assert_eq!(p.host_port, 27017);
        assert_eq!(p.container_port, 27017);
        assert_eq!(p.protocol, None);
    }

    #[test]
    fn port_without_bind_address() {
        let p = parse_port("27018:27017").expect("should parse");
        assert_eq!(p.bind_address, None);
        assert_eq!(p.host_port, 27018);
        assert_eq!(p.container_port, 27017);
    }

    #[test]
    fn port_with_ipv6_and_protocol() {
        let p = parse_port("[::1]:27017:27017/tcp").expect("should parse");
        assert_eq!(p.bind_address, Some(IpAddr::V6(Ipv6Addr::LOCALHOST)));
        assert_eq!(p.protocol, Some(Protocol::Tcp));
    }

    #[test]
    fn single_port_is_malformed() {
        let err = parse_port("27017").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MalformedEntry);
    }

    #[test]
    fn too_many_fields_is_malformed() {
        let err = parse_port("1:2:3:4").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MalformedEntry);
    }

    #[test]
    fn empty_port_is_malformed() {
        let err = parse_port("127.0.0.1::27017").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MalformedEntry);
    }

    #[test]
    fn out_of_range_ports_are_invalid() {
        assert_eq!(
            parse_port("0:27017").unwrap_err().kind,
            ParseErrorKind::InvalidValue
        );
        assert_eq!(
            parse_port("65536:27017").unwrap_err().kind,
            ParseErrorKind::InvalidValue
        );
        assert_eq!(
            parse_port("http:27017").unwrap_err().kind,
            ParseErrorKind::InvalidValue
        );
        assert_eq!(
            parse_port("27017-27019:27017").unwrap_err().kind,
            ParseErrorKind::InvalidValue
        );
    }

    #[test]
    fn bad_bind_address_and_protocol_are_invalid() {
        assert_eq!(
            parse_port("localhost:27017:27017").unwrap_err().kind,
            ParseErrorKind::InvalidValue
        );
        assert_eq!(
            parse_port("27017:27017/sctp").unwrap_err().kind,
            ParseErrorKind::InvalidValue
        );
    }

    #[test]
    fn port_bounds_are_accepted() {
        let p = parse_port("1:65535").expect("should parse");
        assert_eq!((p.host_port, p.container_port), (1, 65535));
    }
}
