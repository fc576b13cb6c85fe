//! Turning a report row into an `ip:port` endpoint.

use std::fmt;

use crate::config::{HeaderMarkers, DEFAULT_PORT, IP_PLACEHOLDER};
use crate::report::{find_field, Row};

/// An address and port as they appear in the output files.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub ip: String,
    pub port: String,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ip.contains(':') {
            write!(f, "[{}]:{}", self.ip, self.port)
        } else {
            write!(f, "{}:{}", self.ip, self.port)
        }
    }
}

/// Extracts the endpoint of one report row.
///
/// The port column wins over a port embedded in the IP value; with neither,
/// the port defaults to 443. Returns `None` for rows without a usable IP.
pub fn normalize_row(row: &Row, markers: &HeaderMarkers) -> Option<Endpoint> {
    let raw_ip = find_field(row, &[markers.ip, markers.address]).unwrap_or_default();
    let column_port = find_field(row, &[markers.port]).filter(|p| !p.is_empty());

    let (ip, embedded_port) = split_embedded_port(raw_ip);
    if ip.is_empty() || ip == IP_PLACEHOLDER {
        return None;
    }

    let port = column_port.or(embedded_port).unwrap_or(DEFAULT_PORT);
    Some(Endpoint {
        ip: ip.to_string(),
        port: port.to_string(),
    })
}

/// Splits `1.2.3.4:8443` and `[2606:4700::1]:8443`.
///
/// A bare IPv6 address has several colons and carries no port.
fn split_embedded_port(value: &str) -> (&str, Option<&str>) {
    if let Some(rest) = value.strip_prefix('[') {
        if let Some((addr, tail)) = rest.split_once(']') {
            let port = tail.strip_prefix(':').filter(|p| !p.is_empty());
            return (addr, port);
        }
    }
    match value.split_once(':') {
        Some((addr, port)) if !port.contains(':') => {
            (addr, Some(port).filter(|p| !p.is_empty()))
        }
        _ => (value, None),
    }
}
