//! Daemon network endpoints.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::daemon::DEFAULT_PORT;

/// Errors from parsing a `host:port` string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseEndpointError {
    /// No host before the colon.
    #[error("missing host in endpoint {0:?}")]
    MissingHost(String),

    /// Port is not a valid non-zero u16.
    #[error("invalid port in endpoint {0:?}")]
    InvalidPort(String),

    /// An IPv6 host not written as `[addr]` or `[addr]:port`.
    #[error("IPv6 host must be bracketed in endpoint {0:?}")]
    UnbracketedIpv6(String),
}

/// A `host:port` address a daemon listens on or connects to.
///
/// IPv6 hosts are written `[addr]:port`; `host` holds the bare address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Endpoint {
    /// Hostname or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Endpoint {
    /// Create an endpoint from its parts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for Endpoint {
    type Err = ParseEndpointError;

    /// Parse `host:port` or `[addr]:port`. A bare host gets the daemon's
    /// default port.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = match s.strip_prefix('[') {
            Some(rest) => {
                let (host, tail) = rest
                    .split_once(']')
                    .ok_or_else(|| ParseEndpointError::UnbracketedIpv6(s.to_string()))?;
                let port = match tail {
                    "" => DEFAULT_PORT,
                    _ => tail
                        .strip_prefix(':')
                        .and_then(parse_port)
                        .ok_or_else(|| ParseEndpointError::InvalidPort(s.to_string()))?,
                };
                (host, port)
            }
            None => match s.rsplit_once(':') {
                Some((host, _)) if host.contains(':') => {
                    return Err(ParseEndpointError::UnbracketedIpv6(s.to_string()));
                }
                Some((host, port)) => {
                    let port = parse_port(port)
                        .ok_or_else(|| ParseEndpointError::InvalidPort(s.to_string()))?;
                    (host, port)
                }
                None => (s, DEFAULT_PORT),
            },
        };

        if host.is_empty() {
            return Err(ParseEndpointError::MissingHost(s.to_string()));
        }

        Ok(Self::new(host, port))
    }
}

fn parse_port(port: &str) -> Option<u16> {
    port.parse::<u16>().ok().filter(|p| *p != 0)
}

impl TryFrom<String> for Endpoint {
    type Error = ParseEndpointError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_host_and_port() {
        let ep: Endpoint = "127.0.0.2:1990".parse().unwrap();
        assert_eq!(ep.host, "127.0.0.2");
        assert_eq!(ep.port, 1990);
        assert_eq!(ep.to_string(), "127.0.0.2:1990");
    }

    #[test]
    fn bare_host_uses_default_port() {
        let ep: Endpoint = "db-3".parse().unwrap();
        assert_eq!(ep, Endpoint::new("db-3", 1982));
    }

    #[test]
    fn rejects_bad_port() {
        assert_eq!(
            "host:99999".parse::<Endpoint>(),
            Err(ParseEndpointError::InvalidPort("host:99999".into()))
        );
        assert!("host:0".parse::<Endpoint>().is_err());
        assert!("host:abc".parse::<Endpoint>().is_err());
    }

    #[test]
    fn rejects_missing_host() {
        assert_eq!(
            ":1982".parse::<Endpoint>(),
            Err(ParseEndpointError::MissingHost(":1982".into()))
        );
    }

    #[test]
    fn bracketed_ipv6_host() {
        let ep: Endpoint = "[::1]:1990".parse().unwrap();
        assert_eq!(ep, Endpoint::new("::1", 1990));
        assert_eq!(ep.to_string(), "[::1]:1990");

        let ep: Endpoint = "[fe80::2]".parse().unwrap();
        assert_eq!(ep, Endpoint::new("fe80::2", 1982));
        assert_eq!(ep.to_string().parse::<Endpoint>().unwrap(), ep);
    }

    #[test]
    fn rejects_unbracketed_ipv6() {
        assert_eq!(
            "::1".parse::<Endpoint>(),
            Err(ParseEndpointError::UnbracketedIpv6("::1".into()))
        );
        assert!(matches!(
            "fe80::2:1982".parse::<Endpoint>(),
            Err(ParseEndpointError::UnbracketedIpv6(_))
        ));
        assert!(matches!(
            "[::1".parse::<Endpoint>(),
            Err(ParseEndpointError::UnbracketedIpv6(_))
        ));
        assert!(matches!(
            "[::1]1982".parse::<Endpoint>(),
            Err(ParseEndpointError::InvalidPort(_))
        ));
        assert!(matches!(
            "[]:1982".parse::<Endpoint>(),
            Err(ParseEndpointError::MissingHost(_))
        ));
    }

    #[test]
    fn deserializes_from_string() {
        #[derive(Deserialize)]
        struct Wrapper {
            hosts: Vec<Endpoint>,
        }

        let w: Wrapper = toml::from_str(r#"hosts = ["10.0.0.1:1982", "10.0.0.2"]"#).unwrap();
        assert_eq!(w.hosts.len(), 2);
        assert_eq!(w.hosts[1].port, 1982);
    }
}
