//! Endpoint parsing

use crate::error::{Error, Result};
use std::fmt;
use std::path::PathBuf;

/// Listening endpoint for the server host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Unix domain socket at the given path
    Unix(PathBuf),
    /// TCP `host:port`
    Tcp(String),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Unix(path) => write!(f, "unix://{}", path.display()),
            Endpoint::Tcp(addr) => write!(f, "tcp://{}", addr),
        }
    }
}

/// Parse `unix://<path>` or `tcp://<host:port>`; the scheme is case-insensitive
pub fn parse_endpoint(endpoint: &str) -> Result<Endpoint> {
    let invalid = |reason: &str| Error::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: reason.to_string(),
    };

    let (scheme, address) = endpoint
        .split_once("://")
        .ok_or_else(|| invalid("missing scheme, expected unix:// or tcp://"))?;
    if address.is_empty() {
        return Err(invalid("missing address"));
    }

    match scheme.to_lowercase().as_str() {
        "unix" => Ok(Endpoint::Unix(PathBuf::from(address))),
        "tcp" => Ok(Endpoint::Tcp(address.to_string())),
        _ => Err(invalid("unsupported scheme, expected unix:// or tcp://")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_unix() {
        assert_eq!(
            parse_endpoint("unix:///var/lib/csi/sockets/pluginproxy/csi.sock").unwrap(),
            Endpoint::Unix(PathBuf::from("/var/lib/csi/sockets/pluginproxy/csi.sock"))
        );
        assert_eq!(
            parse_endpoint("UNIX:///tmp/csi.sock").unwrap(),
            Endpoint::Unix(PathBuf::from("/tmp/csi.sock"))
        );
    }

    #[test]
    fn test_parse_tcp() {
        let endpoint = parse_endpoint("tcp://127.0.0.1:10000").unwrap();
        assert_eq!(endpoint, Endpoint::Tcp("127.0.0.1:10000".into()));
        assert_eq!(endpoint.to_string(), "tcp://127.0.0.1:10000");
    }

    #[test]
    fn test_parse_invalid() {
        assert_matches!(parse_endpoint("/tmp/csi.sock"), Err(Error::InvalidEndpoint { .. }));
        assert_matches!(parse_endpoint("unix://"), Err(Error::InvalidEndpoint { .. }));
        assert_matches!(
            parse_endpoint("http://127.0.0.1:80"),
            Err(Error::InvalidEndpoint { .. })
        );
    }
}
