use std::{fmt, str::FromStr};

use crate::error::WorkerErr;

/// The transport scheme of an `Endpoint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Length delimited frames over a raw TCP stream.
    Tcp,
    /// One frame per binary message over a plain WebSocket.
    Ws,
    /// One frame per binary message over a TLS WebSocket.
    Wss,
}

impl Scheme {
    fn parse(scheme: &str) -> Option<Self> {
        match scheme {
            "tcp" => Some(Self::Tcp),
            "ws" => Some(Self::Ws),
            "wss" => Some(Self::Wss),
            _ => None,
        }
    }

    fn default_port(self) -> Option<u16> {
        match self {
            Self::Tcp => None,
            Self::Ws => Some(80),
            Self::Wss => Some(443),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Ws => "ws",
            Self::Wss => "wss",
        }
    }
}

/// The network address of a remote parameter source.
///
/// Accepted forms are `tcp://host:port`, `ws://host[:port][/path]` and
/// `wss://host[:port][/path]`. IPv6 hosts go between brackets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    scheme: Scheme,
    host: String,
    port: u16,
    path: Option<String>,
}

impl Endpoint {
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The resource path for WebSocket endpoints, without its leading slash.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// The `host:port` pair to open a socket against.
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    fn invalid<T>(uri: &str, reason: impl Into<String>) -> Result<T, WorkerErr> {
        Err(WorkerErr::InvalidEndpoint {
            uri: uri.to_string(),
            reason: reason.into(),
        })
    }

    /// Splits `host[:port]`, handling bracketed IPv6 literals.
    fn split_authority<'a>(uri: &str, authority: &'a str) -> Result<(&'a str, Option<&'a str>), WorkerErr> {
        if let Some(rest) = authority.strip_prefix('[') {
            let Some((host, tail)) = rest.split_once(']') else {
                return Self::invalid(uri, "unterminated IPv6 host");
            };

            return match tail {
                "" => Ok((host, None)),
                tail => match tail.strip_prefix(':') {
                    Some(port) => Ok((host, Some(port))),
                    None => Self::invalid(uri, "unexpected characters after IPv6 host"),
                },
            };
        }

        match authority.rsplit_once(':') {
            Some((host, port)) => Ok((host, Some(port))),
            None => Ok((authority, None)),
        }
    }
}

impl FromStr for Endpoint {
    type Err = WorkerErr;

    fn from_str(uri: &str) -> Result<Self, Self::Err> {
        let Some((scheme, rest)) = uri.split_once("://") else {
            return Self::invalid(uri, "expected scheme://host:port");
        };

        let Some(scheme) = Scheme::parse(scheme) else {
            return Self::invalid(
                uri,
                format!("unsupported scheme '{scheme}', expected tcp, ws or wss"),
            );
        };

        let (authority, path) = match rest.split_once('/') {
            Some((authority, path)) => (authority, Some(path)),
            None => (rest, None),
        };

        let path = match (scheme, path) {
            (_, None | Some("")) => None,
            (Scheme::Tcp, Some(_)) => return Self::invalid(uri, "tcp endpoints take no path"),
            (_, Some(path)) => Some(path.to_string()),
        };

        let (host, port) = Self::split_authority(uri, authority)?;
        if host.is_empty() {
            return Self::invalid(uri, "missing host");
        }

        let port = match (port, scheme.default_port()) {
            (Some(port), _) => match port.parse::<u16>() {
                Ok(port) => port,
                Err(e) => return Self::invalid(uri, format!("invalid port '{port}': {e}")),
            },
            (None, Some(port)) => port,
            (None, None) => return Self::invalid(uri, "missing port"),
        };

        Ok(Self {
            scheme,
            host: host.to_string(),
            port,
            path,
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme.as_str(), self.authority())?;
        if let Some(path) = &self.path {
            write!(f, "/{path}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(uri: &str) -> Endpoint {
        uri.parse().unwrap()
    }

    #[test]
    fn tcp() {
        let endpoint = parse("tcp://127.0.0.1:3042");
        assert_eq!(endpoint.scheme(), Scheme::Tcp);
        assert_eq!(endpoint.host(), "127.0.0.1");
        assert_eq!(endpoint.port(), 3042);
        assert_eq!(endpoint.path(), None);
        assert_eq!(endpoint.authority(), "127.0.0.1:3042");
    }

    #[test]
    fn wss_with_job_path() {
        let endpoint = parse("wss://127.0.0.1:3044/some/job");
        assert_eq!(endpoint.scheme(), Scheme::Wss);
        assert_eq!(endpoint.port(), 3044);
        assert_eq!(endpoint.path(), Some("some/job"));
        assert_eq!(endpoint.to_string(), "wss://127.0.0.1:3044/some/job");
    }

    #[test]
    fn websocket_default_ports() {
        assert_eq!(parse("wss://example.com/job").port(), 443);
        assert_eq!(parse("ws://example.com").port(), 80);
    }

    #[test]
    fn ipv6_host() {
        let endpoint = parse("tcp://[::1]:3042");
        assert_eq!(endpoint.host(), "::1");
        assert_eq!(endpoint.authority(), "[::1]:3042");
        assert_eq!(endpoint.to_string(), "tcp://[::1]:3042");
    }

    #[test]
    fn trailing_slash_is_no_path() {
        assert_eq!(parse("tcp://localhost:1/").path(), None);
    }

    #[test]
    fn rejects_malformed_uris() {
        for uri in [
            "127.0.0.1:3042",
            "udp://127.0.0.1:3043",
            "tcp://127.0.0.1",
            "tcp://:3042",
            "tcp://127.0.0.1:70000",
            "tcp://127.0.0.1:3042/job",
            "tcp://[::1:3042",
        ] {
            let err = uri.parse::<Endpoint>().unwrap_err();
            assert!(
                matches!(err, WorkerErr::InvalidEndpoint { .. }),
                "{uri} gave {err}"
            );
        }
    }
}
