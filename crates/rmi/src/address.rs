use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::str::FromStr;

use crate::protocol::error::RmiError;

/// Host and port a stub sends its calls to.
///
/// The host is kept as given (name or literal) and only resolved when a
/// connection is opened, so two addresses compare by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteAddress {
    host: String,
    port: u16,
}

impl RemoteAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Address to advertise for a listener bound to `addr`.
    ///
    /// A wildcard bind is replaced by a best-effort local host: the address
    /// of the interface used for outbound traffic, else loopback. This is
    /// not guaranteed to be reachable across NAT.
    pub fn advertised(addr: SocketAddr) -> Self {
        let ip = if addr.ip().is_unspecified() {
            local_host(addr.is_ipv4())
        } else {
            addr.ip()
        };
        Self::new(ip.to_string(), addr.port())
    }
}

impl From<SocketAddr> for RemoteAddress {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

impl From<(&str, u16)> for RemoteAddress {
    fn from((host, port): (&str, u16)) -> Self {
        Self::new(host, port)
    }
}

impl From<(String, u16)> for RemoteAddress {
    fn from((host, port): (String, u16)) -> Self {
        Self::new(host, port)
    }
}

impl FromStr for RemoteAddress {
    type Err = RmiError;

    /// Parses `host:port`, with IPv6 literals in brackets (`[::1]:7000`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| RmiError::Protocol(format!("Invalid address '{}': missing port", s)))?;
        let port = port
            .parse::<u16>()
            .map_err(|e| RmiError::Protocol(format!("Invalid address '{}': {}", s, e)))?;
        let host = host.strip_prefix('[').and_then(|h| h.strip_suffix(']')).unwrap_or(host);
        if host.is_empty() {
            return Err(RmiError::Protocol(format!("Invalid address '{}': missing host", s)));
        }
        Ok(Self::new(host, port))
    }
}

impl fmt::Display for RemoteAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

fn local_host(v4: bool) -> IpAddr {
    // Connecting a UDP socket sends nothing; it only selects a route.
    let route_source = |bind: SocketAddr, target: SocketAddr| -> Option<IpAddr> {
        let socket = UdpSocket::bind(bind).ok()?;
        socket.connect(target).ok()?;
        let ip = socket.local_addr().ok()?.ip();
        (!ip.is_unspecified()).then_some(ip)
    };

    if v4 {
        route_source(
            SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 0),
            SocketAddr::new(Ipv4Addr::new(192, 0, 2, 1).into(), 9),
        )
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
    } else {
        route_source(
            SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), 0),
            SocketAddr::new(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1).into(), 9),
        )
        .unwrap_or(IpAddr::V6(Ipv6Addr::LOCALHOST))
    }
}
