/// Endpoints and the resolution state of a bound name.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;

use colo_var::Failure;
use serde::{Deserialize, Serialize};

use crate::error::ColoError;

/// Opaque per-address or per-destination metadata, carried unchanged.
pub type Meta = BTreeMap<String, String>;

/// Set of endpoints, ordered for stable output.
pub type AddressSet = BTreeSet<Address>;

/// A network endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Address {
    /// A socket endpoint (IPv4 or IPv6).
    Inet { addr: SocketAddr, meta: Meta },
    /// A non-socket endpoint, e.g. `unix:///run/relay.sock`. Never matches.
    Opaque(String),
}

impl Address {
    pub fn inet(addr: SocketAddr) -> Self {
        Address::Inet {
            addr,
            meta: Meta::new(),
        }
    }

    pub fn opaque(name: impl Into<String>) -> Self {
        Address::Opaque(name.into())
    }

    /// The IPv4 host address, if this is an IPv4 socket endpoint.
    pub fn ipv4(&self) -> Option<Ipv4Addr> {
        match self {
            Address::Inet {
                addr: SocketAddr::V4(v4),
                ..
            } => Some(*v4.ip()),
            _ => None,
        }
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        Address::inet(addr)
    }
}

/// Parses `host:port` socket addresses; anything of the form
/// `scheme://...` becomes an opaque endpoint.
impl FromStr for Address {
    type Err = ColoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(addr) = s.parse::<SocketAddr>() {
            return Ok(Address::inet(addr));
        }
        if s.contains("://") {
            return Ok(Address::opaque(s));
        }
        Err(ColoError::InvalidAddress(s.to_string()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Inet { addr, .. } => write!(f, "{addr}"),
            Address::Opaque(name) => f.write_str(name),
        }
    }
}

/// Resolution state of a bound name.
#[derive(Debug, Clone, PartialEq)]
pub enum Addr {
    /// Resolved to a (possibly empty) set of endpoints.
    Bound { addrs: AddressSet, meta: Meta },
    /// The name does not exist.
    Neg,
    /// No answer yet.
    Pending,
    /// Resolution failed.
    Failed(Failure),
}

impl Addr {
    /// A bound state with no metadata.
    pub fn bound<I>(addrs: I) -> Self
    where
        I: IntoIterator<Item = Address>,
    {
        Addr::Bound {
            addrs: addrs.into_iter().collect(),
            meta: Meta::new(),
        }
    }

    pub fn failed(message: impl fmt::Display) -> Self {
        Addr::Failed(Failure::new(message))
    }

    /// Endpoints of a bound state; `None` otherwise.
    pub fn bound_addrs(&self) -> Option<&AddressSet> {
        match self {
            Addr::Bound { addrs, .. } => Some(addrs),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_socket_and_opaque() {
        let v4: Address = "10.1.2.5:80".parse().unwrap();
        assert_eq!(v4.ipv4(), Some(Ipv4Addr::new(10, 1, 2, 5)));

        let v6: Address = "[fd00::1]:80".parse().unwrap();
        assert!(matches!(v6, Address::Inet { addr, .. } if addr.is_ipv6()));
        assert_eq!(v6.ipv4(), None);

        let unix: Address = "unix:///run/relay.sock".parse().unwrap();
        assert_eq!(unix, Address::opaque("unix:///run/relay.sock"));
        assert_eq!(unix.ipv4(), None);
    }

    #[test]
    fn rejects_garbage() {
        assert!("not-an-address".parse::<Address>().is_err());
        assert!("10.1.2.5".parse::<Address>().is_err());
    }

    #[test]
    fn bound_collects_into_set() {
        let a: Address = "10.1.2.5:80".parse().unwrap();
        let addr = Addr::bound([a.clone(), a.clone()]);
        assert_eq!(addr.bound_addrs().map(|s| s.len()), Some(1));
        assert_eq!(Addr::Pending.bound_addrs(), None);
    }

    #[test]
    fn display_roundtrips_through_parse() {
        let a: Address = "10.0.0.1:4140".parse().unwrap();
        assert_eq!(a.to_string().parse::<Address>().unwrap(), a);
    }
}
