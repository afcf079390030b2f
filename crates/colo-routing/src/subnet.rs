/// Co-location predicates between endpoints.
///
/// Two IPv4 endpoints sharing their top 24 bits are treated as running on
/// the same host. Non-IPv4 and non-socket endpoints never match; mixed
/// address families are expected, so a mismatch is only traced.
use std::net::Ipv4Addr;

use crate::address::Address;

/// Prefix length used by [`share_subnet`].
pub const DEFAULT_PREFIX_LEN: u8 = 24;

/// True iff both endpoints are IPv4 socket endpoints whose first three
/// octets are equal. Ports and metadata are ignored.
pub fn share_subnet(a: &Address, b: &Address) -> bool {
    match ipv4_pair(a, b) {
        Some((x, y)) => {
            let (x, y) = (x.octets(), y.octets());
            x[0] == y[0] && x[1] == y[1] && x[2] == y[2]
        }
        None => false,
    }
}

/// True iff both endpoints are IPv4 and agree on the top `prefix_len` bits.
/// A prefix of 0 matches any pair of IPv4 endpoints; lengths above 32 are
/// treated as 32.
pub fn share_prefix(a: &Address, b: &Address, prefix_len: u8) -> bool {
    match ipv4_pair(a, b) {
        Some((x, y)) => {
            let mask = netmask(prefix_len);
            u32::from(x) & mask == u32::from(y) & mask
        }
        None => false,
    }
}

/// True iff both endpoints are IPv4 with the same host address.
pub fn same_host(a: &Address, b: &Address) -> bool {
    matches!(ipv4_pair(a, b), Some((x, y)) if x == y)
}

fn netmask(prefix_len: u8) -> u32 {
    match prefix_len.min(32) {
        0 => 0,
        len => u32::MAX << (32 - u32::from(len)),
    }
}

fn ipv4_pair(a: &Address, b: &Address) -> Option<(Ipv4Addr, Ipv4Addr)> {
    match (a.ipv4(), b.ipv4()) {
        (Some(x), Some(y)) => Some((x, y)),
        _ => {
            tracing::trace!("no subnet match between {a} and {b}: not both IPv4");
            None
        }
    }
}

/// How destination endpoints are paired with relay endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Relays on the same IPv4 subnet of the given prefix length.
    Subnet { prefix_len: u8 },
    /// Relays using host networking: same IPv4 host address.
    SameHost,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        MatchPolicy::Subnet {
            prefix_len: DEFAULT_PREFIX_LEN,
        }
    }
}

impl MatchPolicy {
    /// Whether `relay` is co-located with `dest` under this policy.
    pub fn matches(&self, dest: &Address, relay: &Address) -> bool {
        match *self {
            MatchPolicy::Subnet {
                prefix_len: DEFAULT_PREFIX_LEN,
            } => share_subnet(dest, relay),
            MatchPolicy::Subnet { prefix_len } => share_prefix(dest, relay, prefix_len),
            MatchPolicy::SameHost => same_host(dest, relay),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    #[test]
    fn same_slash_24_matches() {
        assert!(share_subnet(&addr("10.1.2.5:80"), &addr("10.1.2.9:9999")));
        assert!(share_subnet(&addr("10.1.2.9:9999"), &addr("10.1.2.5:80")));
    }

    #[test]
    fn each_of_first_three_octets_matters() {
        let base = addr("10.1.2.5:80");
        assert!(!share_subnet(&base, &addr("11.1.2.5:80")));
        assert!(!share_subnet(&base, &addr("10.2.2.5:80")));
        assert!(!share_subnet(&base, &addr("10.1.3.5:80")));
        assert!(share_subnet(&base, &addr("10.1.2.200:80")));
    }

    #[test]
    fn non_ipv4_never_matches() {
        let v4 = addr("10.1.2.5:80");
        let v6 = addr("[fd00::1]:80");
        let unix = addr("unix:///run/relay.sock");
        assert!(!share_subnet(&v4, &v6));
        assert!(!share_subnet(&v6, &v6));
        assert!(!share_subnet(&v4, &unix));
        assert!(!share_subnet(&unix, &unix));
    }

    #[test]
    fn prefix_lengths() {
        let a = addr("10.1.2.5:80");
        let b = addr("10.1.3.5:80");
        assert!(share_prefix(&a, &b, 16));
        assert!(share_prefix(&a, &b, 23));
        assert!(!share_prefix(&a, &b, 24));
        assert!(share_prefix(&a, &addr("10.1.2.5:1"), 32));
        assert!(!share_prefix(&a, &addr("10.1.2.6:80"), 32));
        assert!(share_prefix(&a, &addr("192.168.0.1:80"), 0));
        assert!(!share_prefix(&a, &b, 200));
    }

    #[test]
    fn same_host_ignores_port() {
        assert!(same_host(&addr("10.1.2.5:80"), &addr("10.1.2.5:4140")));
        assert!(!same_host(&addr("10.1.2.5:80"), &addr("10.1.2.6:80")));
    }

    #[test]
    fn policy_dispatch() {
        let d = addr("10.1.2.5:80");
        let r = addr("10.1.2.9:4140");
        assert!(MatchPolicy::default().matches(&d, &r));
        assert!(!MatchPolicy::SameHost.matches(&d, &r));
        assert!(!MatchPolicy::Subnet { prefix_len: 30 }.matches(&d, &r));
        assert!(MatchPolicy::Subnet { prefix_len: 28 }.matches(&d, &r));
    }
}
