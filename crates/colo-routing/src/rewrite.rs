/// Per-destination rewriting onto co-located relays.
///
/// A bound destination's endpoints are replaced by every relay endpoint
/// co-located with at least one of them. Only the bound state is
/// rewritten: pending, negative and failed destinations pass through so
/// consumers can tell "no co-located relay" (bound, empty) apart from
/// "destination unresolvable".
use colo_var::Var;

use crate::address::{Addr, AddressSet};
use crate::name::BoundName;
use crate::subnet::MatchPolicy;

/// Relay endpoints co-located with any of `dests`.
pub fn co_located(dests: &AddressSet, relays: &AddressSet, policy: MatchPolicy) -> AddressSet {
    relays
        .iter()
        .filter(|relay| dests.iter().any(|dest| policy.matches(dest, relay)))
        .cloned()
        .collect()
}

/// Rewrite one resolution state against a relay snapshot.
pub fn rewrite_state(addr: &Addr, relays: &AddressSet, policy: MatchPolicy) -> Addr {
    match addr {
        Addr::Bound { addrs, meta } => Addr::Bound {
            addrs: co_located(addrs, relays, policy),
            meta: meta.clone(),
        },
        other => other.clone(),
    }
}

/// A dynamic address following `addr` and `relays`, recomputed when
/// either changes.
pub fn rewrite_addr(addr: &Var<Addr>, relays: &Var<AddressSet>, policy: MatchPolicy) -> Var<Addr> {
    addr.join(relays)
        .map(move |(addr, relays)| rewrite_state(addr, relays, policy))
}

/// `bound` with its address rewritten; identity is kept.
pub fn rewrite_bound(bound: &BoundName, relays: &Var<AddressSet>, policy: MatchPolicy) -> BoundName {
    bound.with_addr(rewrite_addr(bound.addr(), relays, policy))
}
