/// Merging relay endpoint sets.
///
/// The relay pool is itself a dynamic resolution tree. Merging flattens
/// it to the bound names currently present and unions their endpoints
/// into one dynamic set. Relays that are pending, negative or failed
/// contribute nothing; the merge itself never fails.
use std::collections::HashSet;

use colo_var::{Activity, State, Var};

use crate::address::{Addr, AddressSet};
use crate::name::BoundName;
use crate::path::Path;
use crate::tree::NameTree;

/// Union of the bound endpoints of every source, recomputed whenever any
/// source changes.
pub fn merge_addrs(sources: &[Var<Addr>]) -> Var<AddressSet> {
    Var::collect(sources).map(|addrs| union_bound(addrs))
}

/// Union the endpoints of every bound state, skipping the others.
pub fn union_bound(addrs: &[Addr]) -> AddressSet {
    addrs
        .iter()
        .filter_map(Addr::bound_addrs)
        .flat_map(|set| set.iter().cloned())
        .collect()
}

/// Merged endpoint set of every relay in `pool`.
///
/// Recomputed when the pool's tree changes (relays added or removed) and
/// when any relay's address changes. A pool that is pending or failed
/// yields the empty set.
pub fn merge_pool(pool: &Activity<NameTree<BoundName>>) -> Var<AddressSet> {
    pool.var().flat_map(|state| match state {
        State::Ok(tree) => {
            let relays = distinct_relays(tree);
            tracing::debug!("relay pool now has {} distinct relays", relays.len());
            let sources: Vec<Var<Addr>> = relays.iter().map(|b| b.addr().clone()).collect();
            merge_addrs(&sources)
        }
        State::Pending => Var::new(AddressSet::new()),
        State::Failed(failure) => {
            tracing::warn!("relay pool failed to resolve: {failure}");
            Var::new(AddressSet::new())
        }
    })
}

/// Leaves of the pool tree, first occurrence of each identity only.
fn distinct_relays(tree: &NameTree<BoundName>) -> Vec<&BoundName> {
    let mut seen: HashSet<(&Path, &Path)> = HashSet::new();
    let mut relays = Vec::new();
    for bound in tree.leaves() {
        if seen.insert((bound.id(), bound.residual())) {
            relays.push(bound);
        }
    }
    relays
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::tree::Weighted;

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    fn set(items: &[&str]) -> AddressSet {
        items.iter().map(|s| addr(s)).collect()
    }

    fn relay(name: &str, addr: &Var<Addr>) -> NameTree<BoundName> {
        NameTree::Leaf(BoundName::new(name.parse().unwrap(), addr.clone()))
    }

    #[test]
    fn unions_current_members() {
        let a = Var::new(Addr::bound([addr("10.1.2.9:9999")]));
        let b = Var::new(Addr::bound([addr("10.1.3.9:9999")]));
        let merged = merge_addrs(&[a.clone(), b.clone()]);
        assert_eq!(merged.sample(), set(&["10.1.2.9:9999", "10.1.3.9:9999"]));

        b.update(Addr::bound([addr("10.1.4.9:9999")]));
        assert_eq!(merged.sample(), set(&["10.1.2.9:9999", "10.1.4.9:9999"]));
    }

    #[test]
    fn failed_and_pending_sources_contribute_nothing() {
        let ok = Var::new(Addr::bound([addr("10.1.2.9:9999")]));
        let failed = Var::new(Addr::failed("pod crashlooping"));
        let pending = Var::new(Addr::Pending);
        let neg = Var::new(Addr::Neg);
        let merged = merge_addrs(&[ok, failed.clone(), pending, neg]);
        assert_eq!(merged.sample(), set(&["10.1.2.9:9999"]));

        failed.update(Addr::bound([addr("10.1.5.9:9999")]));
        assert_eq!(merged.sample(), set(&["10.1.2.9:9999", "10.1.5.9:9999"]));
    }

    #[test]
    fn pool_membership_changes_recompute() {
        let a = Var::new(Addr::bound([addr("10.1.2.9:9999")]));
        let b = Var::new(Addr::bound([addr("10.1.3.9:9999")]));
        let pool = Activity::value(relay("/relay/a", &a));
        let merged = merge_pool(&pool);
        assert_eq!(merged.sample(), set(&["10.1.2.9:9999"]));

        pool.set(State::Ok(NameTree::Union(vec![
            Weighted::new(1.0, relay("/relay/a", &a)),
            Weighted::new(1.0, relay("/relay/b", &b)),
        ])));
        assert_eq!(merged.sample(), set(&["10.1.2.9:9999", "10.1.3.9:9999"]));

        b.update(Addr::bound([addr("10.1.6.9:9999")]));
        assert_eq!(merged.sample(), set(&["10.1.2.9:9999", "10.1.6.9:9999"]));

        pool.set(State::Ok(NameTree::Empty));
        assert!(merged.sample().is_empty());
    }

    #[test]
    fn removed_relays_are_unsubscribed() {
        let a = Var::new(Addr::bound([addr("10.1.2.9:9999")]));
        let pool = Activity::value(relay("/relay/a", &a));
        let merged = merge_pool(&pool);
        assert_eq!(a.observer_count(), 1);

        pool.set(State::Ok(NameTree::Neg));
        assert_eq!(a.observer_count(), 0);
        a.update(Addr::bound([addr("10.9.9.9:9999")]));
        assert!(merged.sample().is_empty());
    }

    #[test]
    fn pending_or_failed_pool_is_empty() {
        let pool: Activity<NameTree<BoundName>> = Activity::pending();
        let merged = merge_pool(&pool);
        assert!(merged.sample().is_empty());

        let a = Var::new(Addr::bound([addr("10.1.2.9:9999")]));
        pool.set(State::Ok(relay("/relay/a", &a)));
        assert_eq!(merged.sample(), set(&["10.1.2.9:9999"]));

        pool.set(State::Failed(colo_var::Failure::new("no such service")));
        assert!(merged.sample().is_empty());
    }

    #[test]
    fn duplicate_relay_leaves_counted_once() {
        let a = Var::new(Addr::bound([addr("10.1.2.9:9999")]));
        let tree = NameTree::Alt(vec![relay("/relay/a", &a), relay("/relay/a", &a)]);
        assert_eq!(distinct_relays(&tree).len(), 1);
    }
}
