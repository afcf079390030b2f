use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use colo_routing::{
    co_located, share_subnet, Addr, Address, AddressSet, BoundName, MatchPolicy, NameTree, Path,
    SubnetRelayTransformer, Weighted,
};
use colo_var::{Activity, State, Var};
use proptest::prelude::*;

/// IPv4 endpoints drawn from a handful of /24s so that matches are common.
fn arb_v4() -> impl Strategy<Value = Address> {
    (0..3u8, 0..3u8, any::<u8>(), any::<u16>()).prop_map(|(b, c, d, port)| {
        Address::inet(SocketAddr::from((Ipv4Addr::new(10, b, c, d), port)))
    })
}

fn arb_address() -> impl Strategy<Value = Address> {
    prop_oneof![
        8 => arb_v4(),
        1 => any::<u16>().prop_map(|port| Address::inet(SocketAddr::from((Ipv6Addr::LOCALHOST, port)))),
        1 => "[a-z]{1,8}".prop_map(|s| Address::opaque(format!("unix:///run/{s}.sock"))),
    ]
}

fn arb_set() -> impl Strategy<Value = AddressSet> {
    prop::collection::btree_set(arb_address(), 0..12)
}

/// Trees of leaf indices with arbitrary internal structure.
fn arb_tree() -> impl Strategy<Value = NameTree<u8>> {
    let leaf = prop_oneof![
        4 => any::<u8>().prop_map(NameTree::Leaf),
        1 => Just(NameTree::Neg),
        1 => Just(NameTree::Fail),
        1 => Just(NameTree::Empty),
    ];
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(NameTree::Alt),
            prop::collection::vec((0.0..1.0f64, inner), 1..4).prop_map(|branches| {
                NameTree::Union(
                    branches
                        .into_iter()
                        .map(|(w, t)| Weighted::new(w, t))
                        .collect(),
                )
            }),
        ]
    })
}

fn id(bound: &BoundName) -> Path {
    bound.id().clone()
}

fn same_shape<A, B>(a: &NameTree<A>, b: &NameTree<B>) -> bool {
    match (a, b) {
        (NameTree::Leaf(_), NameTree::Leaf(_)) => true,
        (NameTree::Neg, NameTree::Neg)
        | (NameTree::Fail, NameTree::Fail)
        | (NameTree::Empty, NameTree::Empty) => true,
        (NameTree::Alt(x), NameTree::Alt(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| same_shape(x, y))
        }
        (NameTree::Union(x), NameTree::Union(y)) => {
            x.len() == y.len()
                && x.iter()
                    .zip(y)
                    .all(|(x, y)| x.weight == y.weight && same_shape(&x.tree, &y.tree))
        }
        _ => false,
    }
}

proptest! {
    /// The rewritten set is exactly the relays sharing a /24 with some
    /// destination endpoint.
    #[test]
    fn rewrite_matches_definition(dests in arb_set(), relays in arb_set()) {
        let out = co_located(&dests, &relays, MatchPolicy::default());
        let expected: AddressSet = relays
            .iter()
            .filter(|r| dests.iter().any(|d| share_subnet(d, r)))
            .cloned()
            .collect();
        prop_assert_eq!(&out, &expected);
        prop_assert!(out.is_subset(&relays));
    }

    /// Symmetric on IPv4; false whenever either side is not IPv4.
    #[test]
    fn share_subnet_symmetry(a in arb_address(), b in arb_address()) {
        prop_assert_eq!(share_subnet(&a, &b), share_subnet(&b, &a));
        if a.ipv4().is_none() || b.ipv4().is_none() {
            prop_assert!(!share_subnet(&a, &b));
        }
    }

    /// Transformation keeps tree shape; only leaf payloads change.
    #[test]
    fn transform_preserves_shape(tree in arb_tree(), relays in arb_set()) {
        let pool = Activity::value(NameTree::Leaf(BoundName::new(
            "/relay/l5d".parse().unwrap(),
            Var::new(Addr::Bound { addrs: relays, meta: Default::default() }),
        )));
        let transformer = SubnetRelayTransformer::with_policy(&pool, MatchPolicy::default());

        let bound_tree = tree.map(&mut |i| {
            BoundName::new(
                format!("/svc/s{i}").parse().unwrap(),
                Var::new(Addr::bound([Address::inet(SocketAddr::from((
                    Ipv4Addr::new(10, i % 3, 0, 1),
                    80,
                )))])),
            )
        });

        let out = transformer.transform(&bound_tree);
        match out.sample() {
            State::Ok(result) => {
                prop_assert!(same_shape(&result, &tree));
                prop_assert_eq!(result.map(&mut id), bound_tree.map(&mut id));
            }
            other => prop_assert!(false, "unexpected state {:?}", other),
        }
    }
}
