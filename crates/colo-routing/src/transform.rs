/// Routing resolved trees through co-located relays.
///
/// [`SubnetRelayTransformer`] holds a relay pool and rewrites every leaf of
/// a resolution tree (or delegate tree) onto the relays co-located with
/// the leaf's endpoints. All leaves share one merged relay set, so a
/// single pool change reaches every leaf with the same snapshot.
///
/// Observers of the pool run in registration order. The merge is
/// registered before readiness, so by the time an output turns `Ok` its
/// leaves already reflect the new pool.
use std::sync::{Mutex, PoisonError};

use colo_var::{Activity, Failure, State, Var};

use crate::address::AddressSet;
use crate::config::TransformerConfig;
use crate::delegate::DelegateTree;
use crate::error::ColoResult;
use crate::merge::merge_pool;
use crate::name::BoundName;
use crate::rewrite::rewrite_bound;
use crate::subnet::MatchPolicy;
use crate::tree::{LeafMap, NameTree};

/// Whether the relay pool can currently serve rewrites.
#[derive(Debug, Clone, PartialEq)]
enum Readiness {
    Pending,
    Ready,
    Failed(Failure),
}

pub struct SubnetRelayTransformer {
    relays: Var<AddressSet>,
    /// What leaves rewrite against: `relays` as of the last time the pool
    /// was ready.
    serving: Var<AddressSet>,
    readiness: Var<Readiness>,
    policy: MatchPolicy,
}

impl SubnetRelayTransformer {
    /// Build a transformer over `pool` using the policy selected by
    /// `config`. Fails if `config` does not validate.
    pub fn new(
        pool: &Activity<NameTree<BoundName>>,
        config: &TransformerConfig,
    ) -> ColoResult<Self> {
        config.validate()?;
        Ok(Self::with_policy(pool, config.policy()))
    }

    pub fn with_policy(pool: &Activity<NameTree<BoundName>>, policy: MatchPolicy) -> Self {
        tracing::debug!("relay transformer using {policy:?}");
        let relays = merge_pool(pool);
        let serving = serving_relays(pool, &relays);
        let readiness = pool.var().map(|state| match state {
            State::Pending => Readiness::Pending,
            State::Ok(_) => Readiness::Ready,
            State::Failed(failure) => Readiness::Failed(failure.clone()),
        });
        Self {
            relays,
            serving,
            readiness,
            policy,
        }
    }

    /// The merged endpoint set of every relay in the pool.
    pub fn relays(&self) -> &Var<AddressSet> {
        &self.relays
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Rewrite every leaf of `tree` onto its co-located relays.
    ///
    /// The result is pending while the relay pool is pending and failed
    /// while it is failed. Otherwise it holds a tree of identical shape
    /// whose leaf addresses keep following both the destination and the
    /// relay pool.
    pub fn transform(&self, tree: &NameTree<BoundName>) -> Activity<NameTree<BoundName>> {
        self.transform_tree(tree)
    }

    /// [`transform`](Self::transform) for delegate trees. Annotations are
    /// left untouched.
    pub fn transform_delegate(
        &self,
        tree: &DelegateTree<BoundName>,
    ) -> Activity<DelegateTree<BoundName>> {
        self.transform_tree(tree)
    }

    fn transform_tree<Tr>(&self, tree: &Tr) -> Activity<Tr>
    where
        Tr: LeafMap<Leaf = BoundName> + Clone + PartialEq + Send + Sync + 'static,
    {
        let relays = &self.serving;
        let policy = self.policy;
        let rewritten =
            tree.map_leaves(&mut |bound: &BoundName| rewrite_bound(bound, relays, policy));

        Activity::from_var(self.readiness.map(move |readiness| match readiness {
            Readiness::Pending => State::Pending,
            Readiness::Ready => State::Ok(rewritten.clone()),
            Readiness::Failed(failure) => State::Failed(failure.clone()),
        }))
    }
}

/// The merged set while the pool is ready; otherwise the last set seen
/// while it was.
///
/// A pool going pending or failed empties the merge before readiness
/// flips. Holding the last set keeps the leaves of an output that is about
/// to leave `Ok` from flashing empty. The pool is sampled rather than read
/// from the pair: its cell already holds the new state while the merge
/// delivers.
fn serving_relays(
    pool: &Activity<NameTree<BoundName>>,
    relays: &Var<AddressSet>,
) -> Var<AddressSet> {
    let current = pool.clone();
    let last = Mutex::new(AddressSet::new());
    pool.var().join(relays).map(move |(_, merged)| {
        let mut last = last.lock().unwrap_or_else(PoisonError::into_inner);
        if current.sample().is_ok() {
            *last = merged.clone();
        }
        last.clone()
    })
}

impl std::fmt::Debug for SubnetRelayTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubnetRelayTransformer")
            .field("relays", &self.relays.sample().len())
            .field("policy", &self.policy)
            .finish()
    }
}
