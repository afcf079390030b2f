/// The live dataflow graph behind a scenario run.
///
/// Observers on the merged relay set and on the transformed output record
/// every change they see; each applied step drains what it caused.
use std::sync::{Arc, Mutex};

use colo_routing::{
    Addr, AddressSet, BoundName, ColoResult, NameTree, Path, SubnetRelayTransformer,
    TransformerConfig,
};
use colo_var::{Activity, Observation, State, Var};

use crate::scenario::Action;

/// What the transformed output looks like at one moment.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Pending,
    Failed(String),
    Ready(Vec<(Path, Addr)>),
}

/// One observed change, in the order observers saw them.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Relays(AddressSet),
    Output(Snapshot),
}

pub struct Simulation {
    pool: Activity<NameTree<BoundName>>,
    transformer: SubnetRelayTransformer,
    changes: Arc<Mutex<Vec<Change>>>,
    _observations: Vec<Observation>,
}

impl Simulation {
    pub fn new(
        pool: &State<NameTree<BoundName>>,
        destination: &NameTree<BoundName>,
        config: &TransformerConfig,
    ) -> ColoResult<Self> {
        let pool = Activity::from_var(Var::new(pool.clone()));
        let transformer = SubnetRelayTransformer::new(&pool, config)?;
        let output = transformer.transform(destination);
        let snapshot = output.var().flat_map(snapshot_of);

        let changes = Arc::new(Mutex::new(Vec::new()));
        let relay_obs = transformer.relays().observe({
            let changes = Arc::clone(&changes);
            move |relays: &AddressSet| record(&changes, Change::Relays(relays.clone()))
        });
        let output_obs = snapshot.observe({
            let changes = Arc::clone(&changes);
            move |snapshot: &Snapshot| record(&changes, Change::Output(snapshot.clone()))
        });

        Ok(Self {
            pool,
            transformer,
            changes,
            _observations: vec![relay_obs, output_obs],
        })
    }

    pub fn transformer(&self) -> &SubnetRelayTransformer {
        &self.transformer
    }

    /// Changes observed since the last drain.
    pub fn drain(&self) -> Vec<Change> {
        self.changes
            .lock()
            .map(|mut pending| std::mem::take(&mut *pending))
            .unwrap_or_default()
    }

    /// Apply one step and return the changes it caused. Returns `false`
    /// alongside when the step re-delivered an equal value.
    pub fn apply(&self, action: &Action) -> (bool, Vec<Change>) {
        let applied = match action {
            Action::SetAddr { name, var, addr } => {
                tracing::debug!("updating {name}");
                var.update(addr.clone())
            }
            Action::SetRelays(state) => self.pool.set(state.clone()),
        };
        if !applied {
            tracing::debug!("step re-delivered an equal value");
        }
        (applied, self.drain())
    }
}

fn record(changes: &Mutex<Vec<Change>>, change: Change) {
    if let Ok(mut pending) = changes.lock() {
        pending.push(change);
    }
}

fn snapshot_of(state: &State<NameTree<BoundName>>) -> Var<Snapshot> {
    match state {
        State::Pending => Var::new(Snapshot::Pending),
        State::Failed(failure) => Var::new(Snapshot::Failed(failure.message().to_string())),
        State::Ok(tree) => {
            let leaves = tree.leaves();
            let ids: Vec<Path> = leaves.iter().map(|leaf| leaf.id().clone()).collect();
            let addrs: Vec<Var<Addr>> = leaves.iter().map(|leaf| leaf.addr().clone()).collect();
            Var::collect(&addrs).map(move |current: &Vec<Addr>| {
                Snapshot::Ready(ids.iter().cloned().zip(current.iter().cloned()).collect())
            })
        }
    }
}
