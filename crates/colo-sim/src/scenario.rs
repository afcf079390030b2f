/// Scenario files: the names in play, the relay pool, the destination tree
/// and an ordered list of changes to replay.
///
/// ```json
/// {
///   "names": {
///     "/relay/l5d": { "bound": ["10.1.2.9:4141"] },
///     "/svc/users": { "bound": ["10.1.2.5:8080"] }
///   },
///   "relays": { "tree": { "leaf": "/relay/l5d" } },
///   "destination": { "leaf": "/svc/users" },
///   "steps": [ { "set_addr": { "name": "/svc/users", "addr": "pending" } } ]
/// }
/// ```
use std::collections::BTreeMap;
use std::path::Path as FsPath;

use colo_routing::{
    Addr, Address, BoundName, ColoError, ColoResult, NameTree, Path, TransformerConfig, Weighted,
};
use colo_var::{Failure, State, Var};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Every bound name the scenario refers to, with its initial address.
    pub names: BTreeMap<String, AddrSpec>,
    pub relays: PoolSpec,
    pub destination: TreeSpec,
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Transformer settings. Command-line flags override these.
    #[serde(default)]
    pub config: Option<TransformerConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddrSpec {
    Bound(Vec<String>),
    Neg,
    Pending,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolSpec {
    Pending,
    Failed(String),
    Tree(TreeSpec),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeSpec {
    Leaf(String),
    Union(Vec<WeightedSpec>),
    Alt(Vec<TreeSpec>),
    Neg,
    Fail,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WeightedSpec {
    pub weight: f64,
    pub tree: TreeSpec,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    SetAddr { name: String, addr: AddrSpec },
    SetRelays(PoolSpec),
}

impl Scenario {
    pub fn from_json(json: &str) -> ColoResult<Self> {
        serde_json::from_str(json).map_err(|e| ColoError::Scenario(e.to_string()))
    }

    pub fn load(path: &FsPath) -> ColoResult<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ColoError::Scenario(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }
}

impl AddrSpec {
    pub fn to_addr(&self) -> ColoResult<Addr> {
        Ok(match self {
            AddrSpec::Bound(addrs) => {
                let parsed = addrs
                    .iter()
                    .map(|s| s.parse::<Address>())
                    .collect::<ColoResult<Vec<_>>>()?;
                Addr::bound(parsed)
            }
            AddrSpec::Neg => Addr::Neg,
            AddrSpec::Pending => Addr::Pending,
            AddrSpec::Failed(message) => Addr::failed(message),
        })
    }
}

// ── Building the live graph ─────────────────────────────────────

/// A change ready to apply, with every name and address already resolved.
#[derive(Debug, Clone)]
pub enum Action {
    SetAddr {
        name: Path,
        var: Var<Addr>,
        addr: Addr,
    },
    SetRelays(State<NameTree<BoundName>>),
}

impl Action {
    /// Short label for event output.
    pub fn describe(&self) -> String {
        match self {
            Action::SetAddr { name, addr, .. } => format!("set {name} to {}", addr_label(addr)),
            Action::SetRelays(State::Pending) => "relay pool pending".to_string(),
            Action::SetRelays(State::Failed(failure)) => format!("relay pool failed: {failure}"),
            Action::SetRelays(State::Ok(tree)) => {
                format!("relay pool now {} relay(s)", tree.leaves().len())
            }
        }
    }
}

fn addr_label(addr: &Addr) -> String {
    match addr {
        Addr::Bound { addrs, .. } => format!("bound({})", addrs.len()),
        Addr::Neg => "neg".to_string(),
        Addr::Pending => "pending".to_string(),
        Addr::Failed(failure) => format!("failed({failure})"),
    }
}

/// The scenario's names turned into live vars.
#[derive(Debug)]
pub struct Resolved {
    pub pool: State<NameTree<BoundName>>,
    pub destination: NameTree<BoundName>,
    pub actions: Vec<Action>,
}

impl Scenario {
    /// Create one var per name and resolve the pool, destination and steps
    /// against them. Fails on unknown names and unparseable addresses.
    pub fn resolve(&self) -> ColoResult<Resolved> {
        let mut names: BTreeMap<String, BoundName> = BTreeMap::new();
        for (key, spec) in &self.names {
            let id: Path = key.parse()?;
            names.insert(key.clone(), BoundName::new(id, Var::new(spec.to_addr()?)));
        }

        let pool = resolve_pool(&self.relays, &names)?;
        let destination = resolve_tree(&self.destination, &names)?;

        let mut actions = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            actions.push(match step {
                Step::SetAddr { name, addr } => {
                    let bound = lookup(&names, name)?;
                    Action::SetAddr {
                        name: bound.id().clone(),
                        var: bound.addr().clone(),
                        addr: addr.to_addr()?,
                    }
                }
                Step::SetRelays(spec) => Action::SetRelays(resolve_pool(spec, &names)?),
            });
        }

        Ok(Resolved {
            pool,
            destination,
            actions,
        })
    }
}

fn lookup<'a>(names: &'a BTreeMap<String, BoundName>, name: &str) -> ColoResult<&'a BoundName> {
    names
        .get(name)
        .ok_or_else(|| ColoError::Scenario(format!("unknown name {name}")))
}

fn resolve_pool(
    spec: &PoolSpec,
    names: &BTreeMap<String, BoundName>,
) -> ColoResult<State<NameTree<BoundName>>> {
    Ok(match spec {
        PoolSpec::Pending => State::Pending,
        PoolSpec::Failed(message) => State::Failed(Failure::new(message)),
        PoolSpec::Tree(tree) => State::Ok(resolve_tree(tree, names)?),
    })
}

fn resolve_tree(
    spec: &TreeSpec,
    names: &BTreeMap<String, BoundName>,
) -> ColoResult<NameTree<BoundName>> {
    Ok(match spec {
        TreeSpec::Leaf(name) => NameTree::Leaf(lookup(names, name)?.clone()),
        TreeSpec::Union(branches) => NameTree::Union(
            branches
                .iter()
                .map(|b| Ok(Weighted::new(b.weight, resolve_tree(&b.tree, names)?)))
                .collect::<ColoResult<_>>()?,
        ),
        TreeSpec::Alt(trees) => NameTree::Alt(
            trees
                .iter()
                .map(|t| resolve_tree(t, names))
                .collect::<ColoResult<_>>()?,
        ),
        TreeSpec::Neg => NameTree::Neg,
        TreeSpec::Fail => NameTree::Fail,
        TreeSpec::Empty => NameTree::Empty,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "names": {
            "/relay/a": { "bound": ["10.1.2.9:4141"] },
            "/relay/b": "pending",
            "/svc/users": { "bound": ["10.1.2.5:8080", "10.9.9.9:8080"] },
            "/svc/legacy": { "failed": "no endpoints" }
        },
        "relays": { "tree": { "union": [
            { "weight": 1.0, "tree": { "leaf": "/relay/a" } },
            { "weight": 1.0, "tree": { "leaf": "/relay/b" } }
        ] } },
        "destination": { "alt": [ { "leaf": "/svc/users" }, { "leaf": "/svc/legacy" }, "neg" ] },
        "steps": [
            { "set_addr": { "name": "/svc/users", "addr": "pending" } },
            { "set_relays": { "failed": "relay service gone" } }
        ],
        "config": { "prefix_len": 24 }
    }"#;

    #[test]
    fn parses_sample() {
        let scenario = Scenario::from_json(SAMPLE).unwrap();
        assert_eq!(scenario.names.len(), 4);
        assert_eq!(scenario.names["/relay/b"], AddrSpec::Pending);
        assert_eq!(
            scenario.steps[1],
            Step::SetRelays(PoolSpec::Failed("relay service gone".into()))
        );
        assert!(scenario.config.is_some());
    }

    #[test]
    fn resolves_names_into_shared_vars() {
        let resolved = Scenario::from_json(SAMPLE).unwrap().resolve().unwrap();
        let leaves = resolved.destination.leaves();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[1].addr().sample(), Addr::failed("no endpoints"));

        let Action::SetAddr { var, .. } = &resolved.actions[0] else {
            panic!("expected set_addr");
        };
        assert!(var.ptr_eq(leaves[0].addr()));
        assert!(matches!(
            resolved.actions[1],
            Action::SetRelays(State::Failed(_))
        ));
    }

    #[test]
    fn unknown_name_is_rejected() {
        let json = r#"{
            "names": {},
            "relays": "pending",
            "destination": { "leaf": "/svc/missing" }
        }"#;
        let err = Scenario::from_json(json).unwrap().resolve().unwrap_err();
        assert_eq!(err.to_string(), "invalid scenario: unknown name /svc/missing");
    }

    #[test]
    fn bad_address_is_rejected() {
        let json = r#"{
            "names": { "/svc/a": { "bound": ["not-an-address"] } },
            "relays": "pending",
            "destination": { "leaf": "/svc/a" }
        }"#;
        let err = Scenario::from_json(json).unwrap().resolve().unwrap_err();
        assert!(matches!(err, ColoError::InvalidAddress(_)));
    }

    #[test]
    fn malformed_json_is_a_scenario_error() {
        assert!(matches!(
            Scenario::from_json("{ \"names\": "),
            Err(ColoError::Scenario(_))
        ));
        assert!(matches!(
            Scenario::load(FsPath::new("/nonexistent/colo-scenario.json")),
            Err(ColoError::Scenario(_))
        ));
    }
}
