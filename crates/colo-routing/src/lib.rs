//! colo routing layer.
//!
//! Rewrites resolved name trees so that every destination is reached
//! through the relay instance co-located with it: each leaf's endpoints
//! are replaced by the relay endpoints on the same IPv4 /24 subnet.
//!
//! Everything is reactive: the relay pool and the destinations are
//! dynamic values (`colo_var`), and the rewritten tree keeps following
//! both for as long as it is held.
//!
//! ```rust
//! use colo_routing::{Addr, BoundName, NameTree, SubnetRelayTransformer, TransformerConfig};
//! use colo_var::{Activity, State, Var};
//!
//! let relay = BoundName::new(
//!     "/#/io.l5d.k8s/linkerd/incoming/l5d".parse().unwrap(),
//!     Var::new(Addr::bound(["10.1.2.9:4141".parse().unwrap()])),
//! );
//! let pool = Activity::value(NameTree::Leaf(relay));
//! let transformer = SubnetRelayTransformer::new(&pool, &TransformerConfig::new().prefix_len(24))?;
//!
//! let users = BoundName::new(
//!     "/#/io.l5d.k8s/default/http/users".parse().unwrap(),
//!     Var::new(Addr::bound(["10.1.2.5:8080".parse().unwrap()])),
//! );
//! let out = transformer.transform(&NameTree::Leaf(users));
//! if let State::Ok(tree) = out.sample() {
//!     let leaf = tree.leaves()[0];
//!     assert_eq!(leaf.addr().sample(), Addr::bound(["10.1.2.9:4141".parse().unwrap()]));
//! }
//! # Ok::<(), colo_routing::ColoError>(())
//! ```

pub mod address;
pub mod config;
pub mod delegate;
pub mod error;
pub mod merge;
pub mod name;
pub mod path;
pub mod rewrite;
pub mod subnet;
pub mod transform;
pub mod tree;

pub use address::{Addr, Address, AddressSet, Meta};
pub use config::TransformerConfig;
pub use delegate::{Annotation, DelegateTree, DelegateWeighted};
pub use error::{ColoError, ColoResult};
pub use merge::{merge_addrs, merge_pool};
pub use name::BoundName;
pub use path::{Dentry, Path};
pub use rewrite::{co_located, rewrite_addr, rewrite_bound};
pub use subnet::{share_subnet, MatchPolicy};
pub use transform::SubnetRelayTransformer;
pub use tree::{LeafMap, NameTree, Weighted};
