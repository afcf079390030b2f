//! Dynamic values for the colo routing stack.
//!
//! Provides [`Var`], a value cell notifying observers synchronously on
//! change (derivations: `map`, `join`, `collect`, `flat_map`), and
//! [`Activity`], a `Var` whose value may be pending or failed.
//!
//! Equal updates are suppressed at every cell, so re-delivering an
//! unchanged value never triggers downstream recomputation.

pub mod activity;
pub mod var;

pub use activity::{Activity, Failure, State};
pub use var::{Observation, Var};
