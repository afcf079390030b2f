use std::fmt;

use colo_var::Var;

use crate::address::Addr;
use crate::path::Path;

/// A name bound to a dynamically-updating address.
///
/// Two bound names are equal when they share `id` and `residual` and are
/// bound to the same address var (by handle, not by current value).
/// Re-binding a name to a fresh var is therefore a change.
#[derive(Clone)]
pub struct BoundName {
    id: Path,
    residual: Path,
    addr: Var<Addr>,
}

impl BoundName {
    pub fn new(id: Path, addr: Var<Addr>) -> Self {
        Self {
            id,
            residual: Path::empty(),
            addr,
        }
    }

    pub fn with_residual(mut self, residual: Path) -> Self {
        self.residual = residual;
        self
    }

    pub fn id(&self) -> &Path {
        &self.id
    }

    /// Unconsumed remainder of the name that was bound.
    pub fn residual(&self) -> &Path {
        &self.residual
    }

    pub fn addr(&self) -> &Var<Addr> {
        &self.addr
    }

    /// Same identity, different address var.
    pub fn with_addr(&self, addr: Var<Addr>) -> BoundName {
        BoundName {
            id: self.id.clone(),
            residual: self.residual.clone(),
            addr,
        }
    }
}

impl PartialEq for BoundName {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.residual == other.residual && self.addr.ptr_eq(&other.addr)
    }
}

impl Eq for BoundName {}

impl fmt::Debug for BoundName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundName")
            .field("id", &self.id.to_string())
            .field("residual", &self.residual.to_string())
            .field("addr", &self.addr.sample())
            .finish()
    }
}
