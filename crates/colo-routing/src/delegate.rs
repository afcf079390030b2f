/// Delegate trees: resolution trees annotated with how each node was
/// reached, used by dtab/delegation introspection.
///
/// Node for node, a delegate tree mirrors the [`NameTree`] it explains.
/// `Delegate`, `Transformation` and `Exception` record resolution steps and
/// project to their child (or to `Fail`) in [`DelegateTree::to_name_tree`].
use crate::path::{Dentry, Path};
use crate::tree::{LeafMap, NameTree, Weighted};

/// Provenance attached to every delegate node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Path being resolved at this node.
    pub path: Path,
    /// Rule that produced this node, if any.
    pub dentry: Option<Dentry>,
}

impl Annotation {
    pub fn new(path: Path) -> Self {
        Self { path, dentry: None }
    }

    pub fn with_dentry(mut self, dentry: Dentry) -> Self {
        self.dentry = Some(dentry);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DelegateWeighted<T> {
    pub weight: f64,
    pub tree: DelegateTree<T>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DelegateTree<T> {
    Leaf {
        ann: Annotation,
        value: T,
    },
    Union {
        ann: Annotation,
        trees: Vec<DelegateWeighted<T>>,
    },
    Alt {
        ann: Annotation,
        trees: Vec<DelegateTree<T>>,
    },
    /// One rewrite step through the delegation table.
    Delegate {
        ann: Annotation,
        tree: Box<DelegateTree<T>>,
    },
    /// A named transformer was applied below this point.
    Transformation {
        ann: Annotation,
        name: String,
        tree: Box<DelegateTree<T>>,
    },
    Neg {
        ann: Annotation,
    },
    Fail {
        ann: Annotation,
    },
    Empty {
        ann: Annotation,
    },
    /// Resolution raised an error at this node.
    Exception {
        ann: Annotation,
        message: String,
    },
}

impl<T> DelegateTree<T> {
    pub fn annotation(&self) -> &Annotation {
        match self {
            DelegateTree::Leaf { ann, .. }
            | DelegateTree::Union { ann, .. }
            | DelegateTree::Alt { ann, .. }
            | DelegateTree::Delegate { ann, .. }
            | DelegateTree::Transformation { ann, .. }
            | DelegateTree::Neg { ann }
            | DelegateTree::Fail { ann }
            | DelegateTree::Empty { ann }
            | DelegateTree::Exception { ann, .. } => ann,
        }
    }

    /// Rebuild with every leaf value mapped through `f`; annotations are
    /// cloned untouched.
    pub fn map<U>(&self, f: &mut impl FnMut(&T) -> U) -> DelegateTree<U> {
        match self {
            DelegateTree::Leaf { ann, value } => DelegateTree::Leaf {
                ann: ann.clone(),
                value: f(value),
            },
            DelegateTree::Union { ann, trees } => DelegateTree::Union {
                ann: ann.clone(),
                trees: trees
                    .iter()
                    .map(|w| DelegateWeighted {
                        weight: w.weight,
                        tree: w.tree.map(f),
                    })
                    .collect(),
            },
            DelegateTree::Alt { ann, trees } => DelegateTree::Alt {
                ann: ann.clone(),
                trees: trees.iter().map(|t| t.map(f)).collect(),
            },
            DelegateTree::Delegate { ann, tree } => DelegateTree::Delegate {
                ann: ann.clone(),
                tree: Box::new(tree.map(f)),
            },
            DelegateTree::Transformation { ann, name, tree } => DelegateTree::Transformation {
                ann: ann.clone(),
                name: name.clone(),
                tree: Box::new(tree.map(f)),
            },
            DelegateTree::Neg { ann } => DelegateTree::Neg { ann: ann.clone() },
            DelegateTree::Fail { ann } => DelegateTree::Fail { ann: ann.clone() },
            DelegateTree::Empty { ann } => DelegateTree::Empty { ann: ann.clone() },
            DelegateTree::Exception { ann, message } => DelegateTree::Exception {
                ann: ann.clone(),
                message: message.clone(),
            },
        }
    }

    /// Leaf values, depth-first, left to right.
    pub fn leaves(&self) -> Vec<&T> {
        match self {
            DelegateTree::Leaf { value, .. } => vec![value],
            DelegateTree::Union { trees, .. } => {
                trees.iter().flat_map(|w| w.tree.leaves()).collect()
            }
            DelegateTree::Alt { trees, .. } => trees.iter().flat_map(|t| t.leaves()).collect(),
            DelegateTree::Delegate { tree, .. } | DelegateTree::Transformation { tree, .. } => {
                tree.leaves()
            }
            DelegateTree::Neg { .. }
            | DelegateTree::Fail { .. }
            | DelegateTree::Empty { .. }
            | DelegateTree::Exception { .. } => Vec::new(),
        }
    }

    /// Drop annotations, leaving the resolution tree this explains.
    pub fn to_name_tree(&self) -> NameTree<T>
    where
        T: Clone,
    {
        match self {
            DelegateTree::Leaf { value, .. } => NameTree::Leaf(value.clone()),
            DelegateTree::Union { trees, .. } => NameTree::Union(
                trees
                    .iter()
                    .map(|w| Weighted::new(w.weight, w.tree.to_name_tree()))
                    .collect(),
            ),
            DelegateTree::Alt { trees, .. } => {
                NameTree::Alt(trees.iter().map(DelegateTree::to_name_tree).collect())
            }
            DelegateTree::Delegate { tree, .. } | DelegateTree::Transformation { tree, .. } => {
                tree.to_name_tree()
            }
            DelegateTree::Neg { .. } => NameTree::Neg,
            DelegateTree::Fail { .. } | DelegateTree::Exception { .. } => NameTree::Fail,
            DelegateTree::Empty { .. } => NameTree::Empty,
        }
    }
}

impl<T> LeafMap for DelegateTree<T> {
    type Leaf = T;

    fn map_leaves(&self, f: &mut dyn FnMut(&T) -> T) -> Self {
        self.map(&mut |leaf: &T| f(leaf))
    }
}
