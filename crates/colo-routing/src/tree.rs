/// Resolution trees.
///
/// A [`NameTree`] combines bound names with union (weighted, ordered),
/// alternation (first usable branch wins), negation, failure and empty
/// nodes. Trees are immutable; transformations build new trees.

/// Tree kinds whose leaves can be rewritten while keeping every other node
/// exactly as it is.
pub trait LeafMap: Sized {
    type Leaf;

    /// Rebuild the tree, replacing each leaf payload with `f(leaf)`.
    /// Leaves are visited depth-first, left to right.
    fn map_leaves(&self, f: &mut dyn FnMut(&Self::Leaf) -> Self::Leaf) -> Self;
}

/// A weighted branch of a [`NameTree::Union`].
#[derive(Debug, Clone, PartialEq)]
pub struct Weighted<T> {
    pub weight: f64,
    pub tree: NameTree<T>,
}

impl<T> Weighted<T> {
    pub fn new(weight: f64, tree: NameTree<T>) -> Self {
        Self { weight, tree }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NameTree<T> {
    Leaf(T),
    Union(Vec<Weighted<T>>),
    Alt(Vec<NameTree<T>>),
    Neg,
    Fail,
    Empty,
}

impl<T> NameTree<T> {
    /// Rebuild with every leaf mapped through `f`.
    pub fn map<U>(&self, f: &mut impl FnMut(&T) -> U) -> NameTree<U> {
        match self {
            NameTree::Leaf(value) => NameTree::Leaf(f(value)),
            NameTree::Union(branches) => NameTree::Union(
                branches
                    .iter()
                    .map(|w| Weighted::new(w.weight, w.tree.map(f)))
                    .collect(),
            ),
            NameTree::Alt(trees) => NameTree::Alt(trees.iter().map(|t| t.map(f)).collect()),
            NameTree::Neg => NameTree::Neg,
            NameTree::Fail => NameTree::Fail,
            NameTree::Empty => NameTree::Empty,
        }
    }

    /// Every leaf, depth-first, left to right.
    pub fn leaves(&self) -> Vec<&T> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a T>) {
        match self {
            NameTree::Leaf(value) => out.push(value),
            NameTree::Union(branches) => {
                for w in branches {
                    w.tree.collect_leaves(out);
                }
            }
            NameTree::Alt(trees) => {
                for t in trees {
                    t.collect_leaves(out);
                }
            }
            NameTree::Neg | NameTree::Fail | NameTree::Empty => {}
        }
    }

    /// Normalize: drop `Neg` alternatives and zero-weight or `Neg` union
    /// branches, and collapse single-child combinators.
    ///
    /// Changes shape, so the relay transformer never applies it; it is
    /// meant for consumers of the transformed tree.
    pub fn simplify(self) -> NameTree<T> {
        match self {
            NameTree::Alt(trees) => {
                let mut kept: Vec<NameTree<T>> = trees
                    .into_iter()
                    .map(NameTree::simplify)
                    .filter(|t| !matches!(t, NameTree::Neg))
                    .collect();
                match kept.len() {
                    0 => NameTree::Neg,
                    1 => kept.remove(0),
                    _ => NameTree::Alt(kept),
                }
            }
            NameTree::Union(branches) => {
                let mut kept: Vec<Weighted<T>> = branches
                    .into_iter()
                    .map(|w| Weighted::new(w.weight, w.tree.simplify()))
                    .filter(|w| w.weight > 0.0 && !matches!(w.tree, NameTree::Neg))
                    .collect();
                match kept.len() {
                    0 => NameTree::Neg,
                    1 => kept.remove(0).tree,
                    _ => NameTree::Union(kept),
                }
            }
            other => other,
        }
    }
}

impl<T> LeafMap for NameTree<T> {
    type Leaf = T;

    fn map_leaves(&self, f: &mut dyn FnMut(&T) -> T) -> Self {
        self.map(&mut |leaf: &T| f(leaf))
    }
}
