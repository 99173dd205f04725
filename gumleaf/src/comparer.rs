//! The strategy a caller implements to describe one family of trees.
//!
//! The engine never looks inside nodes. Everything it needs (labels,
//! structure, similarity) comes through [`TreeComparer`]. Node handles are
//! small copyable values; one comparer answers for both the old and the new
//! tree.

use core::fmt::Debug;
use core::hash::Hash;
use core::ops::Range;

/// Describes the shape and similarity of nodes in an old and a new tree.
///
/// Labels partition nodes into kinds: only nodes with the same label are ever
/// matched. `label(node)` returning `None` marks a node the engine ignores
/// entirely (it is never matched and produces no edits), although its
/// children are still visited. For parent, child and ancestor relations an
/// ignored node is transparent: its labeled children count as children of
/// its nearest labeled ancestor.
pub trait TreeComparer {
    /// Handle to a node of either tree.
    type Node: Copy + Eq + Hash + Debug;

    /// Labels range over `0..label_count()`.
    fn label_count(&self) -> usize;

    /// The label of `node`, or `None` to ignore it.
    fn label(&self, node: Self::Node) -> Option<usize>;

    /// How many levels up a node with this label is tied to its ancestor.
    ///
    /// When non-zero, two nodes with this label may only match if their
    /// ancestors that many levels up are already matched to each other.
    fn tied_to_ancestor(&self, label: usize) -> usize {
        let _ = label;
        0
    }

    /// Children of `node`, in order.
    fn children(&self, node: Self::Node) -> impl Iterator<Item = Self::Node> + '_;

    /// `node` followed by all of its descendants, in pre-order.
    fn descendants(&self, node: Self::Node) -> impl Iterator<Item = Self::Node> + '_ {
        PreOrder {
            comparer: self,
            stack: vec![node],
        }
    }

    /// All descendants of `node` followed by `node` itself, in post-order.
    fn post_order(&self, node: Self::Node) -> impl Iterator<Item = Self::Node> + '_ {
        PostOrder {
            comparer: self,
            stack: vec![(node, false)],
        }
    }

    /// Parent of `node`, `None` for a root.
    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    /// Nearest labeled ancestor of `node`. Ignored nodes in between are
    /// skipped.
    fn labeled_parent(&self, node: Self::Node) -> Option<Self::Node> {
        let mut current = self.parent(node)?;
        while self.label(current).is_none() {
            current = self.parent(current)?;
        }
        Some(current)
    }

    /// Labeled children of `node`, in order. An ignored child is replaced by
    /// its own labeled children, recursively.
    fn labeled_children(&self, node: Self::Node) -> impl Iterator<Item = Self::Node> + '_ {
        let mut stack: Vec<_> = self.children(node).collect();
        stack.reverse();
        LabeledChildren { comparer: self, stack }
    }

    /// The labeled ancestor `level` steps above `node`; `level == 0` is the
    /// node itself. Ignored ancestors are not counted.
    fn ancestor(&self, node: Self::Node, level: usize) -> Option<Self::Node> {
        let mut current = node;
        for _ in 0..level {
            current = self.labeled_parent(current)?;
        }
        Some(current)
    }

    /// Whether both nodes belong to the same tree.
    fn same_tree(&self, left: Self::Node, right: Self::Node) -> bool;

    /// Source span of `node`, if the trees come from text.
    fn span(&self, node: Self::Node) -> Option<Range<usize>> {
        let _ = node;
        None
    }

    /// Dissimilarity of two nodes with the same label, in `[0, 1]`.
    ///
    /// 0 means identical, 1 means nothing in common.
    fn distance(&self, old: Self::Node, new: Self::Node) -> f64;

    /// Whether two matched nodes carry the same value. Unequal values produce
    /// an update edit.
    fn values_equal(&self, old: Self::Node, new: Self::Node) -> bool;
}

struct PreOrder<'a, C: TreeComparer + ?Sized> {
    comparer: &'a C,
    stack: Vec<C::Node>,
}

impl<C: TreeComparer + ?Sized> Iterator for PreOrder<'_, C> {
    type Item = C::Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        let start = self.stack.len();
        self.stack.extend(self.comparer.children(node));
        self.stack[start..].reverse();
        Some(node)
    }
}

struct LabeledChildren<'a, C: TreeComparer + ?Sized> {
    comparer: &'a C,
    /// Pending nodes, next one on top.
    stack: Vec<C::Node>,
}

impl<C: TreeComparer + ?Sized> Iterator for LabeledChildren<'_, C> {
    type Item = C::Node;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let node = self.stack.pop()?;
            if self.comparer.label(node).is_some() {
                return Some(node);
            }
            let start = self.stack.len();
            self.stack.extend(self.comparer.children(node));
            self.stack[start..].reverse();
        }
    }
}

struct PostOrder<'a, C: TreeComparer + ?Sized> {
    comparer: &'a C,
    /// Nodes paired with whether their children were already pushed.
    stack: Vec<(C::Node, bool)>,
}

impl<C: TreeComparer + ?Sized> Iterator for PostOrder<'_, C> {
    type Item = C::Node;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (node, expanded) = self.stack.pop()?;
            if expanded {
                return Some(node);
            }
            self.stack.push((node, true));
            let start = self.stack.len();
            self.stack
                .extend(self.comparer.children(node).map(|child| (child, false)));
            self.stack[start..].reverse();
        }
    }
}
