//! An arena-backed labeled tree and a ready-made [`TreeComparer`] over a
//! pair of them.
//!
//! Useful on its own for small trees and as a reference for writing a
//! comparer over your own node types.

use core::ops::Range;
use core::sync::atomic::{AtomicU32, Ordering};

use indextree::{Arena, NodeId};

use crate::comparer::TreeComparer;
use crate::lcs;

static NEXT_TREE_ID: AtomicU32 = AtomicU32::new(0);

/// Identifies one [`Tree`] among all trees created in this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeId(u32);

/// A node handle that remembers which tree it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeNode {
    /// Owning tree
    pub tree: TreeId,
    /// Node within that tree's arena
    pub id: NodeId,
}

/// Data stored in each tree node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData<V> {
    /// Label of the node, `None` for nodes the differ should skip.
    pub label: Option<usize>,
    /// The node's value, compared by [`NodeValue`].
    pub value: V,
    /// Where the node came from in its source text, if anywhere.
    pub span: Option<Range<usize>>,
}

impl<V> NodeData<V> {
    /// A labeled node.
    pub fn new(label: usize, value: V) -> Self {
        Self {
            label: Some(label),
            value,
            span: None,
        }
    }

    /// A node the differ skips (its children are still diffed).
    pub fn ignored(value: V) -> Self {
        Self {
            label: None,
            value,
            span: None,
        }
    }

    /// Attach a source span.
    pub fn with_span(mut self, span: Range<usize>) -> Self {
        self.span = Some(span);
        self
    }
}

/// A rooted tree of [`NodeData`].
#[derive(Debug)]
pub struct Tree<V> {
    id: TreeId,
    arena: Arena<NodeData<V>>,
    /// The root node
    pub root: NodeId,
}

impl<V> Tree<V> {
    /// Create a tree with just a root.
    pub fn new(root: NodeData<V>) -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(root);
        Self {
            id: TreeId(NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed)),
            arena,
            root,
        }
    }

    /// This tree's identity.
    pub fn id(&self) -> TreeId {
        self.id
    }

    /// Append a child as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, data: NodeData<V>) -> NodeId {
        let child = self.arena.new_node(data);
        parent.append(child, &mut self.arena);
        child
    }

    /// Data of a node.
    pub fn get(&self, id: NodeId) -> &NodeData<V> {
        self.arena[id].get()
    }

    /// Handle for a node of this tree.
    pub fn node(&self, id: NodeId) -> TreeNode {
        TreeNode { tree: self.id, id }
    }

    /// Handle for the root.
    pub fn root_node(&self) -> TreeNode {
        self.node(self.root)
    }

    /// Parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent()
    }

    /// Children of a node, in order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    /// A node and its descendants, in pre-order.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.descendants(&self.arena)
    }

    /// Position of a node among its siblings (0-indexed).
    pub fn position(&self, id: NodeId) -> usize {
        id.preceding_siblings(&self.arena).count() - 1
    }

    /// Number of nodes ever added, including the root.
    pub fn node_count(&self) -> usize {
        self.arena.count()
    }
}

/// Values that can say how different they are from one another.
pub trait NodeValue: PartialEq + core::fmt::Debug {
    /// Dissimilarity in `[0, 1]`. Defaults to 0 for equal values and 1 otherwise.
    fn distance(&self, other: &Self) -> f64 {
        if self == other { 0.0 } else { 1.0 }
    }
}

impl NodeValue for String {
    fn distance(&self, other: &Self) -> f64 {
        lcs::distance(self.as_bytes(), other.as_bytes())
    }
}

impl NodeValue for &str {
    fn distance(&self, other: &Self) -> f64 {
        lcs::distance(self.as_bytes(), other.as_bytes())
    }
}

impl NodeValue for u64 {}
impl NodeValue for i64 {}
impl NodeValue for char {}
impl NodeValue for () {}

/// Compares an old and a new [`Tree`].
///
/// Node distance is the distance of their values; nodes are tied to their
/// ancestors only for labels configured with
/// [`with_tied_to_ancestor`](Self::with_tied_to_ancestor).
#[derive(Debug)]
pub struct TreePair<'a, V> {
    old: &'a Tree<V>,
    new: &'a Tree<V>,
    label_count: usize,
    tied: Vec<usize>,
}

impl<'a, V> TreePair<'a, V> {
    /// Compare `old` against `new` with labels in `0..label_count`.
    pub fn new(old: &'a Tree<V>, new: &'a Tree<V>, label_count: usize) -> Self {
        Self {
            old,
            new,
            label_count,
            tied: vec![0; label_count],
        }
    }

    /// Tie nodes with `label` to their ancestor `degree` levels up.
    pub fn with_tied_to_ancestor(mut self, label: usize, degree: usize) -> Self {
        if let Some(slot) = self.tied.get_mut(label) {
            *slot = degree;
        }
        self
    }

    /// The old tree.
    pub fn old(&self) -> &'a Tree<V> {
        self.old
    }

    /// The new tree.
    pub fn new_tree(&self) -> &'a Tree<V> {
        self.new
    }

    fn tree(&self, node: TreeNode) -> &'a Tree<V> {
        debug_assert!(
            node.tree == self.old.id || node.tree == self.new.id,
            "node {node:?} belongs to neither tree of the pair"
        );
        if node.tree == self.old.id { self.old } else { self.new }
    }

    fn data(&self, node: TreeNode) -> &'a NodeData<V> {
        self.tree(node).get(node.id)
    }
}

impl<V: NodeValue> TreeComparer for TreePair<'_, V> {
    type Node = TreeNode;

    fn label_count(&self) -> usize {
        self.label_count
    }

    fn label(&self, node: TreeNode) -> Option<usize> {
        self.data(node).label
    }

    fn tied_to_ancestor(&self, label: usize) -> usize {
        self.tied.get(label).copied().unwrap_or(0)
    }

    fn children(&self, node: TreeNode) -> impl Iterator<Item = TreeNode> + '_ {
        let tree = self.tree(node);
        tree.children(node.id).map(move |id| tree.node(id))
    }

    fn descendants(&self, node: TreeNode) -> impl Iterator<Item = TreeNode> + '_ {
        let tree = self.tree(node);
        tree.descendants(node.id).map(move |id| tree.node(id))
    }

    fn parent(&self, node: TreeNode) -> Option<TreeNode> {
        let tree = self.tree(node);
        tree.parent(node.id).map(|id| tree.node(id))
    }

    fn same_tree(&self, left: TreeNode, right: TreeNode) -> bool {
        left.tree == right.tree
    }

    fn span(&self, node: TreeNode) -> Option<Range<usize>> {
        self.data(node).span.clone()
    }

    fn distance(&self, old: TreeNode, new: TreeNode) -> f64 {
        let (old, new) = (&self.data(old).value, &self.data(new).value);
        if old == new {
            return 0.0;
        }
        old.distance(new).clamp(0.0, 1.0)
    }

    fn values_equal(&self, old: TreeNode, new: TreeNode) -> bool {
        self.data(old).value == self.data(new).value
    }
}
