//! Edits produced by tree differencing.

use core::fmt;

use crate::comparer::TreeComparer;

/// What an edit does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EditKind {
    /// No edit.
    #[default]
    None,
    /// A matched node's value changed.
    Update,
    /// A node exists only in the new tree.
    Insert,
    /// A node exists only in the old tree.
    Delete,
    /// A matched node has a different parent in the new tree.
    Move,
    /// A matched node stayed under the same parent but changed its position
    /// relative to its matched siblings.
    Reorder,
}

impl fmt::Display for EditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EditKind::None => "None",
            EditKind::Update => "Update",
            EditKind::Insert => "Insert",
            EditKind::Delete => "Delete",
            EditKind::Move => "Move",
            EditKind::Reorder => "Reorder",
        };
        f.write_str(name)
    }
}

/// A single edit between an old and a new tree.
///
/// Inserts only carry a new node, deletes only an old one; every other kind
/// carries both sides of a match.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edit<N> {
    /// Matched nodes whose values differ.
    Update {
        /// The node in the old tree
        old: N,
        /// Its partner in the new tree
        new: N,
    },

    /// Unmatched node of the new tree.
    Insert {
        /// The inserted node
        new: N,
    },

    /// Unmatched node of the old tree.
    Delete {
        /// The deleted node
        old: N,
    },

    /// Matched nodes whose parents are not matched to each other.
    Move {
        /// The node in the old tree
        old: N,
        /// Its partner in the new tree
        new: N,
    },

    /// Matched siblings that fall outside the longest in-order run.
    Reorder {
        /// The node in the old tree
        old: N,
        /// Its partner in the new tree
        new: N,
    },
}

impl<N: Copy> Edit<N> {
    /// The kind of this edit.
    pub fn kind(&self) -> EditKind {
        match self {
            Edit::Update { .. } => EditKind::Update,
            Edit::Insert { .. } => EditKind::Insert,
            Edit::Delete { .. } => EditKind::Delete,
            Edit::Move { .. } => EditKind::Move,
            Edit::Reorder { .. } => EditKind::Reorder,
        }
    }

    /// The old-tree node, absent for inserts.
    pub fn old_node(&self) -> Option<N> {
        match *self {
            Edit::Insert { .. } => None,
            Edit::Delete { old }
            | Edit::Update { old, .. }
            | Edit::Move { old, .. }
            | Edit::Reorder { old, .. } => Some(old),
        }
    }

    /// The new-tree node, absent for deletes.
    pub fn new_node(&self) -> Option<N> {
        match *self {
            Edit::Delete { .. } => None,
            Edit::Insert { new }
            | Edit::Update { new, .. }
            | Edit::Move { new, .. }
            | Edit::Reorder { new, .. } => Some(new),
        }
    }

    /// Render this edit with node spans from `comparer`, when it has them.
    pub fn display<'a, C>(&'a self, comparer: &'a C) -> EditDisplay<'a, C>
    where
        C: TreeComparer<Node = N>,
    {
        EditDisplay {
            edit: self,
            comparer,
        }
    }
}

impl<N: Copy + fmt::Debug> fmt::Display for Edit<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.old_node(), self.new_node()) {
            (Some(old), Some(new)) => write!(f, "{}(old:{old:?} -> new:{new:?})", self.kind()),
            (Some(old), None) => write!(f, "{}(old:{old:?})", self.kind()),
            (None, Some(new)) => write!(f, "{}(new:{new:?})", self.kind()),
            (None, None) => write!(f, "{}", self.kind()),
        }
    }
}

impl<N: Copy + fmt::Debug> fmt::Debug for Edit<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// [`Edit`] paired with the comparer that knows its nodes' spans.
pub struct EditDisplay<'a, C: TreeComparer> {
    edit: &'a Edit<C::Node>,
    comparer: &'a C,
}

impl<C: TreeComparer> EditDisplay<'_, C> {
    fn side(&self, f: &mut fmt::Formatter<'_>, side: &str, node: C::Node) -> fmt::Result {
        match self.comparer.span(node) {
            Some(span) => write!(f, "{side}@{}..{}", span.start, span.end),
            None => write!(f, "{side}:{node:?}"),
        }
    }
}

impl<C: TreeComparer> fmt::Display for EditDisplay<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.edit.kind())?;
        if let Some(old) = self.edit.old_node() {
            self.side(f, "old", old)?;
        }
        if let Some(new) = self.edit.new_node() {
            if self.edit.old_node().is_some() {
                f.write_str(" -> ")?;
            }
            self.side(f, "new", new)?;
        }
        f.write_str(")")
    }
}
