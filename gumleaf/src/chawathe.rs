//! Chawathe edit script generation.
//!
//! Turns a [`Match`] into edits, following "Change Detection in
//! Hierarchically Structured Information" (Chawathe et al., 1996):
//!
//! 1. Walk the new tree breadth-first. Unmatched nodes are inserted. Matched
//!    nodes get an update if their values differ and a move if their parents
//!    are not partners; then their children are aligned.
//! 2. Aligning compares the children of two partners that stayed together.
//!    Those outside the longest common subsequence are reordered.
//! 3. Walk the old tree in post-order and delete every unmatched node.
//!
//! Ignored (unlabeled) nodes produce no edits but their children are walked.
//! Parents and children are taken through ignored nodes, so wrapping or
//! unwrapping labeled nodes in an ignored one is not a move.

use std::collections::VecDeque;

use rapidhash::RapidHashSet as HashSet;
use smallvec::SmallVec;

use crate::{debug, trace};

use crate::comparer::TreeComparer;
use crate::edit::Edit;
use crate::lcs::{DiagonalPool, Lcs, with_local_pool};
use crate::matching::Match;

/// Wrapper for collecting edits with automatic tracing.
struct Ops<N> {
    inner: Vec<Edit<N>>,
}

impl<N: Copy + core::fmt::Debug> Ops<N> {
    fn new() -> Self {
        Self { inner: Vec::new() }
    }

    fn push(&mut self, edit: Edit<N>) {
        debug!(%edit, "emit");
        self.inner.push(edit);
    }

    fn into_inner(self) -> Vec<Edit<N>> {
        self.inner
    }
}

/// A match together with the edits that turn the old tree into the new one.
pub struct EditScript<'c, C: TreeComparer> {
    matching: Match<'c, C>,
    edits: Vec<Edit<C::Node>>,
}

impl<'c, C: TreeComparer> EditScript<'c, C> {
    /// Generate the edit script for `matching`, using the thread's default pool.
    pub fn new(matching: Match<'c, C>) -> Self {
        let edits = with_local_pool(|pool| generate_edit_script(&matching, pool));
        Self { matching, edits }
    }

    /// Generate the edit script for `matching`, borrowing from `pool`.
    pub fn with_pool(matching: Match<'c, C>, pool: &DiagonalPool) -> Self {
        let edits = generate_edit_script(&matching, pool);
        Self { matching, edits }
    }

    /// The match the script was generated from.
    pub fn matching(&self) -> &Match<'c, C> {
        &self.matching
    }

    /// The edits: inserts, updates, moves and reorders in breadth-first order
    /// of the new tree, then deletes in post-order of the old tree.
    pub fn edits(&self) -> &[Edit<C::Node>] {
        &self.edits
    }

    /// Number of edits.
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Whether the trees are identical under the match.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Split into the match and the edits.
    pub fn into_parts(self) -> (Match<'c, C>, Vec<Edit<C::Node>>) {
        (self.matching, self.edits)
    }
}

impl<C: TreeComparer> core::fmt::Debug for EditScript<'_, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(&self.edits).finish()
    }
}

impl<'s, C: TreeComparer> IntoIterator for &'s EditScript<'_, C> {
    type Item = &'s Edit<C::Node>;
    type IntoIter = core::slice::Iter<'s, Edit<C::Node>>;

    fn into_iter(self) -> Self::IntoIter {
        self.edits.iter()
    }
}

impl<'c, C: TreeComparer> Match<'c, C> {
    /// Generate the edit script for this match.
    pub fn into_edit_script(self) -> EditScript<'c, C> {
        EditScript::new(self)
    }
}

/// Generate edits from a match between two trees.
pub fn generate_edit_script<C: TreeComparer>(matching: &Match<'_, C>, pool: &DiagonalPool) -> Vec<Edit<C::Node>> {
    let comparer = matching.comparer();
    trace!(matched_pairs = matching.len(), "generate_edit_script start");
    let mut ops = Ops::new();

    // Inserts, updates, moves and reorders, breadth-first over the new tree
    let mut queue = VecDeque::from([matching.new_root()]);
    while let Some(x) = queue.pop_front() {
        process_node(matching, pool, &mut ops, x);
        queue.extend(comparer.children(x));
    }

    // Deletes, children before parents
    for w in comparer.post_order(matching.old_root()) {
        if comparer.label(w).is_some() && !matching.has_partner_in_new(w) {
            ops.push(Edit::Delete { old: w });
        }
    }

    debug!(total_ops = ops.inner.len(), "generate_edit_script done");
    ops.into_inner()
}

fn process_node<C: TreeComparer>(matching: &Match<'_, C>, pool: &DiagonalPool, ops: &mut Ops<C::Node>, x: C::Node) {
    let comparer = matching.comparer();
    if comparer.label(x).is_none() {
        return;
    }

    let Some(w) = matching.partner_in_old(x) else {
        ops.push(Edit::Insert { new: x });
        return;
    };

    if !comparer.values_equal(w, x) {
        ops.push(Edit::Update { old: w, new: x });
    }

    let parents_matched = match (comparer.labeled_parent(w), comparer.labeled_parent(x)) {
        (None, None) => true,
        (Some(v), Some(y)) => matching.contains(v, y),
        _ => false,
    };
    if !parents_matched {
        trace!(?w, ?x, "parents are not partners");
        ops.push(Edit::Move { old: w, new: x });
    }

    align_children(matching, pool, ops, w, x);
}

/// Emit reorders for the children of partners `w` and `x` that stayed
/// under them but fell out of order.
fn align_children<C: TreeComparer>(
    matching: &Match<'_, C>,
    pool: &DiagonalPool,
    ops: &mut Ops<C::Node>,
    w: C::Node,
    x: C::Node,
) {
    let comparer = matching.comparer();

    let s1: SmallVec<[C::Node; 16]> = comparer
        .labeled_children(w)
        .filter(|&a| {
            matching
                .partner_in_new(a)
                .is_some_and(|b| comparer.labeled_parent(b) == Some(x))
        })
        .collect();
    if s1.is_empty() {
        return;
    }

    let s2: SmallVec<[C::Node; 16]> = comparer
        .labeled_children(x)
        .filter(|&b| {
            matching
                .partner_in_old(b)
                .is_some_and(|a| comparer.labeled_parent(a) == Some(w))
        })
        .collect();
    if s2.is_empty() {
        return;
    }

    let in_order: HashSet<usize> = Lcs::new(pool)
        .matching_pairs(s1.len(), s2.len(), |i, j| matching.contains(s1[i], s2[j]))
        .map(|(i, _)| i)
        .collect();
    if in_order.len() == s1.len() {
        return;
    }

    for (i, &a) in s1.iter().enumerate() {
        if in_order.contains(&i) {
            continue;
        }
        if let Some(b) = matching.partner_in_new(a) {
            ops.push(Edit::Reorder { old: a, new: b });
        }
    }
}
