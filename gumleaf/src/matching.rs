//! Label-driven node matching.
//!
//! Nodes of both trees are bucketed by label. For each label, every
//! unmatched old node is paired with the closest unmatched new node of the
//! same label, over a series of passes with increasing distance thresholds:
//! near-exact matches are claimed first so that looser passes cannot steal
//! them. Labels may be tied to an ancestor, in which case a candidate pair is
//! only considered once their ancestors at that level are matched to each
//! other.
//!
//! The roots are always matched. Callers may also seed known matches.

use crate::{debug, trace};

use crate::comparer::TreeComparer;
use crate::edit::Edit;
use crate::lcs::{DiagonalPool, Lcs, SequenceEdit, with_local_pool};
use facet::Facet;
use rapidhash::RapidHashMap as HashMap;

#[cfg(feature = "matching-stats")]
use core::cell::Cell;

#[cfg(feature = "matching-stats")]
thread_local! {
    static DISTANCE_CALLS: Cell<usize> = const { Cell::new(0) };
    static ANCESTOR_REJECTIONS: Cell<usize> = const { Cell::new(0) };
}

/// Reset matching statistics (call before compute_match)
#[cfg(feature = "matching-stats")]
pub fn reset_stats() {
    DISTANCE_CALLS.with(|c| c.set(0));
    ANCESTOR_REJECTIONS.with(|c| c.set(0));
}

/// Get matching statistics: (distance_calls, ancestor_rejections)
#[cfg(feature = "matching-stats")]
pub fn get_stats() -> (usize, usize) {
    let calls = DISTANCE_CALLS.with(Cell::get);
    let rejections = ANCESTOR_REJECTIONS.with(Cell::get);
    (calls, rejections)
}

/// Distance of identical nodes.
pub const EXACT_MATCH_DISTANCE: f64 = 0.0;

/// Threshold of the first pass: only near-identical nodes match.
pub const EPSILON_DISTANCE: f64 = 1e-5;

/// Largest distance a comparer should report.
pub const MAX_DISTANCE: f64 = 1.0;

/// Configuration for the matching passes.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingConfig {
    /// Distance thresholds, one pass per entry, in increasing order. A pair
    /// is accepted in a pass if its distance is at most that pass's
    /// threshold.
    pub thresholds: Vec<f64>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            thresholds: vec![EPSILON_DISTANCE, 0.25, 0.5, 0.75, MAX_DISTANCE],
        }
    }
}

/// Errors raised while building a [`Match`].
///
/// These indicate a comparer or caller contract violation; nodes are
/// rendered with their `Debug` representation.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
#[facet(derive(Error))]
#[repr(u8)]
pub enum MatchError {
    /// label {label} of node {node} is outside 0..{label_count}
    InvalidLabel {
        /// The offending node
        node: String,
        /// Its label
        label: usize,
        /// The comparer's label count
        label_count: usize,
    },
    /// known match {old} and {new} have different labels
    LabelMismatch {
        /// The old side of the known match
        old: String,
        /// The new side of the known match
        new: String,
    },
    /// known match {old} and {new} includes an ignored node
    IgnoredKnownMatch {
        /// The old side of the known match
        old: String,
        /// The new side of the known match
        new: String,
    },
    /// node {node} of a known match is not in the old tree
    NotInOldTree {
        /// The misplaced node
        node: String,
    },
    /// node {node} of a known match is not in the new tree
    NotInNewTree {
        /// The misplaced node
        node: String,
    },
    /// roots {old} and {new} must both be labeled, with the same label
    RootLabelMismatch {
        /// The old root
        old: String,
        /// The new root
        new: String,
    },
    /// roots {old} and {new} belong to the same tree
    RootsInSameTree {
        /// The old root
        old: String,
        /// The new root
        new: String,
    },
}

/// A one-to-one correspondence between nodes of an old and a new tree.
pub struct Match<'c, C: TreeComparer> {
    comparer: &'c C,
    old_root: C::Node,
    new_root: C::Node,
    old_to_new: HashMap<C::Node, C::Node>,
    new_to_old: HashMap<C::Node, C::Node>,
    /// Pairs in the order they were matched.
    pairs: Vec<(C::Node, C::Node)>,
}

impl<C: TreeComparer> core::fmt::Debug for Match<'_, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Match")
            .field("old_root", &self.old_root)
            .field("new_root", &self.new_root)
            .field("pairs", &self.pairs)
            .finish()
    }
}

impl<'c, C: TreeComparer> Match<'c, C> {
    fn with_roots(comparer: &'c C, old_root: C::Node, new_root: C::Node) -> Self {
        let mut matching = Self {
            comparer,
            old_root,
            new_root,
            old_to_new: HashMap::default(),
            new_to_old: HashMap::default(),
            pairs: Vec::new(),
        };
        matching.try_add(old_root, new_root);
        matching
    }

    /// Record a pair unless either node is already matched.
    fn try_add(&mut self, old: C::Node, new: C::Node) -> bool {
        if self.old_to_new.contains_key(&old) || self.new_to_old.contains_key(&new) {
            return false;
        }
        self.old_to_new.insert(old, new);
        self.new_to_old.insert(new, old);
        self.pairs.push((old, new));
        true
    }

    /// The comparer this match was computed with.
    pub fn comparer(&self) -> &'c C {
        self.comparer
    }

    /// Root of the old tree.
    pub fn old_root(&self) -> C::Node {
        self.old_root
    }

    /// Root of the new tree.
    pub fn new_root(&self) -> C::Node {
        self.new_root
    }

    /// Partner of an old node in the new tree.
    #[inline]
    pub fn partner_in_new(&self, old: C::Node) -> Option<C::Node> {
        self.old_to_new.get(&old).copied()
    }

    /// Partner of a new node in the old tree.
    #[inline]
    pub fn partner_in_old(&self, new: C::Node) -> Option<C::Node> {
        self.new_to_old.get(&new).copied()
    }

    /// Whether an old node is matched.
    #[inline]
    pub fn has_partner_in_new(&self, old: C::Node) -> bool {
        self.old_to_new.contains_key(&old)
    }

    /// Whether a new node is matched.
    #[inline]
    pub fn has_partner_in_old(&self, new: C::Node) -> bool {
        self.new_to_old.contains_key(&new)
    }

    /// Whether `old` and `new` are matched to each other.
    #[inline]
    pub fn contains(&self, old: C::Node, new: C::Node) -> bool {
        self.partner_in_new(old) == Some(new)
    }

    /// All matched pairs, roots first, in the order they were matched.
    pub fn matches(&self) -> impl ExactSizeIterator<Item = (C::Node, C::Node)> + '_ {
        self.pairs.iter().copied()
    }

    /// Number of matched pairs, including the roots.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Always false: the roots are matched.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Flat edit script between two node sequences, treating matched nodes
    /// as equal. The result is in ascending order; matched pairs that stay
    /// in order come out as [`Edit::Update`].
    pub fn sequence_edits(&self, old_nodes: &[C::Node], new_nodes: &[C::Node]) -> Vec<Edit<C::Node>> {
        with_local_pool(|pool| self.sequence_edits_in(pool, old_nodes, new_nodes))
    }

    /// Like [`sequence_edits`](Self::sequence_edits), borrowing from `pool`.
    pub fn sequence_edits_in(
        &self,
        pool: &DiagonalPool,
        old_nodes: &[C::Node],
        new_nodes: &[C::Node],
    ) -> Vec<Edit<C::Node>> {
        let mut edits: Vec<_> = Lcs::new(pool)
            .edits(old_nodes.len(), new_nodes.len(), |i, j| {
                self.contains(old_nodes[i], new_nodes[j])
            })
            .map(|edit| match edit {
                SequenceEdit::Insert { new_index } => Edit::Insert {
                    new: new_nodes[new_index],
                },
                SequenceEdit::Delete { old_index } => Edit::Delete {
                    old: old_nodes[old_index],
                },
                SequenceEdit::Update {
                    old_index,
                    new_index,
                } => Edit::Update {
                    old: old_nodes[old_index],
                    new: new_nodes[new_index],
                },
            })
            .collect();
        edits.reverse();
        edits
    }

    /// The longest run of matched pairs that appear in the same relative
    /// order in both sequences, ascending.
    pub fn matching_nodes(&self, old_nodes: &[C::Node], new_nodes: &[C::Node]) -> Vec<(C::Node, C::Node)> {
        let mut pairs: Vec<_> =
            with_local_pool(|pool| self.matching_nodes_descending(pool, old_nodes, new_nodes).collect());
        pairs.reverse();
        pairs
    }

    /// Lazy form of [`matching_nodes`](Self::matching_nodes). Pairs come out
    /// last first, as the LCS backtracks.
    pub fn matching_nodes_descending<'a>(
        &'a self,
        pool: &'a DiagonalPool,
        old_nodes: &'a [C::Node],
        new_nodes: &'a [C::Node],
    ) -> impl Iterator<Item = (C::Node, C::Node)> + 'a {
        Lcs::new(pool)
            .matching_pairs(old_nodes.len(), new_nodes.len(), |i, j| {
                self.contains(old_nodes[i], new_nodes[j])
            })
            .map(|(i, j)| (old_nodes[i], new_nodes[j]))
    }
}

/// Compute a match between the trees rooted at `old_root` and `new_root`.
pub fn compute_match<'c, C: TreeComparer>(
    comparer: &'c C,
    old_root: C::Node,
    new_root: C::Node,
    config: &MatchingConfig,
) -> Result<Match<'c, C>, MatchError> {
    compute_match_with_known(comparer, old_root, new_root, core::iter::empty(), config)
}

/// Compute a match, seeding it with pairs the caller already knows.
///
/// Known pairs must share a label and belong to the right trees. A known
/// pair whose node is already matched (for instance one of the roots) is
/// skipped.
pub fn compute_match_with_known<'c, C, I>(
    comparer: &'c C,
    old_root: C::Node,
    new_root: C::Node,
    known_matches: I,
    config: &MatchingConfig,
) -> Result<Match<'c, C>, MatchError>
where
    C: TreeComparer,
    I: IntoIterator<Item = (C::Node, C::Node)>,
{
    let label_count = comparer.label_count();
    debug!(?old_root, ?new_root, label_count, "compute_match start");
    validate_roots(comparer, old_root, new_root)?;

    let old_nodes = categorize_by_label(comparer, old_root, label_count)?;
    let new_nodes = categorize_by_label(comparer, new_root, label_count)?;

    let mut matching = Match::with_roots(comparer, old_root, new_root);

    for (old, new) in known_matches {
        validate_known_match(comparer, old_root, new_root, old, new, label_count)?;
        if !matching.try_add(old, new) {
            trace!(?old, ?new, "known match skipped, already matched");
        }
    }

    for label in 0..label_count {
        let (old_list, new_list) = (&old_nodes[label], &new_nodes[label]);
        if old_list.is_empty() || new_list.is_empty() {
            continue;
        }
        let tied_to_ancestor = comparer.tied_to_ancestor(label);
        trace!(
            label,
            old = old_list.len(),
            new = new_list.len(),
            tied_to_ancestor,
            "matching label"
        );
        for &threshold in &config.thresholds {
            match_label_pass(&mut matching, old_list, new_list, tied_to_ancestor, threshold);
        }
    }

    debug!(pairs = matching.len(), "compute_match done");
    Ok(matching)
}

/// Bucket the labeled nodes of a tree by label, in pre-order.
fn categorize_by_label<C: TreeComparer>(
    comparer: &C,
    root: C::Node,
    label_count: usize,
) -> Result<Vec<Vec<C::Node>>, MatchError> {
    let mut buckets = vec![Vec::new(); label_count];
    for node in comparer.descendants(root) {
        let Some(label) = comparer.label(node) else {
            continue;
        };
        let Some(bucket) = buckets.get_mut(label) else {
            return Err(MatchError::InvalidLabel {
                node: format!("{node:?}"),
                label,
                label_count,
            });
        };
        bucket.push(node);
    }
    Ok(buckets)
}

fn validate_roots<C: TreeComparer>(comparer: &C, old_root: C::Node, new_root: C::Node) -> Result<(), MatchError> {
    let old_label = comparer.label(old_root);
    if old_label.is_none() || old_label != comparer.label(new_root) {
        return Err(MatchError::RootLabelMismatch {
            old: format!("{old_root:?}"),
            new: format!("{new_root:?}"),
        });
    }
    if comparer.same_tree(old_root, new_root) {
        return Err(MatchError::RootsInSameTree {
            old: format!("{old_root:?}"),
            new: format!("{new_root:?}"),
        });
    }
    Ok(())
}

fn validate_known_match<C: TreeComparer>(
    comparer: &C,
    old_root: C::Node,
    new_root: C::Node,
    old: C::Node,
    new: C::Node,
    label_count: usize,
) -> Result<(), MatchError> {
    let (Some(old_label), Some(new_label)) = (comparer.label(old), comparer.label(new)) else {
        return Err(MatchError::IgnoredKnownMatch {
            old: format!("{old:?}"),
            new: format!("{new:?}"),
        });
    };
    if old_label != new_label {
        return Err(MatchError::LabelMismatch {
            old: format!("{old:?}"),
            new: format!("{new:?}"),
        });
    }
    if old_label >= label_count {
        return Err(MatchError::InvalidLabel {
            node: format!("{old:?}"),
            label: old_label,
            label_count,
        });
    }
    if !comparer.same_tree(old, old_root) {
        return Err(MatchError::NotInOldTree {
            node: format!("{old:?}"),
        });
    }
    if !comparer.same_tree(new, new_root) {
        return Err(MatchError::NotInNewTree {
            node: format!("{new:?}"),
        });
    }
    Ok(())
}

/// Whether the ancestors `degree` levels up are matched to each other.
/// Two missing ancestors count as matched.
fn ancestors_matched<C: TreeComparer>(matching: &Match<'_, C>, old: C::Node, new: C::Node, degree: usize) -> bool {
    let comparer = matching.comparer;
    match (comparer.ancestor(old, degree), comparer.ancestor(new, degree)) {
        (None, None) => true,
        (Some(old_ancestor), Some(new_ancestor)) => matching.contains(old_ancestor, new_ancestor),
        _ => false,
    }
}

/// One pass over a label's nodes at a given threshold.
///
/// New nodes before `first_unmatched` are known to be matched and are not
/// scanned again.
fn match_label_pass<C: TreeComparer>(
    matching: &mut Match<'_, C>,
    old_nodes: &[C::Node],
    new_nodes: &[C::Node],
    tied_to_ancestor: usize,
    max_distance: f64,
) {
    let comparer = matching.comparer;
    let mut first_unmatched = 0;

    for &old in old_nodes {
        if matching.has_partner_in_new(old) {
            continue;
        }

        let mut best: Option<(usize, f64)> = None;
        for (index, &new) in new_nodes.iter().enumerate().skip(first_unmatched) {
            if matching.has_partner_in_old(new) {
                continue;
            }
            if tied_to_ancestor > 0 && !ancestors_matched(matching, old, new, tied_to_ancestor) {
                #[cfg(feature = "matching-stats")]
                ANCESTOR_REJECTIONS.with(|c| c.set(c.get() + 1));
                continue;
            }

            let distance = comparer.distance(old, new);
            #[cfg(feature = "matching-stats")]
            DISTANCE_CALLS.with(|c| c.set(c.get() + 1));

            if best.is_none_or(|(_, best_distance)| distance < best_distance) {
                best = Some((index, distance));
                if distance == EXACT_MATCH_DISTANCE {
                    break;
                }
            }
        }

        let Some((index, distance)) = best else {
            continue;
        };
        if distance > max_distance {
            continue;
        }
        let new = new_nodes[index];
        trace!(?old, ?new, distance, max_distance, "matched");
        let added = matching.try_add(old, new);
        debug_assert!(added);

        if index == first_unmatched {
            first_unmatched = index + 1;
            if first_unmatched == new_nodes.len() {
                return;
            }
        }
    }
}
