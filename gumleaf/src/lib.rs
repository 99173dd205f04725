//! # Gumleaf
//!
//! Generic tree differencing: label-driven node matching, Chawathe edit
//! scripts, and a pooled Myers LCS underneath both.
//!
//! Gumleaf knows nothing about your trees. You describe them through a
//! [`TreeComparer`]: node labels, parent/child structure, a distance between
//! two nodes of the same label, and value equality. From that it computes:
//!
//! 1. **A match** ([`compute_match`]): nodes are bucketed by label and paired
//!    greedily with their closest same-label counterpart, over passes of
//!    increasing distance thresholds. Labels can be tied to an ancestor so
//!    that, say, statements only match inside matched blocks.
//! 2. **An edit script** ([`EditScript`]): inserts, deletes, updates, moves
//!    (new parent) and reorders (same parent, out of order), following
//!    Chawathe et al. (1996).
//!
//! The [`lcs`] module is usable on its own for flat sequences.
//!
//! ## Usage
//!
//! ```
//! use gumleaf::{MatchingConfig, NodeData, Tree, TreePair, diff_trees, EditKind};
//!
//! const ROOT: usize = 0;
//! const LEAF: usize = 1;
//!
//! let mut old = Tree::new(NodeData::new(ROOT, "root"));
//! old.add_child(old.root, NodeData::new(LEAF, "hello"));
//!
//! let mut new = Tree::new(NodeData::new(ROOT, "root"));
//! new.add_child(new.root, NodeData::new(LEAF, "hullo"));
//!
//! let pair = TreePair::new(&old, &new, 2);
//! let script = diff_trees(&pair, old.root_node(), new.root_node(), &MatchingConfig::default())?;
//!
//! let kinds: Vec<_> = script.edits().iter().map(|e| e.kind()).collect();
//! assert_eq!(kinds, vec![EditKind::Update]);
//! # Ok::<(), gumleaf::MatchError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]

pub use indextree;

mod tracing_macros;
pub(crate) use tracing_macros::{debug, trace};

mod chawathe;
mod comparer;
mod edit;
/// Myers longest common subsequence with pooled storage
pub mod lcs;
/// Label-driven node matching
pub mod matching;
/// Arena-backed reference tree and comparer
pub mod tree;

pub use chawathe::{EditScript, generate_edit_script};
pub use comparer::TreeComparer;
pub use edit::{Edit, EditDisplay, EditKind};
pub use lcs::{DiagonalPool, Lcs, PoolConfig, SequenceEdit};
pub use matching::*;
pub use tree::{NodeData, NodeValue, Tree, TreeId, TreeNode, TreePair};

/// Match two trees and generate the edit script between them.
///
/// Shorthand for [`compute_match`] followed by [`Match::into_edit_script`].
pub fn diff_trees<'c, C: TreeComparer>(
    comparer: &'c C,
    old_root: C::Node,
    new_root: C::Node,
    config: &MatchingConfig,
) -> Result<EditScript<'c, C>, MatchError> {
    let matching = compute_match(comparer, old_root, new_root, config)?;
    Ok(matching.into_edit_script())
}
