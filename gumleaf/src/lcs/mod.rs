//! Longest common subsequence over index-addressed sequences.
//!
//! This is Myers' O(ND) greedy algorithm. Sequences are never materialized:
//! callers provide their lengths and an `items_equal(old_index, new_index)`
//! predicate. The forward pass records one V array per edit depth in storage
//! borrowed from a [`DiagonalPool`]; results are then produced lazily by walking those arrays back
//! from the end of both sequences. Consequently both [`MatchingPairs`] and
//! [`SequenceEdits`] yield in *descending* index order.
//!
//! The V array for depth `d` covers diagonals `k ∈ [-d, d]` (depth 0 has
//! three slots, `k ∈ [-1, 1]`) and stores, per diagonal, the furthest `y`
//! reached; `x` is always `y + k`.

mod pool;

use core::fmt;
use core::iter::FusedIterator;

pub use pool::{DiagonalChain, DiagonalPool, PoolConfig};
use pool::DiagonalStack;

use crate::edit::EditKind;
use crate::trace;

/// Sequences whose lengths differ by more than this factor are treated as
/// completely different without running the search.
pub const MAX_LENGTH_RATIO: usize = 100;

/// One step of a flat-sequence edit script.
///
/// `Update` marks a matched pair: the items at both indices are equal and
/// kept.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceEdit {
    /// The item at `new_index` in the new sequence has no counterpart.
    Insert {
        /// Index into the new sequence.
        new_index: usize,
    },
    /// The item at `old_index` in the old sequence has no counterpart.
    Delete {
        /// Index into the old sequence.
        old_index: usize,
    },
    /// The items at `old_index` and `new_index` are part of the LCS.
    Update {
        /// Index into the old sequence.
        old_index: usize,
        /// Index into the new sequence.
        new_index: usize,
    },
}

impl SequenceEdit {
    /// The kind of this edit.
    pub fn kind(&self) -> EditKind {
        match self {
            SequenceEdit::Insert { .. } => EditKind::Insert,
            SequenceEdit::Delete { .. } => EditKind::Delete,
            SequenceEdit::Update { .. } => EditKind::Update,
        }
    }

    /// Index into the old sequence, absent for inserts.
    pub fn old_index(&self) -> Option<usize> {
        match *self {
            SequenceEdit::Insert { .. } => None,
            SequenceEdit::Delete { old_index } | SequenceEdit::Update { old_index, .. } => {
                Some(old_index)
            }
        }
    }

    /// Index into the new sequence, absent for deletes.
    pub fn new_index(&self) -> Option<usize> {
        match *self {
            SequenceEdit::Delete { .. } => None,
            SequenceEdit::Insert { new_index } | SequenceEdit::Update { new_index, .. } => {
                Some(new_index)
            }
        }
    }
}

impl fmt::Display for SequenceEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceEdit::Insert { new_index } => write!(f, "Insert(new:{new_index})"),
            SequenceEdit::Delete { old_index } => write!(f, "Delete(old:{old_index})"),
            SequenceEdit::Update {
                old_index,
                new_index,
            } => write!(f, "Update(old:{old_index} -> new:{new_index})"),
        }
    }
}

impl fmt::Debug for SequenceEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Entry point for LCS computations backed by a [`DiagonalPool`].
#[derive(Debug, Clone, Copy)]
pub struct Lcs<'p> {
    pool: &'p DiagonalPool,
}

impl<'p> Lcs<'p> {
    /// Borrow V arrays from `pool` for every computation.
    pub fn new(pool: &'p DiagonalPool) -> Self {
        Self { pool }
    }

    /// `1 - lcs / max(old_len, new_len)`, in `[0, 1]`.
    ///
    /// Two empty sequences are at distance 0; one empty sequence is at
    /// distance 1 from any non-empty one. Sequences whose lengths differ by
    /// more than [`MAX_LENGTH_RATIO`] are at distance 1 without comparing
    /// any items.
    pub fn compute_distance<F>(&self, old_len: usize, new_len: usize, items_equal: F) -> f64
    where
        F: FnMut(usize, usize) -> bool,
    {
        if old_len == 0 || new_len == 0 {
            return if old_len == new_len { 0.0 } else { 1.0 };
        }
        if old_len > new_len.saturating_mul(MAX_LENGTH_RATIO)
            || new_len > old_len.saturating_mul(MAX_LENGTH_RATIO)
        {
            trace!(old_len, new_len, "length ratio too large, skipping LCS");
            return 1.0;
        }
        let lcs_len = self.matching_pairs(old_len, new_len, items_equal).count();
        1.0 - lcs_len as f64 / old_len.max(new_len) as f64
    }

    /// The pairs `(old_index, new_index)` of one longest common subsequence,
    /// in descending order.
    pub fn matching_pairs<F>(&self, old_len: usize, new_len: usize, items_equal: F) -> MatchingPairs<'p>
    where
        F: FnMut(usize, usize) -> bool,
    {
        MatchingPairs {
            path: EditPath::compute(self.pool, old_len, new_len, items_equal),
            diagonal: Diagonal::default(),
        }
    }

    /// A shortest edit script from the old sequence to the new one, in
    /// descending order. LCS pairs are reported as [`SequenceEdit::Update`].
    pub fn edits<F>(&self, old_len: usize, new_len: usize, items_equal: F) -> SequenceEdits<'p>
    where
        F: FnMut(usize, usize) -> bool,
    {
        SequenceEdits {
            path: EditPath::compute(self.pool, old_len, new_len, items_equal),
            diagonal: Diagonal::default(),
            pending: None,
        }
    }
}

#[inline]
fn v_get(v: &[usize], k: isize) -> isize {
    v[(k + (v.len() / 2) as isize) as usize] as isize
}

#[inline]
fn v_set(v: &mut [usize], k: isize, y: isize) {
    let offset = (v.len() / 2) as isize;
    v[(k + offset) as usize] = y as usize;
}

/// Whether the step into diagonal `k` at depth `d` comes from `k - 1`
/// (a deletion, moving right) rather than `k + 1` (an insertion, moving down).
#[inline]
fn moves_right(v: &[usize], d: isize, k: isize) -> bool {
    k == d || (k != -d && v_get(v, k - 1) > v_get(v, k + 1))
}

/// One depth's worth of the path: a single edit from `start` to `mid`,
/// followed by a diagonal run from `mid` to `end`.
#[derive(Debug, Clone, Copy)]
struct Snake {
    x_start: isize,
    y_start: isize,
    x_mid: isize,
    y_mid: isize,
    x_end: isize,
    y_end: isize,
}

/// The forward pass result plus the backtracking cursor.
struct EditPath<'p> {
    stack: DiagonalStack<'p>,
    x: isize,
    y: isize,
    remaining: usize,
}

impl<'p> EditPath<'p> {
    fn compute<F>(pool: &'p DiagonalPool, old_len: usize, new_len: usize, mut items_equal: F) -> Self
    where
        F: FnMut(usize, usize) -> bool,
    {
        let mut stack = DiagonalStack::new(pool);
        let (n, m) = (old_len as isize, new_len as isize);

        let mut d: isize = 0;
        let mut reached_end = false;
        while !reached_end {
            let v = stack.push();
            let mut k = -d;
            while k <= d {
                let right = moves_right(v, d, k);
                let y_start = v_get(v, if right { k - 1 } else { k + 1 });
                let y_mid = if right { y_start } else { y_start + 1 };
                let (mut x_end, mut y_end) = (y_mid + k, y_mid);
                while x_end < n && y_end < m && items_equal(x_end as usize, y_end as usize) {
                    x_end += 1;
                    y_end += 1;
                }
                v_set(v, k, y_end);
                if x_end >= n && y_end >= m {
                    reached_end = true;
                }
                k += 2;
            }
            d += 1;
        }
        trace!(old_len, new_len, depth = d - 1, "myers forward pass done");

        let remaining = stack.len();
        Self {
            stack,
            x: n,
            y: m,
            remaining,
        }
    }

    /// Step one depth back along the path.
    fn next_snake(&mut self) -> Option<Snake> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let d = self.remaining as isize;
        let v = self.stack.array(self.remaining);

        let k = self.x - self.y;
        let y_end = v_get(v, k);
        let x_end = y_end + k;

        let right = moves_right(v, d, k);
        let k_prev = if right { k - 1 } else { k + 1 };
        let y_start = v_get(v, k_prev);
        let x_start = y_start + k_prev;
        let y_mid = if right { y_start } else { y_start + 1 };
        let x_mid = y_mid + k;

        self.x = x_start;
        self.y = y_start;
        Some(Snake {
            x_start,
            y_start,
            x_mid,
            y_mid,
            x_end,
            y_end,
        })
    }

    fn finish(&mut self) {
        self.remaining = 0;
        self.stack.release();
    }
}

/// Diagonal run still to be reported, walked from its end back to `x_mid`.
#[derive(Debug, Default, Clone, Copy)]
struct Diagonal {
    x_end: isize,
    y_end: isize,
    x_mid: isize,
}

impl Diagonal {
    fn from_snake(snake: &Snake) -> Self {
        Self {
            x_end: snake.x_end,
            y_end: snake.y_end,
            x_mid: snake.x_mid,
        }
    }

    fn next_back(&mut self) -> Option<(usize, usize)> {
        if self.x_end > self.x_mid {
            self.x_end -= 1;
            self.y_end -= 1;
            Some((self.x_end as usize, self.y_end as usize))
        } else {
            None
        }
    }
}

/// Lazily yields LCS pairs in descending order.
///
/// Holds a pooled chain until exhausted or dropped.
pub struct MatchingPairs<'p> {
    path: EditPath<'p>,
    diagonal: Diagonal,
}

impl Iterator for MatchingPairs<'_> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(pair) = self.diagonal.next_back() {
                return Some(pair);
            }
            if self.path.x <= 0 || self.path.y <= 0 {
                self.path.finish();
                return None;
            }
            match self.path.next_snake() {
                Some(snake) => self.diagonal = Diagonal::from_snake(&snake),
                None => {
                    self.path.finish();
                    return None;
                }
            }
        }
    }
}

impl FusedIterator for MatchingPairs<'_> {}

/// Lazily yields a shortest edit script in descending order.
///
/// Holds a pooled chain until exhausted or dropped.
pub struct SequenceEdits<'p> {
    path: EditPath<'p>,
    diagonal: Diagonal,
    pending: Option<SequenceEdit>,
}

impl Iterator for SequenceEdits<'_> {
    type Item = SequenceEdit;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((old_index, new_index)) = self.diagonal.next_back() {
                return Some(SequenceEdit::Update {
                    old_index,
                    new_index,
                });
            }
            if let Some(edit) = self.pending.take() {
                return Some(edit);
            }
            if self.path.x <= 0 && self.path.y <= 0 {
                self.path.finish();
                return None;
            }
            let Some(snake) = self.path.next_snake() else {
                self.path.finish();
                return None;
            };
            self.diagonal = Diagonal::from_snake(&snake);
            // Depth 0 has no edit of its own, only the leading diagonal.
            if snake.x_mid > 0 || snake.y_mid > 0 {
                self.pending = Some(if snake.x_start == snake.x_mid {
                    SequenceEdit::Insert {
                        new_index: (snake.y_mid - 1) as usize,
                    }
                } else {
                    SequenceEdit::Delete {
                        old_index: (snake.x_mid - 1) as usize,
                    }
                });
            }
            debug_assert!(snake.y_start <= snake.y_mid);
        }
    }
}

impl FusedIterator for SequenceEdits<'_> {}

thread_local! {
    static LOCAL_POOL: DiagonalPool = DiagonalPool::default();
}

/// Run `f` with this thread's default pool.
pub fn with_local_pool<R>(f: impl FnOnce(&DiagonalPool) -> R) -> R {
    LOCAL_POOL.with(f)
}

/// Distance between two slices, using the thread's default pool.
pub fn distance<T: PartialEq>(old: &[T], new: &[T]) -> f64 {
    with_local_pool(|pool| Lcs::new(pool).compute_distance(old.len(), new.len(), |i, j| old[i] == new[j]))
}

/// LCS pairs of two slices in ascending order, using the thread's default pool.
pub fn matching_pairs<T: PartialEq>(old: &[T], new: &[T]) -> Vec<(usize, usize)> {
    let mut pairs: Vec<_> = with_local_pool(|pool| {
        Lcs::new(pool)
            .matching_pairs(old.len(), new.len(), |i, j| old[i] == new[j])
            .collect()
    });
    pairs.reverse();
    pairs
}

/// Length of the LCS of two slices.
pub fn lcs_len<T: PartialEq>(old: &[T], new: &[T]) -> usize {
    with_local_pool(|pool| {
        Lcs::new(pool)
            .matching_pairs(old.len(), new.len(), |i, j| old[i] == new[j])
            .count()
    })
}

/// Shortest edit script between two slices in ascending order, using the
/// thread's default pool.
pub fn edits<T: PartialEq>(old: &[T], new: &[T]) -> Vec<SequenceEdit> {
    let mut edits: Vec<_> = with_local_pool(|pool| {
        Lcs::new(pool)
            .edits(old.len(), new.len(), |i, j| old[i] == new[j])
            .collect()
    });
    edits.reverse();
    edits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug;
    use facet_testhelpers::test;

    const OLD: &[u8] = b"ABCABBA";
    const NEW: &[u8] = b"CBABAC";

    /// Apply an ascending edit script to `old`.
    fn replay(old: &[u8], new: &[u8], edits: &[SequenceEdit]) -> Vec<u8> {
        let mut out = Vec::new();
        for edit in edits {
            match *edit {
                SequenceEdit::Update {
                    old_index,
                    new_index,
                } => {
                    assert_eq!(old[old_index], new[new_index]);
                    out.push(old[old_index]);
                }
                SequenceEdit::Insert { new_index } => out.push(new[new_index]),
                SequenceEdit::Delete { .. } => {}
            }
        }
        out
    }

    #[test]
    fn myers_paper_example() {
        let edits = edits(OLD, NEW);
        debug!(?edits, "edits");

        let kept = edits.iter().filter(|e| e.kind() == EditKind::Update).count();
        let changed = edits.len() - kept;
        assert_eq!(kept, 4);
        assert_eq!(changed, 5);
        assert_eq!(replay(OLD, NEW, &edits), NEW);
    }

    #[test]
    fn edits_cover_every_index_once() {
        let edits = edits(OLD, NEW);
        let olds: Vec<_> = edits.iter().filter_map(|e| e.old_index()).collect();
        let news: Vec<_> = edits.iter().filter_map(|e| e.new_index()).collect();
        assert_eq!(olds, (0..OLD.len()).collect::<Vec<_>>());
        assert_eq!(news, (0..NEW.len()).collect::<Vec<_>>());
    }

    #[test]
    fn matching_pairs_are_strictly_increasing() {
        let pairs = matching_pairs(OLD, NEW);
        assert_eq!(pairs.len(), 4);
        for window in pairs.windows(2) {
            assert!(window[0].0 < window[1].0);
            assert!(window[0].1 < window[1].1);
        }
        for &(i, j) in &pairs {
            assert_eq!(OLD[i], NEW[j]);
        }
    }

    #[test]
    fn lazy_pairs_come_out_descending() {
        let pool = DiagonalPool::new();
        let pairs: Vec<_> = Lcs::new(&pool)
            .matching_pairs(OLD.len(), NEW.len(), |i, j| OLD[i] == NEW[j])
            .collect();
        assert!(pairs.windows(2).all(|w| w[0].0 > w[1].0 && w[0].1 > w[1].1));
    }

    #[test]
    fn identical_sequences() {
        let seq = b"the quick brown fox";
        assert_eq!(distance(seq, seq), 0.0);
        assert_eq!(lcs_len(seq, seq), seq.len());
        assert!(edits(seq, seq).iter().all(|e| e.kind() == EditKind::Update));
    }

    #[test]
    fn empty_sequences() {
        let empty: &[u8] = &[];
        assert_eq!(distance(empty, empty), 0.0);
        assert_eq!(distance(empty, b"abc"), 1.0);
        assert_eq!(distance(b"abc", empty), 1.0);
        assert!(edits(empty, empty).is_empty());
        assert!(matching_pairs(empty, b"abc").is_empty());
    }

    #[test]
    fn one_side_empty_is_all_inserts_or_deletes() {
        let empty: &[u8] = &[];
        let inserts = edits(empty, b"xyz");
        assert_eq!(
            inserts,
            vec![
                SequenceEdit::Insert { new_index: 0 },
                SequenceEdit::Insert { new_index: 1 },
                SequenceEdit::Insert { new_index: 2 },
            ]
        );
        let deletes = edits(b"xy", empty);
        assert_eq!(
            deletes,
            vec![
                SequenceEdit::Delete { old_index: 0 },
                SequenceEdit::Delete { old_index: 1 },
            ]
        );
    }

    #[test]
    fn disjoint_sequences_are_at_distance_one() {
        assert_eq!(distance(b"aaaa", b"bbbb"), 1.0);
        assert_eq!(lcs_len(b"aaaa", b"bbbb"), 0);
    }

    #[test]
    fn distance_is_one_minus_lcs_ratio() {
        // LCS of "abcd" and "abxd" is "abd"
        assert_eq!(distance(b"abcd", b"abxd"), 0.25);
        // LCS is 4 out of max length 7
        let d = distance(OLD, NEW);
        assert!((d - 3.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn length_ratio_short_circuits_without_comparing() {
        let pool = DiagonalPool::new();
        let mut calls = 0;
        let d = Lcs::new(&pool).compute_distance(1, 101, |_, _| {
            calls += 1;
            true
        });
        assert_eq!(d, 1.0);
        assert_eq!(calls, 0);

        // exactly 100x is still compared
        let d = Lcs::new(&pool).compute_distance(1, 100, |_, j| j == 0);
        assert!((d - 0.99).abs() < 1e-12);
    }

    #[test]
    fn deep_scripts_spill_into_chained_segments() {
        let pool = DiagonalPool::with_config(PoolConfig {
            first_segment_depth: 3,
            growth_factor: 2,
            max_pooled_depth: 6,
            max_pooled_chains: 1,
        });
        let old: Vec<u32> = (0..40).collect();
        let new: Vec<u32> = (0..40).map(|i| if i % 3 == 0 { i + 1000 } else { i }).collect();
        let lcs = Lcs::new(&pool);
        let mut edits: Vec<_> = lcs
            .edits(old.len(), new.len(), |i, j| old[i] == new[j])
            .collect();
        edits.reverse();
        let kept = edits.iter().filter(|e| e.kind() == EditKind::Update).count();
        assert_eq!(kept, 40 - 14);
        assert_eq!(edits.len() - kept, 28);
        assert_eq!(pool.idle_chains(), 1);
    }

    #[test]
    fn dropping_iterator_early_returns_chain() {
        let pool = DiagonalPool::new();
        {
            let mut pairs = Lcs::new(&pool).matching_pairs(OLD.len(), NEW.len(), |i, j| OLD[i] == NEW[j]);
            assert!(pairs.next().is_some());
            assert_eq!(pool.idle_chains(), 0);
        }
        assert_eq!(pool.idle_chains(), 1);
    }

    #[test]
    fn exhausted_iterator_returns_chain_before_drop() {
        let pool = DiagonalPool::new();
        let mut edits = Lcs::new(&pool).edits(OLD.len(), NEW.len(), |i, j| OLD[i] == NEW[j]);
        for _ in edits.by_ref() {}
        assert_eq!(pool.idle_chains(), 1);
        assert!(edits.next().is_none());
    }

    #[test]
    fn sequence_edit_display() {
        assert_eq!(SequenceEdit::Insert { new_index: 3 }.to_string(), "Insert(new:3)");
        assert_eq!(
            SequenceEdit::Update {
                old_index: 1,
                new_index: 2
            }
            .to_string(),
            "Update(old:1 -> new:2)"
        );
    }
}
