//! Pooled storage for the per-depth V arrays of the Myers search.
//!
//! The forward pass records one V array per edit depth `d`: three slots for
//! depth 0 and `2d + 1` slots afterwards. Backtracking reads them back in
//! reverse. Laid end to end, the array for depth `d` starts at `d² + 2` (or
//! 0 for depth 0), so contiguous depth ranges share a single allocation.
//!
//! A [`DiagonalChain`] is a list of such allocations ("segments"). The first
//! covers depths `0..=first_segment_depth`; each later one starts right after
//! its predecessor and reaches `growth_factor` times as deep. Chains are
//! borrowed whole from a [`DiagonalPool`] and handed back when the iterator
//! that owns them is exhausted or dropped.

use core::mem;

use parking_lot::Mutex;

use crate::debug;

/// Sizing knobs for a [`DiagonalPool`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Deepest edit depth held by the first segment of a chain.
    pub first_segment_depth: usize,
    /// Each additional segment reaches this many times deeper than the one before it.
    pub growth_factor: usize,
    /// Segments reaching past this depth are freed instead of pooled.
    pub max_pooled_depth: usize,
    /// Idle chains kept around for reuse; extra chains are freed.
    pub max_pooled_chains: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            first_segment_depth: 100,
            growth_factor: 2,
            max_pooled_depth: 800,
            max_pooled_chains: 8,
        }
    }
}

/// Offset of the V array for `depth` if every array from depth 0 were laid
/// out back to back.
#[inline]
fn array_start(depth: usize) -> usize {
    if depth == 0 { 0 } else { depth * depth + 2 }
}

/// One contiguous allocation covering depths `min_depth..=max_depth`.
#[derive(Debug)]
struct Segment {
    min_depth: usize,
    max_depth: usize,
    values: Box<[usize]>,
}

impl Segment {
    fn new(min_depth: usize, max_depth: usize) -> Self {
        let len = array_start(max_depth + 1) - array_start(min_depth);
        Self {
            min_depth,
            max_depth,
            values: vec![0; len].into_boxed_slice(),
        }
    }

    #[inline]
    fn range(&self, depth: usize) -> core::ops::Range<usize> {
        let start = array_start(depth) - array_start(self.min_depth);
        let end = array_start(depth + 1) - array_start(self.min_depth);
        start..end
    }
}

/// A growable list of segments, owned by one computation at a time.
#[derive(Debug, Default)]
pub struct DiagonalChain {
    segments: Vec<Segment>,
}

impl DiagonalChain {
    fn new(config: &PoolConfig) -> Self {
        Self {
            segments: vec![Segment::new(0, config.first_segment_depth)],
        }
    }

    /// Deepest depth this chain can currently store, if it has any segment.
    pub fn capacity_depth(&self) -> Option<usize> {
        self.segments.last().map(|s| s.max_depth)
    }

    /// Number of segments currently allocated.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    fn ensure_depth(&mut self, depth: usize, config: &PoolConfig) {
        if self.segments.is_empty() {
            self.segments
                .push(Segment::new(0, config.first_segment_depth));
        }
        while let Some(last) = self.segments.last()
            && last.max_depth < depth
        {
            let min_depth = last.max_depth + 1;
            let max_depth = (last.max_depth * config.growth_factor).max(min_depth);
            debug!(min_depth, max_depth, "growing diagonal chain");
            self.segments.push(Segment::new(min_depth, max_depth));
        }
    }

    fn segment_index(&self, depth: usize) -> usize {
        self.segments.partition_point(|s| s.max_depth < depth)
    }

    fn array(&self, depth: usize) -> &[usize] {
        let segment = &self.segments[self.segment_index(depth)];
        &segment.values[segment.range(depth)]
    }

    /// Returns the arrays for `depth - 1` and `depth`, which may live in
    /// different segments.
    fn arrays_mut(&mut self, depth: usize) -> (&[usize], &mut [usize]) {
        debug_assert!(depth > 0);
        let index = self.segment_index(depth);
        let segment = &self.segments[index];
        if segment.min_depth == depth {
            let (before, after) = self.segments.split_at_mut(index);
            let prev = &before[index - 1];
            let current = &mut after[0];
            let current_range = current.range(depth);
            (
                &prev.values[prev.range(depth - 1)],
                &mut current.values[current_range],
            )
        } else {
            let segment = &mut self.segments[index];
            let prev_range = segment.range(depth - 1);
            let current_range = segment.range(depth);
            // Arrays within a segment are adjacent.
            let (head, tail) = segment.values.split_at_mut(current_range.start);
            (&head[prev_range], &mut tail[..current_range.len()])
        }
    }

    /// Drops segments reaching past `max_depth`. Returns how many were freed.
    fn trim(&mut self, max_depth: usize) -> usize {
        let before = self.segments.len();
        self.segments.retain(|s| s.max_depth <= max_depth);
        before - self.segments.len()
    }
}

/// A thread-safe pool of reusable [`DiagonalChain`]s.
///
/// Any number of computations may borrow from the same pool concurrently;
/// each one owns its chain exclusively until it gives it back.
#[derive(Debug, Default)]
pub struct DiagonalPool {
    config: PoolConfig,
    idle: Mutex<Vec<DiagonalChain>>,
}

impl DiagonalPool {
    /// Create a pool with the default sizing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pool with explicit sizing.
    pub fn with_config(config: PoolConfig) -> Self {
        Self {
            config,
            idle: Mutex::new(Vec::new()),
        }
    }

    /// The sizing this pool was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Number of chains waiting to be reused.
    pub fn idle_chains(&self) -> usize {
        self.idle.lock().len()
    }

    /// Borrow a chain, allocating a fresh one if none is idle.
    pub fn take(&self) -> DiagonalChain {
        self.idle
            .lock()
            .pop()
            .unwrap_or_else(|| DiagonalChain::new(&self.config))
    }

    /// Hand a chain back. Oversized segments are freed first, and the chain
    /// itself is freed if the pool is already full.
    pub fn give_back(&self, mut chain: DiagonalChain) {
        let freed = chain.trim(self.config.max_pooled_depth);
        if freed > 0 {
            debug!(freed, "freeing oversized diagonal segments");
        }
        if chain.segments.is_empty() {
            return;
        }
        let mut idle = self.idle.lock();
        if idle.len() < self.config.max_pooled_chains {
            idle.push(chain);
        }
    }
}

/// Stack of V arrays for one forward pass, backed by a borrowed chain.
///
/// The chain goes back to the pool on [`release`](Self::release) or drop,
/// whichever comes first.
pub(crate) struct DiagonalStack<'p> {
    pool: &'p DiagonalPool,
    chain: DiagonalChain,
    depth: usize,
}

impl<'p> DiagonalStack<'p> {
    pub(crate) fn new(pool: &'p DiagonalPool) -> Self {
        Self {
            pool,
            chain: pool.take(),
            depth: 0,
        }
    }

    /// Number of arrays pushed so far.
    pub(crate) fn len(&self) -> usize {
        self.depth
    }

    /// Push the array for the next depth and return it.
    ///
    /// Depth 0 starts zeroed. Later depths start as a copy of the previous
    /// array shifted to keep each diagonal `k` at the same logical index,
    /// with the two new edge slots zeroed.
    pub(crate) fn push(&mut self) -> &mut [usize] {
        let depth = self.depth;
        self.depth += 1;
        self.chain.ensure_depth(depth, &self.pool.config);
        if depth == 0 {
            let current = &mut self.chain.segments[0].values[0..3];
            current.fill(0);
            return current;
        }
        let (prev, current) = self.chain.arrays_mut(depth);
        // Offsets are len/2, so the shift is 0 from depth 0 to 1 and 1 afterwards.
        let shift = current.len() / 2 - prev.len() / 2;
        current[..shift].fill(0);
        current[shift..shift + prev.len()].copy_from_slice(prev);
        current[shift + prev.len()..].fill(0);
        current
    }

    /// The array recorded for `depth`.
    pub(crate) fn array(&self, depth: usize) -> &[usize] {
        debug_assert!(depth < self.depth);
        self.chain.array(depth)
    }

    /// Give the chain back to the pool early. Idempotent.
    pub(crate) fn release(&mut self) {
        if self.chain.segments.is_empty() {
            return;
        }
        self.depth = 0;
        self.pool.give_back(mem::take(&mut self.chain));
    }
}

impl Drop for DiagonalStack<'_> {
    fn drop(&mut self) {
        self.release();
    }
}
