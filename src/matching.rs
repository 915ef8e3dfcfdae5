//! Backtracking count of connected red completions for one blue vector.
//!
//! The red edges form a perfect matching over the matchable nodes (path
//! interior nodes and every cycle node). A completion is counted only if the
//! combined red/blue graph is connected. The search keeps a *connected-to-path*
//! set of components and the number of still-unmatched nodes inside it; a red
//! edge that would use up the last two connected nodes while components remain
//! outside is never placed.
//!
//! Symmetry is collapsed rather than enumerated:
//! - the pivot is always the first unmatched connected node, and pairing it
//!   with any of the other `u - 1` unmatched connected nodes leads to
//!   isomorphic subproblems, so one representative is searched and scaled;
//! - untouched cycles of the same length are interchangeable, so only one of
//!   each length is opened.

use crate::arith::{Arithmetic, ExactArith, ModArith, Modulus};
use crate::error::FeynmanError;
use crate::partition::BlueVector;
use num_bigint::BigUint;
use std::ops::{Deref, DerefMut};

// ============================================================================
// NodeSet
// ============================================================================

/// A fixed-capacity bitset with a cached population count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeSet {
    words: Vec<u64>,
    capacity: usize,
    count: usize,
}

impl NodeSet {
    /// Creates an empty set over `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0u64; capacity.div_ceil(64)],
            capacity,
            count: 0,
        }
    }

    /// Universe size.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of members.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns true if the set has no members.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns true if every element of the universe is a member.
    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.count == self.capacity
    }

    /// Membership test.
    #[inline(always)]
    pub fn contains(&self, i: usize) -> bool {
        debug_assert!(i < self.capacity);
        (self.words[i / 64] >> (i % 64)) & 1 != 0
    }

    /// Adds `i`; it must not already be present.
    #[inline(always)]
    pub fn insert(&mut self, i: usize) {
        debug_assert!(!self.contains(i), "node {i} already set");
        self.words[i / 64] |= 1u64 << (i % 64);
        self.count += 1;
    }

    /// Removes `i`; it must be present.
    #[inline(always)]
    pub fn remove(&mut self, i: usize) {
        debug_assert!(self.contains(i), "node {i} not set");
        self.words[i / 64] &= !(1u64 << (i % 64));
        self.count -= 1;
    }

    /// First index `>= from` that is not a member.
    pub fn next_clear(&self, from: usize) -> Option<usize> {
        let mut w = from / 64;
        if w >= self.words.len() {
            return None;
        }
        // Treat bits below `from` as set so they are skipped.
        let mut word = self.words[w] | ((1u64 << (from % 64)) - 1);
        loop {
            if word != u64::MAX {
                let i = w * 64 + (!word).trailing_zeros() as usize;
                return (i < self.capacity).then_some(i);
            }
            w += 1;
            if w >= self.words.len() {
                return None;
            }
            word = self.words[w];
        }
    }

    /// First index `>= from` that is a member.
    pub fn next_set(&self, from: usize) -> Option<usize> {
        let mut w = from / 64;
        if w >= self.words.len() {
            return None;
        }
        let mut word = self.words[w] & !((1u64 << (from % 64)) - 1);
        loop {
            if word != 0 {
                return Some(w * 64 + word.trailing_zeros() as usize);
            }
            w += 1;
            if w >= self.words.len() {
                return None;
            }
            word = self.words[w];
        }
    }
}

// ============================================================================
// MatchState
// ============================================================================

/// A matchable node: component index and node index within the component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRef {
    /// Component index (0 is the path).
    pub component: usize,
    /// Node index inside the component.
    pub node: usize,
}

impl NodeRef {
    /// Convenience constructor.
    pub const fn new(component: usize, node: usize) -> Self {
        Self { component, node }
    }
}

/// Mutable search state for one blue vector.
///
/// Invariant: `unmatched_connected` equals the number of unmatched nodes over
/// all components in `connected`, and a cycle is in `connected` iff at least
/// one of its nodes is matched. Component 0 (the path) is always connected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchState {
    matched: Vec<NodeSet>,
    connected: NodeSet,
    unmatched_connected: usize,
    max_size: usize,
}

impl MatchState {
    /// Builds the initial (nothing matched) state for a blue vector.
    pub fn new(blue: &BlueVector) -> Self {
        let sizes = blue.component_sizes();
        let max_size = sizes.iter().copied().max().unwrap_or(0);
        let mut connected = NodeSet::new(sizes.len());
        connected.insert(0);
        Self {
            unmatched_connected: sizes[0],
            matched: sizes.into_iter().map(NodeSet::new).collect(),
            connected,
            max_size,
        }
    }

    /// Number of components.
    #[inline(always)]
    pub fn n_components(&self) -> usize {
        self.matched.len()
    }

    /// Matchable size of component `c`.
    #[inline(always)]
    pub fn size(&self, c: usize) -> usize {
        self.matched[c].capacity()
    }

    /// Number of matched nodes in component `c`.
    #[inline(always)]
    pub fn cardinality(&self, c: usize) -> usize {
        self.matched[c].len()
    }

    /// Whether component `c` is reachable from the path through red edges.
    #[inline(always)]
    pub fn is_connected(&self, c: usize) -> bool {
        self.connected.contains(c)
    }

    /// Whether node `n` already carries a red edge.
    #[inline(always)]
    pub fn is_matched(&self, n: NodeRef) -> bool {
        self.matched[n.component].contains(n.node)
    }

    /// Unmatched nodes across all connected components.
    #[inline(always)]
    pub fn unmatched_connected(&self) -> usize {
        self.unmatched_connected
    }

    /// Largest component size.
    #[inline(always)]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// First unmatched connected node strictly after `after` (or the very
    /// first one when `after` is `None`), in component-then-node order.
    pub fn next_unmatched_connected(&self, after: Option<NodeRef>) -> Option<NodeRef> {
        let (start_c, start_n) = match after {
            None => (0, 0),
            Some(n) => (n.component, n.node + 1),
        };
        let mut c = self.connected.next_set(start_c)?;
        loop {
            let from = if c == start_c { start_n } else { 0 };
            if let Some(node) = self.matched[c].next_clear(from) {
                return Some(NodeRef::new(c, node));
            }
            c = self.connected.next_set(c + 1)?;
        }
    }

    /// The canonical pivot: first unmatched connected node.
    #[inline]
    pub fn pivot(&self) -> Option<NodeRef> {
        self.next_unmatched_connected(None)
    }

    /// Places the red edge `(a, b)`.
    ///
    /// A component joins the connected set the moment it receives its first
    /// red edge, bringing its full size into `unmatched_connected`.
    pub fn match_pair(&mut self, a: NodeRef, b: NodeRef) {
        self.mark(a);
        self.mark(b);
    }

    /// Removes the red edge `(a, b)`; exact inverse of [`Self::match_pair`].
    pub fn unmatch_pair(&mut self, a: NodeRef, b: NodeRef) {
        self.unmark(b);
        self.unmark(a);
    }

    /// Places `(a, b)` and returns a guard that removes it when dropped.
    pub fn place(&mut self, a: NodeRef, b: NodeRef) -> PlacedEdge<'_> {
        self.match_pair(a, b);
        PlacedEdge { state: self, a, b }
    }

    fn mark(&mut self, n: NodeRef) {
        if !self.connected.contains(n.component) {
            self.connected.insert(n.component);
            self.unmatched_connected += self.size(n.component);
        }
        self.matched[n.component].insert(n.node);
        self.unmatched_connected -= 1;
    }

    fn unmark(&mut self, n: NodeRef) {
        self.matched[n.component].remove(n.node);
        self.unmatched_connected += 1;
        if n.component > 0 && self.matched[n.component].is_empty() {
            self.connected.remove(n.component);
            self.unmatched_connected -= self.size(n.component);
        }
    }

    #[cfg(test)]
    fn recompute_unmatched_connected(&self) -> usize {
        (0..self.n_components())
            .filter(|&c| self.is_connected(c))
            .map(|c| self.size(c) - self.cardinality(c))
            .sum()
    }
}

/// Scoped red edge: dereferences to the state it was placed on and removes
/// the edge on drop, so every exit path restores the state.
pub struct PlacedEdge<'a> {
    state: &'a mut MatchState,
    a: NodeRef,
    b: NodeRef,
}

impl Deref for PlacedEdge<'_> {
    type Target = MatchState;

    fn deref(&self) -> &MatchState {
        self.state
    }
}

impl DerefMut for PlacedEdge<'_> {
    fn deref_mut(&mut self) -> &mut MatchState {
        self.state
    }
}

impl Drop for PlacedEdge<'_> {
    fn drop(&mut self) {
        self.state.unmatch_pair(self.a, self.b);
    }
}

// ============================================================================
// MatchCounter
// ============================================================================

/// Counts connected red completions of one blue vector.
pub struct MatchCounter<'a, A: Arithmetic> {
    arith: &'a A,
    state: MatchState,
    n_matchable: usize,
}

impl<'a, A: Arithmetic> MatchCounter<'a, A> {
    /// Prepares a counter for `blue`.
    pub fn new(arith: &'a A, blue: &BlueVector) -> Self {
        Self {
            arith,
            state: MatchState::new(blue),
            n_matchable: blue.n_matchable(),
        }
    }

    /// Total red edges a completion places.
    pub fn edges_to_place(&self) -> usize {
        self.n_matchable / 2
    }

    /// Counts all connected completions. Zero when the matchable node count
    /// is odd.
    pub fn count(&mut self) -> A::Value {
        if self.n_matchable % 2 == 1 {
            return self.arith.zero();
        }
        let total = self.edges_to_place();
        if total == 0 {
            return self.arith.one();
        }
        count_from(self.arith, &mut self.state, 0, total)
    }

    /// Read-only view of the search state.
    pub fn state(&self) -> &MatchState {
        &self.state
    }
}

fn count_from<A: Arithmetic>(
    arith: &A,
    state: &mut MatchState,
    placed: usize,
    total: usize,
) -> A::Value {
    // The last red edge joins the only two nodes left.
    if placed + 1 == total {
        return arith.one();
    }
    let Some(pivot) = state.pivot() else {
        debug_assert!(false, "no unmatched connected node with {placed}/{total} edges placed");
        return arith.zero();
    };

    let mut sum = arith.zero();

    // Stay inside the connected set. Using up its last two nodes here would
    // strand whatever is still outside, so that needs more than two.
    let u = state.unmatched_connected();
    if u > 2 {
        if let Some(partner) = state.next_unmatched_connected(Some(pivot)) {
            let mut edge = state.place(pivot, partner);
            let sub = count_from(arith, &mut edge, placed + 1, total);
            arith.add_assign(&mut sum, &arith.mul_small(&sub, (u - 1) as u64));
        }
    }

    // Reach out to a component that is not yet connected.
    let mut opened_sizes = NodeSet::new(state.max_size() + 1);
    for c in 0..state.n_components() {
        if state.is_connected(c) {
            continue;
        }
        // The first red edge into a cycle connects it, so every component
        // still outside is untouched.
        debug_assert_eq!(state.cardinality(c), 0, "disconnected component {c} is partly matched");
        let size = state.size(c);
        if opened_sizes.contains(size) {
            continue;
        }
        opened_sizes.insert(size);
        let mut edge = state.place(pivot, NodeRef::new(c, 0));
        let sub = count_from(arith, &mut edge, placed + 1, total);
        arith.add_assign(&mut sum, &sub);
    }

    sum
}

// ============================================================================
// Public helpers
// ============================================================================

/// Counts connected red completions of `blue` under `modulus`.
pub fn count_completions(blue: &BlueVector, modulus: Modulus) -> BigUint {
    match modulus {
        Modulus::Exact => MatchCounter::new(&ExactArith, blue).count(),
        Modulus::Residue(m) => {
            let arith = ModArith::new(m);
            BigUint::from(MatchCounter::new(&arith, blue).count())
        }
    }
}

/// Parses a bracket-notation blue vector and counts its completions.
///
/// # Errors
/// Returns [`FeynmanError::InvalidPartition`] if `text` is malformed.
pub fn count_completions_str(text: &str, modulus: Modulus) -> Result<BigUint, FeynmanError> {
    let blue: BlueVector = text.parse()?;
    Ok(count_completions(&blue, modulus))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;

    fn count_exact(text: &str) -> BigUint {
        count_completions_str(text, Modulus::Exact).unwrap()
    }

    // -------------------------------------------------------------------------
    // NodeSet
    // -------------------------------------------------------------------------

    #[test]
    fn node_set_scans_across_words() {
        let mut s = NodeSet::new(130);
        for i in 0..70 {
            s.insert(i);
        }
        assert_eq!(s.len(), 70);
        assert_eq!(s.next_clear(0), Some(70));
        assert_eq!(s.next_set(65), Some(65));
        assert_eq!(s.next_set(70), None);
        s.remove(3);
        assert_eq!(s.next_clear(0), Some(3));
        assert_eq!(s.next_clear(4), Some(70));
    }

    #[test]
    fn node_set_full_has_no_clear_bit() {
        let mut s = NodeSet::new(64);
        for i in 0..64 {
            s.insert(i);
        }
        assert!(s.is_full());
        assert_eq!(s.next_clear(0), None);
        let mut t = NodeSet::new(3);
        t.insert(0);
        t.insert(1);
        t.insert(2);
        assert_eq!(t.next_clear(0), None);
    }

    // -------------------------------------------------------------------------
    // Literal counts
    // -------------------------------------------------------------------------

    #[test]
    fn bare_paths_count_all_matchings() {
        // Every perfect matching of a path interior connects everything.
        assert_eq!(count_exact("[3]"), BigUint::from(1u32));
        assert_eq!(count_exact("[5]"), BigUint::from(3u32));
        assert_eq!(count_exact("[7]"), BigUint::from(15u32));
        assert_eq!(count_exact("[9]"), BigUint::from(105u32));
    }

    #[test]
    fn small_partitions_match_known_counts() {
        let cases = [
            ("[3 1]", 1u32),
            ("[2 0,1]", 1),
            ("[5 1]", 6),
            ("[4 0,1]", 5),
            ("[3 2]", 1),
            ("[3 0,0,1]", 3),
            ("[2 1,1]", 2),
            ("[2 0,0,0,1]", 3),
            ("[7 1]", 45),
            ("[6 0,1]", 35),
            ("[5 2]", 9),
            ("[3 0,2]", 5),
            ("[2 0,1,1]", 8),
            ("[2 0,0,0,0,0,1]", 15),
        ];
        for (text, expected) in cases {
            assert_eq!(count_exact(text), BigUint::from(expected), "{text}");
        }
    }

    #[test]
    fn odd_parity_counts_zero() {
        assert_eq!(count_exact("[2]"), BigUint::from(0u32));
        assert_eq!(count_exact("[4]"), BigUint::from(0u32));
        assert_eq!(count_exact("[4 1]"), BigUint::from(0u32));
        assert_eq!(count_exact("[2 1]"), BigUint::from(0u32));
    }

    #[test]
    fn modular_count_agrees_with_exact() {
        let v: BlueVector = "[10 1,1]".parse().unwrap();
        let exact = count_completions(&v, Modulus::Exact);
        assert_eq!(exact, BigUint::from(20_790u32));
        assert_eq!(count_completions(&v, Modulus::Residue(7)), &exact % 7u32);
        assert_eq!(count_completions(&v, Modulus::DEFAULT), exact);
    }

    #[test]
    fn malformed_partition_is_an_error() {
        let huge = format!("[3 {}]", usize::MAX / 2 + 1);
        for text in ["[1 2]", huge.as_str()] {
            let err = count_completions_str(text, Modulus::DEFAULT).unwrap_err();
            assert!(matches!(err, FeynmanError::InvalidPartition { .. }), "{text}");
        }
    }

    #[test]
    fn counter_leaves_state_untouched() {
        let v: BlueVector = "[6 1,1]".parse().unwrap();
        let arith = ModArith::new(1_000_000_007);
        let mut counter = MatchCounter::new(&arith, &v);
        let before = counter.state().clone();
        let _ = counter.count();
        assert_eq!(counter.state(), &before);
    }

    // -------------------------------------------------------------------------
    // Backtracking soundness
    // -------------------------------------------------------------------------

    /// Legal red edges from the pivot, as the search would consider them.
    fn candidate_edges(state: &MatchState) -> Vec<(NodeRef, NodeRef)> {
        let Some(pivot) = state.pivot() else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut after = Some(pivot);
        while let Some(partner) = state.next_unmatched_connected(after) {
            out.push((pivot, partner));
            after = Some(partner);
        }
        for c in 0..state.n_components() {
            if !state.is_connected(c) {
                let node = state.matched[c].next_clear(0).unwrap();
                out.push((pivot, NodeRef::new(c, node)));
            }
        }
        out
    }

    #[test]
    fn match_unmatch_is_reversible_on_random_states() {
        let mut rng = XorShiftRng::seed_from_u64(0xFEED);
        let vectors = ["[9 2,1]", "[6 0,1,0,1]", "[4 3,0,2]", "[12 1,1,1]", "[70 0,1]"];

        for text in vectors {
            let blue: BlueVector = text.parse().unwrap();
            for _ in 0..200 {
                let mut state = MatchState::new(&blue);
                let depth = rng.random_range(0..=blue.n_matchable() / 2);
                for _ in 0..depth {
                    let edges = candidate_edges(&state);
                    if edges.is_empty() {
                        break;
                    }
                    let (a, b) = edges[rng.random_range(0..edges.len())];
                    state.match_pair(a, b);
                    assert!(state.is_matched(a) && state.is_matched(b));
                    assert_eq!(
                        state.unmatched_connected(),
                        state.recompute_unmatched_connected(),
                        "bookkeeping drift on {text}"
                    );
                    for c in (0..state.n_components()).filter(|&c| !state.is_connected(c)) {
                        assert_eq!(state.cardinality(c), 0, "component {c} of {text}");
                    }
                }

                let edges = candidate_edges(&state);
                if edges.is_empty() {
                    continue;
                }
                let (a, b) = edges[rng.random_range(0..edges.len())];
                let before = state.clone();
                state.match_pair(a, b);
                assert_ne!(state, before);
                state.unmatch_pair(a, b);
                assert!(!state.is_matched(a) && !state.is_matched(b));
                assert_eq!(state, before, "match/unmatch not inverse on {text}");
            }
        }
    }

    #[test]
    fn placed_edge_guard_restores_on_drop() {
        let blue: BlueVector = "[5 1,1]".parse().unwrap();
        let mut state = MatchState::new(&blue);
        let before = state.clone();
        {
            let mut edge = state.place(NodeRef::new(0, 0), NodeRef::new(2, 0));
            assert!(edge.is_connected(2));
            assert_eq!(edge.unmatched_connected(), 4 - 1 + 3 - 1);
            let inner = edge.place(NodeRef::new(0, 1), NodeRef::new(1, 0));
            assert!(inner.is_connected(1));
        }
        assert_eq!(state, before);
    }

    #[test]
    fn opening_a_cycle_connects_it_and_closing_disconnects() {
        let blue: BlueVector = "[3 0,1]".parse().unwrap();
        let mut state = MatchState::new(&blue);
        assert!(!state.is_connected(1));
        assert_eq!(state.unmatched_connected(), 2);
        state.match_pair(NodeRef::new(0, 0), NodeRef::new(1, 0));
        assert!(state.is_connected(1));
        assert_eq!(state.unmatched_connected(), 1 + 2);
        state.unmatch_pair(NodeRef::new(0, 0), NodeRef::new(1, 0));
        assert!(!state.is_connected(1));
        assert_eq!(state.unmatched_connected(), 2);
    }

    #[test]
    fn pivot_walks_connected_components_in_order() {
        let blue: BlueVector = "[3 1]".parse().unwrap();
        let mut state = MatchState::new(&blue);
        assert_eq!(state.pivot(), Some(NodeRef::new(0, 0)));
        assert_eq!(
            state.next_unmatched_connected(Some(NodeRef::new(0, 0))),
            Some(NodeRef::new(0, 1))
        );
        state.match_pair(NodeRef::new(0, 0), NodeRef::new(1, 0));
        assert_eq!(state.pivot(), Some(NodeRef::new(0, 1)));
        assert_eq!(
            state.next_unmatched_connected(Some(NodeRef::new(0, 1))),
            Some(NodeRef::new(1, 1))
        );
    }
}
