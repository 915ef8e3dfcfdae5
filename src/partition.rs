//! Blue vectors (path + cycle partitions of the blue edge count) and their
//! exhaustive enumeration.
//!
//! A blue vector `[p c2,c3,...]` describes one open path with `p` edges plus
//! `c2` cycles of length 2, `c3` cycles of length 3, and so on. Its total edge
//! count `p + Σ L·cL` is the run's `n_blue_arcs`.

use crate::error::FeynmanError;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// BlueVector
// ============================================================================

/// A canonical blue vector: `path_length >= 2`, no trailing zero cycle counts.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlueVector {
    path_length: usize,
    /// `cycles[k]` is the number of cycles of length `k + 2`.
    cycles: Vec<usize>,
}

impl BlueVector {
    /// Builds a blue vector, stripping trailing zero counts.
    ///
    /// # Errors
    /// Returns [`FeynmanError::InvalidPartition`] if `path_length < 2` or the
    /// total edge count does not fit a `usize`.
    pub fn new(path_length: usize, cycles: Vec<usize>) -> Result<Self, FeynmanError> {
        if path_length < 2 {
            return Err(FeynmanError::InvalidPartition {
                input: format!("path_length={path_length}"),
                reason: "path length must be at least 2".to_string(),
            });
        }
        let input = format!("path_length={path_length} cycles={cycles:?}");
        Self::checked(&input, path_length, cycles)
    }

    /// A bare path with no cycles.
    ///
    /// # Errors
    /// Returns [`FeynmanError::InvalidPartition`] if `path_length < 2`.
    pub fn path(path_length: usize) -> Result<Self, FeynmanError> {
        Self::new(path_length, Vec::new())
    }

    /// Canonical form, refusing vectors whose edge total does not fit a `usize`.
    fn checked(input: &str, path_length: usize, cycles: Vec<usize>) -> Result<Self, FeynmanError> {
        let total = cycles.iter().enumerate().try_fold(path_length, |acc, (k, &c)| {
            (k + 2).checked_mul(c).and_then(|edges| acc.checked_add(edges))
        });
        if total.is_none() {
            return Err(FeynmanError::partition(input, "edge count overflows"));
        }
        Ok(Self::canonical(path_length, cycles))
    }

    fn canonical(path_length: usize, mut cycles: Vec<usize>) -> Self {
        while cycles.last() == Some(&0) {
            cycles.pop();
        }
        Self {
            path_length,
            cycles,
        }
    }

    /// Number of edges on the open path.
    #[inline]
    pub fn path_length(&self) -> usize {
        self.path_length
    }

    /// Cycle counts; index `k` holds the number of `(k + 2)`-cycles.
    #[inline]
    pub fn cycle_counts(&self) -> &[usize] {
        &self.cycles
    }

    /// Number of cycles of length `len` (0 for `len < 2`).
    pub fn cycle_count(&self, len: usize) -> usize {
        if len < 2 {
            return 0;
        }
        self.cycles.get(len - 2).copied().unwrap_or(0)
    }

    /// Longest cycle length present, 0 if there are no cycles.
    pub fn max_cycle_len(&self) -> usize {
        if self.cycles.is_empty() {
            0
        } else {
            self.cycles.len() + 1
        }
    }

    /// Total number of blue edges.
    pub fn n_blue_arcs(&self) -> usize {
        self.path_length + self.cycle_edges()
    }

    /// Edges spent on cycles.
    pub fn cycle_edges(&self) -> usize {
        self.cycles
            .iter()
            .enumerate()
            .map(|(k, &c)| (k + 2) * c)
            .sum()
    }

    /// Number of nodes that can carry a red edge (path endpoints excluded).
    pub fn n_matchable(&self) -> usize {
        self.path_length - 1 + self.cycle_edges()
    }

    /// Number of components (the path plus every cycle).
    pub fn n_components(&self) -> usize {
        1 + self.cycles.iter().sum::<usize>()
    }

    /// Matchable sizes of every component in canonical order: the path first,
    /// then cycles by ascending length.
    pub fn component_sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(self.n_components());
        sizes.push(self.path_length - 1);
        for (k, &count) in self.cycles.iter().enumerate() {
            sizes.extend(std::iter::repeat(k + 2).take(count));
        }
        sizes
    }
}

impl fmt::Display for BlueVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.path_length)?;
        for (k, count) in self.cycles.iter().enumerate() {
            let sep = if k == 0 { ' ' } else { ',' };
            write!(f, "{sep}{count}")?;
        }
        write!(f, "]")
    }
}

impl FromStr for BlueVector {
    type Err = FeynmanError;

    /// Parses bracket notation such as `"[7 0,1]"`.
    ///
    /// Fields after the first may be separated by commas and/or whitespace.
    /// Trailing zero counts are accepted and stripped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let inner = trimmed
            .strip_prefix('[')
            .and_then(|t| t.strip_suffix(']'))
            .ok_or_else(|| FeynmanError::partition(s, "expected text of the form [p c2,c3,...]"))?;

        let mut fields = Vec::new();
        for token in inner
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
        {
            let value: usize = token
                .parse()
                .map_err(|_| FeynmanError::partition(s, format!("unparsable field {token:?}")))?;
            fields.push(value);
        }

        let (&path_length, cycles) = fields
            .split_first()
            .ok_or_else(|| FeynmanError::partition(s, "no fields"))?;
        if path_length < 2 {
            return Err(FeynmanError::partition(
                s,
                format!("path length {path_length} is below 2"),
            ));
        }
        Self::checked(s, path_length, cycles.to_vec())
    }
}

// ============================================================================
// Enumeration
// ============================================================================

/// Returns the blue vector that follows `current` in enumeration order, or
/// `None` when `current` is the last one.
///
/// Order: path length descending; for a fixed path length, cycle compositions
/// are visited by promoting budget from the short cycle slots into the
/// smallest longer slot that can absorb it, refilling short slots greedily
/// with 2-cycles (plus one 3-cycle for odd leftovers).
pub fn next_blue_vector(current: &BlueVector) -> Option<BlueVector> {
    let path_length = current.path_length;
    let max_len = current.max_cycle_len();
    let n_blue_arcs = current.n_blue_arcs();

    // Budget accumulated from slots of length <= len. Promoting one unit to
    // length len + 1 must leave either nothing or at least 2 edges, since a
    // single leftover edge cannot form a cycle.
    let mut budget = 0usize;
    for len in 2..=max_len + 1 {
        if len <= max_len {
            budget += current.cycles[len - 2] * len;
        }
        let bump = len + 1;
        if budget == bump || budget >= bump + 2 {
            let mut cycles = current.cycles.clone();
            if cycles.len() < bump - 1 {
                cycles.resize(bump - 1, 0);
            }
            cycles[..bump - 2].fill(0);
            cycles[bump - 2] += 1;
            let mut rest = budget - bump;
            if rest % 2 == 1 {
                cycles[1] += 1;
                rest -= 3;
            }
            cycles[0] = rest / 2;
            return Some(BlueVector::canonical(path_length, cycles));
        }
    }

    // No promotion left at this path length: shorten the path. A bare path
    // skips one step because a lone leftover edge is not a cycle.
    let step = if current.cycles.is_empty() { 2 } else { 1 };
    let new_path = path_length.checked_sub(step).filter(|&p| p >= 2)?;
    Some(greedy_fill(new_path, n_blue_arcs - new_path))
}

/// `[path rest/2]`, or `[path (rest-3)/2,1]` when `rest` is odd.
fn greedy_fill(path_length: usize, rest: usize) -> BlueVector {
    debug_assert!(rest != 1, "a single leftover edge cannot form a cycle");
    if rest % 2 == 1 {
        BlueVector::canonical(path_length, vec![(rest - 3) / 2, 1])
    } else {
        BlueVector::canonical(path_length, vec![rest / 2])
    }
}

/// Iterator over every blue vector with a fixed edge count.
#[derive(Clone, Debug)]
pub struct Partitions {
    next: Option<BlueVector>,
    stop: Option<BlueVector>,
}

impl Partitions {
    /// All blue vectors with `n_blue_arcs` edges, starting at the bare path.
    pub fn new(n_blue_arcs: usize) -> Self {
        Self {
            next: BlueVector::path(n_blue_arcs).ok(),
            stop: None,
        }
    }

    /// Resumes enumeration at `start` (inclusive).
    pub fn starting_at(start: BlueVector) -> Self {
        Self {
            next: Some(start),
            stop: None,
        }
    }

    /// Enumerates from `start` (inclusive) up to `stop` (exclusive).
    ///
    /// If `stop` is never reached the iteration runs to the end.
    pub fn between(start: BlueVector, stop: BlueVector) -> Self {
        let next = if start == stop { None } else { Some(start) };
        Self {
            next,
            stop: Some(stop),
        }
    }
}

impl Iterator for Partitions {
    type Item = BlueVector;

    fn next(&mut self) -> Option<BlueVector> {
        let current = self.next.take()?;
        self.next = next_blue_vector(&current).filter(|v| Some(v) != self.stop.as_ref());
        Some(current)
    }
}

/// Number of blue vectors with `n_blue_arcs` edges.
pub fn count_partitions(n_blue_arcs: usize) -> usize {
    Partitions::new(n_blue_arcs).count()
}

// ============================================================================
// Tests
// ============================================================================
