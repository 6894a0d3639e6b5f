//! Bit-flip neighborhoods in 0-1 space.

use flagforge_model::{FlagSet, SearchError, SearchResult};

/// Lazy enumeration of the flag sets reachable from `current` by flipping
/// exactly `k` bits, for every `k` in `1..=max_flip`.
///
/// Order: all single flips by ascending index, then all pairs in
/// lexicographic order, and so on. The iterator owns its state, so each call
/// starts a fresh enumeration. With `max_flip == 1` it yields exactly
/// `current.len()` sets.
pub fn neighbors(current: &FlagSet, max_flip: usize) -> SearchResult<Neighbors> {
    if max_flip == 0 || max_flip > current.len() {
        return Err(SearchError::invalid(format!(
            "max_flip must be in 1..={}, got {max_flip}",
            current.len()
        )));
    }
    Ok(Neighbors {
        base: current.clone(),
        max_flip,
        combo: vec![0],
        exhausted: false,
    })
}

#[derive(Debug, Clone)]
pub struct Neighbors {
    base: FlagSet,
    max_flip: usize,
    /// Indices flipped for the next item, strictly ascending.
    combo: Vec<usize>,
    exhausted: bool,
}

impl Neighbors {
    fn advance(&mut self) {
        let n = self.base.len();
        let k = self.combo.len();
        match (0..k).rev().find(|&i| self.combo[i] < n - k + i) {
            Some(i) => {
                self.combo[i] += 1;
                for j in i + 1..k {
                    self.combo[j] = self.combo[j - 1] + 1;
                }
            }
            None if k < self.max_flip => self.combo = (0..=k).collect(),
            None => self.exhausted = true,
        }
    }
}

impl Iterator for Neighbors {
    type Item = FlagSet;

    fn next(&mut self) -> Option<FlagSet> {
        if self.exhausted {
            return None;
        }
        let neighbor = self.base.flipped(&self.combo);
        self.advance();
        Some(neighbor)
    }
}
