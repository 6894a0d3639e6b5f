//! Fixed-length bit vectors selecting a subset of the flag universe.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const WORD_BITS: usize = u64::BITS as usize;

/// A subset of the flag universe, one bit per flag.
///
/// Bit `i` set means "flag `i` is passed to the compiler". Two sets are equal
/// iff they have the same length and the same bits, which makes `FlagSet` the
/// key of both the candidate cache and the avoidance set.
///
/// Serialized as a `0`/`1` string, one character per flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct FlagSet {
    len: usize,
    words: Vec<u64>,
}

impl FlagSet {
    /// All flags excluded.
    pub fn zeros(len: usize) -> Self {
        Self {
            len,
            words: vec![0; len.div_ceil(WORD_BITS)],
        }
    }

    pub fn from_bits(bits: &[bool]) -> Self {
        let mut set = Self::zeros(bits.len());
        for (idx, _) in bits.iter().enumerate().filter(|(_, bit)| **bit) {
            set.flip(idx);
        }
        set
    }

    /// Set of length `len` with exactly the given indices included.
    ///
    /// # Panics
    /// Panics if an index is out of range.
    pub fn from_indices(len: usize, indices: &[usize]) -> Self {
        let mut set = Self::zeros(len);
        for &idx in indices {
            if !set.get(idx) {
                set.flip(idx);
            }
        }
        set
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// # Panics
    /// Panics if `idx >= self.len()`.
    #[inline]
    pub fn get(&self, idx: usize) -> bool {
        assert!(idx < self.len, "flag index {idx} out of range {}", self.len);
        (self.words[idx / WORD_BITS] >> (idx % WORD_BITS)) & 1 == 1
    }

    /// # Panics
    /// Panics if `idx >= self.len()`.
    #[inline]
    pub fn flip(&mut self, idx: usize) {
        assert!(idx < self.len, "flag index {idx} out of range {}", self.len);
        self.words[idx / WORD_BITS] ^= 1 << (idx % WORD_BITS);
    }

    /// Copy of `self` with every index in `indices` flipped once.
    pub fn flipped(&self, indices: &[usize]) -> Self {
        let mut next = self.clone();
        for &idx in indices {
            next.flip(idx);
        }
        next
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Indices of included flags, ascending.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |&idx| self.get(idx))
    }

    /// Number of positions in which the two sets differ.
    ///
    /// # Panics
    /// Panics if the lengths differ.
    pub fn hamming(&self, other: &FlagSet) -> usize {
        assert_eq!(self.len, other.len, "flag sets over different universes");
        self.words
            .iter()
            .zip(&other.words)
            .map(|(a, b)| (a ^ b).count_ones() as usize)
            .sum()
    }
}

impl fmt::Display for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for idx in 0..self.len {
            f.write_str(if self.get(idx) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl FromStr for FlagSet {
    type Err = String;

    fn from_str(bits: &str) -> Result<Self, Self::Err> {
        let bits = bits
            .chars()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                other => Err(format!("invalid flag bit {other:?}")),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_bits(&bits))
    }
}

impl From<FlagSet> for String {
    fn from(set: FlagSet) -> String {
        set.to_string()
    }
}

impl TryFrom<String> for FlagSet {
    type Error = String;

    fn try_from(bits: String) -> Result<Self, Self::Error> {
        bits.parse()
    }
}
