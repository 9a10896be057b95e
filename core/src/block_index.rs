//! Rolling hashes over fixed-size windows of line fingerprints
//!
//! Each line starting a full window of `window` consecutive lines gets the
//! polynomial hash of that window. Equal window hashes in two revisions mean
//! (modulo collisions) an identical run of lines; a hash that occurs exactly
//! once on each side pins down where a block went.
//!
//! The index is built in one linear pass and lives only as long as one
//! tracking call.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use twox_hash::XxHash64;

use crate::fingerprint::LineFingerprints;

const PRIME_BASE: u64 = 31;

/// Window hash → starting lines, for one file revision.
#[derive(Debug, Clone, Default)]
pub struct BlockHashIndex {
    window: usize,
    /// `starts[i]` is the hash of the window starting at line `i + 1`
    starts: Vec<u64>,
    by_hash: HashMap<u64, Vec<u32>>,
}

impl BlockHashIndex {
    /// Index every full window of `fingerprints`.
    ///
    /// Sequences shorter than `window` (or a zero window) give an empty index.
    pub fn build(fingerprints: &LineFingerprints, window: usize) -> Self {
        let mut index = Self {
            window,
            ..Self::default()
        };
        if window == 0 || fingerprints.len() < window {
            return index;
        }

        let values: Vec<u64> = fingerprints.iter().map(line_hash).collect();
        let leading_weight = (1..window).fold(1u64, |acc, _| acc.wrapping_mul(PRIME_BASE));

        let mut hash = values[..window]
            .iter()
            .fold(0u64, |acc, v| acc.wrapping_mul(PRIME_BASE).wrapping_add(*v));
        index.starts.reserve(values.len() - window + 1);
        index.record(1, hash);

        for start in 1..=(values.len() - window) {
            hash = hash
                .wrapping_sub(values[start - 1].wrapping_mul(leading_weight))
                .wrapping_mul(PRIME_BASE)
                .wrapping_add(values[start + window - 1]);
            index.record(start as u32 + 1, hash);
        }

        index
    }

    fn record(&mut self, line: u32, hash: u64) {
        self.starts.push(hash);
        self.by_hash.entry(hash).or_default().push(line);
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Hash of the window starting at `line`, if a full window starts there.
    pub fn hash_at(&self, line: u32) -> Option<u64> {
        let index = (line as usize).checked_sub(1)?;
        self.starts.get(index).copied()
    }

    /// Lines starting a window with this hash, in ascending order.
    pub fn lines_for(&self, hash: u64) -> &[u32] {
        self.by_hash.get(&hash).map(Vec::as_slice).unwrap_or(&[])
    }

    /// How many windows of this revision have this hash.
    pub fn occurrences(&self, hash: u64) -> usize {
        self.lines_for(hash).len()
    }

    /// Number of indexed windows.
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }
}

/// Stable 64-bit hash of a fingerprint.
fn line_hash(fingerprint: &str) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    fingerprint.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fps(hashes: &[&str]) -> LineFingerprints {
        LineFingerprints::from_hashes(hashes.iter().copied())
    }

    /// Hash of one window computed from scratch, for checking the rolling update.
    fn direct_hash(hashes: &[&str]) -> u64 {
        hashes
            .iter()
            .fold(0u64, |acc, h| acc.wrapping_mul(PRIME_BASE).wrapping_add(line_hash(h)))
    }

    #[test]
    fn test_short_sequence_gives_empty_index() {
        let index = BlockHashIndex::build(&fps(&["a", "b", "c", "d"]), 5);
        assert!(index.is_empty());
        assert_eq!(index.hash_at(1), None);
    }

    #[test]
    fn test_empty_sequence() {
        let index = BlockHashIndex::build(&LineFingerprints::default(), 5);
        assert!(index.is_empty());
    }

    #[test]
    fn test_zero_window_gives_empty_index() {
        let index = BlockHashIndex::build(&fps(&["a", "b"]), 0);
        assert!(index.is_empty());
    }

    #[test]
    fn test_one_window_per_full_start() {
        let index = BlockHashIndex::build(&fps(&["a", "b", "c", "d", "e", "f", "g"]), 5);
        assert_eq!(index.window(), 5);
        assert_eq!(index.len(), 3);
        assert!(index.hash_at(3).is_some());
        assert_eq!(index.hash_at(4), None);
        assert_eq!(index.hash_at(0), None);
    }

    #[test]
    fn test_rolling_matches_direct_computation() {
        let lines = ["a", "b", "c", "d", "e", "f", "g", "h"];
        let index = BlockHashIndex::build(&fps(&lines), 3);
        for start in 0..=(lines.len() - 3) {
            assert_eq!(
                index.hash_at(start as u32 + 1),
                Some(direct_hash(&lines[start..start + 3])),
                "window starting at line {}",
                start + 1
            );
        }
    }

    #[test]
    fn test_repeated_block_shares_hash() {
        let index = BlockHashIndex::build(&fps(&["x", "a", "b", "c", "y", "a", "b", "c"]), 3);
        let hash = index.hash_at(2).unwrap();
        assert_eq!(index.hash_at(6), Some(hash));
        assert_eq!(index.lines_for(hash), &[2, 6]);
        assert_eq!(index.occurrences(hash), 2);
    }

    #[test]
    fn test_same_block_in_two_revisions() {
        let old = BlockHashIndex::build(&fps(&["a", "b", "c", "d", "e", "z"]), 5);
        let new = BlockHashIndex::build(&fps(&["q", "q", "a", "b", "c", "d", "e"]), 5);
        assert_eq!(old.hash_at(1), new.hash_at(3));
        assert_ne!(old.hash_at(2), new.hash_at(3));
    }

    #[test]
    fn test_unknown_hash_has_no_lines() {
        let index = BlockHashIndex::build(&fps(&["a", "b", "c"]), 2);
        let missing = direct_hash(&["zz", "yy"]);
        assert!(index.lines_for(missing).is_empty());
        assert_eq!(index.occurrences(missing), 0);
    }
}
