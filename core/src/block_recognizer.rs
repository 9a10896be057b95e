//! Maximal identical block around a pair of anchor lines
//!
//! Given a line in the reference revision and a line in the current one,
//! measures how many consecutive lines around them are identical in both.
//! The length is only ever used to rank candidate line pairs.

use crate::fingerprint::LineFingerprints;

/// Compares a reference revision with the current one, line by line.
#[derive(Debug, Clone, Copy)]
pub struct BlockRecognizer<'a> {
    reference: &'a LineFingerprints,
    source: &'a LineFingerprints,
}

impl<'a> BlockRecognizer<'a> {
    pub fn new(reference: &'a LineFingerprints, source: &'a LineFingerprints) -> Self {
        Self { reference, source }
    }

    pub fn is_valid_line_in_reference(&self, line: u32) -> bool {
        self.reference.contains_line(line)
    }

    pub fn is_valid_line_in_source(&self, line: u32) -> bool {
        self.source.contains_line(line)
    }

    /// Length of the longest run of pairwise-equal lines covering both anchors.
    ///
    /// Returns 0 when the anchors differ or either line is out of range.
    pub fn maximal_block_length(&self, reference_line: u32, source_line: u32) -> usize {
        if !self.same_line(reference_line, source_line) {
            return 0;
        }

        let mut length = 0;
        let (mut a, mut b) = (reference_line, source_line);
        while self.same_line(a, b) {
            length += 1;
            a += 1;
            b += 1;
        }

        let (mut a, mut b) = (reference_line - 1, source_line - 1);
        while self.same_line(a, b) {
            length += 1;
            a -= 1;
            b -= 1;
        }

        length
    }

    /// Both lines exist and carry the same fingerprint.
    fn same_line(&self, reference_line: u32, source_line: u32) -> bool {
        match (self.reference.get(reference_line), self.source.get(source_line)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fps(hashes: &[&str]) -> LineFingerprints {
        LineFingerprints::from_hashes(hashes.iter().copied())
    }

    #[test]
    fn test_identical_files() {
        let a = fps(&["a", "b", "c", "d"]);
        let rec = BlockRecognizer::new(&a, &a);
        assert_eq!(rec.maximal_block_length(1, 1), 4);
        assert_eq!(rec.maximal_block_length(3, 3), 4);
    }

    #[test]
    fn test_different_anchors() {
        let a = fps(&["a", "b", "c"]);
        let b = fps(&["a", "x", "c"]);
        let rec = BlockRecognizer::new(&a, &b);
        assert_eq!(rec.maximal_block_length(2, 2), 0);
    }

    #[test]
    fn test_extends_both_directions() {
        let a = fps(&["x", "a", "b", "c", "d", "y"]);
        let b = fps(&["q", "q", "q", "a", "b", "c", "d", "z"]);
        let rec = BlockRecognizer::new(&a, &b);
        // anchor on "c": two lines back, two forward including itself
        assert_eq!(rec.maximal_block_length(4, 6), 4);
        assert_eq!(rec.maximal_block_length(2, 4), 4);
    }

    #[test]
    fn test_stops_at_file_edges() {
        let a = fps(&["a", "b"]);
        let b = fps(&["a", "b", "c"]);
        let rec = BlockRecognizer::new(&a, &b);
        assert_eq!(rec.maximal_block_length(2, 2), 2);
    }

    #[test]
    fn test_out_of_range_lines() {
        let a = fps(&["a", "b"]);
        let rec = BlockRecognizer::new(&a, &a);
        assert_eq!(rec.maximal_block_length(0, 1), 0);
        assert_eq!(rec.maximal_block_length(1, 0), 0);
        assert_eq!(rec.maximal_block_length(3, 1), 0);
        assert_eq!(rec.maximal_block_length(1, 42), 0);
    }

    #[test]
    fn test_valid_lines() {
        let a = fps(&["a", "b"]);
        let b = fps(&["a"]);
        let rec = BlockRecognizer::new(&a, &b);
        assert!(rec.is_valid_line_in_reference(2));
        assert!(!rec.is_valid_line_in_source(2));
        assert!(!rec.is_valid_line_in_source(0));
    }
}
