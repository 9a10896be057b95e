//! Per-line content fingerprints
//!
//! A file revision is reduced to one hash per line. Two lines are considered
//! the same content when their fingerprints are equal; nothing downstream
//! looks at the text itself.
//!
//! How a line is normalized before hashing is a policy of the caller, hence
//! the [`LineHasher`] trait. [`BlanklessSha256`] is the stock policy: it
//! ignores spaces and tabs so that re-indentation doesn't break tracking.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Turns the text of a single line into its fingerprint.
///
/// Implementations must be deterministic: identical content gives an
/// identical fingerprint across runs.
pub trait LineHasher {
    fn hash_line(&self, line: &str) -> String;
}

/// Strips spaces and tabs, then hashes with SHA256 (lowercase hex).
#[derive(Debug, Clone, Copy, Default)]
pub struct BlanklessSha256;

impl LineHasher for BlanklessSha256 {
    fn hash_line(&self, line: &str) -> String {
        let normalized: String = line.chars().filter(|c| *c != ' ' && *c != '\t').collect();
        hex::encode(sha256_hash(&normalized))
    }
}

impl<F> LineHasher for F
where
    F: Fn(&str) -> String,
{
    fn hash_line(&self, line: &str) -> String {
        self(line)
    }
}

/// Compute SHA256 hash of a string.
fn sha256_hash(data: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    hasher.finalize().into()
}

/// Fingerprints of every line of one file revision, addressed by 1-based line number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineFingerprints {
    hashes: Vec<String>,
}

impl LineFingerprints {
    /// Wrap fingerprints computed elsewhere (first element is line 1).
    pub fn from_hashes<I, S>(hashes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hashes: hashes.into_iter().map(Into::into).collect(),
        }
    }

    /// Fingerprint every line of `source` with `hasher`.
    pub fn compute<H: LineHasher + ?Sized>(source: &str, hasher: &H) -> Self {
        Self {
            hashes: source.lines().map(|line| hasher.hash_line(line)).collect(),
        }
    }

    /// Fingerprint of `line`, or `None` when it is 0 or past the end.
    pub fn get(&self, line: u32) -> Option<&str> {
        let index = (line as usize).checked_sub(1)?;
        self.hashes.get(index).map(String::as_str)
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub fn contains_line(&self, line: u32) -> bool {
        line >= 1 && (line as usize) <= self.hashes.len()
    }

    /// Fingerprints in line order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.hashes.iter().map(String::as_str)
    }

    /// Lines (1-based) whose fingerprint equals `fingerprint`.
    pub fn lines_with<'a>(&'a self, fingerprint: &'a str) -> impl Iterator<Item = u32> + 'a {
        self.hashes
            .iter()
            .enumerate()
            .filter(move |(_, hash)| hash.as_str() == fingerprint)
            .map(|(index, _)| index as u32 + 1)
    }
}
