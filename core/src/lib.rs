//! Palimpsest Core - Issue tracking across file revisions
//!
//! Each analysis of a file reports its quality issues from scratch. This
//! crate reconciles them with the issues recorded for the previous revision
//! so an issue keeps its identity (history, assignee, resolution) while the
//! code around it is edited, shifted or moved.
//!
//! This crate provides:
//! - Per-line fingerprints of a file revision
//! - Rolling block hashes and block recognition between two revisions
//! - The tracking cascade and its result
//! - Relocation of manual issues nobody re-reported
//!
//! It does no I/O besides reading its own configuration: line fingerprints
//! and issues are handed in by the caller, matches are handed back.
//!
//! ```rust
//! use palimpsest_core::prelude::*;
//!
//! let reference = LineFingerprints::compute("fn a() {}\nfn b() {}", &BlanklessSha256);
//! let source = LineFingerprints::compute("// header\nfn a() {}\nfn b() {}", &BlanklessSha256);
//!
//! let prior = vec![PriorIssue::new(
//!     "AX-1",
//!     RuleKey::new("lint", "naming"),
//!     Some(2),
//!     Some("rename b"),
//!     reference.get(2),
//! )];
//! let mut new = vec![NewIssue::new(RuleKey::new("lint", "naming"), Some(3), Some("rename b"))];
//!
//! let result = IssueTracker::default().track(Some(&reference), &source, prior, &mut new);
//! assert_eq!(result.matched_count(), 1);
//! assert_eq!(new[0].key.as_deref(), Some("AX-1"));
//! ```

pub mod block_index;
pub mod block_recognizer;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod relocation;
pub mod result;
pub mod source_hashes;
pub mod tracker;
pub mod types;

pub use block_index::BlockHashIndex;
pub use block_recognizer::BlockRecognizer;
pub use config::TrackerConfig;
pub use error::Error;
pub use fingerprint::{BlanklessSha256, LineFingerprints, LineHasher};
pub use relocation::{relocate_manual_issue, Relocation};
pub use result::{MatchOrigin, TrackingResult, TrackingSummary};
pub use source_hashes::{FileStatus, ReferenceHashLoader, SourceHashHolder};
pub use tracker::{IssueTracker, MatchStrategy, TrackingPass, DEFAULT_CASCADE};
pub use types::*;

/// Re-export commonly used items
pub mod prelude {
    pub use crate::config::TrackerConfig;
    pub use crate::error::Error;
    pub use crate::fingerprint::{BlanklessSha256, LineFingerprints, LineHasher};
    pub use crate::relocation::Relocation;
    pub use crate::result::{MatchOrigin, TrackingResult};
    pub use crate::source_hashes::{FileStatus, SourceHashHolder};
    pub use crate::tracker::IssueTracker;
    pub use crate::types::*;
}
