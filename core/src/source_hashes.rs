//! Access to the fingerprints of both revisions of a file
//!
//! The current revision's fingerprints are always at hand. The reference
//! (previous revision) depends on what happened to the file:
//!
//! | status      | reference                         |
//! |-------------|-----------------------------------|
//! | `Added`     | none                              |
//! | `Unchanged` | the current fingerprints          |
//! | `Modified`  | loaded from storage, if available |
//!
//! Resolution happens on first access and is cached in the holder.

use std::cell::OnceCell;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fingerprint::LineFingerprints;

/// What happened to a file since the previous analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Unchanged,
    Modified,
}

impl FileStatus {
    /// Return the lowercase string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Added => "added",
            FileStatus::Unchanged => "unchanged",
            FileStatus::Modified => "modified",
        }
    }
}

/// Fetches the stored fingerprints of a file's previous revision.
pub trait ReferenceHashLoader {
    fn load_reference(&self, file_key: &str) -> Option<LineFingerprints>;
}

impl<F> ReferenceHashLoader for F
where
    F: Fn(&str) -> Option<LineFingerprints>,
{
    fn load_reference(&self, file_key: &str) -> Option<LineFingerprints> {
        self(file_key)
    }
}

#[derive(Debug)]
enum Reference {
    Missing,
    SameAsSource,
    Loaded(LineFingerprints),
}

/// Current fingerprints plus a lazily resolved reference.
pub struct SourceHashHolder<'a> {
    file_key: String,
    status: FileStatus,
    source: LineFingerprints,
    loader: &'a dyn ReferenceHashLoader,
    reference: OnceCell<Reference>,
}

impl<'a> SourceHashHolder<'a> {
    pub fn new(
        file_key: impl Into<String>,
        status: FileStatus,
        source: LineFingerprints,
        loader: &'a dyn ReferenceHashLoader,
    ) -> Self {
        Self {
            file_key: file_key.into(),
            status,
            source,
            loader,
            reference: OnceCell::new(),
        }
    }

    pub fn file_key(&self) -> &str {
        &self.file_key
    }

    pub fn status(&self) -> FileStatus {
        self.status
    }

    /// Fingerprints of the current revision.
    pub fn source(&self) -> &LineFingerprints {
        &self.source
    }

    /// Fingerprints of the previous revision, resolved once.
    pub fn reference(&self) -> Option<&LineFingerprints> {
        let reference = self.reference.get_or_init(|| self.resolve());
        match reference {
            Reference::Missing => None,
            Reference::SameAsSource => Some(&self.source),
            Reference::Loaded(fingerprints) => Some(fingerprints),
        }
    }

    fn resolve(&self) -> Reference {
        let reference = match self.status {
            FileStatus::Added => Reference::Missing,
            FileStatus::Unchanged => Reference::SameAsSource,
            FileStatus::Modified => match self.loader.load_reference(&self.file_key) {
                Some(fingerprints) => Reference::Loaded(fingerprints),
                None => {
                    debug!("No stored line hashes for modified file {}", self.file_key);
                    Reference::Missing
                }
            },
        };
        debug!(
            "Resolved reference for {} ({}): {}",
            self.file_key,
            self.status.as_str(),
            match &reference {
                Reference::Missing => "none",
                Reference::SameAsSource => "self",
                Reference::Loaded(_) => "stored",
            }
        );
        reference
    }
}
