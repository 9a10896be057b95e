//! Relocation of manual issues left unmatched by tracking
//!
//! Analyzers never report manual issues again, so after tracking they sit in
//! the unmatched pool like issues that disappeared. Rather than closing them,
//! the host follows the line they were attached to: if its content appears
//! exactly once in the new revision, the issue moves there.

use serde::{Deserialize, Serialize};

use crate::fingerprint::LineFingerprints;
use crate::result::TrackingResult;
use crate::types::{IssueStatus, PriorId, PriorIssue};

/// What should happen to an unmatched manual issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relocation {
    /// Closed or not attached to a line; leave it alone
    Untouched,
    /// The line's content is now found (once) elsewhere
    Moved { from: u32, to: u32 },
    /// Stay on the same line
    Kept,
    /// The line no longer exists
    Removed,
}

/// Decide where a manual issue goes in the new revision.
pub fn relocate_manual_issue(
    prior: &PriorIssue,
    reference: Option<&LineFingerprints>,
    source: &LineFingerprints,
) -> Relocation {
    if prior.status == IssueStatus::Closed {
        return Relocation::Untouched;
    }
    let Some(line) = prior.line else {
        return Relocation::Untouched;
    };
    if line as usize > source.len() {
        return Relocation::Removed;
    }
    let Some(fingerprint) = reference.and_then(|reference| reference.get(line)) else {
        return Relocation::Kept;
    };

    let mut same_content = source.lines_with(fingerprint);
    match (same_content.next(), same_content.next()) {
        (Some(to), None) if to != line => Relocation::Moved { from: line, to },
        _ => Relocation::Kept,
    }
}

impl TrackingResult {
    /// Relocate every unmatched manual issue, in seeding order.
    pub fn relocate_manual_issues(
        &self,
        reference: Option<&LineFingerprints>,
        source: &LineFingerprints,
    ) -> Vec<(PriorId, Relocation)> {
        self.unmatched()
            .filter(|(_, prior)| prior.rule.is_manual())
            .map(|(id, prior)| (id, relocate_manual_issue(prior, reference, source)))
            .collect()
    }
}
