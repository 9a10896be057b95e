//! Issue tracking: carrying issue identity from one analysis to the next
//!
//! Every scan re-detects issues from scratch. To keep an issue's history
//! (assignee, resolution, comments) the new issues of a file are paired with
//! the issues persisted for its previous revision.
//!
//! # Cascade
//!
//! Heuristics run from most to least confident. Each one only considers new
//! issues that are still unmatched and prior issues still in the pool, so an
//! earlier match is never overridden:
//!
//! 1. **Identity key**: manual issues carry their key across scans
//! 2. **Rule + line + fingerprint**: nothing moved
//! 3. **Block move**: the line moved along with the code around it
//! 4. **Rule + fingerprint + message**
//! 5. **Rule + line + message**
//! 6. **Rule + fingerprint**: last resort, message and line may both differ
//!
//! The cascade stops as soon as every new issue has a match.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::block_index::BlockHashIndex;
use crate::block_recognizer::BlockRecognizer;
use crate::config::TrackerConfig;
use crate::fingerprint::LineFingerprints;
use crate::result::{MatchOrigin, TrackingResult};
use crate::source_hashes::SourceHashHolder;
use crate::types::{NewId, NewIssue, PriorId, PriorIssue};

/// A heuristic pairing one new issue with at most one pooled prior issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    IdentityKey,
    RuleLineFingerprint,
    RuleFingerprintMessage,
    RuleLineMessage,
    RuleFingerprint,
}

impl MatchStrategy {
    pub fn origin(&self) -> MatchOrigin {
        match self {
            MatchStrategy::IdentityKey => MatchOrigin::IdentityKey,
            MatchStrategy::RuleLineFingerprint => MatchOrigin::RuleLineFingerprint,
            MatchStrategy::RuleFingerprintMessage => MatchOrigin::RuleFingerprintMessage,
            MatchStrategy::RuleLineMessage => MatchOrigin::RuleLineMessage,
            MatchStrategy::RuleFingerprint => MatchOrigin::RuleFingerprint,
        }
    }

    /// First unmatched prior issue this heuristic accepts for `issue`.
    pub fn find(&self, issue: &NewIssue, result: &TrackingResult) -> Option<PriorId> {
        match self {
            MatchStrategy::IdentityKey => issue
                .key
                .as_deref()
                .and_then(|key| result.lookup_by_key(key)),
            MatchStrategy::RuleLineFingerprint => result
                .lookup_by_rule_line_fingerprint(
                    &issue.rule,
                    issue.line,
                    issue.fingerprint.as_deref(),
                )
                .next(),
            MatchStrategy::RuleFingerprintMessage => first_of_rule(issue, result, |prior| {
                prior.fingerprint == issue.fingerprint && prior.message == issue.message
            }),
            MatchStrategy::RuleLineMessage => first_of_rule(issue, result, |prior| {
                prior.line == issue.line && prior.message == issue.message
            }),
            MatchStrategy::RuleFingerprint => {
                first_of_rule(issue, result, |prior| prior.fingerprint == issue.fingerprint)
            }
        }
    }
}

fn first_of_rule(
    issue: &NewIssue,
    result: &TrackingResult,
    accept: impl Fn(&PriorIssue) -> bool,
) -> Option<PriorId> {
    result
        .lookup_by_rule(&issue.rule)
        .find(|id| result.prior(*id).is_some_and(&accept))
}

/// One step of the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingPass {
    /// Apply a per-issue heuristic to every unmatched new issue
    Strategy(MatchStrategy),
    /// Follow lines that moved together with their surrounding block
    BlockMove,
}

impl TrackingPass {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingPass::Strategy(strategy) => strategy.origin().as_str(),
            TrackingPass::BlockMove => "block_move",
        }
    }
}

/// Cascade order used by [`IssueTracker::default`].
pub const DEFAULT_CASCADE: [TrackingPass; 6] = [
    TrackingPass::Strategy(MatchStrategy::IdentityKey),
    TrackingPass::Strategy(MatchStrategy::RuleLineFingerprint),
    TrackingPass::BlockMove,
    TrackingPass::Strategy(MatchStrategy::RuleFingerprintMessage),
    TrackingPass::Strategy(MatchStrategy::RuleLineMessage),
    TrackingPass::Strategy(MatchStrategy::RuleFingerprint),
];

/// Candidate pairing of a reference line with a source line.
#[derive(Debug, Clone, Copy)]
struct LinePair {
    reference_line: u32,
    source_line: u32,
    weight: usize,
}

impl LinePair {
    fn displacement(&self) -> u32 {
        self.reference_line.abs_diff(self.source_line)
    }
}

/// Matches the new issues of a file with its prior issues.
///
/// Holds configuration only; every call to [`IssueTracker::track`] builds
/// its own state, so one tracker can serve many files.
#[derive(Debug, Clone)]
pub struct IssueTracker {
    config: TrackerConfig,
    cascade: Vec<TrackingPass>,
}

impl Default for IssueTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl IssueTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            cascade: DEFAULT_CASCADE.to_vec(),
        }
    }

    /// Replace the cascade order.
    pub fn with_cascade(mut self, cascade: impl IntoIterator<Item = TrackingPass>) -> Self {
        self.cascade = cascade.into_iter().collect();
        self
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn cascade(&self) -> &[TrackingPass] {
        &self.cascade
    }

    /// Track one file whose revisions are exposed by `hashes`.
    pub fn track_file(
        &self,
        hashes: &SourceHashHolder<'_>,
        prior: Vec<PriorIssue>,
        new: &mut [NewIssue],
    ) -> TrackingResult {
        self.track(hashes.reference(), hashes.source(), prior, new)
    }

    /// Pair `new` issues with `prior` ones.
    ///
    /// `reference` is the previous revision's fingerprints, `None` when it is
    /// unknown. On return every new issue carries the fingerprint of its line
    /// and, if matched, the identity key of its prior counterpart.
    pub fn track(
        &self,
        reference: Option<&LineFingerprints>,
        source: &LineFingerprints,
        prior: Vec<PriorIssue>,
        new: &mut [NewIssue],
    ) -> TrackingResult {
        assign_fingerprints(source, new);

        let had_prior_scan = !prior.is_empty();
        let mut result = TrackingResult::new();
        result.seed(prior);

        debug!(
            "Tracking {} new issues against {} prior issues",
            new.len(),
            result.prior_count()
        );

        for pass in &self.cascade {
            if result.matched_count() == new.len() {
                debug!("All {} new issues matched, skipping remaining passes", new.len());
                break;
            }

            let matched_before = result.matched_count();
            match pass {
                TrackingPass::Strategy(strategy) => {
                    result.record_pass(*pass);
                    apply_strategy(*strategy, new, &mut result);
                }
                TrackingPass::BlockMove => match reference {
                    Some(reference) if had_prior_scan => {
                        result.record_pass(*pass);
                        self.match_moved_blocks(reference, source, new, &mut result);
                    }
                    _ => {
                        debug!("No reference revision, skipping block move pass");
                        continue;
                    }
                },
            }
            debug!(
                "{} pass matched {} issues",
                pass.as_str(),
                result.matched_count() - matched_before
            );
        }

        for (new_id, prior, _) in result.matched_pairs() {
            if let Some(issue) = new.get_mut(new_id.0) {
                issue.key = Some(prior.key.clone());
            }
        }

        result
    }

    /// Block move pass: issues whose line travelled with the code around it.
    fn match_moved_blocks(
        &self,
        reference: &LineFingerprints,
        source: &LineFingerprints,
        new: &[NewIssue],
        result: &mut TrackingResult,
    ) {
        let window = self.config.block_window;
        let recognizer = BlockRecognizer::new(reference, source);
        let reference_index = BlockHashIndex::build(reference, window);
        let source_index = BlockHashIndex::build(source, window);

        let mut new_by_line: BTreeMap<u32, Vec<NewId>> = BTreeMap::new();
        for (index, issue) in new.iter().enumerate() {
            let id = NewId(index);
            if result.is_matched(id) {
                continue;
            }
            if let Some(line) = issue.line.filter(|l| recognizer.is_valid_line_in_source(*l)) {
                new_by_line.entry(line).or_default().push(id);
            }
        }

        let mut prior_by_line: BTreeMap<u32, Vec<PriorId>> = BTreeMap::new();
        for (id, issue) in result.unmatched() {
            if let Some(line) = issue.line.filter(|l| recognizer.is_valid_line_in_reference(*l)) {
                prior_by_line.entry(line).or_default().push(id);
            }
        }

        // A window found exactly once in each revision tells where its first line went.
        let certain: Vec<(u32, u32)> = prior_by_line
            .keys()
            .filter_map(|&reference_line| {
                let hash = reference_index.hash_at(reference_line)?;
                if reference_index.occurrences(hash) != 1 || source_index.occurrences(hash) != 1 {
                    return None;
                }
                let source_line = source_index.lines_for(hash).first().copied()?;
                let confirmed = new_by_line.contains_key(&source_line)
                    && recognizer.maximal_block_length(reference_line, source_line) >= window;
                confirmed.then_some((reference_line, source_line))
            })
            .collect();

        for (reference_line, source_line) in certain {
            let olds = prior_by_line.remove(&reference_line).unwrap_or_default();
            let news = new_by_line.remove(&source_line).unwrap_or_default();
            match_line_pair(&news, &olds, new, result, MatchOrigin::UnambiguousBlock);
        }

        if prior_by_line.is_empty() || new_by_line.is_empty() {
            return;
        }

        let pair_count = prior_by_line.len().saturating_mul(new_by_line.len());
        if pair_count >= self.config.pairwise_guard {
            warn!(
                "Skipping block scoring: {} reference lines x {} source lines exceeds {}",
                prior_by_line.len(),
                new_by_line.len(),
                self.config.pairwise_guard
            );
            result.record_guard_trip();
            return;
        }

        let mut candidates = Vec::new();
        for &reference_line in prior_by_line.keys() {
            for &source_line in new_by_line.keys() {
                let weight = recognizer.maximal_block_length(reference_line, source_line);
                if weight > 0 {
                    candidates.push(LinePair {
                        reference_line,
                        source_line,
                        weight,
                    });
                }
            }
        }

        // Longest block first, then the smallest displacement.
        candidates.sort_by(|a, b| {
            b.weight
                .cmp(&a.weight)
                .then_with(|| a.displacement().cmp(&b.displacement()))
        });

        for pair in candidates {
            if let (Some(news), Some(olds)) = (
                new_by_line.get(&pair.source_line),
                prior_by_line.get(&pair.reference_line),
            ) {
                match_line_pair(news, olds, new, result, MatchOrigin::BlockScore);
            }
        }
    }
}

/// Set each new issue's fingerprint from the line it sits on.
fn assign_fingerprints(source: &LineFingerprints, new: &mut [NewIssue]) {
    for issue in new.iter_mut() {
        issue.fingerprint = issue
            .line
            .and_then(|line| source.get(line))
            .map(String::from);
    }
}

fn apply_strategy(strategy: MatchStrategy, new: &[NewIssue], result: &mut TrackingResult) {
    for (index, issue) in new.iter().enumerate() {
        let id = NewId(index);
        if result.is_matched(id) {
            continue;
        }
        if let Some(prior) = strategy.find(issue, result) {
            result.set_match(id, prior, strategy.origin());
        }
    }
}

/// First-fit pairing of the issues on two lines believed to be the same line.
///
/// Each new issue takes the first pooled prior issue of the same rule; extra
/// issues on either side stay unmatched.
fn match_line_pair(
    news: &[NewId],
    olds: &[PriorId],
    new: &[NewIssue],
    result: &mut TrackingResult,
    origin: MatchOrigin,
) {
    for &new_id in news {
        let Some(issue) = new.get(new_id.0) else {
            continue;
        };
        if result.is_matched(new_id) {
            continue;
        }
        let found = olds.iter().copied().find(|&prior_id| {
            result.is_unmatched(prior_id)
                && result.prior(prior_id).is_some_and(|prior| prior.rule == issue.rule)
        });
        if let Some(prior_id) = found {
            result.set_match(new_id, prior_id, origin);
        }
    }
}
