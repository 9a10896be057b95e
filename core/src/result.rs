//! Matching state of one tracking call
//!
//! [`TrackingResult`] owns the prior issues of a file and partitions them
//! into matched (paired with exactly one new issue) and unmatched (the pool
//! later passes draw from). The pool is indexed three ways so that every
//! heuristic is a map lookup rather than a scan:
//!
//! - identity key → issue
//! - rule → issues
//! - rule → line → fingerprint → issues
//!
//! A missing line is indexed as line 0 and a missing fingerprint as the
//! empty string, so "no line" only ever equals "no line".
//!
//! All three indices shrink together on every match. Sets are ordered by
//! [`PriorId`], i.e. by seeding order, which makes "first candidate"
//! deterministic.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::tracker::TrackingPass;
use crate::types::{NewId, PriorId, PriorIssue, RuleKey};

/// Line recorded for issues that have none.
pub const NO_LINE: u32 = 0;

/// Fingerprint recorded for issues that have none.
pub const NO_FINGERPRINT: &str = "";

/// Which heuristic produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOrigin {
    /// Same identity key (manual issues)
    IdentityKey,
    /// Same rule, line and line fingerprint
    RuleLineFingerprint,
    /// Line moved inside a block found exactly once in each revision
    UnambiguousBlock,
    /// Best-scoring pair of lines by identical surrounding block
    BlockScore,
    /// Same rule, fingerprint and message
    RuleFingerprintMessage,
    /// Same rule, line and message
    RuleLineMessage,
    /// Same rule and fingerprint
    RuleFingerprint,
}

impl MatchOrigin {
    /// Return the snake_case string representation used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchOrigin::IdentityKey => "identity_key",
            MatchOrigin::RuleLineFingerprint => "rule_line_fingerprint",
            MatchOrigin::UnambiguousBlock => "unambiguous_block",
            MatchOrigin::BlockScore => "block_score",
            MatchOrigin::RuleFingerprintMessage => "rule_fingerprint_message",
            MatchOrigin::RuleLineMessage => "rule_line_message",
            MatchOrigin::RuleFingerprint => "rule_fingerprint",
        }
    }
}

/// Counts describing the outcome of tracking one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingSummary {
    /// New issues paired with a prior issue
    pub matched: usize,
    /// Prior issues left over (candidates for closing)
    pub unmatched_prior: usize,
    /// New issues without a prior counterpart
    pub new_issues: usize,
    /// Percentage of new issues that kept their identity
    pub match_pct: f32,
    /// Matches per heuristic
    pub by_origin: BTreeMap<MatchOrigin, usize>,
}

/// Partition of the prior issues of one file into matched and unmatched.
#[derive(Debug, Clone, Default)]
pub struct TrackingResult {
    prior: Vec<PriorIssue>,
    unmatched: BTreeSet<PriorId>,
    by_key: HashMap<String, PriorId>,
    by_rule: HashMap<RuleKey, BTreeSet<PriorId>>,
    by_rule_line_fingerprint: HashMap<RuleKey, HashMap<u32, HashMap<String, BTreeSet<PriorId>>>>,
    matches: BTreeMap<NewId, (PriorId, MatchOrigin)>,
    passes_run: Vec<TrackingPass>,
    block_guard_tripped: bool,
}

impl TrackingResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add prior issues to the unmatched pool and index them.
    pub fn seed(&mut self, prior: impl IntoIterator<Item = PriorIssue>) {
        for issue in prior {
            let id = PriorId(self.prior.len());
            self.by_key.entry(issue.key.clone()).or_insert(id);
            self.by_rule.entry(issue.rule.clone()).or_default().insert(id);
            self.by_rule_line_fingerprint
                .entry(issue.rule.clone())
                .or_default()
                .entry(issue.line.unwrap_or(NO_LINE))
                .or_default()
                .entry(issue.fingerprint.clone().unwrap_or_default())
                .or_default()
                .insert(id);
            self.unmatched.insert(id);
            self.prior.push(issue);
        }
    }

    /// Unmatched prior issue carrying this identity key.
    pub fn lookup_by_key(&self, key: &str) -> Option<PriorId> {
        self.by_key.get(key).copied()
    }

    /// Unmatched prior issues of a rule, in seeding order.
    pub fn lookup_by_rule<'a>(&'a self, rule: &RuleKey) -> impl Iterator<Item = PriorId> + 'a {
        self.by_rule.get(rule).into_iter().flatten().copied()
    }

    /// Unmatched prior issues with exactly this rule, line and fingerprint.
    pub fn lookup_by_rule_line_fingerprint<'a>(
        &'a self,
        rule: &RuleKey,
        line: Option<u32>,
        fingerprint: Option<&str>,
    ) -> impl Iterator<Item = PriorId> + 'a {
        self.by_rule_line_fingerprint
            .get(rule)
            .and_then(|by_line| by_line.get(&line.unwrap_or(NO_LINE)))
            .and_then(|by_fp| by_fp.get(fingerprint.unwrap_or(NO_FINGERPRINT)))
            .into_iter()
            .flatten()
            .copied()
    }

    pub fn is_unmatched(&self, id: PriorId) -> bool {
        self.unmatched.contains(&id)
    }

    pub fn is_matched(&self, id: NewId) -> bool {
        self.matches.contains_key(&id)
    }

    /// Pair a new issue with an unmatched prior issue.
    ///
    /// Returns `false` and changes nothing if either side is already taken.
    pub fn set_match(&mut self, new: NewId, prior: PriorId, origin: MatchOrigin) -> bool {
        if self.is_matched(new) || !self.unmatched.remove(&prior) {
            return false;
        }
        self.unindex(prior);
        self.matches.insert(new, (prior, origin));
        true
    }

    fn unindex(&mut self, id: PriorId) {
        let issue = &self.prior[id.0];

        if self.by_key.get(&issue.key) == Some(&id) {
            self.by_key.remove(&issue.key);
        }

        if let Some(ids) = self.by_rule.get_mut(&issue.rule) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_rule.remove(&issue.rule);
            }
        }

        let line = issue.line.unwrap_or(NO_LINE);
        let fingerprint = issue.fingerprint.as_deref().unwrap_or(NO_FINGERPRINT);
        if let Some(by_line) = self.by_rule_line_fingerprint.get_mut(&issue.rule) {
            if let Some(by_fp) = by_line.get_mut(&line) {
                if let Some(ids) = by_fp.get_mut(fingerprint) {
                    ids.remove(&id);
                    if ids.is_empty() {
                        by_fp.remove(fingerprint);
                    }
                }
                if by_fp.is_empty() {
                    by_line.remove(&line);
                }
            }
            if by_line.is_empty() {
                self.by_rule_line_fingerprint.remove(&issue.rule);
            }
        }
    }

    /// Prior issue by id.
    pub fn prior(&self, id: PriorId) -> Option<&PriorIssue> {
        self.prior.get(id.0)
    }

    /// Number of prior issues seeded so far.
    pub fn prior_count(&self) -> usize {
        self.prior.len()
    }

    /// Prior issue matched to a new issue.
    pub fn matching(&self, new: NewId) -> Option<&PriorIssue> {
        self.matches.get(&new).and_then(|(prior, _)| self.prior(*prior))
    }

    /// Heuristic that matched a new issue.
    pub fn origin(&self, new: NewId) -> Option<MatchOrigin> {
        self.matches.get(&new).map(|(_, origin)| *origin)
    }

    /// Every match, ordered by new issue.
    pub fn matched_pairs(&self) -> impl Iterator<Item = (NewId, &PriorIssue, MatchOrigin)> {
        self.matches
            .iter()
            .filter_map(|(new, (prior, origin))| Some((*new, self.prior(*prior)?, *origin)))
    }

    pub fn matched_count(&self) -> usize {
        self.matches.len()
    }

    /// Prior issues nobody claimed, in seeding order.
    pub fn unmatched(&self) -> impl Iterator<Item = (PriorId, &PriorIssue)> {
        self.unmatched
            .iter()
            .filter_map(|id| Some((*id, self.prior(*id)?)))
    }

    pub fn unmatched_count(&self) -> usize {
        self.unmatched.len()
    }

    /// Consume the result, keeping only the prior issues nobody claimed.
    pub fn into_unmatched(self) -> Vec<PriorIssue> {
        let unmatched = self.unmatched;
        self.prior
            .into_iter()
            .enumerate()
            .filter(|(index, _)| unmatched.contains(&PriorId(*index)))
            .map(|(_, issue)| issue)
            .collect()
    }

    /// Passes of the cascade that actually ran, in order.
    pub fn passes_run(&self) -> &[TrackingPass] {
        &self.passes_run
    }

    /// Whether the block pass skipped pairwise scoring because of the size guard.
    pub fn block_guard_tripped(&self) -> bool {
        self.block_guard_tripped
    }

    pub(crate) fn record_pass(&mut self, pass: TrackingPass) {
        self.passes_run.push(pass);
    }

    pub(crate) fn record_guard_trip(&mut self) {
        self.block_guard_tripped = true;
    }

    /// Summarize the outcome given how many new issues were tracked.
    pub fn summary(&self, new_issue_count: usize) -> TrackingSummary {
        let mut by_origin = BTreeMap::new();
        for (_, origin) in self.matches.values() {
            *by_origin.entry(*origin).or_insert(0) += 1;
        }

        let matched = self.matches.len();
        let match_pct = if new_issue_count > 0 {
            (matched as f32 / new_issue_count as f32) * 100.0
        } else {
            100.0
        };

        TrackingSummary {
            matched,
            unmatched_prior: self.unmatched.len(),
            new_issues: new_issue_count.saturating_sub(matched),
            match_pct,
            by_origin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str) -> RuleKey {
        RuleKey::new("squid", name)
    }

    fn seeded() -> TrackingResult {
        let mut result = TrackingResult::new();
        result.seed(vec![
            PriorIssue::new("K1", rule("A"), Some(5), Some("msg"), Some("x1")),
            PriorIssue::new("K2", rule("A"), Some(5), Some("msg"), Some("x1")),
            PriorIssue::new("K3", rule("B"), None, None, None),
        ]);
        result
    }

    #[test]
    fn test_seed_populates_pool() {
        let result = seeded();
        assert_eq!(result.prior_count(), 3);
        assert_eq!(result.unmatched_count(), 3);
        let keys: Vec<_> = result.unmatched().map(|(_, p)| p.key.as_str()).collect();
        assert_eq!(keys, vec!["K1", "K2", "K3"]);
    }

    #[test]
    fn test_lookups() {
        let result = seeded();
        assert_eq!(result.lookup_by_key("K2"), Some(PriorId(1)));
        assert_eq!(result.lookup_by_key("nope"), None);
        assert_eq!(
            result.lookup_by_rule(&rule("A")).collect::<Vec<_>>(),
            vec![PriorId(0), PriorId(1)]
        );
        assert_eq!(result.lookup_by_rule(&rule("Z")).count(), 0);
        assert_eq!(
            result
                .lookup_by_rule_line_fingerprint(&rule("A"), Some(5), Some("x1"))
                .collect::<Vec<_>>(),
            vec![PriorId(0), PriorId(1)]
        );
        assert_eq!(
            result
                .lookup_by_rule_line_fingerprint(&rule("A"), Some(6), Some("x1"))
                .count(),
            0
        );
    }

    #[test]
    fn test_missing_line_and_fingerprint_use_sentinels() {
        let result = seeded();
        assert_eq!(
            result
                .lookup_by_rule_line_fingerprint(&rule("B"), None, None)
                .collect::<Vec<_>>(),
            vec![PriorId(2)]
        );
        assert_eq!(
            result
                .lookup_by_rule_line_fingerprint(&rule("B"), Some(NO_LINE), Some(NO_FINGERPRINT))
                .collect::<Vec<_>>(),
            vec![PriorId(2)]
        );
    }

    #[test]
    fn test_match_removes_from_every_index() {
        let mut result = seeded();
        assert!(result.set_match(NewId(0), PriorId(0), MatchOrigin::RuleLineFingerprint));

        assert!(result.is_matched(NewId(0)));
        assert!(!result.is_unmatched(PriorId(0)));
        assert_eq!(result.lookup_by_key("K1"), None);
        assert_eq!(result.lookup_by_rule(&rule("A")).collect::<Vec<_>>(), vec![PriorId(1)]);
        assert_eq!(
            result
                .lookup_by_rule_line_fingerprint(&rule("A"), Some(5), Some("x1"))
                .collect::<Vec<_>>(),
            vec![PriorId(1)]
        );
        assert_eq!(result.matching(NewId(0)).map(|p| p.key.as_str()), Some("K1"));
        assert_eq!(result.origin(NewId(0)), Some(MatchOrigin::RuleLineFingerprint));
    }

    #[test]
    fn test_match_is_injective() {
        let mut result = seeded();
        assert!(result.set_match(NewId(0), PriorId(0), MatchOrigin::IdentityKey));
        // prior already taken
        assert!(!result.set_match(NewId(1), PriorId(0), MatchOrigin::IdentityKey));
        // new issue already matched
        assert!(!result.set_match(NewId(0), PriorId(1), MatchOrigin::IdentityKey));
        assert_eq!(result.matched_count(), 1);
        assert_eq!(result.unmatched_count(), 2);
        assert!(!result.is_matched(NewId(1)));
    }

    #[test]
    fn test_into_unmatched() {
        let mut result = seeded();
        result.set_match(NewId(0), PriorId(1), MatchOrigin::IdentityKey);
        let keys: Vec<_> = result.into_unmatched().into_iter().map(|p| p.key).collect();
        assert_eq!(keys, vec!["K1".to_string(), "K3".to_string()]);
    }

    #[test]
    fn test_summary() {
        let mut result = seeded();
        result.set_match(NewId(0), PriorId(0), MatchOrigin::IdentityKey);
        result.set_match(NewId(1), PriorId(2), MatchOrigin::RuleFingerprint);

        let summary = result.summary(4);
        assert_eq!(summary.matched, 2);
        assert_eq!(summary.unmatched_prior, 1);
        assert_eq!(summary.new_issues, 2);
        assert!((summary.match_pct - 50.0).abs() < 0.001);
        assert_eq!(summary.by_origin.get(&MatchOrigin::IdentityKey), Some(&1));
        assert_eq!(summary.by_origin.get(&MatchOrigin::RuleFingerprint), Some(&1));
    }

    #[test]
    fn test_summary_without_new_issues() {
        let summary = TrackingResult::new().summary(0);
        assert_eq!(summary.matched, 0);
        assert!((summary.match_pct - 100.0).abs() < 0.001);
    }
}
