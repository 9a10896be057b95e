//! Core data types for Palimpsest
//!
//! Issues come in two flavours: [`NewIssue`] is what the analyzers just
//! reported for the current revision of a file, [`PriorIssue`] is what was
//! persisted for the previous revision. Tracking pairs them up.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Repository of rules that people attach by hand rather than analyzers.
pub const MANUAL_REPOSITORY: &str = "manual";

/// Fully-qualified rule identifier, `repository:rule`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RuleKey {
    repository: String,
    rule: String,
}

impl RuleKey {
    pub fn new(repository: impl Into<String>, rule: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            rule: rule.into(),
        }
    }

    /// Shorthand for a rule in the `manual` repository.
    pub fn manual(rule: impl Into<String>) -> Self {
        Self::new(MANUAL_REPOSITORY, rule)
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// Whether issues of this rule are created by people, not analyzers.
    pub fn is_manual(&self) -> bool {
        self.repository == MANUAL_REPOSITORY
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.rule)
    }
}

impl FromStr for RuleKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((repository, rule)) if !repository.is_empty() && !rule.is_empty() => {
                Ok(Self::new(repository, rule))
            }
            _ => Err(Error::InvalidRuleKey(s.to_string())),
        }
    }
}

impl TryFrom<String> for RuleKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RuleKey> for String {
    fn from(key: RuleKey) -> Self {
        key.to_string()
    }
}

/// Lifecycle status of a persisted issue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueStatus {
    #[default]
    Open,
    Confirmed,
    Reopened,
    Resolved,
    Closed,
}

impl IssueStatus {
    /// Return the uppercase string representation used for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Open => "OPEN",
            IssueStatus::Confirmed => "CONFIRMED",
            IssueStatus::Reopened => "REOPENED",
            IssueStatus::Resolved => "RESOLVED",
            IssueStatus::Closed => "CLOSED",
        }
    }
}

/// Position of a [`NewIssue`] in the slice handed to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NewId(pub usize);

/// Position of a [`PriorIssue`] in the collection the tracking result was seeded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PriorId(pub usize);

/// An issue detected by the current scan.
///
/// # Fields
/// - `rule`: Rule that raised the issue.
/// - `line`: 1-based line, `None` for file-level issues.
/// - `message`: Free-text message from the analyzer.
/// - `fingerprint`: Content hash of `line` in the current revision, set by the tracker.
/// - `key`: Identity key. Only manual issues carry one on the way in; the
///   tracker hands matched issues the key of their prior counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIssue {
    pub rule: RuleKey,
    pub line: Option<u32>,
    pub message: Option<String>,
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
}

impl NewIssue {
    pub fn new(rule: RuleKey, line: Option<u32>, message: Option<&str>) -> Self {
        Self {
            rule,
            line,
            message: message.map(String::from),
            fingerprint: None,
            key: None,
        }
    }

    /// Attach an identity key carried over from a previous scan.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// An issue persisted by the previous analysis of the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorIssue {
    pub key: String,
    pub rule: RuleKey,
    pub line: Option<u32>,
    pub message: Option<String>,
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub status: IssueStatus,
}

impl PriorIssue {
    pub fn new(
        key: impl Into<String>,
        rule: RuleKey,
        line: Option<u32>,
        message: Option<&str>,
        fingerprint: Option<&str>,
    ) -> Self {
        Self {
            key: key.into(),
            rule,
            line,
            message: message.map(String::from),
            fingerprint: fingerprint.map(String::from),
            status: IssueStatus::Open,
        }
    }

    pub fn with_status(mut self, status: IssueStatus) -> Self {
        self.status = status;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_key_parse_and_display() {
        let key: RuleKey = "squid:AvoidCycle".parse().unwrap();
        assert_eq!(key.repository(), "squid");
        assert_eq!(key.rule(), "AvoidCycle");
        assert_eq!(key.to_string(), "squid:AvoidCycle");
        assert!(!key.is_manual());
    }

    #[test]
    fn test_rule_key_rule_may_contain_colon() {
        let key: RuleKey = "custom:path:rule".parse().unwrap();
        assert_eq!(key.repository(), "custom");
        assert_eq!(key.rule(), "path:rule");
    }

    #[test]
    fn test_rule_key_rejects_malformed() {
        assert!("AvoidCycle".parse::<RuleKey>().is_err());
        assert!(":AvoidCycle".parse::<RuleKey>().is_err());
        assert!("squid:".parse::<RuleKey>().is_err());
    }

    #[test]
    fn test_manual_rule() {
        assert!(RuleKey::manual("Performance").is_manual());
        assert_eq!(RuleKey::manual("Performance").to_string(), "manual:Performance");
    }

    #[test]
    fn test_status_as_str() {
        assert_eq!(IssueStatus::Open.as_str(), "OPEN");
        assert_eq!(IssueStatus::Closed.as_str(), "CLOSED");
        assert_eq!(IssueStatus::default(), IssueStatus::Open);
    }

    #[test]
    fn test_new_issue_with_key() {
        let issue = NewIssue::new(RuleKey::manual("Performance"), Some(3), Some("slow"))
            .with_key("ABCDE");
        assert_eq!(issue.key.as_deref(), Some("ABCDE"));
        assert_eq!(issue.message.as_deref(), Some("slow"));
        assert!(issue.fingerprint.is_none());
    }
}
