//! Report generation for conformance results.

use serde::{Deserialize, Serialize};

use rtstream_core::metrics::MetricsSnapshot;

/// Outcome of one property check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyResult {
    /// Property name.
    pub name: String,
    pub passed: bool,
    /// Expected observation.
    pub expected: String,
    /// What the stream actually returned.
    pub actual: String,
    /// Set for checks that record a boundary without asserting on it.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub informational: bool,
}

impl PropertyResult {
    pub fn check(name: &str, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        let expected = expected.into();
        let actual = actual.into();
        Self {
            name: name.to_string(),
            passed: expected == actual,
            expected,
            actual,
            informational: false,
        }
    }

    pub fn observe(name: &str, actual: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            expected: "any".to_string(),
            actual: actual.into(),
            informational: true,
        }
    }

    pub fn failed(name: &str, expected: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            expected: expected.into(),
            actual: reason.into(),
            informational: false,
        }
    }
}

/// Aggregate over all property results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<PropertyResult>,
}

impl PropertySummary {
    #[must_use]
    pub fn from_results(results: Vec<PropertyResult>) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            total,
            passed,
            failed: total - passed,
            results,
        }
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// A full conformance run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConformanceReport {
    pub title: String,
    /// `pluggable` (table dispatch) or `minimal` (direct dispatch).
    pub mode: String,
    /// Timestamp (UTC).
    pub timestamp: String,
    pub summary: PropertySummary,
    /// Process-wide counters at the end of the run.
    pub metrics: MetricsSnapshot,
}

impl ConformanceReport {
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_compares_strings() {
        assert!(PropertyResult::check("a", "4", "4").passed);
        assert!(!PropertyResult::check("a", "4", "-1").passed);
    }

    #[test]
    fn test_summary_counts() {
        let summary = PropertySummary::from_results(vec![
            PropertyResult::check("a", "1", "1"),
            PropertyResult::check("b", "1", "2"),
            PropertyResult::observe("c", "0"),
        ]);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert!(!summary.all_passed());
    }

    #[test]
    fn test_informational_flag_only_serialized_when_set() {
        let plain = serde_json::to_string(&PropertyResult::check("a", "1", "1")).unwrap();
        assert!(!plain.contains("informational"));
        let info = serde_json::to_string(&PropertyResult::observe("c", "0")).unwrap();
        assert!(info.contains("\"informational\":true"));
    }
}
