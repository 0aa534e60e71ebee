//! Validation and statistics reports.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Outcome of [`SortedIndex::full_validate`](super::SortedIndex::full_validate).
///
/// Anomalies are collected here rather than returned as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateReport {
    /// Whether no errors were found.
    pub valid: bool,
    /// Number of entries walked, when a full walk was requested.
    pub num_keys: Option<u64>,
    /// Structural problems.
    pub errors: Vec<String>,
    /// Problems that do not make the index unusable.
    pub warnings: Vec<String>,
}

impl Default for ValidateReport {
    fn default() -> Self {
        Self { valid: true, num_keys: None, errors: Vec::new(), warnings: Vec::new() }
    }
}

impl ValidateReport {
    /// Record an error and mark the report invalid.
    pub(crate) fn error(&mut self, index: &str, message: String) {
        warn!(index, %message, "index validation error");
        self.valid = false;
        self.errors.push(message);
    }

    /// Record a warning.
    pub(crate) fn warning(&mut self, index: &str, message: String) {
        warn!(index, %message, "index validation warning");
        self.warnings.push(message);
    }
}
