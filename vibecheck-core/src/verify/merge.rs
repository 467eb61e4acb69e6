//! Correction merging.
//!
//! Rewrites the original text by swapping each hallucinated claim for its
//! correction. Claims are located by their verbatim text, so a report
//! produced earlier, or edited by a client, can be merged later without
//! any span bookkeeping.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{ClaimStatus, Report};

/// Why a flagged verdict was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The claim text no longer occurs in the working text
    NotFound,
    /// The verdict carries no claim text to search for
    EmptyOriginal,
}

/// A flagged verdict that was left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSkip {
    /// Position of the verdict in the report
    pub index: usize,
    pub reason: SkipReason,
}

/// Merged text plus what happened to each flagged verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeResult {
    pub text: String,
    /// Report positions whose corrections were applied
    pub applied: Vec<usize>,
    pub skipped: Vec<MergeSkip>,
}

/// Correction-merge request as sent by a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    pub original_text: String,
    pub report: Report,
}

/// Correction-merge response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResponse {
    pub corrected_text: String,
}

impl MergeRequest {
    pub fn apply(&self) -> MergeResponse {
        MergeResponse {
            corrected_text: CorrectionMerger::merge(&self.original_text, &self.report),
        }
    }
}

/// Applies corrections from a report to text.
pub struct CorrectionMerger;

impl CorrectionMerger {
    /// Replace each hallucinated claim with its correction.
    ///
    /// Verdicts are applied in report order, each replacing the first
    /// remaining occurrence of its text. Anything that cannot be located is
    /// skipped and the rest of the text is left byte-for-byte intact.
    pub fn merge(original: &str, report: &Report) -> String {
        Self::merge_detailed(original, report).text
    }

    /// [`merge`](Self::merge), also reporting which verdicts applied.
    pub fn merge_detailed(original: &str, report: &Report) -> MergeResult {
        let mut text = original.to_string();
        let mut applied = Vec::new();
        let mut skipped = Vec::new();

        for (index, verdict) in report.claims.iter().enumerate() {
            if verdict.status != ClaimStatus::Hallucination {
                continue;
            }
            let Some(correction) = verdict.correction.as_deref() else {
                continue;
            };

            if verdict.original_text.is_empty() {
                skipped.push(MergeSkip {
                    index,
                    reason: SkipReason::EmptyOriginal,
                });
                continue;
            }

            if !text.contains(verdict.original_text.as_str()) {
                debug!(index, "Claim text not found, skipping correction");
                skipped.push(MergeSkip {
                    index,
                    reason: SkipReason::NotFound,
                });
                continue;
            }

            text = text.replacen(verdict.original_text.as_str(), correction, 1);
            applied.push(index);
        }

        MergeResult {
            text,
            applied,
            skipped,
        }
    }
}
