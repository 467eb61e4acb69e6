//! Report assembly.

use super::types::{Claim, Report, Verdict};

/// Gathers per-claim verdicts into a [`Report`].
pub struct ReportBuilder;

impl ReportBuilder {
    /// Build a report from verdicts already in claim order.
    ///
    /// # Panics
    ///
    /// Panics if `verdicts` does not line up one-to-one with `claims`.
    /// A mismatch means the pipeline lost or reordered a claim.
    pub fn build(claims: &[Claim], verdicts: Vec<Verdict>) -> Report {
        assert_eq!(
            claims.len(),
            verdicts.len(),
            "every claim needs exactly one verdict"
        );
        for (claim, verdict) in claims.iter().zip(&verdicts) {
            assert_eq!(
                claim.original_text, verdict.original_text,
                "verdict out of order for claim {}",
                claim.id
            );
        }
        Report::from_verdicts(verdicts)
    }

    /// Build a report from verdicts tagged with their claim index, in any
    /// completion order.
    pub fn from_indexed(claims: &[Claim], mut indexed: Vec<(usize, Verdict)>) -> Report {
        indexed.sort_by_key(|(index, _)| *index);
        let verdicts = indexed.into_iter().map(|(_, verdict)| verdict).collect();
        Self::build(claims, verdicts)
    }
}
