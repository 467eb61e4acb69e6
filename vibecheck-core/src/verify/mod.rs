//! Claim verification and correction merging.
//!
//! Text goes through four stages, each a separate component:
//!
//! 1. [`ClaimExtractor`] splits it into claims and tags each FACT or OPINION.
//! 2. [`EvidenceResolver`] asks search, citation and link providers about
//!    each FACT claim.
//! 3. [`VerdictAssembler`] turns a claim and its evidence into a [`Verdict`].
//! 4. [`ReportBuilder`] gathers verdicts, in input order, into a [`Report`].
//!
//! [`CorrectionMerger`] then applies a report's corrections to the original
//! text. [`Verifier`] wires the stages together.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vibecheck_core::providers::{GeminiSearch, SemanticScholar};
//! use vibecheck_core::verify::{CorrectionMerger, Verifier, VerifierConfig};
//!
//! let verifier = Verifier::new(
//!     Arc::new(GeminiSearch::from_env()?),
//!     Arc::new(SemanticScholar::from_env()?),
//!     VerifierConfig::default(),
//! );
//!
//! let report = verifier.verify(text).await?;
//! println!("accuracy: {}%", report.stats.accuracy);
//!
//! let corrected = CorrectionMerger::merge(text, &report);
//! ```
//!
//! ## Failure model
//!
//! A provider failing for one claim only weakens that claim's verdict. The
//! request fails as a whole when the input is rejected, or when every
//! evidence channel failed for every FACT claim.

pub mod claims;
pub mod evidence;
pub mod merge;
pub mod report;
pub mod types;
pub mod verdict;
pub mod verifier;

#[cfg(test)]
mod proptest;

// Re-exports for convenience
pub use claims::{detect_citation, extract_urls, ClaimExtractor};
pub use evidence::{ChannelOutcome, EvidenceBundle, EvidenceResolver};
pub use merge::{CorrectionMerger, MergeRequest, MergeResponse, MergeResult, MergeSkip, SkipReason};
pub use report::ReportBuilder;
pub use types::{
    accuracy, CitationRef, Claim, ClaimId, ClaimStatus, ClaimType, Report, ReportStats, Verdict,
    VerdictPolicy, VerifierConfig, OPINION_REASONING,
};
pub use verdict::{VerdictAssembler, FABRICATED_CITATION_CORRECTION};
pub use verifier::{BatchItem, BatchRequest, CitationCheck, Verifier, VerifyRequest};

