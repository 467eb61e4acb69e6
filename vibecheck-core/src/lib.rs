//! # vibecheck-core
//!
//! Claim verification for AI-generated text.
//!
//! ## Core Components
//!
//! - **Verify**: Claim extraction, evidence resolution, verdicts and reports
//! - **Providers**: Grounded search, citation index and link checking backends
//! - **Merge**: Rewriting the original text with a report's corrections
//!
//! ## Example
//!
//! ```rust,ignore
//! use vibecheck_core::{CorrectionMerger, Verifier};
//!
//! let verifier = Verifier::from_env()?;
//! let report = verifier.verify(text).await?;
//!
//! for verdict in &report.claims {
//!     println!("{}: {}", verdict.status, verdict.original_text);
//! }
//!
//! let corrected = CorrectionMerger::merge(text, &report);
//! ```

pub mod error;
pub mod providers;
pub mod verify;

// Re-exports for convenience
pub use error::{Error, Result};
#[cfg(feature = "gemini")]
pub use providers::GeminiSearch;
pub use providers::{
    CitationIndex, HttpLinkChecker, HttpPageFetcher, LinkChecker, LinkStatus, PageContent,
    PageFetcher, PaperRecord, ProviderConfig, SearchHit, SearchProvider, SemanticScholar, Stance,
};
pub use verify::{
    BatchItem, BatchRequest, Claim, ClaimExtractor, ClaimId, ClaimStatus, ClaimType,
    CorrectionMerger, EvidenceBundle, EvidenceResolver, MergeRequest, MergeResponse, Report,
    ReportBuilder, ReportStats, Verdict, VerdictAssembler, VerdictPolicy, Verifier,
    VerifierConfig, VerifyRequest,
};
