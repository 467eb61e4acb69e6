//! Verification pipeline.
//!
//! `verify` runs extract, resolve, assemble and report for one text.
//! Claims fan out concurrently up to `max_parallel` and fan back in by
//! claim index, so the report order never depends on provider latency.
//!
//! Everything runs inside the caller's future. Dropping that future (a
//! client disconnect, an outer timeout) drops every in-flight lookup with
//! it and no report is produced.

use std::sync::Arc;

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::claims::ClaimExtractor;
use super::evidence::{EvidenceBundle, EvidenceResolver};
use super::merge::CorrectionMerger;
use super::report::ReportBuilder;
use super::types::{Claim, Report, Verdict, VerifierConfig};
use super::verdict::VerdictAssembler;
use crate::error::{Error, Result};
use crate::providers::{CitationIndex, LinkChecker, PageFetcher, SearchProvider};

/// Single-text verification request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub text: String,
}

/// Batch verification request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub texts: Vec<String>,
}

/// Outcome of one text in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    pub success: bool,
    pub report: Option<Report>,
    pub error: Option<String>,
}

impl From<Result<Report>> for BatchItem {
    fn from(result: Result<Report>) -> Self {
        match result {
            Ok(report) => Self {
                success: true,
                report: Some(report),
                error: None,
            },
            Err(e) => Self {
                success: false,
                report: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Result of a standalone citation lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CitationCheck {
    pub found: bool,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub url: Option<String>,
    /// First three authors
    pub authors: Vec<String>,
    /// Whether the requested author appears on the paper; true when none was given
    pub author_match: bool,
    pub citation_count: Option<u64>,
    pub error: Option<String>,
}

/// Claim verification and correction pipeline.
pub struct Verifier {
    config: VerifierConfig,
    extractor: ClaimExtractor,
    resolver: EvidenceResolver,
    assembler: VerdictAssembler,
}

impl Verifier {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        citations: Arc<dyn CitationIndex>,
        config: VerifierConfig,
    ) -> Self {
        let extractor = ClaimExtractor::new()
            .with_max_input_chars(config.max_input_chars)
            .with_clause_splitting(config.split_clauses);
        let assembler = VerdictAssembler::new(config.verdict_policy.clone());

        Self {
            config,
            extractor,
            resolver: EvidenceResolver::new(search, citations),
            assembler,
        }
    }

    /// Check URLs mentioned in claims. Ignored when `check_links` is off.
    pub fn with_link_checker(mut self, checker: Arc<dyn LinkChecker>) -> Self {
        if self.config.check_links {
            self.resolver = self.resolver.with_link_checker(checker);
        }
        self
    }

    /// Fetch pages cited in claims for the search judgement. Ignored when
    /// `fetch_pages` is off.
    pub fn with_page_fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        if self.config.fetch_pages {
            self.resolver = self.resolver.with_page_fetcher(fetcher);
        }
        self
    }

    /// Verifier backed by Gemini search and Semantic Scholar, configured
    /// from the environment.
    #[cfg(feature = "gemini")]
    pub fn from_env() -> Result<Self> {
        use crate::providers::{
            GeminiSearch, HttpLinkChecker, HttpPageFetcher, ProviderConfig, SemanticScholar,
        };

        let config = VerifierConfig::from_env();
        let links = HttpLinkChecker::new(&ProviderConfig::new("").with_timeout(10))?;
        let pages = HttpPageFetcher::new(&ProviderConfig::new("").with_timeout(15))?;
        Ok(Self::new(
            Arc::new(GeminiSearch::from_env()?),
            Arc::new(SemanticScholar::from_env()?),
            config,
        )
        .with_link_checker(Arc::new(links))
        .with_page_fetcher(Arc::new(pages)))
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Verify every claim in `text`.
    ///
    /// Provider failures for individual claims show up as SUSPICIOUS
    /// verdicts. The call fails only when the input is rejected or when
    /// every evidence channel failed for every fact claim.
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    pub async fn verify(&self, text: &str) -> Result<Report> {
        let claims = self.extractor.extract(text)?;
        if claims.is_empty() {
            return Ok(Report::empty());
        }

        let budget = self.config.claim_timeout();
        let tasks = claims.iter().enumerate().map(|(index, claim)| async move {
            if !claim.is_fact() {
                return (index, Verdict::opinion(claim), false);
            }
            let evidence = self.resolver.resolve_within(claim, budget).await;
            let unavailable = evidence.all_channels_failed();
            (index, self.assembler.assemble(claim, &evidence), unavailable)
        });

        let results: Vec<(usize, Verdict, bool)> = stream::iter(tasks)
            .buffer_unordered(self.config.max_parallel.max(1))
            .collect()
            .await;

        let facts = claims.iter().filter(|c| c.is_fact()).count();
        let unavailable = results.iter().filter(|(_, _, failed)| *failed).count();
        if facts > 0 && unavailable == facts {
            warn!(facts, "Every evidence channel failed for every fact claim");
            return Err(Error::VerificationUnavailable { claims: facts });
        }

        let indexed = results
            .into_iter()
            .map(|(index, verdict, _)| (index, verdict))
            .collect();
        let report = ReportBuilder::from_indexed(&claims, indexed);

        info!(
            claims = report.stats.total,
            verified = report.stats.verified,
            hallucinations = report.stats.hallucinations,
            suspicious = report.stats.suspicious,
            opinions = report.stats.opinions,
            accuracy = report.stats.accuracy,
            "Verification complete"
        );

        Ok(report)
    }

    /// Verify several texts independently.
    ///
    /// Each text gets its own pipeline; one text failing does not affect
    /// the others. Results follow input order.
    #[instrument(skip(self, texts), fields(texts = texts.len()))]
    pub async fn verify_batch<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<BatchItem>> {
        if texts.len() > self.config.max_batch_size {
            return Err(Error::BatchTooLarge {
                max: self.config.max_batch_size,
                got: texts.len(),
            });
        }

        let results = join_all(texts.iter().map(|t| self.verify(t.as_ref()))).await;
        Ok(results.into_iter().map(BatchItem::from).collect())
    }

    /// Resolve evidence for a single claim under the per-claim timeout.
    pub async fn resolve_claim(&self, claim: &Claim) -> EvidenceBundle {
        self.resolver
            .resolve_within(claim, self.config.claim_timeout())
            .await
    }

    /// Look up one paper by title, optionally checking an author surname.
    #[instrument(skip(self))]
    pub async fn check_citation(&self, title: &str, author: Option<&str>) -> CitationCheck {
        let query = match author {
            Some(author) => format!("{} {}", author, title),
            None => title.to_string(),
        };

        let lookup = tokio::time::timeout(
            self.config.claim_timeout(),
            self.resolver.citation_index().lookup_citation(&query, None),
        )
        .await
        .unwrap_or_else(|_| Err(Error::timeout(self.config.claim_timeout_ms)));

        match lookup {
            Ok(records) => match records.into_iter().next() {
                Some(paper) => CitationCheck {
                    found: true,
                    author_match: author.map_or(true, |a| paper.has_author(a)),
                    title: Some(paper.title),
                    year: paper.year,
                    url: paper.url,
                    authors: paper.authors.into_iter().take(3).collect(),
                    citation_count: paper.citation_count,
                    error: None,
                },
                None => CitationCheck {
                    error: Some("Paper not found".to_string()),
                    ..CitationCheck::default()
                },
            },
            Err(e) => {
                warn!(error = %e, "Citation lookup failed");
                CitationCheck {
                    error: Some(e.to_string()),
                    ..CitationCheck::default()
                }
            }
        }
    }

    /// Apply the corrections of `report` to `original`.
    pub fn merge(&self, original: &str, report: &Report) -> String {
        CorrectionMerger::merge(original, report)
    }
}
