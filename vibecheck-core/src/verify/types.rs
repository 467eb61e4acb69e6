//! Core types for claim verification.
//!
//! A request flows through these types in one direction: text is split into
//! [`Claim`]s, each claim is judged into a [`Verdict`], and the verdicts are
//! gathered into a [`Report`] that can later drive correction merging.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a claim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimId(pub Uuid);

impl ClaimId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClaimId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClaimId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a claim asserts something checkable or expresses a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimType {
    Fact,
    Opinion,
}

impl std::fmt::Display for ClaimType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fact => write!(f, "FACT"),
            Self::Opinion => write!(f, "OPINION"),
        }
    }
}

/// An academic reference found inside a claim, e.g. `Vaswani et al. (2017)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationRef {
    /// Lead author surname
    pub author: Option<String>,
    /// Publication year
    pub year: Option<i32>,
    /// Quoted paper title, if the claim names one
    pub title: Option<String>,
}

impl CitationRef {
    /// Query string for a citation index: title first, then author.
    pub fn query(&self) -> String {
        let mut parts = Vec::new();
        if let Some(title) = &self.title {
            parts.push(title.as_str());
        }
        if let Some(author) = &self.author {
            parts.push(author.as_str());
        }
        parts.join(" ")
    }
}

/// A contiguous span of the input treated as one checkable unit.
///
/// `original_text` is an owned copy of the input slice and is never
/// normalized, so it can be found again verbatim during merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// Unique identifier
    pub id: ClaimId,
    /// Exact surface text from the input
    pub original_text: String,
    /// Fact or opinion
    pub claim_type: ClaimType,
    /// Byte span in the input (start, end)
    pub span: Option<(usize, usize)>,
    /// Citation-like reference, if present
    pub citation: Option<CitationRef>,
    /// URLs mentioned in the claim
    pub urls: Vec<String>,
}

impl Claim {
    /// Create a new claim.
    pub fn new(text: impl Into<String>, claim_type: ClaimType) -> Self {
        Self {
            id: ClaimId::new(),
            original_text: text.into(),
            claim_type,
            span: None,
            citation: None,
            urls: Vec::new(),
        }
    }

    /// Set the source span.
    pub fn with_span(mut self, start: usize, end: usize) -> Self {
        self.span = Some((start, end));
        self
    }

    /// Attach a citation reference.
    pub fn with_citation(mut self, citation: CitationRef) -> Self {
        self.citation = Some(citation);
        self
    }

    /// Attach mentioned URLs.
    pub fn with_urls(mut self, urls: Vec<String>) -> Self {
        self.urls = urls;
        self
    }

    pub fn is_fact(&self) -> bool {
        self.claim_type == ClaimType::Fact
    }

    /// First 60 characters, for log lines.
    pub fn preview(&self) -> String {
        self.original_text.chars().take(60).collect()
    }
}

/// Final status of a claim. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    Verified,
    Hallucination,
    Suspicious,
    Opinion,
}

impl std::fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verified => write!(f, "VERIFIED"),
            Self::Hallucination => write!(f, "HALLUCINATION"),
            Self::Suspicious => write!(f, "SUSPICIOUS"),
            Self::Opinion => write!(f, "OPINION"),
        }
    }
}

/// Reasoning attached to every opinion verdict.
pub const OPINION_REASONING: &str = "subjective statement, not fact-checkable";

/// Clamp a raw confidence estimate into `0..=100`.
pub fn clamp_confidence(raw: i64) -> u8 {
    raw.clamp(0, 100) as u8
}

/// Per-claim report entry.
///
/// Build through the status constructors; they keep `correction` present
/// exactly when the status is [`ClaimStatus::Hallucination`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub original_text: String,
    #[serde(rename = "type")]
    pub claim_type: ClaimType,
    pub status: ClaimStatus,
    pub reasoning: String,
    pub correction: Option<String>,
    pub source_url: Option<String>,
    pub confidence_score: u8,
}

impl Verdict {
    /// Opinion verdict: full confidence, no correction.
    pub fn opinion(claim: &Claim) -> Self {
        Self {
            original_text: claim.original_text.clone(),
            claim_type: claim.claim_type,
            status: ClaimStatus::Opinion,
            reasoning: OPINION_REASONING.to_string(),
            correction: None,
            source_url: None,
            confidence_score: 100,
        }
    }

    pub fn verified(
        claim: &Claim,
        reasoning: impl Into<String>,
        source_url: Option<String>,
        confidence: i64,
    ) -> Self {
        Self {
            original_text: claim.original_text.clone(),
            claim_type: claim.claim_type,
            status: ClaimStatus::Verified,
            reasoning: reasoning.into(),
            correction: None,
            source_url,
            confidence_score: clamp_confidence(confidence),
        }
    }

    pub fn hallucination(
        claim: &Claim,
        reasoning: impl Into<String>,
        correction: impl Into<String>,
        source_url: Option<String>,
        confidence: i64,
    ) -> Self {
        Self {
            original_text: claim.original_text.clone(),
            claim_type: claim.claim_type,
            status: ClaimStatus::Hallucination,
            reasoning: reasoning.into(),
            correction: Some(correction.into()),
            source_url,
            confidence_score: clamp_confidence(confidence),
        }
    }

    pub fn suspicious(
        claim: &Claim,
        reasoning: impl Into<String>,
        source_url: Option<String>,
        confidence: i64,
    ) -> Self {
        Self {
            original_text: claim.original_text.clone(),
            claim_type: claim.claim_type,
            status: ClaimStatus::Suspicious,
            reasoning: reasoning.into(),
            correction: None,
            source_url,
            confidence_score: clamp_confidence(confidence),
        }
    }

    /// Check the verdict invariants.
    pub fn is_consistent(&self) -> bool {
        let correction_matches =
            self.correction.is_some() == (self.status == ClaimStatus::Hallucination);
        let opinion_matches = match self.claim_type {
            ClaimType::Opinion => {
                self.status == ClaimStatus::Opinion && self.confidence_score == 100
            }
            ClaimType::Fact => self.status != ClaimStatus::Opinion,
        };
        correction_matches && opinion_matches && self.confidence_score <= 100
    }
}

/// Aggregate counts over a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportStats {
    pub total: usize,
    pub verified: usize,
    pub hallucinations: usize,
    pub suspicious: usize,
    pub opinions: usize,
    /// round(100 * verified / total), 0 when total is 0
    pub accuracy: u8,
}

impl ReportStats {
    /// Count statuses in a single pass.
    pub fn from_verdicts(verdicts: &[Verdict]) -> Self {
        let mut stats = Self::default();
        for verdict in verdicts {
            stats.total += 1;
            match verdict.status {
                ClaimStatus::Verified => stats.verified += 1,
                ClaimStatus::Hallucination => stats.hallucinations += 1,
                ClaimStatus::Suspicious => stats.suspicious += 1,
                ClaimStatus::Opinion => stats.opinions += 1,
            }
        }
        stats.accuracy = accuracy(stats.verified, stats.total);
        stats
    }
}

/// Percentage of verified claims, rounded half up.
pub fn accuracy(verified: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let verified = verified.min(total);
    ((200 * verified + total) / (2 * total)) as u8
}

/// Ordered verdicts for one verification request.
///
/// Deserializing a report recomputes `stats` from the verdicts, so a
/// report sent back by a client without stats is still well formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ReportWire")]
pub struct Report {
    /// Verdicts in left-to-right input order
    pub claims: Vec<Verdict>,
    /// Derived counts
    pub stats: ReportStats,
    /// When the report was built
    pub generated_at: DateTime<Utc>,
}

impl Report {
    /// Build a report directly from ordered verdicts.
    pub fn from_verdicts(claims: Vec<Verdict>) -> Self {
        let stats = ReportStats::from_verdicts(&claims);
        Self {
            claims,
            stats,
            generated_at: Utc::now(),
        }
    }

    /// Report with no claims (empty or whitespace-only input).
    pub fn empty() -> Self {
        Self::from_verdicts(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// Verdicts flagged as hallucinations, in order.
    pub fn hallucinations(&self) -> impl Iterator<Item = &Verdict> {
        self.claims
            .iter()
            .filter(|v| v.status == ClaimStatus::Hallucination)
    }
}

#[derive(Deserialize)]
struct ReportWire {
    claims: Vec<Verdict>,
    #[serde(default)]
    generated_at: Option<DateTime<Utc>>,
}

impl From<ReportWire> for Report {
    fn from(wire: ReportWire) -> Self {
        let mut report = Report::from_verdicts(wire.claims);
        if let Some(at) = wire.generated_at {
            report.generated_at = at;
        }
        report
    }
}

/// Thresholds that turn evidence signal into a status.
///
/// All confidence values are on the 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictPolicy {
    /// Minimum corroboration strength for VERIFIED
    pub verified_threshold: u8,
    /// Minimum contradiction strength for HALLUCINATION
    pub hallucination_threshold: u8,
    /// Confidence assumed for a search hit that carries no estimate
    pub default_hit_confidence: u8,
    /// Minimum |support - refute| / (support + refute) to settle conflicting evidence
    pub conflict_margin: f64,
    /// Confidence of a SUSPICIOUS verdict with no evidence at all
    pub no_evidence_confidence: u8,
    /// Confidence when a cited paper cannot be found
    pub fabricated_citation_confidence: u8,
    /// Confidence when the citation index confirms the cited paper
    pub citation_match_confidence: u8,
    /// Added when search and citation index agree
    pub corroboration_bonus: u8,
    /// Allowed difference between cited and indexed publication year
    pub year_tolerance: i32,
}

impl Default for VerdictPolicy {
    fn default() -> Self {
        Self {
            verified_threshold: 60,
            hallucination_threshold: 60,
            default_hit_confidence: 70,
            conflict_margin: 0.5,
            no_evidence_confidence: 25,
            fabricated_citation_confidence: 85,
            citation_match_confidence: 90,
            corroboration_bonus: 5,
            year_tolerance: 0,
        }
    }
}

impl VerdictPolicy {
    /// Highest confidence a SUSPICIOUS verdict may carry.
    pub fn suspicious_ceiling(&self) -> u8 {
        self.verified_threshold
            .min(self.hallucination_threshold)
            .saturating_sub(1)
    }
}

/// Configuration for a verification run.
///
/// Passed explicitly to [`super::Verifier`]; nothing in the pipeline reads
/// the environment on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Longest accepted input, in characters
    pub max_input_chars: usize,
    /// Most texts accepted by a batch request
    pub max_batch_size: usize,
    /// Time budget for all evidence calls of one claim
    pub claim_timeout_ms: u64,
    /// Claims resolved concurrently
    pub max_parallel: usize,
    /// Split sentences further at `;`
    pub split_clauses: bool,
    /// Check URLs mentioned in claims
    pub check_links: bool,
    /// Fetch pages cited in claims and judge claims against their text
    pub fetch_pages: bool,
    /// Status thresholds
    pub verdict_policy: VerdictPolicy,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            max_input_chars: 20_000,
            max_batch_size: 5,
            claim_timeout_ms: 15_000,
            max_parallel: 5,
            split_clauses: true,
            check_links: true,
            fetch_pages: true,
            verdict_policy: VerdictPolicy::default(),
        }
    }
}

impl VerifierConfig {
    /// Configuration optimized for low latency.
    pub fn fast() -> Self {
        Self {
            claim_timeout_ms: 5_000,
            max_parallel: 10,
            check_links: false,
            fetch_pages: false,
            ..Self::default()
        }
    }

    /// Configuration that waits longer and demands stronger evidence.
    pub fn thorough() -> Self {
        Self {
            claim_timeout_ms: 30_000,
            max_parallel: 3,
            verdict_policy: VerdictPolicy {
                verified_threshold: 75,
                hallucination_threshold: 70,
                ..VerdictPolicy::default()
            },
            ..Self::default()
        }
    }

    /// Create configuration from `VIBECHECK_*` environment variables.
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        fn var<T: std::str::FromStr>(name: &str) -> Option<T> {
            std::env::var(name).ok().and_then(|s| s.parse().ok())
        }

        fn flag(name: &str) -> Option<bool> {
            std::env::var(name)
                .ok()
                .map(|s| s != "0" && s.to_lowercase() != "false")
        }

        let defaults = Self::default();
        Self {
            max_input_chars: var("VIBECHECK_MAX_INPUT_CHARS").unwrap_or(defaults.max_input_chars),
            max_batch_size: var("VIBECHECK_MAX_BATCH_SIZE").unwrap_or(defaults.max_batch_size),
            claim_timeout_ms: var("VIBECHECK_CLAIM_TIMEOUT_MS")
                .unwrap_or(defaults.claim_timeout_ms),
            max_parallel: var("VIBECHECK_MAX_PARALLEL").unwrap_or(defaults.max_parallel),
            split_clauses: flag("VIBECHECK_SPLIT_CLAUSES").unwrap_or(defaults.split_clauses),
            check_links: flag("VIBECHECK_CHECK_LINKS").unwrap_or(defaults.check_links),
            fetch_pages: flag("VIBECHECK_FETCH_PAGES").unwrap_or(defaults.fetch_pages),
            verdict_policy: defaults.verdict_policy,
        }
    }

    pub fn claim_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.claim_timeout_ms)
    }
}
