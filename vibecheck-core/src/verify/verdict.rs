//! Verdict assembly.
//!
//! Turns a claim plus its evidence into exactly one [`Verdict`]. Pure and
//! deterministic: the same claim and bundle always produce the same
//! status, confidence and correction.
//!
//! Decision order:
//!
//! 1. Opinion claims are never judged.
//! 2. A claim whose every lookup timed out is SUSPICIOUS.
//! 3. A cited paper the index confirms makes the claim VERIFIED unless
//!    search firmly refutes it.
//! 4. A cited paper the index cannot find is a fabricated citation
//!    (HALLUCINATION) unless search independently corroborates the claim.
//! 5. Otherwise search alone decides: firm support is VERIFIED, firm
//!    refutation with a correction is HALLUCINATION, anything weaker or
//!    conflicting is SUSPICIOUS.
//! 6. A VERIFIED claim whose own link is broken drops to SUSPICIOUS.

use super::evidence::{ChannelOutcome, EvidenceBundle};
use super::types::{clamp_confidence, CitationRef, Claim, ClaimStatus, Verdict, VerdictPolicy};
use crate::providers::{PaperRecord, SearchHit, Stance};

/// Replacement text for a citation that could not be found.
pub const FABRICATED_CITATION_CORRECTION: &str =
    "[CITATION REMOVED: Reference could not be verified]";

/// What search evidence says about a claim, after weighing.
#[derive(Debug, Clone, PartialEq)]
enum SearchSignal<'a> {
    /// Channel not attempted
    Skipped,
    /// Channel failed
    Unavailable,
    /// Channel did not answer in time
    TimedOut,
    /// No hits, or only hits without a stance
    Inconclusive { hits: usize },
    /// Net support
    Supported { strength: i64, hit: &'a SearchHit },
    /// Net refutation
    Refuted { strength: i64, hit: &'a SearchHit },
    /// Support and refutation too close to call
    Conflicting { support: usize, refute: usize },
}

/// What the citation index says about a cited reference.
#[derive(Debug, Clone, PartialEq)]
enum CitationSignal<'a> {
    /// No citation in the claim, or channel not attempted
    NotApplicable,
    /// Channel failed or timed out; decide on search alone
    Unavailable,
    /// A record matches the reference
    Confirmed(&'a PaperRecord),
    /// No record matches the reference
    NotFound { closest: Option<&'a PaperRecord> },
}

/// Builds verdicts under a [`VerdictPolicy`].
#[derive(Debug, Clone, Default)]
pub struct VerdictAssembler {
    policy: VerdictPolicy,
}

impl VerdictAssembler {
    pub fn new(policy: VerdictPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &VerdictPolicy {
        &self.policy
    }

    /// Produce the verdict for `claim`.
    pub fn assemble(&self, claim: &Claim, evidence: &EvidenceBundle) -> Verdict {
        if !claim.is_fact() {
            return Verdict::opinion(claim);
        }

        if evidence.timed_out {
            return Verdict::suspicious(
                claim,
                "evidence lookup timed out before any source answered",
                None,
                self.suspicious_confidence(self.policy.no_evidence_confidence as i64),
            );
        }

        let search = self.weigh_search(&evidence.search);
        let citation = match &claim.citation {
            Some(cite) => self.match_citation(cite, &evidence.citation),
            None => CitationSignal::NotApplicable,
        };

        let verdict = match citation {
            CitationSignal::Confirmed(record) => self.confirmed_citation(claim, record, &search),
            CitationSignal::NotFound { closest } => self.missing_citation(claim, closest, &search),
            CitationSignal::NotApplicable | CitationSignal::Unavailable => {
                self.from_search(claim, &search)
            }
        };

        self.apply_links(verdict, evidence)
    }

    fn suspicious_confidence(&self, raw: i64) -> i64 {
        raw.clamp(0, self.policy.suspicious_ceiling() as i64)
    }

    fn hit_confidence(&self, hit: &SearchHit) -> i64 {
        clamp_confidence(
            hit.confidence
                .unwrap_or(self.policy.default_hit_confidence as i64),
        ) as i64
    }

    /// Weigh search hits into a single signal.
    ///
    /// Each side's weight is the sum of its hit confidences. When both
    /// sides have weight, the net balance must reach `conflict_margin`,
    /// and the winning side's strength is scaled down by how contested it
    /// was.
    fn weigh_search<'a>(&self, outcome: &'a ChannelOutcome<SearchHit>) -> SearchSignal<'a> {
        let hits = match outcome {
            ChannelOutcome::Skipped => return SearchSignal::Skipped,
            ChannelOutcome::Failed(_) => return SearchSignal::Unavailable,
            ChannelOutcome::TimedOut => return SearchSignal::TimedOut,
            ChannelOutcome::Found(hits) => hits,
        };

        let side = |stance: Stance| -> (Vec<&'a SearchHit>, i64) {
            let members: Vec<&SearchHit> = hits.iter().filter(|h| h.stance == stance).collect();
            let weight = members.iter().map(|h| self.hit_confidence(h)).sum();
            (members, weight)
        };
        let (supports, s_weight) = side(Stance::Supports);
        let (refutes, r_weight) = side(Stance::Refutes);

        if s_weight + r_weight == 0 {
            return SearchSignal::Inconclusive { hits: hits.len() };
        }

        let net = (s_weight - r_weight) as f64 / (s_weight + r_weight) as f64;
        if net.abs() < self.policy.conflict_margin {
            return SearchSignal::Conflicting {
                support: supports.len(),
                refute: refutes.len(),
            };
        }

        let (members, weight) = if net > 0.0 {
            (&supports, s_weight)
        } else {
            (&refutes, r_weight)
        };
        let mean = weight as f64 / members.len() as f64;
        let strength = (mean * (0.5 + 0.5 * net.abs())).round() as i64;
        // Strongest member backs the verdict's source and correction.
        let best = members
            .iter()
            .copied()
            .max_by_key(|h| (self.hit_confidence(h), h.correction.is_some(), h.url.is_some()));

        match best {
            Some(hit) if net > 0.0 => SearchSignal::Supported { strength, hit },
            Some(hit) => SearchSignal::Refuted { strength, hit },
            None => SearchSignal::Inconclusive { hits: hits.len() },
        }
    }

    fn match_citation<'a>(
        &self,
        cite: &CitationRef,
        outcome: &'a ChannelOutcome<PaperRecord>,
    ) -> CitationSignal<'a> {
        let records = match outcome {
            ChannelOutcome::Skipped => return CitationSignal::NotApplicable,
            ChannelOutcome::Failed(_) | ChannelOutcome::TimedOut => {
                return CitationSignal::Unavailable
            }
            ChannelOutcome::Found(records) => records,
        };

        if let Some(record) = records.iter().find(|r| self.record_matches(cite, r)) {
            return CitationSignal::Confirmed(record);
        }

        let closest = cite
            .author
            .as_deref()
            .and_then(|author| records.iter().find(|r| r.has_author(author)));
        CitationSignal::NotFound { closest }
    }

    fn record_matches(&self, cite: &CitationRef, record: &PaperRecord) -> bool {
        if !record.exists {
            return false;
        }
        let author_ok = cite.author.as_deref().map_or(true, |a| record.has_author(a));
        let year_ok = match (cite.year, record.year) {
            (Some(cited), Some(indexed)) => (cited - indexed).abs() <= self.policy.year_tolerance,
            _ => true,
        };
        let title_ok = cite.title.as_deref().map_or(true, |t| {
            let cited = normalize_title(t);
            let indexed = normalize_title(&record.title);
            !cited.is_empty() && (indexed.contains(&cited) || cited.contains(&indexed))
        });
        author_ok && year_ok && title_ok
    }

    fn confirmed_citation(
        &self,
        claim: &Claim,
        record: &PaperRecord,
        search: &SearchSignal,
    ) -> Verdict {
        let found = describe_record(record);

        match search {
            SearchSignal::Refuted { strength, hit }
                if *strength >= self.policy.hallucination_threshold as i64 =>
            {
                if let Some(correction) = correction_from(hit) {
                    return Verdict::hallucination(
                        claim,
                        format!(
                            "{found} exists, but search contradicts the claim: {}",
                            hit.snippet
                        ),
                        correction,
                        hit.url.clone().or_else(|| record.url.clone()),
                        *strength,
                    );
                }
                Verdict::suspicious(
                    claim,
                    format!("{found} exists, but search contradicts the claim"),
                    hit.url.clone(),
                    self.suspicious_confidence(*strength),
                )
            }
            SearchSignal::Supported { strength, .. }
                if *strength >= self.policy.verified_threshold as i64 =>
            {
                let confidence = self.policy.citation_match_confidence.max(*strength as u8) as i64
                    + self.policy.corroboration_bonus as i64;
                Verdict::verified(
                    claim,
                    format!("{found}; web search agrees"),
                    record.url.clone(),
                    confidence,
                )
            }
            _ => Verdict::verified(
                claim,
                found,
                record.url.clone(),
                self.policy.citation_match_confidence as i64,
            ),
        }
    }

    fn missing_citation(
        &self,
        claim: &Claim,
        closest: Option<&PaperRecord>,
        search: &SearchSignal,
    ) -> Verdict {
        let not_found = match closest {
            Some(record) => format!(
                "no indexed paper matches the citation; closest by the same author is {}",
                describe_record(record)
            ),
            None => "cited paper not found in the academic index".to_string(),
        };

        match search {
            SearchSignal::Supported { strength, hit }
                if *strength >= self.policy.verified_threshold as i64 =>
            {
                Verdict::verified(
                    claim,
                    format!("{not_found}, but web search corroborates the claim"),
                    hit.url.clone(),
                    *strength,
                )
            }
            SearchSignal::Refuted { strength, hit } => {
                let correction = correction_from(hit)
                    .unwrap_or_else(|| FABRICATED_CITATION_CORRECTION.to_string());
                Verdict::hallucination(
                    claim,
                    format!("{not_found}; search contradicts the claim"),
                    correction,
                    hit.url.clone(),
                    (*strength).max(self.policy.fabricated_citation_confidence as i64),
                )
            }
            _ => Verdict::hallucination(
                claim,
                format!("{not_found}; the reference is likely fabricated"),
                FABRICATED_CITATION_CORRECTION,
                None,
                self.policy.fabricated_citation_confidence as i64,
            ),
        }
    }

    fn from_search(&self, claim: &Claim, search: &SearchSignal) -> Verdict {
        let no_evidence = self.suspicious_confidence(self.policy.no_evidence_confidence as i64);

        match search {
            SearchSignal::Supported { strength, hit } => {
                if *strength >= self.policy.verified_threshold as i64 {
                    Verdict::verified(claim, support_reasoning(hit), hit.url.clone(), *strength)
                } else {
                    Verdict::suspicious(
                        claim,
                        format!("weak support only: {}", hit.snippet),
                        hit.url.clone(),
                        self.suspicious_confidence(*strength),
                    )
                }
            }
            SearchSignal::Refuted { strength, hit } => {
                let firm = *strength >= self.policy.hallucination_threshold as i64;
                match correction_from(hit) {
                    Some(correction) if firm => Verdict::hallucination(
                        claim,
                        format!("contradicted by search: {}", hit.snippet),
                        correction,
                        hit.url.clone(),
                        *strength,
                    ),
                    Some(_) => Verdict::suspicious(
                        claim,
                        format!("weak contradiction only: {}", hit.snippet),
                        hit.url.clone(),
                        self.suspicious_confidence(*strength),
                    ),
                    None => Verdict::suspicious(
                        claim,
                        "contradicted by search, but no corrected statement is available",
                        hit.url.clone(),
                        self.suspicious_confidence(*strength),
                    ),
                }
            }
            SearchSignal::Conflicting { support, refute } => Verdict::suspicious(
                claim,
                format!("sources disagree: {support} supporting, {refute} contradicting"),
                None,
                self.suspicious_confidence(self.policy.no_evidence_confidence as i64 + 10),
            ),
            SearchSignal::Inconclusive { hits: 0 } => {
                Verdict::suspicious(claim, "no evidence found", None, no_evidence)
            }
            SearchSignal::Inconclusive { hits } => Verdict::suspicious(
                claim,
                format!("{hits} results found, none conclusive"),
                None,
                no_evidence,
            ),
            // Provider errors stay in the logs; they can carry request details.
            SearchSignal::Unavailable => Verdict::suspicious(
                claim,
                "could not be checked: the search provider is unavailable",
                None,
                0,
            ),
            SearchSignal::TimedOut => Verdict::suspicious(
                claim,
                "search timed out before answering",
                None,
                no_evidence,
            ),
            SearchSignal::Skipped => {
                Verdict::suspicious(claim, "no evidence sources consulted", None, 0)
            }
        }
    }

    /// Downgrade a VERIFIED verdict whose own link is broken.
    fn apply_links(&self, verdict: Verdict, evidence: &EvidenceBundle) -> Verdict {
        if verdict.status != ClaimStatus::Verified {
            return verdict;
        }
        let broken: Vec<String> = evidence
            .broken_links()
            .map(|l| format!("{} ({})", l.url, l.describe_failure()))
            .collect();
        if broken.is_empty() {
            return verdict;
        }

        Verdict {
            status: ClaimStatus::Suspicious,
            reasoning: format!(
                "{}; but the cited link is broken: {}",
                verdict.reasoning,
                broken.join(", ")
            ),
            confidence_score: clamp_confidence(
                self.suspicious_confidence(verdict.confidence_score as i64),
            ),
            ..verdict
        }
    }
}

fn correction_from(hit: &SearchHit) -> Option<String> {
    hit.correction
        .clone()
        .or_else(|| Some(hit.snippet.clone()))
        .filter(|c| !c.trim().is_empty())
}

fn support_reasoning(hit: &SearchHit) -> String {
    match &hit.title {
        Some(title) => format!("supported by {title}: {}", hit.snippet),
        None => format!("supported by search: {}", hit.snippet),
    }
}

fn describe_record(record: &PaperRecord) -> String {
    let year = record
        .year
        .map(|y| y.to_string())
        .unwrap_or_else(|| "n.d.".to_string());
    let authors = record
        .authors
        .iter()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    format!("found '{}' ({}) by {}", record.title, year, authors)
}

fn normalize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
