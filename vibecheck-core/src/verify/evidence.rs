//! Evidence resolution for a single claim.
//!
//! The resolver asks every applicable channel about one claim
//! concurrently. Channel failures and timeouts are recorded in the bundle
//! instead of being raised, so one flaky or slow provider degrades a
//! verdict rather than aborting the request or discarding what the other
//! channels found.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::types::{CitationRef, Claim};
use crate::error::{Error, Result};
use crate::providers::{
    CitationIndex, LinkChecker, LinkStatus, PageContent, PageFetcher, PaperRecord, SearchHit,
    SearchProvider,
};

const STOPWORDS: &[&str] = &[
    "about", "after", "also", "been", "from", "have", "into", "that", "their", "them", "then",
    "there", "these", "they", "this", "were", "what", "when", "which", "with", "would",
];

/// Result of asking one channel about one claim.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelOutcome<T> {
    /// Channel not applicable to this claim
    Skipped,
    /// Lookup succeeded; may be empty
    Found(Vec<T>),
    /// Lookup failed
    Failed(String),
    /// Lookup did not answer within the claim's budget
    TimedOut,
}

impl<T> ChannelOutcome<T> {
    fn from_result(result: Result<Vec<T>>) -> Self {
        match result {
            Ok(items) => Self::Found(items),
            Err(e) => Self::Failed(e.to_string()),
        }
    }

    pub fn attempted(&self) -> bool {
        !matches!(self, Self::Skipped)
    }

    /// Hard failure; a timeout is not one.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }

    /// Items found, empty unless the lookup succeeded.
    pub fn items(&self) -> &[T] {
        match self {
            Self::Found(items) => items,
            _ => &[],
        }
    }
}

/// Everything gathered about one claim.
#[derive(Debug, Clone)]
pub struct EvidenceBundle {
    pub search: ChannelOutcome<SearchHit>,
    pub citation: ChannelOutcome<PaperRecord>,
    /// Status of each URL mentioned in the claim
    pub links: Vec<LinkStatus>,
    /// Text of cited pages that could be fetched, as handed to search
    pub pages: Vec<PageContent>,
    /// Every attempted channel ran out of time
    pub timed_out: bool,
    pub retrieved_at: DateTime<Utc>,
}

impl EvidenceBundle {
    /// Bundle with nothing attempted.
    pub fn empty() -> Self {
        Self {
            search: ChannelOutcome::Skipped,
            citation: ChannelOutcome::Skipped,
            links: Vec::new(),
            pages: Vec::new(),
            timed_out: false,
            retrieved_at: Utc::now(),
        }
    }

    /// Bundle for a claim whose search lookup did not finish in time.
    pub fn timed_out() -> Self {
        Self {
            search: ChannelOutcome::TimedOut,
            timed_out: true,
            ..Self::empty()
        }
    }

    /// True when at least one evidence channel was attempted and every
    /// attempted one failed. Timeouts and link checks do not count.
    pub fn all_channels_failed(&self) -> bool {
        let attempted = [self.search.attempted(), self.citation.attempted()];
        let failed = [self.search.is_failed(), self.citation.is_failed()];
        attempted.iter().any(|a| *a)
            && attempted
                .iter()
                .zip(failed.iter())
                .all(|(a, f)| !*a || *f)
    }

    /// Links that are malformed or unreachable.
    pub fn broken_links(&self) -> impl Iterator<Item = &LinkStatus> {
        self.links.iter().filter(|l| l.is_broken())
    }
}

/// Run a channel lookup, giving up at `deadline`.
async fn until<T>(
    deadline: Option<Instant>,
    lookup: impl Future<Output = Result<Vec<T>>>,
) -> ChannelOutcome<T> {
    match deadline {
        Some(deadline) => match tokio::time::timeout_at(deadline, lookup).await {
            Ok(result) => ChannelOutcome::from_result(result),
            Err(_) => ChannelOutcome::TimedOut,
        },
        None => ChannelOutcome::from_result(lookup.await),
    }
}

/// Gathers evidence for claims from the configured providers.
#[derive(Clone)]
pub struct EvidenceResolver {
    search: Arc<dyn SearchProvider>,
    citations: Arc<dyn CitationIndex>,
    links: Option<Arc<dyn LinkChecker>>,
    pages: Option<Arc<dyn PageFetcher>>,
}

impl EvidenceResolver {
    pub fn new(search: Arc<dyn SearchProvider>, citations: Arc<dyn CitationIndex>) -> Self {
        Self {
            search,
            citations,
            links: None,
            pages: None,
        }
    }

    /// Also check URLs mentioned in claims.
    pub fn with_link_checker(mut self, checker: Arc<dyn LinkChecker>) -> Self {
        self.links = Some(checker);
        self
    }

    /// Fetch pages cited in claims and hand their text to search.
    pub fn with_page_fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.pages = Some(fetcher);
        self
    }

    /// Direct access to the citation index, for standalone lookups.
    pub fn citation_index(&self) -> &Arc<dyn CitationIndex> {
        &self.citations
    }

    /// Query every applicable channel for `claim` concurrently, with no
    /// time limit.
    ///
    /// Opinion claims are not looked up. The citation channel runs only
    /// for claims carrying a citation, the link and page channels only for
    /// claims mentioning URLs.
    pub async fn resolve(&self, claim: &Claim) -> EvidenceBundle {
        self.gather(claim, None).await
    }

    /// [`resolve`](Self::resolve) under a time budget.
    ///
    /// Each channel gets the whole budget on its own. A channel that runs
    /// out of time is recorded as timed out and dropped; the others keep
    /// their answers. Cited pages get half the budget so search still has
    /// time to use them.
    pub async fn resolve_within(&self, claim: &Claim, budget: Duration) -> EvidenceBundle {
        self.gather(claim, Some(budget)).await
    }

    #[instrument(skip(self, claim), fields(claim_id = %claim.id))]
    async fn gather(&self, claim: &Claim, budget: Option<Duration>) -> EvidenceBundle {
        if !claim.is_fact() {
            return EvidenceBundle::empty();
        }
        let deadline = budget.map(|b| Instant::now() + b);

        let search = async {
            let pages = self.fetch_pages(claim, budget.map(|b| b / 2)).await;
            let outcome = until(
                deadline,
                self.search.search_with_pages(&claim.original_text, &pages),
            )
            .await;
            match &outcome {
                ChannelOutcome::Failed(reason) => {
                    warn!(provider = self.search.name(), %reason, "Search lookup failed")
                }
                ChannelOutcome::TimedOut => warn!(
                    provider = self.search.name(),
                    claim = %claim.preview(),
                    "Search lookup timed out"
                ),
                _ => {}
            }
            (outcome, pages)
        };

        let citation = async {
            let Some(cite) = &claim.citation else {
                return ChannelOutcome::Skipped;
            };
            let query = citation_query(claim, cite);
            let lookup = self.citations.lookup_citation(&query, cite.year);
            let outcome = until(deadline, lookup).await;
            match &outcome {
                ChannelOutcome::Failed(reason) => {
                    warn!(index = self.citations.name(), %reason, "Citation lookup failed")
                }
                ChannelOutcome::TimedOut => warn!(
                    index = self.citations.name(),
                    claim = %claim.preview(),
                    "Citation lookup timed out"
                ),
                _ => {}
            }
            outcome
        };

        let links = async {
            let Some(checker) = &self.links else {
                return Vec::new();
            };
            let checks = claim.urls.iter().map(|url| async move {
                match deadline {
                    Some(deadline) => {
                        let status = tokio::time::timeout_at(deadline, checker.check(url)).await;
                        if status.is_err() {
                            debug!(%url, "Link check timed out");
                        }
                        status.ok()
                    }
                    None => Some(checker.check(url).await),
                }
            });
            join_all(checks)
                .await
                .into_iter()
                .flatten()
                .collect::<Vec<LinkStatus>>()
        };

        let ((search, pages), citation, links) = futures::join!(search, citation, links);

        let channels = [
            (search.attempted(), search.is_timed_out()),
            (citation.attempted(), citation.is_timed_out()),
        ];
        let all_timed_out = channels.iter().any(|(attempted, _)| *attempted)
            && channels
                .iter()
                .all(|(attempted, timed_out)| !*attempted || *timed_out);

        debug!(
            search_hits = search.items().len(),
            citation_records = citation.items().len(),
            links = links.len(),
            pages = pages.len(),
            timed_out = all_timed_out,
            "Evidence resolved"
        );

        EvidenceBundle {
            search,
            citation,
            links,
            pages,
            timed_out: all_timed_out,
            retrieved_at: Utc::now(),
        }
    }

    /// Fetch cited pages; pages that fail or run out of time are left out.
    async fn fetch_pages(&self, claim: &Claim, budget: Option<Duration>) -> Vec<PageContent> {
        let Some(fetcher) = &self.pages else {
            return Vec::new();
        };
        let fetches = claim.urls.iter().map(|url| async move {
            let fetched = match budget {
                Some(budget) => tokio::time::timeout(budget, fetcher.fetch(url))
                    .await
                    .unwrap_or_else(|_| Err(Error::timeout(budget.as_millis() as u64))),
                None => fetcher.fetch(url).await,
            };
            match fetched {
                Ok(page) => Some(page),
                Err(e) => {
                    warn!(%url, error = %e, "Could not fetch cited page");
                    None
                }
            }
        });
        join_all(fetches).await.into_iter().flatten().collect()
    }
}

/// Citation index query for a claim.
///
/// A quoted title is specific enough on its own. Otherwise the author is
/// combined with topic words from the claim, since a bare surname matches
/// far too many papers.
pub(crate) fn citation_query(claim: &Claim, cite: &CitationRef) -> String {
    if cite.title.is_some() {
        return cite.query();
    }

    let author = cite.author.as_deref().unwrap_or_default();
    let topic: Vec<&str> = claim
        .original_text
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|w| w.chars().count() > 3)
        .filter(|w| w.chars().next().is_some_and(char::is_alphabetic))
        .filter(|w| *w != author)
        .filter(|w| !STOPWORDS.contains(&w.to_lowercase().as_str()))
        .take(6)
        .collect();

    if topic.is_empty() {
        author.to_string()
    } else {
        format!("{} {}", author, topic.join(" "))
    }
}
