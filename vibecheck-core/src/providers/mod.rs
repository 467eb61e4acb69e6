//! Evidence providers.
//!
//! Three capabilities feed the verifier, each behind its own trait so tests
//! and alternative backends can be swapped in:
//!
//! - [`SearchProvider`]: grounded web search judged against a claim
//! - [`CitationIndex`]: academic paper lookup
//! - [`LinkChecker`]: reachability of URLs mentioned in a claim
//! - [`PageFetcher`]: text of pages cited in a claim, handed to search
//!
//! Providers are called once per claim and must be safe to call
//! concurrently. A provider error is local to one claim and one channel.

#[cfg(feature = "gemini")]
mod gemini;
mod http;
mod links;
#[cfg(test)]
pub(crate) mod mock;
mod pages;
mod scholar;
mod types;

use async_trait::async_trait;

use crate::error::Result;

#[cfg(feature = "gemini")]
pub use gemini::GeminiSearch;
pub use http::ProviderConfig;
pub use links::HttpLinkChecker;
pub use pages::HttpPageFetcher;
pub use scholar::SemanticScholar;
pub use types::{LinkStatus, PageContent, PaperRecord, SearchHit, Stance};

/// Web search judged against a claim.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search for evidence about `query`.
    ///
    /// An empty result is a successful lookup that found nothing.
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;

    /// Search with the text of pages the claim cites as extra context.
    ///
    /// Providers that cannot use page text fall back to [`search`](Self::search).
    async fn search_with_pages(
        &self,
        query: &str,
        _pages: &[PageContent],
    ) -> Result<Vec<SearchHit>> {
        self.search(query).await
    }

    /// Provider name, for logs.
    fn name(&self) -> &str;
}

/// Academic citation index.
#[async_trait]
pub trait CitationIndex: Send + Sync {
    /// Look up papers by author surname and/or title words.
    ///
    /// `year` is a hint; callers still check each record's year.
    async fn lookup_citation(&self, query: &str, year: Option<i32>) -> Result<Vec<PaperRecord>>;

    /// Index name, for logs.
    fn name(&self) -> &str;
}

/// Fetches the readable text of a cited page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<PageContent>;
}

/// URL reachability checker. Never fails; problems are reported in the status.
#[async_trait]
pub trait LinkChecker: Send + Sync {
    async fn check(&self, url: &str) -> LinkStatus;
}
