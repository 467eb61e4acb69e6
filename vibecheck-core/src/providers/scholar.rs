//! Semantic Scholar citation index.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::http::{build_http_client, ProviderConfig};
use super::types::PaperRecord;
use super::CitationIndex;
use crate::error::{Error, Result};

const CHANNEL: &str = "citation";

/// Paper search against the Semantic Scholar Graph API.
pub struct SemanticScholar {
    config: ProviderConfig,
    http: Client,
    limit: usize,
}

impl SemanticScholar {
    const DEFAULT_BASE_URL: &'static str = "https://api.semanticscholar.org";
    const FIELDS: &'static str = "title,authors,year,venue,url,citationCount";

    pub fn new(config: ProviderConfig) -> Result<Self> {
        let http = build_http_client(config.timeout_secs)?;
        Ok(Self {
            config,
            http,
            limit: 5,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ProviderConfig::scholar_from_env())
    }

    /// Number of records requested per lookup.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(Self::DEFAULT_BASE_URL)
    }
}

/// Strip citation punctuation that hurts keyword search.
pub(crate) fn clean_query(query: &str) -> String {
    query
        .replace("et al.", " ")
        .replace(['(', ')'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<ScholarPaper>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScholarPaper {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<ScholarAuthor>,
    year: Option<i32>,
    venue: Option<String>,
    url: Option<String>,
    citation_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ScholarAuthor {
    name: Option<String>,
}

/// Parse a search body into records, records matching `year` first.
fn records_from_body(body: &str, year: Option<i32>) -> Result<Vec<PaperRecord>> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|e| Error::provider(CHANNEL, format!("Failed to parse response: {}", e)))?;

    let mut records: Vec<PaperRecord> = response
        .data
        .into_iter()
        .filter_map(|paper| {
            let title = paper.title.filter(|t| !t.trim().is_empty())?;
            Some(PaperRecord {
                title,
                authors: paper.authors.into_iter().filter_map(|a| a.name).collect(),
                year: paper.year,
                venue: paper.venue.filter(|v| !v.is_empty()),
                url: paper.url,
                citation_count: paper.citation_count,
                exists: true,
            })
        })
        .collect();

    if let Some(year) = year {
        // Stable sort keeps relevance order within each group.
        records.sort_by_key(|r| r.year != Some(year));
    }
    Ok(records)
}

#[async_trait]
impl CitationIndex for SemanticScholar {
    #[instrument(skip(self))]
    async fn lookup_citation(&self, query: &str, year: Option<i32>) -> Result<Vec<PaperRecord>> {
        let cleaned = clean_query(query);
        if cleaned.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/graph/v1/paper/search", self.base_url());
        let limit = self.limit.to_string();
        let mut request = self.http.get(&url).query(&[
            ("query", cleaned.as_str()),
            ("fields", Self::FIELDS),
            ("limit", limit.as_str()),
        ]);
        if !self.config.api_key.is_empty() {
            request = request.header("x-api-key", &self.config.api_key);
        }

        let response = request.send().await.map_err(|e| {
            Error::provider(CHANNEL, format!("HTTP request failed: {}", e.without_url()))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            Error::provider(CHANNEL, format!("Failed to read response: {}", e.without_url()))
        })?;

        if !status.is_success() {
            return Err(Error::provider(
                CHANNEL,
                format!("Semantic Scholar error ({}): {}", status, body),
            ));
        }

        let records = records_from_body(&body, year)?;
        debug!(records = records.len(), "Citation lookup complete");
        Ok(records)
    }

    fn name(&self) -> &str {
        "semantic-scholar"
    }
}
