//! Cited page fetching.
//!
//! Pages are reduced to plain text so a claim can be judged against what
//! its own link says.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::{Captures, Regex};
use reqwest::Client;

use super::http::{build_http_client, ProviderConfig};
use super::links::{describe_request_error, parse_link, USER_AGENT};
use super::types::PageContent;
use super::PageFetcher;
use crate::error::{Error, Result};

const CHANNEL: &str = "page";

static BOILERPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<nav\b[^>]*>.*?</nav\s*>|<footer\b[^>]*>.*?</footer\s*>|<header\b[^>]*>.*?</header\s*>",
    )
    .expect("boilerplate pattern is valid")
});

static TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<title\b[^>]*>(?P<title>.*?)</title\s*>").expect("title pattern is valid")
});

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#(?P<dec>\d{1,7})|#[xX](?P<hex>[0-9a-fA-F]{1,6})|(?P<name>[a-zA-Z]+));")
        .expect("entity pattern is valid")
});

/// Fetches cited pages over HTTP and strips them to text.
pub struct HttpPageFetcher {
    http: Client,
    max_chars: usize,
}

impl HttpPageFetcher {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            http: build_http_client(config.timeout_secs)?,
            max_chars: 5_000,
        })
    }

    /// Longest text kept per page.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }
}

fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let decoded = if let Some(dec) = caps.name("dec") {
                dec.as_str().parse().ok().and_then(char::from_u32)
            } else if let Some(hex) = caps.name("hex") {
                u32::from_str_radix(hex.as_str(), 16)
                    .ok()
                    .and_then(char::from_u32)
            } else {
                match caps.name("name").map(|m| m.as_str()) {
                    Some("amp") => Some('&'),
                    Some("lt") => Some('<'),
                    Some("gt") => Some('>'),
                    Some("quot") => Some('"'),
                    Some("apos") => Some('\''),
                    Some("nbsp") => Some(' '),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), |c| c.to_string())
        })
        .into_owned()
}

fn collapse(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}

/// Reduce an HTML document to its title and visible text.
pub(crate) fn html_to_text(html: &str) -> (Option<String>, String) {
    let html = BOILERPLATE.replace_all(html, "");
    let title = TITLE
        .captures(&html)
        .map(|caps| collapse(&decode_entities(&caps["title"])))
        .filter(|t| !t.is_empty());
    let text = collapse(&decode_entities(&TAG.replace_all(&html, " ")));
    (title, text)
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, raw: &str) -> Result<PageContent> {
        let url = parse_link(raw).map_err(|reason| Error::provider(CHANNEL, reason))?;

        let response = self
            .http
            .get(url)
            .header("user-agent", USER_AGENT)
            .header(
                "accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .send()
            .await
            .map_err(|e| Error::provider(CHANNEL, describe_request_error(&e)))?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(Error::provider(CHANNEL, format!("HTTP {}", status.as_u16())));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        let body = response
            .text()
            .await
            .map_err(|e| Error::provider(CHANNEL, describe_request_error(&e)))?;

        if content_type.contains("text/html") || content_type.contains("application/xhtml") {
            let (title, text) = html_to_text(&body);
            let mut page = PageContent::new(raw, truncate(&text, self.max_chars));
            page.title = title;
            Ok(page)
        } else if content_type.contains("application/json") || content_type.contains("text/plain")
        {
            Ok(PageContent::new(raw, truncate(body.trim(), self.max_chars)))
        } else {
            Err(Error::provider(
                CHANNEL,
                format!("Unsupported content type: {}", content_type),
            ))
        }
    }
}
