//! Gemini-backed grounded search.
//!
//! One `generateContent` call per claim with the `google_search` tool
//! enabled. The model is asked for a JSON judgement; grounding chunks
//! from the response become the hit URLs.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::http::{build_http_client, ProviderConfig};
use super::types::{PageContent, SearchHit, Stance};
use super::SearchProvider;
use crate::error::{Error, Result};

const CHANNEL: &str = "search";

/// Grounded search through the Gemini API.
pub struct GeminiSearch {
    config: ProviderConfig,
    http: Client,
}

impl GeminiSearch {
    const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com";
    const DEFAULT_MODEL: &'static str = "gemini-2.5-flash";

    pub fn new(config: ProviderConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::Config("Gemini API key is empty".to_string()));
        }
        let http = build_http_client(config.timeout_secs)?;
        Ok(Self { config, http })
    }

    /// Create from `GEMINI_API_KEY` / `GOOGLE_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let config = ProviderConfig::gemini_from_env().ok_or_else(|| {
            Error::Config("set GEMINI_API_KEY or GOOGLE_API_KEY".to_string())
        })?;
        Self::new(config)
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(Self::DEFAULT_BASE_URL)
    }

    fn model(&self) -> &str {
        self.config
            .default_model
            .as_deref()
            .unwrap_or(Self::DEFAULT_MODEL)
    }
}

/// Characters of each cited page included in the prompt.
const PAGE_PREVIEW_CHARS: usize = 2_000;

fn judgement_prompt(claim: &str, pages: &[PageContent]) -> String {
    let mut page_context = String::new();
    if !pages.is_empty() {
        page_context.push_str("\nCONTENT OF PAGES CITED IN THE STATEMENT:\n");
        for page in pages {
            let title = page
                .title
                .as_deref()
                .map(|t| format!(" ({})", t))
                .unwrap_or_default();
            let preview: String = page.text.chars().take(PAGE_PREVIEW_CHARS).collect();
            page_context.push_str(&format!("\n--- {}{} ---\n{}\n", page.url, title, preview));
        }
        page_context
            .push_str("\nJudge the statement against these pages as well as search results.\n");
    }

    format!(
        r#"Use Google Search to check whether the following statement is factually accurate.

STATEMENT:
{claim}
{page_context}
Reply with a single JSON object and nothing else:
{{
  "stance": "SUPPORTS" | "REFUTES" | "UNCLEAR",
  "confidence": 0-100,
  "snippet": "the evidence your judgement rests on",
  "correction": "for REFUTES only: the statement rewritten to be accurate, otherwise null"
}}"#
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    tools: Vec<GeminiTool>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiTool {
    google_search: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Judgement {
    stance: String,
    confidence: Option<f64>,
    snippet: Option<String>,
    correction: Option<String>,
}

/// Pull the JSON object out of a model reply, fenced or not.
fn extract_json(text: &str) -> Option<&str> {
    let body = if let Some((_, rest)) = text.split_once("```json") {
        rest.split("```").next().unwrap_or(rest)
    } else if let Some((_, rest)) = text.split_once("```") {
        rest.split("```").next().unwrap_or(rest)
    } else {
        text
    };
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (start < end).then(|| &body[start..=end])
}

fn parse_judgement(text: &str) -> Option<Judgement> {
    extract_json(text).and_then(|json| serde_json::from_str(json).ok())
}

/// Turn a raw `generateContent` body into hits.
fn hits_from_body(body: &str) -> Result<Vec<SearchHit>> {
    let response: GeminiResponse = serde_json::from_str(body)
        .map_err(|e| Error::provider(CHANNEL, format!("Failed to parse response: {}", e)))?;

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::provider(CHANNEL, "No candidates in response"))?;

    let text = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let sources: Vec<WebSource> = candidate
        .grounding_metadata
        .map(|m| m.grounding_chunks)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|chunk| chunk.web)
        .filter(|web| web.uri.is_some())
        .collect();

    let Some(judgement) = parse_judgement(&text) else {
        // Unstructured reply: keep it as neutral evidence rather than guessing a stance.
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        debug!("Unstructured search reply, treating as unclear");
        let snippet: String = text.trim().chars().take(300).collect();
        return Ok(vec![SearchHit::new(snippet, Stance::Unclear)]);
    };

    let stance = Stance::parse(&judgement.stance);
    let confidence = judgement.confidence.map(|c| c.round() as i64);
    let snippet = judgement.snippet.unwrap_or_default();
    let correction = judgement
        .correction
        .filter(|c| stance == Stance::Refutes && !c.trim().is_empty());

    let base = SearchHit {
        title: None,
        url: None,
        snippet,
        stance,
        confidence,
        correction,
    };

    if sources.is_empty() {
        return Ok(vec![base]);
    }

    // One hit for the first grounding source carries the judgement; the
    // rest are recorded as unclear so they do not count twice.
    Ok(sources
        .into_iter()
        .enumerate()
        .map(|(i, web)| {
            let mut hit = if i == 0 {
                base.clone()
            } else {
                SearchHit::new(base.snippet.clone(), Stance::Unclear)
            };
            hit.url = web.uri;
            hit.title = web.title;
            hit
        })
        .collect())
}

#[async_trait]
impl SearchProvider for GeminiSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.search_with_pages(query, &[]).await
    }

    #[instrument(skip(self, query, pages), fields(model = self.model(), pages = pages.len()))]
    async fn search_with_pages(
        &self,
        query: &str,
        pages: &[PageContent],
    ) -> Result<Vec<SearchHit>> {
        let api_request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: judgement_prompt(query, pages),
                }],
            }],
            tools: vec![GeminiTool {
                google_search: serde_json::json!({}),
            }],
            generation_config: GeminiGenerationConfig { temperature: 0.0 },
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url(),
            self.model()
        );

        // The key travels in a header so it never shows up in a request URL.
        let response = self
            .http
            .post(&url)
            .header("content-type", "application/json")
            .header("x-goog-api-key", &self.config.api_key)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| {
                Error::provider(CHANNEL, format!("HTTP request failed: {}", e.without_url()))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            Error::provider(CHANNEL, format!("Failed to read response: {}", e.without_url()))
        })?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<GeminiError>(&body) {
                return Err(Error::provider(
                    CHANNEL,
                    format!("Gemini API error: {}", error.error.message),
                ));
            }
            return Err(Error::provider(
                CHANNEL,
                format!("Gemini API error ({}): {}", status, body),
            ));
        }

        hits_from_body(&body)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn body(text: &str, chunks: serde_json::Value) -> String {
        serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "groundingMetadata": {"groundingChunks": chunks}
            }]
        })
        .to_string()
    }

    #[test]
    fn test_extract_json_fenced() {
        let text = "Here you go:\n```json\n{\"stance\": \"SUPPORTS\"}\n```\nDone.";
        assert_eq!(extract_json(text), Some("{\"stance\": \"SUPPORTS\"}"));
        assert_eq!(extract_json("no json here"), None);
    }

    #[test]
    fn test_refuting_reply_with_grounding() {
        let reply = r#"```json
{"stance": "REFUTES", "confidence": 95, "snippet": "The Moon is made of rock.",
 "correction": "The moon is made of rock, as confirmed by NASA."}
```"#;
        let chunks = serde_json::json!([
            {"web": {"uri": "https://nasa.gov/moon", "title": "nasa.gov"}},
            {"web": {"uri": "https://en.wikipedia.org/wiki/Moon", "title": "wikipedia.org"}}
        ]);

        let hits = hits_from_body(&body(reply, chunks)).unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].stance, Stance::Refutes);
        assert_eq!(hits[0].confidence, Some(95));
        assert_eq!(hits[0].url.as_deref(), Some("https://nasa.gov/moon"));
        assert_eq!(
            hits[0].correction.as_deref(),
            Some("The moon is made of rock, as confirmed by NASA.")
        );
        assert_eq!(hits[1].stance, Stance::Unclear);
        assert_eq!(hits[1].correction, None);
    }

    #[test]
    fn test_correction_dropped_for_support() {
        let reply =
            r#"{"stance": "SUPPORTS", "confidence": 88, "snippet": "yes", "correction": "x"}"#;
        let hits = hits_from_body(&body(reply, serde_json::json!([]))).unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].stance, Stance::Supports);
        assert_eq!(hits[0].correction, None);
        assert_eq!(hits[0].url, None);
    }

    #[test]
    fn test_unstructured_reply_is_unclear() {
        let hits = hits_from_body(&body("I could not decide.", serde_json::json!([]))).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].stance, Stance::Unclear);
    }

    #[test]
    fn test_no_candidates_is_error() {
        let err = hits_from_body(r#"{"candidates": []}"#).unwrap_err();
        assert!(matches!(err, Error::EvidenceProvider { .. }));
    }

    #[test]
    fn test_new_rejects_empty_key() {
        assert!(GeminiSearch::new(ProviderConfig::new("  ")).is_err());
    }

    #[test]
    fn test_prompt_includes_cited_pages() {
        let pages = vec![PageContent::new("https://nasa.gov/moon", "The Moon is rock.")
            .with_title("Moon facts")];

        let prompt = judgement_prompt("The moon is cheese.", &pages);
        assert!(prompt.contains("--- https://nasa.gov/moon (Moon facts) ---"));
        assert!(prompt.contains("The Moon is rock."));

        let bare = judgement_prompt("The moon is cheese.", &[]);
        assert!(!bare.contains("CONTENT OF PAGES"));
    }

    #[tokio::test]
    async fn test_transport_error_does_not_expose_key() {
        let config = ProviderConfig::new("SECRET-KEY-123")
            .with_base_url("http://127.0.0.1:1")
            .with_timeout(2);
        let search = GeminiSearch::new(config).unwrap();

        let err = search.search("Paris is the capital of France.").await.unwrap_err();
        let message = err.to_string();

        assert!(matches!(err, Error::EvidenceProvider { .. }));
        assert!(!message.contains("SECRET-KEY-123"));
        assert!(!message.contains("127.0.0.1"));
    }
}
