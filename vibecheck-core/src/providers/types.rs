//! Evidence types returned by providers.

use serde::{Deserialize, Serialize};

/// How a search result relates to the claim it was retrieved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stance {
    Supports,
    Refutes,
    Unclear,
}

impl Stance {
    /// Parse a provider label, defaulting to `Unclear`.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_uppercase().as_str() {
            "SUPPORTS" | "SUPPORTED" | "SUPPORT" | "TRUE" | "VERIFIED" => Self::Supports,
            "REFUTES" | "REFUTED" | "CONTRADICTS" | "CONTRADICTED" | "FALSE" => Self::Refutes,
            _ => Self::Unclear,
        }
    }
}

impl std::fmt::Display for Stance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Supports => write!(f, "supports"),
            Self::Refutes => write!(f, "refutes"),
            Self::Unclear => write!(f, "unclear"),
        }
    }
}

/// One grounded search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Page title
    pub title: Option<String>,
    /// Source locator; absent when the provider could not ground the answer
    pub url: Option<String>,
    /// Text the judgement rests on
    pub snippet: String,
    /// Relation to the claim
    pub stance: Stance,
    /// Provider's confidence estimate, nominally 0-100 but not trusted to be
    pub confidence: Option<i64>,
    /// Evidence-backed replacement text for a refuted claim
    pub correction: Option<String>,
}

impl SearchHit {
    pub fn new(snippet: impl Into<String>, stance: Stance) -> Self {
        Self {
            title: None,
            url: None,
            snippet: snippet.into(),
            stance,
            confidence: None,
            correction: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_confidence(mut self, confidence: i64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_correction(mut self, correction: impl Into<String>) -> Self {
        self.correction = Some(correction.into());
        self
    }
}

/// Paper metadata from a citation index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub venue: Option<String>,
    pub url: Option<String>,
    pub citation_count: Option<u64>,
    /// Whether the index holds this paper
    pub exists: bool,
}

impl PaperRecord {
    pub fn new(title: impl Into<String>, authors: Vec<String>, year: Option<i32>) -> Self {
        Self {
            title: title.into(),
            authors,
            year,
            venue: None,
            url: None,
            citation_count: None,
            exists: true,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_venue(mut self, venue: impl Into<String>) -> Self {
        self.venue = Some(venue.into());
        self
    }

    /// Case-insensitive check that some author name contains `name`.
    pub fn has_author(&self, name: &str) -> bool {
        let needle = name.to_lowercase();
        self.authors
            .iter()
            .any(|a| a.to_lowercase().contains(&needle))
    }
}

/// Readable text of a page cited in a claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    pub url: String,
    pub title: Option<String>,
    /// Tag-free text, truncated by the fetcher
    pub text: String,
}

impl PageContent {
    pub fn new(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            text: text.into(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Reachability of a URL mentioned in a claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStatus {
    pub url: String,
    /// Well-formed http(s) URL with a host
    pub is_valid: bool,
    /// Answered with a status below 400
    pub is_accessible: bool,
    pub status_code: Option<u16>,
    pub redirect_url: Option<String>,
    pub error: Option<String>,
}

impl LinkStatus {
    pub fn invalid(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            is_valid: false,
            is_accessible: false,
            status_code: None,
            redirect_url: None,
            error: Some(error.into()),
        }
    }

    pub fn accessible(url: impl Into<String>, status_code: u16) -> Self {
        Self {
            url: url.into(),
            is_valid: true,
            is_accessible: true,
            status_code: Some(status_code),
            redirect_url: None,
            error: None,
        }
    }

    pub fn unreachable(
        url: impl Into<String>,
        status_code: Option<u16>,
        error: Option<String>,
    ) -> Self {
        Self {
            url: url.into(),
            is_valid: true,
            is_accessible: false,
            status_code,
            redirect_url: None,
            error,
        }
    }

    pub fn is_broken(&self) -> bool {
        !self.is_valid || !self.is_accessible
    }

    /// Short human-readable reason the link is broken.
    pub fn describe_failure(&self) -> String {
        match (&self.error, self.status_code) {
            (Some(e), _) => e.clone(),
            (None, Some(code)) => format!("HTTP {}", code),
            (None, None) => "not accessible".to_string(),
        }
    }
}
