//! Claim extraction from free-form text.
//!
//! Splits text into sentence-like units and tags each one as a fact or an
//! opinion. Every claim keeps the exact byte span it came from: the text is
//! never normalized, because correction merging later searches for it
//! verbatim.

use regex::Regex;
use std::sync::LazyLock;

use super::types::{CitationRef, Claim, ClaimType};
use crate::error::{Error, Result};

static AUTHOR_ET_AL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?P<author>[A-Z][A-Za-z'’\-]+)\s+et\s+al\.?,?\s*(?:\(\s*(?P<paren>\d{4})\s*\)|(?:in\s+)?(?P<bare>\d{4}))?",
    )
    .expect("et al. pattern is valid")
});

static PAREN_AUTHOR_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\((?P<author>[A-Z][A-Za-z'’\-]+)(?:\s+(?:and|&)\s+[A-Z][A-Za-z'’\-]+)?,\s*(?P<year>\d{4})\)",
    )
    .expect("parenthetical citation pattern is valid")
});

static AUTHOR_PAREN_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<author>[A-Z][A-Za-z'’\-]+)\s+\((?P<year>\d{4})\)")
        .expect("narrative citation pattern is valid")
});

static QUOTED_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["“](?P<title>[^"”]{8,200})["”]"#).expect("quoted title pattern is valid")
});

static PAPER_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(paper|study|studies|article|journal|published|titled|preprint|proceedings)\b",
    )
    .expect("paper cue pattern is valid")
});

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(?:[-\w.]|%[\da-fA-F]{2})+[/\w\-.~:/?#\[\]@!$&'()*+,;=%]*")
        .expect("url pattern is valid")
});

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(1[5-9]\d\d|20\d\d)\b").expect("year pattern is valid"));

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d").expect("number pattern is valid"));

static FIRST_PERSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(i|we)\s+(think|believe|feel|love|hate|like|prefer|guess|suppose|reckon|adore)\b|\bin\s+my\s+(opinion|view)\b|\bpersonally\b|\bimho\b|\bto\s+me\b",
    )
    .expect("first-person pattern is valid")
});

static SUBJECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(best|worst|beautiful|ugly|amazing|awesome|terrible|horrible|wonderful|fantastic|boring|delicious|disgusting|overrated|underrated|favorite|favourite|lovely|awful|brilliant|stunning|incredible|gorgeous)\b",
    )
    .expect("subjective pattern is valid")
});

static HEDGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(arguably|probably|perhaps|maybe|should|seems?)\b")
        .expect("hedge pattern is valid")
});

static CAPITALIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][A-Za-z]+").expect("capitalized pattern is valid"));

/// Tokens that end with a period without ending a sentence.
const ABBREVIATIONS: &[&str] = &[
    "al", "e.g", "i.e", "etc", "vs", "dr", "mr", "mrs", "ms", "prof", "jr", "sr", "approx", "inc",
    "ltd", "cf",
];

/// Abbreviations only when a number follows, as in "No. 5" or "pp. 12".
const NUMBERED: &[&str] = &["no", "fig", "vol", "pp"];

/// Abbreviations only when capitalized, as in "St. Louis" or "Acme Co.".
const CAPITALIZED_ABBREVIATIONS: &[&str] = &["St", "Co"];

const TERMINATORS: &[char] = &['.', '!', '?', '…'];
const CLOSERS: &[char] = &['"', '\'', ')', ']', '”', '’'];
const OPENERS: &[char] = &['"', '\'', '(', '[', '“', '‘'];

/// Split text into claims.
pub struct ClaimExtractor {
    /// Longest accepted input, in characters
    max_input_chars: usize,
    /// Treat `; ` as a claim boundary
    split_clauses: bool,
}

impl Default for ClaimExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimExtractor {
    /// Create a new claim extractor with default settings.
    pub fn new() -> Self {
        Self {
            max_input_chars: 20_000,
            split_clauses: true,
        }
    }

    /// Set the maximum accepted input length.
    pub fn with_max_input_chars(mut self, max: usize) -> Self {
        self.max_input_chars = max;
        self
    }

    /// Enable or disable clause-level splitting.
    pub fn with_clause_splitting(mut self, enabled: bool) -> Self {
        self.split_clauses = enabled;
        self
    }

    /// Extract claims in left-to-right order.
    ///
    /// Empty or whitespace-only input yields no claims. Input longer than the
    /// configured maximum is rejected.
    pub fn extract(&self, text: &str) -> Result<Vec<Claim>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let len = text.chars().count();
        if len > self.max_input_chars {
            return Err(Error::extraction(format!(
                "input is {} characters, maximum is {}",
                len, self.max_input_chars
            )));
        }

        let claims = self
            .segment(text)
            .into_iter()
            .filter_map(|(start, end)| trim_span(text, start, end))
            .filter_map(|(start, end)| {
                let surface = &text[start..end];
                if !is_claim_candidate(surface) {
                    return None;
                }
                let mut claim = Claim::new(surface, self.classify(surface))
                    .with_span(start, end)
                    .with_urls(extract_urls(surface));
                if let Some(citation) = detect_citation(surface) {
                    claim = claim.with_citation(citation);
                }
                Some(claim)
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            claims = claims.len(),
            facts = claims.iter().filter(|c| c.is_fact()).count(),
            "extracted claims"
        );

        Ok(claims)
    }

    /// Classify text as fact or opinion.
    ///
    /// Opinion wins only when its markers outweigh the factual signals;
    /// ties go to fact so ambiguous text still gets checked.
    pub fn classify(&self, text: &str) -> ClaimType {
        let mut opinion = 0usize;
        opinion += 2 * FIRST_PERSON.find_iter(text).count().min(1);
        opinion += SUBJECTIVE.find_iter(text).count().min(2);
        opinion += HEDGE.find_iter(text).count().min(1);

        let mut fact = 0usize;
        if detect_citation(text).is_some() {
            fact += 3;
        }
        if YEAR.is_match(text) {
            fact += 2;
        }
        if NUMBER.is_match(text) {
            fact += 1;
        }
        if URL.is_match(text) {
            fact += 2;
        }
        if has_named_entity(text) {
            fact += 1;
        }

        if opinion > fact {
            ClaimType::Opinion
        } else {
            ClaimType::Fact
        }
    }

    /// Byte spans of raw segments, before trimming.
    fn segment(&self, text: &str) -> Vec<(usize, usize)> {
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut spans = Vec::new();
        let mut start = 0;
        let mut i = 0;

        while i < chars.len() {
            let (pos, c) = chars[i];

            if TERMINATORS.contains(&c) {
                let mut j = i;
                while j + 1 < chars.len() && TERMINATORS.contains(&chars[j + 1].1) {
                    j += 1;
                }
                let single_period = c == '.' && j == i;
                while j + 1 < chars.len() && CLOSERS.contains(&chars[j + 1].1) {
                    j += 1;
                }
                let at_break = j + 1 == chars.len() || chars[j + 1].1.is_whitespace();

                let end = chars[j].0 + chars[j].1.len_utf8();
                if at_break
                    && !(single_period && ends_with_abbreviation(&text[start..pos], &text[end..]))
                {
                    spans.push((start, end));
                    start = end;
                }
                i = j + 1;
                continue;
            }

            if c == ';'
                && self.split_clauses
                && chars.get(i + 1).is_some_and(|(_, n)| n.is_whitespace())
            {
                let end = pos + c.len_utf8();
                spans.push((start, end));
                start = end;
            } else if c == '\n' {
                // Blank line: paragraph boundary. Single newlines are soft wraps.
                let mut j = i + 1;
                while j < chars.len() && chars[j].1.is_whitespace() && chars[j].1 != '\n' {
                    j += 1;
                }
                if j < chars.len() && chars[j].1 == '\n' {
                    spans.push((start, pos));
                    start = pos;
                    i = j + 1;
                    continue;
                }
            }

            i += 1;
        }

        if start < text.len() {
            spans.push((start, text.len()));
        }
        spans
    }
}

/// Shrink a span past surrounding whitespace and a leading list bullet.
fn trim_span(text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let seg = &text[start..end];
    let mut body = seg.trim_start();

    if let Some(rest) = body.strip_prefix(&['-', '*', '•'][..]) {
        if rest.starts_with(char::is_whitespace) {
            body = rest.trim_start();
        }
    }

    let lead = seg.len() - body.len();
    let body = body.trim_end();
    if body.is_empty() {
        return None;
    }
    Some((start + lead, start + lead + body.len()))
}

/// Questions and punctuation-only fragments are not claims.
fn is_claim_candidate(surface: &str) -> bool {
    if !surface.chars().any(char::is_alphabetic) {
        return false;
    }
    let tail = surface.trim_end_matches(CLOSERS);
    !tail.ends_with('?')
}

/// Whether the text before a period ends in a known abbreviation or initial.
fn ends_with_abbreviation(before: &str, after: &str) -> bool {
    let token = before
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or("")
        .trim_start_matches(OPENERS);

    if token.is_empty() {
        return false;
    }

    let mut letters = token.chars();
    if let (Some(first), None) = (letters.next(), letters.next()) {
        // Single capital initial, as in "J. Smith"
        return first.is_uppercase();
    }

    // Dotted abbreviations such as "U.S" or "e.g"
    if token.contains('.')
        && token
            .split('.')
            .all(|part| part.chars().count() == 1 && part.chars().all(char::is_alphabetic))
    {
        return true;
    }

    if CAPITALIZED_ABBREVIATIONS.contains(&token) {
        return true;
    }

    let lower = token.to_lowercase();
    if NUMBERED.contains(&lower.as_str()) {
        return after.trim_start().starts_with(|c: char| c.is_ascii_digit());
    }
    ABBREVIATIONS.contains(&lower.as_str())
}

/// Whether a capitalized word appears after the first word.
fn has_named_entity(text: &str) -> bool {
    let first_word_end = text
        .find(char::is_whitespace)
        .unwrap_or(text.len());
    CAPITALIZED
        .find_iter(text)
        .any(|m| m.start() >= first_word_end)
}

/// Detect a citation-like reference in text.
///
/// Recognizes `Author et al. (Year)`, `Author et al. in Year`,
/// `(Author, Year)`, `Author (Year)` and quoted paper titles next to a
/// paper cue word.
pub fn detect_citation(text: &str) -> Option<CitationRef> {
    let mut author = None;
    let mut year = None;

    if let Some(cap) = AUTHOR_ET_AL.captures(text) {
        author = cap.name("author").map(|m| m.as_str().to_string());
        year = cap
            .name("paren")
            .or_else(|| cap.name("bare"))
            .and_then(|m| m.as_str().parse().ok());
    } else if let Some(cap) = PAREN_AUTHOR_YEAR
        .captures(text)
        .or_else(|| AUTHOR_PAREN_YEAR.captures(text))
    {
        author = cap.name("author").map(|m| m.as_str().to_string());
        year = cap.name("year").and_then(|m| m.as_str().parse().ok());
    }

    let title = if author.is_some() || PAPER_CUE.is_match(text) {
        QUOTED_TITLE
            .captures(text)
            .and_then(|cap| cap.name("title"))
            .map(|m| m.as_str().trim().to_string())
    } else {
        None
    };

    if author.is_none() && title.is_none() {
        return None;
    }

    Some(CitationRef {
        author,
        year,
        title,
    })
}

/// Extract URLs in order of appearance, without duplicates.
///
/// Trailing sentence punctuation is not part of the URL.
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for m in URL.find_iter(text) {
        let url = m
            .as_str()
            .trim_end_matches(&['.', ',', ';', ':', '!', '?', ')', '\''][..])
            .to_string();
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls
}
