//! Scripted providers for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::types::{LinkStatus, PageContent, PaperRecord, SearchHit};
use super::{CitationIndex, LinkChecker, PageFetcher, SearchProvider};
use crate::error::{Error, Result};

/// Scripted answer for queries containing a key.
#[derive(Clone)]
pub enum Script<T> {
    Found(Vec<T>),
    Fail(String),
}

/// Counts calls that started, finished, and were dropped midway.
#[derive(Default)]
pub struct CallLog {
    pub started: AtomicUsize,
    pub completed: AtomicUsize,
    pub abandoned: AtomicUsize,
}

impl CallLog {
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn abandoned(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }
}

/// Marks a call abandoned unless disarmed before drop.
struct InFlight<'a> {
    log: &'a CallLog,
    done: bool,
}

impl<'a> InFlight<'a> {
    fn start(log: &'a CallLog) -> Self {
        log.started.fetch_add(1, Ordering::SeqCst);
        Self { log, done: false }
    }

    fn finish(mut self) {
        self.done = true;
        self.log.completed.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.log.abandoned.fetch_add(1, Ordering::SeqCst);
        }
    }
}

struct Rules<T> {
    rules: Vec<(String, Script<T>, Duration)>,
    fallback: Script<T>,
}

impl<T: Clone> Rules<T> {
    fn new() -> Self {
        Self {
            rules: Vec::new(),
            fallback: Script::Found(Vec::new()),
        }
    }

    fn lookup(&self, query: &str) -> (Script<T>, Duration) {
        self.rules
            .iter()
            .find(|(key, _, _)| query.contains(key.as_str()))
            .map(|(_, script, delay)| (script.clone(), *delay))
            .unwrap_or((self.fallback.clone(), Duration::ZERO))
    }
}

async fn play<T: Clone>(
    log: &CallLog,
    rules: &Rules<T>,
    channel: &str,
    query: &str,
) -> Result<Vec<T>> {
    let guard = InFlight::start(log);
    let (script, delay) = rules.lookup(query);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    guard.finish();
    match script {
        Script::Found(items) => Ok(items),
        Script::Fail(reason) => Err(Error::provider(channel, reason)),
    }
}

/// Search provider answering by query substring.
pub struct MockSearch {
    rules: Rules<SearchHit>,
    pub log: Arc<CallLog>,
    /// URLs of the pages passed along with each query
    pub pages_seen: Arc<Mutex<Vec<String>>>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self {
            rules: Rules::new(),
            log: Arc::new(CallLog::default()),
            pages_seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn on(mut self, key: &str, hits: Vec<SearchHit>) -> Self {
        self.rules
            .rules
            .push((key.to_string(), Script::Found(hits), Duration::ZERO));
        self
    }

    pub fn on_delayed(mut self, key: &str, hits: Vec<SearchHit>, delay: Duration) -> Self {
        self.rules
            .rules
            .push((key.to_string(), Script::Found(hits), delay));
        self
    }

    pub fn failing_on(mut self, key: &str, reason: &str) -> Self {
        self.rules
            .rules
            .push((key.to_string(), Script::Fail(reason.to_string()), Duration::ZERO));
        self
    }

    /// Answer every unmatched query with an error.
    pub fn always_failing(mut self, reason: &str) -> Self {
        self.rules.fallback = Script::Fail(reason.to_string());
        self
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        play(&self.log, &self.rules, "search", query).await
    }

    async fn search_with_pages(
        &self,
        query: &str,
        pages: &[PageContent],
    ) -> Result<Vec<SearchHit>> {
        self.pages_seen
            .lock()
            .unwrap()
            .extend(pages.iter().map(|p| p.url.clone()));
        self.search(query).await
    }

    fn name(&self) -> &str {
        "mock-search"
    }
}

/// Citation index answering by query substring.
pub struct MockCitations {
    rules: Rules<PaperRecord>,
    pub log: Arc<CallLog>,
}

impl MockCitations {
    pub fn new() -> Self {
        Self {
            rules: Rules::new(),
            log: Arc::new(CallLog::default()),
        }
    }

    pub fn on(mut self, key: &str, records: Vec<PaperRecord>) -> Self {
        self.rules
            .rules
            .push((key.to_string(), Script::Found(records), Duration::ZERO));
        self
    }

    pub fn on_delayed(mut self, key: &str, records: Vec<PaperRecord>, delay: Duration) -> Self {
        self.rules
            .rules
            .push((key.to_string(), Script::Found(records), delay));
        self
    }

    pub fn always_failing(mut self, reason: &str) -> Self {
        self.rules.fallback = Script::Fail(reason.to_string());
        self
    }
}

#[async_trait]
impl CitationIndex for MockCitations {
    async fn lookup_citation(&self, query: &str, _year: Option<i32>) -> Result<Vec<PaperRecord>> {
        play(&self.log, &self.rules, "citation", query).await
    }

    fn name(&self) -> &str {
        "mock-citations"
    }
}

/// Link checker that reports listed URLs as broken.
pub struct MockLinks {
    broken: Vec<String>,
}

impl MockLinks {
    pub fn new(broken: &[&str]) -> Self {
        Self {
            broken: broken.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl LinkChecker for MockLinks {
    async fn check(&self, url: &str) -> LinkStatus {
        if self.broken.iter().any(|b| b == url) {
            LinkStatus::unreachable(url, None, Some("Connection failed - URL may not exist".into()))
        } else {
            LinkStatus::accessible(url, 200)
        }
    }
}

/// Page fetcher serving fixed text per URL; unknown URLs fail.
pub struct MockPages {
    pages: Vec<(String, String, Duration)>,
}

impl MockPages {
    pub fn new() -> Self {
        Self { pages: Vec::new() }
    }

    pub fn on(mut self, url: &str, text: &str) -> Self {
        self.pages
            .push((url.to_string(), text.to_string(), Duration::ZERO));
        self
    }

    pub fn on_delayed(mut self, url: &str, text: &str, delay: Duration) -> Self {
        self.pages.push((url.to_string(), text.to_string(), delay));
        self
    }
}

#[async_trait]
impl PageFetcher for MockPages {
    async fn fetch(&self, url: &str) -> Result<PageContent> {
        let Some((_, text, delay)) = self.pages.iter().find(|(u, _, _)| u == url) else {
            return Err(Error::provider("page", "Connection failed"));
        };
        if !delay.is_zero() {
            tokio::time::sleep(*delay).await;
        }
        Ok(PageContent::new(url, text.clone()))
    }
}
