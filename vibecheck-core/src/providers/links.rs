//! HTTP link checking.

use async_trait::async_trait;
use reqwest::{Client, Url};

use super::http::{build_http_client, ProviderConfig};
use super::types::LinkStatus;
use super::LinkChecker;
use crate::error::Result;

pub(super) const USER_AGENT: &str = "Mozilla/5.0 (compatible; vibecheck/0.1; +link-check)";

/// Checks links with HEAD, falling back to GET for servers that reject HEAD.
pub struct HttpLinkChecker {
    http: Client,
}

impl HttpLinkChecker {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            http: build_http_client(config.timeout_secs)?,
        })
    }
}

/// Validate that `raw` is an absolute http(s) URL with a host.
pub(crate) fn parse_link(raw: &str) -> std::result::Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| format!("URL parsing error: {}", e))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err("Invalid URL format".to_string());
    }
    Ok(url)
}

pub(super) fn describe_request_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timed out".to_string()
    } else if e.is_connect() {
        "Connection failed - URL may not exist".to_string()
    } else if e.is_redirect() {
        "Too many redirects".to_string()
    } else {
        e.to_string()
    }
}

#[async_trait]
impl LinkChecker for HttpLinkChecker {
    async fn check(&self, raw: &str) -> LinkStatus {
        let url = match parse_link(raw) {
            Ok(url) => url,
            Err(reason) => return LinkStatus::invalid(raw, reason),
        };

        let head = self
            .http
            .head(url.clone())
            .header("user-agent", USER_AGENT)
            .send()
            .await;

        let response = match head {
            Ok(resp) if resp.status().as_u16() < 400 => Ok(resp),
            _ => {
                self.http
                    .get(url.clone())
                    .header("user-agent", USER_AGENT)
                    .send()
                    .await
            }
        };

        match response {
            Ok(resp) => {
                let code = resp.status().as_u16();
                let mut status = if code < 400 {
                    LinkStatus::accessible(raw, code)
                } else {
                    LinkStatus::unreachable(raw, Some(code), None)
                };
                if resp.url() != &url {
                    status.redirect_url = Some(resp.url().to_string());
                }
                status
            }
            Err(e) => LinkStatus::unreachable(raw, None, Some(describe_request_error(&e))),
        }
    }
}
