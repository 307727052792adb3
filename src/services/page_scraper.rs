use std::time::Duration;

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::domain::{GmbStatus, ResearchError};
use crate::services::FileCache;

/// Rendered text content and metadata for one page. Immutable once built;
/// this is exactly what gets cached and what the extraction prompt sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedPage {
    pub content: String,
    pub title: String,
    pub meta_description: String,
}

/// Fetches a URL's visible text, shielded by the pages cache. TLS
/// certificate validation is disabled on purpose: target sites in these
/// lists are routinely self-signed or misconfigured, and an unreadable
/// page is worth more than a strict handshake here.
pub struct PageScraper {
    client: reqwest::Client,
    cache: FileCache,
}

impl PageScraper {
    pub fn new(
        timeout: Duration,
        user_agent: &str,
        cache: FileCache,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(PageScraper { client, cache })
    }

    /// Single GET, no retry at this layer; retry policy belongs to callers.
    /// An empty text extraction is a hard failure, not a hollow success.
    pub async fn scrape(&self, url: &str) -> Result<ScrapedPage, ResearchError> {
        if let Some(cached) = self.cache.get(url) {
            if let Ok(page) = serde_json::from_value::<ScrapedPage>(cached) {
                log::debug!("page cache hit for {}", url);
                return Ok(page);
            }
        }

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ResearchError::RateLimited);
        }
        if !status.is_success() {
            return Err(ResearchError::Http(status.as_u16()));
        }

        let body = response.text().await?;
        let page = extract_page(&body);
        if page.content.is_empty() {
            return Err(ResearchError::EmptyContent(url.to_string()));
        }

        if let Ok(payload) = serde_json::to_value(&page) {
            self.cache.set(url, &payload);
        }
        Ok(page)
    }

    /// Probe a site for Google-Business-Profile markers. Fetch failures map
    /// to `Unknown` ("N/A"); this signal is advisory, never row-fatal.
    pub async fn check_gmb(&self, url: &str) -> GmbStatus {
        let body = match self.client.get(url).send().await {
            Ok(res) if res.status().is_success() => match res.text().await {
                Ok(body) => body,
                Err(e) => {
                    log::warn!("failed to read body for GMB probe on {}: {}", url, e);
                    return GmbStatus::Unknown;
                }
            },
            Ok(res) => {
                log::warn!("GMB probe on {} got HTTP {}", url, res.status());
                return GmbStatus::Unknown;
            }
            Err(e) => {
                log::warn!("GMB probe on {} failed: {}", url, e);
                return GmbStatus::Unknown;
            }
        };
        gmb_from_html(&body)
    }
}

/// Concatenate the text of block-level elements and collapse whitespace.
/// Nested blocks contribute their text more than once; the extraction
/// model tolerates the duplication and recall beats precision here.
fn extract_page(html: &str) -> ScrapedPage {
    let document = Html::parse_document(html);
    let block_selector = Selector::parse("p, h1, h2, h3, div").unwrap();
    let title_selector = Selector::parse("title").unwrap();
    let meta_selector = Selector::parse(r#"meta[name="description"]"#).unwrap();

    let raw: String = document
        .select(&block_selector)
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join(" ");
    let content = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let title = document
        .select(&title_selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let meta_description = document
        .select(&meta_selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .unwrap_or_default()
        .trim()
        .to_string();

    ScrapedPage {
        content,
        title,
        meta_description,
    }
}

fn gmb_from_html(html: &str) -> GmbStatus {
    let document = Html::parse_document(html);
    let schema_selector = Selector::parse(r#"script[type="application/ld+json"]"#).unwrap();

    for script in document.select(&schema_selector) {
        let raw = script.text().collect::<String>();
        if let Ok(data) = serde_json::from_str::<serde_json::Value>(&raw) {
            if data.get("@type").and_then(|t| t.as_str()) == Some("LocalBusiness") {
                return GmbStatus::Yes;
            }
        }
    }

    if html.contains("google.com/maps") || html.contains("reviews") {
        return GmbStatus::Yes;
    }
    GmbStatus::No
}
