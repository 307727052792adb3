use std::time::Duration;

use fake_user_agent::get_rua;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::domain::{ResearchError, SearchResultItem};
use crate::services::{FileCache, RateLimiter, RetryPolicy};

const GOOGLE_URL: &str = "https://www.google.com/search";
const RESULTS_PER_PAGE: u32 = 10;
const NO_RESULTS_MARKER: &str = "did not match any documents";

#[derive(Serialize)]
struct GoogleQuery {
    q: String,
    start: u32,
}

/// Scraped search-engine backend. Rotates the User-Agent per request,
/// checks in with the shared rate limiter before every request, and leans on
/// the retry policy for 429 cooldowns and transient faults. Parses every
/// absolute-URL anchor on the page; navigation chrome is noise the filter
/// removes downstream.
pub struct GoogleScraper {
    client: reqwest::Client,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl GoogleScraper {
    pub fn new(
        timeout: Duration,
        limiter: RateLimiter,
        retry: RetryPolicy,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(GoogleScraper {
            client,
            limiter,
            retry,
        })
    }

    pub async fn search(
        &self,
        query: &str,
        pages: u32,
    ) -> Result<Vec<SearchResultItem>, ResearchError> {
        let mut items: Vec<SearchResultItem> = vec![];

        for page in 0..pages {
            // Acquire inside the retried operation: a retried attempt is
            // another outbound request and counts against the window.
            let html = self
                .retry
                .run(|| async {
                    self.limiter.acquire().await;
                    self.fetch_page(query, page * RESULTS_PER_PAGE).await
                })
                .await?;

            if html.contains(NO_RESULTS_MARKER) {
                log::info!("no further results for query {:?} on page {}", query, page);
                break;
            }

            let next_position = items.len() as u32 + 1;
            let page_items = collect_anchor_items(&html, next_position);
            log::info!(
                "query {:?} page {} yielded {} candidate links",
                query,
                page,
                page_items.len()
            );
            items.extend(page_items);
        }

        if items.is_empty() {
            return Err(ResearchError::NoResults);
        }
        Ok(items)
    }

    async fn fetch_page(&self, query: &str, start: u32) -> Result<String, ResearchError> {
        let response = self
            .client
            .get(GOOGLE_URL)
            .query(&GoogleQuery {
                q: query.to_string(),
                start,
            })
            .header(reqwest::header::USER_AGENT, get_rua())
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ResearchError::RateLimited);
        }
        if !status.is_success() {
            // 5xx from the results page is transient often enough to retry.
            return Err(ResearchError::Network(format!(
                "search page returned HTTP {}",
                status
            )));
        }
        Ok(response.text().await?)
    }
}

/// Every anchor whose target is an absolute URL, reduced to scheme://host,
/// positions numbered from `start_position` in document order.
fn collect_anchor_items(html: &str, start_position: u32) -> Vec<SearchResultItem> {
    let document = Html::parse_document(html);
    let a_tag_selector = Selector::parse("a").unwrap();

    let mut items = vec![];
    let mut position = start_position;
    for tag in document.select(&a_tag_selector) {
        let Some(href) = tag.value().attr("href") else {
            continue;
        };
        if let Some(item) = SearchResultItem::from_raw_link(href, Some(position)) {
            position += 1;
            items.push(item);
        }
    }
    items
}

#[derive(Serialize)]
struct ApiQuery<'a> {
    q: &'a str,
    hl: &'a str,
    gl: &'a str,
    num: u32,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Deserialize)]
struct OrganicResult {
    link: String,
    #[serde(default)]
    position: Option<u32>,
}

/// JSON search-API backend, interchangeable with the scraped one.
pub struct SerperClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    retry: RetryPolicy,
}

impl SerperClient {
    pub fn new(endpoint: String, api_key: String, retry: RetryPolicy) -> Self {
        SerperClient {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            retry,
        }
    }

    pub async fn search(
        &self,
        query: &str,
        pages: u32,
    ) -> Result<Vec<SearchResultItem>, ResearchError> {
        let body = self
            .retry
            .run(|| self.fetch(query, pages * RESULTS_PER_PAGE))
            .await?;
        parse_organic(&body)
    }

    async fn fetch(&self, query: &str, num: u32) -> Result<String, ResearchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&ApiQuery {
                q: query,
                hl: "en",
                gl: "us",
                num,
            })
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ResearchError::RateLimited);
        }
        if !status.is_success() {
            return Err(ResearchError::Http(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

/// An empty `organic` array is a soft `NoResults`, not a crash; a payload
/// that is not the documented shape is a parse error.
fn parse_organic(body: &str) -> Result<Vec<SearchResultItem>, ResearchError> {
    let parsed: ApiResponse = serde_json::from_str(body)
        .map_err(|e| ResearchError::Parse(format!("search API JSON: {}", e)))?;

    let items: Vec<SearchResultItem> = parsed
        .organic
        .iter()
        .filter_map(|r| SearchResultItem::from_raw_link(&r.link, r.position))
        .collect();

    if items.is_empty() {
        return Err(ResearchError::NoResults);
    }
    Ok(items)
}

/// The two interchangeable search backends behind one operation.
pub enum SearchBackend {
    Scraped(GoogleScraper),
    Api(SerperClient),
}

impl SearchBackend {
    pub async fn search(
        &self,
        query: &str,
        pages: u32,
    ) -> Result<Vec<SearchResultItem>, ResearchError> {
        match self {
            SearchBackend::Scraped(scraper) => scraper.search(query, pages).await,
            SearchBackend::Api(api) => api.search(query, pages).await,
        }
    }
}

/// Cache wrapper over either backend, keyed by the literal query string.
/// Raw, unfiltered result lists are cached; filtering is re-applied on
/// every read so an exclusion-list update takes effect without
/// invalidating anything.
pub struct CompetitorSearch {
    backend: SearchBackend,
    cache: FileCache,
}

impl CompetitorSearch {
    pub fn new(backend: SearchBackend, cache: FileCache) -> Self {
        CompetitorSearch { backend, cache }
    }

    pub async fn search(
        &self,
        query: &str,
        location: &str,
        pages: u32,
    ) -> Result<Vec<SearchResultItem>, ResearchError> {
        let full_query = format!("{} in {}", query, location);

        if let Some(cached) = self.cache.get(&full_query) {
            if let Ok(items) = serde_json::from_value::<Vec<SearchResultItem>>(cached) {
                log::debug!("search cache hit for {:?}", full_query);
                return Ok(items);
            }
        }

        let items = self.backend.search(&full_query, pages).await?;
        if let Ok(payload) = serde_json::to_value(&items) {
            self.cache.set(&full_query, &payload);
        }
        Ok(items)
    }
}
