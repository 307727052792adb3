use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

use crate::services::{
    enricher::EnrichOptions, orchestrator::BatchOptions, FileCache, RateLimiter, RetryPolicy,
};

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub scraper: ScraperSettings,
    pub search: SearchSettings,
    pub analyzer: AnalyzerSettings,
    pub cache: CacheSettings,
    pub batch: BatchSettings,
    pub exclusions_file: Option<String>,
}

#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
}

#[derive(Deserialize, Clone)]
pub struct ScraperSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl ScraperSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Deserialize, Clone, Copy, PartialEq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackendKind {
    Scraped,
    Api,
}

#[derive(Deserialize, Clone)]
pub struct SearchSettings {
    pub backend: SearchBackendKind,
    pub requests_per_minute: usize,
    pub pages: u32,
    pub max_attempts: u32,
    pub rate_limit_cooldown_secs: u64,
    pub network_backoff_secs: u64,
    pub timeout_secs: u64,
    pub api_endpoint: String,
    pub api_key: String,
    pub default_location: String,
}

impl SearchSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            rate_limit_cooldown: Duration::from_secs(self.rate_limit_cooldown_secs),
            network_backoff: Duration::from_secs(self.network_backoff_secs),
        }
    }

    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::per_minute(self.requests_per_minute)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn default_enrich_options(&self) -> EnrichOptions {
        EnrichOptions {
            location: self.default_location.clone(),
            search_pages: self.pages,
            competitor_insights: false,
            gmb_check: false,
        }
    }
}

#[derive(Deserialize, Clone)]
pub struct AnalyzerSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
}

#[derive(Deserialize, Clone)]
pub struct CacheSettings {
    pub dir: String,
    pub page_ttl_days: u64,
    /// Absent means search entries never expire.
    pub search_ttl_days: Option<u64>,
}

impl CacheSettings {
    pub fn page_cache(&self) -> FileCache {
        FileCache::new(
            PathBuf::from(&self.dir).join("pages"),
            Some(Duration::from_secs(self.page_ttl_days * 24 * 3600)),
        )
    }

    pub fn search_cache(&self) -> FileCache {
        FileCache::new(
            PathBuf::from(&self.dir).join("searches"),
            self.search_ttl_days
                .map(|days| Duration::from_secs(days * 24 * 3600)),
        )
    }
}

#[derive(Deserialize, Clone)]
pub struct BatchSettings {
    pub batch_size: usize,
    pub worker_count: usize,
    pub row_timeout_secs: u64,
    pub snapshot_every: Option<usize>,
    pub snapshot_path: Option<String>,
}

impl BatchSettings {
    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            batch_size: self.batch_size,
            worker_count: self.worker_count,
            row_timeout: Duration::from_secs(self.row_timeout_secs),
            snapshot_every: self.snapshot_every,
            snapshot_path: self.snapshot_path.as_ref().map(PathBuf::from),
        }
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration"))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
