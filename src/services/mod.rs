pub mod cache;
pub mod content_analyzer;
pub mod data_persistance;
pub mod domain_filter;
pub mod enricher;
pub mod google_search;
pub mod orchestrator;
pub mod page_scraper;
pub mod rate_limiter;
pub mod retry;
pub mod url_cleaner;

pub use cache::*;
pub use content_analyzer::*;
pub use data_persistance::*;
pub use domain_filter::*;
pub use enricher::*;
pub use google_search::*;
pub use orchestrator::*;
pub use page_scraper::*;
pub use rate_limiter::*;
pub use retry::*;
pub use url_cleaner::*;
