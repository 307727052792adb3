use std::time::Duration;

/// Every way a single row's research can fail. Rows never propagate these
/// past the enricher; they end up as a status + message on the output row.
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited by upstream (HTTP 429)")]
    RateLimited,

    #[error("http status {0}")]
    Http(u16),

    #[error("no readable content at {0}")]
    EmptyContent(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("search returned no results")]
    NoResults,

    #[error("no valid competitors after filtering")]
    NoValidCompetitors,

    #[error("malformed upstream payload: {0}")]
    Parse(String),

    #[error("row timed out after {0:?}")]
    Timeout(Duration),
}

impl ResearchError {
    /// Only connection-level faults and 429s are worth retrying. Everything
    /// else is terminal for the row.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ResearchError::Network(_) | ResearchError::RateLimited)
    }
}

impl From<reqwest::Error> for ResearchError {
    fn from(e: reqwest::Error) -> Self {
        if e.status().map(|s| s.as_u16()) == Some(429) {
            return ResearchError::RateLimited;
        }
        ResearchError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(ResearchError::Network("reset by peer".to_string()).is_retryable());
        assert!(ResearchError::RateLimited.is_retryable());
        assert!(!ResearchError::NoResults.is_retryable());
        assert!(!ResearchError::EmptyContent("https://a.com".to_string()).is_retryable());
        assert!(!ResearchError::Http(500).is_retryable());
    }
}
