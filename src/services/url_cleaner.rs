use regex::Regex;
use url::Url;

use crate::domain::ResearchError;

/// Domain-like substring, for cells that carry extra prose around the URL.
const DOMAIN_PATTERN: &str = r"[\w\-\.]+\.[\w\-\.]+\w+";

/// Clean a raw spreadsheet cell into a canonical absolute URL string.
/// Takes the first domain-like substring when the cell contains stray text,
/// defaults the scheme to https, and validates the result parses with a
/// host. Idempotent; does not check reachability.
pub fn clean_url(raw: &str) -> Result<String, ResearchError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ResearchError::InvalidUrl("empty input".to_string()));
    }

    let pattern = Regex::new(DOMAIN_PATTERN).unwrap();
    let candidate = pattern
        .find(trimmed)
        .map(|m| m.as_str())
        .unwrap_or(trimmed);

    let with_scheme = if candidate.contains("://") {
        candidate.to_string()
    } else {
        format!("https://{}", candidate)
    };

    let parsed = Url::parse(&with_scheme)
        .map_err(|e| ResearchError::InvalidUrl(format!("{}: {}", trimmed, e)))?;
    if parsed.host_str().map_or(true, |h| h.is_empty()) {
        return Err(ResearchError::InvalidUrl(format!("no host in {}", trimmed)));
    }

    Ok(with_scheme)
}
