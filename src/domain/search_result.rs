use serde::{Deserialize, Serialize};
use url::Url;

/// One organic search hit, reduced to `scheme://host`. The path never
/// matters for competitor identification, so it is discarded up front.
/// `position` is the 1-based rank the backend reported, when it had one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub link: String,
    pub position: Option<u32>,
}

impl SearchResultItem {
    /// Build an item from a raw result URL, keeping only scheme and host.
    /// Relative links and scheme-less fragments yield `None`.
    pub fn from_raw_link(raw: &str, position: Option<u32>) -> Option<Self> {
        let parsed = Url::parse(raw).ok()?;
        let host = parsed.host_str()?;
        if host.is_empty() {
            return None;
        }
        Some(SearchResultItem {
            link: format!("{}://{}", parsed.scheme(), host),
            position,
        })
    }

    /// The host part of the link, used by the filter and rank lookup.
    pub fn host(&self) -> &str {
        self.link
            .split_once("://")
            .map(|(_, host)| host)
            .unwrap_or(&self.link)
    }
}
