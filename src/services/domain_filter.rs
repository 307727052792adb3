use std::collections::{HashMap, HashSet};
use std::path::Path;

use itertools::Itertools;

use crate::domain::SearchResultItem;

/// TLDs that never identify a commercial competitor.
const BLOCKED_TLD_SUFFIXES: [&str; 4] = [".gov", ".edu", ".mil", ".int"];

/// Platforms and aggregators that dominate any SERP without being
/// competitors themselves.
const PLATFORM_SUBSTRINGS: [&str; 11] = [
    "google", "facebook", "yelp", "instagram", "wikipedia", "amazon", "walmart", "reddit",
    "linkedin", "etsy", "youtube",
];

/// Read-only set of domains that can never count as competitors. Built once
/// at startup; the exact-match list is indexed by first letter so lookups
/// stay O(1) on lists with tens of thousands of entries.
#[derive(Debug, Default)]
pub struct DomainExclusionSet {
    tld_suffixes: Vec<String>,
    substrings: Vec<String>,
    exact: HashMap<char, HashSet<String>>,
}

impl DomainExclusionSet {
    /// Built-in TLD and platform rules plus an optional external list, one
    /// domain per line. A missing or unreadable file just degrades to the
    /// built-in rules.
    pub fn load(path: Option<&Path>) -> Self {
        let mut set = DomainExclusionSet {
            tld_suffixes: BLOCKED_TLD_SUFFIXES.iter().map(|s| s.to_string()).collect(),
            substrings: PLATFORM_SUBSTRINGS.iter().map(|s| s.to_string()).collect(),
            exact: HashMap::new(),
        };

        if let Some(path) = path {
            match std::fs::read_to_string(path) {
                Ok(contents) => {
                    set.index_exact(contents.lines());
                    log::info!(
                        "loaded {} excluded domains from {}",
                        set.exact.values().map(HashSet::len).sum::<usize>(),
                        path.display()
                    );
                }
                Err(e) => log::warn!(
                    "exclusion list {} unavailable ({}), using built-in rules only",
                    path.display(),
                    e
                ),
            }
        }
        set
    }

    fn index_exact<'a>(&mut self, domains: impl Iterator<Item = &'a str>) {
        for line in domains {
            let domain = line.trim().to_lowercase();
            if domain.is_empty() || domain.starts_with('#') {
                continue;
            }
            if let Some(first) = domain.chars().next() {
                self.exact.entry(first).or_default().insert(domain);
            }
        }
    }

    pub fn is_excluded(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        if self.tld_suffixes.iter().any(|tld| host.ends_with(tld)) {
            return true;
        }
        if self.substrings.iter().any(|s| host.contains(s)) {
            return true;
        }

        let bare = strip_www(&host);
        match bare.chars().next() {
            Some(first) => self
                .exact
                .get(&first)
                .map(|bucket| bucket.contains(bare))
                .unwrap_or(false),
            None => false,
        }
    }

    /// Reduce a raw result list to at most 3 competitors: drop excluded
    /// hosts, the origin itself, and duplicate hosts (first occurrence
    /// wins). Backend rank order is the tie-break and is never re-sorted.
    pub fn filter(
        &self,
        results: &[SearchResultItem],
        origin_domain: &str,
    ) -> Vec<SearchResultItem> {
        results
            .iter()
            .unique_by(|r| r.link.to_lowercase())
            .filter(|r| !self.is_excluded(r.host()))
            .filter(|r| !hosts_match(r.host(), origin_domain))
            .take(3)
            .cloned()
            .collect()
    }
}

/// Where the origin domain itself ranks in the *unfiltered* results.
/// Matching tolerates www/non-www variants and subdomains of the origin.
/// `None` means not ranked.
pub fn domain_rank(results: &[SearchResultItem], origin_domain: &str) -> Option<u32> {
    results
        .iter()
        .find(|r| hosts_match(r.host(), origin_domain))
        .and_then(|r| r.position)
}

/// Equal after www-stripping, or one host is a subdomain of the other.
/// The suffix must start at a label boundary so `tea.com` never matches
/// `acmetea.com`.
fn hosts_match(host: &str, origin: &str) -> bool {
    let host = strip_www(&host.to_lowercase()).to_string();
    let origin = strip_www(&origin.to_lowercase()).to_string();
    if host.is_empty() || origin.is_empty() {
        return false;
    }
    host == origin
        || host
            .strip_suffix(&origin)
            .is_some_and(|prefix| prefix.ends_with('.'))
        || origin
            .strip_suffix(&host)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}
