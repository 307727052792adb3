use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, io};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Best-effort, single-process, file-backed memo. One file per key, named
/// by a SHA-256 digest of the normalized key string (hashing is purely for
/// filename safety). Every failure path is fail-open: an unreadable or
/// corrupt entry behaves like a miss and the pipeline refetches.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
    ttl: Option<Duration>,
}

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    timestamp: DateTime<Utc>,
    payload: serde_json::Value,
}

impl FileCache {
    /// `ttl: None` disables expiry; entries stay valid until overwritten.
    pub fn new(dir: impl Into<PathBuf>, ttl: Option<Duration>) -> Self {
        FileCache {
            dir: dir.into(),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let entry = read_entry(&self.entry_path(key))?;
        if let Some(ttl) = self.ttl {
            let age = Utc::now().signed_duration_since(entry.timestamp);
            if age.num_seconds() < 0 || age > chrono::Duration::from_std(ttl).ok()? {
                return None;
            }
        }
        Some(entry.payload)
    }

    /// Overwrites any existing entry for the key. Write failures are logged
    /// and swallowed so a full or read-only disk never fails the pipeline.
    pub fn set(&self, key: &str, payload: &serde_json::Value) {
        let entry = CacheEntry {
            timestamp: Utc::now(),
            payload: payload.clone(),
        };
        if let Err(e) = self.write_entry(key, &entry) {
            log::warn!("failed to write cache entry for key {:?}: {}", key, e);
        }
    }

    fn write_entry(&self, key: &str, entry: &CacheEntry) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let body = serde_json::to_vec(entry).map_err(io::Error::other)?;
        fs::write(self.entry_path(key), body)
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", hash_key(key)))
    }
}

fn read_entry(path: &Path) -> Option<CacheEntry> {
    let raw = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(entry) => Some(entry),
        Err(e) => {
            log::warn!("corrupt cache entry at {}: {}", path.display(), e);
            None
        }
    }
}

fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.trim().to_lowercase().as_bytes());
    format!("{:x}", hasher.finalize())
}
