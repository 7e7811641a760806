use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ETAG, HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const CACHE_VERSION: u32 = 1;
const CACHE_FILE: &str = "http_cache.json";

#[derive(Debug, Error)]
pub enum HttpFetchError {
    #[error("not found")]
    NotFound,
    #[error("http {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("received 304 without a cached body")]
    NotModifiedWithoutBody,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct HttpCacheFile {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    body: String,
    etag: Option<String>,
    last_modified: Option<String>,
    fetched_at: u64,
}

/// Provider response bodies kept on disk, keyed by URL without query string.
///
/// Entries younger than `max_age` are served without touching the network;
/// older ones are revalidated with ETag / Last-Modified.
pub struct HttpCache {
    path: Option<PathBuf>,
    state: Mutex<Option<HttpCacheFile>>,
}

impl HttpCache {
    pub fn new(cache_dir: Option<PathBuf>) -> Self {
        Self {
            path: cache_dir.map(|dir| dir.join(CACHE_FILE)),
            state: Mutex::new(None),
        }
    }

    pub fn fetch(
        &self,
        client: &Client,
        url: &str,
        query: &[(&str, &str)],
        max_age: Option<Duration>,
    ) -> Result<String, HttpFetchError> {
        let cached_entry = self.with_cache(|cache| cache.entries.get(url).cloned());

        if let (Some(entry), Some(max_age)) = (cached_entry.as_ref(), max_age) {
            let age = now_secs().saturating_sub(entry.fetched_at);
            if age < max_age.as_secs() {
                debug!(url, age, "http cache hit");
                return Ok(entry.body.clone());
            }
        }

        let mut req = client.get(url).query(query);
        if let Some(entry) = cached_entry.as_ref() {
            if let Some(etag) = entry.etag.as_ref() {
                req = req.header(IF_NONE_MATCH, etag);
            }
            if let Some(last_modified) = entry.last_modified.as_ref() {
                req = req.header(IF_MODIFIED_SINCE, last_modified);
            }
        }

        let resp = req.send()?;
        let status = resp.status();
        let headers = resp.headers().clone();
        if status == StatusCode::NOT_MODIFIED {
            let Some(mut entry) = cached_entry else {
                return Err(HttpFetchError::NotModifiedWithoutBody);
            };
            debug!(url, "http cache revalidated");
            entry.fetched_at = now_secs();
            let body = entry.body.clone();
            self.store(url, entry);
            return Ok(body);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(HttpFetchError::NotFound);
        }

        let body = resp.text()?;
        if !status.is_success() {
            return Err(HttpFetchError::Status { status, body });
        }

        let header_str = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        };
        self.store(
            url,
            CacheEntry {
                body: body.clone(),
                etag: header_str(ETAG),
                last_modified: header_str(LAST_MODIFIED),
                fetched_at: now_secs(),
            },
        );
        Ok(body)
    }

    fn store(&self, url: &str, entry: CacheEntry) {
        self.with_cache(|cache| {
            cache.version = CACHE_VERSION;
            cache.entries.insert(url.to_string(), entry);
        });
        self.persist();
    }

    fn with_cache<T>(&self, f: impl FnOnce(&mut HttpCacheFile) -> T) -> T {
        let mut guard = self.state.lock().unwrap_or_else(|p| p.into_inner());
        let cache = guard.get_or_insert_with(|| self.load());
        f(cache)
    }

    fn load(&self) -> HttpCacheFile {
        let Some(path) = self.path.as_ref() else {
            return HttpCacheFile::default();
        };
        let Ok(raw) = fs::read_to_string(path) else {
            return HttpCacheFile::default();
        };
        let cache = serde_json::from_str::<HttpCacheFile>(&raw).unwrap_or_default();
        if cache.version != CACHE_VERSION {
            return HttpCacheFile::default();
        }
        cache
    }

    fn persist(&self) {
        let Some(path) = self.path.as_ref() else {
            return;
        };
        let json = {
            let guard = self.state.lock().unwrap_or_else(|p| p.into_inner());
            let Some(cache) = guard.as_ref() else {
                return;
            };
            match serde_json::to_string(cache) {
                Ok(json) => json,
                Err(err) => {
                    warn!(%err, "serialize http cache");
                    return;
                }
            }
        };
        if let Some(dir) = path.parent() {
            let _ = fs::create_dir_all(dir);
        }
        let tmp = path.with_extension("json.tmp");
        if let Err(err) = fs::write(&tmp, json).and_then(|_| fs::rename(&tmp, path)) {
            warn!(%err, path = %path.display(), "write http cache");
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
