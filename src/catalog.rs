use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{DraftError, Result};
use crate::http_cache::HttpCache;
use crate::normalize::AliasTable;

/// One song as reported by the catalog provider. Read-only snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub song: String,
    pub times_played: u32,
    pub debut_date: Option<String>,
    pub shows_since_last_played: Option<u32>,
    pub last_played: Option<String>,
}

pub fn fetch_catalog(
    client: &Client,
    cache: &HttpCache,
    base_url: &str,
    api_key: &str,
    max_age: Duration,
    aliases: &AliasTable,
) -> Result<Vec<CatalogEntry>> {
    let url = format!("{}/songs.json", base_url.trim_end_matches('/'));
    let body = cache
        .fetch(client, &url, &[("apikey", api_key)], Some(max_age))
        .map_err(|err| DraftError::UpstreamUnavailable(format!("song catalog: {err}")))?;
    parse_catalog_json(&body, aliases)
}

/// Parse the provider's song list, dropping rows whose title is itself an alias
/// spelling, sorted by title.
pub fn parse_catalog_json(raw: &str, aliases: &AliasTable) -> Result<Vec<CatalogEntry>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let root: Value = serde_json::from_str(trimmed)
        .map_err(|err| DraftError::InvalidPayload(format!("catalog json: {err}")))?;

    if root.get("error").and_then(|e| e.as_bool()).unwrap_or(false) {
        let message = root
            .get("error_message")
            .and_then(|m| m.as_str())
            .unwrap_or("provider reported an error");
        return Err(DraftError::UpstreamUnavailable(format!(
            "song catalog: {message}"
        )));
    }

    let Some(rows) = root.get("data").and_then(|d| d.as_array()) else {
        return Ok(Vec::new());
    };

    let mut out = Vec::with_capacity(rows.len());
    let mut skipped_aliases = 0usize;
    for row in rows {
        let Some(song) = row
            .get("song")
            .and_then(|s| s.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            warn!("skipping catalog row without a song title");
            continue;
        };
        if aliases.is_alias(song) {
            skipped_aliases += 1;
            continue;
        }
        let times_played = row
            .get("times_played")
            .or_else(|| row.get("plays"))
            .and_then(as_u32_any)
            .unwrap_or(0);
        out.push(CatalogEntry {
            song: song.to_string(),
            times_played,
            debut_date: opt_string(row.get("debut")),
            shows_since_last_played: row.get("gap").and_then(as_u32_any),
            last_played: opt_string(row.get("last_played")),
        });
    }

    out.sort_by(|a, b| a.song.cmp(&b.song));
    debug!(songs = out.len(), skipped_aliases, "parsed song catalog");
    Ok(out)
}

fn opt_string(v: Option<&Value>) -> Option<String> {
    let v = v?;
    let s = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn as_u32_any(v: &Value) -> Option<u32> {
    if let Some(n) = v.as_u64() {
        return u32::try_from(n).ok();
    }
    v.as_str()?.trim().parse::<u32>().ok()
}
