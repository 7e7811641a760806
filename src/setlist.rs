use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{DraftError, Result};
use crate::http_cache::{HttpCache, HttpFetchError};

#[derive(Debug, Clone, PartialEq)]
pub struct Setlist {
    pub show_date: NaiveDate,
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub title: String,
    pub duration_ms: u64,
    pub tags: Vec<TrackTag>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackTag {
    pub name: String,
    pub notes: Option<String>,
}

impl Track {
    pub fn duration_minutes(&self) -> f64 {
        self.duration_ms as f64 / 1000.0 / 60.0
    }

    pub fn tags_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a TrackTag> + 'a {
        self.tags.iter().filter(move |tag| tag_matches(&tag.name, name))
    }
}

/// Fetch the setlist for one show date.
///
/// A 404 or a payload without tracks is `NoSetlistData`; anything else that
/// goes wrong on the wire is `UpstreamUnavailable`.
pub fn fetch_setlist(
    client: &Client,
    cache: &HttpCache,
    base_url: &str,
    date: NaiveDate,
) -> Result<Setlist> {
    let url = format!("{}/shows/{}", base_url.trim_end_matches('/'), date.format("%Y-%m-%d"));
    let body = match cache.fetch(client, &url, &[], None) {
        Ok(body) => body,
        Err(HttpFetchError::NotFound) => return Err(DraftError::NoSetlistData(date)),
        Err(err) => {
            return Err(DraftError::UpstreamUnavailable(format!(
                "setlist for {date}: {err}"
            )));
        }
    };
    parse_setlist_json(date, &body)?.ok_or(DraftError::NoSetlistData(date))
}

/// Parse a setlist payload. `Ok(None)` means the provider had nothing for the date.
///
/// Tracks are read from `data.tracks` or a top-level `tracks` array.
pub fn parse_setlist_json(date: NaiveDate, raw: &str) -> Result<Option<Setlist>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    let root: Value = serde_json::from_str(trimmed)
        .map_err(|err| DraftError::InvalidPayload(format!("setlist json: {err}")))?;

    let tracks_value = root
        .get("data")
        .and_then(|d| d.get("tracks"))
        .or_else(|| root.get("tracks"));
    let Some(items) = tracks_value.and_then(|v| v.as_array()) else {
        return Ok(None);
    };

    let mut tracks = Vec::with_capacity(items.len());
    for item in items {
        match parse_track(item) {
            Some(track) => tracks.push(track),
            None => warn!(%date, "skipping setlist track without a title"),
        }
    }
    if tracks.is_empty() {
        return Ok(None);
    }
    debug!(%date, tracks = tracks.len(), "parsed setlist");
    Ok(Some(Setlist {
        show_date: date,
        tracks,
    }))
}

fn parse_track(v: &Value) -> Option<Track> {
    let title = v.get("title")?.as_str()?.trim().to_string();
    if title.is_empty() {
        return None;
    }
    let duration_ms = v.get("duration").and_then(as_u64_any).unwrap_or(0);
    let tags = v
        .get("tags")
        .and_then(|t| t.as_array())
        .map(|arr| arr.iter().filter_map(parse_tag).collect())
        .unwrap_or_default();
    Some(Track {
        title,
        duration_ms,
        tags,
    })
}

fn parse_tag(v: &Value) -> Option<TrackTag> {
    let name = v.get("name")?.as_str()?.trim().to_string();
    if name.is_empty() {
        return None;
    }
    let notes = v
        .get("notes")
        .and_then(|n| n.as_str())
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    Some(TrackTag { name, notes })
}

// Durations arrive as integers, floats or numeric strings depending on the endpoint.
fn as_u64_any(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    if let Some(f) = v.as_f64() {
        return (f >= 0.0).then(|| f.round() as u64);
    }
    let s = v.as_str()?.trim();
    s.parse::<u64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
}

/// Tag names compare case-insensitively, ignoring spaces and hyphens
/// ("Bust Out", "bust-out" and "Bustout" are the same tag).
pub fn tag_matches(tag_name: &str, wanted: &str) -> bool {
    let squash = |s: &str| {
        s.chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .flat_map(char::to_lowercase)
            .collect::<String>()
    };
    squash(tag_name) == squash(wanted)
}
