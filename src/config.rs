use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;

use crate::error::{DraftError, Result};
use crate::normalize::AliasTable;
use crate::scoring::ScoringRules;

const APP_DIR: &str = "setlist_draft";
const DEFAULT_CATALOG_BASE: &str = "https://api.phish.net/v5";
const DEFAULT_SETLIST_BASE: &str = "https://phish.in/api/v2";
const DEFAULT_SEASON_START: &str = "2025-06-19";
const DEFAULT_DRAFT_SLOTS: usize = 12;

/// Immutable runtime configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub catalog_base_url: String,
    pub setlist_base_url: String,
    pub db_path: PathBuf,
    pub cache_dir: Option<PathBuf>,
    pub season_start: NaiveDate,
    pub draft_slots: usize,
    pub aliases: AliasTable,
    pub rules: ScoringRules,
    pub catalog_ttl: Duration,
    pub order_ttl: Duration,
    pub board_ttl: Duration,
    pub http_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let cache_dir = app_cache_dir(&get);
        let db_path = match get("SETLIST_DRAFT_DB") {
            Some(path) => PathBuf::from(path),
            None => cache_dir
                .as_ref()
                .map(|dir| dir.join("league.sqlite"))
                .ok_or_else(|| {
                    DraftError::Configuration(
                        "unable to resolve sqlite path; set SETLIST_DRAFT_DB".to_string(),
                    )
                })?,
        };

        let season_raw = get("SEASON_START").unwrap_or_else(|| DEFAULT_SEASON_START.to_string());
        let season_start = parse_date(&season_raw).map_err(|_| {
            DraftError::Configuration(format!("SEASON_START: bad date '{season_raw}'"))
        })?;

        let draft_slots = parse_or(&get, "DRAFT_SLOTS", DEFAULT_DRAFT_SLOTS)?;
        if draft_slots == 0 {
            return Err(DraftError::Configuration(
                "DRAFT_SLOTS must be at least 1".to_string(),
            ));
        }

        let mut aliases = AliasTable::builtin();
        if let Some(path) = get("ALIAS_FILE") {
            aliases.extend_from_file(&PathBuf::from(path))?;
        }

        let defaults = ScoringRules::default();
        let rules = ScoringRules {
            base_play: parse_or(&get, "SCORE_BASE", defaults.base_play)?,
            long_jam_bonus: parse_or(&get, "SCORE_LONG_BONUS", defaults.long_jam_bonus)?,
            epic_jam_bonus: parse_or(&get, "SCORE_EPIC_BONUS", defaults.epic_jam_bonus)?,
            reprise: parse_or(&get, "SCORE_REPRISE", defaults.reprise)?,
            tease: parse_or(&get, "SCORE_TEASE", defaults.tease)?,
            bustout_bonus: parse_or(&get, "SCORE_BUSTOUT", defaults.bustout_bonus)?,
            ..defaults
        };

        Ok(Self {
            api_key: get("PHISHNET_API_KEY"),
            catalog_base_url: get("CATALOG_BASE_URL")
                .unwrap_or_else(|| DEFAULT_CATALOG_BASE.to_string()),
            setlist_base_url: get("SETLIST_BASE_URL")
                .unwrap_or_else(|| DEFAULT_SETLIST_BASE.to_string()),
            db_path,
            cache_dir,
            season_start,
            draft_slots,
            aliases,
            rules,
            catalog_ttl: Duration::from_secs(parse_or(&get, "CATALOG_TTL_SECS", 3600)?),
            order_ttl: Duration::from_secs(parse_or(&get, "ORDER_TTL_SECS", 600)?),
            board_ttl: Duration::from_secs(parse_or(&get, "BOARD_TTL_SECS", 5)?),
            http_timeout: Duration::from_secs(parse_or(&get, "HTTP_TIMEOUT_SECS", 10)?.max(1)),
        })
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            DraftError::Configuration("PHISHNET_API_KEY is not set".to_string())
        })
    }
}

pub fn parse_date(raw: &str) -> std::result::Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
}

fn parse_or<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T> {
    match get(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| DraftError::Configuration(format!("{key}: cannot parse '{raw}'"))),
        None => Ok(default),
    }
}

fn app_cache_dir(get: &impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if let Some(base) = get("XDG_CACHE_HOME") {
        return Some(PathBuf::from(base).join(APP_DIR));
    }
    let home = get("HOME")?;
    Some(PathBuf::from(home).join(".cache").join(APP_DIR))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_resolve_from_home() {
        let cfg = config_from(&[("HOME", "/home/fan")]).expect("defaults should load");
        assert_eq!(cfg.db_path, PathBuf::from("/home/fan/.cache/setlist_draft/league.sqlite"));
        assert_eq!(cfg.season_start, NaiveDate::from_ymd_opt(2025, 6, 19).unwrap());
        assert_eq!(cfg.draft_slots, 12);
        assert_eq!(cfg.rules.bustout_bonus, 10);
        assert!(cfg.api_key.is_none());
        assert!(cfg.require_api_key().is_err());
    }

    #[test]
    fn malformed_values_are_configuration_errors() {
        let err = config_from(&[("HOME", "/h"), ("DRAFT_SLOTS", "twelve")]).unwrap_err();
        assert!(matches!(err, DraftError::Configuration(_)));
        let err = config_from(&[("HOME", "/h"), ("SEASON_START", "06/19/2025")]).unwrap_err();
        assert!(matches!(err, DraftError::Configuration(_)));
        let err = config_from(&[("HOME", "/h"), ("DRAFT_SLOTS", "0")]).unwrap_err();
        assert!(matches!(err, DraftError::Configuration(_)));
    }

    #[test]
    fn explicit_db_path_and_overrides_win() {
        let cfg = config_from(&[
            ("SETLIST_DRAFT_DB", "/tmp/league.sqlite"),
            ("SCORE_TEASE", "2"),
            ("DRAFT_SLOTS", " 8 "),
        ])
        .expect("config should load");
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/league.sqlite"));
        assert_eq!(cfg.rules.tease, 2);
        assert_eq!(cfg.draft_slots, 8);
        assert!(cfg.cache_dir.is_none());
    }
}
