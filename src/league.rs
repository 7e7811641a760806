use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::info;

use crate::cache::TtlCache;
use crate::catalog::{self, CatalogEntry};
use crate::config::AppConfig;
use crate::draft_board::{self, DraftBoard, RecordedPick};
use crate::draft_order::{self, DraftTurn};
use crate::error::{DraftError, Result};
use crate::http_cache::HttpCache;
use crate::http_client::http_client;
use crate::ledger::{self, LedgerEntry, RecordPolicy, RecordSummary};
use crate::scoring::{self, ShowScore};
use crate::setlist::{self, Setlist};
use crate::standings::{self, StandingsRow};
use crate::store::{self, Store};

/// Caller-facing API: drafting, scoring, ledger and standings over one league db.
pub struct League {
    config: AppConfig,
    store: Store,
    http: HttpCache,
    order_cache: TtlCache<(), Vec<String>>,
    board_cache: TtlCache<(), DraftBoard>,
    catalog_cache: TtlCache<(), Vec<CatalogEntry>>,
}

impl League {
    pub fn open(config: AppConfig) -> Result<Self> {
        let store = Store::open(&config.db_path)?;
        let http = HttpCache::new(config.cache_dir.clone());
        Ok(Self::with_store(config, store, http))
    }

    pub fn with_store(config: AppConfig, store: Store, http: HttpCache) -> Self {
        Self {
            order_cache: TtlCache::new("draft_order", config.order_ttl),
            board_cache: TtlCache::new("draft_board", config.board_ttl),
            catalog_cache: TtlCache::new("catalog", config.catalog_ttl),
            config,
            store,
            http,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn draft_order(&self) -> Result<Vec<String>> {
        self.order_cache
            .get_or_try_insert_with((), || self.store.with_conn(|c| store::load_draft_order(c)))
    }

    pub fn set_draft_order<S: AsRef<str>>(&self, players: &[S]) -> Result<Vec<String>> {
        let order = self
            .store
            .with_conn(|c| store::replace_draft_order(c, players))?;
        self.order_cache.invalidate_all();
        self.board_cache.invalidate_all();
        Ok(order)
    }

    /// Board view, served from a short-lived cache.
    pub fn board(&self) -> Result<DraftBoard> {
        self.board_cache
            .get_or_try_insert_with((), || self.load_board())
    }

    /// Who is on the clock, or `None` once every slot is filled.
    pub fn on_the_clock(&self) -> Result<Option<DraftTurn>> {
        let order = self.draft_order()?;
        let board = self.board()?;
        let picks = board.total_picks();
        if draft_order::draft_complete(order.len(), self.config.draft_slots, picks) {
            return Ok(None);
        }
        Ok(draft_order::next_pick(&order, picks))
    }

    /// Record a pick for the player on the clock.
    pub fn submit_pick(&self, player: &str, title: &str) -> Result<RecordedPick> {
        let order = self.draft_order()?;
        let result = self.store.with_conn(|c| {
            draft_board::record_turn_pick(
                c,
                &order,
                player,
                title,
                &self.config.aliases,
                self.config.draft_slots,
            )
        });
        self.board_cache.invalidate_all();
        result
    }

    /// Record a pick regardless of turn (commissioner correction).
    pub fn record_pick(&self, player: &str, title: &str) -> Result<RecordedPick> {
        let result = self.store.with_conn(|c| {
            draft_board::record_pick(
                c,
                player,
                title,
                &self.config.aliases,
                self.config.draft_slots,
            )
        });
        self.board_cache.invalidate_all();
        result
    }

    pub fn catalog(&self) -> Result<Vec<CatalogEntry>> {
        self.catalog_cache.get_or_try_insert_with((), || {
            let client = http_client(self.config.http_timeout)?;
            catalog::fetch_catalog(
                client,
                &self.http,
                &self.config.catalog_base_url,
                self.config.require_api_key()?,
                self.config.catalog_ttl,
                &self.config.aliases,
            )
        })
    }

    pub fn available_songs(&self) -> Result<Vec<CatalogEntry>> {
        let catalog = self.catalog()?;
        let board = self.board()?;
        Ok(board.available_songs(&catalog, &self.config.aliases))
    }

    pub fn fetch_setlist(&self, date: NaiveDate) -> Result<Setlist> {
        let client = http_client(self.config.http_timeout)?;
        setlist::fetch_setlist(client, &self.http, &self.config.setlist_base_url, date)
    }

    /// Fetch and score one show against the current board. Nothing is recorded.
    pub fn score_show(&self, date: NaiveDate) -> Result<ShowScore> {
        let setlist = self.fetch_setlist(date)?;
        self.score_setlist(date, Some(&setlist))
    }

    pub fn score_setlist(&self, date: NaiveDate, setlist: Option<&Setlist>) -> Result<ShowScore> {
        let board = self.load_board()?;
        scoring::score(date, setlist, &board, &self.config.aliases, &self.config.rules)
    }

    /// Fetch and score several shows in parallel; results follow `dates`.
    pub fn score_dates(&self, dates: &[NaiveDate]) -> Result<Vec<(NaiveDate, Result<ShowScore>)>> {
        let board = self.load_board()?;
        let fetched: Vec<(NaiveDate, Result<Setlist>)> = dates
            .par_iter()
            .map(|date| (*date, self.fetch_setlist(*date)))
            .collect();

        let mut results: Vec<Option<Result<ShowScore>>> = Vec::with_capacity(fetched.len());
        let mut shows = Vec::new();
        let mut slots = Vec::new();
        for (idx, (date, setlist)) in fetched.into_iter().enumerate() {
            results.push(None);
            match setlist {
                Ok(setlist) => {
                    slots.push(idx);
                    shows.push((date, Some(setlist)));
                }
                Err(DraftError::NoSetlistData(_)) => {
                    slots.push(idx);
                    shows.push((date, None));
                }
                Err(err) => results[idx] = Some(Err(err)),
            }
        }

        let scored =
            scoring::score_shows(&shows, &board, &self.config.aliases, &self.config.rules);
        for (idx, score) in slots.into_iter().zip(scored) {
            results[idx] = Some(score);
        }

        Ok(dates
            .iter()
            .copied()
            .zip(results)
            .filter_map(|(date, result)| result.map(|r| (date, r)))
            .collect())
    }

    pub fn record_show(&self, score: &ShowScore, policy: RecordPolicy) -> Result<RecordSummary> {
        let totals = score.totals();
        let summary = self
            .store
            .with_conn(|c| ledger::record_show(c, score.show_date, &totals, policy))?;
        if !summary.inserted.is_empty() || !summary.overwritten.is_empty() {
            info!(show_date = %score.show_date, "ledger updated");
        }
        Ok(summary)
    }

    pub fn ledger(&self) -> Result<Vec<LedgerEntry>> {
        self.store.with_conn(|c| ledger::all_entries(c))
    }

    /// Standings since `since`, defaulting to the configured season start.
    pub fn standings(&self, since: Option<NaiveDate>) -> Result<Vec<StandingsRow>> {
        let season_start = since.unwrap_or(self.config.season_start);
        let entries = self
            .store
            .with_conn(|c| ledger::entries_since(c, season_start))?;
        Ok(standings::standings(&entries, season_start))
    }

    fn load_board(&self) -> Result<DraftBoard> {
        self.store
            .with_conn(|c| draft_board::load_board(c, self.config.draft_slots))
    }
}
