use std::collections::HashSet;

use chrono::Utc;
use rusqlite::{Connection, ErrorCode, TransactionBehavior, params};
use tracing::info;

use crate::catalog::CatalogEntry;
use crate::draft_order::{self, DraftTurn};
use crate::error::{DraftError, Result};
use crate::normalize::{AliasTable, SongKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftedSong {
    pub key: SongKey,
    /// Title as submitted, for display.
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardRow {
    pub player: String,
    pub picks: Vec<DraftedSong>,
}

/// Per-player drafted songs with a fixed slot capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftBoard {
    slots: usize,
    rows: Vec<BoardRow>,
}

/// A validated pick that has not been written yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPick {
    pub player: String,
    pub song: DraftedSong,
    /// 1-based slot within the player's row.
    pub slot: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPick {
    pub player: String,
    pub song: DraftedSong,
    pub slot: usize,
    pub pick_number: usize,
}

impl DraftBoard {
    pub fn new(slots: usize) -> Self {
        Self {
            slots,
            rows: Vec::new(),
        }
    }

    pub fn with_players<S: AsRef<str>>(slots: usize, players: &[S]) -> Self {
        let mut board = Self::new(slots);
        for player in players {
            board.add_player(player.as_ref());
        }
        board
    }

    /// No-op when the player already has a row.
    pub fn add_player(&mut self, player: &str) {
        let player = player.trim();
        if player.is_empty() || self.row(player).is_some() {
            return;
        }
        self.rows.push(BoardRow {
            player: player.to_string(),
            picks: Vec::new(),
        });
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    pub fn rows(&self) -> &[BoardRow] {
        &self.rows
    }

    pub fn players(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.player.as_str())
    }

    pub fn picks(&self, player: &str) -> Option<&[DraftedSong]> {
        self.row(player.trim()).map(|r| r.picks.as_slice())
    }

    pub fn total_picks(&self) -> usize {
        self.rows.iter().map(|r| r.picks.len()).sum()
    }

    /// Every drafted key, re-normalized so alias table changes still match.
    pub fn drafted_keys(&self, aliases: &AliasTable) -> HashSet<SongKey> {
        self.rows
            .iter()
            .flat_map(|r| r.picks.iter())
            .map(|p| aliases.normalize(p.key.as_str()))
            .collect()
    }

    pub fn holder_of(&self, key: &SongKey, aliases: &AliasTable) -> Option<&str> {
        self.rows
            .iter()
            .find(|r| {
                r.picks
                    .iter()
                    .any(|p| aliases.normalize(p.key.as_str()) == *key)
            })
            .map(|r| r.player.as_str())
    }

    pub fn validate_pick(
        &self,
        player: &str,
        title: &str,
        aliases: &AliasTable,
    ) -> Result<PendingPick> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DraftError::InvalidPick("song title is blank".to_string()));
        }
        let player = player.trim();
        let row = self
            .row(player)
            .ok_or_else(|| DraftError::PlayerNotFound(player.to_string()))?;
        if row.picks.len() >= self.slots {
            return Err(DraftError::SlotExhausted {
                player: player.to_string(),
                capacity: self.slots,
            });
        }
        let key = aliases.normalize(title);
        if let Some(holder) = self.holder_of(&key, aliases) {
            return Err(DraftError::AlreadyDrafted {
                song: title.to_string(),
                holder: holder.to_string(),
            });
        }
        Ok(PendingPick {
            player: row.player.clone(),
            song: DraftedSong {
                key,
                title: title.to_string(),
            },
            slot: row.picks.len() + 1,
        })
    }

    pub fn record_pick(
        &mut self,
        player: &str,
        title: &str,
        aliases: &AliasTable,
    ) -> Result<RecordedPick> {
        let pending = self.validate_pick(player, title, aliases)?;
        let pick_number = self.total_picks() + 1;
        self.apply(&pending);
        Ok(RecordedPick {
            player: pending.player,
            song: pending.song,
            slot: pending.slot,
            pick_number,
        })
    }

    /// Catalog entries whose normalized title nobody holds yet.
    pub fn available_songs(
        &self,
        catalog: &[CatalogEntry],
        aliases: &AliasTable,
    ) -> Vec<CatalogEntry> {
        let drafted = self.drafted_keys(aliases);
        catalog
            .iter()
            .filter(|entry| !drafted.contains(&aliases.normalize(&entry.song)))
            .cloned()
            .collect()
    }

    fn apply(&mut self, pending: &PendingPick) {
        if let Some(row) = self.rows.iter_mut().find(|r| r.player == pending.player) {
            row.picks.push(pending.song.clone());
        }
    }

    fn row(&self, player: &str) -> Option<&BoardRow> {
        self.rows.iter().find(|r| r.player == player)
    }
}

/// Rebuild the board from storage, players in draft-order position.
pub fn load_board(conn: &Connection, slots: usize) -> Result<DraftBoard> {
    let mut board = DraftBoard::new(slots);

    let mut stmt = conn.prepare(
        r#"
        SELECT b.player
        FROM board_players b
        LEFT JOIN draft_order o ON o.player = b.player
        ORDER BY o.position IS NULL, o.position, b.player
        "#,
    )?;
    let players = stmt.query_map([], |row| row.get::<_, String>(0))?;
    for player in players {
        board.add_player(&player?);
    }

    let mut stmt = conn.prepare(
        "SELECT player, song_key, song_title FROM draft_picks ORDER BY player, slot",
    )?;
    let picks = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;
    let plain = AliasTable::empty();
    for pick in picks {
        let (player, key, title) = pick?;
        board.add_player(&player);
        if let Some(row) = board.rows.iter_mut().find(|r| r.player == player) {
            row.picks.push(DraftedSong {
                key: plain.normalize(&key),
                title,
            });
        }
    }
    Ok(board)
}

/// Record a pick without a turn check.
///
/// Read, verify and write happen inside one IMMEDIATE transaction, so two
/// writers can never both claim a song or a slot. The unique indexes on
/// `draft_picks` back this up across processes.
pub fn record_pick(
    conn: &mut Connection,
    player: &str,
    title: &str,
    aliases: &AliasTable,
    slots: usize,
) -> Result<RecordedPick> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let board = load_board(&tx, slots)?;
    let pending = board.validate_pick(player, title, aliases)?;
    let recorded = insert_pick(&tx, &pending, board.total_picks() + 1)?;
    tx.commit()?;
    info!(
        player = %recorded.player,
        song = %recorded.song.key,
        slot = recorded.slot,
        pick = recorded.pick_number,
        "recorded pick"
    );
    Ok(recorded)
}

/// Record a pick only if `player` is on the clock for the next snake-draft pick.
pub fn record_turn_pick(
    conn: &mut Connection,
    order: &[String],
    player: &str,
    title: &str,
    aliases: &AliasTable,
    slots: usize,
) -> Result<RecordedPick> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let board = load_board(&tx, slots)?;
    let picks_so_far = board.total_picks();
    if draft_order::draft_complete(order.len(), slots, picks_so_far) {
        return Err(DraftError::SlotExhausted {
            player: player.trim().to_string(),
            capacity: slots,
        });
    }
    let DraftTurn {
        player: on_the_clock,
        pick_number,
    } = draft_order::next_pick(order, picks_so_far)
        .ok_or_else(|| DraftError::Configuration("draft order is empty".to_string()))?;
    if on_the_clock != player.trim() {
        return Err(DraftError::NotYourTurn {
            player: player.trim().to_string(),
            on_the_clock,
            pick_number,
        });
    }
    let pending = board.validate_pick(player, title, aliases)?;
    let recorded = insert_pick(&tx, &pending, pick_number)?;
    tx.commit()?;
    info!(
        player = %recorded.player,
        song = %recorded.song.key,
        pick = recorded.pick_number,
        "recorded turn pick"
    );
    Ok(recorded)
}

fn insert_pick(
    conn: &Connection,
    pending: &PendingPick,
    pick_number: usize,
) -> Result<RecordedPick> {
    let inserted = conn.execute(
        r#"
        INSERT INTO draft_picks (player, slot, song_key, song_title, pick_number, picked_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            pending.player,
            pending.slot as i64,
            pending.song.key.as_str(),
            pending.song.title,
            pick_number as i64,
            Utc::now().to_rfc3339(),
        ],
    );
    match inserted {
        Ok(_) => Ok(RecordedPick {
            player: pending.player.clone(),
            song: pending.song.clone(),
            slot: pending.slot,
            pick_number,
        }),
        Err(rusqlite::Error::SqliteFailure(code, msg))
            if code.code == ErrorCode::ConstraintViolation =>
        {
            let msg = msg.unwrap_or_default();
            if msg.contains("song_key") {
                Err(DraftError::AlreadyDrafted {
                    song: pending.song.title.clone(),
                    holder: "another player".to_string(),
                })
            } else {
                Err(DraftError::SlotExhausted {
                    player: pending.player.clone(),
                    capacity: pending.slot - 1,
                })
            }
        }
        Err(err) => Err(err.into()),
    }
}
