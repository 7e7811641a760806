use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{Connection, TransactionBehavior, params};
use tracing::{debug, info};

use crate::draft_order;
use crate::error::{DraftError, Result};

/// Shared handle to the league database.
///
/// The mutex serializes writers inside one process; IMMEDIATE transactions
/// and unique keys serialize them across processes.
pub struct Store {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        init_schema(&conn)?;
        debug!(path = %path.display(), "opened league db");
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut conn)
    }
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS draft_order (
            position INTEGER PRIMARY KEY,
            player TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS board_players (
            player TEXT PRIMARY KEY,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS draft_picks (
            player TEXT NOT NULL REFERENCES board_players(player),
            slot INTEGER NOT NULL,
            song_key TEXT NOT NULL UNIQUE,
            song_title TEXT NOT NULL,
            pick_number INTEGER NOT NULL,
            picked_at TEXT NOT NULL,
            PRIMARY KEY (player, slot)
        );

        CREATE TABLE IF NOT EXISTS score_ledger (
            show_date TEXT NOT NULL,
            player TEXT NOT NULL,
            points INTEGER NOT NULL,
            cumulative INTEGER NULL,
            recorded_at TEXT NOT NULL,
            PRIMARY KEY (show_date, player)
        );
        CREATE INDEX IF NOT EXISTS idx_score_ledger_player ON score_ledger(player);
        "#,
    )?;
    Ok(())
}

/// Draft order by position. Empty or duplicated orders are configuration errors.
pub fn load_draft_order(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT player FROM draft_order ORDER BY position ASC")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut players = Vec::new();
    for row in rows {
        players.push(row?);
    }
    if players.is_empty() {
        return Err(DraftError::Configuration(
            "no draft order stored; set one with `order set`".to_string(),
        ));
    }
    draft_order::validate_order(&players)
}

/// Replace the season's draft order and create empty board rows for new players.
///
/// Existing picks are kept; a player with picks cannot be dropped from the order.
pub fn replace_draft_order<S: AsRef<str>>(
    conn: &mut Connection,
    players: &[S],
) -> Result<Vec<String>> {
    let players = draft_order::validate_order(players)?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    {
        let mut stmt = tx.prepare("SELECT DISTINCT player FROM draft_picks")?;
        let holders = stmt.query_map([], |row| row.get::<_, String>(0))?;
        for holder in holders {
            let holder = holder?;
            if !players.contains(&holder) {
                return Err(DraftError::Configuration(format!(
                    "'{holder}' already has picks and must stay in the draft order"
                )));
            }
        }
    }

    tx.execute("DELETE FROM draft_order", [])?;
    let now = Utc::now().to_rfc3339();
    for (idx, player) in players.iter().enumerate() {
        tx.execute(
            "INSERT INTO draft_order (position, player) VALUES (?1, ?2)",
            params![idx as i64, player],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO board_players (player, created_at) VALUES (?1, ?2)",
            params![player, now],
        )?;
    }
    tx.execute(
        "DELETE FROM board_players WHERE player NOT IN (SELECT player FROM draft_order)",
        [],
    )?;
    tx.commit()?;
    info!(players = players.len(), "replaced draft order");
    Ok(players)
}
