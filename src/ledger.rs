use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use tracing::{info, warn};

use crate::config::parse_date;
use crate::error::{DraftError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub show_date: NaiveDate,
    pub player: String,
    pub points: u32,
    /// Player's running total when the row was written.
    pub cumulative: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordPolicy {
    /// Leave existing (show, player) rows untouched.
    #[default]
    SkipExisting,
    /// Replace the points of existing rows.
    Overwrite,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSummary {
    pub inserted: Vec<String>,
    pub overwritten: Vec<String>,
    /// Players already recorded for this show.
    pub skipped: Vec<String>,
}

/// Record one show's totals, at most once per (show, player).
///
/// The existence check and the write run in one IMMEDIATE transaction, and
/// the primary key rejects anything that slips past it, so retried or
/// concurrent calls cannot double-count.
pub fn record_show(
    conn: &mut Connection,
    show_date: NaiveDate,
    totals: &[(String, u32)],
    policy: RecordPolicy,
) -> Result<RecordSummary> {
    let date = show_date.format("%Y-%m-%d").to_string();
    let now = Utc::now().to_rfc3339();
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut summary = RecordSummary::default();

    for (player, points) in totals {
        let existing = tx
            .query_row(
                "SELECT points FROM score_ledger WHERE show_date = ?1 AND player = ?2",
                params![date, player],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;

        match (existing, policy) {
            (Some(_), RecordPolicy::SkipExisting) => {
                warn!(%show_date, %player, "show already recorded; skipping");
                summary.skipped.push(player.clone());
            }
            (Some(_), RecordPolicy::Overwrite) => {
                let prior = points_before(&tx, player, &date)?;
                tx.execute(
                    "UPDATE score_ledger SET points = ?1, cumulative = ?2, recorded_at = ?3
                     WHERE show_date = ?4 AND player = ?5",
                    params![*points as i64, prior + *points as i64, now, date, player],
                )?;
                summary.overwritten.push(player.clone());
            }
            (None, _) => {
                let prior = points_before(&tx, player, &date)?;
                let written = tx.execute(
                    "INSERT INTO score_ledger (show_date, player, points, cumulative, recorded_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(show_date, player) DO NOTHING",
                    params![date, player, *points as i64, prior + *points as i64, now],
                )?;
                if written == 0 {
                    summary.skipped.push(player.clone());
                } else {
                    summary.inserted.push(player.clone());
                }
            }
        }
    }

    tx.commit()?;
    info!(
        %show_date,
        inserted = summary.inserted.len(),
        overwritten = summary.overwritten.len(),
        skipped = summary.skipped.len(),
        "recorded show"
    );
    Ok(summary)
}

// Cumulative totals count only shows dated before this one, whatever order
// shows are recorded in.
fn points_before(conn: &Connection, player: &str, show_date: &str) -> Result<i64> {
    let prior = conn.query_row(
        "SELECT COALESCE(SUM(points), 0) FROM score_ledger
         WHERE player = ?1 AND show_date < ?2",
        params![player, show_date],
        |row| row.get(0),
    )?;
    Ok(prior)
}

/// Entries with `show_date >= since`, oldest show first, then write order.
pub fn entries_since(conn: &Connection, since: NaiveDate) -> Result<Vec<LedgerEntry>> {
    load_entries(conn, Some(since))
}

pub fn all_entries(conn: &Connection) -> Result<Vec<LedgerEntry>> {
    load_entries(conn, None)
}

pub fn is_recorded(conn: &Connection, show_date: NaiveDate) -> Result<bool> {
    let date = show_date.format("%Y-%m-%d").to_string();
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM score_ledger WHERE show_date = ?1",
        params![date],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn load_entries(conn: &Connection, since: Option<NaiveDate>) -> Result<Vec<LedgerEntry>> {
    // ISO dates compare correctly as text.
    let since = since
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    let mut stmt = conn.prepare(
        r#"
        SELECT show_date, player, points, cumulative
        FROM score_ledger
        WHERE show_date >= ?1
        ORDER BY show_date ASC, rowid ASC
        "#,
    )?;
    let rows = stmt.query_map(params![since], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, Option<i64>>(3)?,
        ))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (date, player, points, cumulative) = row?;
        let show_date = parse_date(&date).map_err(|_| {
            DraftError::Configuration(format!("score ledger has a bad show date '{date}'"))
        })?;
        let points = u32::try_from(points).map_err(|_| {
            DraftError::Configuration(format!(
                "score ledger has bad points {points} for {player} on {date}"
            ))
        })?;
        let cumulative = cumulative
            .map(|c| {
                u32::try_from(c).map_err(|_| {
                    DraftError::Configuration(format!(
                        "score ledger has bad cumulative {c} for {player} on {date}"
                    ))
                })
            })
            .transpose()?;
        out.push(LedgerEntry {
            show_date,
            player,
            points,
            cumulative,
        });
    }
    Ok(out)
}
