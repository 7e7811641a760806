use chrono::NaiveDate;

use crate::ledger::LedgerEntry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandingsRow {
    pub player: String,
    pub total_points: u32,
    pub shows: usize,
}

/// Cumulative totals for shows on or after `season_start`, highest first.
///
/// Ties keep the order in which players first appear in `entries`.
pub fn standings(entries: &[LedgerEntry], season_start: NaiveDate) -> Vec<StandingsRow> {
    let mut rows: Vec<StandingsRow> = Vec::new();
    for entry in entries.iter().filter(|e| e.show_date >= season_start) {
        match rows.iter_mut().find(|r| r.player == entry.player) {
            Some(row) => {
                row.total_points += entry.points;
                row.shows += 1;
            }
            None => rows.push(StandingsRow {
                player: entry.player.clone(),
                total_points: entry.points,
                shows: 1,
            }),
        }
    }
    // Stable: ties stay in first-seen order.
    rows.sort_by(|a, b| b.total_points.cmp(&a.total_points));
    rows
}
