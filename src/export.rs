use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::draft_board::DraftBoard;
use crate::ledger::LedgerEntry;
use crate::standings::StandingsRow;

pub struct ExportReport {
    pub players: usize,
    pub picks: usize,
    pub ledger_rows: usize,
    pub standings_rows: usize,
}

enum Cell {
    Text(String),
    Number(f64),
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<u32> for Cell {
    fn from(value: u32) -> Self {
        Cell::Number(f64::from(value))
    }
}

/// Write the league tables as one workbook: `Draft Order`, `Draft`, `Scores`, `Standings`.
pub fn export_league(
    path: &Path,
    order: &[String],
    board: &DraftBoard,
    ledger: &[LedgerEntry],
    standings: &[StandingsRow],
) -> Result<ExportReport> {
    let mut order_rows = vec![vec![Cell::from("Player")]];
    order_rows.extend(order.iter().map(|p| vec![Cell::from(p.as_str())]));

    let mut board_header = vec![Cell::from("Player")];
    board_header.extend((1..=board.slots()).map(|i| Cell::from(format!("Pick {i}"))));
    let mut board_rows = vec![board_header];
    for row in board.rows() {
        let mut cells = vec![Cell::from(row.player.as_str())];
        cells.extend(row.picks.iter().map(|p| Cell::from(p.key.as_str())));
        board_rows.push(cells);
    }

    let mut score_rows = vec![vec![
        Cell::from("Show Date"),
        Cell::from("Player"),
        Cell::from("Points"),
        Cell::from("Cumulative"),
    ]];
    for entry in ledger {
        score_rows.push(vec![
            Cell::from(entry.show_date.format("%Y-%m-%d").to_string()),
            Cell::from(entry.player.as_str()),
            Cell::from(entry.points),
            entry.cumulative.map(Cell::from).unwrap_or_else(|| Cell::from("")),
        ]);
    }

    let mut standings_rows = vec![vec![
        Cell::from("Rank"),
        Cell::from("Player"),
        Cell::from("Points"),
        Cell::from("Shows"),
    ]];
    for (idx, row) in standings.iter().enumerate() {
        standings_rows.push(vec![
            Cell::Number((idx + 1) as f64),
            Cell::from(row.player.as_str()),
            Cell::from(row.total_points),
            Cell::Number(row.shows as f64),
        ]);
    }

    let mut workbook = Workbook::new();
    for (name, rows) in [
        ("Draft Order", &order_rows),
        ("Draft", &board_rows),
        ("Scores", &score_rows),
        ("Standings", &standings_rows),
    ] {
        let sheet = workbook.add_worksheet();
        sheet.set_name(name)?;
        write_rows(sheet, rows).with_context(|| format!("write sheet {name}"))?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        players: board.rows().len(),
        picks: board.total_picks(),
        ledger_rows: ledger.len(),
        standings_rows: standings.len(),
    })
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<Cell>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            let (r, c) = (row_idx as u32, col_idx as u16);
            match value {
                Cell::Text(text) => worksheet.write_string(r, c, text),
                Cell::Number(n) => worksheet.write_number(r, c, *n),
            }
            .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
