use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use setlist_draft::DraftError;
use setlist_draft::config::{AppConfig, parse_date};
use setlist_draft::export;
use setlist_draft::league::League;
use setlist_draft::ledger::RecordPolicy;
use setlist_draft::scoring::ShowScore;
use setlist_draft::setlist;

/// Snake-draft a band's song catalog and score players from live setlists.
#[derive(Parser, Debug)]
#[command(name = "setlist-draft")]
#[command(version)]
struct Cli {
    /// League database (overrides SETLIST_DRAFT_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show or replace the draft order
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// Draft a song for a player
    Pick {
        player: String,
        song: String,
        /// Skip the turn check
        #[arg(long)]
        force: bool,
    },
    /// Print the draft board
    Board,
    /// List undrafted songs from the catalog
    Available {
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Score one or more shows and record them in the ledger
    Score {
        #[arg(required = true, value_parser = parse_date_arg)]
        dates: Vec<NaiveDate>,
        /// Print scores without recording them
        #[arg(long)]
        dry_run: bool,
        /// Replace points already recorded for these shows
        #[arg(long)]
        overwrite: bool,
        /// Read the setlist payload from a local JSON file (single date only)
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Print cumulative standings
    Standings {
        #[arg(long, value_parser = parse_date_arg)]
        since: Option<NaiveDate>,
    },
    /// Export order, board, ledger and standings to an xlsx workbook
    Export { path: PathBuf },
}

#[derive(Subcommand, Debug)]
enum OrderAction {
    /// Replace the draft order
    Set {
        #[arg(required = true)]
        players: Vec<String>,
    },
    /// Print the order and who is on the clock
    Show,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "setlist_draft=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env().context("load configuration")?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    let league = League::open(config).context("open league database")?;

    match cli.command {
        Command::Order { action } => run_order(&league, action),
        Command::Pick {
            player,
            song,
            force,
        } => run_pick(&league, &player, &song, force),
        Command::Board => run_board(&league),
        Command::Available { search, limit } => run_available(&league, search.as_deref(), limit),
        Command::Score {
            dates,
            dry_run,
            overwrite,
            file,
        } => {
            let policy = if overwrite {
                RecordPolicy::Overwrite
            } else {
                RecordPolicy::SkipExisting
            };
            run_score(&league, &dates, dry_run, policy, file)
        }
        Command::Standings { since } => run_standings(&league, since),
        Command::Export { path } => run_export(&league, &path),
    }
}

fn parse_date_arg(raw: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(raw).map_err(|_| format!("expected YYYY-MM-DD, got '{raw}'"))
}

fn run_order(league: &League, action: OrderAction) -> Result<()> {
    if let OrderAction::Set { players } = action {
        let order = league.set_draft_order(&players)?;
        println!("Draft order set ({} players)", order.len());
    }
    let order = league.draft_order()?;
    for (idx, player) in order.iter().enumerate() {
        println!("{:>2}. {player}", idx + 1);
    }
    match league.on_the_clock()? {
        Some(turn) => println!("Pick #{}: {} is on the clock", turn.pick_number, turn.player),
        None => println!("Draft complete"),
    }
    Ok(())
}

fn run_pick(league: &League, player: &str, song: &str, force: bool) -> Result<()> {
    let recorded = if force {
        league.record_pick(player, song)?
    } else {
        league.submit_pick(player, song)?
    };
    println!(
        "{} drafted {} (pick #{}, slot {})",
        recorded.player, recorded.song.title, recorded.pick_number, recorded.slot
    );
    if let Some(turn) = league.on_the_clock()? {
        println!("Pick #{}: {} is on the clock", turn.pick_number, turn.player);
    }
    Ok(())
}

fn run_board(league: &League) -> Result<()> {
    let board = league.board()?;
    if board.rows().is_empty() {
        println!("Draft board is empty; set a draft order first");
        return Ok(());
    }
    for row in board.rows() {
        let picks = row
            .picks
            .iter()
            .map(|p| p.title.as_str())
            .collect::<Vec<_>>();
        println!(
            "{} ({}/{}): {}",
            row.player,
            row.picks.len(),
            board.slots(),
            if picks.is_empty() {
                "-".to_string()
            } else {
                picks.join(", ")
            }
        );
    }
    Ok(())
}

fn run_available(league: &League, search: Option<&str>, limit: usize) -> Result<()> {
    let needle = search.map(|s| s.trim().to_lowercase());
    let songs = league.available_songs()?;
    let matching = songs
        .iter()
        .filter(|s| {
            needle
                .as_deref()
                .is_none_or(|n| s.song.to_lowercase().contains(n))
        })
        .collect::<Vec<_>>();
    println!("{} songs available", matching.len());
    for song in matching.iter().take(limit) {
        println!(
            "{:<40} plays={:<5} gap={:<5} last={}",
            song.song,
            song.times_played,
            song.shows_since_last_played
                .map(|g| g.to_string())
                .unwrap_or_else(|| "-".to_string()),
            song.last_played.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn run_score(
    league: &League,
    dates: &[NaiveDate],
    dry_run: bool,
    policy: RecordPolicy,
    file: Option<PathBuf>,
) -> Result<()> {
    let results = match file {
        Some(path) => {
            let [date] = dates else {
                return Err(anyhow!("--file scores exactly one date"));
            };
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("read setlist file {}", path.display()))?;
            let parsed = setlist::parse_setlist_json(*date, &raw)?;
            vec![(*date, league.score_setlist(*date, parsed.as_ref()))]
        }
        None => league.score_dates(dates)?,
    };

    let mut failures = 0usize;
    for (date, result) in results {
        match result {
            Ok(score) => {
                print_score(&score);
                if dry_run {
                    continue;
                }
                let summary = league.record_show(&score, policy)?;
                println!(
                    "Recorded {date}: {} new, {} overwritten, {} already scored",
                    summary.inserted.len(),
                    summary.overwritten.len(),
                    summary.skipped.len()
                );
            }
            Err(err) => {
                failures += 1;
                warn!(%date, %err, "show not scored");
                println!("{date}: {err}");
            }
        }
    }
    if failures > 0 {
        return Err(anyhow!("{failures} show(s) could not be scored"));
    }
    Ok(())
}

fn print_score(score: &ShowScore) {
    println!("Scores for {}", score.show_date);
    let mut totals = score.totals();
    totals.sort_by(|a, b| b.1.cmp(&a.1));
    for (player, points) in &totals {
        println!("  {player:<20} {points:>4}");
    }
    if !score.any_points() {
        println!("No drafted songs were played in this show.");
        return;
    }
    println!("Scoring breakdown");
    for player in &score.players {
        if player.breakdown.is_empty() {
            continue;
        }
        println!("  {}", player.player);
        for line in &player.breakdown {
            println!("    - {}: {} pts", line.label, line.points);
        }
    }
}

fn run_standings(league: &League, since: Option<NaiveDate>) -> Result<()> {
    let start = since.unwrap_or(league.config().season_start);
    let rows = league.standings(Some(start))?;
    if rows.is_empty() {
        println!("No shows scored since {start}");
        return Ok(());
    }
    println!("Standings for all shows since {start}");
    for (idx, row) in rows.iter().enumerate() {
        println!(
            "{:>2}. {:<20} {:>5} pts ({} shows)",
            idx + 1,
            row.player,
            row.total_points,
            row.shows
        );
    }
    Ok(())
}

fn run_export(league: &League, path: &Path) -> Result<()> {
    let order = match league.draft_order() {
        Ok(order) => order,
        Err(DraftError::Configuration(_)) => Vec::new(),
        Err(err) => return Err(err.into()),
    };
    let board = league.board()?;
    let ledger = league.ledger()?;
    let standings = league.standings(None)?;
    let report = export::export_league(path, &order, &board, &ledger, &standings)?;
    println!("Exported to {}", path.display());
    println!(
        "Players: {} | Picks: {} | Ledger rows: {} | Standings rows: {}",
        report.players, report.picks, report.ledger_rows, report.standings_rows
    );
    Ok(())
}
