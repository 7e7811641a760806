//! Show scoring.
//!
//! A setlist is walked once in performance order and turned into labeled
//! scoring events: the first time a song is played it is a Play worth base
//! points plus a duration bonus, later plays are Reprises, and `tease` tags
//! produce Tease events for the teased song. A `bustout` tag adds a bonus to
//! the event of the track it decorates. Each player's drafted songs are then
//! matched against the events by [`SongKey`].

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::draft_board::DraftBoard;
use crate::error::{DraftError, Result};
use crate::normalize::{AliasTable, SongKey};
use crate::setlist::{self, Setlist, Track};

const TEASE_TAG: &str = "tease";
const BUSTOUT_TAG: &str = "bustout";

/// Point values. The defaults are the league's current season rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringRules {
    pub base_play: u32,
    /// Lower bound (minutes, inclusive) of the long-jam bracket.
    pub long_jam_minutes: f64,
    pub long_jam_bonus: u32,
    /// Lower bound (minutes, inclusive) of the epic-jam bracket.
    pub epic_jam_minutes: f64,
    pub epic_jam_bonus: u32,
    pub reprise: u32,
    pub tease: u32,
    pub bustout_bonus: u32,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            base_play: 4,
            long_jam_minutes: 20.0,
            long_jam_bonus: 2,
            epic_jam_minutes: 30.0,
            epic_jam_bonus: 3,
            reprise: 2,
            tease: 1,
            bustout_bonus: 10,
        }
    }
}

impl ScoringRules {
    /// Points for a first play, bracketed on unrounded minutes.
    pub fn play_points(&self, minutes: f64) -> u32 {
        if minutes >= self.epic_jam_minutes {
            self.base_play + self.epic_jam_bonus
        } else if minutes >= self.long_jam_minutes {
            self.base_play + self.long_jam_bonus
        } else {
            self.base_play
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Play,
    Reprise,
    Tease,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringEvent {
    pub song_key: SongKey,
    /// Unique within a show.
    pub label: String,
    pub points: u32,
    pub kind: EventKind,
    pub bustout: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakdownLine {
    pub label: String,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerShowScore {
    pub player: String,
    pub total: u32,
    /// Matching events in show order.
    pub breakdown: Vec<BreakdownLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowScore {
    pub show_date: NaiveDate,
    pub events: Vec<ScoringEvent>,
    /// One entry per board player, in board order, including zero totals.
    pub players: Vec<PlayerShowScore>,
}

impl ShowScore {
    pub fn totals(&self) -> Vec<(String, u32)> {
        self.players
            .iter()
            .map(|p| (p.player.clone(), p.total))
            .collect()
    }

    pub fn total_for(&self, player: &str) -> Option<u32> {
        self.player(player).map(|p| p.total)
    }

    pub fn breakdown_for(&self, player: &str) -> Option<&[BreakdownLine]> {
        self.player(player).map(|p| p.breakdown.as_slice())
    }

    pub fn any_points(&self) -> bool {
        self.players.iter().any(|p| p.total > 0)
    }

    fn player(&self, player: &str) -> Option<&PlayerShowScore> {
        self.players.iter().find(|p| p.player == player)
    }
}

/// Derive the ordered, labeled scoring events for one show.
pub fn derive_events(
    setlist: &Setlist,
    aliases: &AliasTable,
    rules: &ScoringRules,
) -> Vec<ScoringEvent> {
    let mut plays: HashMap<SongKey, usize> = HashMap::new();
    let mut labels = LabelSet::default();
    let mut events = Vec::new();

    for track in &setlist.tracks {
        let key = aliases.normalize(&track.title);
        if key.is_empty() {
            continue;
        }

        let occurrence = {
            let count = plays.entry(key.clone()).or_insert(0);
            *count += 1;
            *count
        };
        let bustout = track.tags_named(BUSTOUT_TAG).next().is_some();
        let (kind, mut points, label) = if occurrence == 1 {
            (
                EventKind::Play,
                rules.play_points(track.duration_minutes()),
                play_label(track),
            )
        } else {
            (
                EventKind::Reprise,
                rules.reprise,
                format!("{} (Reprise #{})", track.title, occurrence - 1),
            )
        };
        if bustout {
            points += rules.bustout_bonus;
        }
        events.push(ScoringEvent {
            song_key: key,
            label: labels.claim(label),
            points,
            kind,
            bustout,
        });

        for tag in track.tags_named(TEASE_TAG) {
            let Some(teased) = tag.notes.as_deref().and_then(teased_title) else {
                warn!(track = %track.title, "tease tag without a teased song");
                continue;
            };
            let teased_key = aliases.normalize(teased);
            if teased_key.is_empty() {
                continue;
            }
            events.push(ScoringEvent {
                song_key: teased_key,
                label: labels.claim(format!("{teased} (Tease in {})", track.title)),
                points: rules.tease,
                kind: EventKind::Tease,
                bustout: false,
            });
        }
    }

    events
}

/// Score one show against the draft board.
///
/// A missing or track-less setlist is `NoSetlistData`, never an all-zero result.
pub fn score(
    show_date: NaiveDate,
    setlist: Option<&Setlist>,
    board: &DraftBoard,
    aliases: &AliasTable,
    rules: &ScoringRules,
) -> Result<ShowScore> {
    let setlist = setlist
        .filter(|s| !s.tracks.is_empty())
        .ok_or(DraftError::NoSetlistData(show_date))?;
    let events = derive_events(setlist, aliases, rules);

    let players = board
        .rows()
        .iter()
        .map(|row| {
            let picked: HashSet<SongKey> = row
                .picks
                .iter()
                .map(|p| aliases.normalize(p.key.as_str()))
                .collect();
            let mut breakdown: Vec<BreakdownLine> = Vec::new();
            for event in events.iter().filter(|e| picked.contains(&e.song_key)) {
                match breakdown.iter_mut().find(|line| line.label == event.label) {
                    Some(line) => line.points += event.points,
                    None => breakdown.push(BreakdownLine {
                        label: event.label.clone(),
                        points: event.points,
                    }),
                }
            }
            PlayerShowScore {
                player: row.player.clone(),
                total: breakdown.iter().map(|l| l.points).sum(),
                breakdown,
            }
        })
        .collect::<Vec<_>>();

    debug!(
        %show_date,
        events = events.len(),
        scoring_players = players.iter().filter(|p| p.total > 0).count(),
        "scored show"
    );
    Ok(ShowScore {
        show_date,
        events,
        players,
    })
}

/// Parse a raw setlist payload and score it.
pub fn score_payload(
    show_date: NaiveDate,
    raw: &str,
    board: &DraftBoard,
    aliases: &AliasTable,
    rules: &ScoringRules,
) -> Result<ShowScore> {
    let setlist = setlist::parse_setlist_json(show_date, raw)?;
    score(show_date, setlist.as_ref(), board, aliases, rules)
}

/// Score several shows in parallel. Results keep the input order.
pub fn score_shows(
    shows: &[(NaiveDate, Option<Setlist>)],
    board: &DraftBoard,
    aliases: &AliasTable,
    rules: &ScoringRules,
) -> Vec<Result<ShowScore>> {
    shows
        .par_iter()
        .map(|(date, setlist)| score(*date, setlist.as_ref(), board, aliases, rules))
        .collect()
}

fn play_label(track: &Track) -> String {
    format!("{} ({} min)", track.title, track.duration_minutes().round() as u64)
}

/// The teased song from a tease note: the text before " by ", if present.
fn teased_title(note: &str) -> Option<&str> {
    let lower = note.to_ascii_lowercase();
    let title = match lower.find(" by ") {
        Some(idx) => &note[..idx],
        None => note,
    };
    let title = title.trim();
    (!title.is_empty()).then_some(title)
}

// Keeps labels unique within a show: a repeat gets " #2", " #3", ...
#[derive(Default)]
struct LabelSet {
    seen: HashMap<String, usize>,
}

impl LabelSet {
    fn claim(&mut self, label: String) -> String {
        let count = self.seen.entry(label.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            label
        } else {
            format!("{label} #{count}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teased_title_stops_at_by() {
        assert_eq!(teased_title("Simpsons Theme by Phish"), Some("Simpsons Theme"));
        assert_eq!(teased_title("Manteca By Dizzy Gillespie"), Some("Manteca"));
        assert_eq!(teased_title("  Heartbreaker "), Some("Heartbreaker"));
        assert_eq!(teased_title(" by Phish"), None);
    }

    #[test]
    fn duration_brackets_use_unrounded_minutes() {
        let rules = ScoringRules::default();
        assert_eq!(rules.play_points(19.99), 4);
        assert_eq!(rules.play_points(20.0), 6);
        assert_eq!(rules.play_points(29.999), 6);
        assert_eq!(rules.play_points(30.0), 7);
    }

    #[test]
    fn repeated_labels_get_suffixes() {
        let mut labels = LabelSet::default();
        assert_eq!(labels.claim("X (Tease in Y)".to_string()), "X (Tease in Y)");
        assert_eq!(labels.claim("X (Tease in Y)".to_string()), "X (Tease in Y) #2");
    }
}
