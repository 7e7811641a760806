use chrono::NaiveDate;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use setlist_draft::catalog::parse_catalog_json;
use setlist_draft::draft_board::DraftBoard;
use setlist_draft::draft_order::next_pick;
use setlist_draft::normalize::AliasTable;
use setlist_draft::scoring::{ScoringRules, derive_events, score, score_shows};
use setlist_draft::setlist::{Setlist, Track, TrackTag, parse_setlist_json};

fn show_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 4).unwrap()
}

// Ten players with twelve picks each, drawn from the synthetic show below.
fn sample_board(aliases: &AliasTable) -> DraftBoard {
    let players: Vec<String> = (1..=10).map(|i| format!("Player {i}")).collect();
    let mut board = DraftBoard::with_players(12, &players);
    for pick in 0..120 {
        let turn = next_pick(&players, pick).expect("players");
        board
            .record_pick(&turn.player, &format!("Song {pick}"), aliases)
            .expect("unique pick");
    }
    board
}

fn sample_setlist() -> Setlist {
    let tracks = (0..40)
        .map(|idx| Track {
            title: format!("Song {}", (idx * 7) % 150),
            duration_ms: 180_000 + (idx as u64 * 97_000) % 2_100_000,
            tags: if idx % 5 == 0 {
                vec![TrackTag {
                    name: "Tease".to_string(),
                    notes: Some(format!("Song {} by Phish", idx + 1)),
                }]
            } else if idx % 13 == 0 {
                vec![TrackTag {
                    name: "Bustout".to_string(),
                    notes: None,
                }]
            } else {
                Vec::new()
            },
        })
        .collect();
    Setlist {
        show_date: show_date(),
        tracks,
    }
}

fn bench_setlist_parse(c: &mut Criterion) {
    c.bench_function("setlist_parse", |b| {
        b.iter(|| {
            let setlist = parse_setlist_json(show_date(), black_box(SETLIST_JSON)).unwrap();
            black_box(setlist.map(|s| s.tracks.len()));
        })
    });
}

fn bench_catalog_parse(c: &mut Criterion) {
    let aliases = AliasTable::builtin();
    c.bench_function("catalog_parse", |b| {
        b.iter(|| {
            let rows = parse_catalog_json(black_box(CATALOG_JSON), &aliases).unwrap();
            black_box(rows.len());
        })
    });
}

fn bench_derive_events(c: &mut Criterion) {
    let aliases = AliasTable::builtin();
    let rules = ScoringRules::default();
    let setlist = sample_setlist();
    c.bench_function("derive_events", |b| {
        b.iter(|| {
            let events = derive_events(black_box(&setlist), &aliases, &rules);
            black_box(events.len());
        })
    });
}

fn bench_score_show(c: &mut Criterion) {
    let aliases = AliasTable::builtin();
    let rules = ScoringRules::default();
    let board = sample_board(&aliases);
    let setlist = sample_setlist();
    c.bench_function("score_show", |b| {
        b.iter(|| {
            let result = score(show_date(), Some(black_box(&setlist)), &board, &aliases, &rules)
                .unwrap();
            black_box(result.players.len());
        })
    });
}

fn bench_score_tour(c: &mut Criterion) {
    let aliases = AliasTable::builtin();
    let rules = ScoringRules::default();
    let board = sample_board(&aliases);
    let shows: Vec<(NaiveDate, Option<Setlist>)> = (0..30)
        .map(|offset| {
            let date = show_date() + chrono::Days::new(offset);
            let mut setlist = sample_setlist();
            setlist.show_date = date;
            (date, Some(setlist))
        })
        .collect();
    c.bench_function("score_tour", |b| {
        b.iter(|| {
            let results = score_shows(black_box(&shows), &board, &aliases, &rules);
            black_box(results.len());
        })
    });
}

criterion_group!(
    perf,
    bench_setlist_parse,
    bench_catalog_parse,
    bench_derive_events,
    bench_score_show,
    bench_score_tour
);
criterion_main!(perf);

static SETLIST_JSON: &str = include_str!("../tests/fixtures/setlist_show.json");
static CATALOG_JSON: &str = include_str!("../tests/fixtures/catalog.json");
