use std::sync::{Arc, Barrier};
use std::thread;

use setlist_draft::DraftError;
use setlist_draft::catalog::CatalogEntry;
use setlist_draft::draft_board::{self, DraftBoard};
use setlist_draft::normalize::AliasTable;
use setlist_draft::store::{self, Store};

const SLOTS: usize = 2;

fn league_store(players: &[&str]) -> Store {
    let store = Store::open_in_memory().expect("in-memory db");
    store
        .with_conn(|c| store::replace_draft_order(c, players))
        .expect("draft order");
    store
}

fn pick(
    store: &Store,
    player: &str,
    song: &str,
) -> setlist_draft::Result<draft_board::RecordedPick> {
    store.with_conn(|c| {
        draft_board::record_pick(c, player, song, &AliasTable::builtin(), SLOTS)
    })
}

fn turn_pick(
    store: &Store,
    player: &str,
    song: &str,
) -> setlist_draft::Result<draft_board::RecordedPick> {
    let order = store
        .with_conn(|c| store::load_draft_order(c))
        .expect("order");
    store.with_conn(|c| {
        draft_board::record_turn_pick(c, &order, player, song, &AliasTable::builtin(), SLOTS)
    })
}

fn board(store: &Store) -> DraftBoard {
    store
        .with_conn(|c| draft_board::load_board(c, SLOTS))
        .expect("board")
}

#[test]
fn order_creates_empty_rows_in_position() {
    let store = league_store(&["Cy", "Ann", "Bo"]);
    let board = board(&store);
    assert_eq!(board.players().collect::<Vec<_>>(), vec!["Cy", "Ann", "Bo"]);
    assert_eq!(board.total_picks(), 0);
}

#[test]
fn pick_is_stored_under_its_normalized_key() {
    let store = league_store(&["Ann", "Bo"]);
    let recorded = pick(&store, "Ann", "  YEM ").expect("pick");
    assert_eq!(recorded.slot, 1);
    assert_eq!(recorded.pick_number, 1);
    assert_eq!(recorded.song.key.as_str(), "you enjoy myself");

    let board = board(&store);
    let picks = board.picks("Ann").expect("Ann row");
    assert_eq!(picks.len(), 1);
    assert_eq!(picks[0].title, "YEM");
}

#[test]
fn unknown_player_is_rejected() {
    let store = league_store(&["Ann"]);
    let err = pick(&store, "Zed", "Tweezer").unwrap_err();
    assert!(matches!(err, DraftError::PlayerNotFound(ref p) if p == "Zed"));
    assert!(err.is_not_found());
}

#[test]
fn full_row_is_rejected() {
    let store = league_store(&["Ann", "Bo"]);
    pick(&store, "Ann", "Tweezer").unwrap();
    pick(&store, "Ann", "Ghost").unwrap();
    let err = pick(&store, "Ann", "Sand").unwrap_err();
    assert!(matches!(
        err,
        DraftError::SlotExhausted { ref player, capacity: 2 } if player == "Ann"
    ));
    assert_eq!(board(&store).picks("Ann").unwrap().len(), 2);
}

#[test]
fn a_song_is_drafted_at_most_once() {
    let store = league_store(&["Ann", "Bo"]);
    pick(&store, "Ann", "You Enjoy Myself").unwrap();

    let err = pick(&store, "Bo", "yem").unwrap_err();
    assert!(matches!(
        err,
        DraftError::AlreadyDrafted { ref holder, .. } if holder == "Ann"
    ));
    let err = pick(&store, "Ann", "YOU ENJOY MYSELF").unwrap_err();
    assert!(matches!(err, DraftError::AlreadyDrafted { .. }));
    assert_eq!(board(&store).total_picks(), 1);
}

#[test]
fn blank_title_is_invalid() {
    let store = league_store(&["Ann"]);
    let err = pick(&store, "Ann", "   ").unwrap_err();
    assert!(matches!(err, DraftError::InvalidPick(_)));
}

#[test]
fn turn_picks_follow_the_snake() {
    let store = league_store(&["Ann", "Bo"]);
    turn_pick(&store, "Ann", "Tweezer").expect("Ann is first");

    let err = turn_pick(&store, "Ann", "Ghost").unwrap_err();
    assert!(matches!(
        err,
        DraftError::NotYourTurn { ref on_the_clock, pick_number: 2, .. } if on_the_clock == "Bo"
    ));

    turn_pick(&store, "Bo", "Ghost").expect("Bo pick 2");
    let third = turn_pick(&store, "Bo", "Sand").expect("Bo again at the turn");
    assert_eq!(third.pick_number, 3);
    turn_pick(&store, "Ann", "Fuego").expect("Ann pick 4");

    let err = turn_pick(&store, "Ann", "Harry Hood").unwrap_err();
    assert!(matches!(err, DraftError::SlotExhausted { .. }));
}

#[test]
fn players_with_picks_cannot_leave_the_order() {
    let store = league_store(&["Ann", "Bo"]);
    pick(&store, "Bo", "Tweezer").unwrap();
    let err = store
        .with_conn(|c| store::replace_draft_order(c, &["Ann", "Cy"]))
        .unwrap_err();
    assert!(matches!(err, DraftError::Configuration(_)));

    store
        .with_conn(|c| store::replace_draft_order(c, &["Bo", "Ann", "Cy"]))
        .expect("reorder keeps picks");
    let board = board(&store);
    assert_eq!(board.players().collect::<Vec<_>>(), vec!["Bo", "Ann", "Cy"]);
    assert_eq!(board.picks("Bo").unwrap().len(), 1);
}

#[test]
fn racing_picks_for_one_song_record_exactly_once() {
    let players = ["Ann", "Bo", "Cy", "Dee", "Eve", "Fay"];
    let store = Arc::new(league_store(&players));
    let barrier = Arc::new(Barrier::new(players.len()));

    let handles = players
        .iter()
        .map(|player| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            let player = player.to_string();
            thread::spawn(move || {
                barrier.wait();
                pick(&store, &player, "Tweezer")
            })
        })
        .collect::<Vec<_>>();

    let results = handles
        .into_iter()
        .map(|h| h.join().expect("thread"))
        .collect::<Vec<_>>();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, DraftError::AlreadyDrafted { .. }))
    );
    assert_eq!(board(&store).total_picks(), 1);
}

#[test]
fn racing_picks_never_overfill_a_row() {
    let store = Arc::new(league_store(&["Ann", "Bo"]));
    let songs = ["Tweezer", "Ghost", "Sand", "Fuego", "Harry Hood", "Carini"];
    let barrier = Arc::new(Barrier::new(songs.len()));

    let handles = songs
        .iter()
        .map(|song| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            let song = song.to_string();
            thread::spawn(move || {
                barrier.wait();
                pick(&store, "Ann", &song)
            })
        })
        .collect::<Vec<_>>();

    let results = handles
        .into_iter()
        .map(|h| h.join().expect("thread"))
        .collect::<Vec<_>>();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), SLOTS);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, DraftError::SlotExhausted { capacity: SLOTS, .. }))
    );

    let mut slots = results
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|p| p.slot)
        .collect::<Vec<_>>();
    slots.sort_unstable();
    assert_eq!(slots, (1..=SLOTS).collect::<Vec<_>>());
    assert_eq!(board(&store).picks("Ann").unwrap().len(), SLOTS);
}

#[test]
fn available_songs_hide_drafted_titles_and_aliases() {
    let store = league_store(&["Ann", "Bo"]);
    pick(&store, "Ann", "YEM").unwrap();
    let catalog = ["Ghost", "Tweezer", "You Enjoy Myself"]
        .iter()
        .map(|song| CatalogEntry {
            song: song.to_string(),
            times_played: 100,
            debut_date: None,
            shows_since_last_played: None,
            last_played: None,
        })
        .collect::<Vec<_>>();

    let available = board(&store).available_songs(&catalog, &AliasTable::builtin());
    assert_eq!(
        available.iter().map(|e| e.song.as_str()).collect::<Vec<_>>(),
        vec!["Ghost", "Tweezer"]
    );
}
