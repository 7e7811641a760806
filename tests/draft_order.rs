use setlist_draft::DraftError;
use setlist_draft::draft_order::{DraftTurn, draft_complete, next_pick, validate_order};

fn order(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn sequence(order: &[String], picks: usize) -> Vec<String> {
    (0..picks)
        .map(|n| next_pick(order, n).expect("order is not empty").player)
        .collect()
}

#[test]
fn three_player_snake_over_two_rounds() {
    let order = order(&["A", "B", "C"]);
    assert_eq!(sequence(&order, 6), vec!["A", "B", "C", "C", "B", "A"]);
}

#[test]
fn third_round_runs_forward_again() {
    let order = order(&["A", "B", "C"]);
    assert_eq!(
        sequence(&order, 9)[6..],
        ["A".to_string(), "B".to_string(), "C".to_string()]
    );
}

#[test]
fn pick_number_is_one_past_picks_so_far() {
    let order = order(&["A", "B", "C", "D"]);
    for picks in 0..20 {
        let turn = next_pick(&order, picks).expect("turn");
        assert_eq!(turn.pick_number, picks + 1);
    }
}

#[test]
fn every_player_picks_twice_per_two_rounds() {
    let order = order(&["Ann", "Bo", "Cy", "Dee", "Eve"]);
    let picks = sequence(&order, 2 * order.len());
    for player in &order {
        assert_eq!(picks.iter().filter(|p| *p == player).count(), 2, "{player}");
    }
}

#[test]
fn round_boundaries_repeat_the_turning_player() {
    let order = order(&["A", "B", "C", "D"]);
    // Last pick of round 1 and first of round 2 belong to the same player.
    assert_eq!(next_pick(&order, 3).unwrap().player, "D");
    assert_eq!(next_pick(&order, 4).unwrap().player, "D");
    // Same at the round 2 / round 3 boundary.
    assert_eq!(next_pick(&order, 7).unwrap().player, "A");
    assert_eq!(next_pick(&order, 8).unwrap().player, "A");
}

#[test]
fn single_player_always_picks() {
    let order = order(&["Solo"]);
    assert_eq!(
        next_pick(&order, 41),
        Some(DraftTurn {
            player: "Solo".to_string(),
            pick_number: 42
        })
    );
}

#[test]
fn empty_order_has_no_turn() {
    assert_eq!(next_pick(&[], 0), None);
    assert_eq!(next_pick(&[], 7), None);
    assert!(!draft_complete(0, 12, 0));
}

#[test]
fn draft_completes_when_every_slot_is_filled() {
    assert!(!draft_complete(3, 12, 35));
    assert!(draft_complete(3, 12, 36));
    assert!(draft_complete(3, 12, 40));
}

#[test]
fn duplicate_names_are_rejected() {
    let err = validate_order(&["Ann", "Bo", "Ann"]).expect_err("duplicate should fail");
    assert!(matches!(err, DraftError::Configuration(ref msg) if msg.contains("Ann")));
    assert!(!err.is_recoverable());
}
