use std::collections::HashSet;

use crate::error::{DraftError, Result};

/// Who is on the clock, and which overall pick it is (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftTurn {
    pub player: String,
    pub pick_number: usize,
}

/// Snake-draft turn for the pick after `picks_so_far`.
///
/// Odd rounds run in draft order, even rounds in reverse. An empty order has
/// no turn (the "no player, pick 0" case) and yields `None`.
pub fn next_pick(order: &[String], picks_so_far: usize) -> Option<DraftTurn> {
    let n = order.len();
    if n == 0 {
        return None;
    }

    let pick_number = picks_so_far + 1;
    let round_number = pick_number.div_ceil(n);
    let position_in_round = (pick_number - 1) % n;
    let player_index = if round_number % 2 == 0 {
        n - 1 - position_in_round
    } else {
        position_in_round
    };

    Some(DraftTurn {
        player: order[player_index].clone(),
        pick_number,
    })
}

pub fn draft_complete(order_len: usize, slots: usize, picks_so_far: usize) -> bool {
    order_len > 0 && picks_so_far >= order_len.saturating_mul(slots)
}

/// Trim entries and reject empty orders, blank names and duplicates.
pub fn validate_order<S: AsRef<str>>(players: &[S]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(players.len());
    for raw in players {
        let name = raw.as_ref().trim();
        if name.is_empty() {
            return Err(DraftError::Configuration(
                "draft order contains a blank player name".to_string(),
            ));
        }
        if !seen.insert(name.to_string()) {
            return Err(DraftError::Configuration(format!(
                "draft order lists '{name}' more than once"
            )));
        }
        out.push(name.to_string());
    }
    if out.is_empty() {
        return Err(DraftError::Configuration(
            "draft order is empty".to_string(),
        ));
    }
    Ok(out)
}
