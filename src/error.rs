use chrono::NaiveDate;
use thiserror::Error;

/// Failure taxonomy shared by every core operation.
///
/// Callers decide how to present these; nothing in the library turns an
/// error into a default value that could pass for a real zero score.
#[derive(Debug, Error)]
pub enum DraftError {
    /// Missing or malformed configuration or draft-order data. Fatal.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid pick: {0}")]
    InvalidPick(String),

    #[error("player '{0}' is not on the draft board")]
    PlayerNotFound(String),

    /// The setlist provider has nothing for this date.
    #[error("no setlist data for {0}")]
    NoSetlistData(NaiveDate),

    #[error("{player} has no open draft slots left ({capacity} used)")]
    SlotExhausted { player: String, capacity: usize },

    #[error("'{song}' was already drafted by {holder}")]
    AlreadyDrafted { song: String, holder: String },

    #[error("pick #{pick_number} belongs to {on_the_clock}, not {player}")]
    NotYourTurn {
        player: String,
        on_the_clock: String,
        pick_number: usize,
    },

    /// Network or provider failure. Distinct from "not found": the caller may retry.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("invalid provider payload: {0}")]
    InvalidPayload(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl DraftError {
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, DraftError::Configuration(_) | DraftError::Storage(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DraftError::PlayerNotFound(_) | DraftError::NoSetlistData(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DraftError>;
