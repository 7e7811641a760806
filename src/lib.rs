pub mod cache;
pub mod catalog;
pub mod config;
pub mod draft_board;
pub mod draft_order;
pub mod error;
pub mod export;
pub mod http_cache;
pub mod http_client;
pub mod league;
pub mod ledger;
pub mod normalize;
pub mod scoring;
pub mod setlist;
pub mod standings;
pub mod store;

pub use error::{DraftError, Result};
