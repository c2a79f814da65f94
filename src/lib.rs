//! Downloads a player's monthly game archives from chess.com and lichess, caches them
//! on disk, and flattens every game into one tab-delimited analysis table.

pub mod history;

pub use history::{Pipeline, PipelineError, RunConfig, RunSummary};
