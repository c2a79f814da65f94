use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::months::DateMonth;

/// Rejected run configuration. Raised before any network activity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid month '{0}', expected YYYY-MM")]
    InvalidMonth(String),

    #[error("start month {start} is after end month {end}")]
    StartAfterEnd { start: DateMonth, end: DateMonth },

    #[error("at least one of a chess.com or a lichess username is required")]
    NoUsername,

    #[error("invalid base URL '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("remote cache I/O failed for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot scan cache folder: {0}")]
    Pattern(#[from] glob::PatternError),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("writing archive '{path}' failed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// An ECO code the opening table cannot place. Always fatal.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized ECO code '{code}'")]
pub struct ClassificationError {
    pub code: String,
}

/// The opening table does not cover 0-99 exactly once per volume.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("ECO volume {volume}: id {id:02} is not covered")]
    Gap { volume: char, id: u8 },

    #[error("ECO volume {volume}: id {id:02} is covered more than once")]
    Overlap { volume: char, id: u8 },

    #[error("ECO volume {volume}: range {lo:02}-{hi:02} is out of order or out of bounds")]
    BadRange { volume: char, lo: u8, hi: u8 },
}

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("output table '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Fatal errors that abort a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error(transparent)]
    Writer(#[from] WriterError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("reading archive '{path}' failed: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
