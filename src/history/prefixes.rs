use std::path::{Path, PathBuf};

use super::error::WriterError;
use super::types::GameRecord;
use super::writer::{COLUMNS, TsvTable, record_fields};

/// Whitespace tokens kept in the longest prefix. Move numbers count as tokens, as they
/// appear in the move line.
pub const MAX_PREFIX_TOKENS: usize = 30;

pub const PREFIX_COLUMNS: [&str; 13] = [
    COLUMNS[0],
    COLUMNS[1],
    COLUMNS[2],
    COLUMNS[3],
    COLUMNS[4],
    COLUMNS[5],
    COLUMNS[6],
    COLUMNS[7],
    COLUMNS[8],
    COLUMNS[9],
    COLUMNS[10],
    "game_moves_prefix",
    "game_moves_prefix_length",
];

/// Growing prefixes of `moves`: the first token, the first two joined by one space, and
/// so on, stopping after `max` prefixes or at the last token.
pub fn move_prefixes(moves: &str, max: usize) -> Vec<String> {
    let mut prefixes = Vec::new();
    let mut current = String::with_capacity(moves.len());
    for token in moves.split_whitespace().take(max) {
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(token);
        prefixes.push(current.clone());
    }
    prefixes
}

/// Every game exploded into one row per move prefix, with the prefix length in characters.
pub struct PrefixWriter {
    table: TsvTable,
}

impl PrefixWriter {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, WriterError> {
        TsvTable::create(path, &PREFIX_COLUMNS).map(|table| Self { table })
    }

    pub fn path(&self) -> &Path {
        self.table.path()
    }

    pub fn rows(&self) -> usize {
        self.table.rows()
    }

    /// Writes one row per prefix of `record.moves`; returns how many.
    pub fn append(&mut self, record: &GameRecord) -> Result<usize, WriterError> {
        let date = record.date.to_string();
        let base = record_fields(record, &date);
        let prefixes = move_prefixes(&record.moves, MAX_PREFIX_TOKENS);

        for prefix in &prefixes {
            let length = prefix.chars().count().to_string();
            let mut fields: Vec<&str> = Vec::with_capacity(PREFIX_COLUMNS.len());
            fields.extend_from_slice(&base);
            fields.push(prefix.as_str());
            fields.push(length.as_str());
            self.table.append_row(&fields)?;
        }
        Ok(prefixes.len())
    }
}
