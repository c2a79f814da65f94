use std::borrow::Cow;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::error::WriterError;
use super::types::GameRecord;

pub const COLUMNS: [&str; 11] = [
    "link",
    "date",
    "color",
    "elo",
    "time_control",
    "variant",
    "termination",
    "result",
    "opening_family",
    "eco",
    "moves",
];

const DELIMITER: char = '\t';

/// Append-only tab-delimited table. Every row is one `write_all` of one complete line.
pub struct TsvTable {
    path: PathBuf,
    file: File,
    rows: usize,
}

impl TsvTable {
    /// Truncates `path` and writes the header.
    pub fn create(path: impl Into<PathBuf>, columns: &[&str]) -> Result<Self, WriterError> {
        let path = path.into();
        let file = File::create(&path).map_err(|source| WriterError::Io {
            path: path.clone(),
            source,
        })?;
        let mut table = Self {
            path,
            file,
            rows: 0,
        };
        table.write_line(&row_line(columns))?;
        Ok(table)
    }

    /// Appends to `path`, writing the header only if the table is new or empty.
    pub fn open(path: impl Into<PathBuf>, columns: &[&str]) -> Result<Self, WriterError> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| WriterError::Io {
                path: path.clone(),
                source,
            })?;
        let is_empty = file
            .metadata()
            .map(|meta| meta.len() == 0)
            .map_err(|source| WriterError::Io {
                path: path.clone(),
                source,
            })?;

        let mut table = Self {
            path,
            file,
            rows: 0,
        };
        if is_empty {
            table.write_line(&row_line(columns))?;
        }
        Ok(table)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn append_row(&mut self, fields: &[&str]) -> Result<(), WriterError> {
        self.write_line(&row_line(fields))?;
        self.rows += 1;
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> Result<(), WriterError> {
        self.file
            .write_all(line.as_bytes())
            .map_err(|source| WriterError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

/// The fixed game table, one row per accepted game.
pub struct SynthesisWriter {
    table: TsvTable,
}

impl SynthesisWriter {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, WriterError> {
        TsvTable::create(path, &COLUMNS).map(|table| Self { table })
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self, WriterError> {
        TsvTable::open(path, &COLUMNS).map(|table| Self { table })
    }

    pub fn path(&self) -> &Path {
        self.table.path()
    }

    /// Rows appended through this writer.
    pub fn rows(&self) -> usize {
        self.table.rows()
    }

    pub fn append(&mut self, record: &GameRecord) -> Result<(), WriterError> {
        let date = record.date.to_string();
        self.table.append_row(&record_fields(record, &date))
    }
}

/// The record's cells in `COLUMNS` order. `date` is the rendered `record.date`.
pub fn record_fields<'r>(record: &'r GameRecord, date: &'r str) -> [&'r str; 11] {
    [
        record.link.as_deref().unwrap_or_default(),
        date,
        record.color.as_str(),
        record.elo.as_deref().unwrap_or_default(),
        record.time_control.as_str(),
        &record.variant,
        record.termination.as_deref().unwrap_or_default(),
        record.result.as_deref().unwrap_or_default(),
        record.opening_family.unwrap_or_default(),
        &record.eco,
        &record.moves,
    ]
}

/// Tabs and line breaks inside a value would split the row.
fn clean(value: &str) -> Cow<'_, str> {
    if value.contains(['\t', '\r', '\n']) {
        Cow::Owned(value.replace(['\t', '\r', '\n'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

fn row_line(fields: &[&str]) -> String {
    let mut line = String::with_capacity(fields.iter().map(|f| f.len() + 1).sum());
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            line.push(DELIMITER);
        }
        line.push_str(&clean(field));
    }
    line.push('\n');
    line
}
