use std::fmt;

use super::months::DateMonth;

/// Game servers an archive can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    ChessCom,
    Lichess,
}

impl Platform {
    /// Folder name used under the cache root.
    pub fn cache_name(self) -> &'static str {
        match self {
            Self::ChessCom => "chess.com",
            Self::Lichess => "lichess",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cache_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::White => "White",
            Self::Black => "Black",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeControlCategory {
    Bullet,
    Blitz,
    Rapid,
    Daily,
    NotAvailable,
}

impl TimeControlCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bullet => "Bullet",
            Self::Blitz => "Blitz",
            Self::Rapid => "Rapid",
            Self::Daily => "Daily",
            Self::NotAvailable => "N/A",
        }
    }
}

/// One normalized game, seen from the requested player's side.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub link: Option<String>,
    /// Month of the archive the game came from, not the game's own date.
    pub date: DateMonth,
    pub color: Color,
    pub elo: Option<String>,
    pub time_control: TimeControlCategory,
    pub variant: String,
    pub termination: Option<String>,
    pub result: Option<String>,
    pub opening_family: Option<&'static str>,
    pub eco: String,
    pub moves: String,
}

/// Why a raw game did not become a [`GameRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Archive entry without a `pgn` field (bughouse and friends).
    MissingPgn,
    /// No line starting with `1.`; abandoned before the first move.
    NoMoves,
    ExcludedVariant,
    ExcludedOpponent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameOutcome {
    Record(GameRecord),
    Skipped(SkipReason),
}
