use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use super::error::PipelineError;
use super::months::DateMonth;
use super::opening::OpeningTable;
use super::types::{GameOutcome, GameRecord, Platform, SkipReason};
use super::visitor::{GameSource, parse_game};

/// A blank line followed by the `[Event` tag that opens the next game.
static GAME_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n[ \t]*\r?\n\[Event ").expect("valid game boundary regex"));

const EVENT_TAG_OPEN: &str = "[Event ";

#[derive(Debug, Deserialize)]
struct ChessComArchive {
    #[serde(default)]
    games: Vec<ChessComGame>,
}

#[derive(Debug, Deserialize)]
struct ChessComGame {
    url: Option<String>,
    pgn: Option<String>,
}

/// Per-archive counts of emitted and dropped games.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub emitted: usize,
    pub missing_pgn: usize,
    pub no_moves: usize,
    pub excluded_variant: usize,
    pub excluded_opponent: usize,
}

impl ParseStats {
    pub fn skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::MissingPgn => self.missing_pgn += 1,
            SkipReason::NoMoves => self.no_moves += 1,
            SkipReason::ExcludedVariant => self.excluded_variant += 1,
            SkipReason::ExcludedOpponent => self.excluded_opponent += 1,
        }
    }

    pub fn skipped(&self) -> usize {
        self.missing_pgn + self.no_moves + self.excluded_variant + self.excluded_opponent
    }

    pub fn merge(&mut self, other: ParseStats) {
        self.emitted += other.emitted;
        self.missing_pgn += other.missing_pgn;
        self.no_moves += other.no_moves;
        self.excluded_variant += other.excluded_variant;
        self.excluded_opponent += other.excluded_opponent;
    }
}

/// Identity of one monthly archive being parsed.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveContext<'a> {
    pub platform: Platform,
    pub username: &'a str,
    pub month: DateMonth,
}

fn handle_game<F>(
    pgn: &str,
    source: GameSource<'_>,
    openings: &OpeningTable,
    stats: &mut ParseStats,
    emit: &mut F,
) -> Result<(), PipelineError>
where
    F: FnMut(GameRecord) -> Result<(), PipelineError>,
{
    match parse_game(pgn, &source, openings)? {
        GameOutcome::Record(record) => {
            emit(record)?;
            stats.emitted += 1;
        }
        GameOutcome::Skipped(reason) => {
            debug!(
                platform = %source.platform,
                month = %source.month,
                ?reason,
                "skipping game"
            );
            stats.skip(reason);
        }
    }
    Ok(())
}

/// Parses a chess.com monthly archive (`{"games": [...]}`), handing every accepted
/// game to `emit` in archive order.
///
/// Entries without a `pgn` field are skipped. A body that is not an archive at all
/// is logged and yields no games.
pub fn parse_chesscom_archive<F>(
    body: &str,
    ctx: ArchiveContext<'_>,
    openings: &OpeningTable,
    mut emit: F,
) -> Result<ParseStats, PipelineError>
where
    F: FnMut(GameRecord) -> Result<(), PipelineError>,
{
    let mut stats = ParseStats::default();

    let archive: ChessComArchive = match serde_json::from_str(body) {
        Ok(archive) => archive,
        Err(e) => {
            warn!(
                platform = %ctx.platform,
                username = ctx.username,
                month = %ctx.month,
                error = %e,
                "archive is not valid JSON, ignoring it"
            );
            return Ok(stats);
        }
    };

    for game in &archive.games {
        let Some(pgn) = game.pgn.as_deref() else {
            stats.skip(SkipReason::MissingPgn);
            continue;
        };
        let source = GameSource {
            platform: ctx.platform,
            username: ctx.username,
            month: ctx.month,
            link: game.url.as_deref(),
        };
        handle_game(pgn, source, openings, &mut stats, &mut emit)?;
    }

    Ok(stats)
}

/// Splits a concatenated PGN export into one chunk per game.
pub fn split_lichess_games(body: &str) -> Vec<&str> {
    let mut games = Vec::new();
    let mut start = 0;

    for boundary in GAME_BOUNDARY.find_iter(body) {
        let next = boundary.end() - EVENT_TAG_OPEN.len();
        games.push(&body[start..next]);
        start = next;
    }
    games.push(&body[start..]);

    games.retain(|game| !game.trim().is_empty());
    games
}

/// Parses a lichess monthly PGN export, handing every accepted game to `emit` in
/// archive order. The `Site` tag supplies each game's link.
pub fn parse_lichess_archive<F>(
    body: &str,
    ctx: ArchiveContext<'_>,
    openings: &OpeningTable,
    mut emit: F,
) -> Result<ParseStats, PipelineError>
where
    F: FnMut(GameRecord) -> Result<(), PipelineError>,
{
    let mut stats = ParseStats::default();

    for pgn in split_lichess_games(body) {
        let source = GameSource {
            platform: ctx.platform,
            username: ctx.username,
            month: ctx.month,
            link: None,
        };
        handle_game(pgn, source, openings, &mut stats, &mut emit)?;
    }

    Ok(stats)
}

/// Dispatches on the archive's platform.
pub fn parse_archive<F>(
    body: &str,
    ctx: ArchiveContext<'_>,
    openings: &OpeningTable,
    emit: F,
) -> Result<ParseStats, PipelineError>
where
    F: FnMut(GameRecord) -> Result<(), PipelineError>,
{
    match ctx.platform {
        Platform::ChessCom => parse_chesscom_archive(body, ctx, openings, emit),
        Platform::Lichess => parse_lichess_archive(body, ctx, openings, emit),
    }
}
