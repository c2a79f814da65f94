use std::collections::HashMap;
use std::ops::ControlFlow;

use pgn_reader::{RawTag, Reader, Skip, Visitor};

use super::error::ClassificationError;
use super::months::DateMonth;
use super::opening::{OpeningTable, UNKNOWN_ECO};
use super::timecontrol::classify_time_control;
use super::types::{Color, GameOutcome, GameRecord, Platform, SkipReason, TimeControlCategory};

/// Variants whose games are dropped.
pub const EXCLUDED_VARIANTS: [&str; 4] = ["Atomic", "Horde", "Crazyhouse", "Chess960"];

const DEFAULT_VARIANT: &str = "Standard";

/// Player name prefix of the built-in lichess engine opponent (lowercased).
const LICHESS_AI_PREFIX: &str = "lichess ai";

/// Collects tag pairs of one game. A repeated key keeps its last value.
#[derive(Default)]
pub struct TagVisitor {
    tags: HashMap<String, String>,
}

impl TagVisitor {
    pub fn into_tags(self) -> HashMap<String, String> {
        self.tags
    }
}

impl Visitor for TagVisitor {
    type Tags = ();
    type Movetext = ();
    type Output = ();

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        self.tags.clear();
        ControlFlow::Continue(())
    }

    fn tag(
        &mut self,
        _: &mut Self::Tags,
        key: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        self.tags.insert(
            String::from_utf8_lossy(key).into_owned(),
            value.decode_utf8_lossy().into_owned(),
        );
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, _: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        ControlFlow::Continue(())
    }

    fn begin_variation(&mut self, _: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn end_game(&mut self, _: Self::Movetext) -> Self::Output {}
}

/// Tag pairs of a single game's PGN text.
///
/// Only the `[Key "Value"]` lines are handed to the reader; movetext is picked up
/// separately by [`move_line`].
pub fn read_tags(pgn: &str) -> HashMap<String, String> {
    let header: String = pgn
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('['))
        .flat_map(|line| [line, "\n"])
        .collect();

    let mut reader = Reader::new(header.as_bytes());
    let mut visitor = TagVisitor::default();
    match reader.read_game(&mut visitor) {
        Ok(_) => visitor.into_tags(),
        Err(_) => HashMap::new(),
    }
}

/// The single movetext line, i.e. the first line starting with `1.`.
pub fn move_line(pgn: &str) -> Option<&str> {
    pgn.lines()
        .map(str::trim)
        .find(|line| line.starts_with("1."))
}

/// Where a game came from and whose side to take.
#[derive(Debug, Clone, Copy)]
pub struct GameSource<'a> {
    pub platform: Platform,
    pub username: &'a str,
    pub month: DateMonth,
    /// Archive-level link. When absent the `Site` tag is used.
    pub link: Option<&'a str>,
}

fn non_empty(tags: &HashMap<String, String>, key: &str) -> Option<String> {
    tags.get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn is_lichess_ai(name: Option<&String>) -> bool {
    name.is_some_and(|n| n.trim().to_lowercase().starts_with(LICHESS_AI_PREFIX))
}

/// Turns the PGN text of exactly one game into a normalized record.
///
/// Games without movetext and filtered games come back as [`GameOutcome::Skipped`].
/// The only error is an ECO code the opening table cannot place.
pub fn parse_game(
    pgn: &str,
    source: &GameSource<'_>,
    openings: &OpeningTable,
) -> Result<GameOutcome, ClassificationError> {
    let Some(moves) = move_line(pgn) else {
        return Ok(GameOutcome::Skipped(SkipReason::NoMoves));
    };
    let tags = read_tags(pgn);

    let variant = non_empty(&tags, "Variant").unwrap_or_else(|| DEFAULT_VARIANT.to_string());
    if EXCLUDED_VARIANTS.contains(&variant.as_str()) {
        return Ok(GameOutcome::Skipped(SkipReason::ExcludedVariant));
    }

    if source.platform == Platform::Lichess
        && (is_lichess_ai(tags.get("White")) || is_lichess_ai(tags.get("Black")))
    {
        return Ok(GameOutcome::Skipped(SkipReason::ExcludedOpponent));
    }

    let username = source.username.to_lowercase();
    let color = match tags.get("White") {
        Some(white) if white.trim().to_lowercase() == username => Color::White,
        _ => Color::Black,
    };

    let eco = non_empty(&tags, "ECO").unwrap_or_else(|| UNKNOWN_ECO.to_string());
    let opening_family = openings.classify(&eco)?;

    let time_control = tags
        .get("TimeControl")
        .map(|tc| classify_time_control(tc))
        .unwrap_or(TimeControlCategory::NotAvailable);

    Ok(GameOutcome::Record(GameRecord {
        link: source
            .link
            .map(str::to_string)
            .or_else(|| non_empty(&tags, "Site")),
        date: source.month,
        color,
        elo: non_empty(&tags, &format!("{}Elo", color.as_str())),
        time_control,
        variant,
        termination: non_empty(&tags, "Termination"),
        result: non_empty(&tags, "Result"),
        opening_family,
        eco,
        moves: moves.to_string(),
    }))
}
