use super::types::TimeControlCategory;

/// Moves assumed for a typical game when turning an increment into clock time.
const ESTIMATED_MOVES: u64 = 30;

const BULLET_MAX_SECONDS: u64 = 120;
const BLITZ_MAX_SECONDS: u64 = 300;
const RAPID_MAX_SECONDS: u64 = 1800;

fn parse_u64(s: &str) -> Option<u64> {
    s.trim().parse().ok()
}

/// Estimated game duration in seconds for a PGN `TimeControl` value.
///
/// - `moves/seconds` (daily and correspondence): the seconds after the slash
/// - `base` or `base+increment`: `base + 30 * increment`
///
/// Returns `None` for `-` and anything that is not numeric.
pub fn estimated_duration_seconds(raw: &str) -> Option<u64> {
    let s = raw.trim();
    if s == "-" {
        return None;
    }

    if let Some((_, seconds)) = s.split_once('/') {
        return parse_u64(seconds);
    }

    match s.split_once('+') {
        Some((base, inc)) => {
            let base = parse_u64(base)?;
            let inc = parse_u64(inc)?;
            base.checked_add(ESTIMATED_MOVES.checked_mul(inc)?)
        }
        None => parse_u64(s),
    }
}

pub fn category_from_seconds(seconds: u64) -> TimeControlCategory {
    if seconds <= BULLET_MAX_SECONDS {
        TimeControlCategory::Bullet
    } else if seconds <= BLITZ_MAX_SECONDS {
        TimeControlCategory::Blitz
    } else if seconds <= RAPID_MAX_SECONDS {
        TimeControlCategory::Rapid
    } else {
        TimeControlCategory::Daily
    }
}

pub fn classify_time_control(raw: &str) -> TimeControlCategory {
    estimated_duration_seconds(raw)
        .map(category_from_seconds)
        .unwrap_or(TimeControlCategory::NotAvailable)
}
