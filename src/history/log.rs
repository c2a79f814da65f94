use std::env;

use tracing::Level;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "CHESS_LOG";

/// Maps a `CHESS_LOG` value to a level; unknown values mean `info`.
pub fn level_from_str(s: &str) -> Level {
    match s.trim().to_lowercase().as_str() {
        "error" | "err" => Level::ERROR,
        "warn" | "warning" => Level::WARN,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    }
}

/// Installs the stderr subscriber. Calling it twice is harmless.
pub fn init() {
    let level = env::var(LOG_ENV)
        .map(|s| level_from_str(&s))
        .unwrap_or(Level::INFO);
    let level = level.as_str().to_lowercase();
    let filter = EnvFilter::new(format!("chess_history={level},warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
