use std::path::PathBuf;

use chrono::Utc;

use super::error::ConfigError;
use super::fetch::Endpoints;
use super::months::{DateMonth, MonthRange};
use super::types::Platform;

pub const DEFAULT_CACHE_DIR: &str = "pgn-cache";
pub const DEFAULT_OUTPUT: &str = "games.tsv";

/// Everything one run needs. Built once at startup and passed down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub start: DateMonth,
    pub end: DateMonth,
    pub chesscom_user: Option<String>,
    pub lichess_user: Option<String>,
    pub cache_dir: PathBuf,
    pub output: PathBuf,
    /// Second table with every game exploded into its move prefixes.
    pub prefixes_output: Option<PathBuf>,
    /// Managed folder used as the shared archive store.
    pub remote_cache: Option<PathBuf>,
    /// Parse every cached month of each user instead of just `start..=end`.
    pub all_cached: bool,
    pub endpoints: Endpoints,
}

fn non_blank(user: Option<String>) -> Option<String> {
    user.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
}

impl RunConfig {
    /// Builds a config with default paths from the raw month texts and usernames.
    /// `end` defaults to the current UTC month.
    pub fn new(
        start: &str,
        end: Option<&str>,
        chesscom_user: Option<String>,
        lichess_user: Option<String>,
    ) -> Result<Self, ConfigError> {
        let start: DateMonth = start.parse()?;
        let end = match end {
            Some(end) => end.parse()?,
            None => DateMonth::of(Utc::now().date_naive()),
        };

        let config = Self {
            start,
            end,
            chesscom_user: non_blank(chesscom_user),
            lichess_user: non_blank(lichess_user),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            output: PathBuf::from(DEFAULT_OUTPUT),
            prefixes_output: None,
            remote_cache: None,
            all_cached: false,
            endpoints: Endpoints::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chesscom_user.is_none() && self.lichess_user.is_none() {
            return Err(ConfigError::NoUsername);
        }
        if self.start > self.end {
            return Err(ConfigError::StartAfterEnd {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn months(&self) -> MonthRange {
        MonthRange::new(self.start, self.end)
    }

    /// Platforms with a username, chess.com first.
    pub fn users(&self) -> Vec<(Platform, &str)> {
        [
            (Platform::ChessCom, self.chesscom_user.as_deref()),
            (Platform::Lichess, self.lichess_user.as_deref()),
        ]
        .into_iter()
        .filter_map(|(platform, user)| user.map(|u| (platform, u)))
        .collect()
    }
}
