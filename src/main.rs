use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use chess_history::history::config::{DEFAULT_CACHE_DIR, DEFAULT_OUTPUT};
use chess_history::history::fetch::{
    DEFAULT_CHESSCOM_BASE, DEFAULT_LICHESS_BASE, Endpoints, ReqwestClient,
};
use chess_history::history::log;
use chess_history::{Pipeline, RunConfig};

/// Fetch chess.com and lichess game history into a flat game table.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// First month to fetch (YYYY-MM)
    #[arg(long, env = "CHESS_HISTORY_START")]
    start: String,

    /// Last month to fetch (YYYY-MM), defaults to the current month
    #[arg(long, env = "CHESS_HISTORY_END")]
    end: Option<String>,

    /// chess.com username
    #[arg(long, env = "CHESS_HISTORY_CHESSCOM")]
    chesscom: Option<String>,

    /// lichess username
    #[arg(long, env = "CHESS_HISTORY_LICHESS")]
    lichess: Option<String>,

    /// Local archive cache folder
    #[arg(
        long,
        env = "CHESS_HISTORY_CACHE_DIR",
        default_value = DEFAULT_CACHE_DIR
    )]
    cache_dir: PathBuf,

    /// Output table (tab-delimited), truncated at start
    #[arg(short, long, env = "CHESS_HISTORY_OUTPUT", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Also write every game exploded into its first move prefixes (tab-delimited)
    #[arg(long, env = "CHESS_HISTORY_PREFIXES")]
    prefixes: Option<PathBuf>,

    /// Shared folder mirroring the archive cache
    #[arg(long, env = "CHESS_HISTORY_REMOTE_CACHE")]
    remote_cache: Option<PathBuf>,

    /// Parse every cached month instead of only --start..--end
    #[arg(long)]
    all_cached: bool,

    #[arg(
        long,
        env = "CHESS_HISTORY_CHESSCOM_URL",
        default_value = DEFAULT_CHESSCOM_BASE,
        hide = true
    )]
    chesscom_base_url: String,

    #[arg(
        long,
        env = "CHESS_HISTORY_LICHESS_URL",
        default_value = DEFAULT_LICHESS_BASE,
        hide = true
    )]
    lichess_base_url: String,
}

impl Cli {
    fn into_config(self) -> Result<RunConfig> {
        let mut config =
            RunConfig::new(&self.start, self.end.as_deref(), self.chesscom, self.lichess)?;
        config.cache_dir = self.cache_dir;
        config.output = self.output;
        config.prefixes_output = self.prefixes;
        config.remote_cache = self.remote_cache;
        config.all_cached = self.all_cached;
        config.endpoints = Endpoints::new(&self.chesscom_base_url, &self.lichess_base_url)?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    log::init();

    let config = Cli::parse().into_config()?;
    info!(
        start = %config.start,
        end = %config.end,
        cache = %config.cache_dir.display(),
        "starting run"
    );

    let client = ReqwestClient::new().context("building HTTP client")?;
    let summary = Pipeline::new(&config, &client)?.run()?;

    for platform in &summary.platforms {
        println!(
            "{}\t{}\t{} rows\t{} skipped\t{} months failed",
            platform.platform,
            platform.username,
            platform.parse.emitted,
            platform.parse.skipped(),
            platform.fetch.failed
        );
    }
    if let Some(path) = &config.prefixes_output {
        println!("prefixes\t{}\t{} rows", path.display(), summary.prefix_rows);
    }
    Ok(())
}
