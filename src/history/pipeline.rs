use std::fs;

use tracing::{info, warn};

use super::cache::{ArchiveCache, ArchiveKey, DirectoryStore, NoRemoteStore, RemoteStore};
use super::config::RunConfig;
use super::error::PipelineError;
use super::fetch::{FetchSummary, GameFetcher, HttpClient};
use super::months::DateMonth;
use super::opening::OpeningTable;
use super::prefixes::PrefixWriter;
use super::reader::{ArchiveContext, ParseStats, parse_archive};
use super::types::{GameRecord, Platform};
use super::writer::SynthesisWriter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformSummary {
    pub platform: Platform,
    pub username: String,
    pub fetch: FetchSummary,
    pub parse: ParseStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub platforms: Vec<PlatformSummary>,
    /// Rows of the move-prefix table, zero when it is not requested.
    pub prefix_rows: usize,
}

impl RunSummary {
    pub fn rows(&self) -> usize {
        self.platforms.iter().map(|p| p.parse.emitted).sum()
    }
}

/// The tables every accepted game is written to.
pub struct RunOutput {
    pub games: SynthesisWriter,
    pub prefixes: Option<PrefixWriter>,
}

impl RunOutput {
    /// Truncates the configured tables and writes their headers.
    pub fn create(config: &RunConfig) -> Result<Self, PipelineError> {
        let games = SynthesisWriter::create(&config.output)?;
        let prefixes = match &config.prefixes_output {
            Some(path) => Some(PrefixWriter::create(path)?),
            None => None,
        };
        Ok(Self { games, prefixes })
    }

    pub fn append(&mut self, record: &GameRecord) -> Result<(), PipelineError> {
        self.games.append(record)?;
        if let Some(prefixes) = self.prefixes.as_mut() {
            prefixes.append(record)?;
        }
        Ok(())
    }
}

/// Fetch, parse and write for every configured user, one platform after the other.
pub struct Pipeline<'a> {
    config: &'a RunConfig,
    client: &'a dyn HttpClient,
    cache: ArchiveCache,
    openings: OpeningTable,
}

impl<'a> Pipeline<'a> {
    /// Fails on an invalid config or an incomplete opening table, before any I/O.
    pub fn new(config: &'a RunConfig, client: &'a dyn HttpClient) -> Result<Self, PipelineError> {
        config.validate()?;
        let openings = OpeningTable::validated()?;

        let remote: Box<dyn RemoteStore> = match &config.remote_cache {
            Some(dir) => Box::new(DirectoryStore::new(dir)),
            None => Box::new(NoRemoteStore),
        };

        Ok(Self {
            config,
            client,
            cache: ArchiveCache::new(&config.cache_dir, remote),
            openings,
        })
    }

    pub fn run(&self) -> Result<RunSummary, PipelineError> {
        let mut output = RunOutput::create(self.config)?;
        let mut summary = RunSummary::default();

        for (platform, username) in self.config.users() {
            let fetch = self.fetch(platform, username);
            let parse = self.synthesize(platform, username, &mut output)?;

            info!(
                %platform,
                username,
                rows = parse.emitted,
                skipped = parse.skipped(),
                months_failed = fetch.failed,
                "finished platform"
            );
            summary.platforms.push(PlatformSummary {
                platform,
                username: username.to_string(),
                fetch,
                parse,
            });
        }

        if let Some(prefixes) = &output.prefixes {
            summary.prefix_rows = prefixes.rows();
            info!(
                rows = summary.prefix_rows,
                output = %prefixes.path().display(),
                "wrote move prefixes"
            );
        }
        info!(
            rows = summary.rows(),
            output = %output.games.path().display(),
            "run complete"
        );
        Ok(summary)
    }

    /// Makes sure every requested month has a local archive where possible.
    pub fn fetch(&self, platform: Platform, username: &str) -> FetchSummary {
        GameFetcher::new(self.client, &self.cache, &self.config.endpoints).fetch(
            platform,
            username,
            &self.config.months(),
        )
    }

    fn months_to_parse(
        &self,
        platform: Platform,
        username: &str,
    ) -> Result<Vec<DateMonth>, PipelineError> {
        if self.config.all_cached {
            Ok(self.cache.cached_months(platform, username)?)
        } else {
            Ok(self.config.months().iter().collect())
        }
    }

    /// Parses the user's local archives in month order and appends the accepted games to
    /// every table of `output`.
    pub fn synthesize(
        &self,
        platform: Platform,
        username: &str,
        output: &mut RunOutput,
    ) -> Result<ParseStats, PipelineError> {
        let mut total = ParseStats::default();

        for month in self.months_to_parse(platform, username)? {
            let path = self.cache.local_path(&ArchiveKey::new(platform, username, month));
            if !path.is_file() {
                warn!(%platform, username, %month, "no archive for month");
                continue;
            }

            let bytes = fs::read(&path).map_err(|source| PipelineError::Archive {
                path: path.clone(),
                source,
            })?;
            let body = String::from_utf8_lossy(&bytes);
            let ctx = ArchiveContext {
                platform,
                username,
                month,
            };

            let stats =
                parse_archive(&body, ctx, &self.openings, |record| output.append(&record))?;
            total.merge(stats);
        }

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::fetch::Endpoints;
    use crate::history::fetch::tests::FakeClient;
    use std::path::Path;

    fn ym(year: i32, month: u32) -> DateMonth {
        DateMonth::new(year, month).unwrap()
    }

    fn config(dir: &Path, chesscom: Option<&str>, lichess: Option<&str>) -> RunConfig {
        let mut config = RunConfig::new(
            "2024-01",
            Some("2024-02"),
            chesscom.map(str::to_string),
            lichess.map(str::to_string),
        )
        .unwrap();
        config.cache_dir = dir.join("pgn-cache");
        config.output = dir.join("games.tsv");
        config
    }

    fn seed(config: &RunConfig, key: &ArchiveKey, body: &str) {
        let path = config.cache_dir.join(key.relative_path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    fn output_rows(config: &RunConfig) -> Vec<Vec<String>> {
        fs::read_to_string(&config.output)
            .unwrap()
            .lines()
            .skip(1)
            .map(|line| line.split('\t').map(str::to_string).collect())
            .collect()
    }

    fn chesscom_archive() -> String {
        serde_json::json!({
            "games": [
                {
                    "url": "https://www.chess.com/game/live/1",
                    "pgn": "[Event \"Live Chess\"]\n[White \"Alice\"]\n[Black \"Bob\"]\n[Result \"1-0\"]\n[Variant \"Chess960\"]\n[TimeControl \"180\"]\n\n1. e4 e5 1-0\n"
                },
                {
                    "url": "https://www.chess.com/game/live/2",
                    "pgn": "[Event \"Live Chess\"]\n[White \"Alice\"]\n[Black \"Bob\"]\n[Result \"1-0\"]\n[WhiteElo \"1234\"]\n[TimeControl \"180+1\"]\n[ECO \"C50\"]\n[Termination \"Alice won by checkmate\"]\n\n1. e4 e5 2. Nf3 Nc6 3. Bc4 1-0\n"
                }
            ]
        })
        .to_string()
    }

    #[test]
    fn test_end_to_end_seeded_chesscom_archive() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), Some("alice"), None);
        config.end = config.start;
        seed(
            &config,
            &ArchiveKey::new(Platform::ChessCom, "alice", ym(2024, 1)),
            &chesscom_archive(),
        );
        let client = FakeClient::default();

        let summary = Pipeline::new(&config, &client).unwrap().run().unwrap();

        assert_eq!(client.request_count(), 0);
        assert_eq!(summary.rows(), 1);
        let rows = output_rows(&config);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row[0], "https://www.chess.com/game/live/2");
        assert_eq!(row[1], "2024-01");
        assert_eq!(row[2], "White");
        assert_eq!(row[3], "1234");
        assert_eq!(row[4], "Blitz");
        assert_eq!(row[5], "Standard");
        assert_eq!(row[6], "Alice won by checkmate");
        assert_eq!(row[7], "1-0");
        assert_eq!(row[8], "Italian game");
        assert_eq!(row[9], "C50");
        assert_eq!(row[10], "1. e4 e5 2. Nf3 Nc6 3. Bc4 1-0");
    }

    #[test]
    fn test_prefix_table_written_from_same_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), Some("alice"), None);
        config.end = config.start;
        config.prefixes_output = Some(dir.path().join("prefixes.tsv"));
        seed(
            &config,
            &ArchiveKey::new(Platform::ChessCom, "alice", ym(2024, 1)),
            &chesscom_archive(),
        );
        let client = FakeClient::default();

        let summary = Pipeline::new(&config, &client).unwrap().run().unwrap();

        // "1. e4 e5 2. Nf3 Nc6 3. Bc4 1-0" has nine tokens.
        assert_eq!(summary.prefix_rows, 9);
        let text = fs::read_to_string(dir.path().join("prefixes.tsv")).unwrap();
        let rows: Vec<Vec<&str>> = text.lines().skip(1).map(|l| l.split('\t').collect()).collect();
        assert_eq!(rows.len(), 9);
        assert!(rows.iter().all(|r| r[0] == "https://www.chess.com/game/live/2"));
        assert_eq!(rows[0][11], "1.");
        assert_eq!(rows[8][11], "1. e4 e5 2. Nf3 Nc6 3. Bc4 1-0");
        assert_eq!(rows[8][12], "30");
    }

    #[test]
    fn test_prefix_table_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), Some("alice"), None);
        config.end = config.start;
        let client = FakeClient::default();

        let summary = Pipeline::new(&config, &client).unwrap().run().unwrap();

        assert_eq!(summary.prefix_rows, 0);
        assert!(!dir.path().join("prefixes.tsv").exists());
    }

    #[test]
    fn test_rows_follow_month_order_and_second_run_is_offline() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), None, Some("alice"));
        let endpoints = Endpoints::default();
        let jan = "[Event \"a\"]\n[Site \"https://lichess.org/jan\"]\n[White \"alice\"]\n[Black \"bob\"]\n[TimeControl \"60+0\"]\n[ECO \"B01\"]\n\n1. e4 d5 *\n";
        let feb = "[Event \"b\"]\n[Site \"https://lichess.org/feb\"]\n[White \"bob\"]\n[Black \"alice\"]\n[TimeControl \"900+10\"]\n[ECO \"D35\"]\n\n1. d4 d5 *\n";
        let client = FakeClient::default()
            .with(endpoints.month_url(Platform::Lichess, "alice", ym(2024, 1)), jan)
            .with(endpoints.month_url(Platform::Lichess, "alice", ym(2024, 2)), feb);

        let first = Pipeline::new(&config, &client).unwrap().run().unwrap();
        assert_eq!(client.request_count(), 2);
        assert_eq!(first.platforms[0].fetch.downloaded, 2);
        let rows = output_rows(&config);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "https://lichess.org/jan");
        assert_eq!(rows[0][8], "Scandinavian defence");
        assert_eq!(rows[1][0], "https://lichess.org/feb");
        assert_eq!(rows[1][2], "Black");
        assert_eq!(rows[1][4], "Rapid");

        let second = Pipeline::new(&config, &client).unwrap().run().unwrap();
        assert_eq!(client.request_count(), 2);
        assert_eq!(second.platforms[0].fetch.cached, 2);
        assert_eq!(output_rows(&config), rows);
    }

    #[test]
    fn test_failed_month_does_not_stop_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), Some("alice"), None);
        let endpoints = Endpoints::default();
        let client = FakeClient::default()
            .failing(endpoints.month_url(Platform::ChessCom, "alice", ym(2024, 1)), 429)
            .with(
                endpoints.month_url(Platform::ChessCom, "alice", ym(2024, 2)),
                &chesscom_archive(),
            );

        let summary = Pipeline::new(&config, &client).unwrap().run().unwrap();

        assert_eq!(summary.platforms[0].fetch.failed, 1);
        assert_eq!(summary.platforms[0].fetch.downloaded, 1);
        let rows = output_rows(&config);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1], "2024-02");
    }

    #[test]
    fn test_unknown_eco_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), None, Some("alice"));
        seed(
            &config,
            &ArchiveKey::new(Platform::Lichess, "alice", ym(2024, 1)),
            "[Event \"a\"]\n[White \"alice\"]\n[ECO \"Q12\"]\n\n1. e4 *\n",
        );
        seed(
            &config,
            &ArchiveKey::new(Platform::Lichess, "alice", ym(2024, 2)),
            "",
        );
        let client = FakeClient::default();

        let err = Pipeline::new(&config, &client).unwrap().run().unwrap_err();
        assert!(matches!(err, PipelineError::Classification(ref e) if e.code == "Q12"));
    }

    #[test]
    fn test_invalid_config_fails_before_network() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), Some("alice"), None);
        config.chesscom_user = None;
        let client = FakeClient::default();

        assert!(matches!(
            Pipeline::new(&config, &client),
            Err(PipelineError::Config(_))
        ));
        assert_eq!(client.request_count(), 0);
        assert!(!config.output.exists());
    }

    #[test]
    fn test_all_cached_parses_months_outside_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), None, Some("alice"));
        config.all_cached = true;
        for (month, site) in [(ym(2023, 6), "old"), (ym(2024, 1), "jan"), (ym(2024, 2), "feb")] {
            seed(
                &config,
                &ArchiveKey::new(Platform::Lichess, "alice", month),
                &format!("[Event \"x\"]\n[Site \"{site}\"]\n[White \"alice\"]\n\n1. e4 *\n"),
            );
        }
        let client = FakeClient::default();

        Pipeline::new(&config, &client).unwrap().run().unwrap();

        let sites: Vec<String> = output_rows(&config).into_iter().map(|r| r[0].clone()).collect();
        assert_eq!(sites, vec!["old", "jan", "feb"]);
        assert_eq!(client.request_count(), 0);
    }

    #[test]
    fn test_remote_cache_hit_avoids_download() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), Some("alice"), None);
        config.end = config.start;
        let remote = dir.path().join("remote");
        let key = ArchiveKey::new(Platform::ChessCom, "alice", ym(2024, 1));
        let remote_path = remote.join(key.relative_path());
        fs::create_dir_all(remote_path.parent().unwrap()).unwrap();
        fs::write(&remote_path, chesscom_archive()).unwrap();
        config.remote_cache = Some(remote);
        let client = FakeClient::default();

        let summary = Pipeline::new(&config, &client).unwrap().run().unwrap();

        assert_eq!(client.request_count(), 0);
        assert_eq!(summary.platforms[0].fetch.cached, 1);
        assert_eq!(summary.rows(), 1);
    }
}
