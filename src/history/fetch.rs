use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use tracing::{debug, info, warn};

use super::cache::{ArchiveCache, ArchiveKey, partial_path};
use super::error::{ConfigError, FetchError};
use super::months::{DateMonth, MonthRange};
use super::types::Platform;

pub const DEFAULT_CHESSCOM_BASE: &str = "https://api.chess.com";
pub const DEFAULT_LICHESS_BASE: &str = "https://lichess.org";

const USER_AGENT: &str = concat!("chess-history/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Lichess exports are copied to disk this many bytes at a time.
const STREAM_CHUNK_BYTES: usize = 64 * 1024;

/// Blocking HTTP GET. Implementations return the body of a 2xx response and map
/// everything else to an error.
pub trait HttpClient {
    fn get(&self, url: &str) -> Result<Box<dyn Read>, FetchError>;
}

pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            // Month-long exports stream for a while; no total deadline.
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Box<dyn Read>, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(FetchError::Status {
                status: resp.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(Box::new(resp))
    }
}

/// Base URLs of the two game servers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    chesscom_base: Url,
    lichess_base: Url,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            chesscom_base: Url::parse(DEFAULT_CHESSCOM_BASE).expect("valid chess.com base URL"),
            lichess_base: Url::parse(DEFAULT_LICHESS_BASE).expect("valid lichess base URL"),
        }
    }
}

fn base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        message,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(invalid("not a hierarchical URL".to_string()));
    }
    Ok(url)
}

impl Endpoints {
    pub fn new(chesscom_base: &str, lichess_base: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            chesscom_base: base_url(chesscom_base)?,
            lichess_base: base_url(lichess_base)?,
        })
    }

    /// Archive URL of one user month. The username is a single percent-encoded path
    /// segment.
    pub fn month_url(&self, platform: Platform, username: &str, month: DateMonth) -> String {
        let year = format!("{:04}", month.year());
        let month_number = format!("{:02}", month.month());

        let mut url = match platform {
            Platform::ChessCom => self.chesscom_base.clone(),
            Platform::Lichess => self.lichess_base.clone(),
        };
        // Bases are checked to be hierarchical, so the path is always editable.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            match platform {
                Platform::ChessCom => {
                    segments.extend([
                        "pub",
                        "player",
                        username,
                        "games",
                        year.as_str(),
                        month_number.as_str(),
                    ]);
                }
                Platform::Lichess => {
                    segments.extend(["api", "games", "user", username]);
                }
            }
        }

        if platform == Platform::Lichess {
            let (since, until) = month.millis_bounds();
            url.query_pairs_mut()
                .append_pair("since", &since.to_string())
                .append_pair("until", &until.to_string())
                .append_pair("pgnInJson", "false")
                .append_pair("clocks", "true")
                .append_pair("evals", "true");
        }
        url.into()
    }
}

/// What happened to the months of one fetch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub cached: usize,
    pub downloaded: usize,
    pub failed: usize,
}

/// Downloads monthly archives that are not cached yet. One attempt per month; a
/// failed month is logged and skipped.
pub struct GameFetcher<'a> {
    client: &'a dyn HttpClient,
    cache: &'a ArchiveCache,
    endpoints: &'a Endpoints,
}

impl<'a> GameFetcher<'a> {
    pub fn new(
        client: &'a dyn HttpClient,
        cache: &'a ArchiveCache,
        endpoints: &'a Endpoints,
    ) -> Self {
        Self {
            client,
            cache,
            endpoints,
        }
    }

    pub fn fetch(&self, platform: Platform, username: &str, months: &MonthRange) -> FetchSummary {
        let mut summary = FetchSummary::default();

        for month in months {
            let key = ArchiveKey::new(platform, username, month);
            if self.cache.ensure_local(&key) {
                debug!(%platform, username, %month, "archive already cached");
                summary.cached += 1;
                continue;
            }

            match self.download(&key) {
                Ok(bytes) => {
                    info!(%platform, username, %month, bytes, "downloaded archive");
                    self.cache.publish(&key);
                    summary.downloaded += 1;
                }
                Err(e) => {
                    warn!(%platform, username, %month, error = %e, "skipping month");
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    fn download(&self, key: &ArchiveKey) -> Result<u64, FetchError> {
        let url = self.endpoints.month_url(key.platform, &key.username, key.month);
        let dest = self.cache.local_path(key);
        let body = self.client.get(&url)?;

        let part = partial_path(&dest);
        let written = match key.platform {
            Platform::ChessCom => write_whole(body, &part),
            Platform::Lichess => write_streamed(body, &part),
        };

        let finished = written.and_then(|bytes| {
            fs::rename(&part, &dest).map_err(|source| FetchError::Io {
                path: dest.clone(),
                source,
            })?;
            Ok(bytes)
        });
        if finished.is_err() {
            let _ = fs::remove_file(&part);
        }
        finished
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> FetchError {
    let path: PathBuf = path.to_path_buf();
    move |source| FetchError::Io { path, source }
}

fn create_file(path: &Path) -> Result<File, FetchError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    File::create(path).map_err(io_error(path))
}

/// Buffers the whole response and writes it verbatim.
fn write_whole(mut body: Box<dyn Read>, path: &Path) -> Result<u64, FetchError> {
    let mut buf = Vec::new();
    body.read_to_end(&mut buf).map_err(io_error(path))?;
    let mut file = create_file(path)?;
    file.write_all(&buf).map_err(io_error(path))?;
    Ok(buf.len() as u64)
}

/// Copies the response to disk in fixed-size chunks.
fn write_streamed(mut body: Box<dyn Read>, path: &Path) -> Result<u64, FetchError> {
    let mut file = create_file(path)?;
    let mut chunk = vec![0u8; STREAM_CHUNK_BYTES];
    let mut total = 0u64;

    loop {
        let n = match body.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(io_error(path)(e)),
        };
        file.write_all(&chunk[..n]).map_err(io_error(path))?;
        total += n as u64;
    }

    file.flush().map_err(io_error(path))?;
    Ok(total)
}
