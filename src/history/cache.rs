use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::error::CacheError;
use super::months::DateMonth;
use super::types::Platform;

pub const ARCHIVE_EXTENSION: &str = "pgn";

/// Addresses one raw monthly archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveKey {
    pub platform: Platform,
    pub username: String,
    pub month: DateMonth,
}

impl ArchiveKey {
    pub fn new(platform: Platform, username: &str, month: DateMonth) -> Self {
        Self {
            platform,
            username: username.to_string(),
            month,
        }
    }

    /// `<platform>/<username>/<username>-<YYYY>-<MM>.pgn`
    pub fn relative_path(&self) -> PathBuf {
        Self::user_dir(self.platform, &self.username).join(format!(
            "{}-{}.{}",
            self.username, self.month, ARCHIVE_EXTENSION
        ))
    }

    fn user_dir(platform: Platform, username: &str) -> PathBuf {
        Path::new(platform.cache_name()).join(username)
    }
}

/// Path of the in-progress file that is renamed over `path` once complete.
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Copies `src` to `dest` through a `.part` file so `dest` is never seen half written.
fn copy_atomically(src: &Path, dest: &Path) -> Result<(), CacheError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let part = partial_path(dest);
    fs::copy(src, &part).map_err(io_error(src))?;
    fs::rename(&part, dest).map_err(io_error(dest))
}

/// Shared store of archives that outlives the local cache folder.
pub trait RemoteStore {
    fn contains(&self, key: &ArchiveKey) -> Result<bool, CacheError>;

    fn download(&self, key: &ArchiveKey, dest: &Path) -> Result<(), CacheError>;

    fn upload(&self, key: &ArchiveKey, src: &Path) -> Result<(), CacheError>;
}

/// No shared store; everything is a miss.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRemoteStore;

impl RemoteStore for NoRemoteStore {
    fn contains(&self, _: &ArchiveKey) -> Result<bool, CacheError> {
        Ok(false)
    }

    fn download(&self, key: &ArchiveKey, _: &Path) -> Result<(), CacheError> {
        let path = key.relative_path();
        Err(CacheError::Io {
            path,
            source: io::Error::new(io::ErrorKind::NotFound, "no remote store configured"),
        })
    }

    fn upload(&self, _: &ArchiveKey, _: &Path) -> Result<(), CacheError> {
        Ok(())
    }
}

/// A managed folder (network share, synced directory) with the same layout as the
/// local cache.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, key: &ArchiveKey) -> PathBuf {
        self.root.join(key.relative_path())
    }
}

impl RemoteStore for DirectoryStore {
    fn contains(&self, key: &ArchiveKey) -> Result<bool, CacheError> {
        let path = self.path(key);
        match fs::metadata(&path) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CacheError::Io { path, source }),
        }
    }

    fn download(&self, key: &ArchiveKey, dest: &Path) -> Result<(), CacheError> {
        copy_atomically(&self.path(key), dest)
    }

    fn upload(&self, key: &ArchiveKey, src: &Path) -> Result<(), CacheError> {
        copy_atomically(src, &self.path(key))
    }
}

/// Local archive folder backed by an optional remote store. Local presence is checked
/// first; once a file is on disk no store or network access happens for its key.
pub struct ArchiveCache {
    root: PathBuf,
    remote: Box<dyn RemoteStore>,
}

impl ArchiveCache {
    pub fn new(root: impl Into<PathBuf>, remote: Box<dyn RemoteStore>) -> Self {
        Self {
            root: root.into(),
            remote,
        }
    }

    pub fn local_only(root: impl Into<PathBuf>) -> Self {
        Self::new(root, Box::new(NoRemoteStore))
    }

    pub fn local_path(&self, key: &ArchiveKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    pub fn is_local(&self, key: &ArchiveKey) -> bool {
        self.local_path(key).is_file()
    }

    /// Whether the remote store has `key`. Store failures count as a miss.
    pub fn exists(&self, key: &ArchiveKey) -> bool {
        match self.remote.contains(key) {
            Ok(found) => found,
            Err(e) => {
                warn!(
                    platform = %key.platform,
                    username = %key.username,
                    month = %key.month,
                    error = %e,
                    "remote cache check failed, treating as miss"
                );
                false
            }
        }
    }

    /// Copies the remote entry for `key` to its local path.
    pub fn fetch_into_local(&self, key: &ArchiveKey) -> Result<(), CacheError> {
        self.remote.download(key, &self.local_path(key))
    }

    /// Makes sure `key` is on local disk without going to the game server.
    /// Returns `false` when the archive has to be downloaded.
    pub fn ensure_local(&self, key: &ArchiveKey) -> bool {
        if self.is_local(key) {
            return true;
        }
        if !self.exists(key) {
            return false;
        }
        match self.fetch_into_local(key) {
            Ok(()) => {
                debug!(
                    platform = %key.platform,
                    username = %key.username,
                    month = %key.month,
                    "restored archive from remote cache"
                );
                true
            }
            Err(e) => {
                warn!(
                    platform = %key.platform,
                    username = %key.username,
                    month = %key.month,
                    error = %e,
                    "remote cache download failed"
                );
                false
            }
        }
    }

    /// Pushes a freshly downloaded archive to the remote store. Failures are logged.
    pub fn publish(&self, key: &ArchiveKey) {
        if let Err(e) = self.remote.upload(key, &self.local_path(key)) {
            warn!(
                platform = %key.platform,
                username = %key.username,
                month = %key.month,
                error = %e,
                "remote cache upload failed"
            );
        }
    }

    /// Months with an archive on local disk for `username`, ascending.
    pub fn cached_months(
        &self,
        platform: Platform,
        username: &str,
    ) -> Result<Vec<DateMonth>, CacheError> {
        let dir = self.root.join(ArchiveKey::user_dir(platform, username));
        let pattern = format!(
            "{}/{}-*.{}",
            glob::Pattern::escape(&dir.to_string_lossy()),
            glob::Pattern::escape(username),
            ARCHIVE_EXTENSION
        );

        let prefix = format!("{username}-");
        let suffix = format!(".{ARCHIVE_EXTENSION}");
        let mut months: Vec<DateMonth> = glob::glob(&pattern)?
            .filter_map(Result::ok)
            .filter(|path| path.is_file())
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?.to_string();
                name.strip_prefix(&prefix)?
                    .strip_suffix(&suffix)?
                    .parse::<DateMonth>()
                    .ok()
            })
            .collect();

        months.sort_unstable();
        months.dedup();
        Ok(months)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(year: i32, month: u32) -> DateMonth {
        DateMonth::new(year, month).unwrap()
    }

    fn write(path: &Path, body: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn test_relative_path_layout() {
        let key = ArchiveKey::new(Platform::ChessCom, "alice", ym(2024, 3));
        assert_eq!(
            key.relative_path(),
            PathBuf::from("chess.com/alice/alice-2024-03.pgn")
        );
        let key = ArchiveKey::new(Platform::Lichess, "bob", ym(2023, 11));
        assert_eq!(
            key.relative_path(),
            PathBuf::from("lichess/bob/bob-2023-11.pgn")
        );
    }

    #[test]
    fn test_local_hit_skips_remote() {
        struct PanickingStore;
        impl RemoteStore for PanickingStore {
            fn contains(&self, _: &ArchiveKey) -> Result<bool, CacheError> {
                panic!("remote consulted")
            }
            fn download(&self, _: &ArchiveKey, _: &Path) -> Result<(), CacheError> {
                panic!("remote consulted")
            }
            fn upload(&self, _: &ArchiveKey, _: &Path) -> Result<(), CacheError> {
                panic!("remote consulted")
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let cache = ArchiveCache::new(dir.path(), Box::new(PanickingStore));
        let key = ArchiveKey::new(Platform::Lichess, "alice", ym(2024, 1));
        write(&cache.local_path(&key), "cached");

        assert!(cache.ensure_local(&key));
    }

    #[test]
    fn test_remote_hit_is_copied_locally() {
        let local = tempfile::tempdir().unwrap();
        let remote = tempfile::tempdir().unwrap();
        let key = ArchiveKey::new(Platform::ChessCom, "alice", ym(2024, 2));
        write(&remote.path().join(key.relative_path()), "{\"games\":[]}");

        let cache = ArchiveCache::new(local.path(), Box::new(DirectoryStore::new(remote.path())));
        assert!(!cache.is_local(&key));
        assert!(cache.exists(&key));
        assert!(cache.ensure_local(&key));
        assert_eq!(
            fs::read_to_string(cache.local_path(&key)).unwrap(),
            "{\"games\":[]}"
        );
        assert!(!partial_path(&cache.local_path(&key)).exists());
    }

    #[test]
    fn test_remote_miss() {
        let local = tempfile::tempdir().unwrap();
        let remote = tempfile::tempdir().unwrap();
        let cache = ArchiveCache::new(local.path(), Box::new(DirectoryStore::new(remote.path())));
        let key = ArchiveKey::new(Platform::ChessCom, "alice", ym(2024, 2));
        assert!(!cache.exists(&key));
        assert!(!cache.ensure_local(&key));
    }

    #[test]
    fn test_remote_failure_is_a_miss() {
        struct BrokenStore;
        impl RemoteStore for BrokenStore {
            fn contains(&self, key: &ArchiveKey) -> Result<bool, CacheError> {
                Err(CacheError::Io {
                    path: key.relative_path(),
                    source: io::Error::other("unreachable"),
                })
            }
            fn download(&self, _: &ArchiveKey, _: &Path) -> Result<(), CacheError> {
                unreachable!()
            }
            fn upload(&self, _: &ArchiveKey, _: &Path) -> Result<(), CacheError> {
                unreachable!()
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let cache = ArchiveCache::new(dir.path(), Box::new(BrokenStore));
        let key = ArchiveKey::new(Platform::Lichess, "alice", ym(2024, 1));
        assert!(!cache.exists(&key));
        assert!(!cache.ensure_local(&key));
    }

    #[test]
    fn test_publish_uploads_to_directory_store() {
        let local = tempfile::tempdir().unwrap();
        let remote = tempfile::tempdir().unwrap();
        let cache = ArchiveCache::new(local.path(), Box::new(DirectoryStore::new(remote.path())));
        let key = ArchiveKey::new(Platform::Lichess, "alice", ym(2024, 4));
        write(&cache.local_path(&key), "[Event \"x\"]");

        cache.publish(&key);

        assert_eq!(
            fs::read_to_string(remote.path().join(key.relative_path())).unwrap(),
            "[Event \"x\"]"
        );
    }

    #[test]
    fn test_cached_months_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArchiveCache::local_only(dir.path());
        for month in [ym(2024, 2), ym(2023, 12), ym(2024, 1)] {
            let key = ArchiveKey::new(Platform::Lichess, "alice", month);
            write(&cache.local_path(&key), "");
        }
        let user_dir = dir.path().join("lichess/alice");
        write(&user_dir.join("alice-2024-05.pgn.part"), "");
        write(&user_dir.join("alice-notes.pgn"), "");
        write(&user_dir.join("alice-2024-13.pgn"), "");

        assert_eq!(
            cache.cached_months(Platform::Lichess, "alice").unwrap(),
            vec![ym(2023, 12), ym(2024, 1), ym(2024, 2)]
        );
        assert!(cache.cached_months(Platform::ChessCom, "alice").unwrap().is_empty());
    }
}
