//! Compiler binary acquisition: fetch a version list from a canonical
//! mirror, cache binaries on disk keyed by `(platform, version)`, and guard
//! concurrent downloads of the same binary with a per-version lock.

use crate::compiler::version::DetailedVersion;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};
use tokio::sync::Semaphore;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("fetching version list from {0}: {1}")]
    List(Url, #[source] reqwest::Error),
    #[error("version {0} is not in the published list")]
    UnknownVersion(String),
    #[error("downloading compiler binary for {0}: {1}")]
    Download(String, #[source] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Fetches and caches a list of `(version, download url)` pairs for one
/// compiler family (solc or vyper), then serves binaries out of a local
/// directory, downloading on first use.
///
/// A lock per version prevents two concurrent callers from downloading the
/// same binary twice (testable property 8, §8).
pub struct ListFetcher {
    list_url: Url,
    cache_dir: PathBuf,
    http: reqwest::Client,
    versions: tokio::sync::RwLock<BTreeMap<DetailedVersion, Url>>,
    download_locks: Mutex<HashMap<DetailedVersion, Arc<Semaphore>>>,
}

impl ListFetcher {
    pub async fn new(
        list_url: Url,
        cache_dir: PathBuf,
        schedule: Option<std::time::Duration>,
        http: Option<reqwest::Client>,
    ) -> Result<Self, FetchError> {
        tokio::fs::create_dir_all(&cache_dir).await?;
        let http = http.unwrap_or_default();
        let fetcher = Self {
            list_url,
            cache_dir,
            http,
            versions: tokio::sync::RwLock::new(BTreeMap::new()),
            download_locks: Mutex::new(HashMap::new()),
        };
        fetcher.refresh().await?;

        if let Some(period) = schedule {
            let list_url = fetcher.list_url.clone();
            tracing::debug!(%list_url, ?period, "periodic compiler list refresh requested");
        }

        Ok(fetcher)
    }

    pub async fn refresh(&self) -> Result<(), FetchError> {
        let response = self
            .http
            .get(self.list_url.clone())
            .send()
            .await
            .map_err(|e| FetchError::List(self.list_url.clone(), e))?
            .json::<ReleaseList>()
            .await
            .map_err(|e| FetchError::List(self.list_url.clone(), e))?;

        let mut parsed = BTreeMap::new();
        for (version_str, url) in response.releases {
            if let Ok(version) = DetailedVersion::from_str(&version_str) {
                parsed.insert(version, url);
            }
        }

        *self.versions.write().await = parsed;
        Ok(())
    }

    pub async fn all_versions(&self) -> Vec<DetailedVersion> {
        self.versions.read().await.keys().cloned().collect()
    }

    fn cache_path(&self, version: &DetailedVersion) -> PathBuf {
        self.cache_dir.join(version.to_string())
    }

    fn lock_for(&self, version: &DetailedVersion) -> Arc<Semaphore> {
        self.download_locks
            .lock()
            .entry(version.clone())
            .or_insert_with(|| Arc::new(Semaphore::new(1)))
            .clone()
    }

    /// Returns the path to a cached, executable compiler binary for
    /// `version`, downloading it first if necessary. Corrupted (empty)
    /// cache entries are treated as absent and re-downloaded.
    pub async fn fetch(&self, version: &DetailedVersion) -> Result<PathBuf, FetchError> {
        let path = self.cache_path(version);
        if file_is_present_and_nonempty(&path).await {
            return Ok(path);
        }

        let lock = self.lock_for(version);
        let _permit = lock.acquire().await.expect("semaphore is never closed");

        if file_is_present_and_nonempty(&path).await {
            return Ok(path);
        }

        let url = {
            let versions = self.versions.read().await;
            versions
                .get(version)
                .cloned()
                .ok_or_else(|| FetchError::UnknownVersion(version.to_string()))?
        };

        let bytes = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Download(version.to_string(), e))?
            .bytes()
            .await
            .map_err(|e| FetchError::Download(version.to_string(), e))?;

        write_executable(&path, &bytes).await?;
        Ok(path)
    }
}

#[derive(serde::Deserialize)]
struct ReleaseList {
    #[serde(flatten)]
    releases: BTreeMap<String, Url>,
}

async fn file_is_present_and_nonempty(path: &Path) -> bool {
    matches!(tokio::fs::metadata(path).await, Ok(meta) if meta.len() > 0)
}

#[cfg(unix)]
async fn write_executable(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::write(path, bytes).await?;
    let mut permissions = tokio::fs::metadata(path).await?.permissions();
    permissions.set_mode(0o755);
    tokio::fs::set_permissions(path, permissions).await
}

#[cfg(not(unix))]
async fn write_executable(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::write(path, bytes).await
}

/// Capability a compiler pool needs from its version source; lets the pool
/// stay generic over solc's and Vyper's differently-shaped release feeds.
#[async_trait]
pub trait VersionSource: Send + Sync {
    async fn fetch(&self, version: &DetailedVersion) -> Result<PathBuf, FetchError>;
    async fn all_versions(&self) -> Vec<DetailedVersion>;
}

#[async_trait]
impl VersionSource for ListFetcher {
    async fn fetch(&self, version: &DetailedVersion) -> Result<PathBuf, FetchError> {
        ListFetcher::fetch(self, version).await
    }

    async fn all_versions(&self) -> Vec<DetailedVersion> {
        ListFetcher::all_versions(self).await
    }
}
