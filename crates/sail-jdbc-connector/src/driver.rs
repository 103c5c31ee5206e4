// SPDX-License-Identifier: Apache-2.0

//! JDBC driver artifact resolution.
//!
//! A driver is identified by its name and the MD5 checksum of its artifact.
//! [`DriverArtifactCache`] turns a [`DriverDescriptor`] into a verified file on
//! local disk, downloading it on the first request and reusing it afterwards.
//! Concurrent requests for the same descriptor share a single download.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use md5::{Digest, Md5};
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::DriverCacheConfig;
use crate::error::{JdbcError, JdbcResult};

/// Driver metadata as stored in the table catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DriverDescriptor {
    /// Logical driver name (e.g., "postgresql")
    pub name: String,

    /// Location the artifact is fetched from
    pub url: String,

    /// MD5 hex digest of the artifact
    pub checksum: String,

    /// Fully qualified driver class (e.g., "org.postgresql.Driver")
    pub class_name: String,
}

/// A driver artifact available on local disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDriver {
    pub name: String,
    pub checksum: String,
    pub path: PathBuf,
}

/// Resolves driver descriptors to local artifacts
pub trait DriverResolver: Send + Sync + fmt::Debug {
    fn resolve(&self, driver: &DriverDescriptor) -> JdbcResult<ResolvedDriver>;
}

/// Fetches the raw bytes of a driver artifact
pub trait DriverFetcher: Send + Sync + fmt::Debug {
    fn fetch(&self, url: &Url) -> JdbcResult<Vec<u8>>;
}

/// Fetches drivers over HTTP(S) or from `file` URLs
#[derive(Debug, Clone)]
pub struct HttpDriverFetcher {
    timeout: Duration,
}

impl HttpDriverFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl DriverFetcher for HttpDriverFetcher {
    fn fetch(&self, url: &Url) -> JdbcResult<Vec<u8>> {
        match url.scheme() {
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| JdbcError::invalid(format!("invalid file URL: {url}")))?;
                Ok(fs::read(path)?)
            }
            "http" | "https" => {
                // must not be built inside an async runtime
                let client = reqwest::blocking::Client::builder()
                    .timeout(self.timeout)
                    .build()?;
                let response = client.get(url.clone()).send()?.error_for_status()?;
                Ok(response.bytes()?.to_vec())
            }
            scheme => Err(JdbcError::invalid(format!(
                "unsupported driver URL scheme: {scheme}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DriverKey {
    name: String,
    checksum: String,
}

impl DriverKey {
    fn new(driver: &DriverDescriptor) -> Self {
        Self {
            name: driver.name.clone(),
            checksum: driver.checksum.to_ascii_lowercase(),
        }
    }

    fn file_name(&self) -> String {
        let name: String = self
            .name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}_{}.jar", name, self.checksum)
    }
}

/// Local cache of verified driver artifacts.
///
/// Entries are keyed by driver name and checksum, so a new version of a driver
/// published under the same name never replaces the artifact in use by other
/// scans. Artifacts left in the cache directory by a previous process are
/// verified and reused without fetching.
pub struct DriverArtifactCache {
    directory: PathBuf,
    fetcher: Arc<dyn DriverFetcher>,
    entries: Cache<DriverKey, Arc<ResolvedDriver>>,
}

impl fmt::Debug for DriverArtifactCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverArtifactCache")
            .field("directory", &self.directory)
            .field("fetcher", &self.fetcher)
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

impl DriverArtifactCache {
    /// Create a cache that downloads drivers with [`HttpDriverFetcher`]
    pub fn new(config: &DriverCacheConfig) -> JdbcResult<Self> {
        let fetcher = Arc::new(HttpDriverFetcher::new(config.download_timeout()));
        Self::with_fetcher(config, fetcher)
    }

    pub fn with_fetcher(
        config: &DriverCacheConfig,
        fetcher: Arc<dyn DriverFetcher>,
    ) -> JdbcResult<Self> {
        fs::create_dir_all(&config.directory)?;
        info!(
            "Using JDBC driver cache directory {}",
            config.directory.display()
        );
        let entries = Cache::builder()
            .max_capacity(config.max_capacity)
            .name("jdbc-drivers")
            .build();
        Ok(Self {
            directory: config.directory.clone(),
            fetcher,
            entries,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Number of resolved drivers held in memory
    pub fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    fn artifact_path(&self, key: &DriverKey) -> PathBuf {
        self.directory.join(key.file_name())
    }

    fn load(&self, key: &DriverKey, driver: &DriverDescriptor) -> JdbcResult<ResolvedDriver> {
        let path = self.artifact_path(key);
        if path.exists() {
            verify_artifact(key, &path)?;
            info!(
                "Reusing JDBC driver {} from {}",
                driver.name,
                path.display()
            );
            return Ok(resolved(key, path));
        }

        let url = Url::parse(&driver.url).map_err(|e| {
            JdbcError::driver(&driver.name, format!("invalid URL {}: {e}", driver.url))
        })?;
        info!("Downloading JDBC driver {} from {}", driver.name, url);
        let bytes = self
            .fetcher
            .fetch(&url)
            .map_err(|e| JdbcError::driver(&driver.name, format!("failed to fetch {url}: {e}")))?;

        let actual = format!("{:x}", Md5::digest(&bytes));
        if actual != key.checksum {
            return Err(JdbcError::driver(
                &driver.name,
                format!(
                    "checksum mismatch for {url}: expected {}, got {actual}",
                    key.checksum
                ),
            ));
        }

        self.install(&path, &bytes)
            .map_err(|e| JdbcError::driver(&driver.name, format!("failed to store artifact: {e}")))?;
        debug!(
            "Stored JDBC driver {} ({} bytes) at {}",
            driver.name,
            bytes.len(),
            path.display()
        );
        Ok(resolved(key, path))
    }

    /// Write the artifact next to its final location and move it into place,
    /// so a partially written file is never visible under the artifact name.
    fn install(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let temp = self
            .directory
            .join(format!(".{}.tmp", uuid::Uuid::new_v4()));
        let result = File::create(&temp)
            .and_then(|mut file| {
                file.write_all(bytes)?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&temp, path));
        if result.is_err() {
            let _ = fs::remove_file(&temp);
        }
        result
    }

    fn verify_hit(&self, key: &DriverKey, entry: &ResolvedDriver) -> JdbcResult<()> {
        if let Err(e) = verify_artifact(key, &entry.path) {
            warn!(
                "Evicting JDBC driver {} from the cache: {}",
                entry.name, e
            );
            self.entries.invalidate(key);
            return Err(e);
        }
        Ok(())
    }
}

impl DriverResolver for DriverArtifactCache {
    fn resolve(&self, driver: &DriverDescriptor) -> JdbcResult<ResolvedDriver> {
        validate(driver)?;
        let key = DriverKey::new(driver);

        if let Some(entry) = self.entries.get(&key) {
            debug!("Cache hit for JDBC driver: {}", driver.name);
            self.verify_hit(&key, &entry)?;
            return Ok((*entry).clone());
        }

        debug!("Cache miss for JDBC driver: {}", driver.name);
        let entry = self
            .entries
            .try_get_with(key.clone(), || self.load(&key, driver).map(Arc::new))
            .map_err(|e| match e.as_ref() {
                JdbcError::DriverResolution { name, message } => JdbcError::driver(name, message),
                other => JdbcError::driver(&driver.name, other.to_string()),
            })?;
        Ok((*entry).clone())
    }
}

fn resolved(key: &DriverKey, path: PathBuf) -> ResolvedDriver {
    ResolvedDriver {
        name: key.name.clone(),
        checksum: key.checksum.clone(),
        path,
    }
}

fn validate(driver: &DriverDescriptor) -> JdbcResult<()> {
    if driver.name.is_empty() {
        return Err(JdbcError::driver("", "driver name must not be empty"));
    }
    let checksum = &driver.checksum;
    if checksum.len() != 32 || !checksum.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(JdbcError::driver(
            &driver.name,
            format!("invalid MD5 checksum: {checksum:?}"),
        ));
    }
    Ok(())
}

/// Check that the artifact at `path` still matches the checksum of its key.
/// A corrupted artifact is removed so a later resolution can fetch it again.
fn verify_artifact(key: &DriverKey, path: &Path) -> JdbcResult<()> {
    let actual = file_checksum(path).map_err(|e| {
        JdbcError::driver(
            &key.name,
            format!("cannot read cached artifact {}: {e}", path.display()),
        )
    })?;
    if actual != key.checksum {
        let _ = fs::remove_file(path);
        return Err(JdbcError::driver(
            &key.name,
            format!(
                "cached artifact {} is corrupted: expected checksum {}, got {actual}",
                path.display(),
                key.checksum
            ),
        ));
    }
    Ok(())
}

fn file_checksum(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}
