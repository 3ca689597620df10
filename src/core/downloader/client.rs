use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use sha1::{Digest, Sha1};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::remote::{RemoteStore, RemoteUrl};
use crate::core::storage::fs;

/// Total attempts made for one artifact before giving up on its hash.
pub const MAX_ATTEMPTS: u32 = 3;

/// Advisory progress sink: `(label, fraction in 0..=1)`.
pub type Progress<'a> = &'a (dyn Fn(&str, f64) + Send + Sync);

/// Lowercase hex SHA-1 of `bytes`.
pub fn sha1_hex(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

/// Where the expected digest of a download comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedHash {
    /// A companion file holding the hex digest, fetched on every attempt.
    Companion(RemoteUrl),
    /// A digest known up front (asset objects are named by their hash).
    Known(String),
}

/// A single file to download and verify.
#[derive(Debug, Clone)]
pub struct DownloadEntry {
    pub url: RemoteUrl,
    pub dest: PathBuf,
    pub hash: ExpectedHash,
}

impl DownloadEntry {
    /// Entry verified against `<url>.sha1`.
    pub fn with_companion(url: RemoteUrl, dest: PathBuf) -> Self {
        let hash = ExpectedHash::Companion(url.companion_sha1());
        Self { url, dest, hash }
    }

    pub fn with_known_hash(url: RemoteUrl, dest: PathBuf, sha1: impl Into<String>) -> Self {
        Self {
            url,
            dest,
            hash: ExpectedHash::Known(sha1.into()),
        }
    }
}

/// Concurrent, SHA-1 validated downloader over a [`RemoteStore`].
#[derive(Clone)]
pub struct Downloader {
    remote: Arc<dyn RemoteStore>,
    /// Maximum number of parallel downloads.
    concurrency: usize,
}

impl Downloader {
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            remote,
            concurrency: 8,
        }
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn remote(&self) -> &dyn RemoteStore {
        self.remote.as_ref()
    }

    // ── Single file download ────────────────────────────

    /// Download `entry` to its destination and verify it.
    ///
    /// On a digest mismatch the written file is removed and the download is
    /// retried, up to [`MAX_ATTEMPTS`] in total. Transport errors are returned
    /// immediately. On error no file is left at `entry.dest`.
    pub async fn download_file(&self, entry: &DownloadEntry) -> LauncherResult<()> {
        for attempt in 1..=MAX_ATTEMPTS {
            let expected = match &entry.hash {
                ExpectedHash::Companion(url) => self.remote.fetch_text(url).await?,
                ExpectedHash::Known(sha1) => sha1.clone(),
            };
            let expected = expected.trim().to_ascii_lowercase();

            let actual = match self.stream_to_file(&entry.url, &entry.dest).await {
                Ok(actual) => actual,
                Err(e) => {
                    let _ = tokio::fs::remove_file(&entry.dest).await;
                    return Err(e);
                }
            };

            if actual == expected {
                debug!("Downloaded: {} -> {:?}", entry.url, entry.dest);
                return Ok(());
            }

            warn!(
                "SHA-1 mismatch for {} (attempt {}/{}): expected {}, got {}",
                entry.url, attempt, MAX_ATTEMPTS, expected, actual
            );
            let _ = tokio::fs::remove_file(&entry.dest).await;
        }

        Err(LauncherError::DownloadIntegrity {
            artifact: entry.url.to_string(),
            attempts: MAX_ATTEMPTS,
        })
    }

    /// Stream the body of `url` into `dest`, returning the digest of the
    /// bytes written.
    async fn stream_to_file(&self, url: &RemoteUrl, dest: &Path) -> LauncherResult<String> {
        fs::ensure_parent(dest).await?;
        let mut body = self.remote.open(url).await?;

        let mut hasher = Sha1::new();
        // The handle is dropped at the end of this block, before the caller
        // may remove the file.
        {
            let mut file = tokio::fs::File::create(dest)
                .await
                .map_err(|e| LauncherError::io(dest, e))?;
            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                hasher.update(&chunk);
                file.write_all(&chunk)
                    .await
                    .map_err(|e| LauncherError::io(dest, e))?;
            }
            file.flush().await.map_err(|e| LauncherError::io(dest, e))?;
        }

        Ok(hex::encode(hasher.finalize()))
    }

    // ── Batch concurrent downloads ──────────────────────

    /// Download many files concurrently using `buffer_unordered`.
    ///
    /// `progress` is called after each finished file. Returns the files that
    /// failed (if any).
    pub async fn download_batch(
        &self,
        label: &str,
        entries: Vec<DownloadEntry>,
        progress: Option<Progress<'_>>,
    ) -> Vec<(DownloadEntry, LauncherError)> {
        let total = entries.len();
        info!(
            "Starting batch download: {} files, concurrency={}",
            total, self.concurrency
        );

        let mut results = stream::iter(entries)
            .map(|entry| async move {
                let result = self.download_file(&entry).await;
                (entry, result)
            })
            .buffer_unordered(self.concurrency);

        let mut failed = Vec::new();
        let mut done = 0usize;
        while let Some((entry, result)) = results.next().await {
            done += 1;
            if let Some(report) = progress {
                report(label, done as f64 / total as f64);
            }
            if let Err(e) = result {
                failed.push((entry, e));
            }
        }
        failed
    }
}
