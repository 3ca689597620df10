// ─── Library Acquisition ───
// Downloads missing libraries, extracts natives and registers the results.

use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::index::{LibraryRecord, LibraryRegistry};
use super::resolver::{DownloadDescriptor, LibraryResolver};
use crate::core::downloader::{extract_natives, DownloadEntry, Downloader, ExpectedHash, Progress};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::version::LibraryEntry;

const PROGRESS_LABEL: &str = "Downloading libraries";

/// Descriptors still missing for one library.
struct PendingLibrary {
    record: LibraryRecord,
    descriptors: Vec<DownloadDescriptor>,
}

impl LibraryRegistry {
    /// Make the artifact of `descriptor` present on disk.
    ///
    /// Jars are fetched and verified; native variants are additionally
    /// extracted into their classifier directory and the jar removed.
    /// Nothing happens when the artifact is already there. The registry is
    /// not touched.
    pub async fn ensure_present(
        &self,
        downloader: &Downloader,
        descriptor: &DownloadDescriptor,
    ) -> LauncherResult<()> {
        if self.descriptor_present(descriptor) {
            return Ok(());
        }

        let jar = self.absolute(&descriptor.storage_path);
        downloader
            .download_file(&DownloadEntry {
                url: descriptor.url.clone(),
                dest: jar.clone(),
                hash: ExpectedHash::Companion(descriptor.hash_url.clone()),
            })
            .await?;

        let Some(native_dir) = descriptor.native_dir() else {
            return Ok(());
        };
        let target = self.absolute(&native_dir);
        if let Err(e) = extract_natives(&jar, &target, &descriptor.exclude).await {
            let _ = tokio::fs::remove_dir_all(&target).await;
            let _ = tokio::fs::remove_file(&jar).await;
            return Err(e);
        }
        tokio::fs::remove_file(&jar)
            .await
            .map_err(|e| LauncherError::io(&jar, e))?;
        debug!("Extracted {} into {}", descriptor.url, native_dir);
        Ok(())
    }

    fn descriptor_present(&self, descriptor: &DownloadDescriptor) -> bool {
        match &descriptor.classifier {
            Some(classifier) => self.native_present(&descriptor.library_id, classifier),
            None => self.is_registered(&descriptor.library_id),
        }
    }

    /// Fetch every library in `entries` that is not yet present.
    ///
    /// A registered jar is skipped; a registered native library is skipped
    /// only when each of its required classifier directories exists.
    /// Libraries download in parallel and are registered together once the
    /// batch is done, so the index is written at most once. Only libraries
    /// whose every variant verified are registered. The first failure is
    /// returned after the successful ones have been recorded.
    pub async fn download_missing(
        &mut self,
        resolver: &LibraryResolver,
        downloader: &Downloader,
        entries: &[LibraryEntry],
        progress: Option<Progress<'_>>,
    ) -> LauncherResult<()> {
        let pending = self.plan(resolver, entries)?;
        if let Some(report) = progress {
            report(PROGRESS_LABEL, 0.0);
        }
        if pending.is_empty() {
            debug!("All {} libraries present", entries.len());
            if let Some(report) = progress {
                report(PROGRESS_LABEL, 1.0);
            }
            return Ok(());
        }

        let total = pending.len();
        info!("Downloading {} libraries", total);

        let this = &*self;
        let mut results = stream::iter(pending)
            .map(|library| async move {
                for descriptor in &library.descriptors {
                    this.ensure_present(downloader, descriptor).await?;
                }
                Ok::<_, LauncherError>(library.record)
            })
            .buffer_unordered(downloader.concurrency());

        let mut verified = Vec::new();
        let mut first_error = None;
        let mut done = 0usize;
        while let Some(result) = results.next().await {
            done += 1;
            match result {
                Ok(record) => verified.push(record),
                Err(e) => {
                    warn!("Library download failed: {}", e);
                    first_error.get_or_insert(e);
                }
            }
            if let Some(report) = progress {
                report(PROGRESS_LABEL, done as f64 / total as f64);
            }
        }
        drop(results);

        if !verified.is_empty() {
            info!("Registering {} libraries", verified.len());
            self.registry_mut().upsert_all(verified).await?;
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn plan(&self, resolver: &LibraryResolver, entries: &[LibraryEntry]) -> LauncherResult<Vec<PendingLibrary>> {
        let mut pending = Vec::new();
        for entry in entries {
            let descriptors: Vec<_> = resolver
                .resolve(entry)?
                .into_iter()
                .filter(|d| !self.descriptor_present(d))
                .collect();
            if descriptors.is_empty() {
                continue;
            }
            let record = LibraryRecord {
                id: entry.name.clone(),
                path: resolver.record_path(entry)?,
            };
            pending.push(PendingLibrary { record, descriptors });
        }
        Ok(pending)
    }
}
