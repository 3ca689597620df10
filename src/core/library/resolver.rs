// ─── Library Resolver ───
// Expands manifest library entries into concrete downloads.

use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::MavenArtifact;
use crate::core::platform::{Arch, Platform};
use crate::core::remote::RemoteUrl;
use crate::core::storage::StoragePath;
use crate::core::version::LibraryEntry;

const ARCH_PLACEHOLDER: &str = "${arch}";

/// One artifact to fetch for a library: its jar, or one native variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadDescriptor {
    pub library_id: String,
    /// Native classifier such as `natives-windows-64`; `None` for plain jars.
    pub classifier: Option<String>,
    pub url: RemoteUrl,
    pub hash_url: RemoteUrl,
    /// Location of the downloaded jar, relative to the libraries directory.
    pub storage_path: StoragePath,
    /// Archive path prefixes skipped on extraction.
    pub exclude: Vec<String>,
}

impl DownloadDescriptor {
    pub fn is_native(&self) -> bool {
        self.classifier.is_some()
    }

    /// Directory a native variant is extracted into, relative to the
    /// libraries directory.
    pub fn native_dir(&self) -> Option<StoragePath> {
        self.classifier
            .as_ref()
            .map(|c| self.storage_path.parent().child(c.clone()))
    }
}

#[derive(Debug, Clone)]
pub struct LibraryResolver {
    platform: Platform,
    download_exclusive: bool,
}

impl LibraryResolver {
    /// `download_exclusive` restricts downloads to the running platform:
    /// unsupported libraries are skipped and only the current architecture
    /// of each native is fetched.
    pub fn new(platform: Platform, download_exclusive: bool) -> Self {
        Self {
            platform,
            download_exclusive,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Whether the rules of `entry` allow the running platform.
    pub fn is_supported(&self, entry: &LibraryEntry) -> bool {
        entry.is_supported(self.platform.family)
    }

    /// Classifier of `entry` for the running platform and architecture, or
    /// `None` when `entry` is a plain jar.
    pub fn current_classifier(&self, entry: &LibraryEntry) -> LauncherResult<Option<String>> {
        if !entry.is_natives() {
            return Ok(None);
        }
        let template = entry.native_template(self.platform.family).ok_or_else(|| {
            LauncherError::UnsupportedArtifact {
                library: entry.name.clone(),
                family: self.platform.family.to_string(),
            }
        })?;
        Ok(Some(template.replace(ARCH_PLACEHOLDER, self.platform.arch.as_str())))
    }

    /// Every classifier of `entry` that should be present locally.
    pub fn classifiers(&self, entry: &LibraryEntry) -> LauncherResult<Vec<String>> {
        if !entry.is_natives() {
            return Ok(Vec::new());
        }
        if self.download_exclusive {
            if !self.is_supported(entry) {
                return Ok(Vec::new());
            }
            return Ok(self.current_classifier(entry)?.into_iter().collect());
        }

        if self.is_supported(entry) {
            // Fail early if the running platform has no variant.
            self.current_classifier(entry)?;
        }

        let mut classifiers = Vec::new();
        for family in entry.native_families() {
            if !entry.is_supported(family) {
                continue;
            }
            let Some(template) = entry.native_template(family) else {
                continue;
            };
            if template.contains(ARCH_PLACEHOLDER) {
                classifiers.extend(
                    Arch::ALL
                        .iter()
                        .map(|arch| template.replace(ARCH_PLACEHOLDER, arch.as_str())),
                );
            } else {
                classifiers.push(template.to_string());
            }
        }
        Ok(classifiers)
    }

    /// Download descriptors for `entry`.
    ///
    /// A plain jar yields one descriptor. A native library yields one per
    /// classifier from [`LibraryResolver::classifiers`]. In exclusive mode a
    /// library the running platform does not support yields none.
    pub fn resolve(&self, entry: &LibraryEntry) -> LauncherResult<Vec<DownloadDescriptor>> {
        if self.download_exclusive && !self.is_supported(entry) {
            debug!("Skipping {} (not supported on {})", entry.name, self.platform.family);
            return Ok(Vec::new());
        }
        let artifact = MavenArtifact::parse(&entry.name)?;

        if !entry.is_natives() {
            return Ok(vec![self.descriptor(entry, &artifact, None)]);
        }
        Ok(self
            .classifiers(entry)?
            .into_iter()
            .map(|classifier| self.descriptor(entry, &artifact, Some(classifier)))
            .collect())
    }

    /// Where the library registry points for `entry`, relative to the
    /// libraries directory: the jar for plain libraries, the directory
    /// holding the classifier folders for natives.
    pub fn record_path(&self, entry: &LibraryEntry) -> LauncherResult<StoragePath> {
        let artifact = MavenArtifact::parse(&entry.name)?;
        Ok(if entry.is_natives() {
            artifact.directory()
        } else {
            artifact.local_path()
        })
    }

    fn descriptor(
        &self,
        entry: &LibraryEntry,
        artifact: &MavenArtifact,
        classifier: Option<String>,
    ) -> DownloadDescriptor {
        let variant = match &classifier {
            Some(c) => artifact.with_classifier(c),
            None => artifact.clone(),
        };
        let url = variant.remote_url();
        DownloadDescriptor {
            library_id: entry.name.clone(),
            hash_url: url.companion_sha1(),
            url,
            storage_path: variant.local_path(),
            exclude: if classifier.is_some() {
                entry.exclude().to_vec()
            } else {
                Vec::new()
            },
            classifier,
        }
    }
}
