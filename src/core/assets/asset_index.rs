use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::downloader::{DownloadEntry, Downloader, Progress};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::remote::{Origin, RemoteUrl};
use crate::core::storage::{fs, PathStore, StoragePath};

const ASSETS_DIR: &str = "assets";
const PROGRESS_LABEL: &str = "Downloading assets";

/// Top-level asset index JSON structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetIndex {
    /// Materialize objects under their names instead of by hash.
    #[serde(rename = "virtual", default)]
    pub is_virtual: bool,
    pub objects: BTreeMap<String, AssetObject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    #[serde(default)]
    pub size: u64,
}

impl AssetObject {
    /// `<hash[:2]>/<hash>`, shared by the resource origin and the flat layout.
    fn hashed_segments(&self) -> Option<[String; 2]> {
        let prefix = self.hash.get(..2)?;
        Some([prefix.to_string(), self.hash.clone()])
    }

    fn remote_url(&self) -> Option<RemoteUrl> {
        self.hashed_segments()
            .map(|segments| RemoteUrl::new(Origin::Resources, segments))
    }
}

/// Where a version's assets live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetPaths {
    pub index: PathBuf,
    pub directory: PathBuf,
}

/// Manages asset indexes and their objects under `assets/`.
pub struct AssetsManager {
    store: PathStore,
}

impl AssetsManager {
    pub fn new(store: PathStore) -> Self {
        Self { store }
    }

    fn base() -> StoragePath {
        StoragePath::new([ASSETS_DIR])
    }

    pub fn indexes_dir() -> StoragePath {
        Self::base().child("indexes")
    }

    fn index_path(asset_id: &str) -> StoragePath {
        Self::indexes_dir().child(format!("{}.json", asset_id))
    }

    fn objects_dir() -> StoragePath {
        Self::base().child("objects")
    }

    fn virtual_dir(asset_id: &str) -> StoragePath {
        Self::base().child("virtual").child(asset_id)
    }

    fn object_path(object: &AssetObject) -> Option<StoragePath> {
        object
            .hashed_segments()
            .map(|segments| Self::objects_dir().join(&StoragePath::new(segments)))
    }

    /// Absolute `assets/` directory.
    pub fn root(&self) -> PathBuf {
        self.store.absolute(&Self::base())
    }

    pub fn is_registered(&self, asset_id: &str) -> bool {
        self.store.exists(&Self::index_path(asset_id))
    }

    // ── Index ───────────────────────────────────────────

    /// Download the index for `asset_id` into `assets/indexes/<id>.json`,
    /// verified against its `.sha1` companion.
    pub async fn download_index(&self, downloader: &Downloader, asset_id: &str) -> LauncherResult<AssetIndex> {
        if StoragePath::parse(asset_id).map(|p| p.segments().len()) != Some(1) {
            return Err(LauncherError::Other(format!("Invalid asset index id: {:?}", asset_id)));
        }
        let url = RemoteUrl::new(Origin::Download, ["indexes".to_string(), format!("{}.json", asset_id)]);
        let path = self.store.absolute(&Self::index_path(asset_id));
        info!("Downloading asset index {}", asset_id);
        downloader
            .download_file(&DownloadEntry::with_companion(url, path.clone()))
            .await?;

        match fs::read_json(&path).await {
            Ok(index) => Ok(index),
            Err(e) => {
                fs::delete_and_clean(self.store.root(), &path).await?;
                Err(e)
            }
        }
    }

    pub async fn load_index(&self, asset_id: &str) -> LauncherResult<AssetIndex> {
        let path = self.store.absolute(&Self::index_path(asset_id));
        if !path.exists() {
            return Err(LauncherError::NotFound(format!("asset index {}", asset_id)));
        }
        fs::read_json(&path).await
    }

    /// Ids of every index present in `assets/indexes/`.
    pub async fn registered_ids(&self) -> LauncherResult<Vec<String>> {
        let dir = self.store.absolute(&Self::indexes_dir());
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(LauncherError::io(&dir, e)),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| LauncherError::io(&dir, e))? {
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(id) = name.strip_suffix(".json") {
                if !id.starts_with('.') {
                    ids.push(id.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    pub async fn paths(&self, asset_id: &str) -> LauncherResult<AssetPaths> {
        let index = self.load_index(asset_id).await?;
        let directory = if index.is_virtual {
            Self::virtual_dir(asset_id)
        } else {
            Self::objects_dir()
        };
        Ok(AssetPaths {
            index: self.store.absolute(&Self::index_path(asset_id)),
            directory: self.store.absolute(&directory),
        })
    }

    // ── Objects ─────────────────────────────────────────

    /// Download every object of `asset_id` missing on disk, verifying each
    /// against its own hash.
    pub async fn download_missing(
        &self,
        downloader: &Downloader,
        asset_id: &str,
        progress: Option<Progress<'_>>,
    ) -> LauncherResult<()> {
        let index = self.load_index(asset_id).await?;
        if let Some(report) = progress {
            report("Finding missing assets", 0.0);
        }

        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for (name, object) in &index.objects {
            let Some(url) = object.remote_url() else {
                warn!("Skipping asset {} with malformed hash {:?}", name, object.hash);
                continue;
            };
            let target = if index.is_virtual {
                let Some(relative) = StoragePath::parse(name) else {
                    warn!("Skipping asset {:?} outside the virtual directory", name);
                    continue;
                };
                Self::virtual_dir(asset_id).join(&relative)
            } else {
                match Self::object_path(object) {
                    Some(path) => path,
                    None => continue,
                }
            };
            let dest = self.store.absolute(&target);
            if dest.exists() || !seen.insert(dest.clone()) {
                continue;
            }
            entries.push(DownloadEntry::with_known_hash(url, dest, object.hash.clone()));
        }

        info!(
            "Downloading {} asset objects ({} already present)",
            entries.len(),
            index.objects.len() - entries.len()
        );
        if entries.is_empty() {
            return Ok(());
        }

        let mut failures = downloader.download_batch(PROGRESS_LABEL, entries, progress).await;
        if failures.is_empty() {
            return Ok(());
        }
        warn!("{} asset downloads failed", failures.len());
        let (_, first) = failures.swap_remove(0);
        Err(first)
    }

    // ── Deletion ────────────────────────────────────────

    /// Delete an index and the objects only it references.
    ///
    /// Flat objects are shared across indexes; an object survives while any
    /// other registered flat index lists its hash.
    pub async fn delete_index(&self, asset_id: &str) -> LauncherResult<()> {
        let index = self.load_index(asset_id).await?;
        let root = self.store.root();

        if index.is_virtual {
            fs::delete_and_clean(root, &self.store.absolute(&Self::virtual_dir(asset_id))).await?;
        } else {
            let retained = self.hashes_outside(asset_id).await?;
            let mut removed = 0usize;
            for object in index.objects.values() {
                if retained.contains(&object.hash) {
                    continue;
                }
                let Some(path) = Self::object_path(object) else {
                    continue;
                };
                let absolute = self.store.absolute(&path);
                if absolute.exists() {
                    fs::delete_and_clean(root, &absolute).await?;
                    removed += 1;
                }
            }
            debug!("Removed {} objects of asset index {}", removed, asset_id);
        }

        fs::delete_and_clean(root, &self.store.absolute(&Self::index_path(asset_id))).await?;
        info!("Deleted asset index {}", asset_id);
        Ok(())
    }

    /// Hashes referenced by every registered flat index except `asset_id`.
    async fn hashes_outside(&self, asset_id: &str) -> LauncherResult<HashSet<String>> {
        let mut hashes = HashSet::new();
        for other in self.registered_ids().await? {
            if other == asset_id {
                continue;
            }
            let index = self.load_index(&other).await?;
            if index.is_virtual {
                continue;
            }
            hashes.extend(index.objects.into_values().map(|o| o.hash));
        }
        Ok(hashes)
    }
}
