use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::config::LauncherConfig;
use crate::core::assets::AssetsManager;
use crate::core::binary::{BinaryKey, BinaryRegistry};
use crate::core::downloader::Downloader;
use crate::core::error::LauncherResult;
use crate::core::library::{LibraryRegistry, LibraryResolver};
use crate::core::profile::ProfileRegistry;
use crate::core::remote::{HttpRemoteStore, RemoteStore};
use crate::core::storage::{fs, PathStore, StoragePath};

/// Registry records whose files are missing on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub binaries: Vec<BinaryKey>,
    pub libraries: Vec<String>,
    pub profiles: Vec<String>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.binaries.is_empty() && self.libraries.is_empty() && self.profiles.is_empty()
    }
}

pub struct AppState {
    pub config: LauncherConfig,
    pub store: PathStore,
    pub binaries: BinaryRegistry,
    pub libraries: LibraryRegistry,
    pub assets: AssetsManager,
    pub profiles: ProfileRegistry,
    pub resolver: LibraryResolver,
    pub downloader: Downloader,
}

impl AppState {
    /// Open the data directory with the HTTP remote store.
    pub async fn open(config: LauncherConfig) -> LauncherResult<Self> {
        let remote = HttpRemoteStore::new(config.endpoints.clone())?;
        Self::open_with_remote(config, Arc::new(remote)).await
    }

    /// Open the data directory, creating its skeleton when absent.
    pub async fn open_with_remote(config: LauncherConfig, remote: Arc<dyn RemoteStore>) -> LauncherResult<Self> {
        let store = PathStore::new(config.data_dir.clone());
        create_skeleton(&store).await?;

        let platform = config.platform();
        info!("Opening {:?} for {}/{}", store.root(), platform.family, platform.arch);

        Ok(Self {
            binaries: BinaryRegistry::load(store.clone()).await?,
            libraries: LibraryRegistry::load(store.clone()).await?,
            assets: AssetsManager::new(store.clone()),
            profiles: ProfileRegistry::load(store.clone()).await?,
            resolver: LibraryResolver::new(platform, config.download_exclusive),
            downloader: Downloader::new(remote).with_concurrency(config.concurrency),
            store,
            config,
        })
    }

    pub fn check_data_integrity(&self) -> IntegrityReport {
        let report = IntegrityReport {
            binaries: self.binaries.check_integrity(),
            libraries: self.libraries.check_integrity(),
            profiles: self.profiles.check_integrity(),
        };
        if !report.is_clean() {
            warn!(
                "Integrity check: {} binaries, {} libraries, {} profiles missing on disk",
                report.binaries.len(),
                report.libraries.len(),
                report.profiles.len()
            );
        }
        report
    }
}

async fn create_skeleton(store: &PathStore) -> LauncherResult<()> {
    let empty_list = serde_json::json!([]);
    let empty_map = serde_json::json!({});
    let indexes: [(StoragePath, &serde_json::Value); 3] = [
        (BinaryRegistry::index_path(), &empty_list),
        (LibraryRegistry::index_path(), &empty_map),
        (ProfileRegistry::index_path(), &empty_map),
    ];
    for (path, empty) in indexes {
        if !store.exists(&path) {
            fs::write_json_atomic(&store.absolute(&path), empty).await?;
        }
    }
    fs::create_dir_safe(&store.absolute(&AssetsManager::indexes_dir())).await
}
