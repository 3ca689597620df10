// ─── Binary Registry ───
// Installed game versions under `bin/{vanilla,custom}/<id>/`, indexed by
// `bin/index.json`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::downloader::{DownloadEntry, Downloader};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::registry::{Record, Registry};
use crate::core::remote::{Origin, RemoteUrl};
use crate::core::storage::{fs, PathStore, StoragePath};
use crate::core::version::VersionMetadata;

const BINARIES_DIR: &str = "bin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionType {
    Vanilla,
    Custom,
}

impl VersionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionType::Vanilla => "vanilla",
            VersionType::Custom => "custom",
        }
    }
}

impl fmt::Display for VersionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersionType {
    type Err = LauncherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vanilla" => Ok(VersionType::Vanilla),
            "custom" => Ok(VersionType::Custom),
            other => Err(LauncherError::Other(format!("Unknown version type: {}", other))),
        }
    }
}

/// Identity of an installed binary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BinaryKey {
    #[serde(rename = "type")]
    pub version_type: VersionType,
    pub id: String,
}

impl BinaryKey {
    pub fn new(version_type: VersionType, id: impl Into<String>) -> Self {
        Self {
            version_type,
            id: id.into(),
        }
    }

    pub fn vanilla(id: impl Into<String>) -> Self {
        Self::new(VersionType::Vanilla, id)
    }

    pub fn custom(id: impl Into<String>) -> Self {
        Self::new(VersionType::Custom, id)
    }

    /// `bin/<type>/<id>`
    pub fn directory(&self) -> StoragePath {
        StoragePath::new([BINARIES_DIR, self.version_type.as_str(), self.id.as_str()])
    }

    pub fn jar(&self) -> StoragePath {
        self.directory().child(format!("{}.jar", self.id))
    }

    pub fn json(&self) -> StoragePath {
        self.directory().child(format!("{}.json", self.id))
    }
}

impl fmt::Display for BinaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} version {}", self.version_type, self.id)
    }
}

/// One entry of `bin/index.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    #[serde(rename = "type")]
    pub version_type: VersionType,
    #[serde(rename = "name")]
    pub id: String,
    #[serde(default)]
    pub notes: String,
}

impl ArtifactRecord {
    pub fn new(version_type: VersionType, id: impl Into<String>) -> Self {
        Self {
            version_type,
            id: id.into(),
            notes: String::new(),
        }
    }
}

impl Record for ArtifactRecord {
    type Key = BinaryKey;
    type Index = Vec<ArtifactRecord>;

    fn key(&self) -> BinaryKey {
        BinaryKey::new(self.version_type, self.id.clone())
    }

    fn with_key(&self, key: &BinaryKey) -> Self {
        Self {
            version_type: key.version_type,
            id: key.id.clone(),
            notes: self.notes.clone(),
        }
    }

    fn root(&self) -> StoragePath {
        self.key().directory()
    }

    fn files(&self) -> Vec<StoragePath> {
        let key = self.key();
        vec![key.jar(), key.json()]
    }

    fn ensure_renamable(&self) -> LauncherResult<()> {
        match self.version_type {
            VersionType::Custom => Ok(()),
            VersionType::Vanilla => Err(LauncherError::NotCustomVersion(self.id.clone())),
        }
    }

    fn encode<'a>(records: impl Iterator<Item = &'a Self>) -> Self::Index {
        records.cloned().collect()
    }

    fn decode(index: Self::Index) -> Vec<Self> {
        index
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryPaths {
    pub directory: PathBuf,
    pub jar: PathBuf,
    pub json: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstalledVersions {
    pub vanilla: Vec<String>,
    pub custom: Vec<String>,
}

pub struct BinaryRegistry {
    registry: Registry<ArtifactRecord>,
}

impl BinaryRegistry {
    pub fn index_path() -> StoragePath {
        StoragePath::new([BINARIES_DIR, "index.json"])
    }

    pub async fn load(store: PathStore) -> LauncherResult<Self> {
        Ok(Self {
            registry: Registry::load(store, Self::index_path()).await?,
        })
    }

    fn store(&self) -> &PathStore {
        self.registry.store()
    }

    pub fn paths(&self, key: &BinaryKey) -> BinaryPaths {
        BinaryPaths {
            directory: self.store().absolute(&key.directory()),
            jar: self.store().absolute(&key.jar()),
            json: self.store().absolute(&key.json()),
        }
    }

    pub fn exists(&self, key: &BinaryKey) -> bool {
        self.registry.contains(key)
    }

    pub fn keys(&self) -> Vec<BinaryKey> {
        self.registry.keys().cloned().collect()
    }

    pub fn installed(&self) -> InstalledVersions {
        let mut installed = InstalledVersions::default();
        for record in self.registry.iter() {
            match record.version_type {
                VersionType::Vanilla => installed.vanilla.push(record.id.clone()),
                VersionType::Custom => installed.custom.push(record.id.clone()),
            }
        }
        installed
    }

    /// Open the manifest of an installed version; custom versions open in
    /// editable mode.
    pub async fn metadata(&self, key: &BinaryKey) -> LauncherResult<VersionMetadata> {
        if !self.exists(key) {
            return Err(LauncherError::NotFound(key.to_string()));
        }
        VersionMetadata::open(
            &self.paths(key).json,
            key.version_type == VersionType::Custom,
        )
        .await
    }

    // ── Installation ────────────────────────────────────

    /// Download an official version's jar and manifest, each verified against
    /// its `.sha1` companion, and register it.
    pub async fn install_vanilla(
        &mut self,
        downloader: &Downloader,
        id: &str,
        compatible_version: u32,
    ) -> LauncherResult<VersionMetadata> {
        let key = BinaryKey::vanilla(id);
        if self.exists(&key) {
            return Err(LauncherError::AlreadyExists(key.to_string()));
        }
        let paths = self.paths(&key);
        info!("Installing {}", key);

        let fetched = self.fetch_vanilla(downloader, id, &paths).await;
        let metadata = match fetched {
            Ok(metadata) => metadata,
            Err(e) => {
                fs::delete_and_clean(self.store().root(), &paths.directory).await?;
                return Err(e);
            }
        };
        if !metadata.is_compatible(compatible_version) {
            warn!(
                "{} requires launcher version {}, this launcher implements {}",
                key,
                metadata.minimum_version(),
                compatible_version
            );
        }

        self.registry.add(ArtifactRecord::new(VersionType::Vanilla, id)).await?;
        Ok(metadata)
    }

    async fn fetch_vanilla(
        &self,
        downloader: &Downloader,
        id: &str,
        paths: &BinaryPaths,
    ) -> LauncherResult<VersionMetadata> {
        for (file, dest) in [("jar", &paths.jar), ("json", &paths.json)] {
            let url = RemoteUrl::new(
                Origin::Download,
                ["versions".to_string(), id.to_string(), format!("{}.{}", id, file)],
            );
            downloader
                .download_file(&DownloadEntry::with_companion(url, dest.clone()))
                .await?;
        }
        VersionMetadata::open(&paths.json, false).await
    }

    /// Register a custom version from a local jar and manifest.
    pub async fn install_custom(&mut self, id: &str, jar: &Path, json: &Path) -> LauncherResult<()> {
        let key = BinaryKey::custom(id);
        if self.exists(&key) {
            return Err(LauncherError::AlreadyExists(key.to_string()));
        }
        let raw = tokio::fs::read_to_string(json)
            .await
            .map_err(|e| LauncherError::io(json, e))?;
        crate::core::version::VersionManifest::parse(&raw, json)?;

        let paths = self.paths(&key);
        self.copy_version_files(jar, json, &paths).await?;
        self.registry.add(ArtifactRecord::new(VersionType::Custom, id)).await
    }

    /// Copy an installed vanilla version into a new custom version.
    pub async fn clone_vanilla(&mut self, vanilla_id: &str, custom_id: &str) -> LauncherResult<()> {
        let source = BinaryKey::vanilla(vanilla_id);
        let target = BinaryKey::custom(custom_id);
        if !self.exists(&source) {
            return Err(LauncherError::NotFound(source.to_string()));
        }
        if self.exists(&target) {
            return Err(LauncherError::AlreadyExists(target.to_string()));
        }

        let from = self.paths(&source);
        let to = self.paths(&target);
        self.copy_version_files(&from.jar, &from.json, &to).await?;
        self.registry.add(ArtifactRecord::new(VersionType::Custom, custom_id)).await
    }

    /// Copy a jar and manifest into `paths`. Nothing is left in the version
    /// directory when either copy fails.
    async fn copy_version_files(&self, jar: &Path, json: &Path, paths: &BinaryPaths) -> LauncherResult<()> {
        let copied = async {
            fs::copy_file(jar, &paths.jar).await?;
            fs::copy_file(json, &paths.json).await
        }
        .await;
        if let Err(e) = copied {
            warn!("Copy into {:?} failed: {}", paths.directory, e);
            fs::delete_and_clean(self.store().root(), &paths.directory).await?;
            return Err(e);
        }
        Ok(())
    }

    // ── Management ──────────────────────────────────────

    pub async fn delete(&mut self, key: &BinaryKey) -> LauncherResult<()> {
        self.registry.remove(key).await.map(|_| ())
    }

    /// Rename a custom version. Its files move before the index changes.
    pub async fn rename(&mut self, old_id: &str, new_id: &str) -> LauncherResult<()> {
        let old = BinaryKey::custom(old_id);
        if !self.exists(&old) && self.exists(&BinaryKey::vanilla(old_id)) {
            return Err(LauncherError::NotCustomVersion(old_id.to_string()));
        }
        self.registry.rename(&old, &BinaryKey::custom(new_id)).await
    }

    pub fn notes(&self, id: &str) -> LauncherResult<&str> {
        let key = BinaryKey::custom(id);
        self.registry
            .get(&key)
            .map(|r| r.notes.as_str())
            .ok_or_else(|| LauncherError::NotFound(key.to_string()))
    }

    pub async fn set_notes(&mut self, id: &str, notes: &str) -> LauncherResult<()> {
        self.registry
            .update(&BinaryKey::custom(id), |record| record.notes = notes.to_string())
            .await
    }

    pub fn check_integrity(&self) -> Vec<BinaryKey> {
        self.registry.check_integrity()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::remote::testing::FakeRemote;

    fn scratch(name: &str) -> PathStore {
        let dir = std::env::temp_dir().join(format!("yamcl-bin-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        PathStore::new(dir)
    }

    fn manifest(id: &str, min: u32) -> String {
        serde_json::json!({
            "id": id,
            "minimumLauncherVersion": min,
            "mainClass": "net.minecraft.client.main.Main",
            "minecraftArguments": "--version ${version_name}",
            "libraries": []
        })
        .to_string()
    }

    fn serve_version(remote: &FakeRemote, id: &str) {
        let base = |ext: &str| {
            RemoteUrl::new(
                Origin::Download,
                ["versions".to_string(), id.to_string(), format!("{id}.{ext}")],
            )
        };
        remote.serve_with_sha1(&base("jar"), b"jar bytes".to_vec());
        remote.serve_with_sha1(&base("json"), manifest(id, 13));
    }

    #[tokio::test]
    async fn install_vanilla_downloads_verifies_and_registers() {
        let store = scratch("install");
        let remote = Arc::new(FakeRemote::new());
        serve_version(&remote, "1.7.10");
        let downloader = Downloader::new(remote.clone());

        let mut binaries = BinaryRegistry::load(store.clone()).await.unwrap();
        let metadata = binaries.install_vanilla(&downloader, "1.7.10", 13).await.unwrap();
        assert_eq!(metadata.id(), "1.7.10");
        assert!(!metadata.is_custom());

        let paths = binaries.paths(&BinaryKey::vanilla("1.7.10"));
        assert_eq!(std::fs::read(&paths.jar).unwrap(), b"jar bytes");

        let err = binaries.install_vanilla(&downloader, "1.7.10", 13).await.unwrap_err();
        assert!(matches!(err, LauncherError::AlreadyExists(_)));

        let index: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(store.root().join("bin").join("index.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(index[0]["type"], "vanilla");
        assert_eq!(index[0]["name"], "1.7.10");

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[tokio::test]
    async fn failed_install_leaves_nothing_behind() {
        let store = scratch("failed");
        let remote = Arc::new(FakeRemote::new());
        let jar = RemoteUrl::new(Origin::Download, ["versions", "1.8", "1.8.jar"]);
        remote.serve_with_sha1(&jar, b"jar".to_vec());
        let downloader = Downloader::new(remote.clone());

        let mut binaries = BinaryRegistry::load(store.clone()).await.unwrap();
        let err = binaries.install_vanilla(&downloader, "1.8", 13).await.unwrap_err();
        assert!(matches!(err, LauncherError::DownloadFailed { status: 404, .. }));
        assert!(!binaries.exists(&BinaryKey::vanilla("1.8")));
        assert!(!store.root().join("bin").join("vanilla").join("1.8").exists());

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[tokio::test]
    async fn clone_rename_and_notes_on_custom_versions() {
        let store = scratch("custom");
        let remote = Arc::new(FakeRemote::new());
        serve_version(&remote, "1.7.10");
        let downloader = Downloader::new(remote.clone());
        let mut binaries = BinaryRegistry::load(store.clone()).await.unwrap();
        binaries.install_vanilla(&downloader, "1.7.10", 13).await.unwrap();

        binaries.clone_vanilla("1.7.10", "modded").await.unwrap();
        binaries.set_notes("modded", "with optifine").await.unwrap();
        binaries.rename("modded", "modded-2").await.unwrap();

        assert!(!binaries.exists(&BinaryKey::custom("modded")));
        assert_eq!(binaries.notes("modded-2").unwrap(), "with optifine");
        let paths = binaries.paths(&BinaryKey::custom("modded-2"));
        assert!(paths.jar.is_file());
        assert!(paths.json.is_file());
        assert!(!store.root().join("bin").join("custom").join("modded").exists());

        let metadata = binaries.metadata(&BinaryKey::custom("modded-2")).await.unwrap();
        assert!(metadata.is_custom());

        let err = binaries.rename("1.7.10", "renamed").await.unwrap_err();
        assert!(matches!(err, LauncherError::NotCustomVersion(_)));
        let err = binaries.notes("1.7.10").unwrap_err();
        assert!(matches!(err, LauncherError::NotFound(_)));

        assert_eq!(
            binaries.installed(),
            InstalledVersions {
                vanilla: vec!["1.7.10".into()],
                custom: vec!["modded-2".into()],
            }
        );

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[tokio::test]
    async fn crash_between_move_and_flush_is_detected() {
        let store = scratch("crash");
        let remote = Arc::new(FakeRemote::new());
        serve_version(&remote, "1.7.10");
        let downloader = Downloader::new(remote.clone());
        let mut binaries = BinaryRegistry::load(store.clone()).await.unwrap();
        binaries.install_vanilla(&downloader, "1.7.10", 13).await.unwrap();
        binaries.clone_vanilla("1.7.10", "mine").await.unwrap();

        // Files moved, index never written.
        let old = binaries.paths(&BinaryKey::custom("mine"));
        let new = binaries.paths(&BinaryKey::custom("ours"));
        std::fs::create_dir_all(&new.directory).unwrap();
        std::fs::rename(&old.jar, &new.jar).unwrap();
        std::fs::rename(&old.json, &new.json).unwrap();
        drop(binaries);

        let reloaded = BinaryRegistry::load(store.clone()).await.unwrap();
        assert_eq!(reloaded.check_integrity(), vec![BinaryKey::custom("mine")]);

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[tokio::test]
    async fn failed_clone_removes_partial_copy() {
        let store = scratch("clone-partial");
        let remote = Arc::new(FakeRemote::new());
        serve_version(&remote, "1.7.10");
        let downloader = Downloader::new(remote.clone());
        let mut binaries = BinaryRegistry::load(store.clone()).await.unwrap();
        binaries.install_vanilla(&downloader, "1.7.10", 13).await.unwrap();
        std::fs::remove_file(binaries.paths(&BinaryKey::vanilla("1.7.10")).json).unwrap();

        let err = binaries.clone_vanilla("1.7.10", "mine").await.unwrap_err();
        assert!(matches!(err, LauncherError::Io { .. }));
        assert!(!binaries.exists(&BinaryKey::custom("mine")));
        assert!(!store.root().join("bin").join("custom").exists());

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[tokio::test]
    async fn failed_custom_install_removes_copied_jar() {
        let store = scratch("custom-partial");
        let dir = std::env::temp_dir().join(format!("yamcl-bin-partial-src-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("b.jar"), b"jar").unwrap();
        std::fs::write(dir.join("b.json"), manifest("b", 4)).unwrap();

        let mut binaries = BinaryRegistry::load(store.clone()).await.unwrap();
        // A directory where the manifest should land makes the second copy fail.
        let paths = binaries.paths(&BinaryKey::custom("b"));
        std::fs::create_dir_all(&paths.json).unwrap();

        assert!(binaries
            .install_custom("b", &dir.join("b.jar"), &dir.join("b.json"))
            .await
            .is_err());
        assert!(!binaries.exists(&BinaryKey::custom("b")));
        assert!(!paths.jar.exists());
        assert!(!store.root().join("bin").join("custom").exists());

        let _ = std::fs::remove_dir_all(store.root());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn failed_rename_restores_moved_files() {
        let store = scratch("rename-restore");
        let remote = Arc::new(FakeRemote::new());
        serve_version(&remote, "1.7.10");
        let downloader = Downloader::new(remote.clone());
        let mut binaries = BinaryRegistry::load(store.clone()).await.unwrap();
        binaries.install_vanilla(&downloader, "1.7.10", 13).await.unwrap();
        binaries.clone_vanilla("1.7.10", "mine").await.unwrap();

        // The jar moves first; a missing manifest stops the second move.
        let old = binaries.paths(&BinaryKey::custom("mine"));
        let saved = std::fs::read(&old.json).unwrap();
        std::fs::remove_file(&old.json).unwrap();

        assert!(binaries.rename("mine", "ours").await.is_err());
        assert!(old.jar.is_file());
        assert!(binaries.exists(&BinaryKey::custom("mine")));
        assert!(!binaries.exists(&BinaryKey::custom("ours")));
        assert!(!store.root().join("bin").join("custom").join("ours").exists());

        std::fs::write(&old.json, saved).unwrap();
        assert!(binaries.check_integrity().is_empty());

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[tokio::test]
    async fn rename_refuses_unregistered_target_directory() {
        let store = scratch("rename-occupied");
        let remote = Arc::new(FakeRemote::new());
        serve_version(&remote, "1.7.10");
        let downloader = Downloader::new(remote.clone());
        let mut binaries = BinaryRegistry::load(store.clone()).await.unwrap();
        binaries.install_vanilla(&downloader, "1.7.10", 13).await.unwrap();
        binaries.clone_vanilla("1.7.10", "mine").await.unwrap();

        let occupied = binaries.paths(&BinaryKey::custom("ours"));
        std::fs::create_dir_all(&occupied.json).unwrap();

        let err = binaries.rename("mine", "ours").await.unwrap_err();
        assert!(matches!(err, LauncherError::AlreadyExists(_)));
        let old = binaries.paths(&BinaryKey::custom("mine"));
        assert!(old.jar.is_file());
        assert!(old.json.is_file());
        assert!(occupied.json.is_dir());
        assert!(binaries.check_integrity().is_empty());

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[tokio::test]
    async fn delete_removes_record_and_directory() {
        let store = scratch("delete");
        let dir = std::env::temp_dir().join(format!("yamcl-bin-src-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a.jar"), b"jar").unwrap();
        std::fs::write(dir.join("a.json"), manifest("a", 4)).unwrap();

        let mut binaries = BinaryRegistry::load(store.clone()).await.unwrap();
        binaries
            .install_custom("a", &dir.join("a.jar"), &dir.join("a.json"))
            .await
            .unwrap();
        binaries.delete(&BinaryKey::custom("a")).await.unwrap();

        assert!(!binaries.exists(&BinaryKey::custom("a")));
        assert!(!store.root().join("bin").join("custom").exists());
        assert!(store.root().join("bin").join("index.json").exists());

        let _ = std::fs::remove_dir_all(store.root());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
