// ─── Library Index ───
// `lib/index.json`: library id → storage path under `lib/`.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::error::LauncherResult;
use crate::core::registry::{Record, Registry};
use crate::core::storage::{PathStore, StoragePath};

pub const LIBRARIES_DIR: &str = "lib";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryRecord {
    pub id: String,
    /// Jar file, or the directory holding native classifier folders.
    /// Relative to the libraries directory.
    pub path: StoragePath,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryIndexEntry {
    pub path: StoragePath,
}

fn libraries_root() -> StoragePath {
    StoragePath::new([LIBRARIES_DIR])
}

impl Record for LibraryRecord {
    type Key = String;
    type Index = BTreeMap<String, LibraryIndexEntry>;

    fn key(&self) -> String {
        self.id.clone()
    }

    fn with_key(&self, key: &String) -> Self {
        Self {
            id: key.clone(),
            path: self.path.clone(),
        }
    }

    fn root(&self) -> StoragePath {
        libraries_root().join(&self.path)
    }

    fn encode<'a>(records: impl Iterator<Item = &'a Self>) -> Self::Index {
        records
            .map(|r| (r.id.clone(), LibraryIndexEntry { path: r.path.clone() }))
            .collect()
    }

    fn decode(index: Self::Index) -> Vec<Self> {
        index
            .into_iter()
            .map(|(id, entry)| LibraryRecord { id, path: entry.path })
            .collect()
    }
}

/// The library registry plus path lookups used at launch.
pub struct LibraryRegistry {
    registry: Registry<LibraryRecord>,
}

impl LibraryRegistry {
    pub fn index_path() -> StoragePath {
        libraries_root().child("index.json")
    }

    pub async fn load(store: PathStore) -> LauncherResult<Self> {
        Ok(Self {
            registry: Registry::load(store, Self::index_path()).await?,
        })
    }

    pub fn registry(&self) -> &Registry<LibraryRecord> {
        &self.registry
    }

    pub(crate) fn registry_mut(&mut self) -> &mut Registry<LibraryRecord> {
        &mut self.registry
    }

    pub fn store(&self) -> &PathStore {
        self.registry.store()
    }

    /// Absolute location of `path` (relative to `lib/`).
    pub fn absolute(&self, path: &StoragePath) -> PathBuf {
        self.store().absolute(&libraries_root().join(path))
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.registry.contains(&id.to_string())
    }

    pub fn record(&self, id: &str) -> Option<&LibraryRecord> {
        self.registry.get(&id.to_string())
    }

    /// Whether the classifier directory of a registered native library exists.
    pub fn native_present(&self, id: &str, classifier: &str) -> bool {
        self.record(id)
            .map(|r| self.absolute(&r.path.child(classifier)).is_dir())
            .unwrap_or(false)
    }

    /// Absolute jar path of a registered plain library.
    pub fn jar_path(&self, id: &str) -> Option<PathBuf> {
        self.record(id).map(|r| self.absolute(&r.path))
    }

    /// Absolute classifier directory of a registered native library, if it
    /// exists on disk.
    pub fn native_dir(&self, id: &str, classifier: &str) -> Option<PathBuf> {
        if !self.native_present(id, classifier) {
            return None;
        }
        self.record(id).map(|r| self.absolute(&r.path.child(classifier)))
    }

    pub fn ids(&self) -> Vec<String> {
        self.registry.keys().cloned().collect()
    }

    pub fn unused(&self, in_use: &HashSet<String>) -> Vec<String> {
        self.registry.unused(in_use)
    }

    /// Unregister `id` and delete its files.
    pub async fn delete(&mut self, id: &str) -> LauncherResult<()> {
        self.registry.remove(&id.to_string()).await.map(|_| ())
    }

    pub fn check_integrity(&self) -> Vec<String> {
        self.registry.check_integrity()
    }
}
