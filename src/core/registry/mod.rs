// ─── Registry ───
// On-disk JSON index of installed artifacts. Every mutation is written
// through atomically before the call returns.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::storage::{fs, PathStore, StoragePath};

/// A record kept in a [`Registry`].
pub trait Record: Clone + Send + Sync {
    type Key: Clone + Ord + Hash + fmt::Display + fmt::Debug + Send + Sync;
    /// The serialized form of the whole index file.
    type Index: Serialize + DeserializeOwned + Default;

    fn key(&self) -> Self::Key;

    /// This record under another key, pointing at the paths that key owns.
    fn with_key(&self, key: &Self::Key) -> Self;

    /// The file or directory removed together with the record.
    fn root(&self) -> StoragePath;

    /// Paths that must exist for the record to be valid. They are moved
    /// pairwise when the record is renamed.
    fn files(&self) -> Vec<StoragePath> {
        vec![self.root()]
    }

    /// Fails when this record may not be renamed.
    fn ensure_renamable(&self) -> LauncherResult<()> {
        Ok(())
    }

    fn encode<'a>(records: impl Iterator<Item = &'a Self>) -> Self::Index
    where
        Self: 'a;

    fn decode(index: Self::Index) -> Vec<Self>;
}

pub struct Registry<R: Record> {
    store: PathStore,
    index_path: StoragePath,
    records: BTreeMap<R::Key, R>,
}

impl<R: Record> Registry<R> {
    /// Read the index at `index_path`; a missing file is an empty registry.
    pub async fn load(store: PathStore, index_path: StoragePath) -> LauncherResult<Self> {
        let absolute = store.absolute(&index_path);
        let index: R::Index = if absolute.exists() {
            fs::read_json(&absolute).await?
        } else {
            R::Index::default()
        };

        let records: BTreeMap<R::Key, R> = R::decode(index)
            .into_iter()
            .map(|record| (record.key(), record))
            .collect();
        debug!("Loaded {} records from {}", records.len(), index_path);

        Ok(Self {
            store,
            index_path,
            records,
        })
    }

    pub fn store(&self) -> &PathStore {
        &self.store
    }

    pub fn index_path(&self) -> &StoragePath {
        &self.index_path
    }

    pub fn get(&self, key: &R::Key) -> Option<&R> {
        self.records.get(key)
    }

    pub fn contains(&self, key: &R::Key) -> bool {
        self.records.contains_key(key)
    }

    pub fn find(&self, predicate: impl Fn(&R) -> bool) -> Option<&R> {
        self.records.values().find(|r| predicate(r))
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.records.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &R::Key> {
        self.records.keys()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Register a new record.
    pub async fn add(&mut self, record: R) -> LauncherResult<()> {
        let key = record.key();
        if self.records.contains_key(&key) {
            return Err(LauncherError::AlreadyExists(key.to_string()));
        }
        self.records.insert(key.clone(), record);
        info!("Registered {}", key);
        self.flush().await
    }

    /// Insert or replace several records with a single write.
    pub async fn upsert_all(&mut self, records: Vec<R>) -> LauncherResult<()> {
        for record in records {
            self.records.insert(record.key(), record);
        }
        self.flush().await
    }

    /// Edit a record in place.
    pub async fn update(&mut self, key: &R::Key, edit: impl FnOnce(&mut R)) -> LauncherResult<()> {
        let record = self
            .records
            .get_mut(key)
            .ok_or_else(|| LauncherError::NotFound(key.to_string()))?;
        edit(record);
        self.flush().await
    }

    /// Drop a record, then delete its files and any parent directories left
    /// empty.
    pub async fn remove(&mut self, key: &R::Key) -> LauncherResult<R> {
        let record = self
            .records
            .remove(key)
            .ok_or_else(|| LauncherError::NotFound(key.to_string()))?;
        self.flush().await?;

        fs::delete_and_clean(self.store.root(), &self.store.absolute(&record.root())).await?;
        info!("Removed {}", key);
        Ok(record)
    }

    /// Move a record's files to the locations owned by `new_key`, then
    /// update the index. The index is written only after every file has
    /// moved, so it never names a path that does not exist. A failed move
    /// puts the files already moved back where they were.
    pub async fn rename(&mut self, old_key: &R::Key, new_key: &R::Key) -> LauncherResult<()> {
        let current = self
            .records
            .get(old_key)
            .ok_or_else(|| LauncherError::NotFound(old_key.to_string()))?
            .clone();
        current.ensure_renamable()?;
        if self.records.contains_key(new_key) {
            return Err(LauncherError::AlreadyExists(new_key.to_string()));
        }

        let renamed = current.with_key(new_key);
        let moves: Vec<(PathBuf, PathBuf)> = current
            .files()
            .iter()
            .zip(renamed.files().iter())
            .map(|(from, to)| (self.store.absolute(from), self.store.absolute(to)))
            .collect();
        let new_root = self.store.absolute(&renamed.root());
        let separate_root = current.root() != renamed.root();
        if (separate_root && new_root.exists()) || moves.iter().any(|(_, to)| to.exists()) {
            return Err(LauncherError::AlreadyExists(format!(
                "{} (unregistered files at {:?})",
                new_key, new_root
            )));
        }

        for (moved, (from, to)) in moves.iter().enumerate() {
            if let Err(e) = fs::move_file(from, to).await {
                warn!("Renaming {} -> {} failed, restoring files: {}", old_key, new_key, e);
                for (from, to) in moves[..moved].iter().rev() {
                    if let Err(restore) = fs::move_file(to, from).await {
                        warn!("Could not restore {:?}: {}", from, restore);
                    }
                }
                if separate_root {
                    fs::delete_and_clean(self.store.root(), &new_root).await?;
                }
                return Err(e);
            }
        }
        if separate_root {
            fs::delete_and_clean(self.store.root(), &self.store.absolute(&current.root())).await?;
        }

        self.records.remove(old_key);
        self.records.insert(new_key.clone(), renamed);
        info!("Renamed {} -> {}", old_key, new_key);
        self.flush().await
    }

    /// Keys absent from `in_use`.
    pub fn unused(&self, in_use: &HashSet<R::Key>) -> Vec<R::Key> {
        self.records
            .keys()
            .filter(|k| !in_use.contains(*k))
            .cloned()
            .collect()
    }

    /// Keys of records whose files are missing on disk.
    pub fn check_integrity(&self) -> Vec<R::Key> {
        self.records
            .values()
            .filter(|record| {
                let missing = record.files().iter().find(|p| !self.store.exists(p)).cloned();
                if let Some(path) = &missing {
                    warn!("{} references missing path {}", record.key(), path);
                }
                missing.is_some()
            })
            .map(R::key)
            .collect()
    }

    /// Write the whole index atomically.
    pub async fn flush(&self) -> LauncherResult<()> {
        let index = R::encode(self.records.values());
        fs::write_json_atomic(&self.store.absolute(&self.index_path), &index).await
    }
}
