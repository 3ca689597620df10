// ─── Profiles ───
// Game directories under `profile/`, indexed by `profile/index.json`. Each
// holds a `yamcl_metadata.json` with notes and the versions it uses.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::binary::VersionType;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::registry::{Record, Registry};
use crate::core::storage::{fs, PathStore, StoragePath};

const PROFILES_DIR: &str = "profile";
const METADATA_FILE: &str = "yamcl_metadata.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
    pub name: String,
    /// Relative to the profiles directory.
    pub directory: StoragePath,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileIndexEntry {
    pub directory: StoragePath,
}

fn profiles_root() -> StoragePath {
    StoragePath::new([PROFILES_DIR])
}

impl Record for ProfileRecord {
    type Key = String;
    type Index = BTreeMap<String, ProfileIndexEntry>;

    fn key(&self) -> String {
        self.name.clone()
    }

    fn with_key(&self, key: &String) -> Self {
        Self {
            name: key.clone(),
            directory: self.directory.clone(),
        }
    }

    fn root(&self) -> StoragePath {
        profiles_root().join(&self.directory)
    }

    fn files(&self) -> Vec<StoragePath> {
        vec![self.root().child(METADATA_FILE)]
    }

    fn encode<'a>(records: impl Iterator<Item = &'a Self>) -> Self::Index {
        records
            .map(|r| {
                (
                    r.name.clone(),
                    ProfileIndexEntry {
                        directory: r.directory.clone(),
                    },
                )
            })
            .collect()
    }

    fn decode(index: Self::Index) -> Vec<Self> {
        index
            .into_iter()
            .map(|(name, entry)| ProfileRecord {
                name,
                directory: entry.directory,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileMetadata {
    #[serde(default)]
    pub notes: String,
    #[serde(rename = "vanillaversions", default)]
    pub vanilla_versions: Vec<String>,
    #[serde(rename = "customversions", default)]
    pub custom_versions: Vec<String>,
}

impl ProfileMetadata {
    fn versions_mut(&mut self, version_type: VersionType) -> &mut Vec<String> {
        match version_type {
            VersionType::Vanilla => &mut self.vanilla_versions,
            VersionType::Custom => &mut self.custom_versions,
        }
    }
}

/// An open profile and its metadata file.
#[derive(Debug, Clone)]
pub struct Profile {
    name: String,
    directory: PathBuf,
    metadata: ProfileMetadata,
}

impl Profile {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The game directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn metadata(&self) -> &ProfileMetadata {
        &self.metadata
    }

    pub fn notes(&self) -> &str {
        &self.metadata.notes
    }

    pub async fn set_notes(&mut self, notes: &str) -> LauncherResult<()> {
        self.metadata.notes = notes.to_string();
        self.flush().await
    }

    pub fn versions(&self, version_type: VersionType) -> &[String] {
        match version_type {
            VersionType::Vanilla => &self.metadata.vanilla_versions,
            VersionType::Custom => &self.metadata.custom_versions,
        }
    }

    pub async fn add_version(&mut self, id: &str, version_type: VersionType) -> LauncherResult<()> {
        let versions = self.metadata.versions_mut(version_type);
        if !versions.iter().any(|v| v == id) {
            versions.push(id.to_string());
        }
        self.flush().await
    }

    pub async fn remove_version(&mut self, id: &str, version_type: VersionType) -> LauncherResult<()> {
        self.metadata.versions_mut(version_type).retain(|v| v != id);
        self.flush().await
    }

    async fn flush(&self) -> LauncherResult<()> {
        fs::write_json_atomic(&self.directory.join(METADATA_FILE), &self.metadata).await
    }
}

pub struct ProfileRegistry {
    registry: Registry<ProfileRecord>,
}

impl ProfileRegistry {
    pub fn index_path() -> StoragePath {
        profiles_root().child("index.json")
    }

    pub async fn load(store: PathStore) -> LauncherResult<Self> {
        Ok(Self {
            registry: Registry::load(store, Self::index_path()).await?,
        })
    }

    pub fn names(&self) -> Vec<String> {
        self.registry.keys().cloned().collect()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.registry.contains(&name.to_string())
    }

    /// Create a profile. Its directory is a filesystem-safe form of `name`,
    /// suffixed when another profile already uses it.
    pub async fn add(&mut self, name: &str) -> LauncherResult<Profile> {
        if self.exists(name) {
            return Err(LauncherError::AlreadyExists(format!("profile {}", name)));
        }

        let base = fs::create_valid_name(name);
        let mut directory = base.clone();
        let mut suffix = 2;
        while self.directory_taken(&directory) {
            directory = format!("{}_{}", base, suffix);
            suffix += 1;
        }

        let record = ProfileRecord {
            name: name.to_string(),
            directory: StoragePath::new([directory]),
        };
        let profile = Profile {
            name: name.to_string(),
            directory: self.registry.store().absolute(&record.root()),
            metadata: ProfileMetadata::default(),
        };
        profile.flush().await?;
        self.registry.add(record).await?;
        info!("Created profile {}", name);
        Ok(profile)
    }

    fn directory_taken(&self, directory: &str) -> bool {
        self.registry
            .find(|r| r.directory.segments() == [directory.to_string()])
            .is_some()
            || self
                .registry
                .store()
                .exists(&profiles_root().child(directory))
    }

    pub async fn get(&self, name: &str) -> LauncherResult<Profile> {
        let record = self
            .registry
            .get(&name.to_string())
            .ok_or_else(|| LauncherError::NotFound(format!("profile {}", name)))?;
        let directory = self.registry.store().absolute(&record.root());
        let metadata = fs::read_json(&directory.join(METADATA_FILE)).await?;
        Ok(Profile {
            name: name.to_string(),
            directory,
            metadata,
        })
    }

    /// Delete a profile and its whole game directory.
    pub async fn delete(&mut self, name: &str) -> LauncherResult<()> {
        self.registry
            .remove(&name.to_string())
            .await
            .map(|_| ())
            .map_err(|e| match e {
                LauncherError::NotFound(_) => LauncherError::NotFound(format!("profile {}", name)),
                other => other,
            })
    }

    pub fn check_integrity(&self) -> Vec<String> {
        self.registry.check_integrity()
    }
}
