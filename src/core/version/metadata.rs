// ─── Version Metadata ───
// Reads a version manifest from disk and edits custom ones in place.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::rules::rules_from_map;
use super::version_file::{LibraryEntry, VersionManifest};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::platform::Family;
use crate::core::storage::fs;

/// A version manifest bound to its file.
///
/// Vanilla manifests are read-only. Instances opened in custom mode accept
/// mutators, each of which rewrites the file atomically before returning.
#[derive(Debug, Clone)]
pub struct VersionMetadata {
    path: PathBuf,
    manifest: VersionManifest,
    custom: bool,
}

impl VersionMetadata {
    pub async fn open(path: &Path, custom: bool) -> LauncherResult<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| LauncherError::io(path, e))?;
        let manifest = VersionManifest::parse(&raw, path)?;
        debug!("Opened manifest {} ({} libraries)", manifest.id, manifest.libraries.len());
        Ok(Self {
            path: path.to_path_buf(),
            manifest,
            custom,
        })
    }

    pub fn from_manifest(path: PathBuf, manifest: VersionManifest, custom: bool) -> Self {
        Self {
            path,
            manifest,
            custom,
        }
    }

    pub fn manifest(&self) -> &VersionManifest {
        &self.manifest
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_custom(&self) -> bool {
        self.custom
    }

    pub fn id(&self) -> &str {
        &self.manifest.id
    }

    pub fn main_class(&self) -> &str {
        &self.manifest.main_class
    }

    pub fn minimum_version(&self) -> u32 {
        self.manifest.minimum_launcher_version
    }

    pub fn arguments_template(&self) -> &str {
        &self.manifest.minecraft_arguments
    }

    pub fn assets_id(&self) -> &str {
        self.manifest.assets_id()
    }

    pub fn libraries(&self) -> &[LibraryEntry] {
        &self.manifest.libraries
    }

    pub fn library_ids(&self) -> Vec<&str> {
        self.manifest.libraries.iter().map(|l| l.name.as_str()).collect()
    }

    /// Whether a launcher implementing `engine_version` may run this version.
    pub fn is_compatible(&self, engine_version: u32) -> bool {
        self.manifest.minimum_launcher_version <= engine_version
    }

    /// Split the argument template on whitespace and replace every token that
    /// is exactly `${key}` with `values[key]`. Unknown placeholders and
    /// partial matches are left as written; substituted values are not quoted.
    pub fn generate_arguments(&self, values: &HashMap<String, String>) -> Vec<String> {
        self.manifest
            .minecraft_arguments
            .split_whitespace()
            .map(|token| {
                token
                    .strip_prefix("${")
                    .and_then(|rest| rest.strip_suffix('}'))
                    .and_then(|key| values.get(key))
                    .cloned()
                    .unwrap_or_else(|| token.to_string())
            })
            .collect()
    }

    // ── Custom version editing ──────────────────────────

    fn ensure_custom(&self) -> LauncherResult<()> {
        if self.custom {
            Ok(())
        } else {
            Err(LauncherError::NotCustomVersion(self.manifest.id.clone()))
        }
    }

    pub async fn set_id(&mut self, id: &str) -> LauncherResult<()> {
        self.ensure_custom()?;
        self.manifest.id = id.to_string();
        self.flush().await
    }

    pub async fn set_main_class(&mut self, main_class: &str) -> LauncherResult<()> {
        self.ensure_custom()?;
        self.manifest.main_class = main_class.to_string();
        self.flush().await
    }

    pub async fn set_arguments(&mut self, template: &str) -> LauncherResult<()> {
        self.ensure_custom()?;
        self.manifest.minecraft_arguments = template.to_string();
        self.flush().await
    }

    pub async fn set_minimum_version(&mut self, version: u32) -> LauncherResult<()> {
        self.ensure_custom()?;
        self.manifest.minimum_launcher_version = version;
        self.flush().await
    }

    pub async fn set_assets_id(&mut self, assets_id: &str) -> LauncherResult<()> {
        self.ensure_custom()?;
        self.manifest.assets = Some(assets_id.to_string());
        self.flush().await
    }

    /// Append a library entry.
    ///
    /// `rules` maps families to allow/disallow; families left out are
    /// disallowed. `natives` maps families to classifier templates.
    pub async fn add_library(
        &mut self,
        library_id: &str,
        rules: Option<&BTreeMap<Family, bool>>,
        natives: Option<&BTreeMap<Family, String>>,
    ) -> LauncherResult<()> {
        self.ensure_custom()?;
        if self.manifest.libraries.iter().any(|l| l.name == library_id) {
            return Err(LauncherError::AlreadyExists(library_id.to_string()));
        }
        if library_id.split(':').count() < 3 {
            return Err(LauncherError::InvalidMavenCoordinate(library_id.to_string()));
        }

        let mut entry = LibraryEntry::new(library_id);
        entry.rules = rules.map(rules_from_map);
        entry.natives = natives.map(|n| {
            n.iter()
                .map(|(family, template)| (family.as_str().to_string(), template.clone()))
                .collect()
        });

        self.manifest.libraries.push(entry);
        info!("Added library {} to {}", library_id, self.manifest.id);
        self.flush().await
    }

    pub async fn delete_library(&mut self, library_id: &str) -> LauncherResult<()> {
        self.ensure_custom()?;
        let position = self
            .manifest
            .libraries
            .iter()
            .position(|l| l.name == library_id)
            .ok_or_else(|| LauncherError::NotFound(library_id.to_string()))?;
        self.manifest.libraries.remove(position);
        info!("Removed library {} from {}", library_id, self.manifest.id);
        self.flush().await
    }

    async fn flush(&self) -> LauncherResult<()> {
        fs::write_json_atomic(&self.path, &self.manifest).await
    }
}
