// Collaborator-facing operations over the shared launcher state.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::core::auth::LaunchAccountProfile;
use crate::core::binary::{BinaryKey, InstalledVersions, VersionType};
use crate::core::downloader::Progress;
use crate::core::error::LauncherResult;
use crate::core::launch::{LaunchArgumentBuilder, LaunchContext, LaunchPlan};
use crate::core::platform::Family;
use crate::core::state::{AppState, IntegrityReport};
use crate::core::version::{VersionList, VersionMetadata};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ManifestEdit {
    SetId { id: String },
    SetMainClass { main_class: String },
    SetArguments { template: String },
    SetMinimumVersion { version: u32 },
    SetAssetsId { assets_id: String },
    AddLibrary {
        id: String,
        #[serde(default)]
        rules: Option<BTreeMap<Family, bool>>,
        #[serde(default)]
        natives: Option<BTreeMap<Family, String>>,
    },
    DeleteLibrary { id: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GarbageReport {
    pub libraries: Vec<String>,
    pub asset_indexes: Vec<String>,
}

/// Fetch the official version list, falling back to the cached copy when
/// the download origin is unreachable.
pub async fn get_versions(state: &Mutex<AppState>) -> LauncherResult<VersionList> {
    let state = state.lock().await;
    match VersionList::download(state.downloader.remote(), &state.store).await {
        Ok(list) => Ok(list),
        Err(e) => match VersionList::load_cached(&state.store).await? {
            Some(cached) => {
                warn!("Version list download failed ({}), using cache", e);
                Ok(cached)
            }
            None => Err(e),
        },
    }
}

/// Make `key` launchable: binary, libraries, asset index and objects.
///
/// Vanilla versions are installed when absent; custom versions must
/// already be installed.
pub async fn install_version(
    state: &Mutex<AppState>,
    key: &BinaryKey,
    progress: Option<Progress<'_>>,
) -> LauncherResult<VersionMetadata> {
    let mut guard = state.lock().await;
    let state = &mut *guard;

    let metadata = if key.version_type == VersionType::Vanilla && !state.binaries.exists(key) {
        state
            .binaries
            .install_vanilla(&state.downloader, &key.id, state.config.compatible_version)
            .await?
    } else {
        state.binaries.metadata(key).await?
    };

    state
        .libraries
        .download_missing(&state.resolver, &state.downloader, metadata.libraries(), progress)
        .await?;

    let assets_id = metadata.assets_id();
    if !state.assets.is_registered(assets_id) {
        state.assets.download_index(&state.downloader, assets_id).await?;
    }
    state
        .assets
        .download_missing(&state.downloader, assets_id, progress)
        .await?;

    info!("{} is ready", key);
    Ok(metadata)
}

pub async fn list_installed(state: &Mutex<AppState>) -> InstalledVersions {
    state.lock().await.binaries.installed()
}

pub async fn delete_version(state: &Mutex<AppState>, key: &BinaryKey) -> LauncherResult<()> {
    state.lock().await.binaries.delete(key).await
}

pub async fn rename_custom_version(state: &Mutex<AppState>, old_id: &str, new_id: &str) -> LauncherResult<()> {
    state.lock().await.binaries.rename(old_id, new_id).await
}

pub async fn clone_vanilla_to_custom(
    state: &Mutex<AppState>,
    vanilla_id: &str,
    custom_id: &str,
) -> LauncherResult<()> {
    state.lock().await.binaries.clone_vanilla(vanilla_id, custom_id).await
}

pub async fn install_custom(state: &Mutex<AppState>, id: &str, jar: &Path, json: &Path) -> LauncherResult<()> {
    state.lock().await.binaries.install_custom(id, jar, json).await
}

pub async fn custom_version_notes(state: &Mutex<AppState>, id: &str) -> LauncherResult<String> {
    state.lock().await.binaries.notes(id).map(str::to_string)
}

pub async fn set_custom_version_notes(state: &Mutex<AppState>, id: &str, notes: &str) -> LauncherResult<()> {
    state.lock().await.binaries.set_notes(id, notes).await
}

/// Apply one edit to an installed version's manifest. Vanilla manifests are
/// read-only.
pub async fn edit_manifest(state: &Mutex<AppState>, key: &BinaryKey, edit: ManifestEdit) -> LauncherResult<()> {
    let state = state.lock().await;
    let mut metadata = state.binaries.metadata(key).await?;
    match edit {
        ManifestEdit::SetId { id } => metadata.set_id(&id).await,
        ManifestEdit::SetMainClass { main_class } => metadata.set_main_class(&main_class).await,
        ManifestEdit::SetArguments { template } => metadata.set_arguments(&template).await,
        ManifestEdit::SetMinimumVersion { version } => metadata.set_minimum_version(version).await,
        ManifestEdit::SetAssetsId { assets_id } => metadata.set_assets_id(&assets_id).await,
        ManifestEdit::AddLibrary { id, rules, natives } => {
            metadata
                .add_library(&id, rules.as_ref(), natives.as_ref())
                .await
        }
        ManifestEdit::DeleteLibrary { id } => metadata.delete_library(&id).await,
    }
}

/// Build the launch plan of an installed version inside `profile_name`.
pub async fn resolve_launch_plan(
    state: &Mutex<AppState>,
    key: &BinaryKey,
    profile_name: &str,
    account: LaunchAccountProfile,
) -> LauncherResult<LaunchPlan> {
    let state = state.lock().await;
    let metadata = state.binaries.metadata(key).await?;
    let profile = state.profiles.get(profile_name).await?;
    let assets = state.assets.paths(metadata.assets_id()).await?;

    let context = LaunchContext {
        profile_name: profile.name().to_string(),
        game_directory: profile.directory().to_path_buf(),
        assets_root: state.assets.root(),
        game_assets: assets.directory,
        account: account.sanitized(),
    };
    let jar = state.binaries.paths(key).jar;
    LaunchArgumentBuilder::new(&state.resolver, &state.libraries).build(&metadata, &jar, &context)
}

/// Delete libraries and asset indexes no installed manifest references.
pub async fn collect_garbage(state: &Mutex<AppState>) -> LauncherResult<GarbageReport> {
    let mut guard = state.lock().await;
    let state = &mut *guard;

    let mut libraries_in_use = HashSet::new();
    let mut assets_in_use = HashSet::new();
    for key in state.binaries.keys() {
        let metadata = state.binaries.metadata(&key).await?;
        libraries_in_use.extend(metadata.library_ids().into_iter().map(str::to_string));
        assets_in_use.insert(metadata.assets_id().to_string());
    }

    let mut report = GarbageReport::default();
    for id in state.libraries.unused(&libraries_in_use) {
        state.libraries.delete(&id).await?;
        report.libraries.push(id);
    }
    for id in state.assets.registered_ids().await? {
        if assets_in_use.contains(&id) {
            continue;
        }
        state.assets.delete_index(&id).await?;
        report.asset_indexes.push(id);
    }

    info!(
        "Garbage collection removed {} libraries and {} asset indexes",
        report.libraries.len(),
        report.asset_indexes.len()
    );
    Ok(report)
}

pub async fn check_data_integrity(state: &Mutex<AppState>) -> IntegrityReport {
    state.lock().await.check_data_integrity()
}
