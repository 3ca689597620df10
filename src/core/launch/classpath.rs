// ─── Launch Argument Builder ───
// Composes classpath, native path and game arguments for one version.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::task::LaunchPlan;
use crate::core::auth::LaunchAccountProfile;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::library::{LibraryRegistry, LibraryResolver};
use crate::core::version::VersionMetadata;

/// Resolves installed libraries to paths on disk.
pub trait LibraryLookup {
    /// Jar of a registered plain library.
    fn jar_path(&self, library_id: &str) -> Option<PathBuf>;

    /// Extracted classifier directory of a registered native library.
    fn native_dir(&self, library_id: &str, classifier: &str) -> Option<PathBuf>;
}

impl LibraryLookup for LibraryRegistry {
    fn jar_path(&self, library_id: &str) -> Option<PathBuf> {
        LibraryRegistry::jar_path(self, library_id)
    }

    fn native_dir(&self, library_id: &str, classifier: &str) -> Option<PathBuf> {
        LibraryRegistry::native_dir(self, library_id, classifier)
    }
}

/// Values supplied by the profile and account collaborators.
#[derive(Debug, Clone)]
pub struct LaunchContext {
    pub profile_name: String,
    pub game_directory: PathBuf,
    /// The `assets/` root.
    pub assets_root: PathBuf,
    /// Object directory of the version's asset index.
    pub game_assets: PathBuf,
    pub account: LaunchAccountProfile,
}

pub struct LaunchArgumentBuilder<'a, L: LibraryLookup + ?Sized> {
    resolver: &'a LibraryResolver,
    libraries: &'a L,
}

impl<'a, L: LibraryLookup + ?Sized> LaunchArgumentBuilder<'a, L> {
    pub fn new(resolver: &'a LibraryResolver, libraries: &'a L) -> Self {
        Self {
            resolver,
            libraries,
        }
    }

    /// Assemble the launch plan for `metadata`.
    ///
    /// Every library the running platform supports must be registered, and
    /// native libraries must have the current classifier extracted. The
    /// version jar is appended to the classpath last.
    pub fn build(
        &self,
        metadata: &VersionMetadata,
        version_jar: &Path,
        context: &LaunchContext,
    ) -> LauncherResult<LaunchPlan> {
        let mut classpath = Vec::new();
        let mut native_path = Vec::new();

        for entry in metadata.libraries() {
            if !self.resolver.is_supported(entry) {
                debug!("Skipping {} on {}", entry.name, self.resolver.platform().family);
                continue;
            }
            match self.resolver.current_classifier(entry)? {
                Some(classifier) => {
                    let dir = self
                        .libraries
                        .native_dir(&entry.name, &classifier)
                        .ok_or_else(|| LauncherError::MissingDependency {
                            library: entry.name.clone(),
                            classifier: Some(classifier.clone()),
                        })?;
                    native_path.push(dir);
                }
                None => {
                    let jar = self.libraries.jar_path(&entry.name).ok_or_else(|| {
                        LauncherError::MissingDependency {
                            library: entry.name.clone(),
                            classifier: None,
                        }
                    })?;
                    classpath.push(jar);
                }
            }
        }
        classpath.push(version_jar.to_path_buf());

        let arguments = metadata.generate_arguments(&launch_variables(metadata, context));
        debug!(
            "Launch plan for {}: {} classpath entries, {} native dirs",
            metadata.id(),
            classpath.len(),
            native_path.len()
        );

        Ok(LaunchPlan {
            classpath,
            native_path,
            main_class: metadata.main_class().to_string(),
            arguments,
            game_directory: context.game_directory.clone(),
            path_separator: self.resolver.platform().path_separator(),
        })
    }
}

/// The placeholder values available to argument templates.
pub fn launch_variables(metadata: &VersionMetadata, context: &LaunchContext) -> HashMap<String, String> {
    let path = |p: &Path| p.to_string_lossy().to_string();
    let account = &context.account;
    HashMap::from([
        ("profile_name".to_string(), context.profile_name.clone()),
        ("version_name".to_string(), metadata.id().to_string()),
        ("game_directory".to_string(), path(&context.game_directory)),
        ("game_assets".to_string(), path(&context.game_assets)),
        ("assets_root".to_string(), path(&context.assets_root)),
        ("assets_index_name".to_string(), metadata.assets_id().to_string()),
        ("auth_username".to_string(), account.username.clone()),
        ("auth_player_name".to_string(), account.username.clone()),
        ("auth_uuid".to_string(), account.uuid.clone()),
        ("auth_session".to_string(), account.session.clone()),
        ("auth_access_token".to_string(), account.access_token.clone()),
        ("user_type".to_string(), account.user_type.clone()),
        ("user_properties".to_string(), account.user_properties.clone()),
    ])
}
