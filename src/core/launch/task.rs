// ─── Launch Task ───
// Turns a launch plan into a java process invocation.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Serialize;
use tracing::{debug, info};

use crate::core::error::{LauncherError, LauncherResult};

const LAUNCHER_BRAND: &str = "yamcl";

/// Everything needed to start the game for one version and profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchPlan {
    /// Library jars in manifest order, version jar last.
    pub classpath: Vec<PathBuf>,
    /// Extracted native directories.
    pub native_path: Vec<PathBuf>,
    pub main_class: String,
    pub arguments: Vec<String>,
    pub game_directory: PathBuf,
    pub path_separator: &'static str,
}

impl LaunchPlan {
    pub fn classpath_string(&self) -> String {
        join_paths(&self.classpath, self.path_separator)
    }

    pub fn native_path_string(&self) -> String {
        join_paths(&self.native_path, self.path_separator)
    }

    /// JVM flags followed by main class and game arguments.
    pub fn jvm_arguments(&self, max_memory_mb: u32) -> Vec<String> {
        let mut args = vec![
            format!("-Xmx{}M", max_memory_mb),
            format!("-Djava.library.path={}", self.native_path_string()),
            format!("-Dminecraft.launcher.brand={}", LAUNCHER_BRAND),
            format!("-Dminecraft.launcher.version={}", env!("CARGO_PKG_VERSION")),
            "-cp".to_string(),
            self.classpath_string(),
            self.main_class.clone(),
        ];
        args.extend(self.arguments.iter().cloned());
        args
    }

    /// Build the process command. The caller decides how to spawn it.
    pub fn command(&self, java: &Path, max_memory_mb: u32) -> Command {
        let mut cmd = Command::new(java);
        cmd.args(self.jvm_arguments(max_memory_mb));
        cmd.current_dir(&self.game_directory);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        debug!("Command: {:?}", cmd);
        cmd
    }

    /// Spawn the game, creating the game directory if needed.
    pub async fn spawn(&self, java: &Path, max_memory_mb: u32) -> LauncherResult<std::process::Child> {
        tokio::fs::create_dir_all(&self.game_directory)
            .await
            .map_err(|e| LauncherError::io(&self.game_directory, e))?;
        info!("Launching {} with Java {:?}", self.main_class, java);
        self.command(java, max_memory_mb)
            .spawn()
            .map_err(|e| LauncherError::io(java, e))
    }
}

fn join_paths(paths: &[PathBuf], separator: &str) -> String {
    paths
        .iter()
        .map(|p| p.to_string_lossy())
        .collect::<Vec<_>>()
        .join(separator)
}
