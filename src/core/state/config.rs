use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::error::LauncherResult;
use crate::core::platform::Platform;
use crate::core::remote::RemoteEndpoints;
use crate::core::storage::fs;

const APP_DIR_NAME: &str = ".yamcl";
pub const SETTINGS_FILE: &str = "launcher_settings.json";

/// Launcher engine version this build implements.
pub const COMPATIBLE_VERSION: u32 = 13;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    pub data_dir: PathBuf,
    pub compatible_version: u32,
    /// Fetch only the native classifier of the running platform.
    pub download_exclusive: bool,
    pub concurrency: usize,
    pub endpoints: RemoteEndpoints,
    pub platform_override: Option<Platform>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            compatible_version: COMPATIBLE_VERSION,
            download_exclusive: true,
            concurrency: 8,
            endpoints: RemoteEndpoints::default(),
            platform_override: None,
        }
    }
}

impl LauncherConfig {
    /// Defaults rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Read settings from `path`, falling back to defaults when absent.
    pub async fn load_or_default(path: &Path) -> LauncherResult<Self> {
        if !path.exists() {
            debug!("No settings at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let config = fs::read_json(path).await?;
        info!("Loaded settings from {:?}", path);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> LauncherResult<()> {
        fs::write_json_atomic(path, self).await
    }

    pub fn platform(&self) -> Platform {
        self.platform_override.unwrap_or_else(Platform::detect)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::{Arch, Family};

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let path = std::env::temp_dir().join(format!("yamcl-config-missing-{}.json", std::process::id()));
        let config = LauncherConfig::load_or_default(&path).await.unwrap();
        assert_eq!(config.compatible_version, 13);
        assert!(config.download_exclusive);
        assert_eq!(config.concurrency, 8);
        assert!(config.data_dir.ends_with(".yamcl"));
    }

    #[tokio::test]
    async fn partial_file_keeps_other_defaults() {
        let path = std::env::temp_dir().join(format!("yamcl-config-partial-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"data_dir": "/srv/yamcl", "download_exclusive": false, "platform_override": {"family": "windows", "arch": "32"}}"#,
        )
        .unwrap();

        let config = LauncherConfig::load_or_default(&path).await.unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/yamcl"));
        assert!(!config.download_exclusive);
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.platform(), Platform::new(Family::Windows, Arch::X32));

        let _ = std::fs::remove_file(&path);
    }
}
