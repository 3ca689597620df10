// ─── Version File ───
// Strongly typed per-version manifest (`bin/<type>/<id>/<id>.json`).

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::rules::{self, Rule};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::platform::Family;

/// Assets id used by manifests that predate the `assets` field.
pub const LEGACY_ASSETS_ID: &str = "legacy";

/// A fully parsed version manifest.
///
/// Fields the launcher does not interpret are kept in `extra` and written
/// back untouched when a custom manifest is saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionManifest {
    pub id: String,
    #[serde(default)]
    pub minimum_launcher_version: u32,
    pub main_class: String,
    /// Whitespace separated argument template with `${key}` placeholders.
    #[serde(default)]
    pub minecraft_arguments: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<String>,
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl VersionManifest {
    /// Parse and validate a manifest document.
    pub fn parse(raw: &str, path: &Path) -> LauncherResult<Self> {
        let manifest: VersionManifest =
            serde_json::from_str(raw).map_err(|e| LauncherError::InvalidManifest {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        manifest.validate(path)?;
        Ok(manifest)
    }

    fn validate(&self, path: &Path) -> LauncherResult<()> {
        let invalid = |reason: String| LauncherError::InvalidManifest {
            path: path.to_path_buf(),
            reason,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("empty id".into()));
        }
        if self.main_class.trim().is_empty() {
            return Err(invalid("empty mainClass".into()));
        }
        for lib in &self.libraries {
            if lib.name.split(':').count() < 3 {
                return Err(invalid(format!("library '{}' is not group:artifact:version", lib.name)));
            }
        }
        Ok(())
    }

    pub fn assets_id(&self) -> &str {
        self.assets.as_deref().unwrap_or(LEGACY_ASSETS_ID)
    }
}

// ─── Library Entry ───

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryEntry {
    /// Maven coordinate `group:artifact:version`.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<Rule>>,
    /// Family name → classifier template, e.g. `natives-windows-${arch}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natives: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract: Option<ExtractRules>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractRules {
    /// Archive path prefixes skipped when unpacking natives.
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LibraryEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: None,
            natives: None,
            extract: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn rules(&self) -> &[Rule] {
        self.rules.as_deref().unwrap_or(&[])
    }

    pub fn is_supported(&self, family: Family) -> bool {
        rules::evaluate(self.rules(), family)
    }

    pub fn is_natives(&self) -> bool {
        self.natives.is_some()
    }

    /// Classifier template for `family`, if the library ships natives for it.
    pub fn native_template(&self, family: Family) -> Option<&str> {
        self.natives.as_ref()?.get(family.as_str()).map(String::as_str)
    }

    /// Known families listed in the natives map.
    pub fn native_families(&self) -> Vec<Family> {
        self.natives
            .as_ref()
            .map(|n| n.keys().filter_map(|k| k.parse::<Family>().ok()).collect())
            .unwrap_or_default()
    }

    pub fn exclude(&self) -> &[String] {
        self.extract.as_ref().map(|e| e.exclude.as_slice()).unwrap_or(&[])
    }
}
