pub mod manifest;
pub mod metadata;
pub mod rules;
pub mod version_file;

pub use manifest::{VersionEntry, VersionList};
pub use metadata::VersionMetadata;
pub use rules::{evaluate, platform_map, rules_from_map, OsRule, Rule, RuleAction};
pub use version_file::{ExtractRules, LibraryEntry, VersionManifest, LEGACY_ASSETS_ID};
