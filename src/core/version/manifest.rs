// ─── Version List ───
// The remote list of official versions (`versions/versions.json`), cached
// under `bin/versions.json`.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::error::LauncherResult;
use crate::core::remote::{Origin, RemoteStore, RemoteUrl};
use crate::core::storage::{fs, PathStore, StoragePath};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionList {
    #[serde(default)]
    pub latest: LatestVersions,
    pub versions: Vec<VersionEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatestVersions {
    #[serde(default)]
    pub release: Option<String>,
    #[serde(default)]
    pub snapshot: Option<String>,
}

/// A single entry in the list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    #[serde(rename = "releaseTime", default)]
    pub release_time: Option<DateTime<FixedOffset>>,
}

impl VersionList {
    pub fn remote_url() -> RemoteUrl {
        RemoteUrl::new(Origin::Download, ["versions", "versions.json"])
    }

    pub fn cache_path() -> StoragePath {
        StoragePath::new(["bin", "versions.json"])
    }

    /// Download the list and replace the local cache.
    pub async fn download(remote: &dyn RemoteStore, store: &PathStore) -> LauncherResult<Self> {
        info!("Fetching version list...");
        let raw = remote.fetch_bytes(&Self::remote_url()).await?;
        let list: VersionList = serde_json::from_slice(&raw)?;
        fs::write_atomic(&store.absolute(&Self::cache_path()), &raw).await?;
        info!("Loaded {} versions from version list", list.versions.len());
        Ok(list)
    }

    /// Read the cached list, if one was downloaded before.
    pub async fn load_cached(store: &PathStore) -> LauncherResult<Option<Self>> {
        let path = store.absolute(&Self::cache_path());
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_json(&path).await?))
    }

    pub fn find_version(&self, id: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find_version(id).is_some()
    }

    pub fn releases(&self) -> Vec<&VersionEntry> {
        self.versions
            .iter()
            .filter(|v| v.version_type == "release")
            .collect()
    }

    pub fn latest_release(&self) -> Option<&VersionEntry> {
        self.latest_of(self.latest.release.as_deref(), "release")
    }

    pub fn latest_snapshot(&self) -> Option<&VersionEntry> {
        self.latest_of(self.latest.snapshot.as_deref(), "snapshot")
    }

    // Falls back to the newest entry of that type when `latest` is absent.
    fn latest_of(&self, pinned: Option<&str>, version_type: &str) -> Option<&VersionEntry> {
        if let Some(entry) = pinned.and_then(|id| self.find_version(id)) {
            return Some(entry);
        }
        self.versions
            .iter()
            .filter(|v| v.version_type == version_type)
            .max_by_key(|v| v.release_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::remote::testing::FakeRemote;

    fn sample() -> serde_json::Value {
        serde_json::json!({
            "versions": [
                {"id": "14w21b", "type": "snapshot", "time": "2014-05-22T14:44:33+00:00", "releaseTime": "2014-05-22T14:44:33+00:00"},
                {"id": "1.7.10", "type": "release", "time": "2014-05-14T19:29:23+02:00", "releaseTime": "2014-05-14T19:29:23+02:00"},
                {"id": "1.7.9", "type": "release", "releaseTime": "2014-04-14T13:29:23+00:00"}
            ]
        })
    }

    #[test]
    fn latest_falls_back_to_newest_release_time() {
        let list: VersionList = serde_json::from_value(sample()).unwrap();
        assert_eq!(list.latest_release().unwrap().id, "1.7.10");
        assert_eq!(list.latest_snapshot().unwrap().id, "14w21b");
        assert_eq!(list.releases().len(), 2);
    }

    #[test]
    fn pinned_latest_wins() {
        let mut value = sample();
        value["latest"] = serde_json::json!({"release": "1.7.9", "snapshot": "14w21b"});
        let list: VersionList = serde_json::from_value(value).unwrap();
        assert_eq!(list.latest_release().unwrap().id, "1.7.9");
    }

    #[tokio::test]
    async fn download_caches_the_list() {
        let root = std::env::temp_dir().join(format!("yamcl-versions-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        let store = PathStore::new(&root);
        let remote = FakeRemote::new();
        remote.serve(&VersionList::remote_url(), sample().to_string());

        assert!(VersionList::load_cached(&store).await.unwrap().is_none());
        let list = VersionList::download(&remote, &store).await.unwrap();
        assert!(list.contains("1.7.10"));

        let cached = VersionList::load_cached(&store).await.unwrap().unwrap();
        assert_eq!(cached.versions.len(), 3);

        let _ = std::fs::remove_dir_all(&root);
    }
}
