use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A logical path relative to the data root, stored as its segments.
///
/// Indexes persist these as JSON string arrays so the on-disk format is
/// independent of the platform path separator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoragePath(Vec<String>);

impl StoragePath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Parse a `/`-separated relative path. Empty and `.` segments are
    /// dropped; `None` if any segment would leave the root.
    pub fn parse(raw: &str) -> Option<Self> {
        let segments: Vec<&str> = raw
            .split(['/', '\\'])
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();
        if !segments.iter().all(|s| is_enclosed_segment(s)) {
            return None;
        }
        Some(Self::new(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn join(&self, other: &StoragePath) -> Self {
        let mut segments = self.0.clone();
        segments.extend(other.0.iter().cloned());
        Self(segments)
    }

    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// The containing directory. The parent of a single segment is empty.
    pub fn parent(&self) -> Self {
        let mut segments = self.0.clone();
        segments.pop();
        Self(segments)
    }
}

/// A single normal path component: no parent references, separators or
/// drive prefixes.
fn is_enclosed_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != ".."
        && !segment.contains(['/', '\\', ':'])
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Maps logical storage paths to absolute locations under one root.
///
/// All components address the data directory through this type, which keeps
/// separator handling in a single place.
#[derive(Debug, Clone)]
pub struct PathStore {
    root: PathBuf,
}

impl PathStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute filesystem location of `path`. Segments that could leave the
    /// root (`..`, drive prefixes, embedded separators) are skipped, so the
    /// result always lies under the root.
    pub fn absolute(&self, path: &StoragePath) -> PathBuf {
        path.segments()
            .iter()
            .filter(|segment| is_enclosed_segment(segment))
            .fold(self.root.clone(), |acc, segment| acc.join(segment))
    }

    pub fn exists(&self, path: &StoragePath) -> bool {
        self.absolute(path).exists()
    }
}
