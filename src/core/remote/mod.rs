// ─── Remote Store ───
// Read-only access to the artifact origins (binaries, assets, libraries).

mod http;

use std::fmt;

use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::core::error::{LauncherError, LauncherResult};

pub use http::{build_http_client, HttpRemoteStore};

/// Chunked response body.
pub type ByteStream = BoxStream<'static, LauncherResult<Vec<u8>>>;

/// The base URL a remote path is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Version jars, version manifests and asset indexes.
    Download,
    /// Content-addressed asset objects.
    Resources,
    /// Maven-style library repository.
    Libraries,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Download => f.write_str("download"),
            Origin::Resources => f.write_str("resources"),
            Origin::Libraries => f.write_str("libraries"),
        }
    }
}

/// Base URLs of every origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEndpoints {
    pub download: String,
    pub resources: String,
    pub libraries: String,
}

impl Default for RemoteEndpoints {
    fn default() -> Self {
        Self {
            download: "https://s3.amazonaws.com/Minecraft.Download".into(),
            resources: "https://resources.download.minecraft.net".into(),
            libraries: "https://libraries.minecraft.net".into(),
        }
    }
}

impl RemoteEndpoints {
    pub fn base(&self, origin: Origin) -> &str {
        match origin {
            Origin::Download => &self.download,
            Origin::Resources => &self.resources,
            Origin::Libraries => &self.libraries,
        }
    }

    /// Absolute URL for `url` under its origin.
    pub fn render(&self, url: &RemoteUrl) -> String {
        format!(
            "{}/{}",
            self.base(url.origin).trim_end_matches('/'),
            url.path()
        )
    }
}

/// A path under one of the remote origins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteUrl {
    pub origin: Origin,
    segments: Vec<String>,
}

impl RemoteUrl {
    pub fn new<I, S>(origin: Origin, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            origin,
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn path(&self) -> String {
        self.segments.join("/")
    }

    /// Location of the companion integrity file (`<artifact-url>.sha1`).
    pub fn companion_sha1(&self) -> Self {
        let mut segments = self.segments.clone();
        if let Some(last) = segments.last_mut() {
            last.push_str(".sha1");
        }
        Self {
            origin: self.origin,
            segments,
        }
    }
}

impl fmt::Display for RemoteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.origin, self.path())
    }
}

/// Issues GET requests against the remote origins.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Open `url` and return its body as a stream of chunks.
    async fn open(&self, url: &RemoteUrl) -> LauncherResult<ByteStream>;

    /// Fetch a small body completely.
    async fn fetch_bytes(&self, url: &RemoteUrl) -> LauncherResult<Vec<u8>> {
        let mut stream = self.open(url).await?;
        let mut body = Vec::new();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk?);
        }
        Ok(body)
    }

    /// Fetch a UTF-8 text body.
    async fn fetch_text(&self, url: &RemoteUrl) -> LauncherResult<String> {
        let body = self.fetch_bytes(url).await?;
        String::from_utf8(body)
            .map_err(|e| LauncherError::Other(format!("Non UTF-8 body at {}: {}", url, e)))
    }
}
