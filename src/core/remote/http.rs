use async_trait::async_trait;
use futures_util::stream::{StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;
use tracing::debug;

use super::{ByteStream, RemoteEndpoints, RemoteStore, RemoteUrl};
use crate::core::error::{LauncherError, LauncherResult};

const APP_USER_AGENT: &str = concat!("YAMCL/", env!("CARGO_PKG_VERSION"));

pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    // Hashes are computed over the bytes as stored, so no transfer encoding.
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .build()
}

/// `RemoteStore` backed by `reqwest`.
pub struct HttpRemoteStore {
    client: Client,
    endpoints: RemoteEndpoints,
}

impl HttpRemoteStore {
    pub fn new(endpoints: RemoteEndpoints) -> LauncherResult<Self> {
        Ok(Self {
            client: build_http_client()?,
            endpoints,
        })
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn open(&self, url: &RemoteUrl) -> LauncherResult<ByteStream> {
        let rendered = self.endpoints.render(url);
        debug!("GET {}", rendered);

        let response = self.client.get(&rendered).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: rendered,
                status: status.as_u16(),
            });
        }

        Ok(response
            .bytes_stream()
            .map_ok(|chunk| chunk.to_vec())
            .map_err(LauncherError::from)
            .boxed())
    }
}
