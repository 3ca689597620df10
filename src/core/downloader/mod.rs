mod client;
mod natives;

pub use client::{sha1_hex, DownloadEntry, Downloader, ExpectedHash, Progress, MAX_ATTEMPTS};
pub use natives::extract_natives;

#[cfg(test)]
pub(crate) use natives::testing::jar_with;
