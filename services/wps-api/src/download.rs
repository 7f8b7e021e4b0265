//! Single-attempt HTTP download of remote datasets.
//!
//! Used by the resource materializer when a dataset cannot be opened in
//! place. The body is streamed into `<target>.partial` and renamed once
//! complete, so a failed transfer never leaves a file at the target path.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};

/// Download failures, classified so authorization can be told apart.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The server answered 401 or 403.
    #[error("access denied (HTTP {0})")]
    Unauthorized(u16),

    /// Any other non-success status.
    #[error("HTTP error: {0}")]
    Status(u16),

    /// Connection, timeout or body read failure.
    #[error("transfer failed: {0}")]
    Transport(String),

    /// The resource is not an HTTP(S) URL.
    #[error("cannot download '{0}': not an http(s) URL")]
    UnsupportedSource(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for DownloadError {
    fn from(err: reqwest::Error) -> Self {
        DownloadError::Transport(err.to_string())
    }
}

/// Classify an HTTP status of a download response.
pub fn classify_status(status: StatusCode) -> Result<(), DownloadError> {
    if status.is_success() {
        Ok(())
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Err(DownloadError::Unauthorized(status.as_u16()))
    } else {
        Err(DownloadError::Status(status.as_u16()))
    }
}

/// Fetches a remote resource into a local file.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url` to `target`, returning the number of bytes written.
    async fn download(&self, url: &str, target: &Path) -> Result<u64, DownloadError>;
}

/// Configuration for the HTTP downloader.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Whole-request timeout
    pub request_timeout: Duration,
    /// Connection establishment timeout
    pub connect_timeout: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(600), // 10 minutes
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// `reqwest`-backed downloader.
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    /// Create a downloader with the given timeouts.
    pub fn new(config: &DownloadConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .tcp_nodelay(true)
            .build()?;
        Ok(Self { client })
    }
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

/// Stream a response body into `path`, returning the number of bytes written.
async fn write_body(response: reqwest::Response, path: &Path) -> Result<u64, DownloadError> {
    let mut file = File::create(path).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

#[async_trait]
impl Downloader for HttpDownloader {
    #[instrument(skip(self, target), fields(path = %target.display()))]
    async fn download(&self, url: &str, target: &Path) -> Result<u64, DownloadError> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(DownloadError::UnsupportedSource(url.to_string()));
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        let response = self.client.get(url).send().await?;
        classify_status(response.status())?;

        let temp_path = partial_path(target);
        let written = match write_body(response, &temp_path).await {
            Ok(written) => written,
            Err(e) => {
                fs::remove_file(&temp_path).await.ok();
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&temp_path, target).await {
            fs::remove_file(&temp_path).await.ok();
            return Err(e.into());
        }

        info!(url = %url, bytes = written, "Download completed");
        Ok(written)
    }
}
