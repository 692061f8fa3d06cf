//! Streaming HTTP fetcher for resolved firmware URLs.
//!
//! Adapted around `reqwest` streaming: chunks are written to disk as they
//! arrive, with byte progress reported through an optional callback so the
//! CLI can drive a progress bar without the core depending on a terminal.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::{CONTENT_LENGTH, USER_AGENT};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use super::filename::{filename_from_url, resolve_unique_path};

/// Byte-progress callback: `(bytes_so_far, content_length_if_known)`.
pub type ProgressFn = dyn Fn(u64, Option<u64>) + Send + Sync;

/// Streaming HTTP client for direct firmware retrieval.
///
/// Created once per engine and reused across requests for connection
/// pooling. Every request carries the configured client identity header;
/// vendor CDNs frequently reject non-browser user agents.
#[derive(Clone)]
pub struct StreamFetcher {
    client: Client,
    user_agent: String,
    progress: Option<Arc<ProgressFn>>,
}

impl std::fmt::Debug for StreamFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamFetcher")
            .field("user_agent", &self.user_agent)
            .field("progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

impl StreamFetcher {
    /// Creates a fetcher presenting the given client identity.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(user_agent: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .read_timeout(Duration::from_secs(READ_TIMEOUT_SECS))
            .gzip(true)
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self {
            client,
            user_agent: user_agent.into(),
            progress: None,
        }
    }

    /// Attaches a progress callback invoked after every chunk.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<ProgressFn>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Downloads `url` into `output_dir`, streaming chunks to disk.
    ///
    /// The filename is the URL's last path segment (sanitized, query
    /// stripped) or a fixed default when absent; collisions get a numeric
    /// suffix instead of overwriting.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the request fails, the server returns a
    /// non-success status, or writing to disk fails. A partial file left by
    /// a failed stream is removed.
    #[must_use = "fetch result contains the path to the downloaded file"]
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &Url, output_dir: &Path) -> Result<PathBuf, DownloadError> {
        debug!("starting direct fetch");

        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| DownloadError::io(output_dir.to_path_buf(), e))?;

        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DownloadError::timeout(url.as_str())
                } else {
                    DownloadError::network(url.as_str(), e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url.as_str(), status.as_u16()));
        }

        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let filename = filename_from_url(url);
        let file_path = resolve_unique_path(output_dir, &filename);
        debug!(filename = %filename, path = %file_path.display(), "resolved output path");

        let file = File::create(&file_path)
            .await
            .map_err(|e| DownloadError::io(file_path.clone(), e))?;

        let stream_result = self
            .stream_to_file(file, response, url.as_str(), &file_path, content_length)
            .await;

        if stream_result.is_err() {
            debug!(path = %file_path.display(), "cleaning up partial file after error");
            let _ = tokio::fs::remove_file(&file_path).await;
        }
        let bytes_written = stream_result?;

        info!(
            path = %file_path.display(),
            bytes = bytes_written,
            "direct fetch complete"
        );
        Ok(file_path)
    }

    /// Streams the response body to `file`, returning bytes written.
    async fn stream_to_file(
        &self,
        file: File,
        response: reqwest::Response,
        url: &str,
        file_path: &Path,
        content_length: Option<u64>,
    ) -> Result<u64, DownloadError> {
        let mut writer = BufWriter::new(file);
        let mut stream = response.bytes_stream();
        let mut bytes_written: u64 = 0;

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;
            bytes_written += chunk.len() as u64;
            if let Some(progress) = &self.progress {
                progress(bytes_written, content_length);
            }
        }

        writer
            .flush()
            .await
            .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;
        Ok(bytes_written)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_debug_hides_client_internals() {
        let fetcher = StreamFetcher::new("test-agent");
        let debug = format!("{fetcher:?}");
        assert!(debug.contains("test-agent"));
    }
}
