//! Scrape engine configuration.
//!
//! All tunables are threaded explicitly: the download directory, timeout
//! bounds, and browser launch options travel from the caller into the
//! session manager and download channel rather than living in globals.

use std::path::PathBuf;
use std::time::Duration;

/// Client identity presented to scraped sites, both by the browser context
/// and by the streaming HTTP fetcher. A realistic desktop UA reduces
/// anti-bot friction on vendor support pages.
pub const CLIENT_IDENTITY: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Configuration for one scrape engine instance.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Flat directory receiving all persisted firmware artifacts.
    pub download_dir: PathBuf,
    /// User-Agent string for the browser context and stream fetcher.
    pub user_agent: String,
    /// Run the browser without a visible window.
    pub headless: bool,
    /// Explicit Chrome/Chromium executable, if not auto-discovered.
    pub chrome_executable: Option<PathBuf>,
    /// Additional Chrome launch arguments.
    pub chrome_args: Vec<String>,
    /// Upper bound for a single element click/visibility wait.
    pub click_timeout: Duration,
}

impl ScrapeConfig {
    /// Creates a configuration writing into the given directory, with
    /// default timeouts and a headless browser.
    #[must_use]
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
            user_agent: CLIENT_IDENTITY.to_string(),
            headless: true,
            chrome_executable: None,
            chrome_args: Vec::new(),
            click_timeout: Duration::from_secs(7),
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self::new("firmware_downloads")
    }
}
