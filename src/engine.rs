//! Resolution engine: dispatch, scoped session execution, aggregation.
//!
//! [`ScrapeEngine::scrape`] is the single entry point per target. Control
//! flow: classify the vendor (rejecting unsupported targets before any
//! browser launch), open a session, navigate with a bounded wait, run the
//! vendor chain, resolve the outcome through the matching download channel,
//! and normalize everything into a [`DownloadResult`]. The session is
//! released exactly once on every path out of
//! [`run_session`](ScrapeEngine::scrape), faults included.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};
use url::Url;

use crate::config::ScrapeConfig;
use crate::download::{DownloadError, StreamFetcher};
use crate::heuristic::{ChainSpec, Outcome, run_chain};
use crate::result::DownloadResult;
use crate::session::{
    CdpSessionProvider, DriverError, PageDriver, SessionError, SessionProvider,
};
use crate::vendor::Vendor;

/// Faults that escape the chain and surface as error results.
///
/// By the time one of these reaches the caller the session (if any was
/// opened) has already been released.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The browser session could not be opened.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The page driver faulted outside the per-step soft-failure envelope.
    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// The resolution engine for firmware support pages.
pub struct ScrapeEngine {
    config: ScrapeConfig,
    provider: Arc<dyn SessionProvider>,
    fetcher: StreamFetcher,
}

impl std::fmt::Debug for ScrapeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrapeEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ScrapeEngine {
    /// Creates an engine that launches headless Chrome sessions.
    #[must_use]
    pub fn new(config: ScrapeConfig) -> Self {
        Self::with_provider(config, Arc::new(CdpSessionProvider::new()))
    }

    /// Creates an engine with a custom session provider.
    ///
    /// The seam exists so tests can substitute launch-counting spies and
    /// scripted page drivers.
    #[must_use]
    pub fn with_provider(config: ScrapeConfig, provider: Arc<dyn SessionProvider>) -> Self {
        let fetcher = StreamFetcher::new(config.user_agent.clone());
        Self {
            config,
            provider,
            fetcher,
        }
    }

    /// Replaces the stream fetcher (progress callbacks, test doubles).
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: StreamFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Resolves one target URL into a persisted firmware file.
    ///
    /// Never returns an error: every fault is normalized into an
    /// error-status [`DownloadResult`] after session cleanup has run.
    #[instrument(skip(self), fields(url = %target))]
    pub async fn scrape(&self, target: &str) -> DownloadResult {
        let vendor = Vendor::classify(target);
        let Some(chain) = vendor.chain() else {
            info!("vendor not supported; rejecting before session launch");
            return DownloadResult::error(format!(
                "Manufacturer not supported for URL: {target}"
            ));
        };

        // classify() only admits parseable URLs, but don't rely on that here.
        let base = match Url::parse(target) {
            Ok(base) => base,
            Err(_) => {
                return DownloadResult::error(format!("Invalid target URL: {target}"));
            }
        };

        info!(vendor = vendor.name(), "dispatching to vendor chain");
        match self.run_session(&base, chain).await {
            Ok(result) => result,
            Err(fault) => {
                warn!(error = %fault, "scrape failed");
                DownloadResult::error(fault.to_string())
            }
        }
    }

    /// Opens a session, runs the chain, and guarantees release.
    ///
    /// Between `open` succeeding and `close` running there is exactly one
    /// fallible await (`drive`), and its result is only inspected after the
    /// session is released.
    async fn run_session(
        &self,
        base: &Url,
        chain: &ChainSpec,
    ) -> Result<DownloadResult, EngineError> {
        let session = self.provider.open(&self.config).await?;
        let outcome = self.drive(session.driver(), base, chain).await;
        session.close().await;
        outcome
    }

    /// Navigates and runs the chain, mapping its outcome to a result.
    async fn drive(
        &self,
        driver: &dyn PageDriver,
        base: &Url,
        chain: &ChainSpec,
    ) -> Result<DownloadResult, EngineError> {
        match driver.navigate(base.as_str(), chain.nav_timeout).await {
            Ok(()) => {}
            Err(DriverError::NavigationTimeout { timeout, .. }) => {
                warn!(?timeout, "navigation timed out; continuing with partial page");
            }
            Err(fault) => return Err(EngineError::Driver(fault)),
        }

        match run_chain(driver, base, chain).await {
            Outcome::Captured {
                path,
                suggested_name,
            } => {
                info!(path = %path.display(), "chain captured browser download");
                Ok(DownloadResult::success(
                    file_name_of(&path).unwrap_or(suggested_name),
                ))
            }
            Outcome::Candidate { url } => {
                info!(url = %url, "chain yielded candidate; fetching directly");
                match self.fetcher.fetch(&url, &self.config.download_dir).await {
                    Ok(path) => Ok(DownloadResult::success(
                        file_name_of(&path).unwrap_or_else(|| url.to_string()),
                    )),
                    Err(error) => Ok(fetch_failure(&error)),
                }
            }
            Outcome::NotFound => Ok(DownloadResult::error(
                "Could not find a downloadable firmware file on the page.",
            )),
        }
    }
}

fn file_name_of(path: &std::path::Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

fn fetch_failure(error: &DownloadError) -> DownloadResult {
    DownloadResult::error(format!("Firmware download failed: {error}"))
}
