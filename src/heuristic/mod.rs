//! Vendor heuristic chains: ordered locate-attempts against a rendered page.
//!
//! A chain is a declarative table of [`Strategy`] steps; [`run_chain`]
//! interprets it against a [`PageDriver`] in fixed priority order and stops
//! at the first step that produces something other than
//! [`Outcome::NotFound`]. Adding a vendor or selector is a data change in
//! [`chains`], not a control-flow change here.
//!
//! Step-local failures (missing selectors, interaction faults) are an
//! expected part of probing unknown page layouts: each step returns a typed
//! result and the runner maps recoverable errors to a logged miss, so
//! suppression is an explicit, auditable mapping rather than blanket
//! exception swallowing.

pub mod chains;

use std::path::PathBuf;
use std::time::Duration;

use regex::RegexBuilder;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::session::{CaptureSignal, DriverError, Locator, PageDriver};

/// One locate-attempt in a vendor chain.
///
/// Preparatory steps ([`DismissOverlay`](Strategy::DismissOverlay),
/// [`ActivateSection`](Strategy::ActivateSection)) always yield
/// [`Outcome::NotFound`] so the chain continues past them; the remaining
/// kinds can terminate the chain.
#[derive(Debug, Clone, Copy)]
pub enum Strategy {
    /// Best-effort removal of a known blocking UI element.
    DismissOverlay {
        /// Element to remove if present.
        locator: Locator,
    },
    /// Best-effort activation of a tab/consent control, first workable
    /// locator wins; the chain proceeds even if none succeed.
    ActivateSection {
        /// Equivalent locators tried in order.
        locators: &'static [Locator],
        /// Render-settle pause after a successful activation.
        settle: Duration,
    },
    /// Scan all anchors for the first firmware-like target path.
    AnchorScan {
        /// Extensions identifying a firmware artifact.
        extensions: &'static [&'static str],
    },
    /// Click download-labeled controls while racing a bounded wait for a
    /// browser-native download event; falls back to the element's href.
    ClickCapture {
        /// Download controls tried in order.
        locators: &'static [Locator],
        /// Bound on the download-event wait per control.
        wait: Duration,
    },
    /// Extract the first extension-bearing href from the raw page markup.
    MarkupScan {
        /// Extension tokens to look for in the markup.
        tokens: &'static [&'static str],
    },
}

impl Strategy {
    /// Short name used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::DismissOverlay { .. } => "dismiss-overlay",
            Self::ActivateSection { .. } => "activate-section",
            Self::AnchorScan { .. } => "anchor-scan",
            Self::ClickCapture { .. } => "click-capture",
            Self::MarkupScan { .. } => "markup-scan",
        }
    }
}

/// An ordered, vendor-specific heuristic chain.
#[derive(Debug)]
pub struct ChainSpec {
    /// Vendor label used in logs.
    pub vendor: &'static str,
    /// Bound on the initial page navigation wait.
    pub nav_timeout: Duration,
    /// Steps in strict priority order, earlier strictly preferred.
    pub steps: &'static [Strategy],
}

/// Result of one heuristic invocation. Exactly one variant is produced;
/// never partial.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// A resolved absolute URL believed to point at a firmware artifact,
    /// not yet fetched.
    Candidate {
        /// The absolute URL.
        url: Url,
    },
    /// A download already intercepted and persisted via a browser-native
    /// download event.
    Captured {
        /// Where the payload was persisted.
        path: PathBuf,
        /// The browser-suggested filename.
        suggested_name: String,
    },
    /// This heuristic found nothing; try the next one.
    NotFound,
}

/// Failure of a single chain step.
///
/// Recoverable by design: the runner logs these and advances to the next
/// step rather than aborting the chain.
#[derive(Debug, Error)]
pub enum StepError {
    /// The driver faulted while executing the step.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// A discovered href could not be resolved against the page URL.
    #[error("cannot resolve href {href:?} against {base}")]
    UnresolvableHref {
        /// The raw href attribute value.
        href: String,
        /// The page URL it was resolved against.
        base: Url,
    },
}

/// Executes a chain against the page, returning the first non-`NotFound`
/// outcome or `NotFound` once every step is exhausted.
///
/// Steps run strictly in sequence; each may mutate page state via clicks,
/// so no parallelism is attempted.
pub async fn run_chain(driver: &dyn PageDriver, base: &Url, spec: &ChainSpec) -> Outcome {
    for step in spec.steps {
        debug!(vendor = spec.vendor, step = step.name(), "running heuristic step");
        match run_step(driver, base, step).await {
            Ok(Outcome::NotFound) => {}
            Ok(outcome) => {
                debug!(vendor = spec.vendor, step = step.name(), "heuristic step succeeded");
                return outcome;
            }
            Err(error) => {
                warn!(
                    vendor = spec.vendor,
                    step = step.name(),
                    error = %error,
                    "heuristic step failed; continuing with next step"
                );
            }
        }
    }
    Outcome::NotFound
}

async fn run_step(
    driver: &dyn PageDriver,
    base: &Url,
    step: &Strategy,
) -> Result<Outcome, StepError> {
    match step {
        Strategy::DismissOverlay { locator } => {
            let removed = driver.dismiss(locator).await?;
            if removed {
                debug!(locator = %locator, "removed blocking overlay");
            }
            Ok(Outcome::NotFound)
        }
        Strategy::ActivateSection { locators, settle } => {
            activate_section(driver, locators, *settle).await
        }
        Strategy::AnchorScan { extensions } => anchor_scan(driver, base, extensions).await,
        Strategy::ClickCapture { locators, wait } => {
            click_capture(driver, base, locators, *wait).await
        }
        Strategy::MarkupScan { tokens } => markup_scan(driver, base, tokens).await,
    }
}

async fn activate_section(
    driver: &dyn PageDriver,
    locators: &[Locator],
    settle: Duration,
) -> Result<Outcome, StepError> {
    for locator in locators {
        match driver.click(locator).await {
            Ok(true) => {
                debug!(locator = %locator, "activated section");
                if !settle.is_zero() {
                    tokio::time::sleep(settle).await;
                }
                return Ok(Outcome::NotFound);
            }
            Ok(false) => {}
            Err(error) => {
                debug!(locator = %locator, error = %error, "activation attempt failed");
            }
        }
    }
    debug!("no section control matched; continuing with remaining heuristics");
    Ok(Outcome::NotFound)
}

async fn anchor_scan(
    driver: &dyn PageDriver,
    base: &Url,
    extensions: &[&str],
) -> Result<Outcome, StepError> {
    let hrefs = driver.anchor_hrefs().await?;
    for href in hrefs {
        let Ok(resolved) = base.join(&href) else {
            continue;
        };
        let path = resolved.path().to_ascii_lowercase();
        if extensions.iter().any(|ext| path.ends_with(ext)) {
            debug!(url = %resolved, "anchor scan found candidate");
            return Ok(Outcome::Candidate { url: resolved });
        }
    }
    Ok(Outcome::NotFound)
}

async fn click_capture(
    driver: &dyn PageDriver,
    base: &Url,
    locators: &[Locator],
    wait: Duration,
) -> Result<Outcome, StepError> {
    for locator in locators {
        let signal = match driver.click_and_await_download(locator, wait).await {
            Ok(signal) => signal,
            Err(error) => {
                debug!(locator = %locator, error = %error, "capture attempt failed");
                continue;
            }
        };
        match signal {
            CaptureSignal::Saved(captured) => {
                return Ok(Outcome::Captured {
                    path: captured.path,
                    suggested_name: captured.suggested_name,
                });
            }
            CaptureSignal::TimedOut => {
                // No download event fired; the control may be a plain link.
                if let Some(href) = driver.href_of(locator).await? {
                    let resolved =
                        base.join(&href)
                            .map_err(|_| StepError::UnresolvableHref {
                                href: href.clone(),
                                base: base.clone(),
                            })?;
                    debug!(url = %resolved, "click timed out but href found");
                    return Ok(Outcome::Candidate { url: resolved });
                }
                debug!(locator = %locator, "no download event and no href; trying next control");
            }
            CaptureSignal::Missing => {}
        }
    }
    Ok(Outcome::NotFound)
}

async fn markup_scan(
    driver: &dyn PageDriver,
    base: &Url,
    tokens: &[&str],
) -> Result<Outcome, StepError> {
    let markup = driver.markup().await?;
    let lowered = markup.to_lowercase();
    for token in tokens {
        if !lowered.contains(token) {
            continue;
        }
        let Some(href) = first_href_containing(&markup, token) else {
            continue;
        };
        let resolved = base
            .join(&href)
            .map_err(|_| StepError::UnresolvableHref {
                href: href.clone(),
                base: base.clone(),
            })?;
        debug!(url = %resolved, token, "markup scan found candidate");
        return Ok(Outcome::Candidate { url: resolved });
    }
    Ok(Outcome::NotFound)
}

/// Extracts the first `href` attribute value containing `token` from raw
/// markup.
fn first_href_containing(markup: &str, token: &str) -> Option<String> {
    let pattern = format!(
        r#"href=["']([^"']+{}[^"']*)["']"#,
        regex::escape(token)
    );
    let regex = RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .ok()?;
    regex
        .captures(markup)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
