//! Page interaction abstraction used by the heuristic chain.
//!
//! [`PageDriver`] is the seam between the vendor-agnostic chain interpreter
//! and the browser. The production implementation drives a CDP page
//! ([`crate::session::cdp`]); tests substitute scripted fakes to exercise
//! chain ordering, short-circuiting, and session lifecycle without a
//! browser.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// How a strategy step locates an element on the page.
///
/// Declarative so vendor chains stay data: a CSS selector, or a selector
/// narrowed by visible-text containment (the CDP driver evaluates both in
/// page context).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    /// Plain CSS selector, first match.
    Css(&'static str),
    /// First element matching `selector` whose text content contains `text`.
    Text {
        /// CSS selector restricting the candidate set (e.g. `"button"`).
        selector: &'static str,
        /// Required substring of the element's text content.
        text: &'static str,
    },
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Css(selector) => write!(f, "{selector}"),
            Self::Text { selector, text } => write!(f, "{selector} ~ \"{text}\""),
        }
    }
}

/// A download intercepted via a browser-native download event.
#[derive(Debug, Clone)]
pub struct CapturedFile {
    /// Where the payload was persisted.
    pub path: PathBuf,
    /// Filename the browser suggested for the download.
    pub suggested_name: String,
}

/// Result of clicking an element while racing a download-event wait.
#[derive(Debug, Clone)]
pub enum CaptureSignal {
    /// A download event fired and the payload was persisted.
    Saved(CapturedFile),
    /// The element was clicked but no download event fired in time.
    TimedOut,
    /// No element matched the locator.
    Missing,
}

/// Errors surfaced by a page driver.
///
/// Only [`DriverError::NavigationTimeout`] is soft at the session level;
/// the chain interpreter additionally treats any step-local driver error
/// as a miss for that step.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Navigation did not settle within the bound; the page may be partial.
    #[error("navigation to {url} timed out after {timeout:?}")]
    NavigationTimeout {
        /// Target the page was navigating to.
        url: String,
        /// The bound that elapsed.
        timeout: Duration,
    },

    /// Browser protocol fault (connection lost, evaluation failure, ...).
    #[error("browser protocol error: {message}")]
    Protocol {
        /// Underlying protocol error description.
        message: String,
    },

    /// Filesystem error while persisting a captured download.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl DriverError {
    /// Creates a protocol error from any displayable source.
    pub fn protocol(message: impl std::fmt::Display) -> Self {
        Self::Protocol {
            message: message.to_string(),
        }
    }
}

/// Interaction surface of one rendered page.
///
/// All waits are bounded by the supplied or configured timeouts; none of
/// these methods blocks indefinitely.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigates to `url`, waiting at most `timeout` for the load to settle.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Removes the first element matching `locator` from the DOM.
    /// Returns false when nothing matched.
    async fn dismiss(&self, locator: &Locator) -> Result<bool, DriverError>;

    /// Clicks the first element matching `locator`.
    /// Returns false when nothing matched.
    async fn click(&self, locator: &Locator) -> Result<bool, DriverError>;

    /// Reads the `href` attribute of the first element matching `locator`.
    async fn href_of(&self, locator: &Locator) -> Result<Option<String>, DriverError>;

    /// Returns the `href` attributes of all anchors, in document order.
    async fn anchor_hrefs(&self) -> Result<Vec<String>, DriverError>;

    /// Returns the fully rendered page markup.
    async fn markup(&self) -> Result<String, DriverError>;

    /// Clicks the element matching `locator` while waiting up to `wait` for
    /// a browser-native download event, persisting the payload on success.
    async fn click_and_await_download(
        &self,
        locator: &Locator,
        wait: Duration,
    ) -> Result<CaptureSignal, DriverError>;
}
