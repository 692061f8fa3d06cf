//! Browser session lifecycle management.
//!
//! A session owns exactly one browser instance, one browsing context with a
//! spoofed client identity, and one page. Ownership is hierarchical and
//! exclusive; the engine guarantees [`PageSession::close`] runs exactly once
//! on every exit path, so a fault downstream never leaks a browser process.
//!
//! - [`SessionProvider`] - opens sessions; the production implementation
//!   launches headless Chrome ([`CdpSessionProvider`]), tests substitute
//!   spies that count launches
//! - [`PageSession`] - one open session exposing its [`PageDriver`]
//! - [`PageDriver`] - bounded page interaction surface

pub mod cdp;
mod driver;

pub use cdp::CdpSessionProvider;
pub use driver::{CaptureSignal, CapturedFile, DriverError, Locator, PageDriver};

use async_trait::async_trait;
use thiserror::Error;

use crate::config::ScrapeConfig;

/// Errors raised while opening a browser session.
///
/// These are the only faults in the subsystem that occur with no session to
/// clean up; everything after a successful open is released by the engine.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The browser process could not be launched or connected.
    #[error("failed to launch browser: {message}")]
    Launch {
        /// Underlying launch failure description.
        message: String,
    },

    /// The download directory could not be created or configured.
    #[error("failed to prepare download directory {path}: {source}")]
    DownloadDir {
        /// The configured download directory.
        path: std::path::PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl SessionError {
    /// Creates a launch error from any displayable source.
    pub fn launch(message: impl std::fmt::Display) -> Self {
        Self::Launch {
            message: message.to_string(),
        }
    }
}

/// Opens browser sessions.
///
/// One call to [`open`](Self::open) corresponds to exactly one browser
/// launch; unsupported targets are rejected before this trait is reached.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Launches a browser and opens a page ready for navigation.
    async fn open(&self, config: &ScrapeConfig) -> Result<Box<dyn PageSession>, SessionError>;
}

/// One open browser session.
#[async_trait]
pub trait PageSession: Send + Sync {
    /// The page interaction surface for this session.
    fn driver(&self) -> &dyn PageDriver;

    /// Releases the page, context, and browser, in that order.
    ///
    /// Infallible by contract: teardown failures are logged, never
    /// surfaced, so callers can release unconditionally on fault paths.
    async fn close(self: Box<Self>);
}
