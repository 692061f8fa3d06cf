//! Direct streaming retrieval of resolved firmware URLs.
//!
//! This is one of the two download channels: when a heuristic yields a
//! [`Candidate`](crate::heuristic::Outcome::Candidate) URL, the
//! [`StreamFetcher`] performs a plain streaming HTTP GET into the download
//! directory. The other channel, browser-native capture, lives in
//! [`crate::session::cdp`].

mod client;
mod constants;
mod error;
pub(crate) mod filename;

pub use client::{ProgressFn, StreamFetcher};
pub use constants::DEFAULT_FILENAME;
pub use error::DownloadError;
