//! Firmgrab Core Library
//!
//! Locates and retrieves vendor-published firmware binaries from
//! unstructured product-support pages. Given a target URL, the engine
//! drives a headless browser through an ordered set of vendor-specific
//! heuristics until one yields a resolvable download link or a captured
//! browser-native download, then persists the file.
//!
//! # Architecture
//!
//! - [`vendor`] - vendor classification and chain dispatch
//! - [`session`] - browser session lifecycle with guaranteed release
//! - [`heuristic`] - declarative per-vendor heuristic chains
//! - [`download`] - streaming HTTP retrieval of resolved links
//! - [`engine`] - orchestration and result aggregation
//! - [`analysis`] - signature scan of retrieved images

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod analysis;
pub mod config;
pub mod download;
pub mod engine;
pub mod heuristic;
pub mod result;
pub mod session;
pub mod vendor;

// Re-export commonly used types
pub use analysis::{AnalysisReport, analyze};
pub use config::{CLIENT_IDENTITY, ScrapeConfig};
pub use download::{DownloadError, StreamFetcher};
pub use engine::{EngineError, ScrapeEngine};
pub use heuristic::{ChainSpec, Outcome, Strategy, run_chain};
pub use result::{DownloadResult, ResultStatus};
pub use session::{PageDriver, PageSession, SessionError, SessionProvider};
pub use vendor::Vendor;
