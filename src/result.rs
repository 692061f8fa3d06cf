//! Uniform result record returned to the caller for every scrape request.
//!
//! This is the boundary contract: the request-handling layer only ever sees
//! a [`DownloadResult`], never the chain's internal outcome or fault types.

use serde::{Deserialize, Serialize};

/// Terminal status of a scrape request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    /// A firmware file was located and persisted.
    Success,
    /// No file was retrieved (unsupported vendor, exhausted chain, or fault).
    Error,
}

/// Aggregated outcome of one scrape request.
///
/// Produced exactly once per target and immutable after creation. The
/// `file_name` is always a bare name with no directory component; callers
/// resolve it against their own copy of the download directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResult {
    /// Whether a file was retrieved.
    pub status: ResultStatus,
    /// Base name of the persisted file, present only on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Human-readable description of the outcome.
    pub message: String,
}

impl DownloadResult {
    /// Creates a success result for a persisted file.
    #[must_use]
    pub fn success(file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        let message = format!("Download complete: {file_name}");
        Self {
            status: ResultStatus::Success,
            file_name: Some(file_name),
            message,
        }
    }

    /// Creates an error result with a descriptive message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Error,
            file_name: None,
            message: message.into(),
        }
    }

    /// Returns true if the request retrieved a file.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }
}
