//! Constants for the download channel (timeouts, fallbacks).

/// Connection timeout for streaming fetches, in seconds.
pub(crate) const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Read timeout for streaming fetches, in seconds. Firmware images can be
/// large, so this bounds inactivity rather than total transfer time.
pub(crate) const READ_TIMEOUT_SECS: u64 = 300;

/// Fallback filename when none can be derived from the source URL.
pub const DEFAULT_FILENAME: &str = "firmware.bin";
