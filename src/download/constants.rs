//! Constants for the download module (timeouts, retry and size limits).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large files).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default base delay for exponential backoff (1 second).
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Default maximum delay cap between attempts (32 seconds).
pub const DEFAULT_MAX_RETRY_DELAY: Duration = Duration::from_secs(32);

/// Default hard timeout for a single attempt (30 seconds).
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default maximum accepted attachment size (50 MiB).
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 52_428_800;

/// Placeholder used when an error response body cannot be read.
pub const UNREADABLE_BODY_PLACEHOLDER: &str = "<unable to read response body>";
