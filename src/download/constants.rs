//! Constants for the download module (timeouts, buffers, pool limits).

use std::time::Duration;

/// User-Agent sent with every request.
pub const USER_AGENT: &str = concat!("tele-dl/", env!("CARGO_PKG_VERSION"));

/// Default per-request timeout (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connect timeout (10 seconds).
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Write buffer used when streaming a response body to disk (32 KiB).
pub const COPY_BUFFER_SIZE: usize = 32 * 1024;

/// Default base URL prepended to relative media paths.
pub const DEFAULT_FILE_BASE: &str = "https://telegra.ph";

/// Idle pooled connections kept per host.
pub const POOL_MAX_IDLE_PER_HOST: usize = 10;
