//! Error types for build-log access

use thiserror::Error;

/// Errors raised while fetching or decoding build log documents.
///
/// All of these are per-request and recoverable; a later refresh can succeed
/// where an earlier one failed.
#[derive(Error, Debug)]
pub enum LogError {
    /// HTTP client could not be constructed
    #[error("failed to construct HTTP client")]
    Client(#[source] reqwest::Error),

    /// Request to the log host failed (connect, timeout, TLS, ...)
    #[error("failed to fetch build log for {appid}")]
    Transport {
        appid: String,
        #[source]
        source: reqwest::Error,
    },

    /// Log host answered with a non-success status
    #[error("build log for {appid} returned HTTP {status}")]
    Status { appid: String, status: u16 },

    /// Response body was not a valid log document
    #[error("failed to parse build log for {appid}")]
    Parse {
        appid: String,
        #[source]
        source: serde_json::Error,
    },

    /// Application id is not in the configured registry
    #[error("no log source configured for application {0}")]
    UnknownApp(String),
}
