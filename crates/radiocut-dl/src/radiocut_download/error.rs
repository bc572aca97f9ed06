use std::path::PathBuf;

use chrono::NaiveDate;
use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can abort a show download.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("URL not found: {url}")]
    NotFound { url: String },

    #[error("No broadcast of '{show}' on {date}")]
    NoMatchingBroadcast { show: String, date: NaiveDate },

    #[error("No recordings listed for '{show}'")]
    NoRecordings { show: String },

    #[error("{url} returned status {status}")]
    Status { url: String, status: StatusCode },

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Show page is missing the '{0}' field")]
    MissingField(&'static str),

    #[error("Invalid audio_seconds seed: {0:?}")]
    InvalidSeed(String),

    #[error("Invalid show timestamp: {0:?}")]
    InvalidTimestamp(String),

    #[error("Invalid UTC offset in config: {0:?}")]
    InvalidOffset(String),

    #[error("Chunk index did not reach the end of the show after {limit} buckets")]
    ScanLimitExceeded { limit: u32 },

    #[error("No audio chunks found for the requested time range")]
    NoChunks,

    #[error("Could not run {tool}: {source}")]
    ToolUnavailable {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with status {code:?}")]
    ExternalTool { tool: String, code: Option<i32> },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Error::Io { path, source }
    }
}
