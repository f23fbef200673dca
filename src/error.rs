use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when fetching or parsing RSS feeds
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to fetch feed from {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Local feed file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read feed file {path}: {source}")]
    FileReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse RSS feed: {0}")]
    ParseFailed(#[from] rss::Error),

    #[error("Feed fetch was cancelled")]
    Cancelled,
}

impl FeedError {
    /// Whether this error is cooperative cancellation rather than a real failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FeedError::Cancelled)
    }
}

/// Errors that can occur during episode downloads
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP request failed for {url}: {source}")]
    HttpFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to create file {path}: {source}")]
    FileCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream error while downloading {url}: {source}")]
    StreamFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Download was cancelled")]
    Cancelled,
}

impl DownloadError {
    /// Whether this error is cooperative cancellation rather than a real failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DownloadError::Cancelled)
    }
}

/// Errors that can occur persisting progress records
///
/// Loading is deliberately infallible: an absent or corrupt record degrades
/// to an empty one so a run can always start.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to write progress file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize progress record: {0}")]
    SerializeFailed(#[from] serde_json::Error),
}

/// Top-level errors for a feed download run
#[derive(Error, Debug)]
pub enum RunError {
    /// The run was cancelled cooperatively; progress has been saved.
    #[error("Download run was cancelled")]
    Cancelled,

    /// Persisting the progress record failed. Fatal for the run: continuing
    /// without durable dedup state would re-download episodes on resume.
    #[error("Failed to persist progress: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
