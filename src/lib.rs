pub mod episode;
pub mod error;
pub mod feed;
pub mod http;
pub mod progress;
pub mod run;
pub mod store;

// Re-export main types for convenience
pub use episode::{DownloadContext, download_episode, episode_filename, sanitize_title};
pub use error::{DownloadError, FeedError, RunError, StoreError};
pub use feed::{Episode, FeedDescriptor, FeedSource, fetch_feed_text, parse_feed};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use progress::{NoopReporter, ProgressEvent, ProgressReporter, SharedProgressReporter};
pub use run::{RunOutcome, RunSummary, run_feed};
pub use store::{ProgressRecord, ProgressStore};
