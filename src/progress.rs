use std::sync::Arc;

/// Events emitted during a feed download run for progress reporting
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Feed content is being fetched
    FetchingFeed { locator: String },

    /// Feed has been parsed and the run is about to iterate episodes
    FeedParsed {
        feed_name: String,
        total_episodes: usize,
        already_downloaded: usize,
    },

    /// The feed parsed but contained no enclosure-bearing items
    NoEpisodesFound { feed_name: String },

    /// Fetching or parsing the feed failed; the run ends without episodes
    FeedFailed { feed_name: String, error: String },

    /// An episode download is starting
    DownloadStarting {
        episode_title: String,
        /// 1-based sequence number within the feed
        position: usize,
        total_episodes: usize,
        /// Expected content length in bytes, if known
        content_length: Option<u64>,
    },

    /// Byte-level progress within one episode transfer
    DownloadProgress {
        episode_title: String,
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },

    /// An episode finished downloading and its progress record was persisted
    EpisodeCompleted {
        episode_title: String,
        completed: usize,
        total_episodes: usize,
    },

    /// An episode failed to download; the run continues with the next one
    EpisodeFailed {
        episode_title: String,
        error: String,
    },

    /// Every episode was visited without cancellation
    RunCompleted {
        feed_name: String,
        downloaded: usize,
        skipped: usize,
        failed: usize,
    },

    /// The run was cancelled; progress up to here is saved
    RunCancelled {
        feed_name: String,
        completed: usize,
        total_episodes: usize,
    },
}

/// Trait for reporting progress events during a download run.
///
/// Implementations can render progress bars, log messages, or collect
/// statistics. Reporters are called from the transfer loop and must not
/// block.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event
    fn report(&self, event: ProgressEvent);
}

/// A shared reference to a progress reporter
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// A no-op progress reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {
        // Intentionally empty
    }
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}
