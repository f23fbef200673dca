// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::episode::{DownloadContext, download_episode, episode_filename};
use crate::error::{DownloadError, FeedError, RunError};
use crate::feed::{Episode, FeedDescriptor, fetch_feed_text, parse_feed};
use crate::http::HttpClient;
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::store::ProgressStore;

/// How a run ended, aside from cancellation (which is an error variant)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every episode was visited (downloaded, skipped, or failed)
    Completed,
    /// The feed parsed but contained no enclosure-bearing items
    NoEpisodes,
    /// Fetching or parsing the feed failed; no episodes were attempted
    FeedFailed,
}

/// Counts for one completed (non-cancelled) run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    /// Number of qualifying episodes in the feed
    pub total_episodes: usize,
    /// Episodes downloaded during this run
    pub downloaded: usize,
    /// Episodes skipped because their URL was already recorded
    pub skipped: usize,
    /// Episodes that failed to download during this run
    pub failed: usize,
}

impl RunSummary {
    fn without_episodes(outcome: RunOutcome) -> Self {
        Self {
            outcome,
            total_episodes: 0,
            downloaded: 0,
            skipped: 0,
            failed: 0,
        }
    }
}

/// Download every missing episode of one feed, in publication order.
///
/// Episodes are processed strictly sequentially. The progress record is
/// persisted after every successful episode, so an interruption loses at
/// most the in-flight transfer.
///
/// Failure policy:
/// - Feed-level fetch/parse failures are reported through the progress
///   channel and absorbed: the call returns `Ok` with
///   `RunOutcome::FeedFailed`, so the calling shell can offer another feed.
/// - Per-episode transfer failures are reported and the loop continues.
/// - Cancellation persists durable state and propagates as
///   `RunError::Cancelled`, the one condition callers treat as "paused".
/// - Progress-persistence failures propagate as `RunError::Store` and end
///   the run.
///
/// Callers must not start two concurrent runs for the same feed name; the
/// per-feed progress record and folder are the partition boundary.
pub async fn run_feed<C: HttpClient>(
    client: &C,
    feed: &FeedDescriptor,
    base_dir: &Path,
    cancel: &CancellationToken,
    reporter: SharedProgressReporter,
) -> Result<RunSummary, RunError> {
    let feed_dir = base_dir.join(&feed.display_name);
    if !feed_dir.exists() {
        std::fs::create_dir_all(&feed_dir).map_err(|e| RunError::CreateDirectoryFailed {
            path: feed_dir.clone(),
            source: e,
        })?;
    }

    let store = ProgressStore::new(base_dir);
    let mut record = store.load(&feed.display_name);

    reporter.report(ProgressEvent::FetchingFeed {
        locator: feed.source.locator(),
    });

    let text = match fetch_feed_text(client, &feed.source, cancel).await {
        Ok(text) => text,
        Err(FeedError::Cancelled) => return Err(RunError::Cancelled),
        Err(e) => {
            reporter.report(ProgressEvent::FeedFailed {
                feed_name: feed.display_name.clone(),
                error: e.to_string(),
            });
            return Ok(RunSummary::without_episodes(RunOutcome::FeedFailed));
        }
    };

    let episodes = match parse_feed(&text) {
        Ok(episodes) => episodes,
        Err(e) => {
            reporter.report(ProgressEvent::FeedFailed {
                feed_name: feed.display_name.clone(),
                error: e.to_string(),
            });
            return Ok(RunSummary::without_episodes(RunOutcome::FeedFailed));
        }
    };

    if episodes.is_empty() {
        reporter.report(ProgressEvent::NoEpisodesFound {
            feed_name: feed.display_name.clone(),
        });
        return Ok(RunSummary::without_episodes(RunOutcome::NoEpisodes));
    }

    let total_episodes = episodes.len();
    let mut completed = episodes
        .iter()
        .filter(|e| record.is_downloaded(&e.enclosure_url))
        .count();

    reporter.report(ProgressEvent::FeedParsed {
        feed_name: feed.display_name.clone(),
        total_episodes,
        already_downloaded: completed,
    });

    let mut downloaded = 0;
    let mut skipped = 0;
    let mut failed = 0;

    for (index, episode) in episodes.iter().enumerate() {
        let position = index + 1;

        if record.is_downloaded(&episode.enclosure_url) {
            skipped += 1;
            continue;
        }

        if cancel.is_cancelled() {
            store.save(&feed.display_name, &record)?;
            reporter.report(ProgressEvent::RunCancelled {
                feed_name: feed.display_name.clone(),
                completed,
                total_episodes,
            });
            return Err(RunError::Cancelled);
        }

        let title = display_title(episode, position);
        let filename = episode_filename(episode.title.as_deref(), position);
        let output_path = feed_dir.join(&filename);
        let context = DownloadContext {
            position,
            total_episodes,
        };

        match download_episode(client, episode, &output_path, &context, cancel, &reporter).await {
            Ok(_) => {
                record.mark_downloaded(&episode.enclosure_url);
                store.save(&feed.display_name, &record)?;
                completed += 1;
                downloaded += 1;
                reporter.report(ProgressEvent::EpisodeCompleted {
                    episode_title: title,
                    completed,
                    total_episodes,
                });
            }
            Err(DownloadError::Cancelled) => {
                store.save(&feed.display_name, &record)?;
                reporter.report(ProgressEvent::RunCancelled {
                    feed_name: feed.display_name.clone(),
                    completed,
                    total_episodes,
                });
                return Err(RunError::Cancelled);
            }
            Err(e) => {
                failed += 1;
                reporter.report(ProgressEvent::EpisodeFailed {
                    episode_title: title,
                    error: e.to_string(),
                });
            }
        }
    }

    reporter.report(ProgressEvent::RunCompleted {
        feed_name: feed.display_name.clone(),
        downloaded,
        skipped,
        failed,
    });

    Ok(RunSummary {
        outcome: RunOutcome::Completed,
        total_episodes,
        downloaded,
        skipped,
        failed,
    })
}

fn display_title(episode: &Episode, position: usize) -> String {
    episode
        .title
        .clone()
        .unwrap_or_else(|| format!("Episode_{position}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{ByteStream, HttpResponse};
    use crate::progress::{NoopReporter, ProgressReporter};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    #[derive(Clone)]
    struct MockHttpClient {
        feed_xml: String,
        audio_data: Vec<u8>,
        /// Enclosure URLs that respond with HTTP 404
        fail_urls: Vec<String>,
        /// Cancel this token when the given URL is requested
        cancel_on: Option<(String, CancellationToken)>,
        /// Every audio URL requested, in order
        audio_requests: Arc<Mutex<Vec<String>>>,
    }

    impl MockHttpClient {
        fn new(feed_xml: &str) -> Self {
            Self {
                feed_xml: feed_xml.to_string(),
                audio_data: b"fake audio".to_vec(),
                fail_urls: Vec::new(),
                cancel_on: None,
                audio_requests: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn get_text(&self, _url: &str) -> Result<String, reqwest::Error> {
            Ok(self.feed_xml.clone())
        }

        async fn get_stream(&self, url: &str) -> Result<HttpResponse, reqwest::Error> {
            self.audio_requests.lock().unwrap().push(url.to_string());

            if let Some((cancel_url, token)) = &self.cancel_on
                && url == cancel_url
            {
                token.cancel();
            }

            let status = if self.fail_urls.iter().any(|u| u == url) {
                404
            } else {
                200
            };

            let data = self.audio_data.clone();
            let len = data.len() as u64;
            let stream: ByteStream =
                Box::pin(futures::stream::once(async move { Ok(Bytes::from(data)) }));

            Ok(HttpResponse {
                status,
                content_length: Some(len),
                body: stream,
            })
        }
    }

    struct CollectingReporter {
        events: Mutex<Vec<ProgressEvent>>,
    }

    impl CollectingReporter {
        fn shared() -> Arc<Self> {
            Arc::new(Self {
                events: Mutex::new(Vec::new()),
            })
        }
    }

    impl ProgressReporter for CollectingReporter {
        fn report(&self, event: ProgressEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    const SAMPLE_FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Test Podcast</title>
    <description>A test podcast</description>
    <item>
      <title>Middle</title>
      <pubDate>2021-01-02</pubDate>
      <enclosure url="https://example.com/middle.mp3" type="audio/mpeg"/>
    </item>
    <item>
      <title>Oldest</title>
      <pubDate>2021-01-01</pubDate>
      <enclosure url="https://example.com/oldest.mp3" type="audio/mpeg"/>
    </item>
    <item>
      <title>Newest</title>
      <pubDate>2021-01-03</pubDate>
      <enclosure url="https://example.com/newest.mp3" type="audio/mpeg"/>
    </item>
  </channel>
</rss>"#;

    fn remote_feed() -> FeedDescriptor {
        FeedDescriptor::new("https://example.com/feed.xml", "TestPodcast")
    }

    #[tokio::test]
    async fn run_downloads_all_episodes_with_date_ordered_sequence_numbers() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient::new(SAMPLE_FEED);

        let summary = run_feed(
            &client,
            &remote_feed(),
            dir.path(),
            &CancellationToken::new(),
            NoopReporter::shared(),
        )
        .await
        .unwrap();

        assert_eq!(summary.outcome, RunOutcome::Completed);
        assert_eq!(summary.downloaded, 3);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.failed, 0);

        let feed_dir = dir.path().join("TestPodcast");
        assert!(feed_dir.join("001_Oldest.mp3").exists());
        assert!(feed_dir.join("002_Middle.mp3").exists());
        assert!(feed_dir.join("003_Newest.mp3").exists());
    }

    #[tokio::test]
    async fn second_run_downloads_nothing_new() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient::new(SAMPLE_FEED);

        run_feed(
            &client,
            &remote_feed(),
            dir.path(),
            &CancellationToken::new(),
            NoopReporter::shared(),
        )
        .await
        .unwrap();

        let requests_after_first = client.audio_requests.lock().unwrap().len();
        assert_eq!(requests_after_first, 3);

        let summary = run_feed(
            &client,
            &remote_feed(),
            dir.path(),
            &CancellationToken::new(),
            NoopReporter::shared(),
        )
        .await
        .unwrap();

        assert_eq!(summary.downloaded, 0);
        assert_eq!(summary.skipped, 3);
        // No episode was fetched twice
        assert_eq!(client.audio_requests.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn failed_episode_does_not_stop_the_run() {
        let dir = tempdir().unwrap();
        let mut client = MockHttpClient::new(SAMPLE_FEED);
        client.fail_urls = vec!["https://example.com/middle.mp3".to_string()];

        let reporter = CollectingReporter::shared();
        let summary = run_feed(
            &client,
            &remote_feed(),
            dir.path(),
            &CancellationToken::new(),
            reporter.clone(),
        )
        .await
        .unwrap();

        assert_eq!(summary.outcome, RunOutcome::Completed);
        assert_eq!(summary.downloaded, 2);
        assert_eq!(summary.failed, 1);

        let feed_dir = dir.path().join("TestPodcast");
        assert!(feed_dir.join("001_Oldest.mp3").exists());
        assert!(!feed_dir.join("002_Middle.mp3").exists());
        assert!(feed_dir.join("003_Newest.mp3").exists());

        let events = reporter.events.lock().unwrap();
        assert!(
            events
                .iter()
                .any(|e| matches!(e, ProgressEvent::EpisodeFailed { .. }))
        );

        // The failed episode is not recorded, so a later run retries it
        let store = ProgressStore::new(dir.path());
        let record = store.load("TestPodcast");
        assert!(!record.is_downloaded("https://example.com/middle.mp3"));
        assert!(record.is_downloaded("https://example.com/oldest.mp3"));
    }

    #[tokio::test]
    async fn cancellation_mid_run_saves_progress_and_stops() {
        let dir = tempdir().unwrap();
        let cancel = CancellationToken::new();
        let mut client = MockHttpClient::new(SAMPLE_FEED);
        client.cancel_on = Some((
            "https://example.com/middle.mp3".to_string(),
            cancel.clone(),
        ));

        let result = run_feed(
            &client,
            &remote_feed(),
            dir.path(),
            &cancel,
            NoopReporter::shared(),
        )
        .await;

        assert!(matches!(result, Err(RunError::Cancelled)));

        let feed_dir = dir.path().join("TestPodcast");
        assert!(feed_dir.join("001_Oldest.mp3").exists());
        assert!(!feed_dir.join("002_Middle.mp3").exists());
        assert!(!feed_dir.join("003_Newest.mp3").exists());

        let record = ProgressStore::new(dir.path()).load("TestPodcast");
        assert!(record.is_downloaded("https://example.com/oldest.mp3"));
        assert!(!record.is_downloaded("https://example.com/middle.mp3"));
    }

    #[tokio::test]
    async fn resume_after_cancellation_downloads_only_the_rest() {
        let dir = tempdir().unwrap();
        let cancel = CancellationToken::new();
        let mut client = MockHttpClient::new(SAMPLE_FEED);
        client.cancel_on = Some((
            "https://example.com/middle.mp3".to_string(),
            cancel.clone(),
        ));

        let _ = run_feed(
            &client,
            &remote_feed(),
            dir.path(),
            &cancel,
            NoopReporter::shared(),
        )
        .await;

        let resumed = MockHttpClient::new(SAMPLE_FEED);
        let summary = run_feed(
            &resumed,
            &remote_feed(),
            dir.path(),
            &CancellationToken::new(),
            NoopReporter::shared(),
        )
        .await
        .unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.downloaded, 2);

        let feed_dir = dir.path().join("TestPodcast");
        assert!(feed_dir.join("001_Oldest.mp3").exists());
        assert!(feed_dir.join("002_Middle.mp3").exists());
        assert!(feed_dir.join("003_Newest.mp3").exists());

        // The first run's only request was the one it completed plus the
        // cancelled one; the resume fetched exactly the two missing episodes
        assert_eq!(resumed.audio_requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_feed_reports_no_episodes_and_writes_nothing() {
        let dir = tempdir().unwrap();
        let empty_feed = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Transcripts</title>
    <description>No audio here</description>
    <item><title>Text only</title></item>
  </channel>
</rss>"#;
        let client = MockHttpClient::new(empty_feed);

        let reporter = CollectingReporter::shared();
        let summary = run_feed(
            &client,
            &remote_feed(),
            dir.path(),
            &CancellationToken::new(),
            reporter.clone(),
        )
        .await
        .unwrap();

        assert_eq!(summary.outcome, RunOutcome::NoEpisodes);
        assert_eq!(summary.total_episodes, 0);

        let events = reporter.events.lock().unwrap();
        assert!(
            events
                .iter()
                .any(|e| matches!(e, ProgressEvent::NoEpisodesFound { .. }))
        );

        // No progress record and no episode files were written
        let store = ProgressStore::new(dir.path());
        assert!(!store.record_path("TestPodcast").exists());
        let feed_dir = dir.path().join("TestPodcast");
        assert_eq!(std::fs::read_dir(&feed_dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn malformed_feed_is_reported_as_feed_failure() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient::new("this is not a feed");

        let reporter = CollectingReporter::shared();
        let summary = run_feed(
            &client,
            &remote_feed(),
            dir.path(),
            &CancellationToken::new(),
            reporter.clone(),
        )
        .await
        .unwrap();

        assert_eq!(summary.outcome, RunOutcome::FeedFailed);

        let events = reporter.events.lock().unwrap();
        assert!(
            events
                .iter()
                .any(|e| matches!(e, ProgressEvent::FeedFailed { .. }))
        );
    }

    #[tokio::test]
    async fn missing_local_feed_is_reported_as_feed_failure() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient::new(SAMPLE_FEED);
        let feed = FeedDescriptor::new("/nonexistent/feed.xml", "LocalFeed");

        let summary = run_feed(
            &client,
            &feed,
            dir.path(),
            &CancellationToken::new(),
            NoopReporter::shared(),
        )
        .await
        .unwrap();

        assert_eq!(summary.outcome, RunOutcome::FeedFailed);
    }

    #[tokio::test]
    async fn local_feed_file_is_downloaded_like_a_remote_one() {
        let dir = tempdir().unwrap();
        let feed_path = dir.path().join("feed.xml");
        std::fs::write(&feed_path, SAMPLE_FEED).unwrap();

        let client = MockHttpClient::new("unused for local feeds");
        let feed = FeedDescriptor::new(feed_path.to_str().unwrap(), "LocalFeed");

        let summary = run_feed(
            &client,
            &feed,
            dir.path(),
            &CancellationToken::new(),
            NoopReporter::shared(),
        )
        .await
        .unwrap();

        assert_eq!(summary.downloaded, 3);
        assert!(dir.path().join("LocalFeed").join("001_Oldest.mp3").exists());
    }

    #[tokio::test]
    async fn pre_cancelled_token_pauses_before_fetching() {
        let dir = tempdir().unwrap();
        let client = MockHttpClient::new(SAMPLE_FEED);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = run_feed(
            &client,
            &remote_feed(),
            dir.path(),
            &cancel,
            NoopReporter::shared(),
        )
        .await;

        assert!(matches!(result, Err(RunError::Cancelled)));
        assert!(client.audio_requests.lock().unwrap().is_empty());
    }
}
