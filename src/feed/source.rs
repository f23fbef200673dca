// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use crate::error::FeedError;
use crate::http::HttpClient;

/// Where feed content comes from: a remote URL or a file on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Remote(String),
    Local(PathBuf),
}

impl FeedSource {
    /// Classify a locator string as remote or local
    pub fn from_locator(locator: &str) -> Self {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            FeedSource::Remote(locator.to_string())
        } else {
            FeedSource::Local(PathBuf::from(locator))
        }
    }

    /// The locator in display form (URL or path)
    pub fn locator(&self) -> String {
        match self {
            FeedSource::Remote(url) => url.clone(),
            FeedSource::Local(path) => path.display().to_string(),
        }
    }
}

/// Identifies one feed for a download run: where to fetch it and how to
/// label its output folder and progress record
#[derive(Debug, Clone)]
pub struct FeedDescriptor {
    pub source: FeedSource,
    pub display_name: String,
}

impl FeedDescriptor {
    pub fn new(locator: &str, display_name: &str) -> Self {
        Self {
            source: FeedSource::from_locator(locator),
            display_name: display_name.to_string(),
        }
    }
}

/// Resolve a feed source to its raw text content.
///
/// Observes the cancellation token before and during the fetch; an in-flight
/// fetch unwinds with `FeedError::Cancelled` rather than a transport error.
pub async fn fetch_feed_text<C: HttpClient>(
    client: &C,
    source: &FeedSource,
    cancel: &CancellationToken,
) -> Result<String, FeedError> {
    if cancel.is_cancelled() {
        return Err(FeedError::Cancelled);
    }

    match source {
        FeedSource::Local(path) => read_feed_file(path).await,
        FeedSource::Remote(url) => {
            tokio::select! {
                _ = cancel.cancelled() => Err(FeedError::Cancelled),
                result = client.get_text(url) => {
                    result.map_err(|e| FeedError::FetchFailed {
                        url: url.clone(),
                        source: e,
                    })
                }
            }
        }
    }
}

async fn read_feed_file(path: &Path) -> Result<String, FeedError> {
    if !path.exists() {
        return Err(FeedError::FileNotFound(path.to_path_buf()));
    }

    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| FeedError::FileReadFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct PanickingClient;

    #[async_trait]
    impl HttpClient for PanickingClient {
        async fn get_text(&self, _url: &str) -> Result<String, reqwest::Error> {
            panic!("network must not be touched");
        }

        async fn get_stream(
            &self,
            _url: &str,
        ) -> Result<crate::http::HttpResponse, reqwest::Error> {
            panic!("network must not be touched");
        }
    }

    #[test]
    fn locator_classification_detects_urls() {
        assert_eq!(
            FeedSource::from_locator("http://example.com/feed.xml"),
            FeedSource::Remote("http://example.com/feed.xml".to_string())
        );
        assert_eq!(
            FeedSource::from_locator("https://example.com/feed.xml"),
            FeedSource::Remote("https://example.com/feed.xml".to_string())
        );
    }

    #[test]
    fn locator_classification_detects_paths() {
        assert_eq!(
            FeedSource::from_locator("./feed.xml"),
            FeedSource::Local(PathBuf::from("./feed.xml"))
        );
        assert_eq!(
            FeedSource::from_locator("feed.txt"),
            FeedSource::Local(PathBuf::from("feed.txt"))
        );
    }

    #[tokio::test]
    async fn local_source_reads_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.xml");
        std::fs::write(&path, "<rss/>").unwrap();

        let source = FeedSource::Local(path);
        let text = fetch_feed_text(&PanickingClient, &source, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(text, "<rss/>");
    }

    #[tokio::test]
    async fn local_source_missing_file_is_not_found() {
        let source = FeedSource::Local(PathBuf::from("/nonexistent/feed.xml"));
        let result = fetch_feed_text(&PanickingClient, &source, &CancellationToken::new()).await;

        assert!(matches!(result, Err(FeedError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn cancelled_token_aborts_before_fetch() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let source = FeedSource::Remote("https://example.com/feed.xml".to_string());
        let result = fetch_feed_text(&PanickingClient, &source, &cancel).await;

        assert!(matches!(result, Err(FeedError::Cancelled)));
    }
}
