// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::error::DownloadError;
use crate::feed::Episode;
use crate::http::{ByteStream, HttpClient};
use crate::progress::{ProgressEvent, SharedProgressReporter};

/// Position of a download within the ordered feed
#[derive(Debug, Clone)]
pub struct DownloadContext {
    /// 1-based sequence number of this episode
    pub position: usize,
    /// Total number of episodes in the feed
    pub total_episodes: usize,
}

/// Download one episode to the given path.
///
/// The response status is checked before the destination file is created, and
/// the body is streamed to disk chunk by chunk. The cancellation token is
/// observed at every chunk boundary, so cancellation latency is bounded by
/// one chunk.
///
/// Postcondition: the destination file is either complete, flushed, and
/// closed, or absent. Cancellation and transport errors both delete the
/// partial file (best-effort) before the error is returned.
pub async fn download_episode<C: HttpClient>(
    client: &C,
    episode: &Episode,
    output_path: &Path,
    context: &DownloadContext,
    cancel: &CancellationToken,
    reporter: &SharedProgressReporter,
) -> Result<u64, DownloadError> {
    let url = episode.enclosure_url.as_str();
    let title = episode
        .title
        .clone()
        .unwrap_or_else(|| format!("Episode_{}", context.position));

    let response = tokio::select! {
        _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
        result = client.get_stream(url) => {
            result.map_err(|e| DownloadError::HttpFailed {
                url: url.to_string(),
                source: e,
            })?
        }
    };

    // Status check happens before the file exists, so an unsuccessful
    // response never leaves an empty file behind.
    if response.status >= 400 {
        return Err(DownloadError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    reporter.report(ProgressEvent::DownloadStarting {
        episode_title: title.clone(),
        position: context.position,
        total_episodes: context.total_episodes,
        content_length: response.content_length,
    });

    let mut file = File::create(output_path)
        .await
        .map_err(|e| DownloadError::FileCreateFailed {
            path: output_path.to_path_buf(),
            source: e,
        })?;

    let mut body = response.body;
    let stream_result = stream_to_file(
        &mut file,
        &mut body,
        url,
        output_path,
        response.content_length,
        &title,
        cancel,
        reporter,
    )
    .await;

    match stream_result {
        Ok(bytes_downloaded) => Ok(bytes_downloaded),
        Err(e) => {
            // Close the handle before deleting; a failed delete must not
            // mask the original error.
            drop(file);
            let _ = tokio::fs::remove_file(output_path).await;
            Err(e)
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn stream_to_file(
    file: &mut File,
    body: &mut ByteStream,
    url: &str,
    output_path: &Path,
    content_length: Option<u64>,
    title: &str,
    cancel: &CancellationToken,
    reporter: &SharedProgressReporter,
) -> Result<u64, DownloadError> {
    let mut bytes_downloaded: u64 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }

        let chunk = tokio::select! {
            _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
            next = body.next() => match next {
                None => break,
                Some(result) => result.map_err(|e| DownloadError::StreamFailed {
                    url: url.to_string(),
                    source: e,
                })?,
            },
        };

        file.write_all(&chunk)
            .await
            .map_err(|e| DownloadError::FileWriteFailed {
                path: output_path.to_path_buf(),
                source: e,
            })?;

        bytes_downloaded += chunk.len() as u64;

        reporter.report(ProgressEvent::DownloadProgress {
            episode_title: title.to_string(),
            bytes_downloaded,
            total_bytes: content_length,
        });
    }

    // The enclosure URL is recorded as downloaded only after this flush
    // succeeds, so a crash can never leave a recorded-but-truncated file.
    file.flush()
        .await
        .map_err(|e| DownloadError::FileWriteFailed {
            path: output_path.to_path_buf(),
            source: e,
        })?;

    Ok(bytes_downloaded)
}
