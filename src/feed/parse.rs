// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::FeedError;

/// One downloadable feed item.
///
/// The enclosure URL is the episode's identity: it keys the progress record,
/// so it is kept as the raw feed string and never normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    pub title: Option<String>,
    pub enclosure_url: String,
    pub pub_date: Option<String>,
}

impl Episode {
    fn sort_key(&self) -> &str {
        self.pub_date.as_deref().unwrap_or("")
    }
}

/// Parse feed text into an ordered episode sequence.
///
/// Items without a non-empty enclosure URL are dropped. The survivors are
/// sorted ascending by their raw pubDate text (oldest first) so that
/// sequence numbers stay stable across reruns even if the feed reorders its
/// items; the sort is stable, so ties keep document order. Comparing raw
/// strings is lexicographic and can misorder feeds that mix date formats,
/// but renumbering would break the on-disk contract, so it stays.
///
/// An empty result is not an error; the caller reports "no episodes found".
pub fn parse_feed(text: &str) -> Result<Vec<Episode>, FeedError> {
    let channel = rss::Channel::read_from(text.as_bytes())?;

    let mut episodes: Vec<Episode> = channel
        .items()
        .iter()
        .filter_map(|item| {
            let enclosure_url = item.enclosure().map(|e| e.url().to_string())?;
            if enclosure_url.is_empty() {
                return None;
            }

            Some(Episode {
                title: item.title().map(String::from),
                enclosure_url,
                pub_date: item.pub_date().map(String::from),
            })
        })
        .collect();

    episodes.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));

    Ok(episodes)
}
