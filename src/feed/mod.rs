mod parse;
mod source;

pub use parse::{Episode, parse_feed};
pub use source::{FeedDescriptor, FeedSource, fetch_feed_text};
