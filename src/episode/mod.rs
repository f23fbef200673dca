mod download;
mod filename;

pub use download::{DownloadContext, download_episode};
pub use filename::{episode_filename, sanitize_title};
