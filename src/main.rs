use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use podfetch::{
    FeedDescriptor, NoopReporter, ProgressEvent, ProgressReporter, ReqwestClient, RunError,
    RunOutcome, SharedProgressReporter, run_feed,
};

// Emoji with fallback for terminals without Unicode support
static MICROPHONE: Emoji<'_, '_> = Emoji("🎙️  ", "");
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[~] ");
static HEADPHONES: Emoji<'_, '_> = Emoji("🎧 ", "[i] ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static PAUSE: Emoji<'_, '_> = Emoji("⏸️  ", "[=] ");
static PARTY: Emoji<'_, '_> = Emoji("🎉 ", "[*] ");
static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");

/// Download podcast episodes from an RSS feed, resuming across runs
#[derive(Parser, Debug)]
#[command(name = "podfetch")]
#[command(about = "Download podcast episodes from an RSS feed, resuming across runs")]
#[command(version)]
struct Args {
    /// RSS feed URL or path to a local feed file
    feed: String,

    /// Name of the feed; labels the episode folder and progress record
    name: String,

    /// Base folder for downloads and progress records
    #[arg(short, long, default_value = "Podcasts")]
    output_dir: PathBuf,

    /// Quiet mode - suppress progress output
    #[arg(short, long)]
    quiet: bool,
}

/// Progress reporter using indicatif for terminal output.
///
/// Downloads run one at a time, so one spinner line plus one transfer bar
/// is all the terminal state needed.
struct IndicatifReporter {
    main_bar: ProgressBar,
    transfer_bar: Mutex<Option<ProgressBar>>,
}

impl IndicatifReporter {
    fn new() -> Self {
        let main_style = ProgressStyle::default_bar()
            .template("{spinner:.green} {wide_msg}")
            .unwrap();

        let main_bar = ProgressBar::new_spinner();
        main_bar.set_style(main_style);
        main_bar.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            main_bar,
            transfer_bar: Mutex::new(None),
        }
    }

    fn start_transfer(&self, content_length: Option<u64>, message: String) {
        let style = ProgressStyle::default_bar()
            .template("  [{bar:30.cyan/blue}] {bytes}/{total_bytes} {wide_msg}")
            .unwrap()
            .progress_chars("█▓░");

        let bar = ProgressBar::new(content_length.unwrap_or(0));
        bar.set_style(style);
        bar.set_message(message);

        let mut slot = self.transfer_bar.lock().unwrap();
        if let Some(old) = slot.replace(bar) {
            old.finish_and_clear();
        }
    }

    fn update_transfer(&self, bytes_downloaded: u64, total_bytes: Option<u64>) {
        if let Some(bar) = self.transfer_bar.lock().unwrap().as_ref() {
            if let Some(total) = total_bytes {
                bar.set_length(total);
            }
            bar.set_position(bytes_downloaded);
        }
    }

    fn finish_transfer(&self) {
        if let Some(bar) = self.transfer_bar.lock().unwrap().take() {
            bar.finish_and_clear();
        }
    }
}

impl ProgressReporter for IndicatifReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::FetchingFeed { locator } => {
                self.main_bar
                    .set_message(format!("{SEARCH}Fetching feed: {}", locator.cyan()));
            }

            ProgressEvent::FeedParsed {
                feed_name,
                total_episodes,
                already_downloaded,
            } => {
                self.main_bar.set_message(format!(
                    "{HEADPHONES}{} • {} episodes, {} already downloaded",
                    feed_name.bold().green(),
                    total_episodes.to_string().cyan(),
                    already_downloaded.to_string().yellow()
                ));
            }

            ProgressEvent::NoEpisodesFound { feed_name } => {
                self.main_bar.finish_and_clear();
                println!(
                    "{FAILURE}{} {}",
                    "No episodes with audio enclosures found in".yellow(),
                    feed_name.bold()
                );
                println!(
                    "  {}",
                    "This may be a transcription feed, or the feed lacks enclosure URLs.".dimmed()
                );
            }

            ProgressEvent::FeedFailed { feed_name, error } => {
                self.main_bar.finish_and_clear();
                println!(
                    "{FAILURE}{} {} - {}",
                    "Could not load feed".red(),
                    feed_name.bold(),
                    error.red()
                );
            }

            ProgressEvent::DownloadStarting {
                episode_title,
                position,
                total_episodes,
                content_length,
            } => {
                self.start_transfer(
                    content_length,
                    format!(
                        "[{}/{}] {}",
                        position.to_string().cyan(),
                        total_episodes.to_string().cyan(),
                        truncate_title(&episode_title, 40)
                    ),
                );
            }

            ProgressEvent::DownloadProgress {
                bytes_downloaded,
                total_bytes,
                ..
            } => {
                self.update_transfer(bytes_downloaded, total_bytes);
            }

            ProgressEvent::EpisodeCompleted {
                episode_title,
                completed,
                total_episodes,
            } => {
                self.finish_transfer();
                self.main_bar.println(format!(
                    "{SUCCESS}{} ({}/{})",
                    truncate_title(&episode_title, 40).green(),
                    completed.to_string().green(),
                    total_episodes
                ));
            }

            ProgressEvent::EpisodeFailed {
                episode_title,
                error,
            } => {
                self.finish_transfer();
                self.main_bar.println(format!(
                    "{FAILURE}{} - {}",
                    truncate_title(&episode_title, 30).red(),
                    error.red()
                ));
            }

            ProgressEvent::RunCompleted {
                feed_name,
                downloaded,
                skipped,
                failed,
            } => {
                self.finish_transfer();
                self.main_bar.finish_and_clear();
                println!(
                    "\n{PARTY}{} {} downloaded, {} skipped, {} failed for {}",
                    "Run complete:".bold().green(),
                    downloaded.to_string().green().bold(),
                    skipped.to_string().yellow(),
                    if failed > 0 {
                        failed.to_string().red().bold()
                    } else {
                        failed.to_string().green()
                    },
                    feed_name.bold()
                );
            }

            ProgressEvent::RunCancelled {
                feed_name,
                completed,
                total_episodes,
            } => {
                self.finish_transfer();
                self.main_bar.finish_and_clear();
                println!(
                    "\n{PAUSE}{} {} at {}/{} episodes",
                    "Paused".bold().yellow(),
                    feed_name.bold(),
                    completed,
                    total_episodes
                );
            }
        }
    }
}

fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() <= max_len {
        title.to_string()
    } else {
        let truncated: String = title.chars().take(max_len.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if !args.quiet {
        println!(
            "\n{}{} {}",
            MICROPHONE,
            "podfetch".bold().magenta(),
            "- Resumable Podcast Downloader".dimmed()
        );
        println!("{}\n", "Press Ctrl+C to pause and save progress.".dimmed());
    }

    let client = ReqwestClient::new();
    let feed = FeedDescriptor::new(&args.feed, &args.name);

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_token.cancel();
        }
    });

    let reporter: SharedProgressReporter = if args.quiet {
        NoopReporter::shared()
    } else {
        Arc::new(IndicatifReporter::new())
    };

    let result = run_feed(&client, &feed, &args.output_dir, &cancel, reporter).await;

    match result {
        Ok(summary) => {
            if !args.quiet {
                println!(
                    "\n{FOLDER}Output: {}\n",
                    args.output_dir
                        .join(&args.name)
                        .display()
                        .to_string()
                        .cyan()
                );
            }

            if summary.outcome == RunOutcome::FeedFailed {
                std::process::exit(1);
            }

            Ok(())
        }
        Err(RunError::Cancelled) => {
            if !args.quiet {
                println!(
                    "\n{}",
                    "Download paused. Resume by running podfetch again.".yellow()
                );
            }
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
