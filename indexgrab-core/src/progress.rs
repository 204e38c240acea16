// Console rendering of scan events

use crate::run::extract_url_path;
use colored::Colorize;
use indexgrab_scanner::{EventSink, ScanEvent};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub struct ConsoleSink {
    bar: ProgressBar,
    discovered: AtomicUsize,
    downloaded: AtomicUsize,
    failed: AtomicUsize,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new_spinner())
    }

    /// Render onto an existing bar, e.g. `ProgressBar::hidden()` in tests.
    pub fn with_bar(bar: ProgressBar) -> Self {
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            bar.set_style(style);
        }
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_message("Starting...");

        Self {
            bar,
            discovered: AtomicUsize::new(0),
            downloaded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    pub fn discovered(&self) -> usize {
        self.discovered.load(Ordering::Relaxed)
    }

    pub fn downloaded(&self) -> usize {
        self.downloaded.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn finish(&self) {
        self.bar.finish_with_message(format!(
            "Done! {} discovered, {} downloaded, {} failed",
            self.discovered(),
            self.downloaded(),
            self.failed()
        ));
    }

    fn status(&self, action: &str, url: &str) {
        self.bar.set_message(format!(
            "{} {}  [{} found, {} saved]",
            action,
            extract_url_path(url),
            self.discovered(),
            self.downloaded()
        ));
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for ConsoleSink {
    fn emit(&self, event: ScanEvent) {
        match event {
            ScanEvent::PageVisited { url, .. } => self.status("Scanning", url.as_str()),
            ScanEvent::FileDiscovered { url } => {
                self.discovered.fetch_add(1, Ordering::Relaxed);
                self.bar
                    .println(format!("{} {}", "+".green().bold(), url.as_str().bright_white()));
            }
            ScanEvent::FileRejected { .. } | ScanEvent::LinkSkipped { .. } => self.bar.tick(),
            ScanEvent::BranchFailed { url, error } => {
                self.bar.println(format!(
                    "{} {} {}",
                    "⚠".yellow().bold(),
                    url.as_str().yellow(),
                    error.bright_black()
                ));
            }
            ScanEvent::DownloadStarted { url } => self.status("Downloading", url.as_str()),
            ScanEvent::DownloadRetrying {
                url,
                attempt,
                error,
            } => {
                self.bar.println(format!(
                    "{} {} (attempt {}) {}",
                    "↻".yellow(),
                    url.as_str(),
                    attempt.to_string().cyan(),
                    error.bright_black()
                ));
            }
            ScanEvent::DownloadFinished { path, .. } => {
                self.downloaded.fetch_add(1, Ordering::Relaxed);
                self.bar.println(format!(
                    "{} {}",
                    "✓".green().bold(),
                    path.display().to_string().bright_white()
                ));
            }
            ScanEvent::DownloadFailed {
                url,
                attempts,
                error,
            } => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                self.bar.println(format!(
                    "{} {} after {} attempts: {}",
                    "✗".red().bold(),
                    url.as_str().red(),
                    attempts,
                    error
                ));
            }
        }
    }
}
