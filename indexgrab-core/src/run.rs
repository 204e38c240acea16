use crate::progress::ConsoleSink;
use chrono::{DateTime, Utc};
use indexgrab_scanner::classify::file_name;
use indexgrab_scanner::error::Result;
use indexgrab_scanner::fetch::DEFAULT_TIMEOUT_SECS;
use indexgrab_scanner::{
    Crawler, DownloadEngine, DownloadOptions, DownloadReport, DownloadableSet, FanoutSink,
    Fetcher, FilterSpec, RetryPolicy, SharedSink, TracingSink,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, info};
use url::Url;

/// How discovery and downloading are sequenced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Crawl the whole tree, then download everything accepted
    TwoPhase,
    /// Start downloading each file as soon as it is discovered
    Streaming,
    /// Crawl only
    ListOnly,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::TwoPhase => "two-phase",
            RunMode::Streaming => "streaming",
            RunMode::ListOnly => "list-only",
        }
    }
}

/// Options for configuring a run
pub struct RunOptions {
    pub filter: FilterSpec,
    pub destination: PathBuf,
    pub workers: usize,
    pub retry: RetryPolicy,
    pub timeout_secs: u64,
    pub max_depth: Option<usize>,
    pub mode: RunMode,
    pub show_progress: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        let download = DownloadOptions::default();
        Self {
            filter: FilterSpec::new(),
            destination: download.destination,
            workers: download.workers,
            retry: download.retry,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_depth: None,
            mode: RunMode::TwoPhase,
            show_progress: false,
        }
    }
}

/// Everything a finished run found and did
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub root: Option<Url>,
    pub mode: RunMode,
    pub destination: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub discovered: DownloadableSet,
    pub downloads: DownloadReport,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        self.downloads.failed() > 0
    }

    pub fn elapsed_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Crawl `root` and, unless listing only, download what it finds.
///
/// Fails only when the root listing cannot be fetched; per-file failures
/// are in the returned report.
pub async fn execute_run(
    root: Url,
    options: RunOptions,
    event_sink: Option<SharedSink>,
) -> Result<RunReport> {
    let started_at = Utc::now();
    let (sink, console) = build_sink(options.show_progress, event_sink);
    let fetcher = Fetcher::with_timeout(options.timeout_secs)?;

    let crawler = Crawler::new(fetcher.clone())
        .with_workers(options.workers)
        .with_max_depth(options.max_depth)
        .with_event_sink(sink.clone());

    info!("Starting {} run of {}", options.mode.as_str(), root);

    let outcome = match options.mode {
        RunMode::ListOnly => crawler
            .discover(&root, &options.filter)
            .await
            .map(|found| (found, DownloadReport::new())),
        RunMode::TwoPhase => {
            match crawler.discover(&root, &options.filter).await {
                Ok(found) => {
                    let engine = download_engine(fetcher, &options, sink);
                    let downloads = engine.download_all(found.iter().cloned()).await;
                    Ok((found, downloads))
                }
                Err(e) => Err(e),
            }
        }
        RunMode::Streaming => {
            // page fetches and file transfers draw from one pool of `workers`
            let permits = Arc::new(Semaphore::new(options.workers));
            let (tx, rx) = mpsc::unbounded_channel();
            let crawler = crawler
                .with_discovery_channel(tx)
                .with_permits(permits.clone());
            let engine = download_engine(fetcher, &options, sink).with_permits(permits);
            let filter = &options.filter;
            let root = &root;

            // the crawler owns the sender; dropping it closes the stream
            let crawl = async move {
                let found = crawler.discover(root, filter).await;
                drop(crawler);
                found
            };
            let (found, downloads) = tokio::join!(crawl, engine.download_stream(rx));
            found.map(|found| (found, downloads))
        }
    };

    if let Some(ref console) = console {
        console.finish();
    }

    let (discovered, downloads) = outcome?;
    Ok(RunReport {
        root: Some(root),
        mode: options.mode,
        destination: options.destination,
        started_at,
        finished_at: Utc::now(),
        discovered,
        downloads,
    })
}

/// Download an explicit URL list without crawling. URLs whose file name
/// the filter rejects are left out of the run.
pub async fn execute_download(
    urls: Vec<Url>,
    options: RunOptions,
    event_sink: Option<SharedSink>,
) -> Result<RunReport> {
    let started_at = Utc::now();
    let (sink, console) = build_sink(options.show_progress, event_sink);
    let fetcher = Fetcher::with_timeout(options.timeout_secs)?;

    let discovered: DownloadableSet = urls
        .into_iter()
        .filter(|url| {
            let accepted = options.filter.accepts(&file_name(url));
            if !accepted {
                debug!("Filtered out {}", url);
            }
            accepted
        })
        .collect();
    info!("{} URL(s) pass the filter", discovered.len());
    let engine = download_engine(fetcher, &options, sink);
    let downloads = engine.download_all(discovered.iter().cloned()).await;

    if let Some(ref console) = console {
        console.finish();
    }

    Ok(RunReport {
        root: None,
        mode: RunMode::TwoPhase,
        destination: options.destination,
        started_at,
        finished_at: Utc::now(),
        discovered,
        downloads,
    })
}

fn download_engine(fetcher: Fetcher, options: &RunOptions, sink: SharedSink) -> DownloadEngine {
    DownloadEngine::new(
        fetcher,
        DownloadOptions {
            destination: options.destination.clone(),
            workers: options.workers,
            retry: options.retry,
        },
    )
    .with_event_sink(sink)
}

fn build_sink(
    show_progress: bool,
    event_sink: Option<SharedSink>,
) -> (SharedSink, Option<Arc<ConsoleSink>>) {
    let mut fanout = FanoutSink::new().with(Arc::new(TracingSink));

    let console = show_progress.then(|| Arc::new(ConsoleSink::new()));
    if let Some(ref console) = console {
        fanout = fanout.with(console.clone());
    }
    if let Some(sink) = event_sink {
        fanout = fanout.with(sink);
    }

    (Arc::new(fanout), console)
}
