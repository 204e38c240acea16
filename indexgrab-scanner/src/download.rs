use crate::error::{Result, ScanError};
use crate::event::{ScanEvent, SharedSink, TracingSink};
use crate::fetch::Fetcher;
use crate::result::{DownloadOutcome, DownloadReport};
use crate::retry::RetryPolicy;
use futures::StreamExt;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, info};
use url::Url;

const FALLBACK_FILE_NAME: &str = "index.html";
const MAX_TEMP_STEM: usize = 200;

pub const DEFAULT_WORKERS: usize = 5;

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub destination: PathBuf,
    pub workers: usize,
    pub retry: RetryPolicy,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            destination: PathBuf::from("."),
            workers: DEFAULT_WORKERS,
            retry: RetryPolicy::default(),
        }
    }
}

/// Mirrors remote files under a local root with a bounded number of
/// transfers in flight.
#[derive(Clone)]
pub struct DownloadEngine {
    fetcher: Fetcher,
    destination: Arc<PathBuf>,
    workers: usize,
    retry: RetryPolicy,
    sink: SharedSink,
    permits: Option<Arc<Semaphore>>,
}

impl DownloadEngine {
    pub fn new(fetcher: Fetcher, options: DownloadOptions) -> Self {
        Self {
            fetcher,
            destination: Arc::new(options.destination),
            workers: options.workers.max(1),
            retry: options.retry,
            sink: Arc::new(TracingSink),
            permits: None,
        }
    }

    pub fn with_event_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    /// Take transfer permits from `permits` rather than a private pool of
    /// `workers`.
    pub fn with_permits(mut self, permits: Arc<Semaphore>) -> Self {
        self.permits = Some(permits);
        self
    }

    /// Download every URL; one outcome per distinct URL, never an early abort.
    pub async fn download_all<I>(&self, urls: I) -> DownloadReport
    where
        I: IntoIterator<Item = Url>,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        for url in urls {
            // receiver is still in scope
            let _ = tx.send(url);
        }
        drop(tx);

        self.download_stream(rx).await
    }

    /// Download URLs as they arrive until every sender is dropped.
    pub async fn download_stream(&self, mut rx: mpsc::UnboundedReceiver<Url>) -> DownloadReport {
        info!(
            "Downloading into {} with {} workers",
            self.destination.display(),
            self.workers
        );

        let semaphore = self
            .permits
            .clone()
            .unwrap_or_else(|| Arc::new(Semaphore::new(self.workers)));
        let mut seen = HashSet::new();
        let mut handles = Vec::new();

        while let Some(url) = rx.recv().await {
            if !seen.insert(url.clone()) {
                debug!("Already queued {}", url);
                continue;
            }

            let engine = self.clone();
            let semaphore = semaphore.clone();
            let task_url = url.clone();
            let task_id = handles.len();

            let handle = tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return DownloadOutcome::Failed {
                        error: "download pool closed".to_string(),
                        attempts: 0,
                    };
                };
                engine.download_one(&task_url, task_id).await
            });

            handles.push((url, handle));
        }

        let mut report = DownloadReport::new();
        for (url, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let error = ScanError::from(e).to_string();
                    self.sink.emit(ScanEvent::DownloadFailed {
                        url: url.clone(),
                        attempts: 0,
                        error: error.clone(),
                    });
                    DownloadOutcome::Failed { error, attempts: 0 }
                }
            };
            report.insert(url, outcome);
        }

        info!(
            "Downloads complete. {} succeeded, {} failed",
            report.succeeded(),
            report.failed()
        );
        report
    }

    async fn download_one(&self, url: &Url, task_id: usize) -> DownloadOutcome {
        self.sink.emit(ScanEvent::DownloadStarted { url: url.clone() });

        let mut attempts = 0;
        loop {
            attempts += 1;

            match self.attempt(url, task_id).await {
                Ok(path) => {
                    self.sink.emit(ScanEvent::DownloadFinished {
                        url: url.clone(),
                        path: path.clone(),
                        attempts,
                    });
                    return DownloadOutcome::Success { path, attempts };
                }
                Err(e) if self.retry.has_attempts_left(attempts) => {
                    self.sink.emit(ScanEvent::DownloadRetrying {
                        url: url.clone(),
                        attempt: attempts,
                        error: e.to_string(),
                    });
                    tokio::time::sleep(self.retry.delay_after(attempts)).await;
                }
                Err(e) => {
                    let error = e.to_string();
                    self.sink.emit(ScanEvent::DownloadFailed {
                        url: url.clone(),
                        attempts,
                        error: error.clone(),
                    });
                    return DownloadOutcome::Failed { error, attempts };
                }
            }
        }
    }

    /// One fetch-and-write; the file only appears under its final name once
    /// the whole body is on disk.
    async fn attempt(&self, url: &Url, task_id: usize) -> Result<PathBuf> {
        let target = local_path(&self.destination, url);
        let dir = target.parent().unwrap_or(self.destination.as_path());
        ensure_dir(dir).await?;

        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string());
        let temp = dir.join(temp_name(&file_name, task_id));

        let response = self.fetcher.get(url).await?;

        if let Err(e) = write_body(response, url, &temp).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp, &target).await {
            let _ = fs::remove_file(&temp).await;
            return Err(ScanError::write(&target, e));
        }

        Ok(target)
    }
}

async fn write_body(response: reqwest::Response, url: &Url, temp: &Path) -> Result<()> {
    let mut file = fs::File::create(temp)
        .await
        .map_err(|e| ScanError::write(temp, e))?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ScanError::fetch(url.as_str(), e))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| ScanError::write(temp, e))?;
    }

    file.flush().await.map_err(|e| ScanError::write(temp, e))?;
    Ok(())
}

/// Create `dir` and its parents; losing a creation race is not an error.
pub async fn ensure_dir(dir: &Path) -> Result<()> {
    match fs::create_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => match fs::metadata(dir).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            _ => Err(ScanError::write(dir, e)),
        },
        Err(e) => Err(ScanError::write(dir, e)),
    }
}

/// Where `url` is stored below `destination`: the URL path without scheme
/// and host, percent-decoded. A folder-shaped URL is stored under its last
/// segment. Segments that could leave `destination` are dropped.
pub fn local_path(destination: &Path, url: &Url) -> PathBuf {
    let segments: Vec<String> = url
        .path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(|s| {
                    urlencoding::decode(s)
                        .map(|d| d.into_owned())
                        .unwrap_or_else(|_| s.to_string())
                })
                .collect()
        })
        .unwrap_or_default();

    let mut path = destination.to_path_buf();
    let Some((name, dirs)) = segments.split_last() else {
        return path.join(FALLBACK_FILE_NAME);
    };

    for dir in dirs.iter().filter(|s| is_plain_segment(s)) {
        path.push(dir);
    }

    if is_plain_segment(name) {
        path.push(name);
    } else {
        path.push(FALLBACK_FILE_NAME);
    }
    path
}

/// `.{name}.{task}.part`, with `name` cut short enough to stay under the
/// usual 255-byte file name limit.
fn temp_name(file_name: &str, task_id: usize) -> String {
    let mut end = file_name.len().min(MAX_TEMP_STEM);
    while !file_name.is_char_boundary(end) {
        end -= 1;
    }
    format!(".{}.{}.part", &file_name[..end], task_id)
}

fn is_plain_segment(segment: &str) -> bool {
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !segment.contains(['/', '\\', '\0'])
}
