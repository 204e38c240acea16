use crate::classify::LinkKind;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Everything the crawler and download engine report while they work.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    PageVisited {
        url: Url,
        depth: usize,
    },
    FileDiscovered {
        url: Url,
    },
    FileRejected {
        url: Url,
    },
    LinkSkipped {
        href: String,
        kind: LinkKind,
    },
    BranchFailed {
        url: Url,
        error: String,
    },
    DownloadStarted {
        url: Url,
    },
    DownloadRetrying {
        url: Url,
        attempt: u32,
        error: String,
    },
    DownloadFinished {
        url: Url,
        path: PathBuf,
        attempts: u32,
    },
    DownloadFailed {
        url: Url,
        attempts: u32,
        error: String,
    },
}

impl ScanEvent {
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            ScanEvent::BranchFailed { .. }
                | ScanEvent::DownloadRetrying { .. }
                | ScanEvent::DownloadFailed { .. }
        )
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: ScanEvent);
}

impl<F> EventSink for F
where
    F: Fn(ScanEvent) + Send + Sync,
{
    fn emit(&self, event: ScanEvent) {
        self(event)
    }
}

pub type SharedSink = Arc<dyn EventSink>;

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: ScanEvent) {
        match event {
            ScanEvent::PageVisited { url, depth } => debug!(%url, depth, "visiting listing"),
            ScanEvent::FileDiscovered { url } => info!(%url, "discovered file"),
            ScanEvent::FileRejected { url } => debug!(%url, "file rejected by filter"),
            ScanEvent::LinkSkipped { href, kind } => debug!(%href, ?kind, "skipping link"),
            ScanEvent::BranchFailed { url, error } => warn!(%url, %error, "listing failed"),
            ScanEvent::DownloadStarted { url } => info!(%url, "downloading"),
            ScanEvent::DownloadRetrying {
                url,
                attempt,
                error,
            } => warn!(%url, attempt, %error, "download failed, retrying"),
            ScanEvent::DownloadFinished {
                url,
                path,
                attempts,
            } => info!(%url, path = %path.display(), attempts, "download complete"),
            ScanEvent::DownloadFailed {
                url,
                attempts,
                error,
            } => warn!(%url, attempts, %error, "could not download"),
        }
    }
}

/// Delivers each event to several sinks in order.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<SharedSink>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: SharedSink) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: ScanEvent) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.emit(event.clone());
            }
            last.emit(event);
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: ScanEvent) {}
}
