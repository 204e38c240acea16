use crate::classify::{
    LinkKind, classify, file_name, is_well_formed, parent_folder, same_origin,
};
use crate::error::{Result, ScanError};
use crate::event::{ScanEvent, SharedSink, TracingSink};
use crate::fetch::{Fetcher, Page, extract_anchors};
use crate::filter::FilterSpec;
use futures::future::{BoxFuture, join_all};
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, OnceLock};
use tokio::sync::{Mutex, Semaphore, mpsc};
use tracing::{debug, info};
use url::Url;

/// Accepted file URLs found by one crawl.
pub type DownloadableSet = BTreeSet<Url>;

/// Recursive directory-listing crawler.
///
/// With a single worker, sub-folders are explored depth-first in the order
/// their anchors appear. With more, sibling folders are explored
/// concurrently and at most `workers` pages are fetched at once.
pub struct Crawler {
    fetcher: Fetcher,
    workers: usize,
    max_depth: Option<usize>,
    sink: SharedSink,
    discovered_tx: Option<mpsc::UnboundedSender<Url>>,
    permits: Option<Arc<Semaphore>>,
}

/// Per-invocation bookkeeping, dropped when `discover` returns.
struct CrawlState<'a> {
    filter: &'a FilterSpec,
    /// The root listing as served, after redirects
    scope: OnceLock<Url>,
    visited: Mutex<HashSet<Url>>,
    found: Mutex<DownloadableSet>,
    fetch_permits: Arc<Semaphore>,
}

impl CrawlState<'_> {
    fn in_scope(&self, url: &Url) -> bool {
        self.scope.get().is_none_or(|root| {
            same_origin(root, url) && url.path().starts_with(parent_folder(root))
        })
    }
}

impl Crawler {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            workers: 1,
            max_depth: None,
            sink: Arc::new(TracingSink),
            discovered_tx: None,
            permits: None,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_event_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    /// Also send every newly accepted file URL on `tx` as soon as it is found.
    pub fn with_discovery_channel(mut self, tx: mpsc::UnboundedSender<Url>) -> Self {
        self.discovered_tx = Some(tx);
        self
    }

    /// Draw fetch permits from `permits` instead of a private pool of
    /// `workers`, so page fetches share a budget with other traffic.
    pub fn with_permits(mut self, permits: Arc<Semaphore>) -> Self {
        self.permits = Some(permits);
        self
    }

    /// Crawl the tree below `root` and return every file that passes `filter`.
    ///
    /// Fails only if `root` itself is malformed or cannot be fetched; failing
    /// sub-folders are reported through the event sink and skipped.
    pub async fn discover(&self, root: &Url, filter: &FilterSpec) -> Result<DownloadableSet> {
        info!("Starting discovery of {} with {} workers", root, self.workers);

        if !is_well_formed(root) {
            return Err(ScanError::InvalidUrl(root.to_string()));
        }

        let mut root = root.clone();
        root.set_fragment(None);

        let state = CrawlState {
            filter,
            scope: OnceLock::new(),
            visited: Mutex::new(HashSet::from([root.clone()])),
            found: Mutex::new(BTreeSet::new()),
            fetch_permits: self
                .permits
                .clone()
                .unwrap_or_else(|| Arc::new(Semaphore::new(self.workers))),
        };

        self.visit(&state, root, 0).await?;

        let visited = state.visited.lock().await.len();
        let found = state.found.into_inner();
        info!(
            "Discovery complete. Visited {} listings, accepted {} files",
            visited,
            found.len()
        );
        Ok(found)
    }

    fn visit<'a>(
        &'a self,
        state: &'a CrawlState<'a>,
        url: Url,
        depth: usize,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.sink.emit(ScanEvent::PageVisited {
                url: url.clone(),
                depth,
            });

            let page = {
                let _permit = state
                    .fetch_permits
                    .acquire()
                    .await
                    .map_err(|e| ScanError::Other(format!("Fetch pool closed: {}", e)))?;
                self.fetcher.fetch_page(&url).await?
            };

            let (base, body) = match page {
                Page::Listing { url: served, body } => (served, body),
                Page::Leaf { content_type } => {
                    debug!("{} is not a listing ({:?}), treating as file", url, content_type);
                    self.consider_file(state, url).await;
                    return Ok(());
                }
            };

            if depth == 0 {
                let _ = state.scope.set(base.clone());
                state.visited.lock().await.insert(base.clone());
            } else if base != url {
                if !state.in_scope(&base) {
                    debug!("{} redirected out of the tree to {}", url, base);
                    self.sink.emit(ScanEvent::LinkSkipped {
                        href: base.to_string(),
                        kind: LinkKind::ParentEscape,
                    });
                    return Ok(());
                }
                if !state.visited.lock().await.insert(base.clone()) {
                    debug!("{} redirected to already visited {}", url, base);
                    return Ok(());
                }
            }

            let mut pending = Vec::new();

            for href in extract_anchors(&body) {
                let link = classify(&base, &href);
                let target = match (link.kind, link.url) {
                    (LinkKind::Directory, Some(target)) => target,
                    (LinkKind::FileCandidate, Some(target)) => {
                        self.consider_file(state, target).await;
                        continue;
                    }
                    (kind, _) => {
                        self.sink.emit(ScanEvent::LinkSkipped { href, kind });
                        continue;
                    }
                };

                if self.max_depth.is_some_and(|max| depth >= max) {
                    debug!("Depth limit reached, not entering {}", target);
                    continue;
                }

                if !state.visited.lock().await.insert(target.clone()) {
                    debug!("Already visited {}", target);
                    continue;
                }

                if self.workers > 1 {
                    pending.push(target);
                } else if let Err(e) = self.visit(state, target.clone(), depth + 1).await {
                    self.branch_failed(target, e);
                }
            }

            let branches = pending.into_iter().map(|target| async move {
                if let Err(e) = self.visit(state, target.clone(), depth + 1).await {
                    self.branch_failed(target, e);
                }
            });
            join_all(branches).await;

            Ok(())
        })
    }

    async fn consider_file(&self, state: &CrawlState<'_>, url: Url) {
        if !state.filter.accepts(&file_name(&url)) {
            self.sink.emit(ScanEvent::FileRejected { url });
            return;
        }

        if !state.found.lock().await.insert(url.clone()) {
            return;
        }

        if let Some(ref tx) = self.discovered_tx {
            // receiver gone means the consumer stopped; discovery still completes
            let _ = tx.send(url.clone());
        }
        self.sink.emit(ScanEvent::FileDiscovered { url });
    }

    fn branch_failed(&self, url: Url, error: ScanError) {
        self.sink.emit(ScanEvent::BranchFailed {
            url,
            error: error.to_string(),
        });
    }
}
