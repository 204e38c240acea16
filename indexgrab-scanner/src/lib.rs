pub mod classify;
pub mod crawler;
pub mod download;
pub mod error;
pub mod event;
pub mod fetch;
pub mod filter;
pub mod result;
pub mod retry;

pub use classify::{ClassifiedLink, LinkKind, classify};
pub use crawler::{Crawler, DownloadableSet};
pub use download::{DownloadEngine, DownloadOptions};
pub use error::ScanError;
pub use event::{EventSink, FanoutSink, NullSink, ScanEvent, SharedSink, TracingSink};
pub use fetch::Fetcher;
pub use filter::{FilterSpec, NameFilter};
pub use result::{DownloadOutcome, DownloadReport};
pub use retry::RetryPolicy;
