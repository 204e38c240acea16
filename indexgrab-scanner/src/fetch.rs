use crate::error::{Result, ScanError};
use reqwest::{Client, Response};
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const HTML_CONTENT_TYPES: [&str; 2] = ["text/html", "application/xhtml+xml"];

/// What a crawled URL turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    /// An HTML listing, with the URL it was served from after redirects
    Listing { url: Url, body: String },
    /// Anything else; the body is left unread
    Leaf { content_type: Option<String> },
}

/// Thin wrapper over a pooled `reqwest::Client` shared by crawl and download.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let timeout_secs = timeout_secs.max(1);
        let client = Client::builder()
            .user_agent(concat!("indexgrab/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }

    /// GET `url`, failing on transport errors and non-2xx statuses.
    pub async fn get(&self, url: &Url) -> Result<Response> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ScanError::fetch(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::FetchStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    /// Fetch a crawl target and decide whether it is a listing.
    pub async fn fetch_page(&self, url: &Url) -> Result<Page> {
        debug!("Fetching {}", url);

        let response = self.get(url).await?;
        let final_url = response.url().clone();
        if final_url != *url {
            debug!("{} redirected to {}", url, final_url);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if !is_html_like(content_type.as_deref(), &final_url) {
            return Ok(Page::Leaf { content_type });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ScanError::fetch(url.as_str(), e))?;

        Ok(Page::Listing {
            url: final_url,
            body,
        })
    }
}

/// A missing content type only counts as HTML for folder-shaped URLs.
pub fn is_html_like(content_type: Option<&str>, url: &Url) -> bool {
    match content_type {
        Some(ct) => {
            let mime = ct.split(';').next().unwrap_or_default().trim();
            HTML_CONTENT_TYPES
                .iter()
                .any(|html| mime.eq_ignore_ascii_case(html))
        }
        None => url.path().ends_with('/'),
    }
}

/// Raw `href` values of every `<a>` in document order.
pub fn extract_anchors(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(|href| href.to_string())
        .collect()
}
