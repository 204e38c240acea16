//! Link classification for directory-listing pages.
//!
//! Every `href` found on a listing is resolved against the page it came from
//! and sorted into one of four buckets. Only links that stay strictly below
//! the page's own folder, on the same origin, are ever followed.

use url::{Host, Url};

const ALLOWED_SCHEMES: [&str; 4] = ["http", "https", "ftp", "ftps"];
const SKIPPED_PREFIXES: [&str; 4] = ["javascript:", "mailto:", "tel:", "data:"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Another listing below the current folder; recurse into it
    Directory,
    /// A leaf below the current folder; evaluate it for download
    FileCandidate,
    /// Walks up (`../`) or sideways out of the tree, or to another origin
    ParentEscape,
    /// Unresolvable, malformed, or a link back to the page itself
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLink {
    pub url: Option<Url>,
    pub kind: LinkKind,
}

impl ClassifiedLink {
    fn new(url: Url, kind: LinkKind) -> Self {
        Self {
            url: Some(url),
            kind,
        }
    }

    fn invalid() -> Self {
        Self {
            url: None,
            kind: LinkKind::Invalid,
        }
    }
}

/// Resolve `raw_href` against `base` and decide what the crawler does with it.
pub fn classify(base: &Url, raw_href: &str) -> ClassifiedLink {
    let href = raw_href.trim();

    // Self-links, in-page anchors and the column-sort links of auto-index pages
    if href.is_empty() || href == "/" || href.starts_with('#') || href.starts_with('?') {
        return ClassifiedLink::invalid();
    }

    let lowered = href.to_ascii_lowercase();
    if SKIPPED_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        return ClassifiedLink::invalid();
    }

    let Ok(mut resolved) = base.join(href) else {
        return ClassifiedLink::invalid();
    };
    resolved.set_fragment(None);
    resolved.set_query(None);

    if !is_well_formed(&resolved) {
        return ClassifiedLink::new(resolved, LinkKind::Invalid);
    }

    if !same_origin(base, &resolved) || walks_up(href) {
        return ClassifiedLink::new(resolved, LinkKind::ParentEscape);
    }

    let folder = parent_folder(base);
    let kind = match resolved.path().strip_prefix(folder) {
        None => LinkKind::ParentEscape,
        Some("") => LinkKind::Invalid,
        Some(rest) if rest.ends_with('/') || rest.matches('/').count() > 1 => {
            LinkKind::Directory
        }
        Some(_) => LinkKind::FileCandidate,
    };

    ClassifiedLink::new(resolved, kind)
}

/// The folder a page lives in: its path up to and including the last `/`.
pub fn parent_folder(url: &Url) -> &str {
    let path = url.path();
    match path.rfind('/') {
        Some(idx) => &path[..=idx],
        None => "/",
    }
}

/// Percent-decoded last non-empty path segment of `url`.
///
/// A folder-shaped URL that serves a file (`/pub/disk.iso/`) is named after
/// its final segment; only the host root has no name.
pub fn file_name(url: &Url) -> String {
    let last = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
        .unwrap_or_default();

    urlencoding::decode(last)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| last.to_string())
}

/// Scheme, host and path sanity check, conservative on purpose.
pub fn is_well_formed(url: &Url) -> bool {
    if !ALLOWED_SCHEMES.contains(&url.scheme()) || url.path().is_empty() {
        return false;
    }

    match url.host() {
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => true,
        Some(Host::Domain(domain)) => is_valid_domain(domain),
        None => false,
    }
}

fn is_valid_domain(domain: &str) -> bool {
    let domain = domain.strip_suffix('.').unwrap_or(domain);
    if domain.eq_ignore_ascii_case("localhost") {
        return true;
    }
    if !domain.contains('.') || domain.len() > 253 {
        return false;
    }

    domain.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

pub(crate) fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

fn walks_up(href: &str) -> bool {
    let path = href.split(['?', '#']).next().unwrap_or_default();
    path.split('/')
        .any(|segment| segment == ".." || segment.eq_ignore_ascii_case("%2e%2e"))
}
