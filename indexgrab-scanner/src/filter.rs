use crate::error::{Result, ScanError};
use regex::Regex;
use std::fmt;
use std::sync::Arc;

pub type NamePredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// How a file name is matched before it is queued for download.
#[derive(Clone)]
pub enum NameFilter {
    /// Regular expression anchored at the start of the file name
    Pattern(Regex),
    /// Caller-supplied predicate
    Predicate(NamePredicate),
}

impl NameFilter {
    pub fn pattern(pattern: &str) -> Result<Self> {
        let anchored = format!("^(?:{})", pattern);
        Regex::new(&anchored)
            .map(NameFilter::Pattern)
            .map_err(|e| ScanError::InvalidFilter(format!("'{}': {}", pattern, e)))
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        NameFilter::Predicate(Arc::new(f))
    }

    pub fn matches(&self, file_name: &str) -> bool {
        match self {
            NameFilter::Pattern(re) => re.is_match(file_name),
            NameFilter::Predicate(f) => f(file_name),
        }
    }
}

impl fmt::Debug for NameFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameFilter::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            NameFilter::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Name and extension constraints on discovered files.
///
/// An empty spec accepts everything; when both parts are set a file must
/// satisfy both.
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    name: Option<NameFilter>,
    extensions: Vec<String>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name_filter(mut self, filter: NameFilter) -> Self {
        self.name = Some(filter);
        self
    }

    pub fn with_pattern(self, pattern: &str) -> Result<Self> {
        Ok(self.with_name_filter(NameFilter::pattern(pattern)?))
    }

    pub fn with_predicate<F>(self, f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.with_name_filter(NameFilter::predicate(f))
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(Into::into)
            .filter(|ext| !ext.is_empty())
            .collect();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.extensions.is_empty()
    }

    pub fn accepts(&self, file_name: &str) -> bool {
        if let Some(ref name) = self.name
            && !name.matches(file_name)
        {
            return false;
        }

        self.extensions.is_empty()
            || self
                .extensions
                .iter()
                .any(|ext| file_name.ends_with(ext.as_str()))
    }
}
