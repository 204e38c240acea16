use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::path::PathBuf;
use url::Url;

/// Terminal result of one file's download task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DownloadOutcome {
    Success { path: PathBuf, attempts: u32 },
    Failed { error: String, attempts: u32 },
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadOutcome::Success { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            DownloadOutcome::Success { attempts, .. } | DownloadOutcome::Failed { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// One outcome per requested URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DownloadReport {
    outcomes: BTreeMap<Url, DownloadOutcome>,
}

impl DownloadReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: Url, outcome: DownloadOutcome) {
        self.outcomes.insert(url, outcome);
    }

    pub fn get(&self, url: &Url) -> Option<&DownloadOutcome> {
        self.outcomes.get(url)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Url, DownloadOutcome> {
        self.outcomes.iter()
    }
}

impl<'a> IntoIterator for &'a DownloadReport {
    type Item = (&'a Url, &'a DownloadOutcome);
    type IntoIter = btree_map::Iter<'a, Url, DownloadOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<(Url, DownloadOutcome)> for DownloadReport {
    fn from_iter<I: IntoIterator<Item = (Url, DownloadOutcome)>>(iter: I) -> Self {
        Self {
            outcomes: iter.into_iter().collect(),
        }
    }
}
