use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const SHORT_HASH_LEN: usize = 7;

/// A single commit as supplied by the history provider.
///
/// Field names follow the camelCase shape used on the IPC boundary so a batch
/// produced by the backend can be decoded without a mapping layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub hash: String,
    #[serde(default)]
    pub parent_hashes: Vec<String>,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub author_email: String,
    #[serde(default)]
    pub timestamp_seconds: i64,
    #[serde(default)]
    pub summary: String,
}

impl Commit {
    pub fn new(hash: impl Into<String>, parent_hashes: Vec<String>) -> Self {
        Self {
            hash: hash.into(),
            parent_hashes,
            author_name: String::new(),
            author_email: String::new(),
            timestamp_seconds: 0,
            summary: String::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_hashes.is_empty()
    }

    pub fn is_merge(&self) -> bool {
        self.parent_hashes.len() > 1
    }

    pub fn first_parent(&self) -> Option<&str> {
        self.parent_hashes.first().map(String::as_str)
    }

    pub fn short_hash(&self, len: usize) -> &str {
        let end = self
            .hash
            .char_indices()
            .nth(len)
            .map(|(idx, _)| idx)
            .unwrap_or(self.hash.len());
        &self.hash[..end]
    }

    pub fn committed_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.timestamp_seconds, 0).single()
    }
}

pub fn parse_commit_batch(input: &str) -> Result<Vec<Commit>, serde_json::Error> {
    serde_json::from_str(input)
}

/// Everything a history fetch needs apart from the page size.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HistoryQuery {
    pub repo_path: PathBuf,
    pub all_branches: bool,
    /// Branch or revision to walk from; `None` means HEAD. Ignored when
    /// `all_branches` is set.
    pub revision: Option<String>,
}

impl HistoryQuery {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
            all_branches: false,
            revision: None,
        }
    }

    pub fn with_all_branches(mut self, all_branches: bool) -> Self {
        self.all_branches = all_branches;
        self
    }

    pub fn with_revision(mut self, revision: Option<String>) -> Self {
        self.revision = revision
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        self
    }

    pub fn label(&self) -> String {
        if self.all_branches {
            return "all branches".to_string();
        }
        match &self.revision {
            Some(revision) => revision.clone(),
            None => "HEAD".to_string(),
        }
    }
}

/// A full page means the provider may hold more history beyond it.
pub fn has_more_history(requested: usize, returned: usize) -> bool {
    requested > 0 && returned >= requested
}
