pub mod driver;
pub mod git_cli;

use aoc_core::{Commit, HistoryQuery};
use thiserror::Error;

pub use driver::{GraphDriver, Snapshot, SnapshotKey};
pub use git_cli::{CommandRunner, GitCliSource, ProcessCommandRunner};

pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("git binary `{binary}` could not be executed: {source}")]
    GitUnavailable {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("git command failed (`{command}`): {detail}")]
    CommandFailed { command: String, detail: String },
    #[error("malformed git log record {index}: {reason}")]
    MalformedRecord { index: usize, reason: String },
    #[error("invalid history query: {0}")]
    InvalidQuery(String),
}

/// Supplies commits newest-first, children always before their ancestors.
pub trait CommitSource {
    fn fetch_commits(
        &self,
        query: &HistoryQuery,
        max_count: usize,
    ) -> Result<Vec<Commit>, HistoryError>;

    /// Short name of the checked-out branch, used to notice branch switches.
    fn head_label(&self, _query: &HistoryQuery) -> Result<Option<String>, HistoryError> {
        Ok(None)
    }
}

impl<S: CommitSource + ?Sized> CommitSource for &S {
    fn fetch_commits(
        &self,
        query: &HistoryQuery,
        max_count: usize,
    ) -> Result<Vec<Commit>, HistoryError> {
        (**self).fetch_commits(query, max_count)
    }

    fn head_label(&self, query: &HistoryQuery) -> Result<Option<String>, HistoryError> {
        (**self).head_label(query)
    }
}
