//! Keeps a paginated commit list and its graph layout in step.
//!
//! Every growth of the list triggers a full re-layout; results are memoized
//! on [`SnapshotKey`], so asking again without new data is free. A reset
//! (new repository, branch switch, explicit refresh) opens a new generation,
//! which drops the memo instead of leaving a layout for another history
//! around.

use crate::{CommitSource, HistoryError};
use aoc_core::git_contracts::has_more_history;
use aoc_core::{layout, Commit, GraphLayout, HistoryQuery};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Identity of one commit-list snapshot. Within a generation the list only
/// ever grows at the tail, so the length pins the contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    pub generation: u64,
    pub len: usize,
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub key: SnapshotKey,
    pub commits: Arc<[Commit]>,
}

pub struct GraphDriver<S: CommitSource> {
    source: S,
    query: HistoryQuery,
    page_size: usize,
    commits: Arc<[Commit]>,
    generation: u64,
    has_more: bool,
    memo: Option<(SnapshotKey, Arc<GraphLayout>)>,
    layout_passes: u64,
}

impl<S: CommitSource> GraphDriver<S> {
    pub fn new(source: S, query: HistoryQuery, page_size: usize) -> Self {
        Self {
            source,
            query,
            page_size: page_size.max(1),
            commits: Arc::from(Vec::new()),
            generation: 0,
            has_more: false,
            memo: None,
            layout_passes: 0,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn query(&self) -> &HistoryQuery {
        &self.query
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn layout_passes(&self) -> u64 {
        self.layout_passes
    }

    pub fn snapshot_key(&self) -> SnapshotKey {
        SnapshotKey {
            generation: self.generation,
            len: self.commits.len(),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            key: self.snapshot_key(),
            commits: Arc::clone(&self.commits),
        }
    }

    pub fn head_label(&self) -> Result<Option<String>, HistoryError> {
        self.source.head_label(&self.query)
    }

    pub fn load_initial(&mut self) -> Result<(), HistoryError> {
        self.reload(self.page_size)
    }

    /// Switches to another history. Prior state is discarded before the
    /// fetch, so a failed fetch leaves an empty graph rather than a stale one.
    pub fn reset(&mut self, query: HistoryQuery) -> Result<(), HistoryError> {
        info!(
            repo = %query.repo_path.display(),
            scope = %query.label(),
            "resetting commit graph"
        );
        self.query = query;
        self.start_generation(Vec::new(), false);
        self.reload(self.page_size)
    }

    /// Re-reads at least as much history as is currently loaded.
    pub fn refresh(&mut self) -> Result<(), HistoryError> {
        let count = self.commits.len().max(self.page_size);
        self.reload(count)
    }

    /// Fetches the next page. Returns whether new commits arrived.
    pub fn load_more(&mut self) -> Result<bool, HistoryError> {
        if !self.has_more {
            return Ok(false);
        }

        let requested = self.commits.len() + self.page_size;
        let fetched = self.source.fetch_commits(&self.query, requested)?;
        let has_more = has_more_history(requested, fetched.len());
        let extends = fetched.len() >= self.commits.len()
            && fetched
                .iter()
                .zip(self.commits.iter())
                .all(|(next, current)| next.hash == current.hash);

        if !extends {
            warn!(
                loaded = self.commits.len(),
                fetched = fetched.len(),
                "history changed while paging; starting a new snapshot"
            );
            self.start_generation(fetched, has_more);
            return Ok(true);
        }

        self.has_more = has_more;
        if fetched.len() == self.commits.len() {
            return Ok(false);
        }
        debug!(
            from = self.commits.len(),
            to = fetched.len(),
            has_more,
            "extended commit snapshot"
        );
        self.commits = Arc::from(fetched);
        Ok(true)
    }

    /// Layout of the current snapshot, computed at most once per snapshot.
    pub fn layout(&mut self) -> Arc<GraphLayout> {
        let key = self.snapshot_key();
        if let Some(graph) = self.cached_layout(key) {
            return graph;
        }

        let graph = Arc::new(layout(&self.commits));
        self.layout_passes += 1;
        debug!(
            generation = key.generation,
            rows = key.len,
            max_columns = graph.max_columns,
            "computed commit graph layout"
        );
        self.memo = Some((key, Arc::clone(&graph)));
        graph
    }

    pub fn cached_layout(&self, key: SnapshotKey) -> Option<Arc<GraphLayout>> {
        self.memo
            .as_ref()
            .filter(|(cached, _)| *cached == key)
            .map(|(_, graph)| Arc::clone(graph))
    }

    fn reload(&mut self, count: usize) -> Result<(), HistoryError> {
        let fetched = self.source.fetch_commits(&self.query, count)?;
        let has_more = has_more_history(count, fetched.len());
        self.start_generation(fetched, has_more);
        Ok(())
    }

    fn start_generation(&mut self, commits: Vec<Commit>, has_more: bool) {
        self.generation += 1;
        self.commits = Arc::from(commits);
        self.has_more = has_more;
        self.memo = None;
        debug!(
            generation = self.generation,
            len = self.commits.len(),
            has_more,
            "started commit snapshot"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    struct FakeSource {
        head: RefCell<Vec<Commit>>,
        all: Vec<Commit>,
        requests: RefCell<Vec<usize>>,
        fail: Cell<bool>,
    }

    impl FakeSource {
        fn new(head: Vec<Commit>) -> Self {
            Self {
                all: head.clone(),
                head: RefCell::new(head),
                requests: RefCell::new(Vec::new()),
                fail: Cell::new(false),
            }
        }
    }

    impl CommitSource for FakeSource {
        fn fetch_commits(
            &self,
            query: &HistoryQuery,
            max_count: usize,
        ) -> Result<Vec<Commit>, HistoryError> {
            self.requests.borrow_mut().push(max_count);
            if self.fail.get() {
                return Err(HistoryError::CommandFailed {
                    command: "git log".to_string(),
                    detail: "index.lock exists".to_string(),
                });
            }
            let history = if query.all_branches {
                self.all.clone()
            } else {
                self.head.borrow().clone()
            };
            Ok(history.into_iter().take(max_count).collect())
        }

        fn head_label(&self, _query: &HistoryQuery) -> Result<Option<String>, HistoryError> {
            Ok(Some("main".to_string()))
        }
    }

    /// `c{n-1}` down to `c0`, with a side branch merged every tenth commit.
    fn history(count: usize) -> Vec<Commit> {
        (0..count)
            .rev()
            .map(|index| {
                let mut parents = Vec::new();
                if index > 0 {
                    parents.push(format!("c{}", index - 1));
                }
                if index >= 3 && index % 10 == 0 {
                    parents.push(format!("c{}", index - 3));
                }
                Commit::new(format!("c{index}"), parents)
            })
            .collect()
    }

    fn driver(source: &FakeSource, page_size: usize) -> GraphDriver<&FakeSource> {
        GraphDriver::new(source, HistoryQuery::new("/repo"), page_size)
    }

    #[test]
    fn initial_load_fetches_one_page() {
        let source = FakeSource::new(history(120));
        let mut driver = driver(&source, 50);
        driver.load_initial().expect("load");

        assert_eq!(driver.commits().len(), 50);
        assert!(driver.has_more());
        assert_eq!(*source.requests.borrow(), vec![50]);
        assert_eq!(driver.head_label().expect("label").as_deref(), Some("main"));
    }

    #[test]
    fn repeated_layout_requests_hit_the_memo() {
        let source = FakeSource::new(history(30));
        let mut driver = driver(&source, 50);
        driver.load_initial().expect("load");

        let first = driver.layout();
        let second = driver.layout();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(driver.layout_passes(), 1);
        assert!(!driver.has_more());
    }

    #[test]
    fn load_more_grows_snapshot_and_keeps_earlier_rows() {
        let source = FakeSource::new(history(120));
        let mut driver = driver(&source, 50);
        driver.load_initial().expect("load");
        let first_key = driver.snapshot_key();
        let first = driver.layout();

        assert!(driver.load_more().expect("load more"));
        let second_key = driver.snapshot_key();
        assert_eq!(second_key.generation, first_key.generation);
        assert_eq!(second_key.len, 100);
        assert!(driver.cached_layout(second_key).is_none());

        let second = driver.layout();
        assert_eq!(driver.layout_passes(), 2);
        for row in 0..50 {
            assert_eq!(first.nodes[row].lane(), second.nodes[row].lane());
            assert_eq!(first.nodes[row].rail_id, second.nodes[row].rail_id);
        }
        assert_eq!(*source.requests.borrow(), vec![50, 100]);
    }

    #[test]
    fn load_more_stops_once_history_is_exhausted() {
        let source = FakeSource::new(history(70));
        let mut driver = driver(&source, 50);
        driver.load_initial().expect("load");

        assert!(driver.load_more().expect("second page"));
        assert_eq!(driver.commits().len(), 70);
        assert!(!driver.has_more());
        assert!(!driver.load_more().expect("nothing left"));
        assert_eq!(source.requests.borrow().len(), 2);
    }

    #[test]
    fn reset_invalidates_memo_and_uses_new_query() {
        let mut source = FakeSource::new(history(20));
        source.all = history(40);
        let mut driver = driver(&source, 100);
        driver.load_initial().expect("load");
        let before = driver.snapshot_key();
        driver.layout();

        driver
            .reset(HistoryQuery::new("/repo").with_all_branches(true))
            .expect("reset");
        let after = driver.snapshot_key();
        assert!(after.generation > before.generation);
        assert_eq!(after.len, 40);
        assert!(driver.cached_layout(before).is_none());
        assert!(driver.query().all_branches);
    }

    #[test]
    fn same_length_in_new_generation_is_a_different_snapshot() {
        let source = FakeSource::new(history(20));
        let mut driver = driver(&source, 100);
        driver.load_initial().expect("load");
        let first = driver.layout();

        driver.refresh().expect("refresh");
        assert_eq!(driver.snapshot_key().len, first.len());
        let second = driver.layout();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[test]
    fn failed_page_keeps_previous_snapshot() {
        let source = FakeSource::new(history(120));
        let mut driver = driver(&source, 50);
        driver.load_initial().expect("load");
        let key = driver.snapshot_key();
        let graph = driver.layout();

        source.fail.set(true);
        assert!(driver.load_more().is_err());
        assert_eq!(driver.snapshot_key(), key);
        assert!(driver.has_more());
        let cached = driver.cached_layout(key).expect("memo kept");
        assert!(Arc::ptr_eq(&graph, &cached));
    }

    #[test]
    fn failed_reset_leaves_an_empty_graph() {
        let source = FakeSource::new(history(10));
        let mut driver = driver(&source, 50);
        driver.load_initial().expect("load");

        source.fail.set(true);
        assert!(driver.reset(HistoryQuery::new("/other")).is_err());
        assert!(driver.commits().is_empty());
        assert!(driver.layout().is_empty());
    }

    #[test]
    fn rewritten_history_starts_a_new_generation() {
        let source = FakeSource::new(history(120));
        let mut driver = driver(&source, 50);
        driver.load_initial().expect("load");
        let before = driver.snapshot_key();

        let mut rewritten = history(120);
        rewritten[0] = Commit::new("amended", vec!["c118".to_string()]);
        *source.head.borrow_mut() = rewritten;

        assert!(driver.load_more().expect("load more"));
        let after = driver.snapshot_key();
        assert_eq!(after.generation, before.generation + 1);
        assert_eq!(driver.commits()[0].hash, "amended");
    }

    #[test]
    fn page_size_is_at_least_one() {
        let source = FakeSource::new(history(3));
        let driver = driver(&source, 0);
        assert_eq!(driver.page_size(), 1);
    }
}
