use aoc_core::{Commit, GraphLayout, GraphNode};
use aoc_git_history::{CommitSource, GitCliSource, GraphDriver, HistoryError};
use crossterm::event::{KeyCode, KeyEvent, MouseEvent, MouseEventKind};
use ratatui::widgets::TableState;
use std::sync::Arc;
use tracing::{info, warn};

const SCROLL_STEP: isize = 3;

pub struct App<S: CommitSource = GitCliSource> {
    pub driver: GraphDriver<S>,
    pub graph: Arc<GraphLayout>,
    pub table_state: TableState,
    pub show_help: bool,
    pub show_detail: bool,
    pub last_error: Option<String>,
    pub head_label: Option<String>,
    pub prefetch_margin: usize,
    /// Visible table rows, refreshed on every draw.
    pub page_rows: usize,
    repo_changed: bool,
    should_quit: bool,
}

impl<S: CommitSource> App<S> {
    pub fn new(driver: GraphDriver<S>, prefetch_margin: usize) -> Self {
        Self {
            driver,
            graph: Arc::new(GraphLayout::default()),
            table_state: TableState::default(),
            show_help: false,
            show_detail: false,
            last_error: None,
            head_label: None,
            prefetch_margin,
            page_rows: 10,
            repo_changed: false,
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn load(&mut self) {
        let result = self.driver.load_initial();
        self.record(result);
        self.head_label = self.read_head_label();
        self.sync_graph(None);
    }

    /// Called from the file watcher; the head is only re-read on the next tick.
    pub fn on_repo_changed(&mut self) {
        self.repo_changed = true;
    }

    pub fn on_tick(&mut self) {
        if std::mem::take(&mut self.repo_changed) {
            self.check_head();
        }
    }

    pub fn selected(&self) -> Option<usize> {
        self.table_state
            .selected()
            .filter(|row| *row < self.graph.len())
    }

    pub fn selected_commit(&self) -> Option<(&Commit, &GraphNode)> {
        let row = self.selected()?;
        Some((self.driver.commits().get(row)?, self.graph.node(row)?))
    }

    pub fn selected_rail(&self) -> Option<u32> {
        self.selected_commit().map(|(_, node)| node.rail_id)
    }

    pub fn status_line(&self) -> String {
        let head = self.head_label.as_deref().unwrap_or("-");
        let more = if self.driver.has_more() { "+" } else { "" };
        let position = self
            .selected()
            .map(|row| format!("{}/", row + 1))
            .unwrap_or_default();
        format!(
            "{} @ {} | {}{}{} commits | {} lanes",
            self.driver.query().label(),
            head,
            position,
            self.graph.len(),
            more,
            self.graph.max_columns
        )
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
            }
            KeyCode::Esc => {
                if self.show_help {
                    self.show_help = false;
                } else if self.show_detail {
                    self.show_detail = false;
                } else {
                    self.should_quit = true;
                }
            }
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::PageDown => self.move_selection(self.page_step()),
            KeyCode::PageUp => self.move_selection(-self.page_step()),
            KeyCode::Home | KeyCode::Char('g') => self.select_row(0),
            KeyCode::End | KeyCode::Char('G') => {
                self.select_row(self.graph.len().saturating_sub(1));
            }
            KeyCode::Char('m') => self.load_more(),
            KeyCode::Char('a') => self.toggle_all_branches(),
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Enter => {
                self.show_help = false;
                self.show_detail = !self.show_detail;
            }
            KeyCode::Char('?') => {
                self.show_help = !self.show_help;
            }
            _ => {}
        }
    }

    pub fn handle_mouse(&mut self, event: MouseEvent) {
        match event.kind {
            MouseEventKind::ScrollUp => self.move_selection(-SCROLL_STEP),
            MouseEventKind::ScrollDown => self.move_selection(SCROLL_STEP),
            _ => {}
        }
    }

    fn page_step(&self) -> isize {
        self.page_rows.max(1) as isize
    }

    fn move_selection(&mut self, delta: isize) {
        let current = self.selected().unwrap_or(0) as isize;
        let next = (current + delta).max(0) as usize;
        self.select_row(next);
    }

    fn select_row(&mut self, row: usize) {
        if self.graph.is_empty() {
            self.table_state.select(None);
            return;
        }
        let row = row.min(self.graph.len() - 1);
        self.table_state.select(Some(row));
        if self.driver.has_more() && row + self.prefetch_margin >= self.graph.len() {
            self.load_more();
        }
    }

    fn load_more(&mut self) {
        let keep = self.selected_hash();
        match self.driver.load_more() {
            Ok(true) => self.sync_graph(keep.as_deref()),
            Ok(false) => {}
            Err(err) => self.record_error(err),
        }
    }

    fn refresh(&mut self) {
        let keep = self.selected_hash();
        let result = self.driver.refresh();
        self.record(result);
        self.head_label = self.read_head_label();
        self.sync_graph(keep.as_deref());
    }

    fn toggle_all_branches(&mut self) {
        let keep = self.selected_hash();
        let all = !self.driver.query().all_branches;
        let query = self.driver.query().clone().with_all_branches(all);
        let result = self.driver.reset(query);
        self.record(result);
        self.sync_graph(keep.as_deref());
    }

    fn check_head(&mut self) {
        let label = self.read_head_label();
        if label == self.head_label {
            return;
        }
        info!(
            from = self.head_label.as_deref().unwrap_or("-"),
            to = label.as_deref().unwrap_or("-"),
            "head moved; reloading commit graph"
        );
        self.head_label = label;
        let query = self.driver.query().clone();
        let result = self.driver.reset(query);
        self.record(result);
        self.sync_graph(None);
    }

    fn read_head_label(&self) -> Option<String> {
        match self.driver.head_label() {
            Ok(label) => label,
            Err(err) => {
                warn!(error = %err, "failed to read head label");
                None
            }
        }
    }

    fn selected_hash(&self) -> Option<String> {
        self.selected_commit().map(|(commit, _)| commit.hash.clone())
    }

    /// Re-reads the memoized layout and puts the selection back on `keep`
    /// when that commit is still loaded.
    fn sync_graph(&mut self, keep: Option<&str>) {
        self.graph = self.driver.layout();
        if self.graph.is_empty() {
            self.table_state.select(None);
            return;
        }
        let row = keep
            .and_then(|hash| self.graph.row_of(hash))
            .or_else(|| self.table_state.selected())
            .unwrap_or(0)
            .min(self.graph.len() - 1);
        self.table_state.select(Some(row));
    }

    fn record(&mut self, result: Result<(), HistoryError>) {
        match result {
            Ok(()) => self.last_error = None,
            Err(err) => self.record_error(err),
        }
    }

    fn record_error(&mut self, err: HistoryError) {
        warn!(error = %err, "commit history request failed");
        self.last_error = Some(err.to_string());
    }
}
