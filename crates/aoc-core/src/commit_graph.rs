//! Lane ("rail") assignment for drawing commit history as a graph.
//!
//! [`layout`] walks commits in reverse-topological order (children before
//! ancestors) and places each one on a column. Rails wait for the next
//! ancestor of their lineage; when several rails wait for the same commit
//! they converge onto the lowest column and the rest are freed. Freed columns
//! are reused lowest-first, so the slot list never grows past the largest
//! number of lineages that were alive at the same time.
//!
//! Input that breaks the ordering precondition still terminates: a parent
//! that was already placed is treated as not seen yet, exactly like a parent
//! that lies beyond a truncated page.

use crate::git_contracts::Commit;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const LANE_PALETTE: [&str; 8] = [
    "#83a598", "#fabd2f", "#b8bb26", "#d3869b", "#fe8019", "#8ec07c", "#fb4934", "#bdae93",
];

/// Index into [`LANE_PALETTE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LaneColor(u8);

impl LaneColor {
    pub fn from_counter(counter: usize) -> Self {
        Self((counter % LANE_PALETTE.len()) as u8)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn hex(self) -> &'static str {
        LANE_PALETTE[self.index()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lane {
    pub column: usize,
    pub color: LaneColor,
}

/// Where the line from a node toward one of its parents ends.
///
/// When the parent was placed later in the same pass the edge points at the
/// parent's own column and color. Otherwise `parent_row` is `None` and the
/// edge keeps the lane that was left waiting for the parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentEdge {
    pub parent_hash: String,
    pub column: usize,
    pub color: LaneColor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_row: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Index of the commit in the input slice.
    pub row: usize,
    pub hash: String,
    pub column: usize,
    pub color: LaneColor,
    /// Per-pass id of the owning rail; nodes sharing it form one lineage.
    pub rail_id: u32,
    /// False when the node's rail ends here (root commit).
    pub continues: bool,
    pub parent_edges: Vec<ParentEdge>,
    /// Rails that run straight through this row.
    pub passing: Vec<Lane>,
    /// Rails that converge into this node and end here.
    pub incoming: Vec<Lane>,
    /// Rails opened at this row for merge parents nobody was waiting for.
    pub outgoing: Vec<Lane>,
}

impl GraphNode {
    pub fn lane(&self) -> Lane {
        Lane {
            column: self.column,
            color: self.color,
        }
    }

    /// Highest column touched while drawing this row, plus one.
    pub fn width(&self) -> usize {
        self.passing
            .iter()
            .chain(&self.incoming)
            .chain(&self.outgoing)
            .map(|lane| lane.column)
            .chain(std::iter::once(self.column))
            .max()
            .map_or(0, |column| column + 1)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphLayout {
    pub nodes: Vec<GraphNode>,
    /// High-water mark of simultaneously active rails.
    pub max_columns: usize,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl GraphLayout {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, row: usize) -> Option<&GraphNode> {
        self.nodes.get(row)
    }

    pub fn row_of(&self, hash: &str) -> Option<usize> {
        self.index.get(hash).copied()
    }

    pub fn node_by_hash(&self, hash: &str) -> Option<&GraphNode> {
        self.row_of(hash).and_then(|row| self.nodes.get(row))
    }

    /// Pairs each node with the commit it was laid out from.
    pub fn rows<'a>(
        &'a self,
        commits: &'a [Commit],
    ) -> impl Iterator<Item = (&'a Commit, &'a GraphNode)> + 'a {
        commits.iter().zip(self.nodes.iter())
    }
}

/// Lays out `commits`, which must be ordered children-before-ancestors.
pub fn layout(commits: &[Commit]) -> GraphLayout {
    let mut pass = LayoutPass::with_capacity(commits.len());
    for commit in commits {
        pass.place(commit);
    }
    pass.finish()
}

#[derive(Debug, Clone)]
struct Rail {
    id: u32,
    color: LaneColor,
    awaited: Option<String>,
}

impl Rail {
    fn is_active(&self) -> bool {
        self.awaited.is_some()
    }

    fn awaits(&self, hash: &str) -> bool {
        self.awaited.as_deref() == Some(hash)
    }
}

/// Rails indexed by column. Free slots are reused lowest-first and trailing
/// free slots are dropped after every row.
#[derive(Debug, Default)]
struct RailBoard {
    rails: Vec<Rail>,
    // Last color seen in each column, kept after the slot itself is trimmed.
    column_colors: Vec<LaneColor>,
    next_id: u32,
    color_counter: usize,
    high_water: usize,
}

impl RailBoard {
    fn columns_awaiting(&self, hash: &str) -> Vec<usize> {
        self.rails
            .iter()
            .enumerate()
            .filter(|(_, rail)| rail.awaits(hash))
            .map(|(column, _)| column)
            .collect()
    }

    fn first_awaiting(&self, hash: &str) -> Option<usize> {
        self.rails.iter().position(|rail| rail.awaits(hash))
    }

    fn active_columns(&self) -> Vec<usize> {
        self.rails
            .iter()
            .enumerate()
            .filter(|(_, rail)| rail.is_active())
            .map(|(column, _)| column)
            .collect()
    }

    fn lane(&self, column: usize) -> Lane {
        Lane {
            column,
            color: self.rails[column].color,
        }
    }

    fn next_color(&mut self, column: usize) -> LaneColor {
        let mut color = LaneColor::from_counter(self.color_counter);
        self.color_counter += 1;
        if self.column_colors.get(column) == Some(&color) {
            color = LaneColor::from_counter(self.color_counter);
            self.color_counter += 1;
        }
        color
    }

    fn allocate(&mut self, awaited: &str) -> usize {
        let column = self
            .rails
            .iter()
            .position(|rail| !rail.is_active())
            .unwrap_or(self.rails.len());
        let color = self.next_color(column);
        let rail = Rail {
            id: self.next_id,
            color,
            awaited: Some(awaited.to_string()),
        };
        self.next_id += 1;

        if column == self.rails.len() {
            self.rails.push(rail);
            self.high_water = self.high_water.max(self.rails.len());
        } else {
            self.rails[column] = rail;
        }
        if column == self.column_colors.len() {
            self.column_colors.push(color);
        } else {
            self.column_colors[column] = color;
        }
        column
    }

    fn retarget(&mut self, column: usize, awaited: &str) {
        self.rails[column].awaited = Some(awaited.to_string());
    }

    fn free(&mut self, column: usize) {
        self.rails[column].awaited = None;
    }

    fn trim(&mut self) {
        while self.rails.last().is_some_and(|rail| !rail.is_active()) {
            self.rails.pop();
        }
    }
}

struct LayoutPass {
    board: RailBoard,
    nodes: Vec<GraphNode>,
    index: HashMap<String, usize>,
}

impl LayoutPass {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            board: RailBoard::default(),
            nodes: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    fn place(&mut self, commit: &Commit) {
        let row = self.nodes.len();
        let board = &mut self.board;
        let active_before = board.active_columns();
        let awaiting = board.columns_awaiting(&commit.hash);

        let mut incoming = Vec::new();
        let column = match awaiting.split_first() {
            Some((&survivor, converged)) => {
                for &other in converged {
                    incoming.push(board.lane(other));
                    board.free(other);
                }
                survivor
            }
            None => board.allocate(&commit.hash),
        };
        let own_lane = board.lane(column);
        let rail_id = board.rails[column].id;

        let passing = active_before
            .into_iter()
            .filter(|candidate| !awaiting.contains(candidate))
            .map(|candidate| board.lane(candidate))
            .collect::<Vec<_>>();

        let mut outgoing = Vec::new();
        match commit.parent_hashes.split_first() {
            Some((first, merged)) => {
                board.retarget(column, first);
                for parent in merged {
                    if board.first_awaiting(parent).is_none() {
                        let opened = board.allocate(parent);
                        outgoing.push(board.lane(opened));
                    }
                }
            }
            None => board.free(column),
        }

        let parent_edges = commit
            .parent_hashes
            .iter()
            .map(|parent| {
                let lane = board
                    .first_awaiting(parent)
                    .map(|tracking| board.lane(tracking))
                    .unwrap_or(own_lane);
                ParentEdge {
                    parent_hash: parent.clone(),
                    column: lane.column,
                    color: lane.color,
                    parent_row: None,
                }
            })
            .collect();

        board.trim();
        self.index.entry(commit.hash.clone()).or_insert(row);
        self.nodes.push(GraphNode {
            row,
            hash: commit.hash.clone(),
            column,
            color: own_lane.color,
            rail_id,
            continues: !commit.parent_hashes.is_empty(),
            parent_edges,
            passing,
            incoming,
            outgoing,
        });
    }

    fn finish(mut self) -> GraphLayout {
        let placements = self.nodes.iter().map(GraphNode::lane).collect::<Vec<_>>();
        for node in &mut self.nodes {
            for edge in &mut node.parent_edges {
                let Some(&parent_row) = self.index.get(&edge.parent_hash) else {
                    continue;
                };
                if parent_row <= node.row {
                    continue;
                }
                let placed = placements[parent_row];
                edge.column = placed.column;
                edge.color = placed.color;
                edge.parent_row = Some(parent_row);
            }
        }

        GraphLayout {
            nodes: self.nodes,
            max_columns: self.board.high_water,
            index: self.index,
        }
    }
}
