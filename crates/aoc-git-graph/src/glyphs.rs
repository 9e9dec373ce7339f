//! Turns one laid-out row into box-drawing cells.
//!
//! Each lane column takes two cells: the lane itself and a gap used by
//! horizontal connectors. One text line is drawn per commit.

use aoc_core::{GraphNode, Lane, LaneColor};

pub const COMMIT: char = '●';
pub const MERGE: char = '◉';

const UP: u8 = 1;
const DOWN: u8 = 2;
const LEFT: u8 = 4;
const RIGHT: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphCell {
    pub glyph: char,
    pub color: Option<LaneColor>,
}

struct RowCanvas {
    flags: Vec<u8>,
    colors: Vec<Option<LaneColor>>,
    vertical: Vec<bool>,
}

impl RowCanvas {
    fn new(slots: usize) -> Self {
        Self {
            flags: vec![0; slots],
            colors: vec![None; slots],
            vertical: vec![false; slots],
        }
    }

    fn pass_through(&mut self, lane: Lane) {
        let slot = lane.column * 2;
        self.flags[slot] |= UP | DOWN;
        self.colors[slot] = Some(lane.color);
        self.vertical[slot] = true;
    }

    /// Joins `lane` to the node column, entering from above (`UP`) or
    /// leaving downward (`DOWN`).
    fn connect(&mut self, node_column: usize, lane: Lane, direction: u8) {
        let node_slot = node_column * 2;
        let slot = lane.column * 2;
        let toward_node = if slot > node_slot { LEFT } else { RIGHT };
        self.flags[slot] |= direction | toward_node;
        if !self.vertical[slot] {
            self.colors[slot] = Some(lane.color);
        }

        let (low, high) = if slot > node_slot {
            (node_slot, slot)
        } else {
            (slot, node_slot)
        };
        for between in low + 1..high {
            self.flags[between] |= LEFT | RIGHT;
            if self.colors[between].is_none() {
                self.colors[between] = Some(lane.color);
            }
        }
    }
}

fn box_glyph(flags: u8) -> char {
    match flags {
        0 => ' ',
        f if f == UP | DOWN || f == UP || f == DOWN => '│',
        f if f == LEFT | RIGHT || f == LEFT || f == RIGHT => '─',
        f if f == UP | LEFT => '╯',
        f if f == UP | RIGHT => '╰',
        f if f == DOWN | LEFT => '╮',
        f if f == DOWN | RIGHT => '╭',
        f if f == UP | DOWN | LEFT => '┤',
        f if f == UP | DOWN | RIGHT => '├',
        f if f == UP | LEFT | RIGHT => '┴',
        f if f == DOWN | LEFT | RIGHT => '┬',
        _ => '┼',
    }
}

/// Cells for `node`, padded to `width` lane columns.
pub fn row_cells(node: &GraphNode, width: usize) -> Vec<GraphCell> {
    let slots = width.max(node.width()) * 2;
    let mut canvas = RowCanvas::new(slots);

    for lane in &node.passing {
        canvas.pass_through(*lane);
    }
    for lane in &node.incoming {
        canvas.connect(node.column, *lane, UP);
    }
    for lane in &node.outgoing {
        canvas.connect(node.column, *lane, DOWN);
    }
    // Merge parents already tracked by a rail join that rail sideways.
    for edge in node.parent_edges.iter().skip(1) {
        let joins_passing = node.passing.iter().find(|lane| lane.column == edge.column);
        let opened_here = node.outgoing.iter().any(|lane| lane.column == edge.column);
        if let (Some(lane), false) = (joins_passing, opened_here) {
            canvas.connect(node.column, *lane, DOWN);
        }
    }

    let node_slot = node.column * 2;
    canvas
        .flags
        .iter()
        .zip(canvas.colors.iter())
        .enumerate()
        .map(|(slot, (flags, color))| {
            if slot == node_slot {
                GraphCell {
                    glyph: if node.parent_edges.len() > 1 { MERGE } else { COMMIT },
                    color: Some(node.color),
                }
            } else {
                GraphCell {
                    glyph: box_glyph(*flags),
                    color: *color,
                }
            }
        })
        .collect()
}

pub fn plain_row(node: &GraphNode, width: usize) -> String {
    row_cells(node, width)
        .iter()
        .map(|cell| cell.glyph)
        .collect::<String>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aoc_core::{layout, Commit};

    fn commit(hash: &str, parents: &[&str]) -> Commit {
        Commit::new(
            hash,
            parents.iter().map(|parent| parent.to_string()).collect(),
        )
    }

    fn render(commits: &[Commit]) -> Vec<String> {
        let graph = layout(commits);
        graph
            .nodes
            .iter()
            .map(|node| plain_row(node, graph.max_columns).trim_end().to_string())
            .collect()
    }

    #[test]
    fn merge_opens_lane_and_roots_close_it() {
        let rows = render(&[
            commit("C3", &["C2"]),
            commit("C2", &["C1", "C0"]),
            commit("C1", &[]),
            commit("C0", &[]),
        ]);
        assert_eq!(rows, vec!["●", "◉─╮", "● │", "  ●"]);
    }

    #[test]
    fn fork_converges_from_the_right() {
        let rows = render(&[
            commit("A", &["root"]),
            commit("B", &["root"]),
            commit("root", &[]),
        ]);
        assert_eq!(rows, vec!["●", "│ ●", "●─╯"]);
    }

    #[test]
    fn connector_crossing_a_passing_lane_uses_a_cross() {
        let rows = render(&[
            commit("A", &["m"]),
            commit("B", &["y"]),
            commit("m", &["p", "q"]),
            commit("y", &[]),
            commit("p", &[]),
            commit("q", &[]),
        ]);
        // m opens column 2 while B's rail passes through column 1.
        assert_eq!(rows[2], "◉─┼─╮");
        assert_eq!(rows[3], "│ ● │");
    }

    #[test]
    fn merge_into_tracked_rail_joins_it_sideways() {
        let rows = render(&[
            commit("A", &["P2"]),
            commit("M", &["P1", "P2"]),
            commit("P1", &[]),
            commit("P2", &[]),
        ]);
        assert_eq!(rows, vec!["●", "├─◉", "│ ●", "●"]);
    }

    #[test]
    fn connector_cells_take_the_lane_color() {
        let graph = layout(&[
            commit("C2", &["C1", "C0"]),
            commit("C1", &[]),
            commit("C0", &[]),
        ]);
        let merge = &graph.nodes[0];
        let cells = row_cells(merge, graph.max_columns);
        let opened = merge.outgoing[0];
        assert_eq!(cells[0].color, Some(merge.color));
        assert_eq!(cells[1].color, Some(opened.color));
        assert_eq!(cells[2].glyph, '╮');
        assert_eq!(cells[2].color, Some(opened.color));
    }

    #[test]
    fn glyph_table_covers_junctions() {
        assert_eq!(box_glyph(UP | DOWN | LEFT | RIGHT), '┼');
        assert_eq!(box_glyph(UP | DOWN | LEFT), '┤');
        assert_eq!(box_glyph(DOWN | LEFT | RIGHT), '┬');
        assert_eq!(box_glyph(0), ' ');
    }
}
