use aoc_core::{layout, Commit, GraphLayout};
use std::collections::BTreeSet;

struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }

    fn below(&mut self, bound: usize) -> usize {
        (self.next() % bound as u64) as usize
    }
}

/// Builds a branchy history oldest-first, then returns it newest-first so
/// every child precedes its ancestors.
fn generated_history(seed: u64, count: usize) -> Vec<Commit> {
    let mut rng = Lcg(seed);
    let mut created: Vec<Commit> = vec![Commit::new("c0000", vec![])];
    let mut heads: Vec<String> = vec!["c0000".to_string()];

    for index in 1..count {
        let hash = format!("c{index:04}");
        let roll = rng.below(100);
        let parents = if roll < 55 || heads.is_empty() {
            if heads.is_empty() {
                heads.push(created[rng.below(created.len())].hash.clone());
            }
            let slot = rng.below(heads.len());
            let parent = std::mem::replace(&mut heads[slot], hash.clone());
            vec![parent]
        } else if roll < 75 {
            let parent = created[rng.below(created.len())].hash.clone();
            heads.push(hash.clone());
            vec![parent]
        } else if roll < 95 && heads.len() >= 2 {
            let first = rng.below(heads.len());
            let mut second = rng.below(heads.len());
            if second == first {
                second = (second + 1) % heads.len();
            }
            let merged = heads[second].clone();
            let mainline = std::mem::replace(&mut heads[first], hash.clone());
            heads.remove(second);
            vec![mainline, merged]
        } else {
            heads.push(hash.clone());
            Vec::new()
        };

        let mut commit = Commit::new(hash, parents);
        commit.timestamp_seconds = 1_708_995_600 + index as i64;
        created.push(commit);
    }

    created.reverse();
    created
}

fn placements(graph: &GraphLayout, rows: usize) -> Vec<(usize, usize, u32)> {
    graph.nodes[..rows]
        .iter()
        .map(|node| (node.column, node.color.index(), node.rail_id))
        .collect()
}

#[test]
fn paginated_prefix_keeps_its_placements() {
    for seed in [3, 17, 4242] {
        let commits = generated_history(seed, 100);
        let first_page = layout(&commits[..50]);
        let second_page = layout(&commits);

        assert_eq!(
            placements(&first_page, 50),
            placements(&second_page, 50),
            "seed {seed}"
        );
        for row in 0..50 {
            let before = &first_page.nodes[row];
            let after = &second_page.nodes[row];
            assert_eq!(before.passing, after.passing, "seed {seed} row {row}");
            assert_eq!(before.incoming, after.incoming, "seed {seed} row {row}");
            assert_eq!(before.outgoing, after.outgoing, "seed {seed} row {row}");
        }
        assert!(first_page.max_columns <= second_page.max_columns);
    }
}

#[test]
fn layout_is_deterministic_for_generated_histories() {
    let commits = generated_history(99, 160);
    assert_eq!(layout(&commits), layout(&commits));
}

#[test]
fn rows_never_exceed_reported_width() {
    let commits = generated_history(7, 200);
    let graph = layout(&commits);

    assert!(graph.max_columns >= 1);
    for node in &graph.nodes {
        assert!(
            node.width() <= graph.max_columns,
            "row {} needs {} columns, registry reports {}",
            node.row,
            node.width(),
            graph.max_columns
        );
    }
}

#[test]
fn merge_rails_open_in_the_lowest_free_column() {
    let commits = generated_history(1234, 200);
    let graph = layout(&commits);

    for node in &graph.nodes {
        let mut occupied = node
            .passing
            .iter()
            .map(|lane| lane.column)
            .collect::<BTreeSet<_>>();
        occupied.insert(node.column);
        for lane in &node.outgoing {
            assert!(
                (0..lane.column).all(|column| occupied.contains(&column)),
                "row {} opened column {} past a gap",
                node.row,
                lane.column
            );
            occupied.insert(lane.column);
        }
    }
}

#[test]
fn resolved_edges_point_at_parent_placement() {
    let commits = generated_history(55, 150);
    let graph = layout(&commits);

    for (commit, node) in graph.rows(&commits) {
        assert_eq!(node.parent_edges.len(), commit.parent_hashes.len());
        for edge in &node.parent_edges {
            match edge.parent_row {
                Some(parent_row) => {
                    let parent = &graph.nodes[parent_row];
                    assert!(parent_row > node.row);
                    assert_eq!(parent.hash, edge.parent_hash);
                    assert_eq!(parent.column, edge.column);
                    assert_eq!(parent.color, edge.color);
                }
                None => assert!(graph.row_of(&edge.parent_hash).is_none()),
            }
        }
    }
}

#[test]
fn truncated_page_leaves_edges_unresolved() {
    let commits = generated_history(8, 120);
    let page = &commits[..30];
    let graph = layout(page);

    let unresolved = graph
        .nodes
        .iter()
        .flat_map(|node| node.parent_edges.iter())
        .filter(|edge| edge.parent_row.is_none())
        .count();
    let missing = page
        .iter()
        .flat_map(|commit| commit.parent_hashes.iter())
        .filter(|parent| !page.iter().any(|commit| &commit.hash == *parent))
        .count();
    assert_eq!(unresolved, missing);
}
