use crate::glyphs;
use crate::state::App;
use crate::theme;
use aoc_core::git_contracts::SHORT_HASH_LEN;
use aoc_git_history::CommitSource;
use chrono::{DateTime, Utc};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};
use std::sync::Arc;

pub fn render<S: CommitSource>(f: &mut Frame, app: &mut App<S>) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(f.size());

    if app.show_help || app.show_detail {
        let main = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(outer[0]);

        render_graph(f, app, main[0]);
        if app.show_help {
            render_help(f, main[1]);
        } else {
            render_details(f, app, main[1]);
        }
    } else {
        render_graph(f, app, outer[0]);
    }
    render_status(f, app, outer[1]);
}

fn render_graph<S: CommitSource>(f: &mut Frame, app: &mut App<S>, area: Rect) {
    // Borders plus header row.
    app.page_rows = area.height.saturating_sub(3) as usize;
    let title = format!("Commits: {}", app.driver.query().repo_path.display());

    if app.graph.is_empty() {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let message = app
            .last_error
            .clone()
            .unwrap_or_else(|| "No commits found".to_string());
        let text = vec![
            Line::from(Span::styled(message, Color::Yellow)),
            Line::from(""),
            Line::from(format!("scope: {}", app.driver.query().label())),
            Line::from(""),
            Line::from("Press r to retry, a to toggle all branches, q to quit."),
        ];
        let p = Paragraph::new(text).wrap(Wrap { trim: true });
        f.render_widget(p, inner);
        return;
    }

    let now = Utc::now();
    let lineage = app.selected_rail();
    let graph = Arc::clone(&app.graph);
    let graph_width = (graph.max_columns * 2).max(2) as u16;

    let rows: Vec<Row> = graph
        .rows(app.driver.commits())
        .enumerate()
        .map(|(index, (commit, node))| {
            let on_lineage = lineage == Some(node.rail_id);
            let lanes = glyphs::row_cells(node, graph.max_columns)
                .into_iter()
                .map(|cell| {
                    let highlighted = on_lineage && cell.color == Some(node.color);
                    Span::styled(cell.glyph.to_string(), theme::lane_style(cell.color, highlighted))
                })
                .collect::<Vec<_>>();

            let summary_style = if on_lineage {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let age = commit
                .committed_at()
                .map(|at| format_age(now, at))
                .unwrap_or_default();

            Row::new(vec![
                Cell::from(Line::from(lanes)),
                Cell::from(Span::styled(
                    commit.short_hash(SHORT_HASH_LEN).to_string(),
                    theme::HASH_STYLE,
                )),
                Cell::from(Span::styled(commit.summary.clone(), summary_style)),
                Cell::from(Span::styled(commit.author_name.clone(), theme::AUTHOR_STYLE)),
                Cell::from(Span::styled(age, theme::DIM_STYLE)),
            ])
            .style(theme::zebra_row_style(index))
        })
        .collect();

    let widths = [
        Constraint::Length(graph_width),
        Constraint::Length(SHORT_HASH_LEN as u16 + 1),
        Constraint::Min(20),
        Constraint::Length(18),
        Constraint::Length(7),
    ];

    let table = Table::new(rows, widths)
        .header(Row::new(vec!["Graph", "Hash", "Summary", "Author", "Age"]).style(theme::HEADER_STYLE))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .highlight_style(theme::SELECTED_STYLE);

    f.render_stateful_widget(table, area, &mut app.table_state);
}

fn render_details<S: CommitSource>(f: &mut Frame, app: &App<S>, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Details");
    let inner_area = block.inner(area);
    f.render_widget(block, area);

    let Some((commit, node)) = app.selected_commit() else {
        return;
    };
    let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::DarkGray));
    let committed = commit
        .committed_at()
        .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let mut lines = vec![
        Line::from(vec![label("Commit: "), Span::styled(commit.hash.clone(), theme::HASH_STYLE)]),
        Line::from(vec![
            label("Author: "),
            Span::raw(format!("{} <{}>", commit.author_name, commit.author_email)),
        ]),
        Line::from(vec![label("Date:   "), Span::raw(committed)]),
        Line::from(""),
        Line::from(Span::styled(
            commit.summary.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            label("Lane:   "),
            Span::styled(
                format!("column {} ({})", node.column, node.color.hex()),
                theme::lane_style(Some(node.color), true),
            ),
            Span::raw(format!(", rail {}", node.rail_id)),
        ]),
    ];
    if !node.incoming.is_empty() {
        lines.push(Line::from(format!(
            "        {} branch rail(s) end here",
            node.incoming.len()
        )));
    }
    if !node.outgoing.is_empty() {
        lines.push(Line::from(format!(
            "        {} merged rail(s) start here",
            node.outgoing.len()
        )));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(label("Parents:")));
    if node.parent_edges.is_empty() {
        lines.push(Line::from("  (root commit)"));
    }
    for edge in &node.parent_edges {
        let short = edge
            .parent_hash
            .get(..SHORT_HASH_LEN)
            .unwrap_or(&edge.parent_hash);
        let place = match edge.parent_row {
            Some(row) => format!("row {}, column {}", row + 1, edge.column),
            None => format!("not loaded, column {}", edge.column),
        };
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(short.to_string(), theme::lane_style(Some(edge.color), false)),
            Span::styled(format!("  {place}"), theme::DIM_STYLE),
        ]));
    }

    let p = Paragraph::new(lines).wrap(Wrap { trim: false });
    f.render_widget(p, inner_area);
}

fn render_help(f: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Help")
        .border_style(Style::default().fg(Color::Yellow));
    let inner_area = block.inner(area);
    f.render_widget(block, area);

    let bindings = [
        ("j / Down", "Next commit"),
        ("k / Up", "Previous commit"),
        ("PgDn/PgUp", "Page down / up"),
        ("g / G", "First / last loaded commit"),
        ("m", "Load more history"),
        ("a", "Toggle all branches"),
        ("r", "Refresh"),
        ("Enter", "Toggle details pane"),
        ("?", "Toggle help"),
        ("q / Esc", "Quit"),
    ];
    let mut text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    text.extend(bindings.iter().map(|(keys, action)| {
        Line::from(vec![
            Span::styled(format!("{keys:<11}"), Color::Cyan),
            Span::raw(*action),
        ])
    }));

    let p = Paragraph::new(text).wrap(Wrap { trim: true });
    f.render_widget(p, inner_area);
}

fn render_status<S: CommitSource>(f: &mut Frame, app: &App<S>, area: Rect) {
    let mut spans = Vec::new();
    if let Some(error) = &app.last_error {
        spans.push(Span::styled(format!("{error}  "), theme::ERROR_STYLE));
    }
    spans.push(Span::styled(app.status_line(), theme::DIM_STYLE));
    spans.push(Span::styled("  ? help", theme::DIM_STYLE));
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

pub fn format_age(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);
    match seconds {
        s if s < 60 => "now".to_string(),
        s if s < 3_600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h", s / 3_600),
        s if s < 86_400 * 30 => format!("{}d", s / 86_400),
        _ => then.format("%Y-%m").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn ages_collapse_to_the_largest_unit() {
        let now = Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap();
        assert_eq!(format_age(now, now), "now");
        assert_eq!(format_age(now, now - Duration::minutes(5)), "5m");
        assert_eq!(format_age(now, now - Duration::hours(3)), "3h");
        assert_eq!(format_age(now, now - Duration::days(12)), "12d");
        assert_eq!(format_age(now, now - Duration::days(90)), "2024-02");
        assert_eq!(format_age(now, now + Duration::hours(1)), "now");
    }
}
