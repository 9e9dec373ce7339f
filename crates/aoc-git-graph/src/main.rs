mod config;
mod glyphs;
mod state;
mod theme;
mod ui;

use anyhow::{Context, Result};
use aoc_core::git_contracts::SHORT_HASH_LEN;
use aoc_core::{Commit, GraphLayout, HistoryQuery};
use aoc_git_history::{GitCliSource, GraphDriver};
use clap::{Parser, Subcommand};
use config::GraphConfig;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use ratatui::{backend::CrosstermBackend, Terminal};
use serde::Serialize;
use std::{
    env,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver},
    time::{Duration, Instant},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "aoc-git-graph", about = "Browse git history as a lane graph")]
struct Cli {
    /// Repository to read; defaults to the current directory.
    #[arg(long, global = true)]
    repo: Option<PathBuf>,
    /// Walk every branch instead of HEAD.
    #[arg(long, global = true)]
    all: bool,
    /// Branch or revision to walk from.
    #[arg(long, global = true)]
    branch: Option<String>,
    #[arg(long, global = true)]
    page_size: Option<usize>,
    #[arg(long, global = true, env = "AOC_GIT_GRAPH_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Interactive graph viewer (default).
    View,
    /// Print the graph as text.
    Log {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the computed layout as JSON.
    Layout {
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LayoutReport<'a> {
    repo: String,
    scope: String,
    has_more: bool,
    commits: &'a [Commit],
    layout: &'a GraphLayout,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.clone().unwrap_or(Commands::View);
    init_logging(matches!(command, Commands::View));

    let config = resolve_config(&cli);
    let source = GitCliSource::new(config.git_binary.clone());
    let start = match &cli.repo {
        Some(path) => path.clone(),
        None => env::current_dir().context("failed to read current directory")?,
    };
    let repo_root = source.repo_root(&start).with_context(|| {
        format!(
            "{} is not inside a git work tree (git: {})",
            start.display(),
            source.binary().display()
        )
    })?;
    let query = HistoryQuery::new(repo_root)
        .with_revision(cli.branch.clone())
        .with_all_branches(config.all_branches);

    match command {
        Commands::View => run_view(source, query, &config),
        Commands::Log { limit } => {
            let driver = load_driver(source, query, limit.unwrap_or(config.page_size))?;
            print_log(driver)
        }
        Commands::Layout { limit, pretty } => {
            let driver = load_driver(source, query, limit.unwrap_or(config.page_size))?;
            print_layout(driver, pretty)
        }
    }
}

fn init_logging(interactive: bool) {
    let level = env::var("AOC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let stdout_enabled = matches!(
        env::var("AOC_LOG_STDOUT").ok().as_deref(),
        Some("1") | Some("true") | Some("TRUE") | Some("yes") | Some("YES")
    );
    if !interactive {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init();
    } else if stdout_enabled {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::sink)
            .try_init();
    }
}

/// File, then environment, then command-line flags.
fn resolve_config(cli: &Cli) -> GraphConfig {
    let path = cli.config.clone().unwrap_or_else(config::config_path);
    let mut config = config::load_config(&path);
    config::apply_env_overrides(&mut config);
    if let Some(page_size) = cli.page_size.filter(|size| *size > 0) {
        config.page_size = page_size;
    }
    if cli.all {
        config.all_branches = true;
    }
    config
}

fn load_driver(
    source: GitCliSource,
    query: HistoryQuery,
    limit: usize,
) -> Result<GraphDriver<GitCliSource>> {
    let mut driver = GraphDriver::new(source, query, limit);
    driver
        .load_initial()
        .with_context(|| format!("failed to read history of {}", driver.query().repo_path.display()))?;
    Ok(driver)
}

fn print_log(mut driver: GraphDriver<GitCliSource>) -> Result<()> {
    let graph = driver.layout();
    let mut out = io::stdout().lock();
    for (commit, node) in graph.rows(driver.commits()) {
        writeln!(
            out,
            "{}  {} {}",
            glyphs::plain_row(node, graph.max_columns),
            commit.short_hash(SHORT_HASH_LEN),
            commit.summary
        )?;
    }
    if driver.has_more() {
        writeln!(out, "(more history available; raise --limit)")?;
    }
    Ok(())
}

fn print_layout(mut driver: GraphDriver<GitCliSource>, pretty: bool) -> Result<()> {
    let graph = driver.layout();
    let report = LayoutReport {
        repo: driver.query().repo_path.display().to_string(),
        scope: driver.query().label(),
        has_more: driver.has_more(),
        commits: driver.commits(),
        layout: graph.as_ref(),
    };
    let json = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");
    Ok(())
}

fn run_view(source: GitCliSource, query: HistoryQuery, config: &GraphConfig) -> Result<()> {
    let repo_root = query.repo_path.clone();
    let driver = GraphDriver::new(source, query, config.page_size);
    let mut app = state::App::new(driver, config.prefetch_margin);
    app.load();
    info!(
        repo = %repo_root.display(),
        commits = app.graph.len(),
        "opened commit graph"
    );

    let (watcher, watch_rx) = setup_watcher(&repo_root);
    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut app, watch_rx);
    restore_terminal(&mut terminal)?;
    drop(watcher);

    if let Err(err) = result {
        eprintln!("aoc-git-graph: {err}");
    }

    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut state::App,
    watch_rx: Option<Receiver<()>>,
) -> Result<()> {
    let tick_rate = Duration::from_millis(500);
    let input_poll = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui::render(f, app))?;

        if event::poll(input_poll)? {
            match event::read()? {
                Event::Key(key) => {
                    if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                        app.handle_key(key);
                    }
                }
                Event::Mouse(mouse) => {
                    app.handle_mouse(mouse);
                }
                _ => {}
            }
        }

        if let Some(rx) = &watch_rx {
            let mut changed = false;
            while rx.try_recv().is_ok() {
                changed = true;
            }
            if changed {
                app.on_repo_changed();
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }

        if app.should_quit() {
            break;
        }
    }

    Ok(())
}

/// Watches `.git` (for HEAD) and `.git/refs`. Worktrees whose `.git` is a
/// file are not watched; `r` still reloads them.
fn setup_watcher(root: &Path) -> (Option<RecommendedWatcher>, Option<Receiver<()>>) {
    let git_dir = root.join(".git");
    if !git_dir.is_dir() {
        return (None, None);
    }

    let (tx, rx) = mpsc::sync_channel(1);
    let mut watcher = match RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| {
            if res.is_ok() {
                let _ = tx.try_send(());
            }
        },
        Config::default(),
    ) {
        Ok(watcher) => watcher,
        Err(_) => return (None, None),
    };

    let _ = watcher.watch(&git_dir, RecursiveMode::NonRecursive);
    let refs_dir = git_dir.join("refs");
    if refs_dir.exists() {
        let _ = watcher.watch(&refs_dir, RecursiveMode::Recursive);
    }

    (Some(watcher), Some(rx))
}
