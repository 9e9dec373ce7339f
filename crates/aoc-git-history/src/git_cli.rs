use crate::{CommitSource, HistoryError};
use aoc_core::{Commit, HistoryQuery};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

const FIELD_SEP: char = '\u{1f}';
const RECORD_SEP: char = '\u{1e}';
const LOG_FORMAT: &str = "--format=%H%x1f%P%x1f%an%x1f%ae%x1f%ct%x1f%s%x1e";
const FIELD_COUNT: usize = 6;
const EMPTY_BRANCH_MARKERS: [&str; 2] = ["does not have any commits", "bad default revision"];

pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &Path, args: &[OsString]) -> io::Result<Output>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessCommandRunner;

impl CommandRunner for ProcessCommandRunner {
    fn run(&self, program: &Path, args: &[OsString]) -> io::Result<Output> {
        Command::new(program).args(args).output()
    }
}

/// Reads history by shelling out to `git log`.
pub struct GitCliSource<R: CommandRunner = ProcessCommandRunner> {
    runner: R,
    binary: PathBuf,
}

impl GitCliSource<ProcessCommandRunner> {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self::with_runner(ProcessCommandRunner, binary)
    }
}

impl Default for GitCliSource<ProcessCommandRunner> {
    fn default() -> Self {
        Self::new("git")
    }
}

impl<R: CommandRunner> GitCliSource<R> {
    pub fn with_runner(runner: R, binary: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn log_args(query: &HistoryQuery, max_count: usize) -> Result<Vec<OsString>, HistoryError> {
        let mut args = vec![
            OsString::from("-C"),
            query.repo_path.clone().into_os_string(),
            OsString::from("log"),
            OsString::from("--topo-order"),
            OsString::from("--no-color"),
            OsString::from("-n"),
            OsString::from(max_count.to_string()),
            OsString::from(LOG_FORMAT),
        ];
        if query.all_branches {
            args.push(OsString::from("--all"));
        } else if let Some(revision) = &query.revision {
            if revision.starts_with('-') {
                return Err(HistoryError::InvalidQuery(format!(
                    "revision `{revision}` looks like an option"
                )));
            }
            args.push(OsString::from(revision));
        }
        args.push(OsString::from("--"));
        Ok(args)
    }

    /// Top-level directory of the work tree containing `path`.
    pub fn repo_root(&self, path: &Path) -> Result<PathBuf, HistoryError> {
        let args = vec![
            OsString::from("-C"),
            path.as_os_str().to_os_string(),
            OsString::from("rev-parse"),
            OsString::from("--show-toplevel"),
        ];
        let output = self.run_git(&args)?;
        if !output.status.success() {
            return Err(self.command_failed(&args, &output));
        }
        let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if root.is_empty() {
            return Err(self.command_failed(&args, &output));
        }
        Ok(PathBuf::from(root))
    }

    fn rev_parse(&self, repo: &Path, extra: &[&str]) -> Result<Option<String>, HistoryError> {
        let mut args = vec![
            OsString::from("-C"),
            repo.as_os_str().to_os_string(),
            OsString::from("rev-parse"),
        ];
        args.extend(extra.iter().map(OsString::from));
        let output = self.run_git(&args)?;
        if !output.status.success() {
            debug!(
                repo = %repo.display(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "rev-parse did not resolve"
            );
            return Ok(None);
        }
        let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(Some(value).filter(|value| !value.is_empty()))
    }

    fn run_git(&self, args: &[OsString]) -> Result<Output, HistoryError> {
        self.runner
            .run(&self.binary, args)
            .map_err(|source| HistoryError::GitUnavailable {
                binary: self.binary.display().to_string(),
                source,
            })
    }

    fn command_failed(&self, args: &[OsString], output: &Output) -> HistoryError {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let detail = if !stderr.is_empty() {
            stderr
        } else if !stdout.is_empty() {
            stdout
        } else {
            format!("exit status {}", output.status)
        };
        let rendered_args = args
            .iter()
            .map(|arg| arg.to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        HistoryError::CommandFailed {
            command: format!("{} {rendered_args}", self.binary.display()),
            detail,
        }
    }
}

impl<R: CommandRunner> CommitSource for GitCliSource<R> {
    fn fetch_commits(
        &self,
        query: &HistoryQuery,
        max_count: usize,
    ) -> Result<Vec<Commit>, HistoryError> {
        if max_count == 0 {
            return Ok(Vec::new());
        }
        let args = Self::log_args(query, max_count)?;
        debug!(
            repo = %query.repo_path.display(),
            scope = %query.label(),
            max_count,
            "fetching commits"
        );
        let output = self.run_git(&args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if EMPTY_BRANCH_MARKERS
                .iter()
                .any(|marker| stderr.contains(marker))
            {
                debug!(repo = %query.repo_path.display(), "branch has no commits yet");
                return Ok(Vec::new());
            }
            return Err(self.command_failed(&args, &output));
        }

        let commits = parse_log_output(&String::from_utf8_lossy(&output.stdout))?;
        debug!(count = commits.len(), "parsed commits");
        Ok(commits)
    }

    fn head_label(&self, query: &HistoryQuery) -> Result<Option<String>, HistoryError> {
        let Some(branch) = self.rev_parse(&query.repo_path, &["--abbrev-ref", "HEAD"])? else {
            return Ok(None);
        };
        if branch != "HEAD" {
            return Ok(Some(branch));
        }
        let detached = self.rev_parse(&query.repo_path, &["--short", "HEAD"])?;
        Ok(detached.map(|short| format!("detached@{short}")))
    }
}

/// Parses output produced with [`LOG_FORMAT`].
pub fn parse_log_output(raw: &str) -> Result<Vec<Commit>, HistoryError> {
    raw.split(RECORD_SEP)
        .map(|record| record.trim_start_matches(|ch: char| ch == '\n' || ch == '\r'))
        .filter(|record| !record.trim().is_empty())
        .enumerate()
        .map(|(index, record)| parse_record(index, record))
        .collect()
}

fn parse_record(index: usize, record: &str) -> Result<Commit, HistoryError> {
    let fields = record.split(FIELD_SEP).collect::<Vec<_>>();
    if fields.len() != FIELD_COUNT {
        return Err(HistoryError::MalformedRecord {
            index,
            reason: format!("expected {FIELD_COUNT} fields, found {}", fields.len()),
        });
    }

    let hash = fields[0].trim();
    if hash.is_empty() {
        return Err(HistoryError::MalformedRecord {
            index,
            reason: "missing commit hash".to_string(),
        });
    }
    let timestamp_seconds =
        fields[4]
            .trim()
            .parse::<i64>()
            .map_err(|err| HistoryError::MalformedRecord {
                index,
                reason: format!("invalid timestamp `{}`: {err}", fields[4].trim()),
            })?;

    Ok(Commit {
        hash: hash.to_string(),
        parent_hashes: fields[1].split_whitespace().map(str::to_string).collect(),
        author_name: fields[2].to_string(),
        author_email: fields[3].to_string(),
        timestamp_seconds,
        summary: fields[5].trim_end().to_string(),
    })
}
