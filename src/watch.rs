//! The `watch` task
//!
//! Source changes are routed to transform tasks through a table of
//! (watch glob, task) pairs. Events are debounced; once a batch settles
//! every task it matched runs concurrently.

use crate::config::{AssetCategory, PathTable};
use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::{run_task, Context, TaskKind};
use crate::tasks::files;
use crossbeam::channel::{self, RecvTimeoutError};
use globset::{GlobBuilder, GlobMatcher};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// Quiet period that closes a batch of events
pub const DEBOUNCE: Duration = Duration::from_millis(100);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Watch globs and the tasks they trigger
#[derive(Debug, Clone)]
pub struct WatchTable {
    entries: Vec<(GlobMatcher, TaskKind)>,
    roots: Vec<PathBuf>,
}

impl WatchTable {
    /// Build the table from the configured watch globs
    pub fn from_paths(paths: &PathTable) -> ExecutionResult<Self> {
        let mut entries = Vec::new();
        let mut bases = BTreeSet::new();

        for category in AssetCategory::ALL {
            let Some(pattern) = &paths.category(category).watch else {
                continue;
            };
            let pattern = pattern.trim_start_matches("./");
            let matcher = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| ExecutionError::Glob {
                    pattern: pattern.to_string(),
                    error: e.to_string(),
                })?
                .compile_matcher();

            entries.push((matcher, TaskKind::for_category(category)));
            bases.insert(files::glob_base(pattern));
        }

        // a directory watched recursively covers everything below it
        let roots = bases
            .iter()
            .filter(|base| {
                !bases
                    .iter()
                    .any(|other| other != *base && base.starts_with(other))
            })
            .cloned()
            .collect();

        Ok(WatchTable { entries, roots })
    }

    /// Directories to watch, relative to the project root
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Tasks triggered by a change to `relative`
    pub fn tasks_for(&self, relative: &Path) -> Vec<TaskKind> {
        self.tasks_for_batch([relative])
    }

    /// Tasks triggered by a batch of changes, each task once
    pub fn tasks_for_batch<'a>(&self, changed: impl IntoIterator<Item = &'a Path>) -> Vec<TaskKind> {
        let changed: Vec<String> = changed.into_iter().map(files::slash_path).collect();

        self.entries
            .iter()
            .filter(|(matcher, _)| changed.iter().any(|path| matcher.is_match(path)))
            .map(|(_, task)| *task)
            .fold(Vec::new(), |mut tasks, task| {
                if !tasks.contains(&task) {
                    tasks.push(task);
                }
                tasks
            })
    }
}

/// Whether an event can change a file's content
fn is_content_change(event: &Event) -> bool {
    match event.kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

/// Watch sources until shutdown, re-running the matching transforms
pub fn watch(ctx: &Context) -> ExecutionResult<()> {
    let table = WatchTable::from_paths(&ctx.config.paths)?;
    let (tx, rx) = channel::unbounded::<Event>();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        if let Ok(event) = res {
            let _ = tx.send(event);
        }
    })
    .map_err(|e| ExecutionError::Watch(e.to_string()))?;

    for root in table.roots() {
        let dir = ctx.resolve(root);
        if !dir.is_dir() {
            ctx.print_warn(&format!("not watching {}: no such directory", dir.display()));
            continue;
        }
        watcher
            .watch(&dir, RecursiveMode::Recursive)
            .map_err(|e| ExecutionError::Watch(format!("{}: {}", dir.display(), e)))?;
        ctx.print_debug(&format!("watching {}", dir.display()));
    }

    let roots = [
        ctx.root.clone(),
        ctx.root.canonicalize().unwrap_or_else(|_| ctx.root.clone()),
    ];
    let mut pending: BTreeSet<PathBuf> = BTreeSet::new();
    let mut last_event: Option<Instant> = None;

    while !ctx.is_shutdown() {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) if is_content_change(&event) => {
                for path in &event.paths {
                    if let Some(relative) = roots.iter().find_map(|root| path.strip_prefix(root).ok()) {
                        pending.insert(relative.to_path_buf());
                    }
                }
                last_event = Some(Instant::now());
            }
            Ok(_) | Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let settled = last_event.is_some_and(|at| at.elapsed() >= DEBOUNCE);
        if settled {
            last_event = None;
            let batch = std::mem::take(&mut pending);
            let tasks = table.tasks_for_batch(batch.iter().map(PathBuf::as_path));
            if !tasks.is_empty() {
                run_batch(ctx, &tasks);
            }
        }
    }

    Ok(())
}

/// Run tasks concurrently; failures are reported and watching continues
fn run_batch(ctx: &Context, tasks: &[TaskKind]) {
    thread::scope(|scope| {
        for &task in tasks {
            scope.spawn(move || {
                if let Err(e) = run_task(task, ctx) {
                    ctx.print_error(&format!("{} failed: {}", task, e));
                }
            });
        }
    });
}
