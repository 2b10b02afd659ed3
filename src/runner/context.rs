//! Execution context for task running
//!
//! The context carries everything a task needs: the project root, the
//! immutable configuration, console verbosity, the live-reload hub and the
//! shutdown flag shared with long-running tasks.

use crate::config::{AssetCategory, AssetPaths, Config};
use crate::server::ReloadHub;
use crate::ui::{self, Level};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Execution context shared by every task of a run
#[derive(Clone)]
pub struct Context {
    /// Directory all configured paths are relative to
    pub root: PathBuf,

    /// Parsed configuration
    pub config: Arc<Config>,

    /// Verbosity level
    pub verbosity: Verbosity,

    /// Live-reload listeners
    pub reload: ReloadHub,

    shutdown: Arc<AtomicBool>,
}

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent = 0,
    Quiet = 1,
    Normal = 2,
    Verbose = 3,
}

impl Context {
    /// Create a context rooted at the current directory
    pub fn new(config: Config) -> Self {
        Context {
            root: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config: Arc::new(config),
            verbosity: Verbosity::Normal,
            reload: ReloadHub::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set the project root
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Set verbosity level
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Resolve a configured path against the project root
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// Locations configured for an asset category
    pub fn paths(&self, category: AssetCategory) -> &AssetPaths {
        self.config.paths.category(category)
    }

    /// Output directory of a category, resolved against the root
    pub fn build_dir(&self, category: AssetCategory) -> Option<PathBuf> {
        self.paths(category).build.as_ref().map(|dir| self.resolve(dir))
    }

    /// Shared flag flipped on Ctrl+C
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Ask long-running tasks to stop
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Whether a shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Print info message
    pub fn print_info(&self, message: &str) {
        if self.verbosity >= Verbosity::Normal {
            ui::print(Level::Info, message);
        }
    }

    /// Print warning message
    pub fn print_warn(&self, message: &str) {
        if self.verbosity >= Verbosity::Quiet {
            ui::print(Level::Warn, message);
        }
    }

    /// Print error message
    pub fn print_error(&self, message: &str) {
        if self.verbosity >= Verbosity::Quiet {
            ui::print(Level::Error, message);
        }
    }

    /// Print debug message (only in verbose mode)
    pub fn print_debug(&self, message: &str) {
        if self.verbosity >= Verbosity::Verbose {
            ui::print(Level::Debug, message);
        }
    }

    /// Print task start message
    pub fn print_task_start(&self, task_name: &str) {
        self.print_info(&format!("Starting {}", ui::task(task_name)));
    }

    /// Print task complete message
    pub fn print_task_complete(&self, task_name: &str, took: Duration) {
        self.print_info(&format!(
            "Finished {} after {}",
            ui::task(task_name),
            ui::elapsed(took)
        ));
    }

    /// Print task skip message
    pub fn print_task_skip(&self, task_name: &str, reason: &str) {
        self.print_warn(&format!("Skipping {}: {}", ui::task(task_name), reason));
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
