//! Task names and dispatch
//!
//! Leaf units are [`TaskKind`] values; the names accepted on the command
//! line are [`TaskName`]s, which additionally include the composite
//! `build`, `dev` and `default` pipelines.

use crate::config::AssetCategory;
use crate::error::{ConfigError, ExecutionResult};
use crate::runner::{Composition, Context};
use crate::{server, tasks, watch};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

/// A leaf unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    Clean,
    Grid,
    Html,
    Script,
    Style,
    Image,
    Fonts,
    Revision,
    RevisionReplace,
    Webserver,
    Watch,
}

impl TaskKind {
    pub const ALL: [TaskKind; 11] = [
        TaskKind::Clean,
        TaskKind::Grid,
        TaskKind::Html,
        TaskKind::Script,
        TaskKind::Style,
        TaskKind::Image,
        TaskKind::Fonts,
        TaskKind::Revision,
        TaskKind::RevisionReplace,
        TaskKind::Webserver,
        TaskKind::Watch,
    ];

    /// The five asset transforms, in declaration order
    pub const TRANSFORMS: [TaskKind; 5] = [
        TaskKind::Html,
        TaskKind::Script,
        TaskKind::Style,
        TaskKind::Fonts,
        TaskKind::Image,
    ];

    /// Command-line name
    pub fn name(self) -> &'static str {
        match self {
            TaskKind::Clean => "clean",
            TaskKind::Grid => "grid",
            TaskKind::Html => "html:build",
            TaskKind::Script => "js:build",
            TaskKind::Style => "style:build",
            TaskKind::Image => "image:build",
            TaskKind::Fonts => "fonts:build",
            TaskKind::Revision => "revision",
            TaskKind::RevisionReplace => "revisionReplace",
            TaskKind::Webserver => "webserver",
            TaskKind::Watch => "watch",
        }
    }

    /// One-line help text
    pub fn about(self) -> &'static str {
        match self {
            TaskKind::Clean => "Remove the build directory",
            TaskKind::Grid => "Generate the responsive grid partial",
            TaskKind::Html => "Expand includes in HTML pages",
            TaskKind::Script => "Bundle, transpile and minify scripts",
            TaskKind::Style => "Compile, prefix and minify stylesheets",
            TaskKind::Image => "Optimize images",
            TaskKind::Fonts => "Copy fonts",
            TaskKind::Revision => "Append content hashes to built CSS/JS",
            TaskKind::RevisionReplace => "Point HTML at the revisioned CSS/JS",
            TaskKind::Webserver => "Serve the build directory with live reload",
            TaskKind::Watch => "Re-run transforms when sources change",
        }
    }

    /// Asset category a transform task handles
    pub fn category(self) -> Option<AssetCategory> {
        match self {
            TaskKind::Html => Some(AssetCategory::Html),
            TaskKind::Script => Some(AssetCategory::Js),
            TaskKind::Style => Some(AssetCategory::Style),
            TaskKind::Image => Some(AssetCategory::Img),
            TaskKind::Fonts => Some(AssetCategory::Fonts),
            _ => None,
        }
    }

    /// Transform task for an asset category
    pub fn for_category(category: AssetCategory) -> TaskKind {
        match category {
            AssetCategory::Html => TaskKind::Html,
            AssetCategory::Js => TaskKind::Script,
            AssetCategory::Style => TaskKind::Style,
            AssetCategory::Img => TaskKind::Image,
            AssetCategory::Fonts => TaskKind::Fonts,
        }
    }

    /// Tasks that run until shutdown
    pub fn is_long_running(self) -> bool {
        matches!(self, TaskKind::Webserver | TaskKind::Watch)
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A task invocable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskName {
    Leaf(TaskKind),
    Build,
    Dev,
    Default,
}

impl TaskName {
    /// Every invocable name, leaves first
    pub fn all() -> Vec<TaskName> {
        let mut names: Vec<TaskName> = TaskKind::ALL.iter().copied().map(TaskName::Leaf).collect();
        names.extend([TaskName::Build, TaskName::Dev, TaskName::Default]);
        names
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskName::Leaf(kind) => kind.name(),
            TaskName::Build => "build",
            TaskName::Dev => "dev",
            TaskName::Default => "default",
        }
    }

    pub fn about(self) -> &'static str {
        match self {
            TaskName::Leaf(kind) => kind.about(),
            TaskName::Build => "Clean, run every transform, then revision CSS/JS",
            TaskName::Dev => "Clean and build, then serve and watch",
            TaskName::Default => "Same as dev",
        }
    }

    /// How the name decomposes into leaf units
    pub fn composition(self) -> Composition {
        let transforms = || {
            Composition::Parallel(
                TaskKind::TRANSFORMS
                    .iter()
                    .copied()
                    .map(Composition::Task)
                    .collect(),
            )
        };

        match self {
            TaskName::Leaf(kind) => Composition::Task(kind),
            TaskName::Build => Composition::Series(vec![
                Composition::Task(TaskKind::Clean),
                transforms(),
                Composition::Task(TaskKind::Revision),
                Composition::Task(TaskKind::RevisionReplace),
            ]),
            TaskName::Dev | TaskName::Default => Composition::Parallel(vec![
                Composition::Series(vec![Composition::Task(TaskKind::Clean), transforms()]),
                Composition::Task(TaskKind::Webserver),
                Composition::Task(TaskKind::Watch),
            ]),
        }
    }

    /// Whether the run only ends on Ctrl+C
    pub fn is_long_running(self) -> bool {
        match self {
            TaskName::Leaf(kind) => kind.is_long_running(),
            TaskName::Build => false,
            TaskName::Dev | TaskName::Default => true,
        }
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskName::all()
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| ConfigError::TaskNotFound(s.to_string()))
    }
}

/// Run one leaf unit, logging its start and completion
pub fn run_task(kind: TaskKind, ctx: &Context) -> ExecutionResult<()> {
    ctx.print_task_start(kind.name());
    let started = Instant::now();

    match kind {
        TaskKind::Clean => {
            if !tasks::clean::clean(ctx)? {
                ctx.print_debug("nothing to clean");
            }
        }
        TaskKind::Grid => {
            let written = tasks::grid::generate(ctx)?;
            report_outputs(ctx, kind, written.into_iter().collect());
        }
        TaskKind::Html => report_outputs(ctx, kind, tasks::html::build(ctx)?),
        TaskKind::Script => report_outputs(ctx, kind, tasks::script::build(ctx)?),
        TaskKind::Style => report_outputs(ctx, kind, tasks::style::build(ctx)?),
        TaskKind::Image => report_outputs(ctx, kind, tasks::image::build(ctx)?),
        TaskKind::Fonts => report_outputs(ctx, kind, tasks::fonts::build(ctx)?),
        TaskKind::Revision => {
            let manifest = tasks::revision::revision(ctx)?;
            ctx.print_debug(&format!("manifest holds {} entries", manifest.len()));
        }
        TaskKind::RevisionReplace => {
            let report = tasks::rewrite::revision_replace(ctx)?;
            ctx.print_debug(&format!(
                "rewrote {} reference(s) in {} page(s)",
                report.rewritten, report.pages
            ));
        }
        TaskKind::Webserver => server::serve(ctx)?,
        TaskKind::Watch => watch::watch(ctx)?,
    }

    ctx.print_task_complete(kind.name(), started.elapsed());
    Ok(())
}

fn report_outputs(ctx: &Context, kind: TaskKind, written: Vec<PathBuf>) {
    if written.is_empty() {
        ctx.print_debug(&format!("{}: no matching inputs", kind));
        return;
    }
    for path in &written {
        let shown = path.strip_prefix(&ctx.root).unwrap_or(path);
        ctx.print_debug(&format!("{}: wrote {}", kind, shown.display()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_task_names() {
        assert_eq!("build".parse::<TaskName>().unwrap(), TaskName::Build);
        assert_eq!(
            "style:build".parse::<TaskName>().unwrap(),
            TaskName::Leaf(TaskKind::Style)
        );
        assert_eq!(
            "revisionReplace".parse::<TaskName>().unwrap(),
            TaskName::Leaf(TaskKind::RevisionReplace)
        );
        assert!(matches!(
            "deploy".parse::<TaskName>(),
            Err(ConfigError::TaskNotFound(_))
        ));
    }

    #[test]
    fn test_names_round_trip() {
        for name in TaskName::all() {
            assert_eq!(name.as_str().parse::<TaskName>().unwrap(), name);
        }
    }

    #[test]
    fn test_category_mapping() {
        for category in AssetCategory::ALL {
            assert_eq!(TaskKind::for_category(category).category(), Some(category));
        }
        assert_eq!(TaskKind::Revision.category(), None);
    }

    #[test]
    fn test_long_running() {
        assert!(TaskName::Dev.is_long_running());
        assert!(TaskName::Leaf(TaskKind::Watch).is_long_running());
        assert!(!TaskName::Build.is_long_running());
        assert!(!TaskName::Leaf(TaskKind::Html).is_long_running());
    }
}
