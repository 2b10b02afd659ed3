//! Entry point for running a named task

use crate::error::SprocketError;
use crate::runner::{run_task, Context, Executor, RunReport, TaskGraph, TaskKind, TaskName};
use crate::ui;

/// Run `name` with all of its composed units
///
/// The grid partial is generated first when enabled, so stylesheets that
/// import it compile on a fresh checkout.
pub fn execute(name: TaskName, ctx: &Context) -> Result<RunReport, SprocketError> {
    if ctx.config.grid.enabled && name != TaskName::Leaf(TaskKind::Grid) {
        run_task(TaskKind::Grid, ctx)?;
    }

    let graph = TaskGraph::from_composition(&name.composition());
    ctx.print_debug(&format!("{} lowers to {} unit(s)", ui::task(name.as_str()), graph.len()));

    let report = Executor::new(ctx).run(&graph, |kind| run_task(kind, ctx));
    summarize(ctx, name, &report);

    Ok(report.into_result()?)
}

fn summarize(ctx: &Context, name: TaskName, report: &RunReport) {
    if report.is_success() {
        ctx.print_info(&format!("{} completed", ui::task(name.as_str())));
        return;
    }

    let names = |tasks: Vec<TaskKind>| {
        tasks
            .iter()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join(", ")
    };
    ctx.print_error(&format!("failed: {}", names(report.failed())));
    let skipped = report.skipped();
    if !skipped.is_empty() {
        ctx.print_warn(&format!("skipped: {}", names(skipped)));
    }
}
