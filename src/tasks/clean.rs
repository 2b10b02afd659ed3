//! The `clean` task

use crate::error::{io_at, ExecutionResult};
use crate::runner::Context;
use std::fs;
use std::io::ErrorKind;

/// Remove the configured clean directory
///
/// Returns `false` when there was nothing to remove.
pub fn clean(ctx: &Context) -> ExecutionResult<bool> {
    let target = ctx.resolve(&ctx.config.paths.clean);

    match fs::remove_dir_all(&target) {
        Ok(()) => {
            ctx.print_debug(&format!("removed {}", target.display()));
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(io_at(&target)(e)),
    }
}
