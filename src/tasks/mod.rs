//! Leaf tasks of the pipeline
//!
//! Every transform reads its inputs by glob, writes into its category's
//! build directory and announces the change to live-reload listeners.

pub mod clean;
pub mod files;
pub mod fonts;
pub mod grid;
pub mod html;
pub mod image;
pub mod include;
pub mod revision;
pub mod rewrite;
pub mod script;
pub mod style;

use crate::config::AssetCategory;
use crate::error::ExecutionResult;
use crate::runner::Context;
use crate::server::ReloadEvent;
use std::path::PathBuf;

/// Resolved input set of one transform
#[derive(Debug, Clone)]
pub struct Inputs {
    /// Source glob, relative to the project root
    pub pattern: String,
    /// Matching files, sorted
    pub files: Vec<PathBuf>,
    /// Absolute output directory
    pub out_dir: PathBuf,
}

impl Inputs {
    /// Collect the inputs of `category`
    ///
    /// `None` when the category has no source glob or no build directory.
    pub fn collect(ctx: &Context, category: AssetCategory) -> ExecutionResult<Option<Inputs>> {
        let paths = ctx.paths(category);
        let (Some(pattern), Some(out_dir)) = (paths.src.clone(), ctx.build_dir(category)) else {
            return Ok(None);
        };

        let files = files::expand(&ctx.root, &pattern)?;
        Ok(Some(Inputs {
            pattern,
            files,
            out_dir,
        }))
    }

    /// Where `input` lands in the output directory
    pub fn output_for(&self, ctx: &Context, input: &std::path::Path) -> PathBuf {
        files::output_path(&ctx.root, &self.pattern, input, &self.out_dir)
    }
}

/// Tell live-reload listeners that `category` produced new output
pub(crate) fn announce(ctx: &Context, category: AssetCategory, written: &[PathBuf]) {
    if written.is_empty() {
        return;
    }

    let event = match category {
        AssetCategory::Style => ReloadEvent::Css,
        other => ReloadEvent::Reload {
            source: other.key().to_string(),
        },
    };
    let delivered = ctx.reload.publish(&event);
    if delivered > 0 {
        ctx.print_debug(&format!("reload sent to {} listener(s)", delivered));
    }
}
