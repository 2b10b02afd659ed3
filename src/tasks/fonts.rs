//! The `fonts:build` task

use crate::config::AssetCategory;
use crate::error::ExecutionResult;
use crate::runner::Context;
use crate::tasks::{announce, files, Inputs};
use std::path::PathBuf;

/// Copy fonts verbatim, keeping their layout below the glob base
pub fn build(ctx: &Context) -> ExecutionResult<Vec<PathBuf>> {
    let Some(inputs) = Inputs::collect(ctx, AssetCategory::Fonts)? else {
        return Ok(Vec::new());
    };

    let mut written = Vec::with_capacity(inputs.files.len());
    for font in &inputs.files {
        let target = inputs.output_for(ctx, font);
        files::copy_file(font, &target)?;
        written.push(target);
    }

    announce(ctx, AssetCategory::Fonts, &written);
    Ok(written)
}
