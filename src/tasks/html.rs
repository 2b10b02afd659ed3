//! The `html:build` task

use crate::config::AssetCategory;
use crate::error::ExecutionResult;
use crate::runner::Context;
use crate::tasks::{announce, files, include, Inputs};
use std::path::PathBuf;

/// Expand includes in every page and write it to the html build directory
pub fn build(ctx: &Context) -> ExecutionResult<Vec<PathBuf>> {
    let Some(inputs) = Inputs::collect(ctx, AssetCategory::Html)? else {
        return Ok(Vec::new());
    };

    let mut written = Vec::with_capacity(inputs.files.len());
    for page in &inputs.files {
        let html = include::expand_file(page)?;
        let target = inputs.output_for(ctx, page);
        files::write_file(&target, html)?;
        written.push(target);
    }

    announce(ctx, AssetCategory::Html, &written);
    Ok(written)
}
