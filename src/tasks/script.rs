//! The `js:build` task
//!
//! Every input is include-expanded on its own, then the results are joined
//! in path order into a single bundle which is transpiled down to the
//! configured ECMAScript target, minified and given a source map.

use crate::config::AssetCategory;
use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::Context;
use crate::tasks::{announce, files, include, Inputs};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, CompressOptionsUnused, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::semantic::SemanticBuilder;
use oxc::span::SourceType;
use oxc::transformer::{TransformOptions, Transformer};
use std::path::{Path, PathBuf};

/// Output of [`compile`]
#[derive(Debug, Clone)]
pub struct Bundle {
    pub code: String,
    /// Source map JSON, when requested
    pub map: Option<String>,
}

/// Build the script bundle
pub fn build(ctx: &Context) -> ExecutionResult<Vec<PathBuf>> {
    let Some(inputs) = Inputs::collect(ctx, AssetCategory::Js)? else {
        return Ok(Vec::new());
    };
    if inputs.files.is_empty() {
        return Ok(Vec::new());
    }

    let options = &ctx.config.options;
    let source = concatenate(&inputs.files)?;
    let bundle = compile(&source, &options.bundle, &options.script_target, options.source_maps)?;

    let target = inputs.out_dir.join(&options.bundle);
    let mut written = Vec::with_capacity(2);

    match bundle.map {
        Some(map) => {
            let map_name = format!("{}.map", options.bundle);
            let code = format!("{}\n//# sourceMappingURL={}\n", bundle.code.trim_end(), map_name);
            files::write_file(&target, code)?;
            let map_path = inputs.out_dir.join(map_name);
            files::write_file(&map_path, map)?;
            written.push(target);
            written.push(map_path);
        }
        None => {
            files::write_file(&target, bundle.code)?;
            written.push(target);
        }
    }

    ctx.print_debug(&format!("bundled {} script(s)", inputs.files.len()));
    announce(ctx, AssetCategory::Js, &written);
    Ok(written)
}

/// Expand includes in each file and join the results
pub fn concatenate(inputs: &[PathBuf]) -> ExecutionResult<String> {
    let mut parts = Vec::with_capacity(inputs.len());
    for input in inputs {
        let expanded = include::expand_file(input)?;
        parts.push(expanded.trim_end_matches('\n').to_string());
    }
    Ok(parts.join("\n"))
}

/// Transpile and minify one bundle
pub fn compile(
    source: &str,
    bundle_name: &str,
    target: &str,
    source_map: bool,
) -> ExecutionResult<Bundle> {
    let allocator = Allocator::default();
    // classic script: top-level declarations are page globals
    let ret = Parser::new(&allocator, source, SourceType::script()).parse();
    if let Some(error) = ret.errors.first() {
        return Err(ExecutionError::Script(format!("{}: {}", bundle_name, error)));
    }
    let mut program = ret.program;

    let transform_options = TransformOptions::from_target(target)
        .map_err(|e| ExecutionError::Script(format!("target '{}': {}", target, e)))?;
    let scoping = SemanticBuilder::new()
        .build(&program)
        .semantic
        .into_scoping();
    let transformed = Transformer::new(&allocator, Path::new(bundle_name), &transform_options)
        .build_with_scoping(scoping, &mut program);
    if let Some(error) = transformed.errors.first() {
        return Err(ExecutionError::Script(format!("{}: {}", bundle_name, error)));
    }

    let options = MinifierOptions {
        mangle: Some(MangleOptions {
            top_level: Some(false),
            ..MangleOptions::default()
        }),
        compress: Some(CompressOptions {
            unused: CompressOptionsUnused::KeepAssign,
            ..CompressOptions::smallest()
        }),
    };
    let minified = Minifier::new(options).minify(&allocator, &mut program);

    let output = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            source_map_path: source_map.then(|| PathBuf::from(bundle_name)),
            ..CodegenOptions::default()
        })
        .with_scoping(minified.scoping)
        .build(&program);

    Ok(Bundle {
        code: output.code,
        map: output.map.map(|map| map.to_json_string()),
    })
}
