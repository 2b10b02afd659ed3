//! The `style:build` task
//!
//! Sass entry points are compiled with `grass`, then handed to
//! `lightningcss` which groups identical media queries, adds vendor
//! prefixes for the configured browsers, minifies and emits a source map.

use crate::config::{AssetCategory, BuildOptions};
use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::Context;
use crate::tasks::{announce, files, Inputs};
use lightningcss::media_query::MediaList;
use lightningcss::rules::{media::MediaRule, CssRule};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use lightningcss::traits::ToCss;
use parcel_sourcemap::SourceMap;
use regex::Regex;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

// matches both `(min-width: 960px)` and the range form `(width >= 960px)`
static WIDTH_FEATURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\((?:(min|max)-width:\s*|width\s*([<>]=?)\s*)(-?[\d.]+)").unwrap()
});

/// A finished stylesheet
#[derive(Debug, Clone)]
pub struct Stylesheet {
    pub code: String,
    pub map: Option<String>,
}

/// Compile every non-partial entry point
pub fn build(ctx: &Context) -> ExecutionResult<Vec<PathBuf>> {
    let Some(inputs) = Inputs::collect(ctx, AssetCategory::Style)? else {
        return Ok(Vec::new());
    };

    let options = &ctx.config.options;
    let mut written = Vec::new();

    for entry in inputs.files.iter().filter(|path| !is_partial(path)) {
        let stylesheet = compile(entry, options)?;

        let css_name = format!(
            "{}.css",
            entry.file_stem().unwrap_or_default().to_string_lossy()
        );
        let target = inputs.output_for(ctx, entry).with_file_name(&css_name);

        match stylesheet.map {
            Some(map) => {
                let map_name = format!("{}.map", css_name);
                let code = format!("{}\n/*# sourceMappingURL={} */\n", stylesheet.code, map_name);
                files::write_file(&target, code)?;
                let map_path = target.with_file_name(map_name);
                files::write_file(&map_path, map)?;
                written.push(target);
                written.push(map_path);
            }
            None => {
                files::write_file(&target, stylesheet.code)?;
                written.push(target);
            }
        }
    }

    announce(ctx, AssetCategory::Style, &written);
    Ok(written)
}

/// Sass partials (`_name.scss`) are only compiled through an entry point
fn is_partial(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('_'))
}

/// Compile a Sass entry point to finished CSS
pub fn compile(entry: &Path, options: &BuildOptions) -> ExecutionResult<Stylesheet> {
    let style_error = |error: String| ExecutionError::Style {
        path: entry.to_path_buf(),
        error,
    };

    let mut sass_options = grass::Options::default().style(grass::OutputStyle::Expanded);
    if let Some(dir) = entry.parent() {
        sass_options = sass_options.load_path(dir);
    }
    let expanded = grass::from_path(entry, &sass_options).map_err(|e| style_error(e.to_string()))?;

    let filename = entry
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    postprocess(&expanded, &filename, options).map_err(style_error)
}

/// Group media queries, prefix, minify and map plain CSS
pub fn postprocess(
    css: &str,
    filename: &str,
    options: &BuildOptions,
) -> Result<Stylesheet, String> {
    let mut sheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: filename.to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| e.to_string())?;

    group_media_queries(&mut sheet)?;

    let browsers = Browsers::from_browserslist(&options.browsers).map_err(|e| e.to_string())?;
    let targets = Targets {
        browsers,
        ..Targets::default()
    };

    sheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| e.to_string())?;

    let mut source_map = if options.source_maps {
        let mut map = SourceMap::new("/");
        let index = map.add_source(filename);
        map.set_source_content(index as usize, css)
            .map_err(|e| e.to_string())?;
        Some(map)
    } else {
        None
    };

    let result = sheet
        .to_css(PrinterOptions {
            minify: true,
            source_map: source_map.as_mut(),
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;

    let map = match source_map.as_mut() {
        Some(map) => Some(map.to_json(None).map_err(|e| e.to_string())?),
        None => None,
    };

    Ok(Stylesheet {
        code: result.code,
        map,
    })
}

/// Merge `@media` blocks sharing a query and move them to the end
///
/// `min-width` queries come first in ascending order, then `max-width`
/// queries in descending order; other queries keep their relative order
/// ahead of both.
fn group_media_queries(sheet: &mut StyleSheet) -> Result<(), String> {
    let rules = std::mem::take(&mut sheet.rules.0);
    let mut kept = Vec::with_capacity(rules.len());
    let mut groups: Vec<(String, MediaRule)> = Vec::new();

    for rule in rules {
        match rule {
            CssRule::Media(media) => {
                let key = media_key(&media.query)?;
                match groups.iter_mut().find(|(existing, _)| *existing == key) {
                    Some((_, group)) => group.rules.0.extend(media.rules.0),
                    None => groups.push((key, media)),
                }
            }
            other => kept.push(other),
        }
    }

    groups.sort_by(|(a, _), (b, _)| compare_queries(a, b));
    kept.extend(groups.into_iter().map(|(_, media)| CssRule::Media(media)));
    sheet.rules.0 = kept;
    Ok(())
}

fn media_key(query: &MediaList) -> Result<String, String> {
    query
        .to_css_string(PrinterOptions::default())
        .map_err(|e| e.to_string())
}

fn compare_queries(a: &str, b: &str) -> Ordering {
    let rank = |query: &str| match WIDTH_FEATURE_RE.captures(query) {
        Some(caps) => {
            let width: f64 = caps[3].parse().unwrap_or(0.0);
            let lower_bound = caps.get(1).is_some_and(|m| m.as_str() == "min")
                || caps.get(2).is_some_and(|m| m.as_str().starts_with('>'));
            if lower_bound {
                (1, width)
            } else {
                (2, -width)
            }
        }
        None => (0, 0.0),
    };

    let (rank_a, width_a) = rank(a);
    let (rank_b, width_b) = rank(b);
    rank_a.cmp(&rank_b).then(width_a.total_cmp(&width_b))
}
