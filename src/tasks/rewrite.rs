//! The `revisionReplace` task
//!
//! Points `href`/`src` attributes of built pages at the revisioned asset
//! names recorded in the manifest. References are resolved relative to the
//! page, so `css/main.css`, `./css/main.css` and `/css/main.css` all match
//! the manifest key `css/main.css`.

use crate::config::AssetCategory;
use crate::error::ExecutionResult;
use crate::runner::Context;
use crate::tasks::files;
use crate::tasks::revision::{manifest_path, Manifest};
use regex::{Captures, Regex};
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

static ATTRIBUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(\b(?:href|src)\s*=\s*)(["'])([^"']*)(["'])"#).unwrap()
});

/// Summary of one rewrite pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteReport {
    /// Pages that were modified
    pub pages: usize,
    /// References replaced
    pub rewritten: usize,
    /// Local CSS/JS references with no manifest entry, as written in the page
    pub unmapped: Vec<String>,
}

/// Rewrite every built page against the manifest
pub fn revision_replace(ctx: &Context) -> ExecutionResult<RewriteReport> {
    let path = manifest_path(ctx);
    let Some(manifest) = Manifest::load(&path)? else {
        ctx.print_warn(&format!(
            "{} not found, pages left unchanged",
            path.display()
        ));
        return Ok(RewriteReport::default());
    };

    let Some(html_dir) = ctx.build_dir(AssetCategory::Html) else {
        return Ok(RewriteReport::default());
    };
    let base = ctx.resolve(&ctx.config.paths.base);

    let mut report = RewriteReport::default();
    for page in files::find_by_extension(&html_dir, "html")? {
        let html = files::read_text(&page)?;
        let page_dir = page.parent().unwrap_or(&html_dir);
        let page_dir = page_dir.strip_prefix(&base).unwrap_or(Path::new(""));

        let (rewritten, count, unmapped) = rewrite_html(&html, page_dir, &manifest);
        for reference in &unmapped {
            ctx.print_warn(&format!(
                "{}: no manifest entry for '{}'",
                page.display(),
                reference
            ));
        }
        report.unmapped.extend(unmapped);

        if count > 0 {
            files::write_file(&page, rewritten)?;
            report.pages += 1;
            report.rewritten += count;
        }
    }

    Ok(report)
}

/// Rewrite references in one page
///
/// `page_dir` is the page's directory relative to the build base. Returns
/// the new text, the number of replaced references and the unmapped ones.
pub fn rewrite_html(html: &str, page_dir: &Path, manifest: &Manifest) -> (String, usize, Vec<String>) {
    let mut count = 0;
    let mut unmapped = Vec::new();

    let output = ATTRIBUTE_RE.replace_all(html, |caps: &Captures| {
        let value = &caps[3];
        match rewrite_reference(value, page_dir, manifest) {
            Reference::Rewritten(new_value) => {
                count += 1;
                format!("{}{}{}{}", &caps[1], &caps[2], new_value, &caps[4])
            }
            Reference::Unmapped => {
                unmapped.push(value.to_string());
                caps[0].to_string()
            }
            Reference::Unchanged => caps[0].to_string(),
        }
    });

    (output.into_owned(), count, unmapped)
}

enum Reference {
    Rewritten(String),
    Unmapped,
    Unchanged,
}

fn rewrite_reference(value: &str, page_dir: &Path, manifest: &Manifest) -> Reference {
    if is_external(value) {
        return Reference::Unchanged;
    }

    let end = value.find(['?', '#']).unwrap_or(value.len());
    let (path, suffix) = value.split_at(end);
    let Some(key) = manifest_key(path, page_dir) else {
        return Reference::Unchanged;
    };

    if let Some(target) = manifest.get(&key) {
        let new_name = target.rsplit('/').next().unwrap_or(target);
        let prefix = match path.rfind('/') {
            Some(slash) => &path[..=slash],
            None => "",
        };
        return Reference::Rewritten(format!("{}{}{}", prefix, new_name, suffix));
    }

    if manifest.is_target(&key) {
        return Reference::Unchanged;
    }

    if key.ends_with(".css") || key.ends_with(".js") {
        Reference::Unmapped
    } else {
        Reference::Unchanged
    }
}

fn is_external(value: &str) -> bool {
    let lower = value.trim().to_ascii_lowercase();
    lower.is_empty()
        || lower.contains("://")
        || lower.starts_with("//")
        || lower.starts_with('#')
        || lower.starts_with("data:")
        || lower.starts_with("mailto:")
        || lower.starts_with("javascript:")
}

/// Manifest key a reference resolves to, or `None` if it leaves the base
fn manifest_key(reference: &str, page_dir: &Path) -> Option<String> {
    let (start, relative) = match reference.strip_prefix('/') {
        Some(rooted) => (PathBuf::new(), rooted),
        None => (page_dir.to_path_buf(), reference),
    };

    let mut resolved = start;
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::ParentDir => {
                if !resolved.pop() {
                    return None;
                }
            }
            _ => {}
        }
    }

    let key = files::slash_path(&resolved);
    (!key.is_empty()).then_some(key)
}
