//! Textual include expansion
//!
//! Two directive forms are recognised:
//!
//! - `@@include('path')`, optionally wrapped in an HTML comment
//! - a line of the form `//= path`, used by scripts
//!
//! Paths resolve relative to the file containing the directive. Expansion is
//! recursive; a file that (transitively) includes itself is an error.

use crate::error::{ExecutionError, ExecutionResult};
use crate::tasks::files;
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static INCLUDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)(?:<!--[ \t]*)?@@include\(\s*['"]([^'"]+)['"]\s*\)(?:[ \t]*-->)?|^[ \t]*//=[ \t]*(\S+)[ \t]*$"#,
    )
    .unwrap()
});

/// Read `path` and expand every include directive in it
pub fn expand_file(path: &Path) -> ExecutionResult<String> {
    let mut stack = Vec::new();
    expand_inner(path, &mut stack)
}

fn expand_inner(path: &Path, stack: &mut Vec<PathBuf>) -> ExecutionResult<String> {
    let key = canonical(path);
    if stack.contains(&key) {
        let chain = stack
            .iter()
            .chain(std::iter::once(&key))
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(" -> ");
        return Err(ExecutionError::IncludeCycle(chain));
    }

    let source = files::read_text(path)?;
    stack.push(key);
    let expanded = expand_text(&source, path, stack)?;
    stack.pop();
    Ok(expanded)
}

fn expand_text(source: &str, path: &Path, stack: &mut Vec<PathBuf>) -> ExecutionResult<String> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut output = String::with_capacity(source.len());
    let mut last = 0;

    for caps in INCLUDE_RE.captures_iter(source) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        output.push_str(&source[last..whole.start]);
        last = whole.end;

        let target = dir.join(directive_target(&caps));
        if !target.is_file() {
            return Err(ExecutionError::IncludeNotFound {
                target,
                from: path.to_path_buf(),
            });
        }

        let included = expand_inner(&target, stack)?;
        output.push_str(included.strip_suffix('\n').unwrap_or(&included));
    }

    output.push_str(&source[last..]);
    Ok(output)
}

fn directive_target<'a>(caps: &'a Captures<'_>) -> &'a str {
    caps.get(1)
        .or_else(|| caps.get(2))
        .map_or("", |m| m.as_str())
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_html_include() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "partials/h.html", "<h1>Hi</h1>\n");
        let page = write(
            dir.path(),
            "index.html",
            "<body>@@include('partials/h.html')</body>\n",
        );

        assert_eq!(expand_file(&page).unwrap(), "<body><h1>Hi</h1></body>\n");
    }

    #[test]
    fn test_commented_include_is_replaced_whole() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "nav.html", "<nav></nav>");
        let page = write(dir.path(), "index.html", "<!-- @@include(\"nav.html\") -->");

        assert_eq!(expand_file(&page).unwrap(), "<nav></nav>");
    }

    #[test]
    fn test_nested_includes_resolve_relative_to_includer() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "parts/inner.html", "inner");
        write(dir.path(), "parts/outer.html", "[@@include('inner.html')]");
        let page = write(dir.path(), "index.html", "@@include('parts/outer.html')");

        assert_eq!(expand_file(&page).unwrap(), "[inner]");
    }

    #[test]
    fn test_script_directive() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "lib/util.js", "function util() {}\n");
        let main = write(dir.path(), "main.js", "//= lib/util.js\nutil();\n");

        assert_eq!(expand_file(&main).unwrap(), "function util() {}\nutil();\n");
    }

    #[test]
    fn test_comment_lines_are_not_directives() {
        let dir = TempDir::new().unwrap();
        let main = write(dir.path(), "main.js", "// = not a directive\nlet a = 1; //= nope\n");
        assert_eq!(
            expand_file(&main).unwrap(),
            "// = not a directive\nlet a = 1; //= nope\n"
        );
    }

    #[test]
    fn test_missing_include() {
        let dir = TempDir::new().unwrap();
        let page = write(dir.path(), "index.html", "@@include('gone.html')");

        match expand_file(&page) {
            Err(ExecutionError::IncludeNotFound { target, from }) => {
                assert!(target.ends_with("gone.html"));
                assert_eq!(from, page);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_include_cycle() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.html", "@@include('b.html')");
        write(dir.path(), "b.html", "@@include('a.html')");

        let result = expand_file(&dir.path().join("a.html"));
        assert!(matches!(result, Err(ExecutionError::IncludeCycle(_))));
    }

    #[test]
    fn test_same_file_twice_is_not_a_cycle() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "x.html", "x");
        let page = write(dir.path(), "index.html", "@@include('x.html')@@include('x.html')");

        assert_eq!(expand_file(&page).unwrap(), "xx");
    }
}
