//! File selection and output helpers shared by the transforms

use crate::error::{io_at, ExecutionError, ExecutionResult};
use std::fs;
use std::path::{Component, Path, PathBuf};

const GLOB_CHARS: [char; 4] = ['*', '?', '[', '{'];

/// Expand a root-relative glob into a sorted list of files
///
/// Directories are skipped. A pattern matching nothing yields an empty list.
pub fn expand(root: &Path, pattern: &str) -> ExecutionResult<Vec<PathBuf>> {
    let full = format!(
        "{}/{}",
        glob::Pattern::escape(&root.to_string_lossy()),
        pattern.trim_start_matches("./")
    );

    let entries = glob::glob(&full).map_err(|e| ExecutionError::Glob {
        pattern: pattern.to_string(),
        error: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            ExecutionError::io(path, e.into())
        })?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// The literal directory prefix of a glob
///
/// `src/img/**/*.*` -> `src/img`; a pattern without wildcards yields its
/// parent directory.
pub fn glob_base(pattern: &str) -> PathBuf {
    let path = Path::new(pattern.trim_start_matches("./"));
    let mut base = PathBuf::new();
    let mut literal = true;

    for component in path.components() {
        let text = component.as_os_str().to_string_lossy();
        if text.contains(GLOB_CHARS) {
            literal = false;
            break;
        }
        base.push(component);
    }

    if literal {
        base.pop();
    }
    base
}

/// Output path for `input`, keeping its location relative to the glob base
pub fn output_path(root: &Path, pattern: &str, input: &Path, out_dir: &Path) -> PathBuf {
    let base = root.join(glob_base(pattern));
    match input.strip_prefix(&base) {
        Ok(relative) => out_dir.join(relative),
        Err(_) => out_dir.join(input.file_name().unwrap_or_default()),
    }
}

/// Write `contents`, creating parent directories first
pub fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> ExecutionResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_at(parent))?;
    }
    fs::write(path, contents).map_err(io_at(path))
}

/// Copy a file, creating parent directories first
pub fn copy_file(from: &Path, to: &Path) -> ExecutionResult<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(io_at(parent))?;
    }
    fs::copy(from, to).map_err(io_at(from))?;
    Ok(())
}

/// Read a file as UTF-8 text
pub fn read_text(path: &Path) -> ExecutionResult<String> {
    fs::read_to_string(path).map_err(io_at(path))
}

/// Recursively collect files under `dir` with the given extension, sorted
pub fn find_by_extension(dir: &Path, extension: &str) -> ExecutionResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    if dir.is_dir() {
        collect(dir, extension, &mut found)?;
    }
    found.sort();
    Ok(found)
}

fn collect(dir: &Path, extension: &str, found: &mut Vec<PathBuf>) -> ExecutionResult<()> {
    for entry in fs::read_dir(dir).map_err(io_at(dir))? {
        let path = entry.map_err(io_at(dir))?.path();
        if path.is_dir() {
            collect(&path, extension, found)?;
        } else if path.extension().is_some_and(|ext| ext == extension) {
            found.push(path);
        }
    }
    Ok(())
}

/// Forward-slash form of a relative path, used for manifest keys and URLs
pub fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
