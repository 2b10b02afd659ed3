//! The `revision` task
//!
//! Built stylesheets and scripts are renamed to carry a prefix of their
//! SHA-256 digest (`main.css` -> `main-0123456789.css`) and the mapping is
//! recorded in `rev-manifest.json` in the build base directory.

use crate::config::AssetCategory;
use crate::error::{io_at, ExecutionError, ExecutionResult};
use crate::runner::Context;
use crate::tasks::files;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File name of the manifest inside the build base
pub const MANIFEST_FILE: &str = "rev-manifest.json";

/// Number of hex digest characters kept in revisioned names
pub const HASH_LEN: usize = 10;

/// Original asset path -> revisioned path, both relative to the build base
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<String, String>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a manifest; `None` when the file does not exist
    pub fn load(path: &Path) -> ExecutionResult<Option<Manifest>> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ExecutionError::io(path, e)),
        };

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| ExecutionError::Manifest {
                path: path.to_path_buf(),
                error: e.to_string(),
            })
    }

    pub fn save(&self, path: &Path) -> ExecutionResult<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| ExecutionError::Manifest {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        files::write_file(path, json + "\n")
    }

    pub fn insert(&mut self, original: impl Into<String>, revisioned: impl Into<String>) {
        self.entries.insert(original.into(), revisioned.into());
    }

    pub fn get(&self, original: &str) -> Option<&str> {
        self.entries.get(original).map(String::as_str)
    }

    /// Whether `path` is already a revisioned target
    pub fn is_target(&self, path: &str) -> bool {
        self.entries.values().any(|target| target == path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Leading hex characters of the SHA-256 digest of `content`
pub fn content_hash(content: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(content));
    digest[..HASH_LEN].to_string()
}

/// `name.ext` -> `name-<hash>.ext`
pub fn revisioned_name(file_name: &str, hash: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}-{}.{}", stem, hash, ext),
        _ => format!("{}-{}", file_name, hash),
    }
}

/// Location of the manifest for this project
pub fn manifest_path(ctx: &Context) -> PathBuf {
    ctx.resolve(&ctx.config.paths.base).join(MANIFEST_FILE)
}

/// Revision every built CSS and JS file and update the manifest
pub fn revision(ctx: &Context) -> ExecutionResult<Manifest> {
    let base = ctx.resolve(&ctx.config.paths.base);
    let path = manifest_path(ctx);
    let mut manifest = Manifest::load(&path)?.unwrap_or_default();

    let targets = [(AssetCategory::Style, "css"), (AssetCategory::Js, "js")];
    for (category, extension) in targets {
        let Some(dir) = ctx.build_dir(category) else {
            continue;
        };

        for file in files::find_by_extension(&dir, extension)? {
            let key = manifest_key(&base, &file);
            if manifest.is_target(&key) {
                continue;
            }

            let renamed = revision_file(&file)?;
            let value = manifest_key(&base, &renamed);
            ctx.print_debug(&format!("{} -> {}", key, value));
            manifest.insert(key, value);
        }
    }

    manifest.save(&path)?;
    Ok(manifest)
}

/// Rename one file to its content-hashed name
fn revision_file(file: &Path) -> ExecutionResult<PathBuf> {
    let content = fs::read(file).map_err(io_at(file))?;
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let renamed = file.with_file_name(revisioned_name(&name, &content_hash(&content)));

    if renamed.exists() {
        fs::remove_file(&renamed).map_err(io_at(&renamed))?;
    }
    fs::rename(file, &renamed).map_err(io_at(file))?;
    Ok(renamed)
}

fn manifest_key(base: &Path, file: &Path) -> String {
    match file.strip_prefix(base) {
        Ok(relative) => files::slash_path(relative),
        Err(_) => files::slash_path(file),
    }
}
