use super::FileSystem;
use crate::index::types::IndexConfig;
use anyhow::{Context, Result, bail};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Directories never worth indexing, whatever the ignore files say
const SKIPPED_DIRS: &[&str] = &[".git", "node_modules", "target", "__pycache__", ".venv", "venv"];

/// Working tree on disk.
///
/// Walks the root honoring `.gitignore`, global git excludes and
/// `.git/info/exclude`, skips hidden entries, and drops anything matching the
/// configured `ignored_paths` globs.
pub struct WalkFileSystem {
    root: PathBuf,
    root_display: String,
    excludes: GlobSet,
}

impl WalkFileSystem {
    pub fn new(root: impl AsRef<Path>, config: &IndexConfig) -> Result<Self> {
        let root = root
            .as_ref()
            .canonicalize()
            .with_context(|| format!("Invalid path: {}", root.as_ref().display()))?;
        if !root.is_dir() {
            bail!("Not a directory: {}", root.display());
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in &config.ignored_paths {
            let glob = Glob::new(pattern)
                .with_context(|| format!("Invalid ignore pattern: {}", pattern))?;
            builder.add(glob);
        }
        let excludes = builder.build().context("Failed to compile ignore patterns")?;

        Ok(Self {
            root_display: root.display().to_string(),
            root,
            excludes,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileSystem for WalkFileSystem {
    fn list_relative_filenames(&self) -> Result<Vec<String>> {
        let walker = WalkBuilder::new(&self.root)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .require_git(false)
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                !SKIPPED_DIRS.contains(&name.as_ref())
            })
            .build();

        let mut names = Vec::new();
        for entry in walker {
            let entry = entry.with_context(|| format!("Failed to walk {}", self.root_display))?;
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let rel = entry
                .path()
                .strip_prefix(&self.root)
                .with_context(|| format!("{} escapes the root", entry.path().display()))?;

            let Some(name) = to_slash_path(rel) else {
                tracing::warn!(path = %rel.display(), "skipping non UTF-8 path");
                continue;
            };

            if self.excludes.is_match(&name) {
                tracing::debug!(path = %name, "excluded by ignore pattern");
                continue;
            }

            names.push(name);
        }

        names.sort_unstable();
        Ok(names)
    }

    fn read_relative_filename(&self, name: &str) -> Result<Vec<u8>> {
        let rel = Path::new(name);
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            bail!("refusing to read {}: not a plain relative path", name);
        }
        let path = self.root.join(rel);
        fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))
    }

    fn root_dir(&self) -> &str {
        &self.root_display
    }
}

/// Join path components with `/` regardless of platform
fn to_slash_path(path: &Path) -> Option<String> {
    let parts: Option<Vec<&str>> = path
        .components()
        .map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();
    Some(parts?.join("/"))
}
