use super::FileSystem;
use anyhow::{Result, anyhow};
use std::collections::BTreeMap;

/// In-memory file tree, listed in path order
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    root: String,
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self {
            root: "memory://".to_string(),
            files: BTreeMap::new(),
        }
    }

    /// Add or replace a file
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), content.into());
    }

    /// Remove a file, returning its content
    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        self.files.remove(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl<P, C> FromIterator<(P, C)> for MemoryFileSystem
where
    P: Into<String>,
    C: Into<Vec<u8>>,
{
    fn from_iter<I: IntoIterator<Item = (P, C)>>(iter: I) -> Self {
        let mut fs = Self::new();
        for (path, content) in iter {
            fs.insert(path, content);
        }
        fs
    }
}

impl FileSystem for MemoryFileSystem {
    fn list_relative_filenames(&self) -> Result<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }

    fn read_relative_filename(&self, name: &str) -> Result<Vec<u8>> {
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("no such file: {}", name))
    }

    fn root_dir(&self) -> &str {
        &self.root
    }
}
