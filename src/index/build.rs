use crate::fs::FileSystem;
use crate::index::types::{Blob, DEFAULT_BATCH_SIZE, IndexConfig, IndexStats};
use crate::utils::progress::build_bar;
use crate::utils::{BloomFilter, extract_trigrams, is_binary};
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::time::Instant;

/// Every blob of one filesystem snapshot.
///
/// Built once from a full walk, then read-only: queries share it across
/// worker threads without locking.
#[derive(Debug, Clone, PartialEq)]
pub struct RepoIndex {
    pub(crate) blobs: Vec<Blob>,
    pub(crate) batch_size: usize,
    /// [`IndexConfig::fingerprint`] of the settings the blobs were built with
    pub(crate) config_fingerprint: u32,
}

impl RepoIndex {
    /// Index every file of `fs`.
    ///
    /// Fails if the listing or any single read fails; a partial index would
    /// turn unread files into silent false negatives.
    pub fn build(fs: &dyn FileSystem, config: &IndexConfig) -> Result<Self> {
        Self::build_with_progress(fs, config, true)
    }

    /// Same as [`build`](Self::build), drawing a progress bar unless `silent`
    pub fn build_with_progress(
        fs: &dyn FileSystem,
        config: &IndexConfig,
        silent: bool,
    ) -> Result<Self> {
        let started = Instant::now();
        let names = fs
            .list_relative_filenames()
            .with_context(|| format!("Failed to list files under {}", fs.root_dir()))?;

        let progress = build_bar(names.len() as u64, silent);
        if let Some(pb) = &progress {
            pb.set_message("Indexing files...");
        }

        // Indexed parallel iterators keep listing order through collect
        let blobs = names
            .into_par_iter()
            .map(|name| -> Result<Blob> {
                let content = fs
                    .read_relative_filename(&name)
                    .with_context(|| format!("Failed to read {} while indexing", name))?;
                let blob = blob_from_content(name, &content, config);
                if let Some(pb) = &progress {
                    pb.inc(1);
                }
                Ok(blob)
            })
            .collect::<Result<Vec<Blob>>>()?;

        let mut index = Self::from_blobs(blobs).with_batch_size(config.effective_batch_size());
        index.config_fingerprint = config.fingerprint();
        let stats = index.stats();

        if let Some(pb) = progress {
            pb.finish_with_message(format!("Indexed {} files", stats.blobs));
        }
        tracing::info!(
            root = fs.root_dir(),
            blobs = stats.blobs,
            skipped = stats.skipped,
            filter_bytes = stats.filter_bytes,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "index built"
        );

        Ok(index)
    }

    /// Wrap already-built blobs, keeping their order.
    /// They are assumed to follow the default [`IndexConfig`].
    pub fn from_blobs(blobs: Vec<Blob>) -> Self {
        Self {
            blobs,
            batch_size: DEFAULT_BATCH_SIZE,
            config_fingerprint: IndexConfig::default().fingerprint(),
        }
    }

    /// Override how many blobs each query worker tests (0 is treated as 1)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn config_fingerprint(&self) -> u32 {
        self.config_fingerprint
    }

    pub fn blobs(&self) -> &[Blob] {
        &self.blobs
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn stats(&self) -> IndexStats {
        let mut stats = IndexStats {
            blobs: self.blobs.len(),
            ..IndexStats::default()
        };
        for blob in &self.blobs {
            match &blob.filter {
                Some(filter) => {
                    stats.filtered += 1;
                    stats.filter_bytes += filter.bits().len() * 8;
                }
                None => stats.skipped += 1,
            }
        }
        stats
    }
}

/// Turn one file's content into a blob, skipping content not worth filtering
fn blob_from_content(path: String, content: &[u8], config: &IndexConfig) -> Blob {
    if content.len() as u64 > config.max_file_size {
        tracing::debug!(path = %path, size = content.len(), "over size limit, no filter");
        return Blob::new(path, None);
    }
    if is_binary(content) {
        tracing::debug!(path = %path, "binary content, no filter");
        return Blob::new(path, None);
    }

    let trigrams = extract_trigrams(content);
    let filter = BloomFilter::from_trigrams(&trigrams, config.false_positive_rate);
    Blob::new(path, Some(filter))
}
