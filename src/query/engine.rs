use crate::index::RepoIndex;
use crate::index::types::trigram_to_bytes;
use crate::utils::query_trigrams;
use crossbeam_channel::{Receiver, bounded};
use std::time::Instant;

/// Candidate paths produced by one query.
///
/// Finite and non-restartable. Every worker has finished before the value is
/// handed out, so iterating never blocks. Order is unspecified.
pub struct Candidates {
    rx: Receiver<String>,
}

impl Iterator for Candidates {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        // All senders are gone: recv drains what is buffered, then reports disconnect
        self.rx.recv().ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.rx.len();
        (n, Some(n))
    }
}

impl ExactSizeIterator for Candidates {}

impl RepoIndex {
    /// Paths whose filter may contain every trigram of `query`.
    ///
    /// Never misses a file that literally contains the query, but may include
    /// files that do not (filter false positives, or trigrams present out of
    /// order). A query shorter than three bytes has no trigrams to test, so
    /// every blob is returned, including the ones built without a filter.
    pub fn paths_matching_query(&self, query: &[u8]) -> Candidates {
        let started = Instant::now();
        let trigrams = query_trigrams(query);

        // Room for every blob: workers never wait on the reader
        let (tx, rx) = bounded(self.blobs.len().max(1));

        if trigrams.is_empty() {
            for blob in &self.blobs {
                let _ = tx.send(blob.path.clone());
            }
            drop(tx);
            tracing::debug!(blobs = self.blobs.len(), "query has no trigrams, every blob is a candidate");
            return Candidates { rx };
        }

        rayon::scope(|scope| {
            for batch in self.blobs.chunks(self.batch_size) {
                let tx = tx.clone();
                let trigrams = &trigrams;
                scope.spawn(move |_| {
                    for blob in batch {
                        if blob.may_contain_all(trigrams) {
                            let _ = tx.send(blob.path.clone());
                        }
                    }
                });
            }
        });
        drop(tx);

        tracing::debug!(
            trigrams = ?trigrams
                .iter()
                .map(|&t| String::from_utf8_lossy(&trigram_to_bytes(t)).into_owned())
                .collect::<Vec<_>>(),
            batches = self.batch_count(),
            candidates = rx.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "query evaluated"
        );

        Candidates { rx }
    }

    /// Number of workers a query spawns
    pub fn batch_count(&self) -> usize {
        self.blobs.len().div_ceil(self.batch_size)
    }
}
