//! Exact verification of query candidates.
//!
//! The filter stage only proves that every trigram of the query may occur in
//! a file. Here each candidate is re-read and scanned line by line for the
//! literal query; candidates without a single hit were filter false
//! positives and disappear.

use crate::fs::FileSystem;
use crate::index::RepoIndex;
use crate::output::HitPrinter;
use memchr::memchr;
use memchr::memmem::Finder;
use rayon::prelude::*;
use std::convert::Infallible;
use std::io;

/// One verified occurrence of the query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrepHit {
    pub path: String,
    /// 1-based line number
    pub line_number: usize,
    /// 0-based byte offset of the first occurrence within the line
    pub column: usize,
    /// Line content without its `\n`
    pub line: Vec<u8>,
    /// Length of the highlighted match in bytes
    pub match_len: usize,
}

impl GrepHit {
    /// The line split around the match: (before, match, after)
    pub fn split(&self) -> (&[u8], &[u8], &[u8]) {
        let start = self.column.min(self.line.len());
        let end = (self.column + self.match_len).min(self.line.len());
        (&self.line[..start], &self.line[start..end], &self.line[end..])
    }
}

/// Counters describing one grep run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrepSummary {
    /// Paths returned by the filter stage
    pub candidates: usize,
    /// Candidates with at least one verified hit
    pub files_matched: usize,
    pub hits: usize,
    /// Candidates read successfully but without any hit
    pub false_positives: usize,
    /// Candidates that could not be read and were skipped
    pub unreadable: usize,
}

/// Candidates read and scanned together before their hits are handed on
const VERIFY_CHUNK: usize = 64;

/// Outcome of verifying a single candidate
enum Verified {
    Hits(Vec<GrepHit>),
    Unreadable,
}

impl RepoIndex {
    /// Verify the candidates of `query` against `fs` and print every hit.
    ///
    /// Hits come out sorted by path, then line. Candidates are verified a
    /// chunk at a time and each chunk is printed before the next is read. The
    /// only error is a failure of the printer itself, which stops the run;
    /// unreadable files are logged and skipped.
    pub fn grep(
        &self,
        fs: &dyn FileSystem,
        query: &[u8],
        printer: &mut dyn HitPrinter,
    ) -> io::Result<GrepSummary> {
        let summary = self.verify_candidates(fs, query, |hits| -> io::Result<()> {
            for hit in &hits {
                printer.print_hit(hit)?;
            }
            Ok(())
        })?;
        printer.finish()?;
        Ok(summary)
    }

    /// Verified hits of `query`, without printing
    pub fn grep_hits(&self, fs: &dyn FileSystem, query: &[u8]) -> (Vec<GrepHit>, GrepSummary) {
        let mut all = Vec::new();
        let verified = self.verify_candidates(fs, query, |hits| -> Result<(), Infallible> {
            all.extend(hits);
            Ok(())
        });
        match verified {
            Ok(summary) => (all, summary),
            Err(never) => match never {},
        }
    }

    /// Hand the hits of every matching candidate to `sink`, in path order
    fn verify_candidates<E>(
        &self,
        fs: &dyn FileSystem,
        query: &[u8],
        mut sink: impl FnMut(Vec<GrepHit>) -> Result<(), E>,
    ) -> Result<GrepSummary, E> {
        let mut paths: Vec<String> = self.paths_matching_query(query).collect();
        paths.sort_unstable();

        let finder = Finder::new(query);
        let mut summary = GrepSummary {
            candidates: paths.len(),
            ..GrepSummary::default()
        };

        for chunk in paths.chunks(VERIFY_CHUNK) {
            // Indexed parallel collect keeps the chunk in path order
            let verified: Vec<Verified> = chunk
                .par_iter()
                .map(|path| match fs.read_relative_filename(path) {
                    Ok(content) => Verified::Hits(find_hits(path, &content, &finder)),
                    Err(err) => {
                        tracing::warn!(path = %path, error = %format!("{:#}", err), "skipping unreadable candidate");
                        Verified::Unreadable
                    }
                })
                .collect();

            for outcome in verified {
                match outcome {
                    Verified::Unreadable => summary.unreadable += 1,
                    Verified::Hits(found) if found.is_empty() => summary.false_positives += 1,
                    Verified::Hits(found) => {
                        summary.files_matched += 1;
                        summary.hits += found.len();
                        sink(found)?;
                    }
                }
            }
        }

        tracing::debug!(
            candidates = summary.candidates,
            matched = summary.files_matched,
            false_positives = summary.false_positives,
            unreadable = summary.unreadable,
            "grep verified"
        );
        Ok(summary)
    }
}

/// Scan every line of `content`, including a last line without a terminator.
/// One hit per line, at the first occurrence.
fn find_hits(path: &str, content: &[u8], finder: &Finder<'_>) -> Vec<GrepHit> {
    let mut hits = Vec::new();
    let mut start = 0;
    let mut line_number = 1;

    while start < content.len() {
        let end = memchr(b'\n', &content[start..]).map_or(content.len(), |i| start + i);
        let line = &content[start..end];

        if let Some(column) = finder.find(line) {
            hits.push(GrepHit {
                path: path.to_string(),
                line_number,
                column,
                line: line.to_vec(),
                match_len: finder.needle().len(),
            });
        }

        start = end + 1;
        line_number += 1;
    }

    hits
}
