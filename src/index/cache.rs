//! Binary cache of a built [`RepoIndex`].
//!
//! File format (integers little-endian, `varint` = LEB128):
//!
//! ```text
//! [MAGIC "BMSK":4][VERSION:u32]                  header, 8 bytes
//! [config_fingerprint:u32]                        IndexConfig::fingerprint at build time
//! [blob_count:varint]
//! per blob:
//!   [path_len:varint][path:utf-8]
//!   [has_filter:u8]                               0 or 1
//!   if 1: [num_hashes:u8][word_count:varint][word:u64 * word_count]
//! [crc32:u32]                                     over everything after the header
//! ```
//!
//! Filters are stored bit for bit, so a reloaded index answers every query
//! exactly like the one that was written.

use crate::error::CacheError;
use crate::fs::FileSystem;
use crate::index::build::RepoIndex;
use crate::index::types::{Blob, IndexConfig};
use crate::utils::{BloomFilter, ByteReader, write_u32_le, write_u64_le, write_varint};
use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Magic bytes identifying a cache file.
pub const MAGIC: [u8; 4] = *b"BMSK";

/// Current cache format version.
pub const VERSION: u32 = 2;

/// Header size in bytes (magic + version).
pub const HEADER_SIZE: usize = 8;

const CHECKSUM_SIZE: usize = 4;

const TAG_NO_FILTER: u8 = 0;
const TAG_FILTER: u8 = 1;

/// Passes writes through while folding them into a CRC32
struct ChecksumWriter<W> {
    inner: W,
    hasher: crc32fast::Hasher,
}

impl<W: Write> Write for ChecksumWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl RepoIndex {
    /// Encode the whole index into `writer`
    pub fn write_to<W: Write>(&self, writer: W) -> io::Result<()> {
        let mut writer = writer;
        writer.write_all(&MAGIC)?;
        write_u32_le(&mut writer, VERSION)?;

        let mut body = ChecksumWriter {
            inner: writer,
            hasher: crc32fast::Hasher::new(),
        };

        write_u32_le(&mut body, self.config_fingerprint)?;
        write_varint(&mut body, self.blobs.len() as u64)?;
        for blob in &self.blobs {
            write_varint(&mut body, blob.path.len() as u64)?;
            body.write_all(blob.path.as_bytes())?;

            match &blob.filter {
                None => body.write_all(&[TAG_NO_FILTER])?,
                Some(filter) => {
                    body.write_all(&[TAG_FILTER, filter.num_hashes()])?;
                    write_varint(&mut body, filter.bits().len() as u64)?;
                    for &word in filter.bits() {
                        write_u64_le(&mut body, word)?;
                    }
                }
            }
        }

        let ChecksumWriter { mut inner, hasher } = body;
        write_u32_le(&mut inner, hasher.finalize())?;
        inner.flush()
    }

    /// Encode the index into a fresh buffer
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_to(&mut buf);
        buf
    }

    /// Persist the index at `path`.
    ///
    /// The bytes go to a temporary sibling that is synced and then renamed
    /// over `path`, so a failed write never leaves a file that decodes.
    pub fn serialize_to_file(&self, path: &Path) -> Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;

        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let tmp_name = format!(
            ".{}.tmp-{}-{}",
            path.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("bitmask"),
            std::process::id(),
            nonce
        );
        let tmp_path = parent.join(tmp_name);

        let written = (|| -> Result<()> {
            let file = File::create(&tmp_path)
                .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
            let mut writer = BufWriter::new(file);
            self.write_to(&mut writer)
                .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
            let file = writer
                .into_inner()
                .map_err(|e| e.into_error())
                .with_context(|| format!("Failed to flush {}", tmp_path.display()))?;
            file.sync_all()
                .with_context(|| format!("Failed to sync {}", tmp_path.display()))?;
            Ok(())
        })();

        if let Err(err) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(err);
        }

        if let Err(err) = fs::rename(&tmp_path, path) {
            // Windows refuses to rename over an existing file
            if path.exists() {
                let _ = fs::remove_file(path);
                if let Err(retry) = fs::rename(&tmp_path, path) {
                    let _ = fs::remove_file(&tmp_path);
                    return Err(retry).with_context(|| {
                        format!("Failed to replace {} after rename error: {err}", path.display())
                    });
                }
            } else {
                let _ = fs::remove_file(&tmp_path);
                return Err(err)
                    .with_context(|| format!("Failed to move cache into {}", path.display()));
            }
        }

        tracing::debug!(path = %path.display(), blobs = self.blobs.len(), "cache written");
        Ok(())
    }

    /// Reconstruct an index from a cache stream. No filesystem access.
    pub fn deserialize<R: Read>(mut reader: R) -> Result<Self, CacheError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    /// Memory-map a cache file and decode it
    pub fn open_cache(path: &Path) -> Result<Self, CacheError> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(CacheError::Truncated(0));
        }
        // SAFETY: the mapping is read-only and dropped before returning;
        // cache files are only ever replaced by rename, never rewritten in place.
        let mmap = unsafe { Mmap::map(&file)? };
        Self::from_bytes(&mmap)
    }

    /// Decode an index from its complete encoded bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CacheError> {
        let mut header = ByteReader::new(bytes);
        match header.read_bytes(MAGIC.len()) {
            Some(magic) if magic == MAGIC.as_slice() => {}
            Some(_) => return Err(CacheError::BadMagic),
            // A short prefix of the magic is a cut-off cache, anything else is foreign
            None if MAGIC.starts_with(bytes) => return Err(CacheError::Truncated(bytes.len())),
            None => return Err(CacheError::BadMagic),
        }
        let version = header
            .read_u32_le()
            .ok_or(CacheError::Truncated(bytes.len()))?;
        if version != VERSION {
            return Err(CacheError::BadVersion {
                found: version,
                expected: VERSION,
            });
        }

        let body = &bytes[HEADER_SIZE..];
        if body.len() < CHECKSUM_SIZE {
            return Err(CacheError::Truncated(bytes.len()));
        }
        let (payload, trailer) = body.split_at(body.len() - CHECKSUM_SIZE);
        let expected = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        let actual = crc32fast::hash(payload);
        if expected != actual {
            return Err(CacheError::ChecksumMismatch { expected, actual });
        }

        let (config_fingerprint, blobs) = decode_payload(payload)?;
        let mut index = Self::from_blobs(blobs);
        index.config_fingerprint = config_fingerprint;
        Ok(index)
    }
}

/// Offset in the whole file of the reader's position in the payload
fn at(reader: &ByteReader<'_>) -> usize {
    HEADER_SIZE + reader.position()
}

fn truncated(reader: &ByteReader<'_>) -> CacheError {
    CacheError::Truncated(at(reader))
}

fn decode_payload(payload: &[u8]) -> Result<(u32, Vec<Blob>), CacheError> {
    let mut reader = ByteReader::new(payload);

    let config_fingerprint = reader.read_u32_le().ok_or_else(|| truncated(&reader))?;

    let count = reader.read_varint().ok_or_else(|| truncated(&reader))?;
    // Every blob takes at least two bytes (empty path length + tag)
    if count > (reader.remaining() / 2) as u64 {
        return Err(CacheError::Corrupt {
            offset: at(&reader),
            reason: "blob count exceeds file size",
        });
    }

    let mut blobs = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let path_len = reader.read_varint().ok_or_else(|| truncated(&reader))?;
        let path_len = usize::try_from(path_len).map_err(|_| CacheError::Corrupt {
            offset: at(&reader),
            reason: "path length overflows",
        })?;
        let offset = at(&reader);
        let path = reader
            .read_bytes(path_len)
            .ok_or_else(|| truncated(&reader))?;
        let path = std::str::from_utf8(path).map_err(|_| CacheError::Corrupt {
            offset,
            reason: "path is not UTF-8",
        })?;

        let offset = at(&reader);
        let filter = match reader.read_u8().ok_or_else(|| truncated(&reader))? {
            TAG_NO_FILTER => None,
            TAG_FILTER => Some(decode_filter(&mut reader)?),
            _ => {
                return Err(CacheError::Corrupt {
                    offset,
                    reason: "unknown filter tag",
                });
            }
        };

        blobs.push(Blob::new(path, filter));
    }

    if reader.remaining() != 0 {
        return Err(CacheError::Corrupt {
            offset: at(&reader),
            reason: "trailing bytes after last blob",
        });
    }

    Ok((config_fingerprint, blobs))
}

fn decode_filter(reader: &mut ByteReader<'_>) -> Result<BloomFilter, CacheError> {
    let offset = at(reader);
    let num_hashes = reader.read_u8().ok_or_else(|| truncated(reader))?;
    let word_count = reader.read_varint().ok_or_else(|| truncated(reader))?;
    let byte_len = usize::try_from(word_count)
        .ok()
        .and_then(|n| n.checked_mul(8))
        .ok_or(CacheError::Corrupt {
            offset,
            reason: "filter length overflows",
        })?;
    let raw = reader.read_bytes(byte_len).ok_or_else(|| truncated(reader))?;

    let words = raw
        .chunks_exact(8)
        .map(|c| u64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
        .collect();

    BloomFilter::from_raw(words, num_hashes).ok_or(CacheError::Corrupt {
        offset,
        reason: "invalid filter parameters",
    })
}

/// Load the index cached at `cache_path`, or build it from `fs` and write the
/// cache when there is none or it cannot be used. A cache built under
/// different [`IndexConfig`] settings counts as unusable.
///
/// An unreadable-but-present cache (permissions, I/O) is an error rather than
/// a silent rebuild.
pub fn load_or_build(
    fs: &dyn FileSystem,
    cache_path: &Path,
    config: &IndexConfig,
    silent: bool,
) -> Result<RepoIndex> {
    let expected = config.fingerprint();
    let opened = RepoIndex::open_cache(cache_path).and_then(|index| {
        if index.config_fingerprint == expected {
            Ok(index)
        } else {
            Err(CacheError::ConfigMismatch {
                found: index.config_fingerprint,
                expected,
            })
        }
    });

    match opened {
        Ok(index) => {
            tracing::info!(path = %cache_path.display(), blobs = index.len(), "loaded cache");
            return Ok(index.with_batch_size(config.effective_batch_size()));
        }
        Err(CacheError::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
            tracing::info!(path = %cache_path.display(), "no cache yet, building");
        }
        Err(err) if err.requires_rebuild() => {
            tracing::warn!(path = %cache_path.display(), error = %err, "cache unusable, rebuilding");
        }
        Err(err) => {
            return Err(err)
                .with_context(|| format!("Failed to open cache {}", cache_path.display()));
        }
    }

    let index = RepoIndex::build_with_progress(fs, config, silent)?;
    index.serialize_to_file(cache_path)?;
    Ok(index)
}
