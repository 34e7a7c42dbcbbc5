//! ZIP container reading and writing.
//!
//! Reading enumerates entries in archive order and retains per-entry
//! metadata plus the decompressed bytes, enforcing the caller's
//! [`ReadOptions`] as the bytes are observed. ZIP size metadata is never
//! trusted: a forged header cannot smuggle an oversized entry past the
//! limits.
//!
//! Writing emits entries with level-1 deflate and a zeroed timestamp, in
//! the exact order given, so repeated writes of the same content are
//! byte-identical.

use std::io::{Cursor, Read, Write};

use indexmap::IndexMap;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Error, Result};
use crate::limits::{exceeds, ReadOptions};

/// One decompressed package entry with its archive metadata.
#[derive(Debug, Clone)]
pub struct PackageEntry {
    pub bytes: Vec<u8>,
    pub compressed_size: u64,
    pub crc32: u32,
}

/// An OOXML package held in memory, entries in archive order.
#[derive(Debug, Clone, Default)]
pub struct Package {
    pub entries: IndexMap<String, PackageEntry>,
}

impl Package {
    /// Read a package from raw bytes under the given limits.
    pub fn read(data: &[u8], options: &ReadOptions) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(data))
            .map_err(|e| Error::Zip(format!("not a ZIP archive: {e}")))?;

        if exceeds(archive.len() as u64, options.max_entry_count) {
            return Err(Error::Security(format!(
                "entry count {} exceeds limit {}",
                archive.len(),
                options.max_entry_count
            )));
        }

        let mut package = Package::default();
        let mut total: u64 = 0;
        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| Error::Zip(e.to_string()))?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let compressed_size = entry.compressed_size();

            // Read with a hard cap so forged size metadata cannot bypass the
            // limits; the observed byte count is what gets checked, and a
            // bomb stops inflating at the cap instead of filling memory.
            let budget_cap = effective_entry_cap(options, total);
            let ratio_cap = if options.max_compression_ratio != 0 && compressed_size > 0 {
                compressed_size.saturating_mul(options.max_compression_ratio)
            } else {
                u64::MAX
            };
            let cap = budget_cap.min(ratio_cap);
            let mut bytes = Vec::new();
            let read = entry
                .by_ref()
                .take(cap.saturating_add(1))
                .read_to_end(&mut bytes)
                .map_err(|e| Error::Zip(format!("failed reading entry {name}: {e}")))? as u64;
            if read > cap {
                if ratio_cap < budget_cap {
                    return Err(Error::Security(format!(
                        "entry {name} compression ratio exceeds limit {}",
                        options.max_compression_ratio
                    )));
                }
                return Err(Error::Security(format!(
                    "entry {name} exceeds the uncompressed size budget ({cap} bytes allowed)"
                )));
            }

            total += read;
            if exceeds(total, options.max_uncompressed_size) {
                return Err(Error::Security(format!(
                    "total uncompressed size {total} exceeds limit {}",
                    options.max_uncompressed_size
                )));
            }

            package.entries.insert(
                name,
                PackageEntry {
                    bytes,
                    compressed_size,
                    crc32: entry.crc32(),
                },
            );
        }
        Ok(package)
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(|e| e.bytes.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Entry names in archive order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// How many more uncompressed bytes a single entry may contribute.
fn effective_entry_cap(options: &ReadOptions, total_so_far: u64) -> u64 {
    if options.max_uncompressed_size == 0 {
        return u64::MAX - 1;
    }
    options.max_uncompressed_size.saturating_sub(total_so_far)
}

/// Deterministic entry options: level-1 deflate, zeroed timestamp.
pub fn zip_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(1))
        .last_modified_time(zip::DateTime::default())
}

/// Write entries to a ZIP stream in the order given.
pub fn write_entries<W: Write + std::io::Seek>(
    out: W,
    entries: &[(String, Vec<u8>)],
) -> Result<()> {
    let mut zip = ZipWriter::new(out);
    let options = zip_options();
    for (name, bytes) in entries {
        zip.start_file(name.as_str(), options)
            .map_err(|e| Error::Zip(e.to_string()))?;
        zip.write_all(bytes)?;
    }
    zip.finish().map_err(|e| Error::Zip(e.to_string()))?;
    Ok(())
}

/// Serialize entries to an in-memory ZIP buffer.
pub fn entries_to_buffer(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_entries(Cursor::new(&mut buf), entries)?;
    Ok(buf)
}
