//! Zip container writer for assembled archives.
//!
//! This module wraps [`zip::ZipWriter`] over an in-memory buffer. Entries
//! use Deflate at a low compression level: the assembler favors latency
//! over ratio since content already crossed the network once. Entry
//! timestamps are fixed so identical input yields byte-identical output.

use std::io::{Cursor, Write};

use thiserror::Error;
use zip::CompressionMethod;
use zip::result::ZipError;
use zip::write::{SimpleFileOptions, ZipWriter};

/// Deflate level used for file entries; low effort, fast.
const COMPRESSION_LEVEL: i64 = 1;

/// Errors from writing the archive container.
///
/// All variants are fatal to the assembly operation: a failed write means
/// the container cannot be trusted, so the partial buffer is discarded.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Starting a folder or file entry failed.
    #[error("failed to add archive entry {path:?}: {source}")]
    Entry {
        /// Archive path of the entry that failed.
        path: String,
        /// The underlying zip error.
        #[source]
        source: ZipError,
    },

    /// Writing entry content failed.
    #[error("failed to write content for archive entry {path:?}: {source}")]
    Io {
        /// Archive path of the entry that failed.
        path: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Finalizing the central directory failed.
    #[error("failed to finalize archive: {source}")]
    Finish {
        /// The underlying zip error.
        #[source]
        source: ZipError,
    },
}

/// Appends folder and file entries to an in-memory zip archive.
///
/// Callers are expected to append entries in hierarchy order (parents
/// before descendants); readers infer structure from paths alone, so this
/// is a cosmetic convenience rather than a format requirement.
pub struct ArchiveWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveWriter {
    /// Creates a writer over a fresh in-memory buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    /// Appends a zero-length folder entry; `path` must end with `/`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Entry`] if the container rejects the entry.
    pub fn open_folder(&mut self, path: &str) -> Result<(), ArchiveError> {
        self.zip
            .add_directory(path, entry_options())
            .map_err(|source| ArchiveError::Entry {
                path: path.to_string(),
                source,
            })
    }

    /// Appends a file entry at `path` with the given content.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Entry`] if the entry cannot be started and
    /// [`ArchiveError::Io`] if writing the content fails.
    pub fn write_file(&mut self, path: &str, bytes: &[u8]) -> Result<(), ArchiveError> {
        self.zip
            .start_file(path, entry_options())
            .map_err(|source| ArchiveError::Entry {
                path: path.to_string(),
                source,
            })?;
        self.zip.write_all(bytes).map_err(|source| ArchiveError::Io {
            path: path.to_string(),
            source,
        })
    }

    /// Finalizes the container and returns its bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Finish`] if the central directory cannot be
    /// written.
    pub fn finish(self) -> Result<Vec<u8>, ArchiveError> {
        let cursor = self
            .zip
            .finish()
            .map_err(|source| ArchiveError::Finish { source })?;
        Ok(cursor.into_inner())
    }
}

/// Entry options shared by folders and files.
///
/// The fixed modification time (the zip epoch) keeps output reproducible
/// across runs.
fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL))
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644)
}
