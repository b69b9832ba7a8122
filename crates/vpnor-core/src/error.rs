//! Error types for vpnor-core
//!
//! Building a table can fail in two ways that callers care about: a
//! [`BuildError`] means the table could not be constructed from the TOC
//! directory (and the owning process should refuse to start), a
//! [`FormatError`] means an already serialized table is not usable.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while tokenizing a TOC file
///
/// Lines that don't look like partitions are skipped, never reported. These
/// errors cover lines that do match the pattern but carry numbers that can't
/// be represented in the table.
#[derive(Debug, Error)]
pub enum TocError {
    /// Partition id does not fit in 32 bits
    #[error("line {line}: partition id {value:?} is out of range")]
    InvalidId {
        /// 1-based line number in the TOC
        line: usize,
        /// Digits as written in the TOC
        value: String,
    },

    /// Start or end offset does not fit in 32 bits
    #[error("line {line}: offset {value:?} is out of range")]
    InvalidOffset {
        /// 1-based line number in the TOC
        line: usize,
        /// Hex digits as written in the TOC
        value: String,
    },

    /// Reading the TOC stream failed
    #[error("line {line}: {source}")]
    Io {
        /// 1-based line number that was being read
        line: usize,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Errors that abort construction of a partition table
#[derive(Debug, Error)]
pub enum BuildError {
    /// TOC file could not be read
    #[error("partition table build failed: cannot read {}: {source}", .path.display())]
    Io {
        /// Path of the file being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A partition line carries an unusable numeric field
    #[error("partition table build failed: {0}")]
    Toc(#[from] TocError),

    /// A partition ends before it starts
    #[error("partition table build failed: line {line}: partition {name} ends before it starts ({start:#x} > {end:#x})")]
    InvalidRange {
        /// 1-based line number in the TOC
        line: usize,
        /// Partition name
        name: String,
        /// Declared start offset
        start: u32,
        /// Declared end offset
        end: u32,
    },

    /// The image block count no longer fits in the header
    #[error("partition table build failed: image exceeds {} blocks at partition {name}", u32::MAX)]
    ImageTooLarge {
        /// Partition that overflowed the block cursor
        name: String,
    },

    /// The assembled table could not be re-encoded
    #[error("partition table build failed: {0}")]
    Format(#[from] FormatError),
}

/// Errors raised when decoding a serialized partition table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Buffer is shorter than the header claims
    #[error("table truncated: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required
        needed: usize,
        /// Bytes present
        available: usize,
    },

    /// Header magic is not "PART"
    #[error("invalid table magic {0:#010x}")]
    InvalidMagic(u32),

    /// Header version is not supported
    #[error("unsupported table version {0}")]
    UnsupportedVersion(u32),

    /// Entry records have an unexpected size
    #[error("unsupported entry size {0}")]
    UnsupportedEntrySize(u32),

    /// Block size differs from the emulated device
    #[error("unsupported block size {0}")]
    UnsupportedBlockSize(u32),

    /// Header checksum does not verify
    #[error("header checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    HeaderChecksum {
        /// Checksum found in the table
        stored: u32,
        /// Checksum computed over the header fields
        computed: u32,
    },

    /// An entry checksum does not verify
    #[error("entry {index} checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    EntryChecksum {
        /// Position of the entry in the table
        index: usize,
        /// Checksum found in the table
        stored: u32,
        /// Checksum computed over the entry fields
        computed: u32,
    },
}
