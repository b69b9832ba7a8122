//! vpnor-core - PNOR partition tables for virtual flash
//!
//! This crate builds the FFS partition table of an emulated PNOR flash from
//! a directory holding a table of contents (TOC) and one file per partition.
//! The table is produced in host byte order for in-process use and in
//! big-endian order for the host firmware, and answers which partition covers
//! a given flash offset.
//!
//! # Example
//!
//! ```ignore
//! use vpnor_core::{Config, PartitionTable};
//!
//! let table = PartitionTable::build(&Config::new("/var/lib/pnor"))?;
//! println!("{} partitions", table.len());
//!
//! let part = table.partition(0x10_0000);
//! if part.is_empty() {
//!     println!("offset is not mapped");
//! } else {
//!     println!("offset is in {}", part.name_str());
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod ffs;
pub mod layout;
pub mod table;
pub mod toc;

pub use config::Config;
pub use error::{BuildError, FormatError, TocError};
pub use ffs::{PartitionEntry, Permissions, TableHeader};
pub use table::PartitionTable;
