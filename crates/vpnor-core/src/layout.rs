//! Flash layout export
//!
//! Renders the image described by a [`PartitionTable`] as a flash layout
//! file, so that a built image can be handled region by region by flash
//! programming tools:
//!
//! ```toml
//! [layout]
//! name = "PNOR"
//! chip_size = "4 MiB"
//!
//! [[region]]
//! name = "part"
//! start = 0x00000000
//! end = 0x00000FFF
//! readonly = true
//!
//! [[region]]
//! name = "HBB"
//! start = 0x00001000
//! end = 0x00090FFF
//! ```

use std::fs;
use std::io;
use std::path::Path;

use crate::ffs::{Permissions, BLOCK_SIZE};
use crate::table::PartitionTable;

/// Name of the region holding the partition table itself
pub const TABLE_REGION_NAME: &str = "part";

/// A named byte range of the image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Partition name
    pub name: String,
    /// Start offset (inclusive)
    pub start: u64,
    /// End offset (inclusive)
    pub end: u64,
    /// Host firmware may not write the region
    pub readonly: bool,
    /// Region must be kept across code updates
    pub preserved: bool,
    /// Region contents carry ECC
    pub ecc: bool,
}

impl Region {
    /// Size of the region in bytes
    pub fn size(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Image layout derived from a partition table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Layout name
    pub name: Option<String>,
    /// Image size in bytes
    pub chip_size: u64,
    /// Regions in table order, starting with the table itself
    pub regions: Vec<Region>,
}

impl Layout {
    /// Describe the image of `table`
    ///
    /// Zero-sized partitions occupy no bytes and are left out.
    pub fn from_table(table: &PartitionTable) -> Self {
        let block = u64::from(BLOCK_SIZE);
        let header = table.header();

        let mut regions = vec![Region {
            name: TABLE_REGION_NAME.to_string(),
            start: 0,
            end: u64::from(header.size) * block - 1,
            readonly: true,
            preserved: false,
            ecc: false,
        }];

        regions.extend(
            table
                .entries()
                .iter()
                .filter(|entry| !entry.is_empty())
                .map(|entry| {
                    let range = entry.byte_range();
                    let perms = entry.permissions();
                    Region {
                        name: entry.name_str().into_owned(),
                        start: range.start,
                        end: range.end - 1,
                        readonly: perms.contains(Permissions::READONLY),
                        preserved: perms.contains(Permissions::PRESERVED),
                        ecc: entry.is_ecc_protected(),
                    }
                }),
        );

        Self {
            name: Some("PNOR".to_string()),
            chip_size: table.image_size(),
            regions,
        }
    }

    /// Find a region by name
    pub fn find_region(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name == name)
    }

    /// Render as a TOML layout file
    pub fn to_toml_string(&self) -> String {
        let mut output = String::new();

        output.push_str("[layout]\n");
        if let Some(name) = &self.name {
            output.push_str(&format!("name = \"{}\"\n", name));
        }
        output.push_str(&format!("chip_size = \"{}\"\n", format_size(self.chip_size)));
        output.push('\n');

        for region in &self.regions {
            output.push_str("[[region]]\n");
            output.push_str(&format!("name = \"{}\"\n", region.name));
            output.push_str(&format!("start = 0x{:08X}\n", region.start));
            output.push_str(&format!("end = 0x{:08X}\n", region.end));
            if region.readonly {
                output.push_str("readonly = true\n");
            }
            if region.preserved {
                output.push_str("preserved = true\n");
            }
            if region.ecc {
                output.push_str("ecc = true\n");
            }
            output.push('\n');
        }

        output
    }

    /// Write the TOML layout to `path`
    pub fn to_toml_file(&self, path: impl AsRef<Path>) -> io::Result<()> {
        fs::write(path, self.to_toml_string())
    }
}

/// Format a size as human-readable string
pub fn format_size(size: u64) -> String {
    if size >= 1024 * 1024 && size % (1024 * 1024) == 0 {
        format!("{} MiB", size / (1024 * 1024))
    } else if size >= 1024 && size % 1024 == 0 {
        format!("{} KiB", size / 1024)
    } else {
        format!("{}", size)
    }
}
