//! PNOR partition table construction
//!
//! A [`PartitionTable`] is built once from a directory holding a TOC and one
//! file per partition. Each TOC line whose backing file exists becomes an
//! entry; partitions are laid out back to back after the table itself, in TOC
//! order, each starting on a block boundary.
//!
//! ```ignore
//! let table = PartitionTable::build(&Config::new("/var/lib/pnor"))?;
//! let part = table.partition(0x12_3000);
//! if !part.is_empty() {
//!     println!("offset belongs to {}", part.name_str());
//! }
//! ```
//!
//! The table is immutable once built and can be shared between threads.

mod endian;

use std::fs;
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, NativeEndian};

use crate::config::Config;
use crate::error::{BuildError, FormatError};
use crate::ffs::{
    blocks_for, Permissions, PartitionEntry, TableHeader, BLOCK_SIZE, ENTRY_SIZE, HEADER_SIZE,
    PARENT_PARTITION_ID, PARTITION_ECC_PROTECTED, PARTITION_HEADER_MAGIC, PARTITION_NAME_MAX,
    PARTITION_TYPE_DATA, PARTITION_VERSION_1,
};
use crate::toc::{self, TocEntry, TocNumbers};

pub use endian::{convert, to_big_endian, to_native};

/// Returned by [`PartitionTable::partition`] when no partition matches
static NO_PARTITION: PartitionEntry = PartitionEntry::EMPTY;

/// Attribute tokens recognised in the TOC suffix
const ATTR_ECC: &str = "ECC";
const ATTR_READONLY: &str = "READONLY";
const ATTR_PRESERVED: &str = "PRESERVED";

/// Turns TOC lines into entries, tracking the image block cursor
struct PartitionBuilder<'a> {
    config: &'a Config,
    /// Next free block in the image
    cursor: u32,
}

impl<'a> PartitionBuilder<'a> {
    fn new(config: &'a Config, first_block: u32) -> Self {
        Self {
            config,
            cursor: first_block,
        }
    }

    /// Build the entry for `toc`, or `None` if its backing file is missing
    fn build(&mut self, toc: &TocEntry) -> Result<Option<PartitionEntry>, BuildError> {
        let path = self.config.partition_path(&toc.name);
        if !path.is_file() {
            log::error!("Partition file {} does not exist", path.display());
            return Ok(None);
        }

        let numbers = toc.numbers()?;
        if numbers.end < numbers.start {
            return Err(BuildError::InvalidRange {
                line: toc.line,
                name: toc.name.clone(),
                start: numbers.start,
                end: numbers.end,
            });
        }

        let mut entry = PartitionEntry::EMPTY;
        write_name(&mut entry, &toc.name);
        entry.id = numbers.id;

        entry.pid = PARENT_PARTITION_ID;
        entry.part_type = PARTITION_TYPE_DATA;
        entry.flags = 0;

        self.write_sizes(&mut entry, &toc.name, numbers)?;
        write_user_data(&mut entry, &toc.attributes);
        entry.seal();

        log::debug!(
            "Partition {} (id {}): blocks {:#x}+{:#x}, {:#x} bytes",
            toc.name,
            entry.id,
            entry.base,
            entry.size,
            entry.actual
        );

        Ok(Some(entry))
    }

    fn write_sizes(
        &mut self,
        entry: &mut PartitionEntry,
        name: &str,
        numbers: TocNumbers,
    ) -> Result<(), BuildError> {
        let actual = numbers.end - numbers.start;
        // A u32 byte span is at most 2^20 blocks
        let blocks = blocks_for(u64::from(actual)) as u32;

        entry.base = self.cursor;
        entry.size = blocks;
        entry.actual = actual;

        self.cursor = self
            .cursor
            .checked_add(blocks)
            .ok_or_else(|| BuildError::ImageTooLarge {
                name: name.to_string(),
            })?;
        Ok(())
    }
}

/// Copy `name` into the fixed-width field, truncating if needed
fn write_name(entry: &mut PartitionEntry, name: &str) {
    let bytes = name.as_bytes();
    if bytes.len() > PARTITION_NAME_MAX {
        log::warn!(
            "Partition name {} is longer than {} bytes, truncating",
            name,
            PARTITION_NAME_MAX
        );
    }
    let len = bytes.len().min(PARTITION_NAME_MAX);
    entry.name = [0; PARTITION_NAME_MAX + 1];
    entry.name[..len].copy_from_slice(&bytes[..len]);
}

/// Fill the user words from the TOC attribute suffix
fn write_user_data(entry: &mut PartitionEntry, attributes: &str) {
    if attributes.contains(ATTR_ECC) {
        entry.user[0] = PARTITION_ECC_PROTECTED;
    }

    let mut perms = Permissions::empty();
    if attributes.contains(ATTR_READONLY) {
        perms |= Permissions::READONLY;
    }
    if attributes.contains(ATTR_PRESERVED) {
        perms |= Permissions::PRESERVED;
    }
    entry.user[1] = perms.bits();
}

/// A complete PNOR partition table
///
/// Holds the decoded header and entries along with the two serialized forms:
/// host order for in-process use and big-endian for the host firmware.
#[derive(Debug, Clone)]
pub struct PartitionTable {
    header: TableHeader,
    entries: Vec<PartitionEntry>,
    native: Vec<u8>,
    big_endian: Vec<u8>,
}

impl PartitionTable {
    /// Build from the default directory
    pub fn new() -> Result<Self, BuildError> {
        Self::build(&Config::default())
    }

    /// Build from `directory` using the default TOC file name
    pub fn from_directory(directory: impl AsRef<Path>) -> Result<Self, BuildError> {
        Self::build(&Config::new(directory.as_ref()))
    }

    /// Build from the TOC and partition files described by `config`
    ///
    /// Lines without a backing file are skipped. For the remaining lines, any
    /// numeric field that can't be represented, or an end offset below its
    /// start, fails the build.
    pub fn build(config: &Config) -> Result<Self, BuildError> {
        let toc_path = config.toc_path();
        let raw = fs::read(&toc_path).map_err(|source| BuildError::Io {
            path: toc_path.clone(),
            source,
        })?;
        let text = String::from_utf8_lossy(&raw);

        // Room is reserved for every line that might be a partition; the
        // header only reports the lines that were accepted.
        let capacity = toc::count_possible_entries(&text);
        let table_bytes = HEADER_SIZE + capacity * ENTRY_SIZE;
        let table_blocks = blocks_for(table_bytes as u64);
        let table_blocks = u32::try_from(table_blocks).map_err(|_| BuildError::ImageTooLarge {
            name: config.toc_file.clone(),
        })?;
        let mut native = vec![0u8; table_blocks as usize * BLOCK_SIZE as usize];

        let mut builder = PartitionBuilder::new(config, table_blocks);
        let mut entries = Vec::with_capacity(capacity);
        for candidate in toc::entries(text.as_bytes()) {
            let candidate = candidate?;
            if let Some(entry) = builder.build(&candidate)? {
                let offset = HEADER_SIZE + entries.len() * ENTRY_SIZE;
                native[offset..offset + ENTRY_SIZE]
                    .copy_from_slice(&entry.encode::<NativeEndian>());
                entries.push(entry);
            }
        }

        let mut header = TableHeader {
            magic: PARTITION_HEADER_MAGIC,
            version: PARTITION_VERSION_1,
            size: table_blocks,
            entry_size: ENTRY_SIZE as u32,
            entry_count: entries.len() as u32,
            block_size: BLOCK_SIZE,
            block_count: builder.cursor,
            ..Default::default()
        };
        header.seal();
        native[..HEADER_SIZE].copy_from_slice(&header.encode::<NativeEndian>());

        let big_endian = to_big_endian(&native)?;

        log::info!(
            "Built partition table from {}: {} partitions, {} image blocks",
            toc_path.display(),
            header.entry_count,
            header.block_count
        );

        Ok(Self {
            header,
            entries,
            native,
            big_endian,
        })
    }

    /// Load a serialized table in byte order `B`
    ///
    /// The header and every entry must pass validation, including checksums.
    pub fn from_bytes<B: ByteOrder>(bytes: &[u8]) -> Result<Self, FormatError> {
        let header = TableHeader::decode::<B>(bytes)?;
        header.validate()?;

        let used = header.used_bytes();
        if bytes.len() < used {
            return Err(FormatError::Truncated {
                needed: used,
                available: bytes.len(),
            });
        }

        let entries = bytes[HEADER_SIZE..used]
            .chunks_exact(ENTRY_SIZE)
            .enumerate()
            .map(|(index, record)| -> Result<PartitionEntry, FormatError> {
                let entry = PartitionEntry::decode::<B>(record)?;
                let computed = entry.compute_checksum();
                if entry.checksum != computed {
                    return Err(FormatError::EntryChecksum {
                        index,
                        stored: entry.checksum,
                        computed,
                    });
                }
                Ok(entry)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            header,
            entries,
            native: convert::<B, NativeEndian>(bytes)?,
            big_endian: convert::<B, BigEndian>(bytes)?,
        })
    }

    /// Find the partition covering image byte `offset`
    ///
    /// Returns the first entry, in table order, whose block range contains
    /// the offset. If none does, an all-zero entry is returned; check
    /// [`PartitionEntry::is_empty`].
    pub fn partition(&self, offset: u64) -> &PartitionEntry {
        let block = offset / u64::from(BLOCK_SIZE);
        self.entries
            .iter()
            .find(|entry| entry.contains_block(block))
            .unwrap_or(&NO_PARTITION)
    }

    /// Find a partition by name (first match in table order)
    pub fn find(&self, name: &str) -> Option<&PartitionEntry> {
        self.entries.iter().find(|entry| entry.name_str() == name)
    }

    /// Table header
    pub fn header(&self) -> &TableHeader {
        &self.header
    }

    /// Entries in TOC order
    pub fn entries(&self) -> &[PartitionEntry] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Host-order serialization
    pub fn native_bytes(&self) -> &[u8] {
        &self.native
    }

    /// Big-endian serialization
    pub fn big_endian_bytes(&self) -> &[u8] {
        &self.big_endian
    }

    /// Size of the whole image (table plus partitions) in bytes
    pub fn image_size(&self) -> u64 {
        u64::from(self.header.block_count) * u64::from(BLOCK_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    const HBB_LINE: &str = "partition01=HBB,00010000,000a0000,ECC,PRESERVED";

    /// Create a PNOR directory with `toc` and an empty file for each name
    fn pnor_dir(toc: &str, files: &[&str]) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pnor.toc"), toc).unwrap();
        for name in files {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        dir
    }

    fn sample_dir() -> TempDir {
        let toc = "\
partition01=HBB,00010000,000a0000,ECC,PRESERVED
partition02=HBEL,000a0000,000c0000,ECC
partition03=GUARD,000c0000,000c5000,ECC,PRESERVED,READONLY
partition04=NVRAM,000c5000,00125000,PRESERVED
";
        pnor_dir(toc, &["HBB", "HBEL", "GUARD", "NVRAM"])
    }

    #[test]
    fn test_single_partition() {
        let dir = pnor_dir(&format!("{HBB_LINE}\n"), &["HBB"]);
        let table = PartitionTable::from_directory(dir.path()).unwrap();

        let header = table.header();
        assert_eq!(header.magic, PARTITION_HEADER_MAGIC);
        assert_eq!(header.version, PARTITION_VERSION_1);
        assert_eq!(header.entry_count, 1);
        assert_eq!(header.entry_size, 128);
        assert_eq!(header.block_size, 4096);
        assert_eq!(header.size, 1);
        assert_eq!(header.block_count, 1 + 0x90);
        assert!(header.is_checksum_valid());

        let hbb = &table.entries()[0];
        assert_eq!(hbb.name_str(), "HBB");
        assert_eq!(hbb.id, 1);
        assert_eq!(hbb.base, 1);
        assert_eq!(hbb.actual, 0x0009_0000);
        assert_eq!(hbb.size, 0x90);
        assert_eq!(hbb.pid, PARENT_PARTITION_ID);
        assert_eq!(hbb.part_type, PARTITION_TYPE_DATA);
        assert_eq!(hbb.flags, 0);
        assert!(hbb.is_ecc_protected());
        assert!(hbb.permissions().contains(Permissions::PRESERVED));
        assert!(!hbb.permissions().contains(Permissions::READONLY));
        assert!(hbb.is_checksum_valid());
    }

    #[test]
    fn test_layout_is_contiguous() {
        let dir = sample_dir();
        let table = PartitionTable::from_directory(dir.path()).unwrap();
        let entries = table.entries();
        assert_eq!(entries.len(), 4);

        assert_eq!(entries[0].base, table.header().size);
        for pair in entries.windows(2) {
            assert_eq!(pair[1].base, pair[0].base + pair[0].size);
        }
        let last = entries.last().unwrap();
        assert_eq!(table.header().block_count, last.base + last.size);
    }

    #[test]
    fn test_partial_block_rounds_up() {
        let dir = sample_dir();
        let table = PartitionTable::from_directory(dir.path()).unwrap();
        let guard = table.find("GUARD").unwrap();
        assert_eq!(guard.actual, 0x5000);
        assert_eq!(guard.size, 5);

        let dir = pnor_dir("partition1=TINY,0,1\n", &["TINY"]);
        let table = PartitionTable::from_directory(dir.path()).unwrap();
        assert_eq!(table.entries()[0].actual, 1);
        assert_eq!(table.entries()[0].size, 1);
    }

    #[test]
    fn test_attributes() {
        let toc = "\
partition1=A,0,1000
partition2=B,0,1000,READONLY
partition3=C,0,1000,ECC,FOO,PRESERVED
partition4=D,0,1000,ecc,readonly
";
        let dir = pnor_dir(toc, &["A", "B", "C", "D"]);
        let table = PartitionTable::from_directory(dir.path()).unwrap();
        let e = table.entries();

        assert!(!e[0].is_ecc_protected());
        assert_eq!(e[0].user[1], 0);

        assert!(!e[1].is_ecc_protected());
        assert_eq!(e[1].permissions(), Permissions::READONLY);

        assert!(e[2].is_ecc_protected());
        assert_eq!(e[2].permissions(), Permissions::PRESERVED);

        // Tokens are case sensitive
        assert!(!e[3].is_ecc_protected());
        assert_eq!(e[3].permissions(), Permissions::empty());
    }

    #[test]
    fn test_missing_backing_file_is_skipped() {
        let dir = pnor_dir(
            "partition01=HBB,00010000,000a0000\npartition02=HBEL,000a0000,000c0000\n",
            &["HBEL"],
        );
        let table = PartitionTable::from_directory(dir.path()).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.header().entry_count, 1);
        let hbel = &table.entries()[0];
        assert_eq!(hbel.name_str(), "HBEL");
        // The skipped line takes no blocks
        assert_eq!(hbel.base, table.header().size);
        assert_eq!(table.header().block_count, hbel.base + hbel.size);
    }

    #[test]
    fn test_directory_is_not_a_backing_file() {
        let dir = pnor_dir("partition1=HBB,0,1000\n", &[]);
        fs::create_dir(dir.path().join("HBB")).unwrap();
        let table = PartitionTable::from_directory(dir.path()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_malformed_lines_are_ignored() {
        let toc = "\
# partition layout
partition01=HBB,00010000,000a0000,ECC
partition02=BAD NAME,0,1000
partition03=HBEL,xyz,1000

partition04=HBEL,000a0000,000c0000
";
        let dir = pnor_dir(toc, &["HBB", "HBEL"]);
        let table = PartitionTable::from_directory(dir.path()).unwrap();
        let names: Vec<_> = table.entries().iter().map(|e| e.name_str()).collect();
        assert_eq!(names, ["HBB", "HBEL"]);
    }

    #[test]
    fn test_allocation_follows_possible_count() {
        // 40 candidate lines need more than one block, but only one is accepted
        let mut toc = String::from("partition1=HBB,0,1000\n");
        for i in 2..=40 {
            toc.push_str(&format!("partition{i}=MISSING{i},0,1000\n"));
        }
        let dir = pnor_dir(&toc, &["HBB"]);
        let table = PartitionTable::from_directory(dir.path()).unwrap();

        assert_eq!(table.header().entry_count, 1);
        assert_eq!(table.header().size, 2);
        assert_eq!(table.native_bytes().len(), 2 * 4096);
        assert_eq!(table.big_endian_bytes().len(), 2 * 4096);
        assert_eq!(table.entries()[0].base, 2);
    }

    #[test]
    fn test_long_name_is_truncated() {
        let dir = pnor_dir(
            "partition1=ABCDEFGHIJKLMNOPQRS,0,1000\n",
            &["ABCDEFGHIJKLMNOPQRS"],
        );
        let table = PartitionTable::from_directory(dir.path()).unwrap();
        assert_eq!(table.entries()[0].name_str(), "ABCDEFGHIJKLMNO");
        assert_eq!(table.entries()[0].name[15], 0);
    }

    #[test]
    fn test_end_before_start_fails() {
        let dir = pnor_dir("partition1=HBB,00020000,00010000\n", &["HBB"]);
        let err = PartitionTable::from_directory(dir.path()).unwrap_err();
        assert!(matches!(err, BuildError::InvalidRange { line: 1, .. }));
        assert!(err.to_string().starts_with("partition table build failed"));
    }

    #[test]
    fn test_numeric_overflow_fails() {
        let dir = pnor_dir(
            "partition1=HBB,0,1000\npartition2=HBEL,0,1ffffffff\n",
            &["HBB", "HBEL"],
        );
        let err = PartitionTable::from_directory(dir.path()).unwrap_err();
        assert!(matches!(err, BuildError::Toc(_)));

        let dir = pnor_dir("partition4294967296=HBB,0,1000\n", &["HBB"]);
        assert!(PartitionTable::from_directory(dir.path()).is_err());
    }

    #[test]
    fn test_numeric_overflow_without_backing_file_is_skipped() {
        let toc = "\
partition99999999999=GONE,0,1000
partition2=LOST,0,1ffffffff
partition1=HBB,0,1000
";
        let dir = pnor_dir(toc, &["HBB"]);
        let table = PartitionTable::from_directory(dir.path()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.entries()[0].name_str(), "HBB");
        assert_eq!(table.entries()[0].id, 1);
    }

    #[test]
    fn test_image_too_large_fails() {
        // Each line spans 2^20 blocks, so the cursor wraps on the 4096th
        let mut toc = String::new();
        let mut names = Vec::new();
        for i in 1..=4096 {
            toc.push_str(&format!("partition{i}=P{i},0,ffffffff\n"));
            names.push(format!("P{i}"));
        }
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let dir = pnor_dir(&toc, &names);

        let err = PartitionTable::from_directory(dir.path()).unwrap_err();
        assert!(matches!(err, BuildError::ImageTooLarge { ref name } if name == "P4096"));
        assert!(err.to_string().starts_with("partition table build failed"));
    }

    #[test]
    fn test_missing_toc_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = PartitionTable::from_directory(dir.path()).unwrap_err();
        assert!(matches!(err, BuildError::Io { .. }));
    }

    #[test]
    fn test_custom_toc_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("other.toc"), HBB_LINE).unwrap();
        fs::write(dir.path().join("HBB"), b"").unwrap();
        let config = Config::new(dir.path()).with_toc_file("other.toc");
        let table = PartitionTable::build(&config).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_empty_toc() {
        let dir = pnor_dir("", &[]);
        let table = PartitionTable::from_directory(dir.path()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.header().size, 1);
        assert_eq!(table.header().block_count, 1);
        assert!(table.partition(0).is_empty());
    }

    #[test]
    fn test_build_is_deterministic() {
        let dir = sample_dir();
        let a = PartitionTable::from_directory(dir.path()).unwrap();
        let b = PartitionTable::from_directory(dir.path()).unwrap();
        assert_eq!(a.native_bytes(), b.native_bytes());
        assert_eq!(a.big_endian_bytes(), b.big_endian_bytes());
    }

    #[test]
    fn test_native_bytes_match_entries() {
        let dir = sample_dir();
        let table = PartitionTable::from_directory(dir.path()).unwrap();
        let native = table.native_bytes();

        assert_eq!(
            TableHeader::decode::<NativeEndian>(native).unwrap(),
            *table.header()
        );
        for (i, entry) in table.entries().iter().enumerate() {
            let offset = HEADER_SIZE + i * ENTRY_SIZE;
            assert_eq!(
                &PartitionEntry::decode::<NativeEndian>(&native[offset..]).unwrap(),
                entry
            );
        }
    }

    #[test]
    fn test_big_endian_form() {
        let dir = pnor_dir(&format!("{HBB_LINE}\n"), &["HBB"]);
        let table = PartitionTable::from_directory(dir.path()).unwrap();
        let be = table.big_endian_bytes();

        assert_eq!(&be[0..4], b"PART");
        assert_eq!(&be[16..20], &1u32.to_be_bytes());
        assert_eq!(&be[44..48], &table.header().checksum.to_be_bytes());

        let hbb = HEADER_SIZE;
        assert_eq!(&be[hbb..hbb + 4], b"HBB\0");
        assert_eq!(&be[hbb + 16..hbb + 20], &1u32.to_be_bytes());
        assert_eq!(&be[hbb + 24..hbb + 28], &[0xFF; 4]);
        // Data partitions are type 1
        assert_eq!(&be[hbb + 32..hbb + 36], &1u32.to_be_bytes());
        assert_eq!(&be[hbb + 36..hbb + 40], &[0; 4]);
        assert_eq!(&be[hbb + 40..hbb + 44], &0x0009_0000u32.to_be_bytes());
        assert_eq!(&be[hbb + 64..hbb + 68], &0x8000_0000u32.to_be_bytes());
    }

    #[test]
    fn test_big_endian_round_trip() {
        let dir = sample_dir();
        let table = PartitionTable::from_directory(dir.path()).unwrap();
        let back = to_native(table.big_endian_bytes()).unwrap();
        assert_eq!(back, table.native_bytes());
    }

    #[test]
    fn test_reload_from_bytes() {
        let dir = sample_dir();
        let table = PartitionTable::from_directory(dir.path()).unwrap();

        let from_be = PartitionTable::from_bytes::<BigEndian>(table.big_endian_bytes()).unwrap();
        assert_eq!(from_be.header(), table.header());
        assert_eq!(from_be.entries(), table.entries());
        assert_eq!(from_be.native_bytes(), table.native_bytes());

        let from_native =
            PartitionTable::from_bytes::<NativeEndian>(table.native_bytes()).unwrap();
        assert_eq!(from_native.big_endian_bytes(), table.big_endian_bytes());
    }

    #[test]
    fn test_reload_detects_corruption() {
        let dir = sample_dir();
        let table = PartitionTable::from_directory(dir.path()).unwrap();

        let mut bytes = table.big_endian_bytes().to_vec();
        // Flip bit 8 of entry 1's size field
        bytes[HEADER_SIZE + ENTRY_SIZE + 22] ^= 0x01;
        assert_eq!(
            PartitionTable::from_bytes::<BigEndian>(&bytes).unwrap_err(),
            FormatError::EntryChecksum {
                index: 1,
                stored: table.entries()[1].checksum,
                computed: table.entries()[1].checksum ^ 0x0000_0100,
            }
        );

        let mut bytes = table.big_endian_bytes().to_vec();
        bytes[0] = b'X';
        assert!(matches!(
            PartitionTable::from_bytes::<BigEndian>(&bytes),
            Err(FormatError::InvalidMagic(_))
        ));
    }

    #[test]
    fn test_lookup() {
        let dir = sample_dir();
        let table = PartitionTable::from_directory(dir.path()).unwrap();
        let block = u64::from(BLOCK_SIZE);

        // The table itself is not a partition
        assert!(table.partition(0).is_empty());

        for entry in table.entries() {
            let range = entry.byte_range();
            assert_eq!(table.partition(range.start), entry);
            assert_eq!(table.partition(range.start + 1), entry);
            assert_eq!(table.partition(range.end - 1), entry);
        }

        let hbb = table.find("HBB").unwrap();
        let hbel = table.find("HBEL").unwrap();
        let end_of_hbb = u64::from(hbb.base + hbb.size) * block;
        assert_eq!(table.partition(end_of_hbb), hbel);

        assert!(table.partition(table.image_size()).is_empty());
        assert!(table.partition(u64::MAX).is_empty());
        assert_eq!(table.partition(u64::MAX), &PartitionEntry::EMPTY);
    }

    #[test]
    fn test_lookup_prefers_first_entry() {
        // A zero length partition covers no block
        let dir = pnor_dir(
            "partition1=EMPTY,1000,1000\npartition2=HBB,0,2000\n",
            &["EMPTY", "HBB"],
        );
        let table = PartitionTable::from_directory(dir.path()).unwrap();
        let empty = table.find("EMPTY").unwrap();
        assert_eq!(empty.size, 0);
        assert_eq!(table.partition(u64::from(empty.base) * 4096).name_str(), "HBB");
    }

    #[test]
    fn test_concurrent_lookup() {
        let dir = sample_dir();
        let table = Arc::new(PartitionTable::from_directory(dir.path()).unwrap());
        let expected = table.find("NVRAM").unwrap().clone();
        let offset = expected.byte_range().start;

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let table = Arc::clone(&table);
                thread::spawn(move || table.partition(offset).clone())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }
}
