//! FFS partition table records
//!
//! A PNOR partition table is a fixed-size header followed by fixed-size
//! partition entries. Every field is a 32-bit word except the entry name,
//! which is a 16-byte NUL-terminated string.
//!
//! Records are plain values. They are serialized field by field through a
//! [`byteorder::ByteOrder`], so the same record can be written in host order
//! for in-process use or in big-endian order for the host firmware, without
//! depending on the memory layout of the Rust types.
//!
//! Checksums XOR the logical field values, with the name read as big-endian
//! words, so one stored value verifies both serializations. On little-endian
//! hosts this differs from XORing the raw words of the host-order record.
//!
//! ```text
//! header (48 bytes)
//!   magic version size entry_size entry_count block_size block_count
//!   reserved[4] checksum
//! entry (128 bytes)
//!   name[16] base size pid id type flags actual reserved[4] user[16] checksum
//! ```

use std::borrow::Cow;
use std::ops::Range;

use bitflags::bitflags;
use byteorder::{BigEndian, ByteOrder};

use crate::error::FormatError;

/// Header magic: "PART"
pub const PARTITION_HEADER_MAGIC: u32 = 0x5041_5254;

/// The only table version produced and accepted
pub const PARTITION_VERSION_1: u32 = 1;

/// Maximum name length, excluding the terminating NUL
pub const PARTITION_NAME_MAX: usize = 15;

/// Number of user data words in an entry
pub const PARTITION_USER_WORDS: usize = 16;

/// Number of reserved words in the header and in each entry
pub const PARTITION_RESERVED_WORDS: usize = 4;

/// Parent id of every entry, there is no partition hierarchy
pub const PARENT_PARTITION_ID: u32 = 0xFFFF_FFFF;

/// Entry type for data partitions
pub const PARTITION_TYPE_DATA: u32 = 1;

/// User word 0 value of ECC protected partitions
pub const PARTITION_ECC_PROTECTED: u32 = 0x8000;

/// Erase block size of the emulated PNOR
pub const BLOCK_SIZE: u32 = 4096;

/// Serialized size of [`TableHeader`]
pub const HEADER_SIZE: usize = 4 * (7 + PARTITION_RESERVED_WORDS + 1);

/// Serialized size of [`PartitionEntry`]
pub const ENTRY_SIZE: usize =
    NAME_FIELD_SIZE + 4 * (7 + PARTITION_RESERVED_WORDS + PARTITION_USER_WORDS + 1);

const NAME_FIELD_SIZE: usize = PARTITION_NAME_MAX + 1;
const HEADER_WORDS: usize = HEADER_SIZE / 4;
const ENTRY_WORDS: usize = (ENTRY_SIZE - NAME_FIELD_SIZE) / 4;

bitflags! {
    /// Permission bits kept in user data word 1
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u32 {
        /// Host firmware must not write the partition
        const READONLY  = 0x4000_0000;
        /// Contents survive a code update
        const PRESERVED = 0x8000_0000;
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Permissions::empty()
    }
}

/// XOR of a sequence of 32-bit words
///
/// This is the integrity value stored after every header and entry.
pub fn checksum(words: impl IntoIterator<Item = u32>) -> u32 {
    words.into_iter().fold(0, |acc, word| acc ^ word)
}

/// Round `value` up to a whole number of blocks, returned in blocks
pub fn blocks_for(value: u64) -> u64 {
    value.div_ceil(u64::from(BLOCK_SIZE))
}

/// Partition table header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableHeader {
    /// [`PARTITION_HEADER_MAGIC`]
    pub magic: u32,
    /// [`PARTITION_VERSION_1`]
    pub version: u32,
    /// Size of the table itself in blocks
    pub size: u32,
    /// Size of one entry record in bytes
    pub entry_size: u32,
    /// Number of valid entries following the header
    pub entry_count: u32,
    /// Block size in bytes
    pub block_size: u32,
    /// Size of the whole image (table plus partitions) in blocks
    pub block_count: u32,
    /// Reserved, zero
    pub reserved: [u32; PARTITION_RESERVED_WORDS],
    /// Checksum over all of the above
    pub checksum: u32,
}

impl TableHeader {
    fn data_words(&self) -> impl Iterator<Item = u32> {
        [
            self.magic,
            self.version,
            self.size,
            self.entry_size,
            self.entry_count,
            self.block_size,
            self.block_count,
        ]
        .into_iter()
        .chain(self.reserved)
    }

    /// Checksum over the header fields, ignoring the stored checksum
    pub fn compute_checksum(&self) -> u32 {
        checksum(self.data_words())
    }

    /// Store the checksum of the current field values
    pub fn seal(&mut self) {
        self.checksum = self.compute_checksum();
    }

    /// Whether the stored checksum matches the fields
    pub fn is_checksum_valid(&self) -> bool {
        self.checksum == self.compute_checksum()
    }

    /// Serialize with byte order `B`
    pub fn encode<B: ByteOrder>(&self) -> [u8; HEADER_SIZE] {
        let mut words = [0u32; HEADER_WORDS];
        for (slot, word) in words
            .iter_mut()
            .zip(self.data_words().chain([self.checksum]))
        {
            *slot = word;
        }

        let mut buf = [0u8; HEADER_SIZE];
        B::write_u32_into(&words, &mut buf);
        buf
    }

    /// Deserialize from the start of `bytes` with byte order `B`
    ///
    /// No field is validated here, see [`TableHeader::validate`].
    pub fn decode<B: ByteOrder>(bytes: &[u8]) -> Result<Self, FormatError> {
        let raw = bytes.get(..HEADER_SIZE).ok_or(FormatError::Truncated {
            needed: HEADER_SIZE,
            available: bytes.len(),
        })?;

        let mut w = [0u32; HEADER_WORDS];
        B::read_u32_into(raw, &mut w);

        Ok(Self {
            magic: w[0],
            version: w[1],
            size: w[2],
            entry_size: w[3],
            entry_count: w[4],
            block_size: w[5],
            block_count: w[6],
            reserved: [w[7], w[8], w[9], w[10]],
            checksum: w[11],
        })
    }

    /// Check that this header describes a table this crate can use
    pub fn validate(&self) -> Result<(), FormatError> {
        if self.magic != PARTITION_HEADER_MAGIC {
            return Err(FormatError::InvalidMagic(self.magic));
        }
        if self.version != PARTITION_VERSION_1 {
            return Err(FormatError::UnsupportedVersion(self.version));
        }
        if self.entry_size as usize != ENTRY_SIZE {
            return Err(FormatError::UnsupportedEntrySize(self.entry_size));
        }
        if self.block_size != BLOCK_SIZE {
            return Err(FormatError::UnsupportedBlockSize(self.block_size));
        }
        let computed = self.compute_checksum();
        if self.checksum != computed {
            return Err(FormatError::HeaderChecksum {
                stored: self.checksum,
                computed,
            });
        }
        Ok(())
    }

    /// Number of bytes covered by the header and its valid entries
    pub fn used_bytes(&self) -> usize {
        HEADER_SIZE.saturating_add((self.entry_count as usize).saturating_mul(ENTRY_SIZE))
    }
}

/// One partition entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionEntry {
    /// NUL-padded name, byte 15 is always NUL once serialized
    pub name: [u8; PARTITION_NAME_MAX + 1],
    /// First block of the partition in the image
    pub base: u32,
    /// Length in blocks
    pub size: u32,
    /// Parent partition id
    pub pid: u32,
    /// Partition id from the TOC
    pub id: u32,
    /// Partition type
    pub part_type: u32,
    /// Reserved flags, zero
    pub flags: u32,
    /// Exact length in bytes
    pub actual: u32,
    /// Reserved, zero
    pub reserved: [u32; PARTITION_RESERVED_WORDS],
    /// User data: word 0 holds the ECC marker, word 1 the permissions
    pub user: [u32; PARTITION_USER_WORDS],
    /// Checksum over all of the above
    pub checksum: u32,
}

impl PartitionEntry {
    /// All-zero entry, returned by lookups that find nothing
    pub const EMPTY: Self = Self {
        name: [0; PARTITION_NAME_MAX + 1],
        base: 0,
        size: 0,
        pid: 0,
        id: 0,
        part_type: 0,
        flags: 0,
        actual: 0,
        reserved: [0; PARTITION_RESERVED_WORDS],
        user: [0; PARTITION_USER_WORDS],
        checksum: 0,
    };

    // The name enters the checksum as big-endian words so that the value is
    // the same whichever byte order the entry is serialized in.
    fn data_words(&self) -> impl Iterator<Item = u32> + '_ {
        self.name
            .chunks_exact(4)
            .map(BigEndian::read_u32)
            .chain([
                self.base,
                self.size,
                self.pid,
                self.id,
                self.part_type,
                self.flags,
                self.actual,
            ])
            .chain(self.reserved)
            .chain(self.user)
    }

    /// Checksum over the entry fields, ignoring the stored checksum
    pub fn compute_checksum(&self) -> u32 {
        checksum(self.data_words())
    }

    /// Store the checksum of the current field values
    pub fn seal(&mut self) {
        self.checksum = self.compute_checksum();
    }

    /// Whether the stored checksum matches the fields
    pub fn is_checksum_valid(&self) -> bool {
        self.checksum == self.compute_checksum()
    }

    /// Serialize with byte order `B`
    ///
    /// Name bytes are copied as they are and terminated at the last byte of
    /// the field.
    pub fn encode<B: ByteOrder>(&self) -> [u8; ENTRY_SIZE] {
        let mut buf = [0u8; ENTRY_SIZE];
        buf[..NAME_FIELD_SIZE].copy_from_slice(&self.name);
        buf[PARTITION_NAME_MAX] = 0;

        let mut words = [0u32; ENTRY_WORDS];
        let fields = self
            .data_words()
            .skip(NAME_FIELD_SIZE / 4)
            .chain([self.checksum]);
        for (slot, word) in words.iter_mut().zip(fields) {
            *slot = word;
        }
        B::write_u32_into(&words, &mut buf[NAME_FIELD_SIZE..]);
        buf
    }

    /// Deserialize from the start of `bytes` with byte order `B`
    pub fn decode<B: ByteOrder>(bytes: &[u8]) -> Result<Self, FormatError> {
        let raw = bytes.get(..ENTRY_SIZE).ok_or(FormatError::Truncated {
            needed: ENTRY_SIZE,
            available: bytes.len(),
        })?;

        let mut name = [0u8; NAME_FIELD_SIZE];
        name.copy_from_slice(&raw[..NAME_FIELD_SIZE]);

        let mut w = [0u32; ENTRY_WORDS];
        B::read_u32_into(&raw[NAME_FIELD_SIZE..], &mut w);

        let mut reserved = [0u32; PARTITION_RESERVED_WORDS];
        reserved.copy_from_slice(&w[7..11]);
        let mut user = [0u32; PARTITION_USER_WORDS];
        user.copy_from_slice(&w[11..27]);

        Ok(Self {
            name,
            base: w[0],
            size: w[1],
            pid: w[2],
            id: w[3],
            part_type: w[4],
            flags: w[5],
            actual: w[6],
            reserved,
            user,
            checksum: w[27],
        })
    }

    /// Name up to the first NUL
    pub fn name_str(&self) -> Cow<'_, str> {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.name.len());
        String::from_utf8_lossy(&self.name[..end])
    }

    /// Permission bits from user word 1
    pub fn permissions(&self) -> Permissions {
        Permissions::from_bits_truncate(self.user[1])
    }

    /// Whether user word 0 marks the partition as ECC protected
    pub fn is_ecc_protected(&self) -> bool {
        self.user[0] & PARTITION_ECC_PROTECTED != 0
    }

    /// True for the zero-sized lookup sentinel
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Whether image block `block` lies in `[base, base + size)`
    pub fn contains_block(&self, block: u64) -> bool {
        let base = u64::from(self.base);
        block >= base && block < base + u64::from(self.size)
    }

    /// Byte range of the partition in the image, block aligned
    pub fn byte_range(&self) -> Range<u64> {
        let block = u64::from(BLOCK_SIZE);
        let start = u64::from(self.base) * block;
        start..start + u64::from(self.size) * block
    }
}

impl Default for PartitionEntry {
    fn default() -> Self {
        Self::EMPTY
    }
}
