//! Byte order conversion of serialized tables
//!
//! The table is assembled in host order. The host firmware reads it in
//! big-endian order, so a converted copy is produced once the table is
//! complete. Every word of the header and of each valid entry is converted;
//! stored checksums are carried over rather than recomputed, which works
//! because the checksum is a XOR of the logical field values.

use byteorder::{BigEndian, ByteOrder, NativeEndian};

use crate::error::FormatError;
use crate::ffs::{PartitionEntry, TableHeader, ENTRY_SIZE, HEADER_SIZE};

/// Copy a table from byte order `S` to byte order `D`
///
/// The output has the same length as `src`. Only the header and the
/// `entry_count` entries it announces are converted, any space after them
/// stays zero. Name fields are copied byte for byte and NUL-terminated.
pub fn convert<S: ByteOrder, D: ByteOrder>(src: &[u8]) -> Result<Vec<u8>, FormatError> {
    let header = TableHeader::decode::<S>(src)?;
    let used = header.used_bytes();
    if src.len() < used {
        return Err(FormatError::Truncated {
            needed: used,
            available: src.len(),
        });
    }

    let mut out = vec![0u8; src.len()];
    out[..HEADER_SIZE].copy_from_slice(&header.encode::<D>());

    let records = src[HEADER_SIZE..used].chunks_exact(ENTRY_SIZE);
    let slots = out[HEADER_SIZE..used].chunks_exact_mut(ENTRY_SIZE);
    for (record, slot) in records.zip(slots) {
        slot.copy_from_slice(&PartitionEntry::decode::<S>(record)?.encode::<D>());
    }

    Ok(out)
}

/// Big-endian copy of a host-order table
pub fn to_big_endian(native: &[u8]) -> Result<Vec<u8>, FormatError> {
    convert::<NativeEndian, BigEndian>(native)
}

/// Host-order copy of a big-endian table
pub fn to_native(big_endian: &[u8]) -> Result<Vec<u8>, FormatError> {
    convert::<BigEndian, NativeEndian>(big_endian)
}
