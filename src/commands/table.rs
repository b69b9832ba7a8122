//! Partition table command implementations

use byteorder::{BigEndian, NativeEndian};
use std::fs;
use std::path::Path;
use vpnor_core::ffs::Permissions;
use vpnor_core::layout::format_size;
use vpnor_core::{Config, PartitionEntry, PartitionTable};

/// Build the table and write one of its serializations to `output`
pub fn cmd_build(
    config: &Config,
    output: &Path,
    native: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let table = PartitionTable::build(config)?;

    let (bytes, order) = if native {
        (table.native_bytes(), "host order")
    } else {
        (table.big_endian_bytes(), "big-endian")
    };
    fs::write(output, bytes)?;

    println!(
        "Wrote {} partition table ({} entries, {} bytes) to {:?}",
        order,
        table.len(),
        bytes.len(),
        output
    );
    Ok(())
}

/// Build the table and print it
pub fn cmd_show(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let table = PartitionTable::build(config)?;
    print_table(&table);
    Ok(())
}

/// Load a stored table and print it
pub fn cmd_show_file(input: &Path, native: bool) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let table = if native {
        PartitionTable::from_bytes::<NativeEndian>(&data)?
    } else {
        PartitionTable::from_bytes::<BigEndian>(&data)?
    };
    print_table(&table);
    Ok(())
}

/// Print the partition covering `offset`
pub fn cmd_lookup(config: &Config, offset: u64) -> Result<(), Box<dyn std::error::Error>> {
    let table = PartitionTable::build(config)?;
    let entry = table.partition(offset);

    if entry.is_empty() {
        println!("No partition at offset {:#010X}", offset);
        return Ok(());
    }

    let range = entry.byte_range();
    println!(
        "Offset {:#010X} is in {} (id {}): {:#010X} - {:#010X}, {:#X} bytes into the partition",
        offset,
        entry.name_str(),
        entry.id,
        range.start,
        range.end - 1,
        offset - range.start
    );
    Ok(())
}

/// Attribute summary for one entry, e.g. "ECC,PRESERVED"
fn attributes(entry: &PartitionEntry) -> String {
    let mut attrs = Vec::new();
    if entry.is_ecc_protected() {
        attrs.push("ECC");
    }
    let perms = entry.permissions();
    if perms.contains(Permissions::READONLY) {
        attrs.push("READONLY");
    }
    if perms.contains(Permissions::PRESERVED) {
        attrs.push("PRESERVED");
    }
    if attrs.is_empty() {
        "-".to_string()
    } else {
        attrs.join(",")
    }
}

/// Print table information
pub fn print_table(table: &PartitionTable) {
    let header = table.header();

    println!("Partition Table");
    println!("===============");
    println!("Version:     {}", header.version);
    println!(
        "Table:       {} blocks of {} bytes",
        header.size, header.block_size
    );
    println!(
        "Image:       {} blocks ({})",
        header.block_count,
        format_size(table.image_size())
    );
    println!("Checksum:    {:#010X}", header.checksum);

    println!("\nPartitions ({}):", table.len());
    println!(
        "{:<16} {:>5} {:>10} {:>10} {:>10} {:>10}  {}",
        "Name", "ID", "Start", "End", "Actual", "Size", "Attributes"
    );
    println!("{:-<86}", "");

    for entry in table.entries() {
        let range = entry.byte_range();
        println!(
            "{:<16} {:>5} {:#010X} {:#010X} {:#010X} {:>10}  {}",
            entry.name_str(),
            entry.id,
            range.start,
            range.end.saturating_sub(1).max(range.start),
            entry.actual,
            format_size(range.end - range.start),
            attributes(entry)
        );
    }
}
