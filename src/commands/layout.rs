//! Layout command implementation

use std::path::Path;
use vpnor_core::layout::Layout;
use vpnor_core::{Config, PartitionTable};

/// Export the image layout of a freshly built table
pub fn cmd_layout(
    config: &Config,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let table = PartitionTable::build(config)?;
    let layout = Layout::from_table(&table);

    if let Some(out) = output {
        layout.to_toml_file(out)?;
        println!("Saved layout to {:?}", out);
    } else {
        print!("{}", layout.to_toml_string());
    }

    Ok(())
}
