//! vpnor - Virtual PNOR partition table tool
//!
//! Builds the FFS partition table that a virtual PNOR flash presents to the
//! host firmware, from a directory holding a table of contents and one file
//! per partition.
//!
//! # Commands
//!
//! - `build`  - write the table (big-endian by default) to a file
//! - `show`   - print the header and entries of a built or stored table
//! - `lookup` - report which partition covers a flash offset
//! - `layout` - export the image layout as a TOML layout file

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::Build {
            source,
            output,
            native,
        } => commands::table::cmd_build(&source.config(), &output, native),
        Commands::Show {
            source,
            input,
            native,
        } => match input {
            Some(path) => commands::table::cmd_show_file(&path, native),
            None => commands::table::cmd_show(&source.config()),
        },
        Commands::Lookup { source, offset } => {
            commands::table::cmd_lookup(&source.config(), offset)
        }
        Commands::Layout { source, output } => {
            commands::layout::cmd_layout(&source.config(), output.as_deref())
        }
    }
}
