//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vpnor_core::config::{DEFAULT_DIRECTORY, DEFAULT_TOC_FILE};
use vpnor_core::Config;

/// Parse a string as a hex or decimal u64
fn parse_offset(s: &str) -> Result<u64, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u64>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "vpnor")]
#[command(author, version, about = "Virtual PNOR partition table tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where to find the TOC and partition files
#[derive(clap::Args, Debug, Clone)]
pub struct SourceArgs {
    /// Directory containing the TOC and partition files
    #[arg(short, long, default_value = DEFAULT_DIRECTORY)]
    pub dir: PathBuf,

    /// TOC file name inside the directory
    #[arg(long, default_value = DEFAULT_TOC_FILE)]
    pub toc: String,
}

impl SourceArgs {
    /// Build configuration from the arguments
    pub fn config(&self) -> Config {
        Config::new(&self.dir).with_toc_file(&self.toc)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the partition table and write it to a file
    Build {
        #[command(flatten)]
        source: SourceArgs,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Write the host byte order table instead of big-endian
        #[arg(long)]
        native: bool,
    },

    /// Show the entries of a partition table
    Show {
        #[command(flatten)]
        source: SourceArgs,

        /// Read a previously written table instead of building one
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// The input table is in host byte order
        #[arg(long, requires = "input")]
        native: bool,
    },

    /// Find the partition covering a flash offset
    Lookup {
        #[command(flatten)]
        source: SourceArgs,

        /// Offset into the image (hex with 0x prefix, or decimal)
        #[arg(value_parser = parse_offset)]
        offset: u64,
    },

    /// Export the image layout as a TOML layout file
    Layout {
        #[command(flatten)]
        source: SourceArgs,

        /// Output layout file (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
