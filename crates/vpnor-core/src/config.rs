//! Location of the TOC and partition files

use std::path::{Path, PathBuf};

/// Directory holding the TOC and the partition files on the BMC
pub const DEFAULT_DIRECTORY: &str = "/var/lib/phosphor-software-manager/pnor/ro";

/// Name of the TOC file inside the directory
pub const DEFAULT_TOC_FILE: &str = "pnor.toc";

/// Where a partition table is built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory containing the TOC and one file per partition
    pub directory: PathBuf,
    /// File name of the TOC within `directory`
    pub toc_file: String,
}

impl Config {
    /// Use `directory` with the default TOC file name
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            toc_file: DEFAULT_TOC_FILE.to_string(),
        }
    }

    /// Override the TOC file name
    pub fn with_toc_file(mut self, toc_file: impl Into<String>) -> Self {
        self.toc_file = toc_file.into();
        self
    }

    /// Full path of the TOC
    pub fn toc_path(&self) -> PathBuf {
        self.directory.join(&self.toc_file)
    }

    /// Full path of the backing file for partition `name`
    pub fn partition_path(&self, name: &str) -> PathBuf {
        self.directory.join(name)
    }

    /// Directory containing the partition files
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_DIRECTORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let config = Config::default();
        assert_eq!(
            config.toc_path(),
            Path::new("/var/lib/phosphor-software-manager/pnor/ro/pnor.toc")
        );
        assert_eq!(
            config.partition_path("HBB"),
            Path::new("/var/lib/phosphor-software-manager/pnor/ro/HBB")
        );
    }

    #[test]
    fn test_custom_toc_file() {
        let config = Config::new("/tmp/pnor").with_toc_file("test.toc");
        assert_eq!(config.toc_path(), Path::new("/tmp/pnor/test.toc"));
        assert_eq!(config.directory(), Path::new("/tmp/pnor"));
    }
}
