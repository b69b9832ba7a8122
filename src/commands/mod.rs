//! CLI command implementations
//!
//! Every command builds (or loads) a [`vpnor_core::PartitionTable`] and
//! reports on it. Build failures are returned to `main`, which exits with a
//! non-zero status.

pub mod layout;
pub mod table;
