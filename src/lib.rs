//! Synthetic NetFlow v5 traffic generation, to exercise flow collectors without any real
//! network capture.

/// Generator configuration
pub mod config;
/// Errors of the generator
pub mod error;
/// Wire structures of NetFlow v5
pub mod structs;
/// Generation statistics
pub mod ui;

/// Scheduling of the PDUs
pub mod stage0;
/// Flow statistics generation
pub mod stage1;
/// PDU encoding
pub mod stage2;
/// Export to a collector
pub mod stage3;

pub use error::Error;
