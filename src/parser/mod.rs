//! Stack dump parsing and snapshot definitions.
//!
//! This module handles:
//! - Scanning the textual dump a capture backend produces
//! - Forwarding foreign content found before the first thread record
//! - Defining the structured snapshot handed to the aggregator

pub mod dump;
pub mod schema;

// Re-export main types
pub use dump::{DumpParser, DumpWriter, Scan, SnapshotParser};
pub use schema::{split_symbol, Frame, Snapshot, Thread};
