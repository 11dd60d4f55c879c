//! Aggregation of parsed threads into buckets.
//!
//! This module transforms a parsed snapshot into:
//! - One bucket per distinct stack signature
//! - Member thread ids and merged sleep ranges per bucket

pub mod buckets;

// Re-export main types and functions
pub use buckets::{aggregate, Bucket, Signature};
