//! Report writers.
//!
//! This module handles rendering aggregated buckets:
//! - Aligned plain text (the default report)
//! - JSON documents for tooling

pub mod json;
pub mod text;

// Re-export main functions
pub use json::{to_json_report, write_json, JsonReport};
pub use text::{format_frame, format_header, render};
