//! Stack Buckets
//!
//! Deduplicated, human-readable stack reports. Threads whose call stacks
//! are identical are grouped into one bucket, printed once with a count.
//! Capture machinery and this library's own frames are filtered out, and
//! frames belonging to the caller's call chain are marked with `>`.
//!
//! ## Getting Started
//!
//! ```ignore
//! // Report the current stack to stdout
//! stack_buckets::print()?;
//!
//! // Report every panic to stderr
//! stack_buckets::hook::install(stack_buckets::Reporter::new());
//! ```
//!
//! Saved dumps can be rendered with the `buckets` CLI:
//!
//! ```bash
//! buckets render --input dump.txt
//! ```

pub mod aggregator;
pub mod capture;
pub mod commands;
pub mod output;
pub mod parser;
pub mod report;
pub mod utils;

pub use report::{hook, print, write_report, CallInfo, ReportConfig, Reporter};
