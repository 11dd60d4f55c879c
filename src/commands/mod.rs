//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod render;

// Re-export main command functions
pub use render::{execute_render, parse_boundary, OutputFormat, RenderArgs};
