//! Render command implementation.
//!
//! The render command:
//! 1. Reads a saved stack dump (file or stdin)
//! 2. Parses and buckets it
//! 3. Filters frames against an optional capture boundary
//! 4. Writes a text or JSON report

use crate::aggregator::aggregate;
use crate::capture::{CaptureBoundary, FrameMarker};
use crate::output::write_json;
use crate::parser::{DumpParser, Frame, SnapshotParser};
use crate::report::{report_from_dump, CallInfo, FrameFilter, MissingBoundary, ReportConfig};
use crate::utils::config::DEFAULT_LIBRARY_PATH;
use anyhow::{Context, Result};
use log::{debug, info};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Arguments for the render command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct RenderArgs {
    /// Dump to read; `None` reads stdin
    pub input: Option<PathBuf>,

    /// Import path whose production frames are hidden
    pub library_path: String,

    pub format: OutputFormat,

    /// Function whose call chain gets the `>` marker
    pub caller: Option<String>,

    /// Frame that ends the capture machinery; without one every frame is kept
    pub boundary: Option<FrameMarker>,
}

impl Default for RenderArgs {
    fn default() -> Self {
        Self {
            input: None,
            library_path: DEFAULT_LIBRARY_PATH.to_string(),
            format: OutputFormat::Text,
            caller: None,
            boundary: None,
        }
    }
}

/// Execute the render command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Input file cannot be opened
/// * Dump is malformed
/// * Output cannot be written
pub fn execute_render(args: &RenderArgs, out: &mut dyn Write) -> Result<()> {
    let mut input: Box<dyn BufRead> = match &args.input {
        Some(path) => {
            info!("Reading stack dump from: {}", path.display());
            let file = File::open(path)
                .with_context(|| format!("Failed to open dump {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => {
            info!("Reading stack dump from stdin");
            Box::new(io::stdin().lock())
        }
    };

    let no_boundary = |_: &Frame| false;
    let (boundary, missing): (&dyn CaptureBoundary, MissingBoundary) = match &args.boundary {
        Some(marker) => (marker as &dyn CaptureBoundary, MissingBoundary::DropAll),
        None => (&no_boundary as &dyn CaptureBoundary, MissingBoundary::KeepAll),
    };
    let config = ReportConfig::new()
        .with_library_path(args.library_path.clone())
        .with_missing_boundary(missing);
    let filter = FrameFilter::new(boundary, &config);
    let caller = CallInfo::new(args.caller.clone().unwrap_or_default(), "", 0);

    match args.format {
        OutputFormat::Text => {
            report_from_dump(&DumpParser, &mut *input, out, &caller, &filter)
                .context("Failed to render stack dump")?;
        }
        OutputFormat::Json => {
            let scan = DumpParser
                .scan(&mut *input, &mut io::sink())
                .context("Failed to parse stack dump")?;
            if !scan.suffix.is_empty() {
                debug!("Ignoring {} bytes after the snapshot", scan.suffix.len());
            }
            let buckets = aggregate(&scan.snapshot);
            write_json(out, &buckets, &caller, &filter).context("Failed to write JSON report")?;
        }
    }

    out.flush()?;
    Ok(())
}

/// Parse a `--boundary` value (`module/file`)
pub fn parse_boundary(value: &str) -> Result<FrameMarker, String> {
    FrameMarker::parse(value)
        .ok_or_else(|| format!("expected <module>/<file>, got '{}'", value))
}
