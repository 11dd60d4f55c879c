//! Report generation: capture, parse, bucket, filter and render.
//!
//! ```ignore
//! // Print the current thread's stack, grouped and trimmed
//! stack_buckets::print()?;
//!
//! // Or into any writer
//! let mut out = Vec::new();
//! stack_buckets::write_report(&mut out)?;
//! ```

pub mod caller;
pub mod filter;
pub mod hook;

pub use caller::CallInfo;
pub use filter::{FrameFilter, MissingBoundary};

use crate::aggregator::aggregate;
use crate::capture::{BacktraceCapture, StackCapture};
use crate::output::render;
use crate::parser::{DumpParser, Scan, SnapshotParser};
use crate::utils::config::{CALLER_DEPTH, DEFAULT_LIBRARY_PATH, TEST_FILE_SUFFIXES};
use crate::utils::error::ReportError;
use log::debug;
use std::io::{self, BufRead, Write};
use std::panic::Location;

/// Report configuration
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Import path whose production frames are hidden from reports
    pub library_path: String,

    pub missing_boundary: MissingBoundary,

    /// File suffixes that mark test code
    pub test_suffixes: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            library_path: DEFAULT_LIBRARY_PATH.to_string(),
            missing_boundary: MissingBoundary::default(),
            test_suffixes: TEST_FILE_SUFFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ReportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library_path(mut self, library_path: impl Into<String>) -> Self {
        self.library_path = library_path.into();
        self
    }

    pub fn with_missing_boundary(mut self, missing_boundary: MissingBoundary) -> Self {
        self.missing_boundary = missing_boundary;
        self
    }

    pub fn with_test_suffixes<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.test_suffixes = suffixes.into_iter().map(Into::into).collect();
        self
    }
}

/// Parsed dump plus whatever input the parser left unread
#[derive(Debug)]
pub struct Ingested {
    pub scan: Scan,
    pub rest: Vec<u8>,
}

/// Generates reports from a capture backend and a parser
///
/// Holds only configuration, so one reporter can serve concurrent reports.
#[derive(Debug, Clone, Default)]
pub struct Reporter<C = BacktraceCapture, P = DumpParser> {
    config: ReportConfig,
    capture: C,
    parser: P,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: StackCapture, P: SnapshotParser> Reporter<C, P> {
    pub fn with_config(mut self, config: ReportConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_capture<C2: StackCapture>(self, capture: C2) -> Reporter<C2, P> {
        Reporter {
            config: self.config,
            capture,
            parser: self.parser,
        }
    }

    pub fn with_parser<P2: SnapshotParser>(self, parser: P2) -> Reporter<C, P2> {
        Reporter {
            config: self.config,
            capture: self.capture,
            parser,
        }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Write a report for the function calling this method
    ///
    /// **Public** - main entry point for report generation
    ///
    /// # Errors
    /// * `ReportError::Capture` - The backend produced no dump
    /// * `ReportError::Parse` - The dump is malformed; nothing is rendered
    /// * `ReportError::Io` - Writing to `sink` failed
    ///
    /// # Panics
    /// If the calling function cannot be resolved.
    #[track_caller]
    pub fn write_to<W: Write>(&self, sink: W) -> Result<(), ReportError> {
        let caller = CallInfo::resolve(Location::caller(), CALLER_DEPTH);
        self.write_for(&caller, sink)
    }

    /// Write a report on behalf of an already resolved caller
    pub fn write_for<W: Write>(&self, caller: &CallInfo, mut sink: W) -> Result<(), ReportError> {
        let ingested = self.ingest(&mut sink)?;
        let filter = FrameFilter::new(&self.capture, &self.config);
        render_scan(&mut sink, &ingested.scan, &mut ingested.rest.as_slice(), caller, &filter)?;
        sink.flush()?;
        Ok(())
    }

    /// Capture the dump and parse it, forwarding foreign content to `passthrough`
    pub fn ingest(&self, passthrough: &mut dyn Write) -> Result<Ingested, ReportError> {
        let dump = self.capture.capture()?;
        debug!("Captured {} bytes of stack dump", dump.len());

        let mut input = dump.as_slice();
        let scan = self.parser.scan(&mut input, passthrough)?;
        Ok(Ingested {
            scan,
            rest: input.to_vec(),
        })
    }
}

/// Render a dump that was captured elsewhere
///
/// **Public** - used by the `render` command
pub fn report_from_dump(
    parser: &dyn SnapshotParser,
    input: &mut dyn BufRead,
    sink: &mut dyn Write,
    caller: &CallInfo,
    filter: &FrameFilter<'_>,
) -> Result<(), ReportError> {
    let scan = parser.scan(input, sink)?;
    render_scan(sink, &scan, input, caller, filter)
}

/// Render buckets, then the unparsed suffix, then any input left unread
fn render_scan(
    sink: &mut dyn Write,
    scan: &Scan,
    rest: &mut dyn BufRead,
    caller: &CallInfo,
    filter: &FrameFilter<'_>,
) -> Result<(), ReportError> {
    let buckets = aggregate(&scan.snapshot);
    render(sink, &buckets, caller, filter)?;

    if !scan.suffix.is_empty() {
        sink.write_all(&scan.suffix)?;
    }
    if !scan.end_of_stream {
        io::copy(rest, sink)?;
    }
    Ok(())
}

/// Print a report of the current stack to stdout
#[track_caller]
pub fn print() -> Result<(), ReportError> {
    let caller = CallInfo::resolve(Location::caller(), CALLER_DEPTH);
    Reporter::new().write_for(&caller, io::stdout().lock())
}

/// Write a report of the current stack to `sink`
#[track_caller]
pub fn write_report<W: Write>(sink: W) -> Result<(), ReportError> {
    let caller = CallInfo::resolve(Location::caller(), CALLER_DEPTH);
    Reporter::new().write_for(&caller, sink)
}
