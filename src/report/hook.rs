//! Report on panic.
//!
//! The hook runs at the panic site, before unwinding, so the panicking
//! frames are still on the stack when the report is captured.

use super::{CallInfo, Reporter};
use crate::capture::StackCapture;
use crate::parser::SnapshotParser;
use log::error;
use std::io::{self, Write};
use std::panic;

/// Install a panic hook that writes a report to stderr
///
/// The previously installed hook runs first, so the panic message still
/// precedes the report.
pub fn install<C, P>(reporter: Reporter<C, P>)
where
    C: StackCapture + Send + Sync + 'static,
    P: SnapshotParser + Send + Sync + 'static,
{
    install_with(reporter, io::stderr);
}

/// Install a panic hook that writes a report to the sink `make_sink` returns
///
/// The panic location stands in for the caller, so the panicking function's
/// call chain is the one marked.
pub fn install_with<C, P, F, W>(reporter: Reporter<C, P>, make_sink: F)
where
    C: StackCapture + Send + Sync + 'static,
    P: SnapshotParser + Send + Sync + 'static,
    F: Fn() -> W + Send + Sync + 'static,
    W: Write,
{
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        previous(info);

        let caller = info
            .location()
            .map(|location| CallInfo::locate(location).unwrap_or_else(|| CallInfo::unnamed(location)))
            .unwrap_or_default();

        if let Err(err) = reporter.write_for(&caller, make_sink()) {
            error!("Failed to write stack report: {}", err);
        }
    }));
}
