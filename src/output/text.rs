//! Plain-text report renderer.
//!
//! ```text
//! 2: running [Created by thread.Builder::spawn_unchecked_ @ mod.rs:561]
//!     > tests/handlers.rs:40 serve(...)
//!       src/lib.rs:112       poll(...)
//! ```

use crate::aggregator::Bucket;
use crate::parser::Frame;
use crate::report::{CallInfo, FrameFilter};
use crate::utils::config::{ARGS_PLACEHOLDER, ELIDED_LINE, LOCKED_TAG};
use std::io::{self, Write};

/// Render buckets to `out`
///
/// **Public** - main entry point for text output
///
/// The location column is as wide as the longest location across every
/// bucket, so function names line up over the whole report.
pub fn render(
    out: &mut dyn Write,
    buckets: &[Bucket],
    caller: &CallInfo,
    filter: &FrameFilter<'_>,
) -> io::Result<()> {
    let filtered: Vec<Vec<Frame>> = buckets
        .iter()
        .map(|bucket| filter.filter(&bucket.signature.frames))
        .collect();

    let width = filtered
        .iter()
        .flatten()
        .map(|frame| frame.location().chars().count())
        .max()
        .unwrap_or(0);

    for (bucket, frames) in buckets.iter().zip(&filtered) {
        writeln!(out, "{}", format_header(bucket))?;
        for frame in frames {
            writeln!(out, "{}", format_frame(frame, width, caller, filter))?;
        }
        if bucket.signature.elided {
            writeln!(out, "{}", ELIDED_LINE)?;
        }
    }

    Ok(())
}

/// `<count>: <state>[ [sleep]][ [locked]][ [Created by ...]]`
pub fn format_header(bucket: &Bucket) -> String {
    let mut extra = String::new();
    if let Some(sleep) = bucket.sleep_string() {
        extra.push_str(&format!(" [{}]", sleep));
    }
    if bucket.signature.locked {
        extra.push_str(&format!(" [{}]", LOCKED_TAG));
    }
    if let Some(creator) = &bucket.signature.created_by {
        extra.push_str(&format!(
            " [Created by {}.{} @ {}:{}]",
            creator.containing_module, creator.func_name, creator.source_file, creator.line
        ));
    }

    format!("{}: {}{}", bucket.count(), bucket.signature.state, extra)
}

/// One indented frame line with its caller marker
pub fn format_frame(frame: &Frame, width: usize, caller: &CallInfo, filter: &FrameFilter<'_>) -> String {
    let marker = if filter.is_library_frame(frame) {
        ' '
    } else if caller.owns(frame) || frame.is_entry_point {
        '>'
    } else {
        ' '
    };

    format!(
        "    {} {:<width$} {}{}",
        marker,
        frame.location(),
        frame.func_name,
        ARGS_PLACEHOLDER,
        width = width
    )
}
