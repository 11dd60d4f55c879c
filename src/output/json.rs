//! JSON report writer.
//!
//! Carries the same buckets and filtered frames as the text report, for
//! tooling that wants structure instead of aligned text.

use crate::aggregator::Bucket;
use crate::report::{CallInfo, FrameFilter};
use crate::utils::config::SCHEMA_VERSION;
use crate::utils::error::OutputError;
use log::debug;
use serde::Serialize;
use std::io::Write;

/// Top-level JSON document
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport {
    /// Schema version for compatibility checking
    pub version: String,

    /// Timestamp when the report was generated
    pub generated_at: String,

    pub caller: CallInfo,

    pub buckets: Vec<JsonBucket>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonBucket {
    pub count: usize,
    pub ids: Vec<u64>,
    pub state: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep: Option<String>,

    pub locked: bool,
    pub elided: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,

    pub frames: Vec<JsonFrame>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonFrame {
    pub location: String,
    pub function: String,
    pub import_path: String,

    /// Part of the caller's own call chain or the entry point
    pub marked: bool,
}

/// Build the JSON document for `buckets`
pub fn to_json_report(buckets: &[Bucket], caller: &CallInfo, filter: &FrameFilter<'_>) -> JsonReport {
    let buckets = buckets
        .iter()
        .map(|bucket| JsonBucket {
            count: bucket.count(),
            ids: bucket.ids.clone(),
            state: bucket.signature.state.clone(),
            sleep: bucket.sleep_string(),
            locked: bucket.signature.locked,
            elided: bucket.signature.elided,
            created_by: bucket.signature.created_by.as_ref().map(|creator| {
                format!("{} @ {}", creator.qualified_name(), creator.location())
            }),
            frames: filter
                .filter(&bucket.signature.frames)
                .into_iter()
                .map(|frame| JsonFrame {
                    location: frame.location(),
                    marked: !filter.is_library_frame(&frame)
                        && (caller.owns(&frame) || frame.is_entry_point),
                    function: frame.func_name,
                    import_path: frame.import_path,
                })
                .collect(),
        })
        .collect();

    JsonReport {
        version: SCHEMA_VERSION.to_string(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        caller: caller.clone(),
        buckets,
    }
}

/// Write buckets as pretty-printed JSON
///
/// # Errors
/// * `OutputError::SerializationFailed` - JSON serialization or write error
/// * `OutputError::WriteFailed` - I/O error on the trailing newline
pub fn write_json(
    out: &mut dyn Write,
    buckets: &[Bucket],
    caller: &CallInfo,
    filter: &FrameFilter<'_>,
) -> Result<(), OutputError> {
    let report = to_json_report(buckets, caller, filter);
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;

    debug!("Wrote JSON report with {} buckets", report.buckets.len());
    Ok(())
}
