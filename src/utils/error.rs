//! Error types for the entire library.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors that can occur while taking a stack dump
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("No frames could be captured")]
    EmptyStack,

    #[error("Failed to write stack dump: {0}")]
    WriteFailed(#[from] std::io::Error),
}

/// Errors that can occur while scanning a stack dump
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to read stack dump: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed stack dump at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    /// Writing foreign content to the pass-through sink failed
    #[error("Failed to forward dump content: {0}")]
    Forward(#[source] std::io::Error),
}

impl ParseError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::Malformed {
            line,
            reason: reason.into(),
        }
    }
}

/// Errors that can occur during report output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write report: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Errors surfaced by report generation
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Stack capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("Stack dump could not be parsed: {0}")]
    Parse(#[source] ParseError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Forwarding failures are sink errors, not parse errors
impl From<ParseError> for ReportError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Forward(io) => Self::Io(io),
            other => Self::Parse(other),
        }
    }
}
