//! Stack capture backends and the boundary they leave in a dump.
//!
//! A capture backend produces a textual dump (see `parser::dump`) and knows
//! which frame marks its own machinery, so the filter can cut everything
//! above it.

pub mod unwind;

use crate::parser::Frame;
use crate::utils::error::CaptureError;

pub use unwind::BacktraceCapture;

/// Identifies the frame inserted by the capture routine
pub trait CaptureBoundary {
    fn is_boundary(&self, frame: &Frame) -> bool;
}

impl<F> CaptureBoundary for F
where
    F: Fn(&Frame) -> bool,
{
    fn is_boundary(&self, frame: &Frame) -> bool {
        self(frame)
    }
}

/// Boundary matched on containing module and source file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameMarker {
    pub containing_module: String,
    pub source_file: String,
}

impl FrameMarker {
    pub fn new(containing_module: impl Into<String>, source_file: impl Into<String>) -> Self {
        Self {
            containing_module: containing_module.into(),
            source_file: source_file.into(),
        }
    }

    /// Parse `module/file`, e.g. `capture/unwind.rs`
    pub fn parse(value: &str) -> Option<Self> {
        let (module, file) = value.rsplit_once('/')?;
        if module.is_empty() || file.is_empty() {
            return None;
        }
        Some(Self::new(module, file))
    }
}

impl CaptureBoundary for FrameMarker {
    fn is_boundary(&self, frame: &Frame) -> bool {
        frame.containing_module == self.containing_module && frame.source_file == self.source_file
    }
}

/// Capture primitive: dump every thread the backend can see
pub trait StackCapture: CaptureBoundary {
    fn capture(&self) -> Result<Vec<u8>, CaptureError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_marker_matches_module_and_file() {
        let marker = FrameMarker::parse("capture/unwind.rs").unwrap();
        let hit = Frame::from_symbol("x::walk", Some("/w/src/capture/unwind.rs"), 1);
        let miss = Frame::from_symbol("x::walk", Some("/w/src/other/unwind.rs"), 1);
        assert!(marker.is_boundary(&hit));
        assert!(!marker.is_boundary(&miss));
    }

    #[test]
    fn test_frame_marker_parse_rejects_partial() {
        assert!(FrameMarker::parse("unwind.rs").is_none());
        assert!(FrameMarker::parse("capture/").is_none());
    }

    #[test]
    fn test_closure_boundary() {
        let boundary = |frame: &Frame| frame.func_name == "take_snapshot";
        let frame = Frame::from_symbol("rt::take_snapshot", Some("/w/rt/snap.rs"), 4);
        assert!(boundary.is_boundary(&frame));
    }
}
