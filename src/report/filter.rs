//! Drop frames the user never wants to see.

use super::ReportConfig;
use crate::capture::CaptureBoundary;
use crate::parser::Frame;
use log::warn;

/// What to do with a stack that never reaches the capture boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingBoundary {
    /// Drop every frame; the bucket renders as a bare header
    #[default]
    DropAll,

    /// Keep every frame and apply only the remaining steps
    KeepAll,
}

/// Frame filter for one report
pub struct FrameFilter<'a> {
    boundary: &'a dyn CaptureBoundary,
    config: &'a ReportConfig,
}

impl<'a> FrameFilter<'a> {
    pub fn new(boundary: &'a dyn CaptureBoundary, config: &'a ReportConfig) -> Self {
        Self { boundary, config }
    }

    /// Filter one thread's frames, keeping their order
    ///
    /// 1. Drop everything up to and including the first boundary frame.
    /// 2. Drop frames without a containing module.
    /// 3. Drop the library's own production frames.
    pub fn filter(&self, frames: &[Frame]) -> Vec<Frame> {
        let start = match frames.iter().position(|f| self.boundary.is_boundary(f)) {
            Some(idx) => idx + 1,
            None => {
                warn!(
                    "Capture boundary not found in a stack of {} frames ({:?})",
                    frames.len(),
                    self.config.missing_boundary
                );
                match self.config.missing_boundary {
                    MissingBoundary::DropAll => return Vec::new(),
                    MissingBoundary::KeepAll => 0,
                }
            }
        };

        self.retain_user_frames(&frames[start..])
    }

    /// Steps 2 and 3 of `filter`; applying this twice equals applying it once
    pub fn retain_user_frames(&self, frames: &[Frame]) -> Vec<Frame> {
        frames
            .iter()
            .filter(|f| !f.containing_module.is_empty())
            .filter(|f| !self.is_library_frame(f))
            .cloned()
            .collect()
    }

    /// Frame from the library's production code; its test code does not count
    pub fn is_library_frame(&self, frame: &Frame) -> bool {
        let lib = self.config.library_path.as_str();
        let in_library = !lib.is_empty()
            && frame
                .import_path
                .strip_prefix(lib)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"));

        in_library && !frame.is_test_code(&self.config.test_suffixes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::FrameMarker;

    fn frame(symbol: &str, path: &str) -> Frame {
        Frame::from_symbol(symbol, Some(path), 1)
    }

    fn stack() -> Vec<Frame> {
        vec![
            frame("backtrace::trace", "/r/backtrace/src/lib.rs"),
            frame("snap::capture::walk", "/w/snap/src/capture/walk.rs"),
            frame("snap::report::write", "/w/snap/src/report/mod.rs"),
            Frame::from_symbol("app::synthetic", None, 0),
            frame("app::handlers::serve", "/w/app/src/handlers.rs"),
            frame("snap::report::tests::it_filters", "/w/snap/src/report/mod.rs"),
            frame("snap::render_test", "/w/snap/src/render_test.rs"),
            frame("app::main", "/w/app/src/main.rs"),
        ]
    }

    fn config() -> ReportConfig {
        ReportConfig::default().with_library_path("snap")
    }

    #[test]
    fn test_filter_steps() {
        let marker = FrameMarker::new("capture", "walk.rs");
        let config = config();
        let filter = FrameFilter::new(&marker, &config);

        let kept: Vec<String> = filter
            .filter(&stack())
            .iter()
            .map(Frame::qualified_name)
            .collect();
        assert_eq!(
            kept,
            vec![
                "app::handlers::serve",
                "snap::report::tests::it_filters",
                "snap::render_test",
                "app::main",
            ]
        );
    }

    #[test]
    fn test_missing_boundary_policies() {
        let marker = FrameMarker::new("nowhere", "none.rs");
        let config = config();
        assert!(FrameFilter::new(&marker, &config).filter(&stack()).is_empty());

        let config = config.with_missing_boundary(MissingBoundary::KeepAll);
        let kept = FrameFilter::new(&marker, &config).filter(&stack());
        assert_eq!(kept.len(), 5);
        assert_eq!(kept[0].qualified_name(), "backtrace::trace");
    }

    #[test]
    fn test_retain_user_frames_is_a_projection() {
        let marker = FrameMarker::new("capture", "walk.rs");
        let config = config();
        let filter = FrameFilter::new(&marker, &config);

        let once = filter.retain_user_frames(&stack());
        let twice = filter.retain_user_frames(&once);
        assert_eq!(once, twice);

        let filtered = filter.filter(&stack());
        assert_eq!(filter.retain_user_frames(&filtered), filtered);
    }

    #[test]
    fn test_library_path_is_segment_matched() {
        let marker = FrameMarker::new("capture", "walk.rs");
        let config = config();
        let filter = FrameFilter::new(&marker, &config);

        assert!(filter.is_library_frame(&frame("snap::report::write", "/w/snap/src/report/mod.rs")));
        assert!(filter.is_library_frame(&frame("snap::write", "/w/snap/src/lib.rs")));
        assert!(!filter.is_library_frame(&frame("snapper::write", "/w/snapper/src/lib.rs")));
    }
}
