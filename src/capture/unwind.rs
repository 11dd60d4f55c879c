//! Current-thread capture built on the `backtrace` crate.

use super::{CaptureBoundary, StackCapture};
use crate::parser::{split_symbol, DumpWriter, Frame};
use crate::utils::config::{
    MAX_CAPTURE_DEPTH, RUNNING_STATE, RUNTIME_START_PATH, SHORT_BACKTRACE_FN, THREAD_SPAWN_SYMBOLS,
};
use crate::utils::error::CaptureError;
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_ID: u64 = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
}

/// Dumps the invoking thread's stack
///
/// The standard library cannot walk other threads, so the dump always holds
/// exactly one thread record. The walk ends at `__rust_begin_short_backtrace`;
/// the frame just outside it is reported as the creation site instead of as
/// a frame. On the main thread that frame is the runtime start and no
/// creation site is reported.
#[derive(Debug, Clone)]
pub struct BacktraceCapture {
    max_depth: usize,
}

impl Default for BacktraceCapture {
    fn default() -> Self {
        Self {
            max_depth: MAX_CAPTURE_DEPTH,
        }
    }
}

impl BacktraceCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl CaptureBoundary for BacktraceCapture {
    fn is_boundary(&self, frame: &Frame) -> bool {
        frame.import_path == module_path!() && frame.source_file == "unwind.rs"
    }
}

impl StackCapture for BacktraceCapture {
    fn capture(&self) -> Result<Vec<u8>, CaptureError> {
        let walked = walk_stack(self.max_depth);
        if walked.frames.is_empty() {
            return Err(CaptureError::EmptyStack);
        }

        debug!(
            "Captured {} frames (elided: {})",
            walked.frames.len(),
            walked.elided
        );

        let mut dump = DumpWriter::new(Vec::new());
        dump.header(current_thread_id(), RUNNING_STATE, None, false)?;
        for frame in &walked.frames {
            dump.frame(&frame.symbol, "...", frame.path.as_deref(), frame.line)?;
        }
        if walked.elided {
            dump.elided()?;
        }
        if let Some(spawn) = &walked.spawned_at {
            dump.created_by(&spawn.symbol, spawn.path.as_deref(), spawn.line)?;
        }
        dump.end_thread()?;

        Ok(dump.into_inner())
    }
}

struct RawFrame {
    symbol: String,
    path: Option<String>,
    line: u32,
}

impl RawFrame {
    /// `(module path, function name)` of the resolved symbol
    fn split(&self) -> (String, String) {
        split_symbol(&self.symbol)
    }

    fn is_short_backtrace(&self) -> bool {
        let (_, func_name) = self.split();
        func_name.split("::").next() == Some(SHORT_BACKTRACE_FN)
    }

    fn is_thread_spawn(&self) -> bool {
        THREAD_SPAWN_SYMBOLS
            .iter()
            .any(|prefix| self.symbol.starts_with(prefix))
    }

    fn is_runtime_start(&self) -> bool {
        let (import_path, _) = self.split();
        import_path
            .strip_prefix(RUNTIME_START_PATH)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    }
}

struct Walked {
    frames: Vec<RawFrame>,
    spawned_at: Option<RawFrame>,
    elided: bool,

    /// Passed `__rust_begin_short_backtrace`; the next frame is the creator
    anchored: bool,
}

/// Walk and resolve the current stack, innermost first
///
/// Inlined calls resolve to several symbols for one frame; each becomes its
/// own entry.
#[inline(never)]
fn walk_stack(max_depth: usize) -> Walked {
    let mut walked = Walked {
        frames: Vec::new(),
        spawned_at: None,
        elided: false,
        anchored: false,
    };

    backtrace::trace(|frame| {
        let mut resolved = Vec::new();
        backtrace::resolve_frame(frame, |symbol| {
            let name = symbol
                .name()
                .map(|name| format!("{:#}", name))
                .unwrap_or_else(|| "<unknown>".to_string());
            resolved.push(RawFrame {
                symbol: name,
                path: symbol.filename().map(|p| p.to_string_lossy().into_owned()),
                line: symbol.lineno().unwrap_or(0),
            });
        });

        for raw in resolved {
            if walked.anchored {
                if !raw.is_runtime_start() {
                    walked.spawned_at = Some(raw);
                }
                return false;
            }
            if raw.is_short_backtrace() {
                walked.anchored = true;
                continue;
            }
            if raw.is_thread_spawn() {
                walked.spawned_at = Some(raw);
                return false;
            }
            if walked.frames.len() == max_depth {
                walked.elided = true;
                return false;
            }
            walked.frames.push(raw);
        }
        true
    });

    walked
}

fn current_thread_id() -> u64 {
    THREAD_ID.with(|id| *id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{DumpParser, SnapshotParser};

    fn scan(bytes: &[u8]) -> crate::parser::Scan {
        let mut input = bytes;
        DumpParser.scan(&mut input, &mut std::io::sink()).unwrap()
    }

    #[test]
    fn test_capture_scans_back_with_boundary() {
        let capture = BacktraceCapture::new();
        let scan = scan(&capture.capture().unwrap());

        assert!(scan.end_of_stream);
        assert_eq!(scan.snapshot.threads.len(), 1);
        let thread = &scan.snapshot.threads[0];
        assert_eq!(thread.state, RUNNING_STATE);
        assert!(thread.frames.iter().any(|f| capture.is_boundary(f)));
    }

    #[test]
    fn test_depth_limit_marks_elided() {
        let capture = BacktraceCapture::new().with_max_depth(2);
        let scan = scan(&capture.capture().unwrap());
        let thread = &scan.snapshot.threads[0];
        assert_eq!(thread.frames.len(), 2);
        assert!(thread.elided);
    }

    fn raw(symbol: &str) -> RawFrame {
        RawFrame {
            symbol: symbol.to_string(),
            path: None,
            line: 0,
        }
    }

    #[test]
    fn test_anchor_and_spawn_symbols() {
        assert!(raw("std::sys::backtrace::__rust_begin_short_backtrace").is_short_backtrace());
        assert!(raw("std::sys::backtrace::__rust_begin_short_backtrace::<F, ()>").is_short_backtrace());
        assert!(raw("test::__rust_begin_short_backtrace").is_short_backtrace());
        assert!(!raw("app::begin_short").is_short_backtrace());

        assert!(raw("std::thread::Builder::spawn_unchecked_::{{closure}}").is_thread_spawn());
        assert!(raw("std::thread::lifecycle::spawn_unchecked::{{closure}}").is_thread_spawn());

        assert!(raw("std::rt::lang_start::{{closure}}").is_runtime_start());
        assert!(raw("std::rt::lang_start::<()>::{closure#0}").is_runtime_start());
        assert!(!raw("std::rtx::start").is_runtime_start());
    }

    #[test]
    fn test_spawned_thread_records_creation_site() {
        let bytes = std::thread::spawn(|| BacktraceCapture::new().capture().unwrap())
            .join()
            .unwrap();
        let scan = scan(&bytes);
        let thread = &scan.snapshot.threads[0];

        assert!(thread.created_by.is_some());
        assert!(thread
            .frames
            .iter()
            .all(|f| !f.qualified_name().contains(SHORT_BACKTRACE_FN)
                && !f.func_name.contains("thread_start")));
    }

    #[test]
    fn test_thread_ids_differ_across_threads() {
        let here = current_thread_id();
        let there = std::thread::spawn(current_thread_id).join().unwrap();
        assert_ne!(here, there);
    }
}
