//! Configuration and constants shared by capture, filtering and rendering.

/// Import path of this library, used to hide its own production frames
pub const DEFAULT_LIBRARY_PATH: &str = env!("CARGO_CRATE_NAME");

/// Current JSON report schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

// Source files whose frames count as test code even inside the library
pub const TEST_FILE_SUFFIXES: &[&str] = &["_test.rs", "tests.rs"];

/// Directory and module segment that marks test code
pub const TEST_SEGMENT: &str = "tests";

/// Line written under a bucket whose stack was truncated by the capture
pub const ELIDED_LINE: &str = "    (...) (elided)";

/// Placeholder rendered in place of call arguments
pub const ARGS_PLACEHOLDER: &str = "(...)";

// Dump format tokens (see `parser::dump`)
pub const THREAD_PREFIX: &str = "thread ";
pub const CREATED_BY_PREFIX: &str = "created by ";
pub const ELIDED_MARKER: &str = "...additional frames elided...";
pub const UNKNOWN_LOCATION: &str = "?";
pub const LOCKED_TAG: &str = "locked";
pub const MINUTES_SUFFIX: &str = " minutes";

/// State recorded for the thread that takes its own snapshot
pub const RUNNING_STATE: &str = "running";

/// Function the runtime and test harness call user code through; the frame
/// just outside it is where the thread's work was started
pub const SHORT_BACKTRACE_FN: &str = "__rust_begin_short_backtrace";

/// Thread spawn closures across std releases, used when the walk never meets
/// `SHORT_BACKTRACE_FN`
pub const THREAD_SPAWN_SYMBOLS: &[&str] = &[
    "std::thread::Builder::spawn_unchecked_",
    "std::thread::lifecycle::spawn_unchecked",
];

/// Module of the main thread's runtime start; it creates no thread of its own
pub const RUNTIME_START_PATH: &str = "std::rt";

/// Frames above the resolver that hold the external caller: the entry point
/// and its internal helper are skipped
pub const CALLER_DEPTH: usize = 2;

/// Deepest stack the backtrace capture walks before marking the dump elided
pub const MAX_CAPTURE_DEPTH: usize = 512;
