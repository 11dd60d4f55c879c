//! Structured snapshot definitions.
//!
//! A `Snapshot` is what the dump parser hands to the aggregator: one `Thread`
//! per stack record, each with its frames ordered top of stack first.

use crate::utils::config::TEST_SEGMENT;
use serde::Serialize;

/// One call-stack entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    /// Function name without its module path (e.g. `Conn::read`)
    pub func_name: String,

    /// Module path of the function (e.g. `my_app::net`)
    pub import_path: String,

    /// Name of the directory holding the source file, empty when unresolved
    pub containing_module: String,

    /// Bare source file name, empty when unresolved
    pub source_file: String,

    pub line: u32,

    /// Raw argument text from the dump; never bucketed, never rendered
    #[serde(skip)]
    pub args: String,

    /// Frame belongs to the program entry point
    pub is_entry_point: bool,
}

impl Frame {
    /// Build a frame from a demangled symbol and its source location
    ///
    /// **Public** - used by the dump parser and by tests
    ///
    /// # Arguments
    /// * `symbol` - Demangled, fully qualified symbol name
    /// * `path` - Source path as it appears in the dump, if resolved
    /// * `line` - Source line (0 when unknown)
    pub fn from_symbol(symbol: &str, path: Option<&str>, line: u32) -> Self {
        let (import_path, func_name) = split_symbol(symbol);
        let (containing_module, source_file) = path.map(split_location).unwrap_or_default();

        let is_entry_point = source_file == "main.rs"
            || (func_name == "main" && !import_path.is_empty() && !import_path.contains("::"));

        Self {
            func_name,
            import_path,
            containing_module,
            source_file,
            line,
            args: String::new(),
            is_entry_point,
        }
    }

    pub fn with_args(mut self, args: impl Into<String>) -> Self {
        self.args = args.into();
        self
    }

    /// Fully qualified function name, as a caller would see it
    pub fn qualified_name(&self) -> String {
        if self.import_path.is_empty() || self.func_name.starts_with('<') {
            self.func_name.clone()
        } else {
            format!("{}::{}", self.import_path, self.func_name)
        }
    }

    /// `module/file:line` column text
    pub fn location(&self) -> String {
        format!("{}/{}:{}", self.containing_module, self.source_file, self.line)
    }

    /// Frame comes from test code: a test file, a `tests` directory or a
    /// `tests` module
    pub fn is_test_code(&self, test_suffixes: &[String]) -> bool {
        test_suffixes.iter().any(|s| self.source_file.ends_with(s.as_str()))
            || self.containing_module == TEST_SEGMENT
            || self.import_path.split("::").any(|seg| seg == TEST_SEGMENT)
    }

    /// Structural equality used for bucketing (arguments are ignored)
    pub fn same_call(&self, other: &Frame) -> bool {
        self.key() == other.key()
    }

    pub(crate) fn key(&self) -> (&str, &str, &str, &str, u32) {
        (
            &self.func_name,
            &self.import_path,
            &self.containing_module,
            &self.source_file,
            self.line,
        )
    }
}

/// One thread's stack record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    pub id: u64,
    pub state: String,
    pub sleep_minutes: Option<u32>,
    pub locked: bool,
    pub frames: Vec<Frame>,

    /// Frames were truncated by the capture
    pub elided: bool,

    /// Where the thread was spawned, if known
    pub created_by: Option<Frame>,
}

impl Thread {
    pub fn new(id: u64, state: impl Into<String>) -> Self {
        Self {
            id,
            state: state.into(),
            sleep_minutes: None,
            locked: false,
            frames: Vec::new(),
            elided: false,
            created_by: None,
        }
    }
}

/// The parsed dump
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub threads: Vec<Thread>,
}

/// Split a demangled symbol into (module path, function name)
///
/// Leading lowercase segments form the module path. The name starts at the
/// first type-like segment, and trailing closure segments stay attached to
/// the function they belong to, as do turbofish arguments (`run::<u8>`).
/// Legacy `::h<hash>` suffixes are dropped.
///
/// ```ignore
/// split_symbol("my_app::net::Conn::read") == ("my_app::net", "Conn::read")
/// split_symbol("my_app::run::{{closure}}") == ("my_app", "run::{{closure}}")
/// split_symbol("my_app::run::<u8>") == ("my_app", "run::<u8>")
/// ```
pub fn split_symbol(symbol: &str) -> (String, String) {
    let symbol = strip_hash(symbol.trim());
    let raw_segments = split_top_level(symbol);

    if let Some(first) = raw_segments.first() {
        if first.starts_with('<') {
            return (impl_module_path(first), symbol.to_string());
        }
    }
    let segments = attach_generic_args(raw_segments);

    let last_fn = segments
        .iter()
        .rposition(|seg| !seg.starts_with('{'))
        .unwrap_or(0);
    let first_type = segments
        .iter()
        .position(|seg| seg.starts_with(|c: char| c.is_ascii_uppercase()))
        .unwrap_or(last_fn);
    let split = first_type.min(last_fn);

    (segments[..split].join("::"), segments[split..].join("::"))
}

/// Fold `<...>` segments into the segment they parameterize
fn attach_generic_args(segments: Vec<&str>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(segments.len());
    for seg in segments {
        match merged.last_mut() {
            Some(prev) if seg.starts_with('<') => {
                prev.push_str("::");
                prev.push_str(seg);
            }
            _ => merged.push(seg.to_string()),
        }
    }
    merged
}

/// Module path of the self type in `<Type as Trait>` or `<Type>`
fn impl_module_path(qualified: &str) -> String {
    let inner = qualified
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(qualified);
    let self_ty = find_top_level(inner, " as ")
        .map(|idx| &inner[..idx])
        .unwrap_or(inner);

    let segments = split_top_level(self_ty);
    let modules: Vec<&str> = segments[..segments.len().saturating_sub(1)]
        .iter()
        .take_while(|seg| seg.starts_with(|c: char| c.is_ascii_lowercase() || c == '_'))
        .copied()
        .collect();
    modules.join("::")
}

fn strip_hash(symbol: &str) -> &str {
    match symbol.rsplit_once("::") {
        Some((head, tail))
            if tail.len() == 17
                && tail.starts_with('h')
                && tail[1..].chars().all(|c| c.is_ascii_hexdigit()) =>
        {
            head
        }
        _ => symbol,
    }
}

/// Split on `::` outside of generic brackets
fn split_top_level(symbol: &str) -> Vec<&str> {
    let bytes = symbol.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'<' | b'(' | b'[' => depth += 1,
            b'>' if i > 0 && bytes[i - 1] == b'-' => {}
            b'>' | b')' | b']' => depth -= 1,
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                parts.push(&symbol[start..i]);
                i += 2;
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&symbol[start..]);
    parts
}

fn find_top_level(haystack: &str, needle: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'<' | b'(' | b'[' => depth += 1,
            b'>' if i > 0 && bytes[i - 1] == b'-' => {}
            b'>' | b')' | b']' => depth -= 1,
            _ if depth == 0 && bytes[i..].starts_with(needle.as_bytes()) => return Some(i),
            _ => {}
        }
    }
    None
}

/// Split a source path into (directory name, file name), accepting either
/// separator so dumps from other platforms parse the same way
fn split_location(path: &str) -> (String, String) {
    let mut parts = path.rsplit(['/', '\\']);
    let file = parts.next().unwrap_or_default();
    let dir = parts.next().unwrap_or_default();
    (dir.to_string(), file.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_plain_function() {
        assert_eq!(
            split_symbol("my_app::net::read_all"),
            ("my_app::net".to_string(), "read_all".to_string())
        );
    }

    #[test]
    fn test_split_method_and_closure() {
        assert_eq!(
            split_symbol("my_app::net::Conn::read"),
            ("my_app::net".to_string(), "Conn::read".to_string())
        );
        assert_eq!(
            split_symbol("my_app::run::{{closure}}::{{closure}}"),
            ("my_app".to_string(), "run::{{closure}}::{{closure}}".to_string())
        );
    }

    #[test]
    fn test_split_strips_legacy_hash() {
        assert_eq!(
            split_symbol("my_app::main::h0123456789abcdef"),
            ("my_app".to_string(), "main".to_string())
        );
    }

    #[test]
    fn test_split_trait_impl() {
        let (path, name) =
            split_symbol("<alloc::boxed::Box<F,A> as core::ops::function::FnOnce<Args>>::call_once");
        assert_eq!(path, "alloc::boxed");
        assert!(name.ends_with(">::call_once"));
    }

    #[test]
    fn test_split_generic_segment() {
        assert_eq!(
            split_symbol("core::ptr::drop_in_place<alloc::vec::Vec<u8>>"),
            ("core::ptr".to_string(), "drop_in_place<alloc::vec::Vec<u8>>".to_string())
        );
    }

    #[test]
    fn test_split_keeps_turbofish_with_function() {
        assert_eq!(
            split_symbol("my_app::run::<u8>"),
            ("my_app".to_string(), "run::<u8>".to_string())
        );
        assert_eq!(
            split_symbol("std::thread::lifecycle::spawn_unchecked::<F, ()>::{closure#1}"),
            (
                "std::thread::lifecycle".to_string(),
                "spawn_unchecked::<F, ()>::{closure#1}".to_string()
            )
        );
        assert_eq!(
            split_symbol("alloc::vec::Vec::<u8>::push"),
            ("alloc::vec".to_string(), "Vec::<u8>::push".to_string())
        );
    }

    #[test]
    fn test_generic_caller_owns_its_module() {
        let frame = Frame::from_symbol("my_app::net::read_all::<u8>", Some("/w/my_app/src/net.rs"), 4);
        assert_eq!(frame.import_path, "my_app::net");
        assert_eq!(frame.func_name, "read_all::<u8>");
        assert_eq!(frame.qualified_name(), "my_app::net::read_all::<u8>");
    }

    #[test]
    fn test_frame_location_and_entry_point() {
        let frame = Frame::from_symbol("demo::main", Some("/work/demo/src/main.rs"), 12);
        assert_eq!(frame.location(), "src/main.rs:12");
        assert!(frame.is_entry_point);

        let unresolved = Frame::from_symbol("demo::worker", None, 0);
        assert!(unresolved.containing_module.is_empty());
        assert!(!unresolved.is_entry_point);
    }

    #[test]
    fn test_windows_separators() {
        let frame = Frame::from_symbol("demo::run", Some(r"C:\work\demo\src\run.rs"), 3);
        assert_eq!(frame.location(), "src/run.rs:3");
    }
}
