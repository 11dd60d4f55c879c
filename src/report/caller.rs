//! Resolve which user function asked for a report.
//!
//! Entry points are `#[track_caller]`, so the call site's file and line are
//! always known. The function name is recovered by finding that file and
//! line on the live stack.

use crate::parser::Frame;
use log::debug;
use serde::Serialize;
use std::panic::Location;
use std::path::Path;

/// The reporting call site
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallInfo {
    /// Bare file name, directories stripped
    pub file_name: String,

    /// Fully qualified function name
    pub func_name: String,

    pub line: u32,
}

impl CallInfo {
    pub fn new(func_name: impl Into<String>, file_name: impl Into<String>, line: u32) -> Self {
        Self {
            file_name: file_name.into(),
            func_name: func_name.into(),
            line,
        }
    }

    /// Call site without a known function; marks no frame as the caller's
    pub fn unnamed(location: &Location<'_>) -> Self {
        Self::new(String::new(), bare_file_name(location.file()), location.line())
    }

    /// Resolve the caller at `location`
    ///
    /// **Public** - used by the report entry points
    ///
    /// # Arguments
    /// * `location` - Call site, from `Location::caller()`
    /// * `depth` - Frames above this resolver to fall back on when the
    ///   location cannot be matched against the stack
    ///
    /// # Panics
    /// If neither the location nor the depth yields a named function. That
    /// means the entry point was invoked in a way that hides its caller.
    #[inline(never)]
    pub fn resolve(location: &Location<'_>, depth: usize) -> Self {
        Self::locate(location)
            .or_else(|| Self::at_depth(location, depth))
            .unwrap_or_else(|| {
                panic!(
                    "cannot resolve the function calling the report at {}:{}",
                    location.file(),
                    location.line()
                )
            })
    }

    /// Find the function whose frame sits at `location` on the current stack
    pub fn locate(location: &Location<'_>) -> Option<Self> {
        let wanted = Path::new(location.file());
        let mut found = None;

        backtrace::trace(|frame| {
            backtrace::resolve_frame(frame, |symbol| {
                if found.is_some() || symbol.lineno() != Some(location.line()) {
                    return;
                }
                let same_file = symbol
                    .filename()
                    .is_some_and(|path| path.ends_with(wanted));
                if let (true, Some(name)) = (same_file, symbol.name()) {
                    found = Some(format!("{:#}", name));
                }
            });
            found.is_none()
        });

        let func_name = found?;
        debug!("Resolved report caller {} from its call site", func_name);
        Some(Self::new(
            func_name,
            bare_file_name(location.file()),
            location.line(),
        ))
    }

    fn at_depth(location: &Location<'_>, depth: usize) -> Option<Self> {
        let mut names = Vec::new();
        backtrace::trace(|frame| {
            backtrace::resolve_frame(frame, |symbol| {
                names.push(symbol.name().map(|name| format!("{:#}", name)));
            });
            true
        });

        let resolver = names.iter().position(|name| {
            name.as_deref()
                .is_some_and(|n| n.ends_with("CallInfo::resolve"))
        })?;
        let func_name = names.get(resolver + depth)?.clone()?;
        debug!("Resolved report caller {} at depth {}", func_name, depth);
        Some(Self::new(
            func_name,
            bare_file_name(location.file()),
            location.line(),
        ))
    }

    /// The frame is part of this caller's own code: its import path is a
    /// prefix of the caller's function name, on a `::` boundary
    pub fn owns(&self, frame: &Frame) -> bool {
        let path = frame.import_path.as_str();
        !path.is_empty()
            && self
                .func_name
                .strip_prefix(path)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    }
}

fn bare_file_name(path: &str) -> String {
    path.rsplit(['/', '\\']).next().unwrap_or(path).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_finds_this_test() {
        let caller = CallInfo::resolve(Location::caller(), 1);
        assert_eq!(caller.file_name, "caller.rs");
        assert!(
            caller.func_name.ends_with("test_locate_finds_this_test"),
            "resolved {}",
            caller.func_name
        );
    }

    #[test]
    fn test_owns_respects_segment_boundary() {
        let caller = CallInfo::new("app::handlers::serve", "handlers.rs", 10);
        let own = Frame::from_symbol("app::handlers::parse", Some("/w/app/src/handlers.rs"), 3);
        let root = Frame::from_symbol("app::run", Some("/w/app/src/lib.rs"), 3);
        let lookalike = Frame::from_symbol("app_extra::run", Some("/w/x/src/lib.rs"), 3);
        let other = Frame::from_symbol("tokio::spawn", Some("/w/tokio/src/lib.rs"), 3);

        assert!(caller.owns(&own));
        assert!(caller.owns(&root));
        assert!(!caller.owns(&lookalike));
        assert!(!caller.owns(&other));
    }

    #[test]
    fn test_unnamed_caller_owns_nothing() {
        let caller = CallInfo::unnamed(Location::caller());
        let frame = Frame::from_symbol("app::run", Some("/w/app/src/lib.rs"), 3);
        assert!(caller.func_name.is_empty());
        assert!(!caller.owns(&frame));
    }
}
