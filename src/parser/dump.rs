//! Stack dump text format: reader and writer.
//!
//! ```text
//! thread 1 [running, 5 minutes, locked]:
//! my_app::net::Conn::read(...)
//! 	/work/my_app/src/net.rs:42
//! ...additional frames elided...
//! created by std::thread::Builder::spawn_unchecked_
//! 	/rustc/library/std/src/thread/mod.rs:561
//!
//! ```
//!
//! Lines before the first thread header are foreign content and go to the
//! pass-through sink. After the first header, the first line that fits no
//! record shape ends the snapshot and is returned as the unparsed suffix.

use super::schema::{Frame, Snapshot, Thread};
use crate::utils::config::{
    CREATED_BY_PREFIX, ELIDED_MARKER, LOCKED_TAG, MINUTES_SUFFIX, THREAD_PREFIX, UNKNOWN_LOCATION,
};
use crate::utils::error::ParseError;
use log::debug;
use std::io::{self, BufRead, Write};

/// Result of scanning a dump
#[derive(Debug, Default)]
pub struct Scan {
    pub snapshot: Snapshot,

    /// Bytes read past the end of the snapshot, to be written verbatim
    pub suffix: Vec<u8>,

    /// Input ended cleanly; nothing is left to copy after the suffix
    pub end_of_stream: bool,
}

/// Structured parser seam: turns a textual dump into a `Snapshot`
pub trait SnapshotParser {
    /// Scan `input`, forwarding foreign content to `passthrough`
    ///
    /// Reading stops at the end of the snapshot; whatever `input` still holds
    /// afterwards belongs to the caller.
    fn scan(&self, input: &mut dyn BufRead, passthrough: &mut dyn Write)
        -> Result<Scan, ParseError>;
}

/// Reader for the dump format written by `DumpWriter`
#[derive(Debug, Clone, Copy, Default)]
pub struct DumpParser;

/// A frame line waiting for its location line
struct Pending {
    symbol: String,
    args: String,
    creator: bool,
}

struct ScanState {
    threads: Vec<Thread>,
    current: Option<Thread>,
    pending: Option<Pending>,
}

impl ScanState {
    fn close_thread(&mut self, line_no: usize) -> Result<(), ParseError> {
        self.expect_no_pending(line_no)?;
        if let Some(thread) = self.current.take() {
            self.threads.push(thread);
        }
        Ok(())
    }

    fn expect_no_pending(&self, line_no: usize) -> Result<(), ParseError> {
        if self.pending.is_some() {
            return Err(ParseError::malformed(line_no, "frame without a source location"));
        }
        Ok(())
    }
}

impl SnapshotParser for DumpParser {
    fn scan(
        &self,
        input: &mut dyn BufRead,
        passthrough: &mut dyn Write,
    ) -> Result<Scan, ParseError> {
        let mut state = ScanState {
            threads: Vec::new(),
            current: None,
            pending: None,
        };
        let mut started = false;
        let mut raw = Vec::new();
        let mut line_no = 0;

        loop {
            raw.clear();
            if input.read_until(b'\n', &mut raw)? == 0 {
                state.close_thread(line_no + 1)?;
                debug!("Scanned {} threads, reached end of stream", state.threads.len());
                return Ok(Scan {
                    snapshot: Snapshot {
                        threads: state.threads,
                    },
                    suffix: Vec::new(),
                    end_of_stream: true,
                });
            }
            line_no += 1;

            let text = String::from_utf8_lossy(&raw).into_owned();
            let line = text.trim_end_matches(['\n', '\r']);

            if !started {
                if let Some(thread) = parse_header(line) {
                    started = true;
                    state.current = Some(thread);
                } else {
                    passthrough.write_all(&raw).map_err(ParseError::Forward)?;
                }
                continue;
            }

            if let Some(location) = line.strip_prefix('\t') {
                let pending = state.pending.take().ok_or_else(|| {
                    ParseError::malformed(line_no, "source location without a frame")
                })?;
                let (path, src_line) = parse_location(location, line_no)?;
                let frame = Frame::from_symbol(&pending.symbol, path, src_line).with_args(pending.args);
                if let Some(thread) = state.current.as_mut() {
                    if pending.creator {
                        thread.created_by = Some(frame);
                    } else {
                        thread.frames.push(frame);
                    }
                }
                continue;
            }

            state.expect_no_pending(line_no)?;

            if line.is_empty() {
                state.close_thread(line_no)?;
            } else if let Some(thread) = parse_header(line) {
                state.close_thread(line_no)?;
                state.current = Some(thread);
            } else if looks_like_header(line) {
                return Err(ParseError::malformed(line_no, "invalid thread header"));
            } else if state.current.is_some() && line == ELIDED_MARKER {
                if let Some(thread) = state.current.as_mut() {
                    thread.elided = true;
                }
            } else if let (Some(symbol), true) =
                (line.strip_prefix(CREATED_BY_PREFIX), state.current.is_some())
            {
                state.pending = Some(Pending {
                    symbol: symbol.to_string(),
                    args: String::new(),
                    creator: true,
                });
            } else if let (Some((symbol, args)), true) =
                (split_call(line), state.current.is_some())
            {
                state.pending = Some(Pending {
                    symbol: symbol.to_string(),
                    args: args.to_string(),
                    creator: false,
                });
            } else {
                state.close_thread(line_no)?;
                debug!(
                    "Scanned {} threads, snapshot ended at line {}",
                    state.threads.len(),
                    line_no
                );
                return Ok(Scan {
                    snapshot: Snapshot {
                        threads: state.threads,
                    },
                    suffix: raw,
                    end_of_stream: false,
                });
            }
        }
    }
}

/// `thread <id> [<state>[, <N> minutes][, locked]]:`
fn parse_header(line: &str) -> Option<Thread> {
    let body = line.strip_prefix(THREAD_PREFIX)?.strip_suffix(':')?;
    let (id, rest) = body.split_once(' ')?;
    let id = id.parse::<u64>().ok()?;
    let tags = rest.strip_prefix('[')?.strip_suffix(']')?;

    let mut parts = tags.split(", ");
    let mut thread = Thread::new(id, parts.next().unwrap_or_default());
    let mut extra_state = Vec::new();

    for part in parts {
        if part == LOCKED_TAG {
            thread.locked = true;
        } else if let Some(minutes) = part
            .strip_suffix(MINUTES_SUFFIX)
            .and_then(|n| n.parse::<u32>().ok())
        {
            thread.sleep_minutes = Some(minutes);
        } else {
            extra_state.push(part);
        }
    }

    if !extra_state.is_empty() {
        thread.state = format!("{}, {}", thread.state, extra_state.join(", "));
    }
    Some(thread)
}

/// `thread <token> [...` that `parse_header` rejected
fn looks_like_header(line: &str) -> bool {
    line.strip_prefix(THREAD_PREFIX)
        .and_then(|body| body.split_once(' '))
        .is_some_and(|(_, rest)| rest.starts_with('['))
}

/// `<path>:<line>[ +0x<offset>]`, or `?` when unresolved
fn parse_location(location: &str, line_no: usize) -> Result<(Option<&str>, u32), ParseError> {
    let location = location
        .split_once(" +0x")
        .map(|(head, _)| head)
        .unwrap_or(location)
        .trim();

    if location == UNKNOWN_LOCATION {
        return Ok((None, 0));
    }

    let (path, line) = location
        .rsplit_once(':')
        .ok_or_else(|| ParseError::malformed(line_no, "source location without a line number"))?;
    let line = line
        .parse::<u32>()
        .map_err(|_| ParseError::malformed(line_no, format!("invalid line number '{}'", line)))?;
    Ok((Some(path), line))
}

/// Split `symbol(args)` at the parenthesis matching the trailing one
fn split_call(line: &str) -> Option<(&str, &str)> {
    if line.starts_with(char::is_whitespace) {
        return None;
    }
    let body = line.strip_suffix(')')?;
    let mut depth = 0usize;
    for (idx, c) in body.char_indices().rev() {
        match c {
            ')' => depth += 1,
            '(' if depth == 0 => {
                let symbol = &body[..idx];
                return (!symbol.is_empty()).then_some((symbol, &body[idx + 1..]));
            }
            '(' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Writer for the dump format
///
/// **Public** - used by capture backends and by tests building dumps
pub struct DumpWriter<W: Write> {
    out: W,
}

impl<W: Write> DumpWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn header(
        &mut self,
        id: u64,
        state: &str,
        sleep_minutes: Option<u32>,
        locked: bool,
    ) -> io::Result<()> {
        write!(self.out, "{}{} [{}", THREAD_PREFIX, id, state)?;
        if let Some(minutes) = sleep_minutes {
            write!(self.out, ", {}{}", minutes, MINUTES_SUFFIX)?;
        }
        if locked {
            write!(self.out, ", {}", LOCKED_TAG)?;
        }
        writeln!(self.out, "]:")
    }

    pub fn frame(&mut self, symbol: &str, args: &str, path: Option<&str>, line: u32) -> io::Result<()> {
        writeln!(self.out, "{}({})", symbol, args)?;
        self.location(path, line)
    }

    pub fn created_by(&mut self, symbol: &str, path: Option<&str>, line: u32) -> io::Result<()> {
        writeln!(self.out, "{}{}", CREATED_BY_PREFIX, symbol)?;
        self.location(path, line)
    }

    pub fn elided(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", ELIDED_MARKER)
    }

    /// Close the current thread record
    pub fn end_thread(&mut self) -> io::Result<()> {
        writeln!(self.out)
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn location(&mut self, path: Option<&str>, line: u32) -> io::Result<()> {
        match path {
            Some(path) => writeln!(self.out, "\t{}:{}", path, line),
            None => writeln!(self.out, "\t{}", UNKNOWN_LOCATION),
        }
    }
}
