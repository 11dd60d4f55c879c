use stack_buckets::capture::{BacktraceCapture, StackCapture};
use stack_buckets::parser::{DumpParser, SnapshotParser};
use stack_buckets::write_report;
use std::thread;

fn frame_lines(text: &str) -> Vec<&str> {
    text.lines().skip(1).collect()
}

#[test]
fn report_marks_calling_test() {
    let mut out = Vec::new();
    write_report(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.starts_with("1: running"), "{text}");
    let lines = frame_lines(&text);
    assert!(!lines.is_empty(), "{text}");
    assert!(lines.iter().all(|l| l.ends_with("(...)")), "{text}");
    assert!(
        lines
            .iter()
            .any(|l| l.starts_with("    > ") && l.ends_with(" report_marks_calling_test(...)")),
        "{text}"
    );
}

#[test]
fn report_hides_library_frames() {
    let mut out = Vec::new();
    write_report(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(!text.contains("BacktraceCapture"), "{text}");
    assert!(!text.contains("write_for(...)"), "{text}");
    assert!(!text.contains("walk_stack"), "{text}");
}

#[test]
fn concurrent_reports_are_independent() {
    let handles: Vec<_> = (0..4)
        .map(|_| {
            thread::spawn(|| {
                let mut out = Vec::new();
                write_report(&mut out).unwrap();
                String::from_utf8(out).unwrap()
            })
        })
        .collect();

    for handle in handles {
        let text = handle.join().unwrap();
        assert!(text.starts_with("1: running"), "{text}");
        assert!(text.contains("concurrent_reports_are_independent"), "{text}");
    }
}

#[inline(never)]
fn report_from_worker() -> String {
    let mut out = Vec::new();
    write_report(&mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn spawned_thread_report_names_creation_site() {
    let text = thread::spawn(report_from_worker).join().unwrap();
    let header = text.lines().next().unwrap_or_default();

    assert!(header.starts_with("1: running [Created by "), "{text}");
    assert!(header.contains(" @ "), "{text}");
    assert!(!text.contains("thread_start"), "{text}");
    assert!(!text.contains("__rust_begin_short_backtrace"), "{text}");
    assert!(
        text.lines()
            .any(|l| l.starts_with("    > ") && l.ends_with(" report_from_worker(...)")),
        "{text}"
    );
}

#[test]
fn backtrace_dump_holds_one_running_thread() {
    let bytes = BacktraceCapture::new().capture().unwrap();
    let scan = DumpParser
        .scan(&mut bytes.as_slice(), &mut std::io::sink())
        .unwrap();

    assert!(scan.end_of_stream);
    assert!(scan.suffix.is_empty());
    assert_eq!(scan.snapshot.threads.len(), 1);
    assert_eq!(scan.snapshot.threads[0].state, "running");
}
