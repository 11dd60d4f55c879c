//! Group threads with identical stacks into buckets.
//!
//! Two threads share a bucket when nothing but their id, argument values and
//! sleep duration tells them apart. Sleep durations are merged into a range.

use crate::parser::{Frame, Snapshot, Thread};
use log::debug;
use serde::Serialize;
use std::collections::HashMap;

/// Shared stack of every thread in a bucket
#[derive(Debug, Clone, Serialize)]
pub struct Signature {
    pub state: String,
    pub frames: Vec<Frame>,

    /// Frames were truncated by the capture
    pub elided: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Frame>,

    pub locked: bool,

    /// Shortest and longest sleep among members, in minutes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_max: Option<u32>,
}

/// A group of threads rendered once
///
/// **Public** - produced by `aggregate`, consumed by the renderers
#[derive(Debug, Clone, Serialize)]
pub struct Bucket {
    pub signature: Signature,

    /// Member thread ids, in snapshot order; never empty
    pub ids: Vec<u64>,
}

impl Bucket {
    fn from_thread(thread: &Thread) -> Self {
        Self {
            signature: Signature {
                state: thread.state.clone(),
                frames: thread.frames.clone(),
                elided: thread.elided,
                created_by: thread.created_by.clone(),
                locked: thread.locked,
                sleep_min: thread.sleep_minutes,
                sleep_max: thread.sleep_minutes,
            },
            ids: vec![thread.id],
        }
    }

    fn absorb(&mut self, thread: &Thread) {
        self.ids.push(thread.id);
        if let Some(minutes) = thread.sleep_minutes {
            let sig = &mut self.signature;
            sig.sleep_min = Some(sig.sleep_min.map_or(minutes, |m| m.min(minutes)));
            sig.sleep_max = Some(sig.sleep_max.map_or(minutes, |m| m.max(minutes)));
        }
    }

    /// `"5 minutes"`, `"1~5 minutes"`, or `None` when no member sleeps
    pub fn sleep_string(&self) -> Option<String> {
        match (self.signature.sleep_min, self.signature.sleep_max) {
            (Some(min), Some(max)) if min != max => Some(format!("{}~{} minutes", min, max)),
            (Some(min), _) => Some(format!("{} minutes", min)),
            _ => None,
        }
    }

    pub fn count(&self) -> usize {
        self.ids.len()
    }
}

type FrameKey<'a> = (&'a str, &'a str, &'a str, &'a str, u32);

#[derive(Hash, PartialEq, Eq)]
struct SignatureKey<'a> {
    state: &'a str,
    locked: bool,
    elided: bool,
    created_by: Option<FrameKey<'a>>,
    frames: Vec<FrameKey<'a>>,
}

impl<'a> SignatureKey<'a> {
    fn of(thread: &'a Thread) -> Self {
        Self {
            state: &thread.state,
            locked: thread.locked,
            elided: thread.elided,
            created_by: thread.created_by.as_ref().map(Frame::key),
            frames: thread.frames.iter().map(Frame::key).collect(),
        }
    }
}

/// Group a snapshot's threads into buckets
///
/// **Public** - main entry point for aggregation
///
/// # Returns
/// Buckets in order of first appearance in the snapshot, so the same dump
/// always renders in the same order. An empty snapshot yields no buckets.
pub fn aggregate(snapshot: &Snapshot) -> Vec<Bucket> {
    let mut index: HashMap<SignatureKey<'_>, usize> = HashMap::new();
    let mut buckets: Vec<Bucket> = Vec::new();

    for thread in &snapshot.threads {
        match index.get(&SignatureKey::of(thread)) {
            Some(&slot) => buckets[slot].absorb(thread),
            None => {
                index.insert(SignatureKey::of(thread), buckets.len());
                buckets.push(Bucket::from_thread(thread));
            }
        }
    }

    debug!(
        "Aggregated {} threads into {} buckets",
        snapshot.threads.len(),
        buckets.len()
    );

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread(id: u64, funcs: &[&str]) -> Thread {
        let mut thread = Thread::new(id, "running");
        thread.frames = funcs
            .iter()
            .enumerate()
            .map(|(i, f)| Frame::from_symbol(f, Some("/w/demo/src/lib.rs"), 10 + i as u32))
            .collect();
        thread
    }

    #[test]
    fn test_arguments_do_not_split_buckets() {
        let mut a = thread(1, &["demo::a", "demo::main"]);
        let mut b = thread(2, &["demo::a", "demo::main"]);
        a.frames[0].args = "0x1".to_string();
        b.frames[0].args = "0x2".to_string();

        let buckets = aggregate(&Snapshot { threads: vec![a, b] });
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].ids, vec![1, 2]);
    }

    #[test]
    fn test_sleep_range() {
        let mut a = thread(1, &["demo::idle"]);
        let mut b = thread(2, &["demo::idle"]);
        let c = thread(3, &["demo::idle"]);
        a.sleep_minutes = Some(5);
        b.sleep_minutes = Some(1);

        let buckets = aggregate(&Snapshot {
            threads: vec![a, b, c],
        });
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].sleep_string().as_deref(), Some("1~5 minutes"));
    }

    #[test]
    fn test_single_sleep_value() {
        let mut a = thread(1, &["demo::idle"]);
        a.sleep_minutes = Some(4);
        let buckets = aggregate(&Snapshot { threads: vec![a] });
        assert_eq!(buckets[0].sleep_string().as_deref(), Some("4 minutes"));
    }

    #[test]
    fn test_state_and_lock_split_buckets() {
        let a = thread(1, &["demo::a"]);
        let mut b = thread(2, &["demo::a"]);
        let mut c = thread(3, &["demo::a"]);
        b.state = "chan receive".to_string();
        c.locked = true;

        let buckets = aggregate(&Snapshot {
            threads: vec![a, b, c],
        });
        assert_eq!(buckets.len(), 3);
    }
}
