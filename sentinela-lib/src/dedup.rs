//! Run-scoped alert deduplication.

use std::collections::HashSet;

/// Tracks which live processes have already produced an alert during one
/// monitor run, so a given pid is alerted at most once per run lifetime.
///
/// Owned by exactly one [`ProcessMonitor`](crate::monitor::ProcessMonitor)
/// instance; never shared across monitors. Entries never expire; the cache
/// lives and dies with its run.
///
/// Known limitation: the identity key is the pid alone, with no process
/// start-time component. A reused pid from an unrelated later process is
/// treated as already handled.
#[derive(Debug, Default)]
pub struct DedupCache {
    seen: HashSet<u32>,
}

impl DedupCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this pid has already been marked.
    pub fn seen(&self, pid: u32) -> bool {
        self.seen.contains(&pid)
    }

    /// Mark a pid as handled.
    pub fn mark(&mut self, pid: u32) {
        self.seen.insert(pid);
    }

    /// Number of marked pids.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether no pid has been marked yet.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
