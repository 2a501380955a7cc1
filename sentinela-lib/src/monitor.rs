//! Process monitor polling loop.
//!
//! A single long-running loop with strictly sequential ticks: enumerate
//! processes, classify the ones not yet handled, persist alerts for
//! positive verdicts, sleep, repeat. If a tick overruns the interval the
//! next tick starts late rather than concurrently.

use crate::classifier::{Verdict, classify};
use crate::collection::ProcessSource;
use crate::dedup::DedupCache;
use crate::models::{AlertKind, AlertSeverity, NewAlert};
use crate::storage::AlertSink;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Floor for the polling interval.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Counters for one monitor tick, for logging and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    /// Snapshots run through the classifier this tick.
    pub evaluated: usize,
    /// Positive verdicts this tick.
    pub flagged: usize,
    /// Alerts successfully persisted this tick.
    pub inserted: usize,
    /// Processes skipped because they could not be read.
    pub skipped: usize,
}

/// The process-behavior polling loop.
///
/// Owns its [`DedupCache`]; the cache must not be shared across monitor
/// instances. The alert store handle may be shared with a concurrently
/// running static scanner.
pub struct ProcessMonitor<S: ProcessSource> {
    source: S,
    sink: Arc<dyn AlertSink>,
    dedup: DedupCache,
    interval: Duration,
}

impl<S: ProcessSource> ProcessMonitor<S> {
    /// Create a monitor. Intervals below one second are raised to one
    /// second.
    pub fn new(source: S, sink: Arc<dyn AlertSink>, interval: Duration) -> Self {
        Self {
            source,
            sink,
            dedup: DedupCache::new(),
            interval: interval.max(MIN_INTERVAL),
        }
    }

    /// The effective polling interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one tick: enumerate, classify, persist.
    ///
    /// Unreadable processes are skipped and the tick continues. A failed
    /// insert is logged and the tick continues; the pid is still marked as
    /// handled, so a given alert is delivered at most once even when one is
    /// lost to a persistence failure.
    pub async fn tick(&mut self) -> TickSummary {
        let mut summary = TickSummary::default();
        let mut stream = self.source.stream_processes();

        while let Some(item) = stream.next().await {
            let snapshot = match item {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    warn!(error = %err, "skipping process during enumeration");
                    summary.skipped += 1;
                    continue;
                }
            };

            let pid = snapshot.pid.raw();
            if self.dedup.seen(pid) {
                continue;
            }
            summary.evaluated += 1;

            let Verdict::Suspicious { token } = classify(&snapshot) else {
                continue;
            };
            summary.flagged += 1;

            let message = format!(
                "Suspicious process detected: {} (pid {}, cmd: {}) matched token '{}'",
                snapshot.name,
                pid,
                snapshot.command_string(),
                token
            );
            match NewAlert::new(AlertKind::Process, AlertSeverity::Medium, message) {
                Ok(draft) => match self.sink.insert(draft) {
                    Ok(id) => {
                        summary.inserted += 1;
                        info!(
                            alert_id = %id,
                            pid,
                            name = %snapshot.name,
                            token = %token,
                            "suspicious process alert recorded"
                        );
                    }
                    Err(err) => {
                        error!(pid, error = %err, "failed to persist process alert");
                    }
                },
                Err(err) => {
                    error!(pid, error = %err, "failed to build process alert");
                }
            }
            // Handled once evaluated positive, even if persistence failed.
            self.dedup.mark(pid);
        }

        summary
    }

    /// Run ticks until the shutdown signal flips to `true`.
    ///
    /// The signal is sampled only at tick boundaries, so a tick in flight
    /// always finishes. Recoverable failures never terminate the loop; it
    /// recovers on the next tick.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "process monitor started");

        loop {
            let summary = self.tick().await;
            debug!(
                evaluated = summary.evaluated,
                flagged = summary.flagged,
                inserted = summary.inserted,
                skipped = summary.skipped,
                "monitor tick complete"
            );

            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("process monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{CollectionError, SnapshotStream};
    use crate::models::{AlertId, ProcessSnapshot};
    use crate::storage::{AlertStore, StorageError};
    use async_trait::async_trait;
    use futures::stream;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Replays a scripted process table, one entry per tick. Once the
    /// script runs out, ticks observe an empty table.
    struct ScriptedSource {
        ticks: Mutex<VecDeque<Vec<Result<ProcessSnapshot, CollectionError>>>>,
    }

    impl ScriptedSource {
        fn new(ticks: Vec<Vec<Result<ProcessSnapshot, CollectionError>>>) -> Self {
            Self {
                ticks: Mutex::new(ticks.into()),
            }
        }
    }

    #[async_trait]
    impl ProcessSource for ScriptedSource {
        fn stream_processes(&self) -> SnapshotStream {
            let items = self
                .ticks
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default();
            Box::pin(stream::iter(items))
        }
    }

    fn suspicious_snapshot(pid: u32) -> ProcessSnapshot {
        ProcessSnapshot::new(pid, "cmd.exe").with_cmdline(["/c", "calc.exe"])
    }

    fn benign_snapshot(pid: u32) -> ProcessSnapshot {
        ProcessSnapshot::new(pid, "systemd").with_cmdline(["/sbin/init"])
    }

    fn open_store(dir: &std::path::Path) -> Arc<AlertStore> {
        Arc::new(AlertStore::open(dir.join("alerts.redb")).unwrap())
    }

    #[tokio::test]
    async fn test_suspicious_process_alerts_once_across_ticks() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());

        // The same process table observed for three consecutive ticks.
        let table = || vec![Ok(suspicious_snapshot(4242)), Ok(benign_snapshot(1))];
        let source = ScriptedSource::new(vec![table(), table(), table()]);
        let mut monitor =
            ProcessMonitor::new(source, store.clone(), Duration::from_secs(1));

        let first = monitor.tick().await;
        assert_eq!(first.evaluated, 2);
        assert_eq!(first.flagged, 1);
        assert_eq!(first.inserted, 1);

        let second = monitor.tick().await;
        assert_eq!(second.flagged, 0);
        let third = monitor.tick().await;
        assert_eq!(third.flagged, 0);

        let alerts = store.list(None).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Process);
        assert_eq!(alerts[0].severity, AlertSeverity::Medium);
    }

    #[tokio::test]
    async fn test_alert_message_includes_pid_name_and_cmdline() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());

        let source = ScriptedSource::new(vec![vec![Ok(suspicious_snapshot(4242))]]);
        let mut monitor =
            ProcessMonitor::new(source, store.clone(), Duration::from_secs(1));
        monitor.tick().await;

        let alerts = store.list(None).unwrap();
        assert!(alerts[0].message.contains("4242"));
        assert!(alerts[0].message.contains("cmd.exe"));
        assert!(alerts[0].message.contains("/c calc.exe"));
    }

    #[tokio::test]
    async fn test_unreadable_process_is_skipped_and_tick_continues() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());

        let source = ScriptedSource::new(vec![vec![
            Err(CollectionError::PermissionDenied { pid: 1 }),
            Ok(suspicious_snapshot(2)),
            Err(CollectionError::ProcessVanished { pid: 3 }),
        ]]);
        let mut monitor =
            ProcessMonitor::new(source, store.clone(), Duration::from_secs(1));

        let summary = monitor.tick().await;
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.flagged, 1);
        assert_eq!(store.list(None).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_whole_table_failure_recovers_next_tick() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());

        let source = ScriptedSource::new(vec![
            vec![Err(CollectionError::Enumeration("proc table unavailable".into()))],
            vec![Ok(suspicious_snapshot(10))],
        ]);
        let mut monitor =
            ProcessMonitor::new(source, store.clone(), Duration::from_secs(1));

        let first = monitor.tick().await;
        assert_eq!(first.skipped, 1);
        assert_eq!(first.flagged, 0);

        let second = monitor.tick().await;
        assert_eq!(second.flagged, 1);
        assert_eq!(store.list(None).unwrap().len(), 1);
    }

    struct FailingSink;

    impl AlertSink for FailingSink {
        fn insert(&self, _draft: NewAlert) -> Result<AlertId, StorageError> {
            Err(StorageError::Io(std::io::Error::other("sink down")))
        }

        fn insert_batch(&self, _drafts: Vec<NewAlert>) -> Result<Vec<AlertId>, StorageError> {
            Err(StorageError::Io(std::io::Error::other("sink down")))
        }
    }

    #[tokio::test]
    async fn test_pid_is_marked_handled_even_when_insert_fails() {
        let table = || vec![Ok(suspicious_snapshot(77))];
        let source = ScriptedSource::new(vec![table(), table()]);
        let mut monitor =
            ProcessMonitor::new(source, Arc::new(FailingSink), Duration::from_secs(1));

        let first = monitor.tick().await;
        assert_eq!(first.flagged, 1);
        assert_eq!(first.inserted, 0);

        // At-most-once: the lost alert is not retried on the next tick.
        let second = monitor.tick().await;
        assert_eq!(second.flagged, 0);
        assert_eq!(second.inserted, 0);
    }

    #[tokio::test]
    async fn test_interval_is_clamped_to_one_second() {
        let source = ScriptedSource::new(vec![]);
        let store_dir = tempdir().unwrap();
        let store = open_store(store_dir.path());
        let monitor = ProcessMonitor::new(source, store, Duration::from_millis(10));
        assert_eq!(monitor.interval(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_run_stops_at_tick_boundary_on_shutdown() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());

        let source = ScriptedSource::new(vec![vec![Ok(suspicious_snapshot(5))]]);
        let monitor = ProcessMonitor::new(source, store.clone(), Duration::from_secs(60));

        let (tx, rx) = watch::channel(true);
        // Signal already set: run completes its first tick, then observes
        // the boundary and stops without sleeping the 60s interval.
        tokio::time::timeout(Duration::from_secs(5), monitor.run(rx))
            .await
            .expect("monitor should stop promptly");
        drop(tx);

        assert_eq!(store.list(None).unwrap().len(), 1);
    }
}
