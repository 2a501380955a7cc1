//! Process enumeration for the monitor loop.
//!
//! Sources yield a stream of individual [`ProcessSnapshot`] items so the
//! monitor can skip unreadable processes without aborting the tick, and so
//! tests can script exact process tables.

use crate::models::ProcessSnapshot;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{StreamExt, stream};
use sysinfo::System;
use thiserror::Error;

/// Errors that may occur while enumerating processes.
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("permission denied accessing process {pid}")]
    PermissionDenied { pid: u32 },
    #[error("process {pid} exited during enumeration")]
    ProcessVanished { pid: u32 },
    #[error("enumeration failed: {0}")]
    Enumeration(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for the asynchronous snapshot stream.
pub type SnapshotStream = BoxStream<'static, Result<ProcessSnapshot, CollectionError>>;

/// Trait for streaming process enumeration.
///
/// Implementations yield per-item `Result`s; an `Err` item marks one
/// unreadable process and must not terminate the stream. A stream that ends
/// after a single `Err(Enumeration)` signals that the whole process table
/// could not be read this tick.
#[async_trait]
pub trait ProcessSource: Send + Sync {
    /// Return an async stream of individual process snapshots.
    fn stream_processes(&self) -> SnapshotStream;
}

/// A process source backed by the `sysinfo` crate.
#[derive(Debug, Default)]
pub struct SysinfoProcessSource;

impl SysinfoProcessSource {
    /// Create a new source.
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessSource for SysinfoProcessSource {
    fn stream_processes(&self) -> SnapshotStream {
        // One snapshot enumeration up-front (sysinfo requires a refresh);
        // results are still streamed item-by-item afterward.
        let mut system = System::new_all();
        system.refresh_all();

        let snapshots: Vec<ProcessSnapshot> = system
            .processes()
            .iter()
            .map(|(pid, process)| {
                let name = process.name().to_string_lossy().to_string();
                let cmdline: Vec<String> = process
                    .cmd()
                    .iter()
                    .map(|arg| arg.to_string_lossy().to_string())
                    .collect();

                let mut snapshot =
                    ProcessSnapshot::new(pid.as_u32(), name).with_cmdline(cmdline);
                if let Some(exe) = process.exe() {
                    snapshot = snapshot.with_exe(exe);
                }
                snapshot
            })
            .collect();

        stream::iter(snapshots.into_iter().map(Ok)).boxed()
    }
}
