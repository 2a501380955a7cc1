//! Static file scanner.
//!
//! Walks a file tree, matches every regular file against a compiled rule
//! set, and commits the resulting alerts as one atomic batch. Symbolic
//! links are never followed, so cyclic trees terminate.

use crate::models::{AlertError, AlertKind, AlertSeverity, NewAlert};
use crate::rules::{RuleEngine, RuleError};
use crate::storage::{AlertSink, StorageError};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Fatal scan failures. Per-file read errors are not represented here;
/// they are skipped inside the walk.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Alert(#[from] AlertError),
}

/// One-shot scanner over a rule engine and an alert sink.
///
/// Synchronous by design: it may be invoked from a CLI command concurrently
/// with an active monitor loop, and the shared store serializes the writes.
pub struct Scanner<E: RuleEngine> {
    engine: E,
    sink: Arc<dyn AlertSink>,
}

impl<E: RuleEngine> Scanner<E> {
    /// Create a scanner.
    pub fn new(engine: E, sink: Arc<dyn AlertSink>) -> Self {
        Self { engine, sink }
    }

    /// The scanner's rule engine, for compiling rule sets up front.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Scan `root` against a compiled rule set and return the number of
    /// alerts created.
    ///
    /// If `root` is a single file the walk set is that one file; otherwise
    /// every regular file under the directory is examined. Exactly one
    /// alert is produced per matched file, for the first rule in the
    /// engine's stable report order. All alerts from this invocation are
    /// committed in one batch at the end of the walk: either all become
    /// visible or none do.
    pub fn scan(&self, root: &Path, rules: &E::Compiled) -> Result<usize, ScanError> {
        let mut drafts = Vec::new();

        for entry in WalkDir::new(root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            match self.engine.match_file(rules, entry.path()) {
                Ok(matched) => {
                    if let Some(rule) = matched.first() {
                        let message =
                            format!("YARA match: {rule} in {}", entry.path().display());
                        drafts.push(NewAlert::new(
                            AlertKind::Yara,
                            AlertSeverity::High,
                            message,
                        )?);
                    }
                }
                Err(RuleError::Read { path, source }) => {
                    debug!(path = %path.display(), error = %source, "skipping unreadable file");
                }
                Err(err @ RuleError::Compile { .. }) => return Err(err.into()),
            }
        }

        let created = drafts.len();
        self.sink.insert_batch(drafts)?;
        info!(created, root = %root.display(), "static scan committed");
        Ok(created)
    }
}
