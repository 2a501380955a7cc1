//! Alert persistence backed by redb.
//!
//! The store is the only resource shared by the two producers. Each insert
//! (or scanner batch) runs in a single write transaction, so ids never
//! collide and a batch becomes visible all-or-nothing.

use crate::models::{Alert, AlertId, NewAlert};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use thiserror::Error;

const ALERTS: TableDefinition<'static, u64, Vec<u8>> = TableDefinition::new("alerts");

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("alert not found: {id}")]
    RecordNotFound { id: u64 },
}

/// Write-side contract shared by the process monitor and the static
/// scanner. Splitting this from [`AlertStore`] lets tests drive producers
/// against scripted or failing sinks.
pub trait AlertSink: Send + Sync {
    /// Persist one alert, assigning the next increasing id.
    fn insert(&self, draft: NewAlert) -> Result<AlertId, StorageError>;

    /// Persist a batch of alerts atomically: either every alert becomes
    /// visible or none do.
    fn insert_batch(&self, drafts: Vec<NewAlert>) -> Result<Vec<AlertId>, StorageError>;
}

/// Persisted alert collection.
pub struct AlertStore {
    db: Database,
}

impl AlertStore {
    /// Open the store at the given path, creating the database file and
    /// schema if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = Database::create(path)?;
        let store = Self { db };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), StorageError> {
        let write_txn = self.db.begin_write()?;
        write_txn.open_table(ALERTS)?;
        write_txn.commit()?;
        Ok(())
    }

    /// Persist one alert and return its assigned id.
    pub fn insert(&self, draft: NewAlert) -> Result<AlertId, StorageError> {
        let write_txn = self.db.begin_write()?;
        let id = {
            let mut table = write_txn.open_table(ALERTS)?;
            let next = table.last()?.map_or(1, |(key, _)| key.value() + 1);
            let record = Alert::from_draft(AlertId::new(next), draft);
            let bytes = serde_json::to_vec(&record)?;
            table.insert(next, bytes)?;
            next
        };
        write_txn.commit()?;
        Ok(AlertId::new(id))
    }

    /// Persist a batch of alerts in one transaction.
    pub fn insert_batch(&self, drafts: Vec<NewAlert>) -> Result<Vec<AlertId>, StorageError> {
        let write_txn = self.db.begin_write()?;
        let ids = {
            let mut table = write_txn.open_table(ALERTS)?;
            let mut next = table.last()?.map_or(1, |(key, _)| key.value() + 1);
            let mut ids = Vec::with_capacity(drafts.len());
            for draft in drafts {
                let record = Alert::from_draft(AlertId::new(next), draft);
                let bytes = serde_json::to_vec(&record)?;
                table.insert(next, bytes)?;
                ids.push(AlertId::new(next));
                next += 1;
            }
            ids
        };
        write_txn.commit()?;
        Ok(ids)
    }

    /// List alerts ordered by id descending (most recent first). With no
    /// limit the entire collection is returned.
    pub fn list(&self, limit: Option<usize>) -> Result<Vec<Alert>, StorageError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ALERTS)?;

        let mut alerts = Vec::new();
        for item in table.iter()?.rev() {
            if let Some(limit) = limit {
                if alerts.len() == limit {
                    break;
                }
            }
            let (_, value) = item?;
            let alert: Alert = serde_json::from_slice(&value.value())?;
            alerts.push(alert);
        }
        Ok(alerts)
    }

    /// Fetch one alert by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::RecordNotFound` if no alert has that id.
    pub fn get(&self, id: AlertId) -> Result<Alert, StorageError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ALERTS)?;
        let guard = table
            .get(id.raw())?
            .ok_or(StorageError::RecordNotFound { id: id.raw() })?;
        let alert: Alert = serde_json::from_slice(&guard.value())?;
        Ok(alert)
    }
}

impl AlertSink for AlertStore {
    fn insert(&self, draft: NewAlert) -> Result<AlertId, StorageError> {
        AlertStore::insert(self, draft)
    }

    fn insert_batch(&self, drafts: Vec<NewAlert>) -> Result<Vec<AlertId>, StorageError> {
        AlertStore::insert_batch(self, drafts)
    }
}
