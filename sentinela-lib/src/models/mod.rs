//! Core data models for Sentinela.

pub mod alert;
pub mod process;

pub use alert::{Alert, AlertError, AlertId, AlertKind, AlertSeverity, NewAlert};
pub use process::{ProcessId, ProcessSnapshot};
