//! Alert data structures and types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Strongly-typed alert identifier.
///
/// Identifiers are assigned by the alert store and are strictly increasing
/// in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AlertId(u64);

impl AlertId {
    /// Create a new alert ID.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw alert ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The producer that created an alert. Closed set; stored lowercase for
/// compatibility with existing alert readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    /// Emitted by the process monitor.
    Process,
    /// Emitted by the static scanner.
    Yara,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::Process => write!(f, "process"),
            AlertKind::Yara => write!(f, "yara"),
        }
    }
}

impl std::str::FromStr for AlertKind {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "process" => Ok(AlertKind::Process),
            "yara" => Ok(AlertKind::Yara),
            _ => Err(AlertError::InvalidKind(s.to_owned())),
        }
    }
}

/// Alert severity levels. Stored uppercase, matching the persisted shape
/// consumed by the dashboard and enrichment readers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertSeverity {
    /// Low severity alert
    Low,
    /// Medium severity alert
    Medium,
    /// High severity alert
    High,
    /// Critical severity alert
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertSeverity::Low => write!(f, "LOW"),
            AlertSeverity::Medium => write!(f, "MEDIUM"),
            AlertSeverity::High => write!(f, "HIGH"),
            AlertSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl std::str::FromStr for AlertSeverity {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LOW" => Ok(AlertSeverity::Low),
            "MEDIUM" => Ok(AlertSeverity::Medium),
            "HIGH" => Ok(AlertSeverity::High),
            "CRITICAL" => Ok(AlertSeverity::Critical),
            _ => Err(AlertError::InvalidSeverity(s.to_owned())),
        }
    }
}

/// A not-yet-persisted alert, as built by a producer. The store assigns the
/// identifier on insert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAlert {
    /// Producer that created the alert
    pub kind: AlertKind,
    /// Alert severity level
    pub severity: AlertSeverity,
    /// Human-readable description, never empty
    pub message: String,
    /// Creation timestamp (UTC), set once and never modified
    pub timestamp: DateTime<Utc>,
}

impl NewAlert {
    /// Create a new alert draft with the timestamp set to now.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::EmptyMessage` if the message is empty.
    pub fn new(
        kind: AlertKind,
        severity: AlertSeverity,
        message: impl Into<String>,
    ) -> Result<Self, AlertError> {
        let message = message.into();
        if message.is_empty() {
            return Err(AlertError::EmptyMessage);
        }
        Ok(Self {
            kind,
            severity,
            message,
            timestamp: Utc::now(),
        })
    }
}

/// A persisted alert record. Immutable once created; never updated or
/// deleted by the detection pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    /// Unique, strictly increasing identifier
    pub id: AlertId,
    /// Producer that created the alert
    pub kind: AlertKind,
    /// Alert severity level
    pub severity: AlertSeverity,
    /// Human-readable description
    pub message: String,
    /// Creation timestamp (UTC)
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    /// Attach a store-assigned identifier to a draft.
    pub fn from_draft(id: AlertId, draft: NewAlert) -> Self {
        Self {
            id,
            kind: draft.kind,
            severity: draft.severity,
            message: draft.message,
            timestamp: draft.timestamp,
        }
    }
}

/// Alert-related errors.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("invalid alert kind: {0}")]
    InvalidKind(String),
    #[error("invalid alert severity: {0}")]
    InvalidSeverity(String),
    #[error("alert message must not be empty")]
    EmptyMessage,
}
