//! Process snapshot data structures.

use std::fmt;
use std::path::PathBuf;

/// Strongly-typed process identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(u32);

impl ProcessId {
    /// Create a new process ID.
    pub fn new(pid: u32) -> Self {
        Self(pid)
    }

    /// Get the raw process ID value.
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point-in-time view of one live process, captured once per observed
/// process per monitor tick and discarded after classification. Not
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSnapshot {
    /// Process identifier
    pub pid: ProcessId,
    /// Process name
    pub name: String,
    /// Command line arguments, in order
    pub cmdline: Vec<String>,
    /// Path to the executable file, when readable
    pub exe: Option<PathBuf>,
}

impl ProcessSnapshot {
    /// Create a snapshot with the minimal required fields.
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid: ProcessId::new(pid),
            name: name.into(),
            cmdline: Vec::new(),
            exe: None,
        }
    }

    /// Set the command line tokens.
    pub fn with_cmdline<I, S>(mut self, cmdline: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cmdline = cmdline.into_iter().map(Into::into).collect();
        self
    }

    /// Set the executable path.
    pub fn with_exe(mut self, exe: impl Into<PathBuf>) -> Self {
        self.exe = Some(exe.into());
        self
    }

    /// The command line joined into a single string.
    pub fn command_string(&self) -> String {
        self.cmdline.join(" ")
    }
}
