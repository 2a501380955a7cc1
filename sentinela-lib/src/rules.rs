//! Rule engine contract and the bundled signature engine.
//!
//! The static scanner depends only on the [`RuleEngine`] trait, not on any
//! specific matching engine: a binding to a real YARA library satisfies the
//! scanner just as well as the bundled substring-signature engine.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Rule engine errors.
#[derive(Debug, Error)]
pub enum RuleError {
    /// Malformed rule syntax. Fatal for the scan invocation that needed the
    /// rule set; no files are examined.
    #[error("failed to compile rules from {path}: {message}")]
    Compile { path: PathBuf, message: String },

    /// A file the engine could not read. Recoverable; the scanner skips the
    /// file and continues.
    #[error("unreadable file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Black-box file-matching capability.
pub trait RuleEngine: Send + Sync {
    /// An immutable compiled rule set. Read-only after compilation and safe
    /// to reuse across repeated scans from any number of callers.
    type Compiled: Send + Sync;

    /// Compile a rule file into a rule set.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::Compile` on malformed rule syntax.
    fn compile(&self, rules_path: &Path) -> Result<Self::Compiled, RuleError>;

    /// Match one file against a compiled rule set, reporting the
    /// identifiers of every matching rule in stable declared order.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::Read` if the file cannot be read.
    fn match_file(&self, rules: &Self::Compiled, path: &Path) -> Result<Vec<String>, RuleError>;
}

/// One rule as declared in a signature rule file.
#[derive(Debug, Deserialize)]
struct SignatureRule {
    name: String,
    patterns: Vec<String>,
}

/// A compiled signature rule: name plus its patterns as raw bytes.
#[derive(Debug, Clone)]
struct CompiledRule {
    name: String,
    patterns: Vec<Vec<u8>>,
}

/// An immutable compiled signature rule set, in declared order.
#[derive(Debug, Clone)]
pub struct CompiledSignatures {
    rules: Vec<CompiledRule>,
}

impl CompiledSignatures {
    /// Number of compiled rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set holds no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// The bundled rule engine: byte-substring signatures declared in a YAML
/// file as a list of `{name, patterns}` entries. A file matches a rule when
/// it contains any of the rule's patterns.
#[derive(Debug, Default)]
pub struct SignatureEngine;

impl SignatureEngine {
    /// Create a new engine.
    pub const fn new() -> Self {
        Self
    }
}

fn compile_error(path: &Path, message: impl Into<String>) -> RuleError {
    RuleError::Compile {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.len() <= haystack.len() && haystack.windows(needle.len()).any(|window| window == needle)
}

impl RuleEngine for SignatureEngine {
    type Compiled = CompiledSignatures;

    fn compile(&self, rules_path: &Path) -> Result<Self::Compiled, RuleError> {
        let content = std::fs::read_to_string(rules_path)
            .map_err(|e| compile_error(rules_path, e.to_string()))?;
        let declared: Vec<SignatureRule> = serde_yaml::from_str(&content)
            .map_err(|e| compile_error(rules_path, e.to_string()))?;

        if declared.is_empty() {
            return Err(compile_error(rules_path, "rule file declares no rules"));
        }

        let mut rules = Vec::with_capacity(declared.len());
        for rule in declared {
            if rule.name.is_empty() {
                return Err(compile_error(rules_path, "rule with empty name"));
            }
            if rule.patterns.is_empty() {
                return Err(compile_error(
                    rules_path,
                    format!("rule '{}' declares no patterns", rule.name),
                ));
            }
            if rule.patterns.iter().any(String::is_empty) {
                return Err(compile_error(
                    rules_path,
                    format!("rule '{}' declares an empty pattern", rule.name),
                ));
            }
            rules.push(CompiledRule {
                name: rule.name,
                patterns: rule.patterns.into_iter().map(String::into_bytes).collect(),
            });
        }

        Ok(CompiledSignatures { rules })
    }

    fn match_file(
        &self,
        rules: &Self::Compiled,
        path: &Path,
    ) -> Result<Vec<String>, RuleError> {
        let content = std::fs::read(path).map_err(|source| RuleError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let matched = rules
            .rules
            .iter()
            .filter(|rule| {
                rule.patterns
                    .iter()
                    .any(|pattern| contains(&content, pattern))
            })
            .map(|rule| rule.name.clone())
            .collect();
        Ok(matched)
    }
}
