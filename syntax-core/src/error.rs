//! Error types surfaced by the core (spec §7).
//!
//! One enum per failure boundary rather than a single crate-wide error,
//! following the scanner/lexer convention in the wider regex-tooling
//! ecosystem (e.g. `scnr`'s `ScannerError`/`RegexError` split): regex syntax
//! errors are a parse-time concern, rule compilation wraps them with the
//! offending rule's index, and scan-time errors are a distinct, much
//! smaller set bubbled up from the reader.

use thiserror::Error;

/// Failure to parse a regex pattern (spec §4.1).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegexError {
    #[error("empty regex")]
    EmptyRegex,

    #[error("unbalanced parenthesis at byte {at}")]
    UnbalancedParen { at: usize },

    #[error("quantifier at byte {at} has nothing to repeat")]
    DanglingQuantifier { at: usize },

    #[error("unterminated character class starting at byte {at}")]
    UnterminatedCharClass { at: usize },

    #[error("invalid escape sequence `\\{ch}` at byte {at}")]
    InvalidEscape { at: usize, ch: char },

    #[error("unsupported Unicode category `{name}` at byte {at}")]
    UnsupportedUnicodeCategory { at: usize, name: String },
}

/// A regex error attributed to a specific rule in a rule table (spec §7).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("rule {rule_index}: {source}")]
pub struct RuleCompileError {
    pub rule_index: usize,
    #[source]
    pub source: RegexError,
}

/// Errors that can occur while scanning a [`TextReader`](crate::regex::reader::TextReader).
///
/// Malformed *text* never produces a `ScanError` (spec §7: unrecognized
/// spans become `None`-role tokens); only a misbehaving reader does.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("reader error: {0}")]
    Io(#[from] std::io::Error),

    #[error("reader produced invalid UTF-8 at byte {at}")]
    InvalidUtf8 { at: usize },
}
