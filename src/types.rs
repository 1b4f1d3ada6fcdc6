//! Type definitions for delimited-text scanning

use std::fmt;

/// Automaton states for the delimited-text scanner
///
/// The set is closed: the transition table in [`crate::automaton`] defines
/// exactly one rule list per state, and every state carries a default rule,
/// so a lookup always terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ScanState {
    /// Ready to begin a new field (and possibly a new record)
    FieldStart = 0,
    /// Just consumed a CR; an LF here completes a CRLF line break
    AfterCr = 1,
    /// Accumulating bytes of a field that did not open with a quote
    InUnquotedField = 2,
    /// Just consumed an opening quote; field content follows
    QuoteOpened = 3,
    /// Inside a quoted field; delimiter and line-break bytes are literal
    InQuotedField = 4,
    /// Just consumed a quote inside a quoted field: escape or close
    AfterClosingQuote = 5,
    /// Discarding a malformed line until the next line boundary
    SkipToEol = 6,
    /// Same, but the last byte seen was CR
    SkipToEolAfterCr = 7,
}

impl ScanState {
    /// Total number of states (table dimension)
    pub const COUNT: usize = 8;

    /// Human-readable state name for diagnostics
    pub fn name(self) -> &'static str {
        match self {
            ScanState::FieldStart => "field-start",
            ScanState::AfterCr => "after-cr",
            ScanState::InUnquotedField => "in-unquoted-field",
            ScanState::QuoteOpened => "quote-opened",
            ScanState::InQuotedField => "in-quoted-field",
            ScanState::AfterClosingQuote => "after-closing-quote",
            ScanState::SkipToEol => "skip-to-eol",
            ScanState::SkipToEolAfterCr => "skip-to-eol-after-cr",
        }
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Snapshot taken when the scanner enters an ambiguous span
///
/// Recorded when a transition begins error tracking and consumed when the
/// error is ultimately raised. Absence is an explicit `Option`, never a
/// sentinel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Checkpoint {
    /// State the automaton was in when the ambiguity began
    pub state: ScanState,
    /// 1-based column of the first ambiguous byte within its line
    pub column: u64,
    /// Absolute byte offset of the first ambiguous byte in the stream
    pub offset: u64,
}

/// Payload delivered to the error callback for a malformed line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanError {
    /// The offending text, reconstructed from the checkpoint to the point
    /// where the error was raised (line terminator excluded)
    pub text: String,
    /// 1-based line number of the malformed line
    pub line: u64,
    /// Column where the ambiguous span began
    pub column: u64,
    /// Automaton state at the checkpoint
    pub state: ScanState,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "malformed input at line {}, column {} ({}): {:?}",
            self.line, self.column, self.state, self.text
        )
    }
}

/// Declared text encoding of the input
///
/// Fields accumulate as raw bytes during the scan and are decoded with the
/// configured encoding only when a field is committed, so multi-byte
/// sequences that straddle chunk boundaries survive intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Encoding {
    /// UTF-8 (invalid sequences are replaced, not rejected)
    #[default]
    Utf8,
    /// ISO-8859-1: every byte maps to the code point of the same value
    Latin1,
}

impl Encoding {
    /// Decode an assembled field into text
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Encoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

/// Typed field value for writing delimited output
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldValue {
    /// Empty field
    Empty,
    /// String value
    String(String),
    /// Integer value
    Int(i64),
    /// Float value
    Float(f64),
    /// Boolean value
    Bool(bool),
}

impl FieldValue {
    /// Convert field value to string
    pub fn as_string(&self) -> String {
        match self {
            FieldValue::Empty => String::new(),
            FieldValue::String(s) => s.clone(),
            FieldValue::Int(i) => {
                let mut buf = itoa::Buffer::new();
                buf.format(*i).to_string()
            }
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Bool(b) => b.to_string(),
        }
    }

    /// Check if the field is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Empty)
    }

    /// Try to convert to integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            FieldValue::Float(f) => Some(*f as i64),
            FieldValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to convert to float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to convert to boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            FieldValue::Int(i) => Some(*i != 0),
            FieldValue::String(s) => match s.to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}
