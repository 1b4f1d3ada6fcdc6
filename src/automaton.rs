//! Transition-table construction for the delimited-text scanner
//!
//! The automaton is data, not a dispatch chain: each state owns an ordered
//! list of explicit `(trigger byte, transition)` rules plus exactly one
//! default transition, and the scan loop in [`crate::parser`] does nothing
//! but look up and apply. Building the table is a pure function of the
//! scan configuration, so the automaton can be tested independently of
//! the engine that drives it.

use crate::types::ScanState;

const CR: u8 = b'\r';
const LF: u8 = b'\n';

/// Side effect attached to a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// State change only
    Nop,
    /// Append the current byte to the field accumulator
    Append,
    /// Re-present the current byte to the new state before advancing
    Pushback,
    /// Commit the accumulated field to the record in progress
    CommitField,
    /// Commit the field, then the record
    CommitRecord,
    /// Snapshot the session into a checkpoint; the byte opens the
    /// ambiguous span
    Checkpoint,
    /// Add the byte to the ambiguous span without keeping it
    Discard,
    /// Report the span from the checkpoint and resume on the next line
    RaiseError,
    /// Same, but re-present the current byte to the new state
    RaiseErrorPushback,
}

/// One transition: where to go and what to do on the way
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    /// State to enter
    pub next: ScanState,
    /// Side effect to perform
    pub action: Action,
}

impl Rule {
    const fn new(next: ScanState, action: Action) -> Self {
        Rule { next, action }
    }
}

/// Rule list for a single state
#[derive(Debug, Clone)]
struct StateRules {
    /// Explicit triggers, matched in order
    matches: Vec<(u8, Rule)>,
    /// Applied when no explicit trigger matches
    default: Rule,
}

/// The built transition table plus the accepting-state set
///
/// Rebuilt whenever the configuration changes; holds no mutable scan state.
#[derive(Debug, Clone)]
pub struct Automaton {
    rules: Vec<StateRules>,
    accepting: [bool; ScanState::COUNT],
}

impl Automaton {
    /// Build the table for the given delimiter, quote byte and strictness
    ///
    /// `quote: None` disables quoting entirely: the quote states become
    /// unreachable and a quote byte is ordinary field content. With
    /// `quote_required` set, a field that does not open with the quote
    /// byte is malformed from its first byte.
    pub fn build(delimiter: u8, quote: Option<u8>, quote_required: bool) -> Self {
        use Action::*;
        use ScanState::*;

        let strict = quote_required && quote.is_some();
        let mut rules = Vec::with_capacity(ScanState::COUNT);

        // FieldStart
        let mut matches = Vec::new();
        if let Some(q) = quote {
            matches.push((q, Rule::new(QuoteOpened, Nop)));
        }
        matches.push((delimiter, Rule::new(FieldStart, CommitField)));
        matches.push((CR, Rule::new(AfterCr, CommitRecord)));
        matches.push((LF, Rule::new(FieldStart, CommitRecord)));
        rules.push(StateRules {
            matches,
            default: if strict {
                // An unquoted opening byte is malformed under strict quoting
                Rule::new(SkipToEol, Checkpoint)
            } else {
                Rule::new(InUnquotedField, Append)
            },
        });

        // AfterCr: normalize CRLF, treat a lone CR as a line terminator
        rules.push(StateRules {
            matches: vec![
                (LF, Rule::new(FieldStart, Nop)),
                (CR, Rule::new(AfterCr, CommitRecord)),
            ],
            default: Rule::new(FieldStart, Pushback),
        });

        // InUnquotedField
        let mut matches = vec![(delimiter, Rule::new(FieldStart, CommitField))];
        if let Some(q) = quote {
            // A quote mid unquoted field is always malformed; skip the
            // rest of the line and report once at the boundary
            matches.push((q, Rule::new(SkipToEol, Checkpoint)));
        }
        matches.push((CR, Rule::new(AfterCr, CommitRecord)));
        matches.push((LF, Rule::new(FieldStart, CommitRecord)));
        rules.push(StateRules {
            matches,
            default: Rule::new(InUnquotedField, Append),
        });

        // QuoteOpened
        rules.push(StateRules {
            matches: match quote {
                Some(q) => vec![(q, Rule::new(AfterClosingQuote, Nop))],
                None => Vec::new(),
            },
            default: Rule::new(InQuotedField, Append),
        });

        // InQuotedField: delimiter, CR and LF are literal content here
        rules.push(StateRules {
            matches: match quote {
                Some(q) => vec![(q, Rule::new(AfterClosingQuote, Nop))],
                None => Vec::new(),
            },
            default: Rule::new(InQuotedField, Append),
        });

        // AfterClosingQuote: escape-vs-close decision point
        let mut matches = vec![(delimiter, Rule::new(FieldStart, CommitField))];
        if let Some(q) = quote {
            // Doubled quote: one literal quote byte, back inside the field
            matches.push((q, Rule::new(QuoteOpened, Append)));
        }
        matches.push((CR, Rule::new(AfterCr, CommitRecord)));
        matches.push((LF, Rule::new(FieldStart, CommitRecord)));
        rules.push(StateRules {
            matches,
            default: Rule::new(SkipToEol, Checkpoint),
        });

        // SkipToEol
        rules.push(StateRules {
            matches: vec![
                (CR, Rule::new(SkipToEolAfterCr, Nop)),
                (LF, Rule::new(FieldStart, RaiseError)),
            ],
            default: Rule::new(SkipToEol, Discard),
        });

        // SkipToEolAfterCr
        rules.push(StateRules {
            matches: vec![(LF, Rule::new(FieldStart, RaiseError))],
            default: Rule::new(FieldStart, RaiseErrorPushback),
        });

        let mut accepting = [false; ScanState::COUNT];
        accepting[FieldStart as usize] = true;
        accepting[AfterCr as usize] = true;
        accepting[InUnquotedField as usize] = true;
        accepting[AfterClosingQuote as usize] = quote.is_some();

        Automaton { rules, accepting }
    }

    /// Look up the transition for a byte in a state
    ///
    /// Explicit triggers win over the default; every state has a default,
    /// so the lookup always yields a rule.
    #[inline]
    pub fn lookup(&self, state: ScanState, byte: u8) -> Rule {
        let entry = &self.rules[state as usize];
        for &(trigger, rule) in &entry.matches {
            if trigger == byte {
                return rule;
            }
        }
        entry.default
    }

    /// Whether ending the input in this state is valid
    #[inline]
    pub fn is_accepting(&self, state: ScanState) -> bool {
        self.accepting[state as usize]
    }
}
