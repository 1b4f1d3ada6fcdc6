//! Resumable delimited-text scanning
//!
//! [`DelimParser`] drives the transition table from [`crate::automaton`]
//! over byte chunks arriving incrementally. All scan state - automaton
//! state, partial field, partial record, line/column counters, error
//! checkpoint - lives in the parser and survives chunk boundaries, so a
//! field or record may span any number of `feed` calls. Input chunks are
//! only borrowed for the duration of a call; nothing in the session
//! references caller memory afterwards.

use crate::automaton::{Action, Automaton};
use crate::encoder::DelimEncoder;
use crate::error::{DelimError, Result};
use crate::types::{Checkpoint, Encoding, ScanError, ScanState};

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Callback invoked for each malformed line
pub type ErrorCallback = Box<dyn FnMut(&ScanError)>;

/// Callback invoked for each committed field: `(text, index, line)`
pub type FieldCallback = Box<dyn FnMut(&str, usize, u64)>;

/// Callback invoked for each committed record: `(fields, line)`
///
/// Text returned from the callback is accumulated into the return value
/// of the `feed` call that committed the record.
pub type RecordCallback = Box<dyn FnMut(&[String], u64) -> Option<String>>;

/// Scan configuration
///
/// Immutable once handed to a parser; [`DelimParser::reset_with`] swaps in
/// a new configuration and rebuilds the automaton.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanOptions {
    /// Field delimiter byte
    pub delimiter: u8,
    /// Quote byte; `None` disables quoting entirely
    pub quote: Option<u8>,
    /// Require every field to open with the quote byte
    pub quote_required: bool,
    /// Declared encoding, applied when a field is committed
    pub encoding: Encoding,
    /// Skip a UTF-8 BOM at the start of the first chunk
    pub strip_bom: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            delimiter: b',',
            quote: Some(b'"'),
            quote_required: false,
            encoding: Encoding::Utf8,
            strip_bom: false,
        }
    }
}

impl ScanOptions {
    /// Check that the configured bytes can coexist in one automaton
    ///
    /// The delimiter and quote must be distinct and neither may be CR or
    /// LF, otherwise the transition table would be ambiguous.
    pub fn validate(&self) -> Result<()> {
        if matches!(self.delimiter, b'\r' | b'\n') {
            return Err(DelimError::Config(
                "delimiter must not be CR or LF".to_string(),
            ));
        }
        if let Some(q) = self.quote {
            if matches!(q, b'\r' | b'\n') {
                return Err(DelimError::Config(
                    "quote must not be CR or LF".to_string(),
                ));
            }
            if q == self.delimiter {
                return Err(DelimError::Config(
                    "quote and delimiter must differ".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Streaming delimited-text parser
///
/// Feed byte chunks with [`feed`](DelimParser::feed), then call
/// [`finish`](DelimParser::finish) once after the last chunk to flush a
/// trailing record with no terminating line break. Malformed lines never
/// abort the stream: the offending span is reported through the error
/// callback and scanning resumes at the next line boundary.
///
/// A parser is single-threaded; independent instances are fully
/// independent and may run in parallel.
///
/// # Examples
///
/// ```
/// use delimstream::{DelimParser, ScanOptions};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let rows = Rc::new(RefCell::new(Vec::new()));
/// let sink = Rc::clone(&rows);
///
/// let mut parser = DelimParser::new(ScanOptions::default())
///     .unwrap()
///     .on_record(move |fields, _line| {
///         sink.borrow_mut().push(fields.to_vec());
///         None
///     });
///
/// // A quoted field may straddle chunk boundaries
/// parser.feed(b"x,y\r\nz,\"a\"\"");
/// parser.feed(b"b\"\n");
/// parser.finish();
///
/// assert_eq!(
///     *rows.borrow(),
///     vec![vec!["x", "y"], vec!["z", "a\"b"]]
/// );
/// ```
pub struct DelimParser {
    options: ScanOptions,
    automaton: Automaton,

    // Session state, reset explicitly
    state: ScanState,
    field: Vec<u8>,
    record: Vec<String>,
    line: u64,
    column: u64,
    offset: u64,
    checkpoint: Option<Checkpoint>,
    error_span: Vec<u8>,
    header: Option<Vec<String>>,
    header_pending: bool,
    bom_pending: bool,

    // Callback slots
    on_error: Option<ErrorCallback>,
    on_field: Option<FieldCallback>,
    on_header_field: Option<FieldCallback>,
    on_record: Option<RecordCallback>,
    on_header_record: Option<RecordCallback>,
}

impl DelimParser {
    /// Create a parser from validated options
    pub fn new(options: ScanOptions) -> Result<Self> {
        options.validate()?;
        let automaton = Automaton::build(options.delimiter, options.quote, options.quote_required);
        Ok(DelimParser {
            automaton,
            state: ScanState::FieldStart,
            field: Vec::with_capacity(64),
            record: Vec::new(),
            line: 1,
            column: 0,
            offset: 0,
            checkpoint: None,
            error_span: Vec::new(),
            header: None,
            header_pending: true,
            bom_pending: options.strip_bom,
            on_error: None,
            on_field: None,
            on_header_field: None,
            on_record: None,
            on_header_record: None,
            options,
        })
    }

    /// Install the error callback (builder pattern)
    pub fn on_error(mut self, cb: impl FnMut(&ScanError) + 'static) -> Self {
        self.on_error = Some(Box::new(cb));
        self
    }

    /// Install the data field callback (builder pattern)
    pub fn on_field(mut self, cb: impl FnMut(&str, usize, u64) + 'static) -> Self {
        self.on_field = Some(Box::new(cb));
        self
    }

    /// Install the header field callback (builder pattern)
    ///
    /// When set, field commits during the first record route here instead
    /// of the data field callback.
    pub fn on_header_field(mut self, cb: impl FnMut(&str, usize, u64) + 'static) -> Self {
        self.on_header_field = Some(Box::new(cb));
        self
    }

    /// Install the data record callback (builder pattern)
    ///
    /// Unset, committed records are silently dropped.
    pub fn on_record(
        mut self,
        cb: impl FnMut(&[String], u64) -> Option<String> + 'static,
    ) -> Self {
        self.on_record = Some(Box::new(cb));
        self
    }

    /// Install the header record callback (builder pattern)
    ///
    /// When set, the first record is routed here and retained as the
    /// header; all later records go to the data record callback.
    pub fn on_header_record(
        mut self,
        cb: impl FnMut(&[String], u64) -> Option<String> + 'static,
    ) -> Self {
        self.on_header_record = Some(Box::new(cb));
        self
    }

    /// Reinitialize the session, keeping configuration and callbacks
    pub fn reset(&mut self) {
        self.state = ScanState::FieldStart;
        self.field.clear();
        self.record.clear();
        self.line = 1;
        self.column = 0;
        self.offset = 0;
        self.checkpoint = None;
        self.error_span.clear();
        self.header = None;
        self.header_pending = true;
        self.bom_pending = self.options.strip_bom;
    }

    /// Reinitialize the session with a new configuration
    ///
    /// Rebuilds the automaton; fails on an invalid configuration without
    /// touching the current one.
    pub fn reset_with(&mut self, options: ScanOptions) -> Result<()> {
        options.validate()?;
        self.automaton = Automaton::build(options.delimiter, options.quote, options.quote_required);
        self.options = options;
        self.reset();
        Ok(())
    }

    /// Scan one chunk of bytes
    ///
    /// Resumable: the next call continues from the exact state this one
    /// left, including mid-field, mid-record and mid-error-span. Returns
    /// the text accumulated from record-callback return values during
    /// this call.
    pub fn feed(&mut self, chunk: &[u8]) -> String {
        let mut out = String::new();
        let mut data = chunk;

        if self.bom_pending && !data.is_empty() {
            self.bom_pending = false;
            if data.starts_with(&UTF8_BOM) {
                data = &data[UTF8_BOM.len()..];
                self.offset += UTF8_BOM.len() as u64;
            }
        }

        let mut i = 0;
        while i < data.len() {
            let byte = data[i];
            let rule = self.automaton.lookup(self.state, byte);
            match rule.action {
                // Pushback steps the cursor back by one: the byte is
                // re-presented to the new state on the next iteration and
                // only counted when finally consumed.
                Action::Pushback => {
                    self.state = rule.next;
                    continue;
                }
                Action::RaiseErrorPushback => {
                    self.raise_error();
                    self.state = rule.next;
                    continue;
                }
                action => {
                    if byte != b'\n' {
                        self.column += 1;
                    }
                    match action {
                        Action::Nop => {}
                        Action::Append => self.field.push(byte),
                        Action::CommitField => self.commit_field(),
                        Action::CommitRecord => self.commit_record(&mut out),
                        Action::Checkpoint => {
                            self.checkpoint = Some(Checkpoint {
                                state: self.state,
                                column: self.column,
                                offset: self.offset,
                            });
                            self.error_span.clear();
                            self.error_span.push(byte);
                        }
                        Action::Discard => self.error_span.push(byte),
                        Action::RaiseError => self.raise_error(),
                        // Handled above
                        Action::Pushback | Action::RaiseErrorPushback => {}
                    }
                    self.state = rule.next;
                    self.offset += 1;
                    i += 1;
                }
            }
        }
        out
    }

    /// Scan a text chunk
    pub fn feed_str(&mut self, chunk: &str) -> String {
        self.feed(chunk.as_bytes())
    }

    /// Complete the stream
    ///
    /// In an accepting state, flushes a trailing field/record with no
    /// terminating line break and returns `true` (text returned by the
    /// record callback during this flush is discarded). Otherwise the
    /// incomplete trailing field/record is dropped and `false` is
    /// returned; whether a dangling unterminated input is an error is the
    /// caller's decision.
    pub fn finish(&mut self) -> bool {
        let accepting = self.automaton.is_accepting(self.state);
        if accepting {
            let pending = !self.record.is_empty()
                || !self.field.is_empty()
                || self.state == ScanState::AfterClosingQuote;
            if pending {
                let mut out = String::new();
                self.commit_record(&mut out);
            }
        } else {
            self.field.clear();
            self.record.clear();
            self.checkpoint = None;
            self.error_span.clear();
        }
        self.state = ScanState::FieldStart;
        accepting
    }

    /// Serialize a record with this parser's delimiter and quote
    ///
    /// See [`DelimEncoder`] for the quoting contract.
    pub fn serialize<S: AsRef<str>>(&self, fields: &[S]) -> Result<String> {
        let encoder = match self.options.quote {
            Some(q) => DelimEncoder::new(self.options.delimiter, q),
            None => DelimEncoder::unquoted(self.options.delimiter),
        };
        encoder.encode_to_string(fields)
    }

    // Commit the accumulated field onto the record and notify the routed
    // field callback. Session mutation happens before the callback so a
    // misbehaving callback cannot corrupt the scan.
    fn commit_field(&mut self) {
        let text = self.options.encoding.decode(&self.field);
        self.field.clear();
        let index = self.record.len();
        let line = self.line;
        self.record.push(text);

        let slot = if self.header_pending && self.on_header_field.is_some() {
            &mut self.on_header_field
        } else {
            &mut self.on_field
        };
        if let Some(cb) = slot.as_mut() {
            cb(&self.record[index], index, line);
        }
    }

    // Commit the field, then the record; advance the line counter and
    // notify the routed record callback.
    fn commit_record(&mut self, out: &mut String) {
        self.commit_field();
        let line = self.line;
        let record = std::mem::take(&mut self.record);
        self.line += 1;
        self.column = 0;

        let route_header = self.header_pending && self.on_header_record.is_some();
        self.header_pending = false;
        if route_header {
            self.header = Some(record.clone());
            if let Some(cb) = self.on_header_record.as_mut() {
                if let Some(text) = cb(&record, line) {
                    out.push_str(&text);
                }
            }
        } else if let Some(cb) = self.on_record.as_mut() {
            if let Some(text) = cb(&record, line) {
                out.push_str(&text);
            }
        }
    }

    // Report the span from the checkpoint, drop the malformed line's
    // field/record, and advance to the next line.
    fn raise_error(&mut self) {
        let text = self.options.encoding.decode(&self.error_span);
        self.error_span.clear();
        self.field.clear();
        self.record.clear();
        let checkpoint = self.checkpoint.take();
        let line = self.line;
        self.line += 1;
        self.column = 0;

        if let Some(cb) = self.on_error.as_mut() {
            let (column, state) = match checkpoint {
                Some(cp) => (cp.column, cp.state),
                None => (0, self.state),
            };
            cb(&ScanError {
                text,
                line,
                column,
                state,
            });
        }
    }

    /// Configured field delimiter
    pub fn delimiter(&self) -> u8 {
        self.options.delimiter
    }

    /// Configured quote byte, if quoting is enabled
    pub fn quote(&self) -> Option<u8> {
        self.options.quote
    }

    /// Whether strict quoting is enabled
    pub fn quote_required(&self) -> bool {
        self.options.quote_required
    }

    /// Configured encoding
    pub fn encoding(&self) -> Encoding {
        self.options.encoding
    }

    /// 1-based line number of the line in progress
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Byte position within the current line
    pub fn column(&self) -> u64 {
        self.column
    }

    /// Absolute byte offset consumed so far
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Current automaton state
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Whether ending the input at the current state is valid
    pub fn is_accepting(&self) -> bool {
        self.automaton.is_accepting(self.state)
    }

    /// Decoded content of the field in progress
    pub fn field(&self) -> String {
        self.options.encoding.decode(&self.field)
    }

    /// Fields committed so far on the line in progress
    pub fn record(&self) -> &[String] {
        &self.record
    }

    /// The first record, when a header record callback consumed it
    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    /// Checkpoint of the ambiguous span in progress, if any
    pub fn checkpoint(&self) -> Option<Checkpoint> {
        self.checkpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Rows = Rc<RefCell<Vec<(Vec<String>, u64)>>>;
    type Errors = Rc<RefCell<Vec<ScanError>>>;

    fn collecting_parser(options: ScanOptions) -> (DelimParser, Rows, Errors) {
        let rows: Rows = Rc::new(RefCell::new(Vec::new()));
        let errors: Errors = Rc::new(RefCell::new(Vec::new()));
        let row_sink = Rc::clone(&rows);
        let err_sink = Rc::clone(&errors);
        let parser = DelimParser::new(options)
            .unwrap()
            .on_record(move |fields, line| {
                row_sink.borrow_mut().push((fields.to_vec(), line));
                None
            })
            .on_error(move |err| err_sink.borrow_mut().push(err.clone()));
        (parser, rows, errors)
    }

    fn rows_of(rows: &Rows) -> Vec<Vec<String>> {
        rows.borrow().iter().map(|(r, _)| r.clone()).collect()
    }

    #[test]
    fn test_single_chunk_records() {
        let (mut p, rows, errors) = collecting_parser(ScanOptions::default());
        p.feed(b"a,b,c\nd,e,f\n");
        assert!(p.finish());
        assert_eq!(
            rows_of(&rows),
            vec![vec!["a", "b", "c"], vec!["d", "e", "f"]]
        );
        assert!(errors.borrow().is_empty());
    }

    #[test]
    fn test_record_lines() {
        let (mut p, rows, _) = collecting_parser(ScanOptions::default());
        p.feed(b"a\nb\r\nc\n");
        let lines: Vec<u64> = rows.borrow().iter().map(|(_, l)| *l).collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }

    #[test]
    fn test_mixed_line_endings_with_escaped_quote() {
        // "x,y\r\nz,\"a\"\"b\"\n" yields two records across two lines
        let (mut p, rows, errors) = collecting_parser(ScanOptions::default());
        p.feed(b"x,y\r\nz,\"a\"\"b\"\n");
        assert!(p.finish());
        assert_eq!(rows_of(&rows), vec![vec!["x", "y"], vec!["z", "a\"b"]]);
        assert_eq!(rows.borrow()[0].1, 1);
        assert_eq!(rows.borrow()[1].1, 2);
        assert!(errors.borrow().is_empty());
    }

    #[test]
    fn test_chunk_split_invariance() {
        let input = b"x,y\r\nz,\"a\"\"b\"\nlast,one";
        let (mut whole, expect, _) = collecting_parser(ScanOptions::default());
        whole.feed(input);
        whole.finish();
        let expected = rows_of(&expect);

        for split in 0..=input.len() {
            let (mut p, rows, errors) = collecting_parser(ScanOptions::default());
            p.feed(&input[..split]);
            p.feed(&input[split..]);
            assert!(p.finish(), "split at {}", split);
            assert_eq!(rows_of(&rows), expected, "split at {}", split);
            assert!(errors.borrow().is_empty(), "split at {}", split);
        }
    }

    #[test]
    fn test_quoted_field_with_embedded_delimiter_and_newline() {
        let (mut p, rows, _) = collecting_parser(ScanOptions::default());
        p.feed(b"\"a,b\",\"1\n2\"\n");
        assert_eq!(rows_of(&rows), vec![vec!["a,b", "1\n2"]]);
    }

    #[test]
    fn test_lone_cr_terminates_record() {
        let (mut p, rows, _) = collecting_parser(ScanOptions::default());
        p.feed(b"a,b\rc,d\r");
        assert!(p.finish());
        assert_eq!(rows_of(&rows), vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn test_finish_flushes_trailing_record() {
        let (mut p, rows, _) = collecting_parser(ScanOptions::default());
        p.feed(b"a,b,c");
        assert!(p.finish());
        assert_eq!(rows_of(&rows), vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn test_finish_mid_quoted_field_discards() {
        let (mut p, rows, _) = collecting_parser(ScanOptions::default());
        p.feed(b"a,\"b");
        assert!(!p.finish());
        assert!(rows.borrow().is_empty());
    }

    #[test]
    fn test_finish_trailing_delimiter_keeps_empty_field() {
        let (mut p, rows, _) = collecting_parser(ScanOptions::default());
        p.feed(b"a,");
        assert!(p.finish());
        assert_eq!(rows_of(&rows), vec![vec!["a", ""]]);
    }

    #[test]
    fn test_finish_on_clean_boundary_flushes_nothing() {
        let (mut p, rows, _) = collecting_parser(ScanOptions::default());
        p.feed(b"a\n");
        assert!(p.finish());
        assert_eq!(rows_of(&rows), vec![vec!["a"]]);
    }

    #[test]
    fn test_quote_mid_unquoted_field_recovers() {
        let (mut p, rows, errors) = collecting_parser(ScanOptions::default());
        p.feed(b"ab\"cd,e\nok,line\n");
        assert_eq!(errors.borrow().len(), 1);
        let err = &errors.borrow()[0];
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 3);
        assert_eq!(err.state, ScanState::InUnquotedField);
        assert_eq!(err.text, "\"cd,e");
        // The malformed line produced no record; scanning resumed cleanly
        assert_eq!(rows_of(&rows), vec![vec!["ok", "line"]]);
    }

    #[test]
    fn test_trailing_garbage_after_closing_quote() {
        let (mut p, rows, errors) = collecting_parser(ScanOptions::default());
        p.feed(b"\"ab\"x,y\nok\n");
        assert_eq!(errors.borrow().len(), 1);
        assert_eq!(errors.borrow()[0].state, ScanState::AfterClosingQuote);
        assert_eq!(errors.borrow()[0].text, "x,y");
        assert_eq!(rows_of(&rows), vec![vec!["ok"]]);
    }

    #[test]
    fn test_strict_quoting_rejects_bare_line() {
        let options = ScanOptions {
            quote_required: true,
            ..ScanOptions::default()
        };
        let (mut p, rows, errors) = collecting_parser(options);
        p.feed(b"bare,line\n\"ok\",\"fine\"\n");
        assert_eq!(errors.borrow().len(), 1);
        let err = &errors.borrow()[0];
        assert_eq!(err.line, 1);
        assert_eq!(err.column, 1);
        assert_eq!(err.state, ScanState::FieldStart);
        assert_eq!(err.text, "bare,line");
        assert_eq!(rows_of(&rows), vec![vec!["ok", "fine"]]);
    }

    #[test]
    fn test_error_span_across_chunks() {
        let (mut p, _, errors) = collecting_parser(ScanOptions::default());
        p.feed(b"ab\"c");
        p.feed(b"d,e\n");
        assert_eq!(errors.borrow().len(), 1);
        assert_eq!(errors.borrow()[0].text, "\"cd,e");
    }

    #[test]
    fn test_error_with_crlf_terminator() {
        let (mut p, rows, errors) = collecting_parser(ScanOptions::default());
        p.feed(b"ab\"cd\r\nok\n");
        assert_eq!(errors.borrow().len(), 1);
        assert_eq!(errors.borrow()[0].text, "\"cd");
        assert_eq!(rows_of(&rows), vec![vec!["ok"]]);
    }

    #[test]
    fn test_error_with_lone_cr_terminator_pushback() {
        let (mut p, rows, errors) = collecting_parser(ScanOptions::default());
        p.feed(b"ab\"cd\rnext,line\n");
        assert_eq!(errors.borrow().len(), 1);
        // The byte after the CR starts the next line
        assert_eq!(rows_of(&rows), vec![vec!["next", "line"]]);
        assert_eq!(rows.borrow()[0].1, 2);
    }

    #[test]
    fn test_quoting_disabled() {
        let options = ScanOptions {
            quote: None,
            ..ScanOptions::default()
        };
        let (mut p, rows, errors) = collecting_parser(options);
        p.feed(b"a\"b,c\"\n");
        assert!(p.finish());
        assert_eq!(rows_of(&rows), vec![vec!["a\"b", "c\""]]);
        assert!(errors.borrow().is_empty());
    }

    #[test]
    fn test_header_routing() {
        let header: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let header_fields: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let data: Rows = Rc::new(RefCell::new(Vec::new()));
        let data_fields: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));

        let h = Rc::clone(&header);
        let hf = Rc::clone(&header_fields);
        let d = Rc::clone(&data);
        let df = Rc::clone(&data_fields);
        let mut p = DelimParser::new(ScanOptions::default())
            .unwrap()
            .on_header_record(move |fields, _| {
                *h.borrow_mut() = fields.to_vec();
                None
            })
            .on_header_field(move |f, _, _| hf.borrow_mut().push(f.to_string()))
            .on_record(move |fields, line| {
                d.borrow_mut().push((fields.to_vec(), line));
                None
            })
            .on_field(move |f, _, _| df.borrow_mut().push(f.to_string()));

        p.feed(b"id,name\n1,alice\n2,bob\n");
        assert!(p.finish());

        assert_eq!(*header.borrow(), vec!["id", "name"]);
        assert_eq!(*header_fields.borrow(), vec!["id", "name"]);
        assert_eq!(p.header(), Some(&["id".to_string(), "name".to_string()][..]));
        assert_eq!(
            rows_of(&data),
            vec![vec!["1", "alice"], vec!["2", "bob"]]
        );
        assert_eq!(*data_fields.borrow(), vec!["1", "alice", "2", "bob"]);
    }

    #[test]
    fn test_no_header_callback_routes_first_record_to_data() {
        let (mut p, rows, _) = collecting_parser(ScanOptions::default());
        p.feed(b"id,name\n1,alice\n");
        assert_eq!(rows_of(&rows), vec![vec!["id", "name"], vec!["1", "alice"]]);
        assert_eq!(p.header(), None);
    }

    #[test]
    fn test_record_callback_output_accumulates() {
        let mut p = DelimParser::new(ScanOptions::default())
            .unwrap()
            .on_record(|fields, _| Some(format!("[{}]", fields.join("|"))));
        let out = p.feed(b"a,b\nc,d\ne");
        assert_eq!(out, "[a|b][c|d]");
        // The trailing record is flushed by finish; its output is dropped
        assert!(p.finish());
    }

    #[test]
    fn test_field_callback_indices() {
        let seen: Rc<RefCell<Vec<(String, usize, u64)>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut p = DelimParser::new(ScanOptions::default())
            .unwrap()
            .on_field(move |f, i, l| sink.borrow_mut().push((f.to_string(), i, l)));
        p.feed(b"a,b\nc\n");
        assert_eq!(
            *seen.borrow(),
            vec![
                ("a".to_string(), 0, 1),
                ("b".to_string(), 1, 1),
                ("c".to_string(), 0, 2),
            ]
        );
    }

    #[test]
    fn test_serialize_round_trip() {
        let (mut p, rows, _) = collecting_parser(ScanOptions::default());
        let original = vec!["plain", "with,comma", "with\"quote", ""];
        let text = p.serialize(&original).unwrap();
        p.feed_str(&text);
        assert!(p.finish());
        assert_eq!(rows_of(&rows), vec![original]);
    }

    #[test]
    fn test_reset_clears_session() {
        let (mut p, rows, _) = collecting_parser(ScanOptions::default());
        p.feed(b"a,\"unterminated");
        assert_eq!(p.state(), ScanState::InQuotedField);
        p.reset();
        assert_eq!(p.state(), ScanState::FieldStart);
        assert_eq!(p.line(), 1);
        assert_eq!(p.column(), 0);
        assert_eq!(p.record(), &[] as &[String]);
        p.feed(b"x\n");
        assert_eq!(rows_of(&rows), vec![vec!["x"]]);
    }

    #[test]
    fn test_reset_with_new_configuration() {
        let (mut p, rows, _) = collecting_parser(ScanOptions::default());
        p.reset_with(ScanOptions {
            delimiter: b';',
            ..ScanOptions::default()
        })
        .unwrap();
        p.feed(b"a;b\n");
        assert_eq!(rows_of(&rows), vec![vec!["a", "b"]]);
        assert_eq!(p.delimiter(), b';');
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(DelimParser::new(ScanOptions {
            delimiter: b'"',
            ..ScanOptions::default()
        })
        .is_err());
        assert!(DelimParser::new(ScanOptions {
            delimiter: b'\n',
            ..ScanOptions::default()
        })
        .is_err());
        assert!(DelimParser::new(ScanOptions {
            quote: Some(b'\r'),
            ..ScanOptions::default()
        })
        .is_err());
    }

    #[test]
    fn test_latin1_decoding_at_commit() {
        let options = ScanOptions {
            encoding: Encoding::Latin1,
            ..ScanOptions::default()
        };
        let (mut p, rows, _) = collecting_parser(options);
        p.feed(&[b'h', 0xE9, b',', b'x', b'\n']);
        assert_eq!(rows_of(&rows), vec![vec!["hé", "x"]]);
    }

    #[test]
    fn test_utf8_field_split_across_chunks() {
        let (mut p, rows, _) = collecting_parser(ScanOptions::default());
        let bytes = "é,x\n".as_bytes();
        // Split inside the two-byte sequence
        p.feed(&bytes[..1]);
        p.feed(&bytes[1..]);
        assert_eq!(rows_of(&rows), vec![vec!["é", "x"]]);
    }

    #[test]
    fn test_bom_stripped_on_first_chunk_only() {
        let options = ScanOptions {
            strip_bom: true,
            ..ScanOptions::default()
        };
        let (mut p, rows, _) = collecting_parser(options);
        p.feed(b"\xEF\xBB\xBFa,b\n");
        assert_eq!(rows_of(&rows), vec![vec!["a", "b"]]);
    }

    #[test]
    fn test_bom_not_stripped_by_default() {
        let (mut p, rows, _) = collecting_parser(ScanOptions::default());
        p.feed(b"\xEF\xBB\xBFa\n");
        assert_eq!(rows_of(&rows), vec![vec!["\u{FEFF}a"]]);
    }

    #[test]
    fn test_empty_quoted_trailing_field_flushes() {
        let (mut p, rows, _) = collecting_parser(ScanOptions::default());
        p.feed(b"\"\"");
        assert!(p.finish());
        assert_eq!(rows_of(&rows), vec![vec![""]]);
    }

    #[test]
    fn test_introspection_mid_scan() {
        let mut p = DelimParser::new(ScanOptions::default()).unwrap();
        p.feed(b"ab,cd\nef");
        assert_eq!(p.line(), 2);
        assert_eq!(p.column(), 2);
        assert_eq!(p.offset(), 8);
        assert_eq!(p.field(), "ef");
        assert_eq!(p.state(), ScanState::InUnquotedField);
        assert!(p.is_accepting());
        assert!(p.checkpoint().is_none());
    }

    #[test]
    fn test_checkpoint_visible_mid_error_span() {
        let mut p = DelimParser::new(ScanOptions::default()).unwrap();
        p.feed(b"ab\"cd");
        let cp = p.checkpoint().expect("checkpoint set");
        assert_eq!(cp.state, ScanState::InUnquotedField);
        assert_eq!(cp.column, 3);
        assert_eq!(cp.offset, 2);
        assert!(!p.is_accepting());
    }
}
