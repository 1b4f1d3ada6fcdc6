//! Streaming delimited-text (CSV-family) parsing and serialization
//!
//! The core is [`DelimParser`]: an explicit finite automaton driven by a
//! transition table, scanning byte chunks as they arrive. No full-buffer
//! assumption - a field, a record or even a malformed span may straddle
//! any number of chunks. Quoted and unquoted fields are distinguished,
//! CRLF/CR/LF line endings are normalized, and malformed lines are
//! recovered locally: the offending span goes to an error callback and
//! scanning resumes at the next line boundary without aborting the
//! stream.
//!
//! [`DelimEncoder`] is the inverse: it renders records back into quoted
//! delimited text. [`DelimReader`] and [`DelimWriter`] wrap the pair in
//! streaming file surfaces.
//!
//! # Quick Start
//!
//! ```
//! use delimstream::{DelimParser, ScanOptions};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let rows = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&rows);
//!
//! let mut parser = DelimParser::new(ScanOptions::default())
//!     .unwrap()
//!     .on_record(move |fields, _line| {
//!         sink.borrow_mut().push(fields.to_vec());
//!         None
//!     });
//!
//! parser.feed(b"name,city\nalice,");
//! parser.feed(b"\"NYC\"\n");
//! parser.finish();
//!
//! assert_eq!(
//!     *rows.borrow(),
//!     vec![vec!["name", "city"], vec!["alice", "NYC"]]
//! );
//! ```

pub mod automaton;
pub mod encoder;
pub mod error;
pub mod parser;
pub mod reader;
pub mod types;
pub mod writer;

pub use automaton::{Action, Automaton, Rule};
pub use encoder::DelimEncoder;
pub use error::{DelimError, Result};
pub use parser::{DelimParser, ErrorCallback, FieldCallback, RecordCallback, ScanOptions};
pub use reader::DelimReader;
pub use types::{Checkpoint, Encoding, FieldValue, ScanError, ScanState};
pub use writer::DelimWriter;
