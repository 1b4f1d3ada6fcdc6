//! Delimited-text serialization, the inverse of the scanner
//!
//! With a quote byte configured, every field is wrapped in quotes and an
//! embedded quote is escaped by doubling, so the output parses back to the
//! original fields regardless of content. With quoting disabled the fields
//! are joined with the bare delimiter; that mode has a hard restriction:
//! field content must not contain the delimiter, CR or LF, and violations
//! are reported instead of producing output that would not round-trip.

use crate::error::{DelimError, Result};

/// Encoder for rendering records back into delimited text
pub struct DelimEncoder {
    delimiter: u8,
    quote: Option<u8>,
}

impl DelimEncoder {
    /// Create an encoder with a delimiter and quote byte
    pub fn new(delimiter: u8, quote: u8) -> Self {
        DelimEncoder {
            delimiter,
            quote: Some(quote),
        }
    }

    /// Create an encoder with quoting disabled
    ///
    /// Fields must not contain the delimiter, CR or LF; `encode_row`
    /// fails on such content.
    pub fn unquoted(delimiter: u8) -> Self {
        DelimEncoder {
            delimiter,
            quote: None,
        }
    }

    /// Encode a record into the buffer (no line ending appended)
    pub fn encode_row<S: AsRef<str>>(&self, fields: &[S], buffer: &mut Vec<u8>) -> Result<()> {
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                buffer.push(self.delimiter);
            }
            self.encode_field(field.as_ref(), buffer)?;
        }
        Ok(())
    }

    /// Encode a record into a fresh string
    pub fn encode_to_string<S: AsRef<str>>(&self, fields: &[S]) -> Result<String> {
        let mut buffer = Vec::with_capacity(fields.len() * 16);
        self.encode_row(fields, &mut buffer)?;
        // Quoting and escaping only insert single-byte characters, so the
        // output is valid UTF-8 whenever the fields are
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    fn encode_field(&self, field: &str, buffer: &mut Vec<u8>) -> Result<()> {
        match self.quote {
            Some(quote) => {
                buffer.push(quote);
                for byte in field.bytes() {
                    if byte == quote {
                        // Escape quotes by doubling: " -> ""
                        buffer.push(quote);
                        buffer.push(quote);
                    } else {
                        buffer.push(byte);
                    }
                }
                buffer.push(quote);
            }
            None => {
                if field
                    .bytes()
                    .any(|b| b == self.delimiter || b == b'\r' || b == b'\n')
                {
                    return Err(DelimError::Write(format!(
                        "field {:?} contains the delimiter or a line break; \
                         unquoted output cannot represent it",
                        field
                    )));
                }
                buffer.extend_from_slice(field.as_bytes());
            }
        }
        Ok(())
    }
}
