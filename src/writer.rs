//! Delimited file writing over the record serializer

use crate::encoder::DelimEncoder;
use crate::error::{DelimError, Result};
use crate::types::FieldValue;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Delimited-text file writer with streaming output
///
/// Writes records one at a time through a buffered file handle; memory
/// usage is constant regardless of dataset size. Every field is quoted on
/// output (see [`DelimEncoder`]), so any content round-trips through the
/// parser.
///
/// # Examples
///
/// ```no_run
/// use delimstream::DelimWriter;
///
/// let mut writer = DelimWriter::new("output.csv").unwrap();
/// writer.write_record(["Name", "Age", "City"]).unwrap();
/// writer.write_record(["Alice", "30", "NYC"]).unwrap();
/// writer.save().unwrap();
/// ```
pub struct DelimWriter {
    writer: BufWriter<File>,

    // State
    record_count: u64,
    buffer: Vec<u8>,

    // Configuration
    delimiter: u8,
    quote: Option<u8>,
    line_ending: &'static [u8],
}

impl DelimWriter {
    /// Create a new writer
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path.as_ref())
            .map_err(|e| DelimError::Write(format!("Failed to create file: {}", e)))?;
        Ok(DelimWriter {
            writer: BufWriter::new(file),
            record_count: 0,
            buffer: Vec::with_capacity(4096),
            delimiter: b',',
            quote: Some(b'"'),
            line_ending: b"\n",
        })
    }

    /// Set custom delimiter (builder pattern)
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use delimstream::DelimWriter;
    ///
    /// let mut writer = DelimWriter::new("data.csv")
    ///     .unwrap()
    ///     .delimiter(b';');
    /// ```
    pub fn delimiter(mut self, delim: u8) -> Self {
        self.delimiter = delim;
        self
    }

    /// Set custom quote byte (builder pattern)
    pub fn quote_char(mut self, quote: u8) -> Self {
        self.quote = Some(quote);
        self
    }

    /// Disable quoting (builder pattern)
    ///
    /// Fields must then be free of the delimiter, CR and LF;
    /// `write_record` fails otherwise.
    pub fn no_quoting(mut self) -> Self {
        self.quote = None;
        self
    }

    /// Terminate records with CRLF instead of LF (builder pattern)
    pub fn crlf(mut self) -> Self {
        self.line_ending = b"\r\n";
        self
    }

    /// Write a record of strings
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use delimstream::DelimWriter;
    ///
    /// let mut writer = DelimWriter::new("data.csv").unwrap();
    /// writer.write_record(["Name", "Age"]).unwrap();
    /// writer.write_record(["Alice", "30"]).unwrap();
    /// writer.save().unwrap();
    /// ```
    pub fn write_record<I, S>(&mut self, record: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        // Reuse buffer
        self.buffer.clear();

        let encoder = match self.quote {
            Some(q) => DelimEncoder::new(self.delimiter, q),
            None => DelimEncoder::unquoted(self.delimiter),
        };
        let fields: Vec<String> = record.into_iter().map(|s| s.as_ref().to_string()).collect();
        encoder.encode_row(&fields, &mut self.buffer)?;
        self.buffer.extend_from_slice(self.line_ending);

        self.writer
            .write_all(&self.buffer)
            .map_err(|e| DelimError::Write(format!("Failed to write to file: {}", e)))?;

        self.record_count += 1;
        Ok(())
    }

    /// Write a record of typed values
    ///
    /// Converts [`FieldValue`]s to strings before writing.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use delimstream::{DelimWriter, FieldValue};
    ///
    /// let mut writer = DelimWriter::new("data.csv").unwrap();
    /// writer.write_record_typed(&[
    ///     FieldValue::String("Alice".to_string()),
    ///     FieldValue::Int(30),
    ///     FieldValue::Float(75.5),
    /// ]).unwrap();
    /// ```
    pub fn write_record_typed(&mut self, fields: &[FieldValue]) -> Result<()> {
        let strings: Vec<String> = fields.iter().map(|f| f.as_string()).collect();
        self.write_record(strings)
    }

    /// Write multiple records at once
    pub fn write_records_batch<I, R, S>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }

    /// Number of records written
    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    /// Finalize and save the file
    ///
    /// Consumes the writer; must be called to flush buffered output.
    pub fn save(mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| DelimError::Write(format!("Failed to flush file: {}", e)))?;
        Ok(())
    }
}
