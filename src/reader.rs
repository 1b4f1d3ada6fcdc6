//! Delimited file reading over the streaming parser

use crate::error::{DelimError, Result};
use crate::parser::{DelimParser, ScanOptions};
use crate::types::Encoding;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::rc::Rc;

const CHUNK_SIZE: usize = 8192;

/// Delimited-text file reader with streaming parsing
///
/// Feeds fixed-size chunks from the file through a [`DelimParser`], so a
/// record may span any number of chunks and memory usage stays constant.
/// Malformed lines are skipped (the parser's recovery semantics) and
/// tallied in [`error_count`](DelimReader::error_count).
///
/// # Examples
///
/// ```no_run
/// use delimstream::DelimReader;
///
/// let mut reader = DelimReader::open("data.csv").unwrap();
///
/// for record_result in reader.records() {
///     let record = record_result.unwrap();
///     println!("{:?}", record);
/// }
/// ```
///
/// # With Headers
///
/// ```no_run
/// use delimstream::DelimReader;
///
/// let mut reader = DelimReader::open("data.csv")
///     .unwrap()
///     .has_header(true);
///
/// for record_result in reader.records() {
///     let record = record_result.unwrap();
///     // Data records only; the header is consumed separately
/// }
///
/// if let Some(headers) = reader.headers() {
///     println!("Headers: {:?}", headers);
/// }
/// ```
pub struct DelimReader {
    reader: BufReader<File>,
    options: ScanOptions,
    has_header: bool,

    // Built lazily on first read so builder configuration applies
    parser: Option<DelimParser>,
    queue: Rc<RefCell<VecDeque<Vec<String>>>>,
    headers: Rc<RefCell<Option<Vec<String>>>>,
    errors: Rc<RefCell<u64>>,
    record_count: u64,
    done: bool,
}

impl DelimReader {
    /// Open a delimited-text file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())
            .map_err(|e| DelimError::Read(format!("Failed to open file: {}", e)))?;
        Ok(DelimReader {
            reader: BufReader::new(file),
            options: ScanOptions::default(),
            has_header: false,
            parser: None,
            queue: Rc::new(RefCell::new(VecDeque::new())),
            headers: Rc::new(RefCell::new(None)),
            errors: Rc::new(RefCell::new(0)),
            record_count: 0,
            done: false,
        })
    }

    /// Set custom delimiter (builder pattern)
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use delimstream::DelimReader;
    ///
    /// let reader = DelimReader::open("data.csv")
    ///     .unwrap()
    ///     .delimiter(b';');
    /// ```
    pub fn delimiter(mut self, delim: u8) -> Self {
        self.options.delimiter = delim;
        self
    }

    /// Set custom quote byte (builder pattern)
    pub fn quote_char(mut self, quote: u8) -> Self {
        self.options.quote = Some(quote);
        self
    }

    /// Disable quoting entirely (builder pattern)
    pub fn no_quoting(mut self) -> Self {
        self.options.quote = None;
        self
    }

    /// Require every field to open with the quote byte (builder pattern)
    pub fn quote_required(mut self, required: bool) -> Self {
        self.options.quote_required = required;
        self
    }

    /// Set the declared input encoding (builder pattern)
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.options.encoding = encoding;
        self
    }

    /// Skip a UTF-8 BOM at the start of the file (builder pattern)
    pub fn strip_bom(mut self, strip: bool) -> Self {
        self.options.strip_bom = strip;
        self
    }

    /// Treat the first record as a header (builder pattern)
    ///
    /// The header is routed to [`headers`](DelimReader::headers) and the
    /// record iterator yields data records only.
    pub fn has_header(mut self, has: bool) -> Self {
        self.has_header = has;
        self
    }

    /// Header record, once it has been read
    pub fn headers(&self) -> Option<Vec<String>> {
        self.headers.borrow().clone()
    }

    /// Read a single record
    ///
    /// Returns `Ok(None)` when EOF is reached. A trailing record with no
    /// terminating line break is flushed at EOF.
    pub fn read_record(&mut self) -> Result<Option<Vec<String>>> {
        self.ensure_parser()?;
        loop {
            if let Some(record) = self.queue.borrow_mut().pop_front() {
                self.record_count += 1;
                return Ok(Some(record));
            }
            if self.done {
                return Ok(None);
            }

            let mut chunk = [0u8; CHUNK_SIZE];
            let n = self
                .reader
                .read(&mut chunk)
                .map_err(|e| DelimError::Read(format!("Failed to read chunk: {}", e)))?;
            if let Some(parser) = self.parser.as_mut() {
                if n == 0 {
                    parser.finish();
                    self.done = true;
                } else {
                    parser.feed(&chunk[..n]);
                }
            }
        }
    }

    /// Get iterator over records
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use delimstream::DelimReader;
    ///
    /// let mut reader = DelimReader::open("data.csv").unwrap();
    ///
    /// for record_result in reader.records() {
    ///     let record = record_result.unwrap();
    ///     println!("{:?}", record);
    /// }
    /// ```
    pub fn records(&mut self) -> DelimRecordIterator<'_> {
        DelimRecordIterator { reader: self }
    }

    /// Number of data records read so far
    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    /// Number of malformed lines skipped so far
    pub fn error_count(&self) -> u64 {
        *self.errors.borrow()
    }

    fn ensure_parser(&mut self) -> Result<()> {
        if self.parser.is_some() {
            return Ok(());
        }
        let queue = Rc::clone(&self.queue);
        let errors = Rc::clone(&self.errors);
        let mut parser = DelimParser::new(self.options)?
            .on_record(move |fields, _line| {
                queue.borrow_mut().push_back(fields.to_vec());
                None
            })
            .on_error(move |_err| {
                *errors.borrow_mut() += 1;
            });
        if self.has_header {
            let headers = Rc::clone(&self.headers);
            parser = parser.on_header_record(move |fields, _line| {
                *headers.borrow_mut() = Some(fields.to_vec());
                None
            });
        }
        self.parser = Some(parser);
        Ok(())
    }
}

/// Iterator over records of a [`DelimReader`]
pub struct DelimRecordIterator<'a> {
    reader: &'a mut DelimReader,
}

impl<'a> Iterator for DelimRecordIterator<'a> {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_record().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::DelimWriter;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_path(temp: &NamedTempFile) -> String {
        temp.path().to_string_lossy().to_string()
    }

    #[test]
    fn test_read_plain_file() -> Result<()> {
        let temp = NamedTempFile::new().unwrap();
        let path = temp_path(&temp);
        {
            let mut writer = DelimWriter::new(&path)?;
            writer.write_record(["Name", "Age", "City"])?;
            writer.write_record(["Alice", "30", "NYC"])?;
            writer.write_record(["Bob", "25", "SF"])?;
            writer.save()?;
        }

        let mut reader = DelimReader::open(&path)?;
        let records: Vec<_> = reader.records().collect::<Result<Vec<_>>>()?;

        assert_eq!(records.len(), 3);
        assert_eq!(records[0], vec!["Name", "Age", "City"]);
        assert_eq!(records[1], vec!["Alice", "30", "NYC"]);
        assert_eq!(reader.record_count(), 3);
        assert_eq!(reader.error_count(), 0);
        Ok(())
    }

    #[test]
    fn test_read_with_headers() -> Result<()> {
        let temp = NamedTempFile::new().unwrap();
        let path = temp_path(&temp);
        {
            let mut writer = DelimWriter::new(&path)?;
            writer.write_record(["ID", "Name"])?;
            writer.write_record(["1", "Alice"])?;
            writer.write_record(["2", "Bob"])?;
            writer.save()?;
        }

        let mut reader = DelimReader::open(&path)?.has_header(true);
        assert_eq!(reader.headers(), None); // Not read yet

        let records: Vec<_> = reader.records().collect::<Result<Vec<_>>>()?;

        assert_eq!(
            reader.headers(),
            Some(vec!["ID".to_string(), "Name".to_string()])
        );
        // Iterator yields data records only
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], vec!["1", "Alice"]);
        Ok(())
    }

    #[test]
    fn test_malformed_lines_skipped_and_counted() -> Result<()> {
        let mut temp = NamedTempFile::new().unwrap();
        write!(temp, "good,line\nbad\"line\nanother,good\n").unwrap();
        temp.flush().unwrap();
        let path = temp_path(&temp);

        let mut reader = DelimReader::open(&path)?;
        let records: Vec<_> = reader.records().collect::<Result<Vec<_>>>()?;

        assert_eq!(
            records,
            vec![vec!["good", "line"], vec!["another", "good"]]
        );
        assert_eq!(reader.error_count(), 1);
        Ok(())
    }

    #[test]
    fn test_trailing_record_without_newline() -> Result<()> {
        let mut temp = NamedTempFile::new().unwrap();
        write!(temp, "a,b\nc,d").unwrap();
        temp.flush().unwrap();
        let path = temp_path(&temp);

        let mut reader = DelimReader::open(&path)?;
        let records: Vec<_> = reader.records().collect::<Result<Vec<_>>>()?;
        assert_eq!(records, vec![vec!["a", "b"], vec!["c", "d"]]);
        Ok(())
    }

    #[test]
    fn test_custom_delimiter() -> Result<()> {
        let mut temp = NamedTempFile::new().unwrap();
        write!(temp, "a;b;c\n").unwrap();
        temp.flush().unwrap();
        let path = temp_path(&temp);

        let mut reader = DelimReader::open(&path)?.delimiter(b';');
        let records: Vec<_> = reader.records().collect::<Result<Vec<_>>>()?;
        assert_eq!(records, vec![vec!["a", "b", "c"]]);
        Ok(())
    }
}
