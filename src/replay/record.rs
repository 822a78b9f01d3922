use crate::config::Destination;
use bytes::Bytes;
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// Version tag written into the header line.
pub const FORMAT_VERSION: &str = "1.0";

/// Writes replay records, one self-contained block per answered query:
///
/// ```text
/// ;v1.0 `label'  127.0.0.1:53
/// 1
/// 3
/// 0a 0b 0c
/// 2
/// ff 00
/// ```
///
/// Each record is rendered in full before it reaches the writer, so a failure
/// never leaves half a record behind.
pub struct RecordEmitter<W: Write> {
    out: W,
    scratch: Vec<u8>,
}

impl<W: Write> RecordEmitter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            scratch: Vec::with_capacity(4096),
        }
    }

    /// The `;` comment line that precedes all records.
    pub fn write_header(&mut self, label: &str, destination: &Destination) -> io::Result<()> {
        writeln!(self.out, ";v{FORMAT_VERSION} `{label}'  {destination}")?;
        self.out.flush()
    }

    pub fn emit(&mut self, sequence: u64, query: &[u8], answer: &[u8]) -> io::Result<()> {
        self.scratch.clear();
        writeln!(self.scratch, "{sequence}")?;
        write_block(&mut self.scratch, query)?;
        write_block(&mut self.scratch, answer)?;

        self.out.write_all(&self.scratch)?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Length line followed by the bytes as space separated lowercase hex pairs.
fn write_block(out: &mut Vec<u8>, data: &[u8]) -> io::Result<()> {
    writeln!(out, "{}", data.len())?;
    for (i, byte) in data.iter().enumerate() {
        if i > 0 {
            out.push(b' ');
        }
        write!(out, "{byte:02x}")?;
    }
    out.push(b'\n');
    Ok(())
}

/// One answered query, as read back from a replay log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayRecord {
    pub sequence: u64,
    pub query: Bytes,
    pub answer: Bytes,
}

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("line {line}: log ends in the middle of a record")]
    UnexpectedEof { line: usize },

    #[error("line {line}: expected a decimal number, found {found:?}")]
    BadNumber { line: usize, found: String },

    #[error("line {line}: invalid hex pair {token:?}")]
    BadHex { line: usize, token: String },

    #[error("line {line}: length says {declared} bytes but {actual} were dumped")]
    LengthMismatch {
        line: usize,
        declared: usize,
        actual: usize,
    },
}

/// Parses a replay log back into records, skipping `;` header lines.
pub struct RecordReader<R> {
    input: R,
    line: String,
    line_no: usize,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            line: String::new(),
            line_no: 0,
        }
    }

    fn next_line(&mut self) -> Result<Option<&str>, RecordError> {
        self.line.clear();
        if self.input.read_line(&mut self.line)? == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        Ok(Some(self.line.trim_end_matches(['\n', '\r'])))
    }

    fn required_line(&mut self) -> Result<&str, RecordError> {
        let line = self.line_no + 1;
        self.next_line()?.ok_or(RecordError::UnexpectedEof { line })
    }

    fn number(&mut self) -> Result<u64, RecordError> {
        let text = self.required_line()?;
        let parsed = text.trim().parse::<u64>();
        parsed.map_err(|_| RecordError::BadNumber {
            line: self.line_no,
            found: self.line.trim_end().to_string(),
        })
    }

    fn block(&mut self) -> Result<Bytes, RecordError> {
        let declared = self.number()? as usize;
        let line = self.line_no + 1;
        let dump = self.required_line()?;

        let mut bytes = Vec::with_capacity(declared);
        for token in dump.split_whitespace() {
            let pair = match hex::decode(token) {
                Ok(pair) if pair.len() == 1 => pair[0],
                _ => {
                    return Err(RecordError::BadHex {
                        line,
                        token: token.to_string(),
                    });
                }
            };
            bytes.push(pair);
        }

        if bytes.len() != declared {
            return Err(RecordError::LengthMismatch {
                line,
                declared,
                actual: bytes.len(),
            });
        }
        Ok(Bytes::from(bytes))
    }

    /// Reads the next record, or `None` at a clean end of input.
    pub fn read_record(&mut self) -> Result<Option<ReplayRecord>, RecordError> {
        let sequence = loop {
            let line = self.line_no + 1;
            match self.next_line()? {
                None => return Ok(None),
                Some(text) if text.starts_with(';') => continue,
                Some(text) => match text.trim().parse::<u64>() {
                    Ok(sequence) => break sequence,
                    Err(_) => {
                        return Err(RecordError::BadNumber {
                            line,
                            found: text.to_string(),
                        });
                    }
                },
            }
        };

        let query = self.block()?;
        let answer = self.block()?;
        Ok(Some(ReplayRecord {
            sequence,
            query,
            answer,
        }))
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<ReplayRecord, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}
