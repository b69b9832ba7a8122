//! PNOR table of contents parsing
//!
//! The TOC is a text file with one partition per line:
//!
//! ```text
//! partition01=HBB,00010000,000a0000,ECC,PRESERVED
//! partition02=HBEL,000a0000,000c0000,ECC
//! ```
//!
//! A line is a candidate when it starts with `partition<digits>=`, followed by
//! a name made of ASCII letters, digits and underscores, then two hex offsets
//! separated by commas. Whatever follows the end offset is kept verbatim as
//! the attribute suffix. Any other line (comments, blank lines, malformed
//! entries) is skipped without error.

use std::io::BufRead;

use crate::error::TocError;

/// Prefix of every partition line
const PARTITION_PREFIX: &str = "partition";

/// One candidate partition line
///
/// Numeric fields are kept as written. They are only converted by
/// [`TocEntry::numbers`], once the caller has decided the line is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    /// 1-based line number in the TOC
    pub line: usize,
    /// Decimal digits following `partition`
    pub id: String,
    /// Partition name, also the name of its backing file
    pub name: String,
    /// Hex digits of the start offset
    pub start: String,
    /// Hex digits of the end offset (exclusive)
    pub end: String,
    /// Everything after the end offset, e.g. `,ECC,PRESERVED`
    pub attributes: String,
}

/// Numeric fields of a [`TocEntry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocNumbers {
    /// Partition id
    pub id: u32,
    /// Start offset
    pub start: u32,
    /// End offset (exclusive)
    pub end: u32,
}

/// Split `s` after the longest prefix whose characters satisfy `pred`
fn split_run(s: &str, pred: impl Fn(char) -> bool) -> (&str, &str) {
    let idx = s.find(|c: char| !pred(c)).unwrap_or(s.len());
    s.split_at(idx)
}

impl TocEntry {
    /// Parse one TOC line
    ///
    /// Returns `None` for lines that are not partition entries.
    pub fn parse(line: usize, text: &str) -> Option<Self> {
        let rest = text.strip_prefix(PARTITION_PREFIX)?;

        let (id, rest) = split_run(rest, |c| c.is_ascii_digit());
        let rest = rest.strip_prefix('=').filter(|_| !id.is_empty())?;

        let (name, rest) = split_run(rest, |c| c.is_ascii_alphanumeric() || c == '_');
        let rest = rest.strip_prefix(',').filter(|_| !name.is_empty())?;

        let (start, rest) = split_run(rest, |c| c.is_ascii_hexdigit());
        let rest = rest.strip_prefix(',').filter(|_| !start.is_empty())?;

        let (end, attributes) = split_run(rest, |c| c.is_ascii_hexdigit());
        if end.is_empty() {
            return None;
        }

        Some(Self {
            line,
            id: id.to_string(),
            name: name.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            attributes: attributes.to_string(),
        })
    }

    /// Convert the id and offsets
    ///
    /// Fails if any of them does not fit in 32 bits.
    pub fn numbers(&self) -> Result<TocNumbers, TocError> {
        let offset = |value: &str| {
            u32::from_str_radix(value, 16).map_err(|_| TocError::InvalidOffset {
                line: self.line,
                value: value.to_string(),
            })
        };

        Ok(TocNumbers {
            id: self.id.parse().map_err(|_| TocError::InvalidId {
                line: self.line,
                value: self.id.clone(),
            })?,
            start: offset(&self.start)?,
            end: offset(&self.end)?,
        })
    }
}

/// Iterator over the candidate partition lines of a TOC
///
/// Created by [`entries`]. Lines are read one at a time; invalid UTF-8 is
/// replaced rather than treated as an error.
pub struct TocEntries<R> {
    reader: R,
    line: usize,
    buf: Vec<u8>,
}

impl<R: BufRead> Iterator for TocEntries<R> {
    type Item = Result<TocEntry, TocError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            self.line += 1;
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(source) => {
                    return Some(Err(TocError::Io {
                        line: self.line,
                        source,
                    }))
                }
            }

            if self.buf.last() == Some(&b'\n') {
                self.buf.pop();
            }
            let text = String::from_utf8_lossy(&self.buf);
            match TocEntry::parse(self.line, &text) {
                Some(entry) => return Some(Ok(entry)),
                None => log::trace!("TOC line {} skipped", self.line),
            }
        }
    }
}

/// Lazily parse the partition lines of a TOC stream
pub fn entries<R: BufRead>(reader: R) -> TocEntries<R> {
    TocEntries {
        reader,
        line: 0,
        buf: Vec::new(),
    }
}

/// Count the lines that may describe a partition
///
/// Any line mentioning `partition` counts. The result is an upper bound on
/// the number of entries [`entries`] yields for the same text, used to size
/// the table before parsing.
pub fn count_possible_entries(text: &str) -> usize {
    text.lines()
        .filter(|line| line.contains(PARTITION_PREFIX))
        .count()
}
