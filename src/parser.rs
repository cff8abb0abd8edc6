use crate::error::{FormatError, ReadError};
use crate::line_reader::LineReader;
use crate::policy::{LineMode, ReadFormat, ReadOptions};
use crate::record::Read;
use crate::source::InputSource;

use std::io::{self, Write};
use std::path::Path;

/// Turns the lines of a [`LineReader`] into one [`Read`] per record.
#[derive(Debug)]
pub struct RecordParser {
    lines: LineReader,
    // integer-quality FASTA file kept in step with `lines`
    quals: Option<LineReader>,
    opts: ReadOptions,
    raw: String,
    unread: Option<Read>,
}

impl RecordParser {
    pub fn new(lines: LineReader, opts: ReadOptions) -> Self {
        Self {
            lines,
            quals: None,
            opts,
            raw: String::with_capacity(512),
            unread: None,
        }
    }

    pub fn from_source(src: InputSource, opts: ReadOptions) -> Self {
        Self::new(LineReader::new(src), opts)
    }

    /// Open a read file (plain, `.gz`, or via a decompressor pipe).
    pub fn from_path<P: AsRef<Path>>(path: P, opts: ReadOptions) -> Result<Self, ReadError> {
        Ok(Self::from_source(InputSource::open(path)?, opts))
    }

    /// Pair every FASTA record with the next record of a quality file
    /// (`>name` followed by whitespace-separated integer Phred scores).
    pub fn with_quality_stream(mut self, quals: LineReader) -> Self {
        self.quals = Some(quals);
        self
    }

    pub fn options(&self) -> &ReadOptions {
        &self.opts
    }

    pub fn format(&self) -> ReadFormat {
        self.opts.format
    }

    pub fn line_reader(&self) -> &LineReader {
        &self.lines
    }

    pub fn line_reader_mut(&mut self) -> &mut LineReader {
        &mut self.lines
    }

    /// Text of the last record exactly as it appeared in the input.
    pub fn raw_record(&self) -> &str {
        &self.raw
    }

    pub fn write_raw<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(self.raw.as_bytes())
    }

    /// Parse the next record into `read`. `Ok(false)` at a clean end of stream.
    ///
    /// After a format error the reader sits just past the offending line; use
    /// [`RecordParser::resync`] to skip to the next record.
    pub fn next_read(&mut self, read: &mut Read) -> Result<bool, ReadError> {
        if let Some(held) = self.unread.take() {
            *read = held;
            return Ok(true);
        }
        read.clear();
        self.raw.clear();
        let found = match self.opts.format {
            ReadFormat::Fasta => self.next_fasta(read)?,
            ReadFormat::Fastq | ReadFormat::FastqColor => self.next_fastq(read)?,
            ReadFormat::Tabbed => self.next_tabbed(read)?,
        };
        if !found {
            return Ok(false);
        }
        if self.opts.strip_mate_suffix {
            strip_mate_suffix(&mut read.name);
        }
        if self.opts.format == ReadFormat::Fasta {
            if let Some(quals) = self.quals.as_mut() {
                next_quality_record(quals, read)?;
            }
        }
        Ok(true)
    }

    /// Hand the last read back so the next `next_read` returns it again.
    /// Only one read is held; `raw_record` keeps describing it.
    pub fn push_back_read(&mut self, read: Read) {
        self.unread = Some(read);
    }

    pub fn has_pushed_back_read(&self) -> bool {
        self.unread.is_some()
    }

    /// Skip lines until the next record marker and leave it pending.
    /// Returns false when the stream ends first.
    pub fn resync(&mut self) -> Result<bool, ReadError> {
        let Some(marker) = self.opts.format.marker() else {
            return Ok(!self.lines.is_eof());
        };
        while advance(&mut self.lines)? {
            if self.lines.line().trim_start().starts_with(marker) {
                self.lines.push_back();
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn rewind(&mut self) -> Result<(), ReadError> {
        self.lines.rewind()?;
        if let Some(q) = self.quals.as_mut() {
            q.rewind()?;
        }
        self.raw.clear();
        self.unread = None;
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), ReadError> {
        let ctx = self.lines.context();
        self.lines.close().map_err(|e| ReadError::io_err(e, ctx))?;
        if let Some(q) = self.quals.as_mut() {
            let ctx = q.context();
            q.close().map_err(|e| ReadError::io_err(e, ctx))?;
        }
        Ok(())
    }

    fn next_fasta(&mut self, read: &mut Read) -> Result<bool, ReadError> {
        if !next_nonblank(&mut self.lines)? {
            return Ok(false);
        }
        let header = self.lines.line().trim();
        let Some(h) = header.strip_prefix('>') else {
            return Err(self.fmt_err(FormatError::MissingHeader { expected: '>' }));
        };
        read.name.push_str(header_name(h));
        capture(&mut self.raw, self.lines.line());

        while advance(&mut self.lines)? {
            let line = self.lines.line();
            if line.trim_start().starts_with('>') {
                self.lines.push_back();
                break;
            }
            read.seq.push_str(line.trim());
            capture(&mut self.raw, line);
        }
        if read.seq.is_empty() {
            return Err(self.fmt_err(FormatError::EmptySequence));
        }
        Ok(true)
    }

    fn next_fastq(&mut self, read: &mut Read) -> Result<bool, ReadError> {
        if !next_nonblank(&mut self.lines)? {
            return Ok(false);
        }
        let header = self.lines.line().trim();
        let Some(h) = header.strip_prefix('@') else {
            return Err(self.fmt_err(FormatError::MissingHeader { expected: '@' }));
        };
        read.name.push_str(header_name(h));
        capture(&mut self.raw, self.lines.line());

        match self.opts.line_mode {
            LineMode::Single => {
                self.expect_line()?;
                let line = self.lines.line().trim();
                if line.is_empty() {
                    return Err(self.fmt_err(FormatError::EmptySequence));
                }
                read.seq.push_str(line);
                capture(&mut self.raw, self.lines.line());

                self.expect_line()?;
                let Some(alt) = self.lines.line().trim().strip_prefix('+') else {
                    return Err(self.fmt_err(FormatError::MissingPlus));
                };
                read.alt_name.push_str(alt.trim());
                capture(&mut self.raw, self.lines.line());

                self.expect_line()?;
                read.qual.push_str(self.lines.line().trim());
                capture(&mut self.raw, self.lines.line());
            }
            LineMode::Multi => {
                loop {
                    self.expect_line()?;
                    let line = self.lines.line().trim();
                    if let Some(alt) = line.strip_prefix('+') {
                        read.alt_name.push_str(alt.trim());
                        capture(&mut self.raw, self.lines.line());
                        break;
                    }
                    read.seq.push_str(line);
                    capture(&mut self.raw, self.lines.line());
                }
                if read.seq.is_empty() {
                    return Err(self.fmt_err(FormatError::EmptySequence));
                }
                let want = min_quality_len(self.opts.format, read.seq.len());
                while read.qual.len() < want {
                    self.expect_line()?;
                    read.qual.push_str(self.lines.line().trim());
                    capture(&mut self.raw, self.lines.line());
                }
                if read.qual.len() < read.seq.len() {
                    self.take_primer_quality(read)?;
                }
            }
        }

        if !quality_fits(self.opts.format, read.seq.len(), read.qual.len()) {
            return Err(self.fmt_err(FormatError::LengthMismatch {
                seq: read.seq.len(),
                qual: read.qual.len(),
            }));
        }
        Ok(true)
    }

    fn next_tabbed(&mut self, read: &mut Read) -> Result<bool, ReadError> {
        if !next_nonblank(&mut self.lines)? {
            return Ok(false);
        }
        let line = self.lines.line();
        capture(&mut self.raw, line);

        let mut fields = line.split('\t');
        let name = fields.next().map(header_name).unwrap_or("");
        let seq = fields.next().map(str::trim).unwrap_or("");
        if name.is_empty() || seq.is_empty() {
            return Err(self.fmt_err(FormatError::MissingField));
        }
        read.name.push_str(name);
        read.seq.push_str(seq);
        if let Some(qual) = fields.next() {
            read.qual.push_str(qual.trim());
        }
        if let Some(alt) = fields.next() {
            read.alt_name.push_str(alt.trim());
        }
        if !read.qual.is_empty() && !read.lengths_equal() {
            return Err(self.fmt_err(FormatError::LengthMismatch {
                seq: read.seq.len(),
                qual: read.qual.len(),
            }));
        }
        Ok(true)
    }

    // A color quality one short of the sequence may still have its last
    // score wrapped onto the following line.
    fn take_primer_quality(&mut self, read: &mut Read) -> Result<(), ReadError> {
        if !advance(&mut self.lines)? {
            return Ok(());
        }
        let line = self.lines.line().trim();
        if !line.starts_with('@') && read.qual.len() + line.len() == read.seq.len() {
            read.qual.push_str(line);
            capture(&mut self.raw, self.lines.line());
        } else {
            self.lines.push_back();
        }
        Ok(())
    }

    fn expect_line(&mut self) -> Result<(), ReadError> {
        if advance(&mut self.lines)? {
            Ok(())
        } else {
            Err(self.fmt_err(FormatError::UnexpectedEof))
        }
    }

    #[inline]
    fn fmt_err(&self, e: FormatError) -> ReadError {
        ReadError::fmt_err(e, self.lines.context())
    }
}

impl Iterator for RecordParser {
    type Item = Result<Read, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut read = Read::default();
        match self.next_read(&mut read) {
            Ok(true) => Some(Ok(read)),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Drop a trailing `/<digits>` mate marker from a read name.
pub fn strip_mate_suffix(name: &mut String) {
    if let Some(pos) = name.rfind('/') {
        let tail = &name[pos + 1..];
        if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) {
            name.truncate(pos);
        }
    }
}

fn advance(lines: &mut LineReader) -> Result<bool, ReadError> {
    let ctx = lines.context();
    lines
        .next_line()
        .map(|l| l.is_some())
        .map_err(|e| ReadError::io_err(e, ctx))
}

fn next_nonblank(lines: &mut LineReader) -> Result<bool, ReadError> {
    while advance(lines)? {
        if !lines.line().trim().is_empty() {
            return Ok(true);
        }
    }
    Ok(false)
}

fn capture(raw: &mut String, line: &str) {
    raw.push_str(line);
    raw.push('\n');
}

fn header_name(header: &str) -> &str {
    header.split_whitespace().next().unwrap_or("")
}

// Color-space qualities may omit the primer base.
fn min_quality_len(format: ReadFormat, seq_len: usize) -> usize {
    match format {
        ReadFormat::FastqColor => seq_len.saturating_sub(1),
        _ => seq_len,
    }
}

fn quality_fits(format: ReadFormat, seq_len: usize, qual_len: usize) -> bool {
    qual_len == seq_len || (format == ReadFormat::FastqColor && qual_len + 1 == seq_len)
}

fn phred_char(q: i32) -> char {
    (q.clamp(0, 93) as u8 + b'!') as char
}

fn next_quality_record(quals: &mut LineReader, read: &mut Read) -> Result<(), ReadError> {
    if !next_nonblank(quals)? {
        return Err(ReadError::fmt_err(
            FormatError::QualityStreamExhausted,
            quals.context(),
        ));
    }
    let Some(h) = quals.line().trim().strip_prefix('>') else {
        return Err(ReadError::fmt_err(
            FormatError::MissingHeader { expected: '>' },
            quals.context(),
        ));
    };
    read.alt_name.push_str(header_name(h));

    while advance(quals)? {
        let line = quals.line();
        if line.trim_start().starts_with('>') {
            quals.push_back();
            break;
        }
        for tok in line.split_whitespace() {
            let q: i32 = tok.parse().map_err(|_| {
                ReadError::fmt_err(FormatError::InvalidQuality(tok.to_string()), quals.context())
            })?;
            read.qual.push(phred_char(q));
        }
    }

    let (seq, qual) = (read.seq.len(), read.qual.len());
    if qual != seq {
        return Err(ReadError::fmt_err(
            FormatError::LengthMismatch { seq, qual },
            quals.context(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mate_suffix() {
        let mut n = String::from("read7/1");
        strip_mate_suffix(&mut n);
        assert_eq!(n, "read7");
        let mut n = String::from("sample/run/xyz");
        strip_mate_suffix(&mut n);
        assert_eq!(n, "sample/run/xyz");
        let mut n = String::from("r/");
        strip_mate_suffix(&mut n);
        assert_eq!(n, "r/");
    }

    #[test]
    fn phred_clamps() {
        assert_eq!(phred_char(-1), '!');
        assert_eq!(phred_char(40), 'I');
        assert_eq!(phred_char(200), '~');
    }

    #[test]
    fn color_quality_may_skip_primer() {
        assert!(quality_fits(ReadFormat::FastqColor, 5, 4));
        assert!(quality_fits(ReadFormat::FastqColor, 5, 5));
        assert!(!quality_fits(ReadFormat::Fastq, 5, 4));
        assert_eq!(min_quality_len(ReadFormat::FastqColor, 5), 4);
    }

    #[test]
    fn header_name_takes_first_token() {
        assert_eq!(header_name("r1 extra words"), "r1");
        assert_eq!(header_name(""), "");
    }
}
