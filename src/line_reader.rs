use crate::error::{IoContext, ReadError};
use crate::source::InputSource;
use crate::util::chomp;

use std::io::{self, BufRead};

/// Serves one physical line at a time from an [`InputSource`], buffering the
/// last line so it can be pushed back once.
#[derive(Debug)]
pub struct LineReader {
    src: Option<InputSource>,
    buf: String,
    eof: bool,
    // last call returned a line (as opposed to EOF)
    has_line: bool,
    pushed: bool,
    line_num: u64,
    byte_pos: u64,
}

impl LineReader {
    pub fn new(src: InputSource) -> Self {
        Self {
            src: Some(src),
            buf: String::with_capacity(512),
            eof: false,
            has_line: false,
            pushed: false,
            line_num: 0,
            byte_pos: 0,
        }
    }

    /// Next line without its terminator, or `None` at end of stream.
    pub fn next_line(&mut self) -> io::Result<Option<&str>> {
        if self.pushed {
            self.pushed = false;
            return Ok(Some(self.buf.as_str()));
        }
        let src = self
            .src
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "line reader is closed"))?;
        self.buf.clear();
        let n = src.read_line(&mut self.buf)?;
        if n == 0 {
            self.eof = true;
            self.has_line = false;
            return Ok(None);
        }
        self.line_num += 1;
        self.byte_pos += n as u64;
        self.has_line = true;
        chomp(&mut self.buf);
        Ok(Some(self.buf.as_str()))
    }

    /// "Undo" the last `next_line` so the next call returns the same line.
    pub fn push_back(&mut self) {
        if self.has_line {
            self.pushed = true;
        }
    }

    pub fn is_pushed_back(&self) -> bool {
        self.pushed
    }

    /// Last line read.
    pub fn line(&self) -> &str {
        &self.buf
    }

    /// Length of the last line read.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Number of lines delivered, not counting pushed-back repeats.
    pub fn line_count(&self) -> u64 {
        self.line_num
    }

    pub fn byte_pos(&self) -> u64 {
        self.byte_pos
    }

    pub fn is_eof(&self) -> bool {
        self.eof && !self.pushed
    }

    pub fn is_closed(&self) -> bool {
        self.src.is_none()
    }

    pub fn source(&self) -> Option<&InputSource> {
        self.src.as_ref()
    }

    #[inline]
    pub fn context(&self) -> IoContext {
        IoContext {
            byte_pos: self.byte_pos,
            line_num: self.line_num,
        }
    }

    pub fn rewind(&mut self) -> Result<(), ReadError> {
        let src = self.src.as_mut().ok_or(ReadError::Closed)?;
        src.rewind()?;
        self.buf.clear();
        self.eof = false;
        self.has_line = false;
        self.pushed = false;
        self.line_num = 0;
        self.byte_pos = 0;
        Ok(())
    }

    /// Release the underlying stream. Later calls are errors; closing twice is a no-op.
    pub fn close(&mut self) -> io::Result<()> {
        self.pushed = false;
        self.has_line = false;
        match self.src.take() {
            Some(src) => src.close(),
            None => Ok(()),
        }
    }
}

impl Drop for LineReader {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("closing line reader: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(text: &str) -> LineReader {
        LineReader::new(InputSource::from_bytes(text.as_bytes().to_vec()))
    }

    #[test]
    fn strips_terminators_and_counts() {
        let mut lr = reader("a\r\nbb\nccc");
        assert_eq!(lr.next_line().unwrap(), Some("a"));
        assert_eq!(lr.next_line().unwrap(), Some("bb"));
        assert_eq!(lr.len(), 2);
        assert_eq!(lr.next_line().unwrap(), Some("ccc"));
        assert_eq!(lr.line_count(), 3);
        assert_eq!(lr.byte_pos(), 9);
        assert_eq!(lr.next_line().unwrap(), None);
        assert!(lr.is_eof());
    }

    #[test]
    fn push_back_before_first_line_is_noop() {
        let mut lr = reader("x\n");
        lr.push_back();
        assert!(!lr.is_pushed_back());
        assert_eq!(lr.next_line().unwrap(), Some("x"));
    }

    #[test]
    fn single_line_of_pushback() {
        let mut lr = reader("x\ny\n");
        lr.next_line().unwrap();
        lr.push_back();
        lr.push_back();
        assert_eq!(lr.next_line().unwrap(), Some("x"));
        assert_eq!(lr.next_line().unwrap(), Some("y"));
        assert_eq!(lr.line_count(), 2);
    }

    #[test]
    fn push_back_after_eof_is_noop() {
        let mut lr = reader("x\n");
        lr.next_line().unwrap();
        assert_eq!(lr.next_line().unwrap(), None);
        lr.push_back();
        assert_eq!(lr.next_line().unwrap(), None);
    }

    #[test]
    fn long_lines_grow_the_buffer() {
        let long = "A".repeat(10_000);
        let mut lr = reader(&format!("{long}\n"));
        assert_eq!(lr.next_line().unwrap(), Some(long.as_str()));
        assert_eq!(lr.len(), 10_000);
    }

    #[test]
    fn read_after_close_fails() {
        let mut lr = reader("x\n");
        lr.close().unwrap();
        lr.close().unwrap();
        assert!(lr.is_closed());
        assert!(lr.next_line().is_err());
    }
}
