//! Id-ordered read delivery.
//!
//! A [`ReadStream`] answers "give me the read with id N" for N requested in
//! non-decreasing order. Records that arrive ahead of the requested id are
//! parked in a min-heap until asked for; records that arrive behind it have
//! been passed over and can optionally be echoed to an "unmapped" sink.

use crate::error::{FormatError, ReadError};
use crate::parser::RecordParser;
use crate::policy::{IdSource, ReadFormat, ReadOptions};
use crate::record::Read;
use crate::source::InputSource;

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::io::Write;
use std::path::Path;

/// A parsed read together with its stream id and its original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedRead {
    pub id: u64,
    pub read: Read,
    pub raw: String,
}

impl TaggedRead {
    /// Tag `read`, rendering it in `format` for the raw text.
    pub fn new(id: u64, read: Read, format: ReadFormat) -> Self {
        let raw = read.to_record_string(format);
        Self { id, read, raw }
    }
}

/// Producer of id-tagged reads feeding a [`ReadStream`].
///
/// Ids must be unique; they need not arrive in order.
pub trait RecordSource {
    /// Next record, or `None` once the producer is exhausted.
    fn next_record(&mut self) -> Result<Option<TaggedRead>, ReadError>;

    /// Restart from the first record.
    fn rewind(&mut self) -> Result<(), ReadError> {
        Err(ReadError::RewindUnsupported)
    }

    fn close(&mut self) -> Result<(), ReadError> {
        Ok(())
    }
}

/// [`RecordSource`] over a [`RecordParser`], assigning ids per [`IdSource`].
#[derive(Debug)]
pub struct ParserSource {
    parser: RecordParser,
    next_id: u64,
}

impl ParserSource {
    pub fn new(parser: RecordParser) -> Self {
        Self { parser, next_id: 0 }
    }

    pub fn parser(&self) -> &RecordParser {
        &self.parser
    }

    pub fn parser_mut(&mut self) -> &mut RecordParser {
        &mut self.parser
    }
}

impl RecordSource for ParserSource {
    fn next_record(&mut self) -> Result<Option<TaggedRead>, ReadError> {
        let mut read = Read::default();
        if !self.parser.next_read(&mut read)? {
            return Ok(None);
        }
        let id = match self.parser.options().id_source {
            IdSource::Arrival => {
                let id = self.next_id;
                self.next_id += 1;
                id
            }
            IdSource::Name => read.name.parse::<u64>().map_err(|_| {
                ReadError::fmt_err(
                    FormatError::InvalidId(read.name.clone()),
                    self.parser.line_reader().context(),
                )
            })?,
        };
        Ok(Some(TaggedRead {
            id,
            read,
            raw: self.parser.raw_record().to_string(),
        }))
    }

    fn rewind(&mut self) -> Result<(), ReadError> {
        self.parser.rewind()?;
        self.next_id = 0;
        Ok(())
    }

    fn close(&mut self) -> Result<(), ReadError> {
        self.parser.close()
    }
}

/// Wrapper for min-heap (BinaryHeap is max-heap by default).
#[derive(Debug)]
struct Pending(TaggedRead);

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Pending {}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        other.0.id.cmp(&self.0.id)
    }
}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Delivers reads by increasing id, reordering out-of-sequence arrivals.
///
/// Requested ids must never decrease over the life of the stream (or since the
/// last [`ReadStream::rewind`]). This is checked with `debug_assert!` only.
pub struct ReadStream<S: RecordSource = ParserSource> {
    src: S,
    pending: BinaryHeap<Pending>,
    last_id: Option<u64>,
    eof: bool,
    closed: bool,
    write_found: bool,
    unmapped: Option<Box<dyn Write + Send>>,
}

impl ReadStream<ParserSource> {
    /// Open a read file; open and spawn failures are reported here.
    pub fn from_path<P: AsRef<Path>>(path: P, opts: ReadOptions) -> Result<Self, ReadError> {
        Ok(Self::from_parser(RecordParser::from_path(path, opts)?))
    }

    pub fn from_input(src: InputSource, opts: ReadOptions) -> Self {
        Self::from_parser(RecordParser::from_source(src, opts))
    }

    pub fn from_parser(parser: RecordParser) -> Self {
        let write_found = parser.options().write_found;
        let mut stream = Self::with_source(ParserSource::new(parser));
        stream.write_found = write_found;
        stream
    }

    pub fn parser(&self) -> &RecordParser {
        self.src.parser()
    }
}

impl<S: RecordSource> ReadStream<S> {
    pub fn with_source(src: S) -> Self {
        Self {
            src,
            pending: BinaryHeap::new(),
            last_id: None,
            eof: false,
            closed: false,
            write_found: false,
            unmapped: None,
        }
    }

    /// Echo records to `sink`: the passed-over ones, or with `write_found` the
    /// delivered ones.
    pub fn set_unmapped_sink<W: Write + Send + 'static>(&mut self, sink: W) {
        self.unmapped = Some(Box::new(sink));
    }

    pub fn set_write_found(&mut self, write_found: bool) {
        self.write_found = write_found;
    }

    /// Remove the unmapped sink, flushing it.
    pub fn take_unmapped_sink(&mut self) -> Result<Option<Box<dyn Write + Send>>, ReadError> {
        if let Some(w) = self.unmapped.as_mut() {
            w.flush().map_err(|e| ReadError::io_err(e, Default::default()))?;
        }
        Ok(self.unmapped.take())
    }

    /// Last id requested.
    pub fn watermark(&self) -> Option<u64> {
        self.last_id
    }

    /// Number of records parked ahead of the watermark.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// True once the source is exhausted and nothing is left in the buffer.
    pub fn is_exhausted(&self) -> bool {
        self.eof && self.pending.is_empty()
    }

    pub fn source(&self) -> &S {
        &self.src
    }

    /// Fetch the read whose id is `id`.
    ///
    /// Returns `Ok(None)` when the source ends without producing `id`. Parser
    /// errors are passed through; the stream stays usable afterwards.
    pub fn get_read(&mut self, id: u64) -> Result<Option<Read>, ReadError> {
        if self.closed {
            return Err(ReadError::Closed);
        }
        debug_assert!(
            self.last_id.is_none_or(|last| id >= last),
            "read ids must be requested in increasing order ({id} after {:?})",
            self.last_id
        );
        self.last_id = Some(id);

        while let Some(top) = self.pending.peek() {
            match top.0.id.cmp(&id) {
                Ordering::Less => {
                    if let Some(Pending(stale)) = self.pending.pop() {
                        self.pass_over(&stale)?;
                    }
                }
                Ordering::Equal => {
                    return match self.pending.pop() {
                        Some(Pending(hit)) => self.deliver(hit).map(Some),
                        None => Ok(None),
                    };
                }
                Ordering::Greater => break,
            }
        }

        if self.eof {
            return Ok(None);
        }
        loop {
            let Some(rec) = self.src.next_record()? else {
                self.eof = true;
                return Ok(None);
            };
            match rec.id.cmp(&id) {
                Ordering::Equal => return self.deliver(rec).map(Some),
                Ordering::Less => self.pass_over(&rec)?,
                Ordering::Greater => {
                    log::trace!("buffering read {} while waiting for {id}", rec.id);
                    self.pending.push(Pending(rec));
                }
            }
        }
    }

    /// Like [`ReadStream::get_read`], filling `read` in place.
    pub fn get_read_into(&mut self, id: u64, read: &mut Read) -> Result<bool, ReadError> {
        match self.get_read(id)? {
            Some(r) => {
                *read = r;
                Ok(true)
            }
            None => {
                read.clear();
                Ok(false)
            }
        }
    }

    /// Start over: the source is rewound, the buffer and watermark cleared.
    pub fn rewind(&mut self) -> Result<(), ReadError> {
        if self.closed {
            return Err(ReadError::Closed);
        }
        self.src.rewind()?;
        self.clear();
        log::debug!("read stream rewound");
        Ok(())
    }

    /// Release the source. Further calls return [`ReadError::Closed`].
    pub fn close(&mut self) -> Result<(), ReadError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.clear();
        // the source is released even when the sink fails to flush
        let closed = self.src.close();
        let flushed = match self.unmapped.as_mut() {
            Some(w) => w
                .flush()
                .map_err(|e| ReadError::io_err(e, Default::default())),
            None => Ok(()),
        };
        closed.and(flushed)
    }

    fn clear(&mut self) {
        self.pending.clear();
        self.last_id = None;
        self.eof = false;
    }

    fn deliver(&mut self, rec: TaggedRead) -> Result<Read, ReadError> {
        if self.write_found {
            self.echo(&rec)?;
        }
        Ok(rec.read)
    }

    fn pass_over(&mut self, rec: &TaggedRead) -> Result<(), ReadError> {
        log::trace!("passing over read {}", rec.id);
        if !self.write_found {
            self.echo(rec)?;
        }
        Ok(())
    }

    fn echo(&mut self, rec: &TaggedRead) -> Result<(), ReadError> {
        match self.unmapped.as_mut() {
            Some(w) => w
                .write_all(rec.raw.as_bytes())
                .map_err(|e| ReadError::io_err(e, Default::default())),
            None => Ok(()),
        }
    }
}

impl<S: RecordSource> Drop for ReadStream<S> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("closing read stream: {e}");
        }
    }
}

impl<S: RecordSource + fmt::Debug> fmt::Debug for ReadStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadStream")
            .field("src", &self.src)
            .field("pending", &self.pending.len())
            .field("last_id", &self.last_id)
            .field("eof", &self.eof)
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct VecSource(std::vec::IntoIter<TaggedRead>);

    impl RecordSource for VecSource {
        fn next_record(&mut self) -> Result<Option<TaggedRead>, ReadError> {
            Ok(self.0.next())
        }
    }

    fn tagged(ids: &[u64]) -> VecSource {
        let recs: Vec<_> = ids
            .iter()
            .map(|&id| TaggedRead::new(id, Read::new(format!("r{id}"), "ACGT", "IIII"), ReadFormat::Fastq))
            .collect();
        VecSource(recs.into_iter())
    }

    #[test]
    fn heap_pops_smallest_id() {
        let mut heap = BinaryHeap::new();
        for id in [5, 1, 3] {
            heap.push(Pending(TaggedRead::new(id, Read::default(), ReadFormat::Fasta)));
        }
        let order: Vec<u64> = std::iter::from_fn(|| heap.pop().map(|p| p.0.id)).collect();
        assert_eq!(order, vec![1, 3, 5]);
    }

    #[test]
    fn buffers_records_that_arrive_early() {
        let mut rs = ReadStream::with_source(tagged(&[2, 0, 1]));
        assert_eq!(rs.get_read(0).unwrap().unwrap().name, "r0");
        assert_eq!(rs.pending_len(), 1);
        assert_eq!(rs.get_read(1).unwrap().unwrap().name, "r1");
        assert_eq!(rs.get_read(2).unwrap().unwrap().name, "r2");
        assert_eq!(rs.pending_len(), 0);
        assert!(rs.get_read(3).unwrap().is_none());
        assert!(rs.is_exhausted());
    }

    #[test]
    fn default_source_cannot_rewind() {
        let mut rs = ReadStream::with_source(tagged(&[0]));
        assert!(matches!(rs.rewind(), Err(ReadError::RewindUnsupported)));
    }

    struct ClosingSource {
        closed: std::rc::Rc<std::cell::Cell<bool>>,
    }

    impl RecordSource for ClosingSource {
        fn next_record(&mut self) -> Result<Option<TaggedRead>, ReadError> {
            Ok(None)
        }
        fn close(&mut self) -> Result<(), ReadError> {
            self.closed.set(true);
            Ok(())
        }
    }

    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::other("disk full"))
        }
    }

    #[test]
    fn source_released_when_sink_flush_fails() {
        let closed = std::rc::Rc::new(std::cell::Cell::new(false));
        let mut rs = ReadStream::with_source(ClosingSource {
            closed: closed.clone(),
        });
        rs.set_unmapped_sink(FailingSink);
        assert!(matches!(rs.close(), Err(ReadError::Io { .. })));
        assert!(closed.get());
    }

    #[test]
    fn closed_stream_rejects_calls() {
        let mut rs = ReadStream::with_source(tagged(&[0]));
        rs.close().unwrap();
        assert!(matches!(rs.get_read(0), Err(ReadError::Closed)));
        rs.close().unwrap();
    }
}
