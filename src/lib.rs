//! Short-read ingestion with id-ordered delivery.
//!
//! - Line reader with one line of pushback over plain, `.gz`, piped or in-memory input.
//! - Record parser for FASTA, FASTQ (base- and color-space) and tab-delimited reads,
//!   with an optional integer-quality side stream for FASTA.
//! - Read stream that returns reads by increasing id, buffering records that
//!   arrive early and optionally echoing skipped records to an "unmapped" sink.
//! - Format errors carry line/byte context and are left to the caller to handle.
//!
//! ```no_run
//! use ordered_read_stream::{ReadFormat, ReadOptions, ReadStream};
//!
//! # fn main() -> Result<(), ordered_read_stream::ReadError> {
//! let mut reads = ReadStream::from_path("reads.fq.gz", ReadOptions::new(ReadFormat::Fastq))?;
//! let mut id = 0;
//! while let Some(read) = reads.get_read(id)? {
//!     println!("{}\t{}", read.name, read.seq);
//!     id += 1;
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod line_reader;
pub mod parser;
pub mod policy;
pub mod record;
pub mod source;
pub mod stream;
mod util;

pub use crate::error::{FormatError, IoContext, ReadError, UnknownFormat};
pub use crate::line_reader::LineReader;
pub use crate::parser::{RecordParser, strip_mate_suffix};
pub use crate::policy::{IdSource, LineMode, ReadFormat, ReadOptions};
pub use crate::record::Read;
pub use crate::source::{InputSource, PipeCommand};
pub use crate::stream::{ParserSource, ReadStream, RecordSource, TaggedRead};
