use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoContext {
    pub byte_pos: u64,
    pub line_num: u64,
}

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("expected record marker '{expected}' at start of record")]
    MissingHeader { expected: char },
    #[error("missing '+' separator line")]
    MissingPlus,
    #[error("unexpected EOF inside record")]
    UnexpectedEof,
    #[error("quality length ({qual}) does not match sequence length ({seq})")]
    LengthMismatch { seq: usize, qual: usize },
    #[error("empty sequence")]
    EmptySequence,
    #[error("tab-delimited record needs at least name and sequence fields")]
    MissingField,
    #[error("read name {0:?} is not a numeric id")]
    InvalidId(String),
    #[error("quality value {0:?} is not an integer")]
    InvalidQuality(String),
    #[error("quality stream ended before the sequence stream")]
    QualityStreamExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown read format {0:?}")]
pub struct UnknownFormat(pub String);

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("I/O error at {ctx:?}: {source}")]
    Io {
        #[source]
        source: io::Error,
        ctx: IoContext,
    },
    #[error("format error at {ctx:?}: {source}")]
    Format {
        #[source]
        source: FormatError,
        ctx: IoContext,
    },
    #[error("cannot open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot spawn pipe command `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("input source cannot be rewound")]
    RewindUnsupported,
    #[error("read stream is closed")]
    Closed,
}

impl ReadError {
    pub(crate) fn io_err(source: io::Error, ctx: IoContext) -> Self {
        Self::Io { source, ctx }
    }
    pub(crate) fn fmt_err(source: FormatError, ctx: IoContext) -> Self {
        Self::Format { source, ctx }
    }

    /// True for errors the parser reports about a single malformed record.
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format { .. })
    }
}
