use crate::error::ReadError;
use crate::util::{looks_like_gzip, open_file, pipe_decompressor};

#[cfg(feature = "gzip")]
use flate2::read::MultiGzDecoder;
use std::fmt;
use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

const BUF_CAPACITY: usize = 256 * 1024;

/// External program whose stdout is consumed as a read file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl PipeCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// `<program> -cd <path>`, the calling convention of gzip, bzip2, xz and zstd.
    pub fn decompress(program: &str, path: &Path) -> Self {
        Self::new(program)
            .arg("-cd")
            .arg(path.to_string_lossy().into_owned())
    }
}

impl fmt::Display for PipeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for a in &self.args {
            write!(f, " {a}")?;
        }
        Ok(())
    }
}

/// An opened byte stream feeding a line reader.
///
/// The variant decides how the stream is rewound and which routine releases it.
pub enum InputSource {
    /// Plain or gzip file, decoded in-process.
    File {
        path: PathBuf,
        rdr: Box<dyn BufRead + Send>,
    },
    /// Standard output of a spawned producer (e.g. a decompressor).
    Pipe {
        command: PipeCommand,
        child: Child,
        rdr: BufReader<ChildStdout>,
    },
    /// In-memory bytes; rewindable.
    Memory(Cursor<Vec<u8>>),
    /// Arbitrary reader (stdin, sockets, ...); not rewindable.
    Reader(Box<dyn BufRead + Send>),
}

impl InputSource {
    /// Open a read file. `.gz` (by extension or magic bytes) is decoded with
    /// flate2; `.bz2`, `.xz` and `.zst` go through a decompressor pipe.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReadError> {
        let path = path.as_ref();
        if let Some(program) = pipe_decompressor(path) {
            return Self::spawn(PipeCommand::decompress(program, path));
        }
        let rdr = open_reader(path)?;
        log::debug!("opened read file {}", path.display());
        Ok(Self::File {
            path: path.to_path_buf(),
            rdr,
        })
    }

    /// Spawn `command` and read its standard output.
    pub fn spawn(command: PipeCommand) -> Result<Self, ReadError> {
        let spawn_err = |source| ReadError::Spawn {
            command: command.to_string(),
            source,
        };
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_err(io::Error::other("child process has no stdout")))?;
        log::debug!("spawned pipe producer `{command}`");
        Ok(Self::Pipe {
            command,
            child,
            rdr: BufReader::with_capacity(BUF_CAPACITY, stdout),
        })
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Memory(Cursor::new(bytes.into()))
    }

    /// Wrap an arbitrary `BufRead` (stdin, etc.).
    pub fn from_bufread<R: BufRead + Send + 'static>(reader: R) -> Self {
        Self::Reader(Box::new(reader))
    }

    pub fn is_pipe(&self) -> bool {
        matches!(self, Self::Pipe { .. })
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Reposition at the first byte: files are reopened, pipes re-spawned.
    pub fn rewind(&mut self) -> Result<(), ReadError> {
        match self {
            Self::File { path, rdr } => {
                *rdr = open_reader(path)?;
                log::debug!("rewound {}", path.display());
                Ok(())
            }
            Self::Pipe { command, .. } => {
                let fresh = Self::spawn(command.clone())?;
                let old = std::mem::replace(self, fresh);
                if let Err(e) = old.close() {
                    log::warn!("closing pipe producer on rewind: {e}");
                }
                Ok(())
            }
            Self::Memory(c) => {
                c.set_position(0);
                Ok(())
            }
            Self::Reader(_) => Err(ReadError::RewindUnsupported),
        }
    }

    /// Release the stream. A pipe's stdout is closed first, then the child is reaped.
    pub fn close(self) -> io::Result<()> {
        match self {
            Self::Pipe {
                command,
                mut child,
                rdr,
            } => {
                drop(rdr);
                let status = child.wait()?;
                if status.success() {
                    log::debug!("pipe producer `{command}` finished");
                } else {
                    log::warn!("pipe producer `{command}` exited with {status}");
                }
                Ok(())
            }
            Self::File { path, .. } => {
                log::debug!("closed {}", path.display());
                Ok(())
            }
            Self::Memory(_) | Self::Reader(_) => Ok(()),
        }
    }
}

fn open_reader(path: &Path) -> Result<Box<dyn BufRead + Send>, ReadError> {
    let open_err = |source| ReadError::Open {
        path: path.to_path_buf(),
        source,
    };
    let mut f = open_file(path).map_err(open_err)?;

    let is_gz = path.extension().and_then(|s| s.to_str()) == Some("gz")
        || looks_like_gzip(&mut f).unwrap_or(false);

    if is_gz {
        #[cfg(feature = "gzip")]
        {
            let dec = MultiGzDecoder::new(f);
            return Ok(Box::new(BufReader::with_capacity(BUF_CAPACITY, dec)));
        }
        #[cfg(not(feature = "gzip"))]
        {
            return Err(open_err(io::Error::new(
                io::ErrorKind::Unsupported,
                "gzip input requires the `gzip` feature",
            )));
        }
    }

    #[cfg(feature = "mmap")]
    {
        // Own the Mmap inside Cursor to avoid self-ref problems
        let mmap = unsafe { memmap2::Mmap::map(&f) }.map_err(open_err)?;
        Ok(Box::new(Cursor::new(mmap)))
    }
    #[cfg(not(feature = "mmap"))]
    {
        Ok(Box::new(BufReader::with_capacity(BUF_CAPACITY, f)))
    }
}

impl Read for InputSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::File { rdr, .. } => rdr.read(buf),
            Self::Pipe { rdr, .. } => rdr.read(buf),
            Self::Memory(c) => c.read(buf),
            Self::Reader(r) => r.read(buf),
        }
    }
}

impl BufRead for InputSource {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match self {
            Self::File { rdr, .. } => rdr.fill_buf(),
            Self::Pipe { rdr, .. } => rdr.fill_buf(),
            Self::Memory(c) => c.fill_buf(),
            Self::Reader(r) => r.fill_buf(),
        }
    }

    fn consume(&mut self, amt: usize) {
        match self {
            Self::File { rdr, .. } => rdr.consume(amt),
            Self::Pipe { rdr, .. } => rdr.consume(amt),
            Self::Memory(c) => c.consume(amt),
            Self::Reader(r) => r.consume(amt),
        }
    }
}

impl fmt::Debug for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File { path, .. } => f.debug_tuple("File").field(path).finish(),
            Self::Pipe { command, .. } => f.debug_tuple("Pipe").field(command).finish(),
            Self::Memory(c) => f.debug_tuple("Memory").field(&c.get_ref().len()).finish(),
            Self::Reader(_) => f.write_str("Reader"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipe_command_display() {
        let c = PipeCommand::decompress("bzip2", Path::new("reads.fq.bz2"));
        assert_eq!(c.to_string(), "bzip2 -cd reads.fq.bz2");
    }

    #[test]
    fn memory_source_rewinds() {
        let mut src = InputSource::from_bytes(b"ab\n".to_vec());
        let mut s = String::new();
        src.read_line(&mut s).unwrap();
        assert_eq!(s, "ab\n");
        src.rewind().unwrap();
        s.clear();
        src.read_line(&mut s).unwrap();
        assert_eq!(s, "ab\n");
        assert!(!src.is_pipe());
    }

    #[test]
    fn plain_reader_cannot_rewind() {
        let mut src = InputSource::from_bufread(&b"x\n"[..]);
        assert!(matches!(src.rewind(), Err(ReadError::RewindUnsupported)));
    }

    #[test]
    fn missing_file_fails_at_open() {
        let err = InputSource::open("/nonexistent/reads.fq").unwrap_err();
        assert!(matches!(err, ReadError::Open { .. }));
    }
}
