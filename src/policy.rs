use crate::error::UnknownFormat;

use std::fmt;
use std::str::FromStr;

/// Record layout of a read file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadFormat {
    /// `>` header followed by one or more sequence lines.
    Fasta,
    /// Four-line base-space FASTQ.
    #[default]
    Fastq,
    /// FASTQ whose sequence is a primer base followed by colors.
    FastqColor,
    /// One read per line: `name<TAB>seq[<TAB>qual[<TAB>alt_name]]`.
    Tabbed,
}

impl ReadFormat {
    /// Leading character of a record header, if the format has one.
    pub fn marker(self) -> Option<char> {
        match self {
            ReadFormat::Fasta => Some('>'),
            ReadFormat::Fastq | ReadFormat::FastqColor => Some('@'),
            ReadFormat::Tabbed => None,
        }
    }

    pub fn has_quality_line(self) -> bool {
        matches!(self, ReadFormat::Fastq | ReadFormat::FastqColor)
    }
}

impl fmt::Display for ReadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReadFormat::Fasta => "fasta",
            ReadFormat::Fastq => "fastq",
            ReadFormat::FastqColor => "fastq-color",
            ReadFormat::Tabbed => "tabbed",
        };
        f.write_str(s)
    }
}

impl FromStr for ReadFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fasta" | "fa" | "fna" => Ok(ReadFormat::Fasta),
            "fastq" | "fq" => Ok(ReadFormat::Fastq),
            "fastq-color" | "csfastq" | "colorspace" => Ok(ReadFormat::FastqColor),
            "tab" | "tabbed" | "tsv" => Ok(ReadFormat::Tabbed),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

/// How sequence/quality lines are laid out in FASTQ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineMode {
    /// Sequence and quality occupy exactly one line each.
    #[default]
    Single,
    /// Sequence/quality may span multiple lines.
    Multi,
}

/// Where a read stream takes record ids from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdSource {
    /// Records are numbered 0, 1, 2, ... in the order they are parsed.
    #[default]
    Arrival,
    /// The read name (after mate-suffix stripping) is a decimal id.
    Name,
}

#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    pub format: ReadFormat,
    pub line_mode: LineMode,
    /// Drop a trailing `/1`, `/2` (any `/<digits>`) from read names.
    pub strip_mate_suffix: bool,
    pub id_source: IdSource,
    /// Echo the delivered read to the unmapped sink instead of the passed-over ones.
    pub write_found: bool,
}

impl ReadOptions {
    pub fn new(format: ReadFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_names_parse() {
        assert_eq!("FASTQ".parse::<ReadFormat>(), Ok(ReadFormat::Fastq));
        assert_eq!("fa".parse::<ReadFormat>(), Ok(ReadFormat::Fasta));
        assert_eq!("csfastq".parse::<ReadFormat>(), Ok(ReadFormat::FastqColor));
        assert_eq!("tab".parse::<ReadFormat>(), Ok(ReadFormat::Tabbed));
        let err = "bam".parse::<ReadFormat>().unwrap_err();
        assert_eq!(err.to_string(), "unknown read format \"bam\"");
    }

    #[test]
    fn defaults() {
        let o = ReadOptions::default();
        assert_eq!(o.format, ReadFormat::Fastq);
        assert_eq!(o.line_mode, LineMode::Single);
        assert_eq!(o.id_source, IdSource::Arrival);
        assert!(!o.strip_mate_suffix);
        assert!(!o.write_found);
    }
}
