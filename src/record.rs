use crate::policy::ReadFormat;
use std::io::{self, Write};

/// One sequencing read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Read {
    pub name: String,
    pub seq: String,
    pub qual: String,
    pub alt_name: String,
}

impl Read {
    pub fn new(name: impl Into<String>, seq: impl Into<String>, qual: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            seq: seq.into(),
            qual: qual.into(),
            alt_name: String::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.seq.len()
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    pub fn lengths_equal(&self) -> bool {
        self.seq.len() == self.qual.len()
    }

    pub fn clear(&mut self) {
        self.name.clear();
        self.seq.clear();
        self.qual.clear();
        self.alt_name.clear();
    }

    /// Render the read as a record of `format`.
    ///
    /// FASTQ without quality gets an empty quality line; FASTA drops the quality.
    pub fn write_record<W: Write + ?Sized>(&self, format: ReadFormat, w: &mut W) -> io::Result<()> {
        match format {
            ReadFormat::Fasta => {
                writeln!(w, ">{}", self.name)?;
                writeln!(w, "{}", self.seq)
            }
            ReadFormat::Fastq | ReadFormat::FastqColor => {
                writeln!(w, "@{}", self.name)?;
                writeln!(w, "{}", self.seq)?;
                writeln!(w, "+{}", self.alt_name)?;
                writeln!(w, "{}", self.qual)
            }
            ReadFormat::Tabbed => {
                write!(w, "{}\t{}", self.name, self.seq)?;
                if !self.qual.is_empty() || !self.alt_name.is_empty() {
                    write!(w, "\t{}", self.qual)?;
                }
                if !self.alt_name.is_empty() {
                    write!(w, "\t{}", self.alt_name)?;
                }
                writeln!(w)
            }
        }
    }

    pub fn to_record_string(&self, format: ReadFormat) -> String {
        let mut out = Vec::with_capacity(self.name.len() + 2 * self.seq.len() + 8);
        // writing into a Vec cannot fail
        let _ = self.write_record(format, &mut out);
        String::from_utf8_lossy(&out).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_and_lengths() {
        let mut r = Read::new("r1", "ACGT", "IIII");
        assert!(r.lengths_equal());
        assert_eq!(r.len(), 4);
        r.clear();
        assert!(r.is_empty());
        assert_eq!(r, Read::default());
    }

    #[test]
    fn renders_each_format() {
        let mut r = Read::new("r1", "ACGT", "IIII");
        assert_eq!(r.to_record_string(ReadFormat::Fasta), ">r1\nACGT\n");
        assert_eq!(r.to_record_string(ReadFormat::Fastq), "@r1\nACGT\n+\nIIII\n");
        assert_eq!(r.to_record_string(ReadFormat::Tabbed), "r1\tACGT\tIIII\n");
        r.qual.clear();
        assert_eq!(r.to_record_string(ReadFormat::Fastq), "@r1\nACGT\n+\n\n");
        assert_eq!(r.to_record_string(ReadFormat::Tabbed), "r1\tACGT\n");
    }
}
