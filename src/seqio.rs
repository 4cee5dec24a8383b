use crate::error::{ReconError, Result};
use noodles::bgzf;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Open a file and auto-detect bgzip compression, returning a boxed BufRead
pub fn open_input<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let file = File::open(path)?;

    // Check by file extension (faster than reading magic bytes)
    let is_compressed = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == "gz" || ext == "bgz")
        .unwrap_or(false);

    if is_compressed {
        Ok(Box::new(BufReader::new(bgzf::io::reader::Reader::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// A single FASTA entry. `id` is the first whitespace-delimited header token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub id: String,
    pub description: String,
    pub sequence: Vec<u8>,
    /// 1-based line number of the header
    pub line: usize,
}

/// Read every record of a FASTA stream
pub fn read_fasta_from<R: BufRead>(reader: R) -> Result<Vec<FastaRecord>> {
    let mut records = Vec::new();
    let mut current: Option<FastaRecord> = None;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if let Some(header) = trimmed.strip_prefix('>') {
            if let Some(record) = current.take() {
                records.push(record);
            }
            let (id, description) = match header.split_once(char::is_whitespace) {
                Some((id, rest)) => (id, rest.trim()),
                None => (header, ""),
            };
            current = Some(FastaRecord {
                id: id.to_string(),
                description: description.to_string(),
                sequence: Vec::new(),
                line: line_no + 1,
            });
        } else if !trimmed.is_empty() {
            match current.as_mut() {
                Some(record) => record.sequence.extend_from_slice(trimmed.as_bytes()),
                None => {
                    return Err(ReconError::MalformedRecord {
                        line: line_no + 1,
                        reason: "sequence data before the first FASTA header".to_string(),
                    })
                }
            }
        }
    }

    if let Some(record) = current {
        records.push(record);
    }

    Ok(records)
}

/// Read a FASTA file (auto-detects bgzip compression)
pub fn read_fasta<P: AsRef<Path>>(path: P) -> Result<Vec<FastaRecord>> {
    read_fasta_from(open_input(path)?)
}

/// Write sequences as FASTA, one sequence line per record
pub fn write_fasta<'a, W, I>(mut output: W, records: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    for (id, sequence) in records {
        writeln!(output, ">{id}")?;
        output.write_all(sequence)?;
        writeln!(output)?;
    }
    output.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_multiline_records() {
        let data = ">ctg1 length=10 circular=true\nACGT\nACGTAC\n\n>ctg2\nGG\n";
        let records = read_fasta_from(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "ctg1");
        assert_eq!(records[0].description, "length=10 circular=true");
        assert_eq!(records[0].sequence, b"ACGTACGTAC");
        assert_eq!(records[1].id, "ctg2");
        assert_eq!(records[1].description, "");
        assert_eq!((records[0].line, records[1].line), (1, 5));
    }

    #[test]
    fn test_sequence_before_header_is_rejected() {
        let err = read_fasta_from("ACGT\n>ctg1\nAC\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ReconError::MalformedRecord { line: 1, .. }));
    }

    #[test]
    fn test_write_fasta() {
        let mut out = Vec::new();
        write_fasta(&mut out, [("a", &b"ACGT"[..]), ("b", &b"GG"[..])]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), ">a\nACGT\n>b\nGG\n");
    }
}
