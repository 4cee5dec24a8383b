use crate::error::{ReconError, Result};
use crate::seqio::open_input;
use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Separator between the two halves of a composite subject id
pub const SUBJECT_DELIMITER: char = '|';

/// Number of mandatory columns in a hit table row
pub const REQUIRED_FIELDS: usize = 11;

/// A subject identifier parsed once at ingest
pub trait Subject: Sized + Clone + Ord + fmt::Display {
    fn parse(raw: &str) -> std::result::Result<Self, String>;
}

/// Composite `<accession>|<tag>` key used by reference-plasmid and marker hits.
/// For reference plasmids the tag is the cluster; for markers it is the replicon or relaxase type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubjectKey {
    pub accession: String,
    pub tag: String,
}

impl SubjectKey {
    pub fn new(accession: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            accession: accession.into(),
            tag: tag.into(),
        }
    }
}

impl Subject for SubjectKey {
    fn parse(raw: &str) -> std::result::Result<Self, String> {
        let mut parts = raw.split(SUBJECT_DELIMITER);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(accession), Some(tag), None) if !accession.is_empty() && !tag.is_empty() => {
                Ok(SubjectKey::new(accession, tag))
            }
            (_, None, _) => Err(format!(
                "subject id '{raw}' lacks the '{SUBJECT_DELIMITER}' delimiter"
            )),
            _ => Err(format!(
                "subject id '{raw}' is not of the form <accession>{SUBJECT_DELIMITER}<tag>"
            )),
        }
    }
}

impl fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.accession, SUBJECT_DELIMITER, self.tag)
    }
}

/// Subject id of a repetitive-element hit: at least two `|` fields,
/// the second naming the element and the last naming the match type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepeatKey {
    raw: String,
    pub element_id: String,
    pub match_type: String,
}

impl Subject for RepeatKey {
    fn parse(raw: &str) -> std::result::Result<Self, String> {
        let fields: Vec<&str> = raw.split(SUBJECT_DELIMITER).collect();
        if fields.len() < 2 {
            return Err(format!(
                "repetitive element id '{raw}' lacks the '{SUBJECT_DELIMITER}' delimiter"
            ));
        }
        Ok(RepeatKey {
            raw: raw.to_string(),
            element_id: fields[1].to_string(),
            match_type: fields[fields.len() - 1].to_string(),
        })
    }
}

impl fmt::Display for RepeatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// One alignment row: query is always the assembly contig
#[derive(Debug, Clone, PartialEq)]
pub struct HitRecord<S = SubjectKey> {
    pub query_id: String,
    pub subject: S,
    pub identity: f64,
    pub length: u64,
    pub query_len: u64,
    pub subject_len: u64,
    pub query_coverage: f64,
    pub evalue: f64,
    pub bitscore: f64,
    pub subject_start: u64,
    pub subject_end: u64,
    pub query_start: Option<u64>,
    pub query_end: Option<u64>,
}

impl<S> HitRecord<S> {
    /// Subject interval with start <= end (reverse-strand hits report start > end)
    pub fn subject_span(&self) -> (u64, u64) {
        (
            self.subject_start.min(self.subject_end),
            self.subject_start.max(self.subject_end),
        )
    }

    /// Contig interval with start <= end; `None` when the row has no `qstart qend` columns
    pub fn contig_span(&self) -> Option<(u64, u64)> {
        match (self.query_start, self.query_end) {
            (Some(start), Some(end)) => Some((start.min(end), start.max(end))),
            _ => None,
        }
    }
}

/// Streaming reader for tab-separated hit tables
pub struct HitReader<R: Read> {
    reader: BufReader<R>,
    line_no: usize,
}

impl<R: Read> HitReader<R> {
    pub fn new(reader: R) -> Self {
        HitReader {
            reader: BufReader::new(reader),
            line_no: 0,
        }
    }

    pub fn read_record<S: Subject>(&mut self) -> Result<Option<HitRecord<S>>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let trimmed = line.trim_end_matches(['\n', '\r']);
            if trimmed.trim().is_empty() || trimmed.starts_with('#') {
                continue;
            }
            return parse_hit_line(trimmed, self.line_no).map(Some);
        }
    }

    pub fn read_all<S: Subject>(&mut self) -> Result<Vec<HitRecord<S>>> {
        let mut records = Vec::new();
        while let Some(record) = self.read_record()? {
            records.push(record);
        }
        Ok(records)
    }
}

fn parse_field<T: std::str::FromStr>(fields: &[&str], idx: usize, name: &str, line: usize) -> Result<T> {
    fields[idx]
        .trim()
        .parse()
        .map_err(|_| ReconError::MalformedRecord {
            line,
            reason: format!("invalid {name} '{}'", fields[idx]),
        })
}

/// Parse one row: `qseqid sseqid pident length qlen slen qcovs evalue bitscore sstart send [qstart qend]`
pub fn parse_hit_line<S: Subject>(line: &str, line_no: usize) -> Result<HitRecord<S>> {
    let fields: Vec<&str> = line.split('\t').collect();

    if fields.len() < REQUIRED_FIELDS {
        return Err(ReconError::MalformedRecord {
            line: line_no,
            reason: format!(
                "expected at least {REQUIRED_FIELDS} tab-separated fields, found {}",
                fields.len()
            ),
        });
    }

    let subject = S::parse(fields[1]).map_err(|reason| ReconError::MalformedRecord {
        line: line_no,
        reason,
    })?;

    let (query_start, query_end) = if fields.len() >= REQUIRED_FIELDS + 2 {
        (
            Some(parse_field(&fields, 11, "qstart", line_no)?),
            Some(parse_field(&fields, 12, "qend", line_no)?),
        )
    } else {
        (None, None)
    };

    Ok(HitRecord {
        query_id: fields[0].to_string(),
        subject,
        identity: parse_field(&fields, 2, "pident", line_no)?,
        length: parse_field(&fields, 3, "length", line_no)?,
        query_len: parse_field(&fields, 4, "qlen", line_no)?,
        subject_len: parse_field(&fields, 5, "slen", line_no)?,
        query_coverage: parse_field(&fields, 6, "qcovs", line_no)?,
        evalue: parse_field(&fields, 7, "evalue", line_no)?,
        bitscore: parse_field(&fields, 8, "bitscore", line_no)?,
        subject_start: parse_field(&fields, 9, "sstart", line_no)?,
        subject_end: parse_field(&fields, 10, "send", line_no)?,
        query_start,
        query_end,
    })
}

/// Read a hit table from file (auto-detects bgzip compression).
/// A missing file is treated as an empty table.
pub fn read_hit_table<S: Subject, P: AsRef<Path>>(path: P) -> Result<Vec<HitRecord<S>>> {
    let path = path.as_ref();
    if !path.exists() {
        log::warn!("Hit table {} not found, treating as empty", path.display());
        return Ok(Vec::new());
    }
    let mut reader = HitReader::new(open_input(path)?);
    reader.read_all()
}
