//! Delimiter sniffing from a small head sample.
//!
//! Only the first `sample_rows` lines are read.  The header is split under
//! `,` first; more than one column means the file is comma-separated,
//! otherwise it is taken as `;`-separated.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use log::debug;

use crate::{ColumnRoles, SchemaError, SchemaResult, resolve_roles};

/// Default number of data rows inspected after the header.
pub const DEFAULT_SAMPLE_ROWS: usize = 2_000;

const UTF8_BOM: &str = "\u{feff}";

/// What a head sample revealed about a CSV source.
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaSample {
    pub delimiter:    u8,
    pub headers:      Vec<String>,
    /// Data rows (after the header) that parsed under `delimiter`.
    pub sampled_rows: usize,
}

impl SchemaSample {
    /// Resolve column roles for this sample's header.
    pub fn roles(&self) -> SchemaResult<ColumnRoles> {
        resolve_roles(&self.headers)
    }
}

/// Sniff the CSV file at `path`.
pub fn sniff_path(path: &Path, sample_rows: usize) -> SchemaResult<SchemaSample> {
    let file = File::open(path)?;
    sniff_reader(file, sample_rows)
}

/// Like [`sniff_path`] but accepts any `Read` source.
pub fn sniff_reader<R: Read>(reader: R, sample_rows: usize) -> SchemaResult<SchemaSample> {
    let head = read_head(reader, sample_rows + 1)?;
    if head.iter().all(u8::is_ascii_whitespace) {
        return Err(SchemaError::Empty);
    }

    let (comma_headers, comma_rows) = parse_head(&head, b',')?;
    let sample = if comma_headers.len() > 1 {
        SchemaSample { delimiter: b',', headers: comma_headers, sampled_rows: comma_rows }
    } else {
        let (headers, sampled_rows) = parse_head(&head, b';')?;
        SchemaSample { delimiter: b';', headers, sampled_rows }
    };
    debug!(
        "sniffed delimiter {:?} with {} columns over {} rows",
        sample.delimiter as char,
        sample.headers.len(),
        sample.sampled_rows
    );
    Ok(sample)
}

/// Read at most `lines` lines into memory.
fn read_head<R: Read>(reader: R, lines: usize) -> SchemaResult<Vec<u8>> {
    let mut buf = BufReader::new(reader);
    let mut head = Vec::new();
    for _ in 0..lines {
        if buf.read_until(b'\n', &mut head)? == 0 {
            break;
        }
    }
    Ok(head)
}

fn parse_head(head: &[u8], delimiter: u8) -> SchemaResult<(Vec<String>, usize)> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(head);
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| if i == 0 { h.trim_start_matches(UTF8_BOM).to_owned() } else { h.to_owned() })
        .collect();
    let rows = rdr.records().filter(|r| r.is_ok()).count();
    Ok((headers, rows))
}
