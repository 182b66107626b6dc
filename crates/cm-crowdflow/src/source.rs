//! Shared CSV plumbing for the two sensor tables.

use std::io::Read;

use cm_schema::{SchemaError, sniff_reader};
use csv::StringRecord;
use log::debug;

use crate::{FlowError, FlowResult};

const UTF8_BOM: &str = "\u{feff}";

/// Read the whole source and open a CSV reader with the sniffed delimiter.
/// Both sensor exports are small enough to hold in memory.
pub(crate) fn read_all<R: Read>(mut reader: R) -> FlowResult<Vec<u8>> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(bytes)
}

pub(crate) fn csv_reader(bytes: &[u8]) -> FlowResult<csv::Reader<&[u8]>> {
    let delimiter = match sniff_reader(bytes, 0) {
        Ok(sample) => sample.delimiter,
        Err(SchemaError::Csv(e)) => return Err(e.into()),
        Err(SchemaError::Io(e)) => return Err(e.into()),
        Err(e) => {
            debug!("sensor table not sniffable ({e}); assuming comma");
            b','
        }
    };
    Ok(csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(bytes))
}

/// Read the next well-formed record into `record`.  Malformed rows are
/// skipped and counted in `malformed`; I/O errors end the load.
pub(crate) fn read_next<R: Read>(
    rdr: &mut csv::Reader<R>,
    record: &mut StringRecord,
    malformed: &mut usize,
) -> FlowResult<bool> {
    loop {
        match rdr.read_record(record) {
            Ok(more) => return Ok(more),
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                debug!("skipping malformed sensor row: {e}");
                *malformed += 1;
            }
        }
    }
}

/// Header cells with the BOM and surrounding whitespace removed.
pub(crate) fn clean_headers<R: Read>(rdr: &mut csv::Reader<R>) -> FlowResult<Vec<String>> {
    Ok(rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches(UTF8_BOM).trim().to_owned())
        .collect())
}

/// Position of `column` (exact, then case-insensitive) or a `MissingColumn`
/// error.
pub(crate) fn require(header: &[String], column: &str) -> FlowResult<usize> {
    find(header, column).ok_or_else(|| FlowError::MissingColumn {
        column: column.to_owned(),
        header: header.to_vec(),
    })
}

pub(crate) fn find(header: &[String], column: &str) -> Option<usize> {
    header
        .iter()
        .position(|h| h == column)
        .or_else(|| header.iter().position(|h| h.eq_ignore_ascii_case(column)))
}
