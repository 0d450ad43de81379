//! Input loading and output writing for spreadsheet exports.
//!
//! - **Delimiter resolution**: extension-based auto-detection (`.csv` → comma,
//!   `.tsv` → tab) with manual override support.
//! - **Encoding**: CSV input is decoded via `encoding_rs`, defaulting to UTF-8.
//! - **Formats**: `.json` inputs are read as an array of row objects, anything
//!   else as delimited text with a header row.
//! - **stdin/stdout**: the `-` path convention routes through standard streams.

use std::{
    collections::HashSet,
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};
use log::{debug, warn};
use serde::Serialize;

use crate::data::{RawRecord, RawValue};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn is_json(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some(ext) if ext.eq_ignore_ascii_case("json")
    )
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    if is_dash(path) {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Reads every row of `path` as an ordered [`RawRecord`].
pub fn read_records(
    path: &Path,
    delimiter: Option<u8>,
    encoding: &'static Encoding,
) -> Result<Vec<RawRecord>> {
    let reader = open_input(path)?;
    let records = if is_json(path) {
        read_json_records(reader).with_context(|| format!("Parsing JSON rows from {path:?}"))?
    } else {
        let delimiter = resolve_input_delimiter(path, delimiter);
        read_csv_records(reader, delimiter, encoding)
            .with_context(|| format!("Reading delimited rows from {path:?}"))?
    };
    debug!("Read {} row(s) from {:?}", records.len(), path);
    Ok(records)
}

pub fn read_json_records<R: Read>(reader: R) -> Result<Vec<RawRecord>> {
    Ok(serde_json::from_reader(reader)?)
}

/// Delimited rows keyed by their trimmed header.
///
/// Every named header is present on every row: cells missing from a short
/// row read as empty values. A repeated header keeps its first column.
pub fn read_csv_records<R: Read>(
    reader: R,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(reader);
    let headers = decode_record(reader.byte_headers()?, encoding)?;
    let mut seen = HashSet::with_capacity(headers.len());
    let columns: Vec<Option<String>> = headers
        .into_iter()
        .map(|header| {
            let header = header.trim().trim_start_matches('\u{feff}').to_string();
            if header.is_empty() {
                return None;
            }
            if seen.insert(header.clone()) {
                Some(header)
            } else {
                warn!("Duplicate column '{header}' ignored; keeping its first occurrence");
                None
            }
        })
        .collect();

    let mut records = Vec::new();
    for (idx, row) in reader.byte_records().enumerate() {
        let row = row.with_context(|| format!("Reading row {}", idx + 2))?;
        let cells = decode_record(&row, encoding).with_context(|| format!("Decoding row {}", idx + 2))?;
        let mut cells = cells.into_iter();
        let record: RawRecord = columns
            .iter()
            .filter_map(|column| {
                let cell = cells.next().map(RawValue::from).unwrap_or_default();
                column.as_ref().map(|name| (name.clone(), cell))
            })
            .collect();
        records.push(record);
    }
    Ok(records)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

/// Pretty JSON to `path`, or stdout when it is absent or `-`.
pub fn write_json<T: Serialize + ?Sized>(path: Option<&Path>, value: &T) -> Result<()> {
    let mut writer: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(io::stdout().lock()),
    };
    serde_json::to_writer_pretty(&mut writer, value).context("Serializing JSON output")?;
    writeln!(writer).context("Writing JSON output")?;
    writer.flush().context("Flushing JSON output")?;
    Ok(())
}
