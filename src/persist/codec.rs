//! CSV row codec for flat-file stores
//!
//! Layout: a header row naming the key and value columns, then one row per
//! scalar key or one row per (key, element) pair for set values. Fields use
//! `,` as delimiter and `"` as quote, quoted only when needed.
//!
//! Null is written as the bare token `None`. A real value equal to `None`, or
//! starting with `\`, is written with one extra leading `\`.

use crate::error::{CacheError, CacheResult};
use crate::value::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

/// On-disk token for a null value
pub const NULL_TOKEN: &str = "None";

const ESCAPE: char = '\\';

/// Header names of the two columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Columns {
    pub key: String,
    pub value: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            key: "key".to_string(),
            value: "value".to_string(),
        }
    }
}

/// Encode a value field for disk
pub fn encode_field(field: Option<&str>) -> Cow<'_, str> {
    match field {
        None => Cow::Borrowed(NULL_TOKEN),
        Some(text) if text == NULL_TOKEN || text.starts_with(ESCAPE) => {
            Cow::Owned(format!("{}{}", ESCAPE, text))
        }
        Some(text) => Cow::Borrowed(text),
    }
}

/// Decode a value field read from disk
pub fn decode_field(raw: &str) -> Option<String> {
    if raw == NULL_TOKEN {
        return None;
    }
    Some(raw.strip_prefix(ESCAPE).unwrap_or(raw).to_string())
}

/// Write every entry as CSV rows
pub fn write_rows<'a, V, W, I>(writer: W, columns: &Columns, entries: I) -> CacheResult<()>
where
    V: Value,
    W: io::Write,
    I: IntoIterator<Item = (&'a String, &'a V)>,
{
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(b',')
        .quote(b'"')
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    csv_writer
        .write_record([columns.key.as_str(), columns.value.as_str()])
        .map_err(csv_write_error)?;

    for (key, value) in entries {
        for field in value.to_fields() {
            let encoded = encode_field(field.as_deref());
            csv_writer
                .write_record([key.as_str(), encoded.as_ref()])
                .map_err(csv_write_error)?;
        }
    }

    csv_writer
        .flush()
        .map_err(|e| CacheError::io("flushing csv rows", e))
}

/// Read CSV rows back into one value per key
///
/// `origin` only labels errors. Any row that is not exactly two fields of
/// valid UTF-8 makes the whole file corrupt.
pub fn read_rows<V, R>(reader: R, origin: &Path) -> CacheResult<BTreeMap<String, V>>
where
    V: Value,
    R: io::Read,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .quote(b'"')
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let header_len = csv_reader
        .headers()
        .map_err(|e| corrupt(origin, e.to_string()))?
        .len();
    if header_len != 0 && header_len != 2 {
        return Err(corrupt(
            origin,
            format!("header has {} columns, expected 2", header_len),
        ));
    }

    let mut rows: BTreeMap<String, Vec<Option<String>>> = BTreeMap::new();
    for record in csv_reader.records() {
        let record = record.map_err(|e| corrupt(origin, e.to_string()))?;
        if record.len() != 2 {
            return Err(corrupt(
                origin,
                format!("row has {} fields, expected 2", record.len()),
            ));
        }
        rows.entry(record[0].to_string())
            .or_default()
            .push(decode_field(&record[1]));
    }

    Ok(rows
        .into_iter()
        .filter_map(|(key, fields)| V::from_fields(fields).map(|value| (key, value)))
        .collect())
}

fn corrupt(origin: &Path, reason: String) -> CacheError {
    CacheError::StoreCorrupt {
        path: origin.to_path_buf(),
        reason,
    }
}

fn csv_write_error(e: csv::Error) -> CacheError {
    match e.into_kind() {
        csv::ErrorKind::Io(source) => CacheError::io("writing csv rows", source),
        other => CacheError::User(format!("csv encoding failed: {:?}", other)),
    }
}
