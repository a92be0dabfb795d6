//! CSV serialization of registry rows
//!
//! Columns come from the first entry's keys. Fields are written without
//! quoting, so a value containing the delimiter shifts the columns of its
//! row; such values are reported back to the caller rather than escaped.

use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::registry::Entry;

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("CSV serialization failed: {0}")]
    Write(#[from] csv::Error),

    #[error("CSV buffer could not be flushed: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV output is not UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Serialized CSV text plus the cells that would need escaping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvDocument {
    pub text: String,
    /// `(row, column)` of every cell containing `,`, `\r` or `\n`
    pub unescaped_cells: Vec<(usize, String)>,
}

/// Serialize entries as comma-separated text, header first
pub fn to_csv(entries: &[Entry]) -> Result<CsvDocument, CsvError> {
    // No entries means no columns: just the empty header line
    if entries.is_empty() {
        return Ok(CsvDocument {
            text: "\n".to_string(),
            unescaped_cells: Vec::new(),
        });
    }

    let columns: Vec<&str> = entries[0].keys().map(String::as_str).collect();

    let mut buf = Vec::new();
    let mut unescaped_cells = Vec::new();

    write_row(&mut buf, &columns)?;

    for (row, entry) in entries.iter().enumerate() {
        let cells: Vec<String> = columns
            .iter()
            .map(|column| format_cell(entry.get(*column)))
            .collect();

        for (column, cell) in columns.iter().zip(&cells) {
            if cell.contains([',', '\n', '\r']) {
                unescaped_cells.push((row, column.to_string()));
            }
        }

        write_row(&mut buf, &cells)?;
    }

    Ok(CsvDocument {
        text: String::from_utf8(buf)?,
        unescaped_cells,
    })
}

/// Append one record to `buf`. A record with no bytes at all is written as
/// a bare line break; csv would otherwise emit `""` for it.
fn write_row<T: AsRef<[u8]>>(buf: &mut Vec<u8>, cells: &[T]) -> Result<(), CsvError> {
    if cells.len() <= 1 && cells.iter().all(|c| c.as_ref().is_empty()) {
        buf.push(b'\n');
        return Ok(());
    }

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .flexible(true)
        .from_writer(&mut *buf);
    writer.write_record(cells)?;
    writer.flush()?;
    Ok(())
}

/// Text for one cell, following how the values read in the JSON document
pub fn format_cell(value: Option<&JsonValue>) -> String {
    match value {
        None | Some(JsonValue::Null) => String::new(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Bool(b)) => b.to_string(),
        Some(JsonValue::Number(n)) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.is_finite() => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Some(JsonValue::Array(items)) => items
            .iter()
            .map(|item| format_cell(Some(item)))
            .collect::<Vec<_>>()
            .join(","),
        Some(other @ JsonValue::Object(_)) => other.to_string(),
    }
}
