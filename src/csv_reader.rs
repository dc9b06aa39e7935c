// CSV ingestion and export

use crate::data::{Dataset, Row};
use crate::value::CellValue;
use anyhow::{Context, Result};
use log::info;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

/// Read a CSV with a header row into a Dataset.
///
/// Cells are kept as text; empty cells and missing trailing fields are absent.
pub fn read_csv<R: Read>(reader: R) -> Result<Dataset> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        anyhow::bail!("CSV has no header row");
    }
    for (i, header) in headers.iter().enumerate() {
        if headers[..i].contains(header) {
            anyhow::bail!("Duplicate CSV header '{}'", header);
        }
    }

    let mut rows = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV record {}", line + 1))?;
        let mut row = Row::new();
        for (header, field) in headers.iter().zip(record.iter()) {
            if !field.is_empty() {
                row.insert(header.clone(), CellValue::text(field));
            }
        }
        rows.push(row);
    }

    info!("Loaded {} rows with {} headers", rows.len(), headers.len());
    Ok(Dataset::new(headers, rows))
}

pub fn read_csv_from_stdin() -> Result<Dataset> {
    read_csv(io::stdin().lock())
}

pub fn read_csv_file(path: &Path) -> Result<Dataset> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    read_csv(file)
}

/// Write the given headers of a dataset as CSV. Absent cells are left empty.
pub fn write_csv<W: Write>(data: &Dataset, headers: &[String], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(headers).context("Failed to write CSV headers")?;
    for row in &data.rows {
        let record: Vec<String> = headers
            .iter()
            .map(|h| match row.get(h) {
                Some(CellValue::Absent) | None => String::new(),
                Some(value) => value.to_text(),
            })
            .collect();
        wtr.write_record(&record).context("Failed to write CSV record")?;
    }
    wtr.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Single-column download.
pub fn write_column_csv<W: Write>(data: &Dataset, header: &str, writer: W) -> Result<()> {
    write_csv(data, &[header.to_string()], writer)
}
