//! Delimited-text table I/O.
//!
//! Files ending in `.tsv`/`.txt` are tab-separated, everything else is
//! read and written as CSV. Normalised tables are written without a row
//! index, columns ordered `GeneSymbol, Name, <measurements...>`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use kinsel_common::{CanonicalRecord, CanonicalTable, DatasetSpec, KinselError, Result};
use tracing::debug;

use crate::models::{RawRecord, RawTable};

pub const GENE_SYMBOL_COLUMN: &str = "GeneSymbol";
pub const NAME_COLUMN: &str = "Name";
pub const RANK_COLUMN: &str = "rank";

/// Field delimiter implied by the file extension.
pub fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") || ext.eq_ignore_ascii_case("txt") => b'\t',
        _ => b',',
    }
}

/// Load the label and measurement columns of a source dataset.
pub fn read_raw_table(path: &Path, spec: &DatasetSpec) -> Result<RawTable> {
    debug!("Loading {} from {:?}", spec.name, path);
    let file = File::open(path)?;
    parse_raw_table(file, delimiter_for(path), spec)
}

pub fn parse_raw_table<R: Read>(reader: R, delimiter: u8, spec: &DatasetSpec) -> Result<RawTable> {
    let mut rdr = csv::ReaderBuilder::new().delimiter(delimiter).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let column = |name: &str| -> Result<usize> {
        headers.iter().position(|h| h == name).ok_or_else(|| {
            KinselError::StructuralConfig(format!("dataset '{}' has no column '{}'", spec.name, name))
        })
    };
    let label_idx = column(&spec.label_column)?;
    let value_idx: Vec<(String, usize)> = spec
        .value_columns
        .iter()
        .map(|c| column(c).map(|i| (c.clone(), i)))
        .collect::<Result<_>>()?;

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result?;
        let label = row.get(label_idx).unwrap_or_default().to_string();
        let values = value_idx
            .iter()
            .map(|(c, i)| (c.clone(), row.get(*i).unwrap_or_default().to_string()))
            .collect();
        records.push(RawRecord { label, values });
    }

    debug!(dataset = %spec.name, rows = records.len(), "Raw table loaded");
    Ok(RawTable { name: spec.name.clone(), records })
}

fn format_value(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else if v.is_infinite() {
        if v > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else {
        v.to_string()
    }
}

/// Write a normalised table.
pub fn write_canonical_table(path: &Path, table: &CanonicalTable) -> Result<()> {
    let file = File::create(path)?;
    write_canonical_to(file, delimiter_for(path), table)
}

pub fn write_canonical_to<W: Write>(writer: W, delimiter: u8, table: &CanonicalTable) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().delimiter(delimiter).from_writer(writer);

    let mut header = vec![GENE_SYMBOL_COLUMN.to_string(), NAME_COLUMN.to_string()];
    header.extend(table.columns.iter().cloned());
    wtr.write_record(&header)?;

    for record in &table.records {
        let mut row = vec![record.gene_symbol.clone(), record.original_label.clone()];
        row.extend(
            table
                .columns
                .iter()
                .map(|c| record.value(c).map(format_value).unwrap_or_default()),
        );
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read back a table written by `write_canonical_table`.
pub fn read_canonical_table(path: &Path, name: &str) -> Result<CanonicalTable> {
    let file = File::open(path)?;
    parse_canonical_table(file, delimiter_for(path), name)
}

pub fn parse_canonical_table<R: Read>(reader: R, delimiter: u8, name: &str) -> Result<CanonicalTable> {
    let mut rdr = csv::ReaderBuilder::new().delimiter(delimiter).from_reader(reader);
    let headers = rdr.headers()?.clone();

    if headers.get(0) != Some(GENE_SYMBOL_COLUMN) || headers.get(1) != Some(NAME_COLUMN) {
        return Err(KinselError::StructuralConfig(format!(
            "table '{}' must start with columns '{}', '{}'",
            name, GENE_SYMBOL_COLUMN, NAME_COLUMN
        )));
    }
    let columns: Vec<String> = headers.iter().skip(2).map(String::from).collect();

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result?;
        let gene_symbol = row.get(0).unwrap_or_default().to_string();
        let original_label = row.get(1).unwrap_or_default().to_string();
        let mut measurements = BTreeMap::new();
        for (i, column) in columns.iter().enumerate() {
            let raw = row.get(i + 2).unwrap_or_default().trim();
            let value = raw.parse::<f64>().map_err(|_| KinselError::InvalidMeasurement {
                table: name.to_string(),
                label: original_label.clone(),
                column: column.clone(),
                value: raw.to_string(),
            })?;
            measurements.insert(column.clone(), value);
        }
        records.push(CanonicalRecord { gene_symbol, original_label, measurements });
    }

    Ok(CanonicalTable::new(name, columns, records))
}

/// Newline-delimited symbol list with a trailing newline.
pub fn write_symbol_list(path: &Path, symbols: &[String]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(symbols.join("\n").as_bytes())?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Two-column `GeneSymbol<TAB>rank` table.
pub fn write_rank_table(path: &Path, ranks: &[(String, f64)]) -> Result<()> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().delimiter(b'\t').from_writer(file);
    wtr.write_record([GENE_SYMBOL_COLUMN, RANK_COLUMN])?;
    for (symbol, rank) in ranks {
        wtr.write_record([symbol.as_str(), format_value(*rank).as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}
