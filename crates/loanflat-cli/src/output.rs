//! Writers for the per-document table → records map.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use loanflat_model::{CellValue, OutputRecord, RelationalOutput};

/// Write the whole map as `<dir>/<stem>.json`.
pub fn write_json(dir: &Path, stem: &str, tables: &RelationalOutput) -> Result<Vec<PathBuf>> {
    let path = dir.join(format!("{stem}.json"));
    let file = File::create(&path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, tables)
        .with_context(|| format!("write {}", path.display()))?;
    writer.flush()?;
    Ok(vec![path])
}

/// Write one `<dir>/<stem>.<table>.csv` per table.
pub fn write_csv(dir: &Path, stem: &str, tables: &RelationalOutput) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for (table, records) in tables.tables() {
        let path = dir.join(format!("{stem}.{table}.csv"));
        let file = File::create(&path).with_context(|| format!("create {}", path.display()))?;
        write_table_csv(BufWriter::new(file), records)
            .with_context(|| format!("write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

/// CSV with the union of all record columns as header, sorted; absent
/// columns are written as empty cells.
pub fn write_table_csv<W: Write>(writer: W, records: &[OutputRecord]) -> Result<()> {
    let columns: BTreeSet<&str> = records.iter().flat_map(OutputRecord::columns).collect();
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(&columns)?;
    for record in records {
        csv.write_record(columns.iter().map(|column| {
            record
                .get(column)
                .map(CellValue::as_text)
                .unwrap_or_default()
        }))?;
    }
    csv.flush()?;
    Ok(())
}

pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create output directory {}", dir.display()))
}
