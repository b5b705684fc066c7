//! CSV export of a table: header row in column order, one record per row,
//! unset cells as empty fields.

use crate::{error::SimResult, table::Table};
use std::io::Write;
use std::path::Path;

pub fn write_csv<W: Write>(table: &Table, writer: W) -> SimResult<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(table.column_names())?;
    let columns: Vec<_> = table.columns().map(|(_, c)| c).collect();
    for row in 0..table.row_count() {
        csv.write_record(columns.iter().map(|c| c.render(row)))?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_csv_file(table: &Table, path: impl AsRef<Path>) -> SimResult<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path)?;
    write_csv(table, std::io::BufWriter::new(file))?;
    log::info!("export: wrote {} rows to {}", table.row_count(), path.display());
    Ok(())
}
