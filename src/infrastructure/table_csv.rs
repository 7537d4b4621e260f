//! CSV reading and writing for [`UnitTable`].
//!
//! A column is numeric when every non-blank cell parses as a number; otherwise
//! it is kept as text. Identifier columns listed in `text_columns` are always
//! text so that values like `02028` keep their leading zeros.

use crate::domain::table::{Column, ColumnData, UnitTable};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use tracing::info;

pub fn read_table(path: &Path, text_columns: &[&str]) -> Result<UnitTable> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let table = read_table_from(BufReader::new(file), text_columns)
        .with_context(|| format!("Failed to read CSV {}", path.display()))?;
    info!(
        "Loaded {} rows x {} columns from {:?}",
        table.len(),
        table.columns().len(),
        path
    );
    Ok(table)
}

pub fn read_table_from<R: Read>(reader: R, text_columns: &[&str]) -> Result<UnitTable> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()
        .context("Missing CSV header row")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for (line, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Malformed CSV record {}", line + 1))?;
        for (idx, column) in cells.iter_mut().enumerate() {
            column.push(record.get(idx).unwrap_or("").trim().to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, raw)| {
            let data = if text_columns.contains(&name.as_str()) {
                ColumnData::Text(raw)
            } else {
                parse_numeric(&raw).unwrap_or(ColumnData::Text(raw))
            };
            Column { name, data }
        })
        .collect();

    Ok(UnitTable::from_columns(columns)?)
}

fn parse_numeric(raw: &[String]) -> Option<ColumnData> {
    let mut values = Vec::with_capacity(raw.len());
    for cell in raw {
        if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
            values.push(None);
        } else {
            values.push(Some(cell.parse::<f64>().ok()?));
        }
    }
    Some(ColumnData::Numeric(values))
}

pub fn write_table(path: &Path, table: &UnitTable) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_table_to(file, table).with_context(|| format!("Failed to write CSV {}", path.display()))?;
    info!("Wrote {} rows to {:?}", table.len(), path);
    Ok(())
}

pub fn write_table_to<W: Write>(writer: W, table: &UnitTable) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(table.column_names())?;
    for row in 0..table.len() {
        wtr.write_record(table.columns().iter().map(|c| c.data.cell_text(row)))?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_infers_column_types() {
        let csv = "grid_id,total_deposit_median,note\n02028,1000,a\n11040,,b\n";
        let table = read_table_from(csv.as_bytes(), &["grid_id"]).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.column("grid_id").unwrap().data,
            ColumnData::Text(vec!["02028".to_string(), "11040".to_string()])
        );
        assert_eq!(
            table.column("total_deposit_median").unwrap().data,
            ColumnData::Numeric(vec![Some(1000.0), None])
        );
        assert!(matches!(table.column("note").unwrap().data, ColumnData::Text(_)));
    }

    #[test]
    fn test_write_keeps_column_order_and_blanks() {
        let table = read_table_from("b,a\n1.5,\n,x\n".as_bytes(), &[]).unwrap();
        let mut out = Vec::new();
        write_table_to(&mut out, &table).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "b,a\n1.5,\n,x\n");
    }
}
