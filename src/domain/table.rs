//! In-memory tabular batch of unit records.
//!
//! Columns keep their insertion order. Numeric cells are optional so that blank
//! source cells survive until the schema pass decides how to fill them.

use crate::domain::errors::VfmError;
use ndarray::Array2;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(values) => values.len(),
            ColumnData::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell rendered as text; blank for missing numeric cells.
    pub fn cell_text(&self, row: usize) -> String {
        match self {
            ColumnData::Numeric(values) => values
                .get(row)
                .copied()
                .flatten()
                .map(|v| v.to_string())
                .unwrap_or_default(),
            ColumnData::Text(values) => values.get(row).cloned().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitTable {
    columns: Vec<Column>,
    rows: usize,
}

impl UnitTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table, rejecting ragged or duplicate columns.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, VfmError> {
        let mut table = Self::new();
        for column in columns {
            table.push_column(column)?;
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Appends a column. The first column fixes the row count.
    pub fn push_column(&mut self, column: Column) -> Result<(), VfmError> {
        if self.has_column(&column.name) {
            return Err(VfmError::schema("duplicate column", vec![column.name]));
        }
        if !self.columns.is_empty() && column.data.len() != self.rows {
            return Err(VfmError::schema(
                format!(
                    "column has {} rows, table has {}",
                    column.data.len(),
                    self.rows
                ),
                vec![column.name],
            ));
        }
        self.rows = column.data.len();
        self.columns.push(column);
        Ok(())
    }

    /// Writes a numeric column. An existing column of the same name is replaced
    /// in place; otherwise the column is appended.
    pub fn set_numeric(&mut self, name: &str, values: Vec<f64>) -> Result<(), VfmError> {
        let data = ColumnData::Numeric(values.into_iter().map(Some).collect());
        if let Some(existing) = self.columns.iter_mut().find(|c| c.name == name) {
            if data.len() != self.rows {
                return Err(VfmError::schema(
                    format!("column has {} rows, table has {}", data.len(), self.rows),
                    vec![name.to_string()],
                ));
            }
            existing.data = data;
            return Ok(());
        }
        self.push_column(Column {
            name: name.to_string(),
            data,
        })
    }

    /// Returns the required columns that are absent from this table.
    pub fn missing_columns<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        let present: HashSet<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        required
            .iter()
            .copied()
            .filter(|name| !present.contains(name))
            .collect()
    }

    /// Reads a numeric column, substituting `default` for blank cells.
    pub fn numeric_values(&self, name: &str, default: f64) -> Result<FilledColumn, VfmError> {
        let column = self
            .column(name)
            .ok_or_else(|| VfmError::schema("input batch", vec![name.to_string()]))?;
        match &column.data {
            ColumnData::Numeric(values) => {
                let mut filled = 0;
                let values = values
                    .iter()
                    .map(|cell| match cell {
                        Some(v) if v.is_finite() => *v,
                        _ => {
                            filled += 1;
                            default
                        }
                    })
                    .collect();
                Ok(FilledColumn { values, filled })
            }
            ColumnData::Text(_) => Err(VfmError::schema(
                "column is not numeric",
                vec![name.to_string()],
            )),
        }
    }

    /// Like [`UnitTable::numeric_values`], but a text column is parsed cell by
    /// cell. Cells that do not parse count as filled.
    pub fn parsed_values(&self, name: &str, default: f64) -> Result<FilledColumn, VfmError> {
        let column = self
            .column(name)
            .ok_or_else(|| VfmError::schema("input batch", vec![name.to_string()]))?;
        match &column.data {
            ColumnData::Numeric(_) => self.numeric_values(name, default),
            ColumnData::Text(cells) => {
                let mut filled = 0;
                let values = cells
                    .iter()
                    .map(|cell| match cell.trim().parse::<f64>() {
                        Ok(v) if v.is_finite() => v,
                        _ => {
                            filled += 1;
                            default
                        }
                    })
                    .collect();
                Ok(FilledColumn { values, filled })
            }
        }
    }

    /// Gathers `names` into a row-major matrix, filling blanks with `default`.
    ///
    /// Returns the matrix and the number of substituted cells.
    pub fn select_matrix(
        &self,
        names: &[String],
        default: f64,
    ) -> Result<(Array2<f64>, usize), VfmError> {
        let wanted: Vec<&str> = names.iter().map(String::as_str).collect();
        let missing = self.missing_columns(&wanted);
        if !missing.is_empty() {
            return Err(VfmError::schema(
                "input batch",
                missing.into_iter().map(str::to_string).collect(),
            ));
        }

        let mut matrix = Array2::<f64>::zeros((self.rows, names.len()));
        let mut filled = 0;
        for (col_idx, name) in names.iter().enumerate() {
            let column = self.numeric_values(name, default)?;
            filled += column.filled;
            for (row_idx, value) in column.values.into_iter().enumerate() {
                matrix[[row_idx, col_idx]] = value;
            }
        }
        Ok((matrix, filled))
    }
}

/// Numeric column after blank substitution.
#[derive(Debug, Clone, PartialEq)]
pub struct FilledColumn {
    pub values: Vec<f64>,
    /// Number of cells replaced by the default
    pub filled: usize,
}
