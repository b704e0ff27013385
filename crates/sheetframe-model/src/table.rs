//! Table assembly: header resolution, row padding and column-name synthesis.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::{coerce, CellValue};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("sheet contains no rows")]
    NoRows,
    #[error("row {row} has {actual} values but the table has {expected} columns")]
    RowWidthMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

/// Raw, untyped sheet content as produced by a format decoder.
///
/// Each row is sparse-by-position: index `i` of a row holds the text of column `i`, `None` for a
/// cell that was absent or blank. Rows are *not* padded; [`TableBuilder`] owns that step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSheet {
    rows: Vec<Vec<Option<String>>>,
}

impl RawSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_row(&mut self, row: Vec<Option<String>>) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Width of the widest row, header included.
    pub fn max_width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

impl FromIterator<Vec<Option<String>>> for RawSheet {
    fn from_iter<T: IntoIterator<Item = Vec<Option<String>>>>(iter: T) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

/// A normalized table: ordered column names plus rows that are all exactly as wide as the
/// column list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Construct a table from already-normalized parts, validating row widths.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self, TableError> {
        if let Some((row, values)) = rows
            .iter()
            .enumerate()
            .find(|(_, values)| values.len() != columns.len())
        {
            return Err(TableError::RowWidthMismatch {
                row,
                expected: columns.len(),
                actual: values.len(),
            });
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// `(row_count, column_count)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of a single column, top to bottom.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &CellValue> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<CellValue>>) {
        (self.columns, self.rows)
    }
}

impl<'de> Deserialize<'de> for Table {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Helper {
            columns: Vec<String>,
            #[serde(default)]
            rows: Vec<Vec<CellValue>>,
        }

        let helper = Helper::deserialize(deserializer)?;
        Table::new(helper.columns, helper.rows).map_err(serde::de::Error::custom)
    }
}

/// Accumulates typed rows and produces a [`Table`] whose rows are padded to a single width.
#[derive(Debug, Clone, Default)]
pub struct TableBuilder {
    header: Vec<Option<String>>,
    rows: Vec<Vec<CellValue>>,
}

impl TableBuilder {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            header: columns.into_iter().map(|c| Some(c.into())).collect(),
            rows: Vec::new(),
        }
    }

    /// Treat the first raw row as the header and coerce every following row.
    pub fn from_raw(sheet: RawSheet) -> Result<Self, TableError> {
        let mut rows = sheet.rows.into_iter();
        let header = rows.next().ok_or(TableError::NoRows)?;

        let rows = rows
            .map(|row| {
                row.into_iter()
                    .map(|cell| cell.as_deref().map(coerce).unwrap_or(CellValue::Null))
                    .collect()
            })
            .collect();

        Ok(Self { header, rows })
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) -> &mut Self {
        self.rows.push(row);
        self
    }

    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(self.header.len())
    }

    pub fn build(self) -> Table {
        let width = self.width();

        let columns = (0..width)
            .map(|idx| {
                self.header
                    .get(idx)
                    .and_then(|name| name.as_deref())
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("col_{idx}"))
            })
            .collect();

        let rows = self
            .rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Null);
                row
            })
            .collect();

        Table { columns, rows }
    }
}
