//! The dataset table — ordered, named, equal-length columns.
//!
//! Every cell is an `Option`. Dense columns are fully populated; bias
//! columns are populated only on their owning group's rows and left `None`
//! everywhere else.
//!
//! RULE: Stages only add columns. Existing columns are never rewritten,
//! and row order changes only by building a new table with `select_rows`.

use crate::error::{SimError, SimResult};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Float,
    Int,
    Text,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Int => "int",
            Self::Text => "text",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "float" => Some(Self::Float),
            "int" => Some(Self::Int),
            "text" => Some(Self::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Float(Vec<Option<f64>>),
    Int(Vec<Option<i64>>),
    Text(Vec<Option<String>>),
}

impl Column {
    pub fn dense_float(values: Vec<f64>) -> Self {
        Self::Float(values.into_iter().map(Some).collect())
    }

    pub fn dense_int(values: Vec<i64>) -> Self {
        Self::Int(values.into_iter().map(Some).collect())
    }

    pub fn dense_text(values: Vec<String>) -> Self {
        Self::Text(values.into_iter().map(Some).collect())
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Self::Float(_) => ColumnKind::Float,
            Self::Int(_) => ColumnKind::Int,
            Self::Text(_) => ColumnKind::Text,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_set(&self, row: usize) -> bool {
        match self {
            Self::Float(v) => v.get(row).is_some_and(Option::is_some),
            Self::Int(v) => v.get(row).is_some_and(Option::is_some),
            Self::Text(v) => v.get(row).is_some_and(Option::is_some),
        }
    }

    /// Number of populated cells.
    pub fn populated(&self) -> usize {
        (0..self.len()).filter(|&row| self.is_set(row)).count()
    }

    /// Numeric view of one cell. Text cells have none.
    pub fn numeric(&self, row: usize) -> Option<f64> {
        match self {
            Self::Float(v) => v.get(row).copied().flatten(),
            Self::Int(v) => v.get(row).copied().flatten().map(|x| x as f64),
            Self::Text(_) => None,
        }
    }

    /// Text rendering of one cell; unset cells render as "".
    pub fn render(&self, row: usize) -> String {
        match self {
            Self::Float(v) => v.get(row).copied().flatten().map(|x| x.to_string()),
            Self::Int(v) => v.get(row).copied().flatten().map(|x| x.to_string()),
            Self::Text(v) => v.get(row).cloned().flatten(),
        }
        .unwrap_or_default()
    }

    /// New column holding the given rows, in the given order.
    pub fn take(&self, rows: &[usize]) -> Self {
        match self {
            Self::Float(v) => Self::Float(rows.iter().map(|&r| v[r]).collect()),
            Self::Int(v) => Self::Int(rows.iter().map(|&r| v[r]).collect()),
            Self::Text(v) => Self::Text(rows.iter().map(|&r| v[r].clone()).collect()),
        }
    }
}

/// Place `values` at `rows` in a column of length `len`; every other cell
/// stays unset.
pub fn scatter<T>(len: usize, rows: &[usize], values: Vec<T>) -> Vec<Option<T>> {
    debug_assert_eq!(rows.len(), values.len());
    let mut out: Vec<Option<T>> = std::iter::repeat_with(|| None).take(len).collect();
    for (&row, value) in rows.iter().zip(values) {
        out[row] = Some(value);
    }
    out
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    names:   Vec<String>,
    columns: Vec<Column>,
    rows:    usize,
}

impl Table {
    /// An empty table that will hold `rows` rows.
    pub fn with_rows(rows: usize) -> Self {
        Self {
            names: Vec::new(),
            columns: Vec::new(),
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Columns in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(String::as_str).zip(self.columns.iter())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Append a column. Names are unique and every column has `row_count` cells.
    pub fn add_column(&mut self, name: impl Into<String>, column: Column) -> SimResult<()> {
        let name = name.into();
        if self.has_column(&name) {
            return Err(SimError::config("table", name, "duplicate column name"));
        }
        if column.len() != self.rows {
            return Err(SimError::config(
                "table",
                name,
                format!("column has {} cells, table has {} rows", column.len(), self.rows),
            ));
        }
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    /// Fully populated numeric column (float or int) as `f64`s.
    pub fn dense_numeric(&self, name: &str, stage: &'static str) -> SimResult<Vec<f64>> {
        let column = self.require(name, stage)?;
        if column.kind() == ColumnKind::Text {
            return Err(SimError::config(stage, name, "expected a numeric column"));
        }
        (0..self.rows)
            .map(|row| {
                column
                    .numeric(row)
                    .ok_or_else(|| SimError::config(stage, name, format!("row {row} is unset")))
            })
            .collect()
    }

    /// Numeric column (float or int), unset cells preserved.
    pub fn numeric(&self, name: &str, stage: &'static str) -> SimResult<Vec<Option<f64>>> {
        let column = self.require(name, stage)?;
        if column.kind() == ColumnKind::Text {
            return Err(SimError::config(stage, name, "expected a numeric column"));
        }
        Ok((0..self.rows).map(|row| column.numeric(row)).collect())
    }

    pub fn text(&self, name: &str, stage: &'static str) -> SimResult<&[Option<String>]> {
        match self.require(name, stage)? {
            Column::Text(values) => Ok(values),
            _ => Err(SimError::config(stage, name, "expected a text column")),
        }
    }

    /// Row indices per distinct label of a text column, each list ascending.
    pub fn partition_by(
        &self,
        name: &str,
        stage: &'static str,
    ) -> SimResult<BTreeMap<String, Vec<usize>>> {
        let mut partition: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (row, label) in self.text(name, stage)?.iter().enumerate() {
            if let Some(label) = label {
                partition.entry(label.clone()).or_default().push(row);
            }
        }
        Ok(partition)
    }

    /// New table with the given rows, in the given order, reindexed from 0.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
            rows: rows.len(),
        }
    }

    fn require(&self, name: &str, stage: &'static str) -> SimResult<&Column> {
        self.column(name)
            .ok_or_else(|| SimError::config(stage, name, "column not present in table"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_column_rejects_length_mismatch_and_duplicates() {
        let mut table = Table::with_rows(3);
        table.add_column("x", Column::dense_float(vec![1.0, 2.0, 3.0])).unwrap();

        assert!(table.add_column("x", Column::dense_int(vec![1, 2, 3])).is_err());
        assert!(table.add_column("y", Column::dense_int(vec![1, 2])).is_err());
        assert_eq!(table.column_names(), ["x".to_string()]);
    }

    #[test]
    fn scatter_leaves_other_rows_unset() {
        let column = Column::Float(scatter(5, &[1, 3], vec![10.0, 30.0]));
        assert_eq!(column.populated(), 2);
        assert!(column.is_set(1) && column.is_set(3));
        assert!(!column.is_set(0) && !column.is_set(4));
        assert_eq!(column.render(0), "");
        assert_eq!(column.render(3), "30");
    }

    #[test]
    fn select_rows_reorders_every_column() {
        let mut table = Table::with_rows(3);
        table.add_column("n", Column::dense_int(vec![1, 2, 3])).unwrap();
        table
            .add_column("s", Column::dense_text(vec!["a".into(), "b".into(), "c".into()]))
            .unwrap();

        let picked = table.select_rows(&[2, 0]);
        assert_eq!(picked.row_count(), 2);
        assert_eq!(picked.column("n"), Some(&Column::dense_int(vec![3, 1])));
        assert_eq!(picked.text("s", "test").unwrap(), [Some("c".to_string()), Some("a".to_string())]);
        // The source table is untouched.
        assert_eq!(table.column("n"), Some(&Column::dense_int(vec![1, 2, 3])));
    }

    #[test]
    fn partition_by_groups_rows_by_label() {
        let mut table = Table::with_rows(4);
        table
            .add_column(
                "g",
                Column::dense_text(vec!["b".into(), "a".into(), "b".into(), "a".into()]),
            )
            .unwrap();
        let partition = table.partition_by("g", "test").unwrap();
        assert_eq!(partition["a"], vec![1, 3]);
        assert_eq!(partition["b"], vec![0, 2]);
    }
}
