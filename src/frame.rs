//! Minimal column-oriented table used at every I/O boundary.
//!
//! Upstream tables arrive as parquet files with loosely-typed columns; `Frame` holds
//! them as [`Cell`] vectors and offers coercing accessors so loaders can state their
//! contracts ("this column must exist", "this column is numeric") in one place.

use crate::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    pub fn from_opt_f64(v: Option<f64>) -> Self {
        match v {
            Some(x) if x.is_finite() => Cell::Float(x),
            _ => Cell::Null,
        }
    }

    pub fn from_opt_i64(v: Option<i64>) -> Self {
        v.map(Cell::Int).unwrap_or(Cell::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Float(v) if v.is_finite() => Some(*v),
            Cell::Int(v) => Some(*v as f64),
            Cell::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(v) => Some(*v),
            Cell::Float(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i64),
            Cell::Bool(b) => Some(i64::from(*b)),
            Cell::Text(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Cell::Bool(b) => Some(*b),
            Cell::Int(v) => Some(*v != 0),
            Cell::Float(v) if v.is_finite() => Some(*v != 0.0),
            Cell::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "t" | "yes" => Some(true),
                "0" | "false" | "f" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) if !s.trim().is_empty() => Some(s.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    names: Vec<String>,
    columns: Vec<Vec<Cell>>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn n_cols(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &[Cell])> {
        self.names
            .iter()
            .map(|n| n.as_str())
            .zip(self.columns.iter().map(|c| c.as_slice()))
    }

    pub fn push_column(&mut self, name: &str, cells: Vec<Cell>) -> PipelineResult<()> {
        if self.names.iter().any(|n| n == name) {
            return Err(PipelineError::Schema {
                table: "frame".to_string(),
                column: name.to_string(),
                detail: "duplicate column name".to_string(),
            });
        }
        if !self.columns.is_empty() && cells.len() != self.n_rows() {
            return Err(PipelineError::Schema {
                table: "frame".to_string(),
                column: name.to_string(),
                detail: format!("expected {} rows, got {}", self.n_rows(), cells.len()),
            });
        }
        self.names.push(name.to_string());
        self.columns.push(cells);
        Ok(())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Option<&[Cell]> {
        let idx = self.names.iter().position(|n| n == name)?;
        Some(&self.columns[idx])
    }

    /// Fails with a contract error naming the first absent column.
    pub fn require(&self, table: &str, columns: &[&str]) -> PipelineResult<()> {
        for column in columns {
            if !self.has_column(column) {
                return Err(PipelineError::missing_column(table, column));
            }
        }
        Ok(())
    }

    pub fn cell(&self, name: &str, row: usize) -> &Cell {
        self.column(name)
            .and_then(|c| c.get(row))
            .unwrap_or(&Cell::Null)
    }

    pub fn f64_at(&self, name: &str, row: usize) -> Option<f64> {
        self.cell(name, row).as_f64()
    }

    pub fn i64_at(&self, name: &str, row: usize) -> Option<i64> {
        self.cell(name, row).as_i64()
    }

    pub fn bool_at(&self, name: &str, row: usize) -> Option<bool> {
        self.cell(name, row).as_bool()
    }

    pub fn str_at(&self, name: &str, row: usize) -> Option<&str> {
        self.cell(name, row).as_str()
    }

    /// Builds a frame row-by-row from named rows that all share the same column order.
    pub fn from_rows(names: &[String], rows: Vec<Vec<Cell>>) -> PipelineResult<Self> {
        let mut columns: Vec<Vec<Cell>> = names
            .iter()
            .map(|_| Vec::with_capacity(rows.len()))
            .collect();
        for (idx, row) in rows.into_iter().enumerate() {
            if row.len() != names.len() {
                return Err(PipelineError::Schema {
                    table: "frame".to_string(),
                    column: format!("row {idx}"),
                    detail: format!("expected {} cells, got {}", names.len(), row.len()),
                });
            }
            for (col, cell) in columns.iter_mut().zip(row) {
                col.push(cell);
            }
        }
        let mut frame = Frame::new();
        for (name, cells) in names.iter().zip(columns) {
            frame.push_column(name, cells)?;
        }
        Ok(frame)
    }
}
