// src/table.rs
use serde::{Serialize, Serializer};
use std::fmt;

/// Tag used instead of a percentage when a value cannot or should not be
/// expressed as growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// Previous period was zero, growth is undefined.
    NoData,
    /// Loss (or zero) in the previous period, profit in the current one.
    LossToProfit,
    /// Profit in the previous period, loss (or zero) in the current one.
    ProfitToLoss,
    /// Loss (or zero) in both periods.
    Loss,
}

impl Flag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::NoData => "no data",
            Flag::LossToProfit => "LTP",
            Flag::ProfitToLoss => "PTL",
            Flag::Loss => "Loss",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Label-column text.
    Text(String),
    /// Always finite.
    Number(f64),
    Missing,
    /// Only produced by derived analytics rows.
    Flag(Flag),
}

impl Cell {
    /// Wraps `v`, turning NaN and infinities into `Missing`.
    pub fn number(v: f64) -> Self {
        if v.is_finite() {
            Cell::Number(v)
        } else {
            Cell::Missing
        }
    }

    pub fn from_option(v: Option<f64>) -> Self {
        v.map(Cell::number).unwrap_or(Cell::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Number(v) => f.write_str(&format_number(*v)),
            Cell::Missing => f.write_str("-"),
            Cell::Flag(flag) => f.write_str(flag.as_str()),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Number(v) => serializer.serialize_f64(*v),
            Cell::Missing => serializer.serialize_none(),
            Cell::Flag(flag) => serializer.serialize_str(flag.as_str()),
        }
    }
}

/// Formats with thousands separators and at most two decimals, trimming
/// trailing zeros: `1234.5 -> "1,234.5"`, `-1000.0 -> "-1,000"`.
pub fn format_number(v: f64) -> String {
    let fixed = format!("{:.2}", v.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let frac = frac_part.trim_end_matches('0');
    let negative = v < 0.0 && (int_part != "0" || !frac.is_empty());

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if !frac.is_empty() {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// One table row, positionally aligned with [`NormalizedTable::columns`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row {
    cells: Vec<Cell>,
}

impl Row {
    pub(crate) fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// The label-column text, empty when the label cell is not text.
    pub fn label(&self) -> &str {
        self.cells.first().and_then(Cell::as_text).unwrap_or("")
    }

    /// Period-column cells, i.e. everything after the label column.
    pub fn periods(&self) -> &[Cell] {
        self.cells.get(1..).unwrap_or(&[])
    }

    pub fn get(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }
}

/// The result of extracting one document: unique column labels (the first is
/// the label column) and rows aligned to them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedTable {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl NormalizedTable {
    /// Every row must have exactly `columns.len()` cells.
    pub(crate) fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        debug_assert!(rows.iter().all(|r| r.cells.len() == columns.len()));
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn period_count(&self) -> usize {
        self.columns.len().saturating_sub(1)
    }

    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == label)
    }

    /// Looks up a cell by row position and column label.
    pub fn value(&self, row: usize, column: &str) -> Option<&Cell> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.get(col)
    }

    /// First row whose label equals `label` exactly.
    pub fn row_by_label(&self, label: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.label() == label)
    }

    /// Appends a row built from a label and one cell per period column.
    /// Short inputs are padded with `Missing`, long ones truncated.
    pub(crate) fn push_derived(&mut self, label: &str, mut periods: Vec<Cell>) {
        periods.resize(self.period_count(), Cell::Missing);
        let mut cells = Vec::with_capacity(self.columns.len());
        cells.push(Cell::Text(label.to_string()));
        cells.extend(periods);
        self.rows.push(Row::new(cells));
    }
}
