use anyhow::{bail, Context};
use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use std::path::Path;

/// A spreadsheet cell, detached from the reader library.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDateTime),
}

impl Cell {
    /// Empty cells and whitespace-only text count as blank.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) => {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    format!("{}", *f as i64)
                } else {
                    f.to_string()
                }
            }
            Cell::Bool(b) => b.to_string(),
            Cell::Date(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

impl From<&Data> for Cell {
    fn from(d: &Data) -> Self {
        match d {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Int(i) => Cell::Int(*i),
            Data::Float(f) => Cell::Float(*f),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(v) => Cell::Date(v),
                None => Cell::Float(dt.as_f64()),
            },
            Data::DateTimeIso(s) => parse_iso(s).map(Cell::Date).unwrap_or(Cell::Text(s.clone())),
            Data::DurationIso(s) => Cell::Text(s.clone()),
        }
    }
}

fn parse_iso(s: &str) -> Option<NaiveDateTime> {
    if let Ok(v) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(v);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// One worksheet, cut down to the title cell and the data rows below the
/// column header row.
#[derive(Debug, Clone)]
pub struct SheetData {
    pub name: String,
    /// Text of cell A1.
    pub title: String,
    /// Absolute (0-based) row index of each entry in `rows`.
    pub first_data_row: usize,
    /// Each row holds exactly as many cells as there are expected columns.
    pub rows: Vec<Vec<Cell>>,
}

/// Reads every sheet of an .xlsx/.xls workbook.
///
/// Rows `0..header_skip_rows` are skipped (A1 is kept as the title), the row at
/// `header_skip_rows` is the column header row, and everything after it is
/// data. Columns are taken positionally from column A; a sheet narrower than
/// `expected_columns` is rejected.
pub fn read_workbook(
    path: &Path,
    header_skip_rows: usize,
    expected_columns: &[&str],
) -> anyhow::Result<Vec<SheetData>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("failed to open workbook {}", path.to_string_lossy()))?;

    let names: Vec<String> = workbook.sheet_names().to_vec();
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook
            .worksheet_range(&name)
            .with_context(|| format!("failed to read sheet '{}'", name))?;
        out.push(sheet_from_range(&name, &range, header_skip_rows, expected_columns)?);
    }
    Ok(out)
}

fn sheet_from_range(
    name: &str,
    range: &Range<Data>,
    header_skip_rows: usize,
    expected_columns: &[&str],
) -> anyhow::Result<SheetData> {
    let cell_at = |row: usize, col: usize| -> Cell {
        range
            .get_value((row as u32, col as u32))
            .map(Cell::from)
            .unwrap_or(Cell::Empty)
    };

    let title = cell_at(0, 0).display();
    let first_data_row = header_skip_rows + 1;

    let Some((end_row, end_col)) = range.end() else {
        return Ok(SheetData {
            name: name.to_string(),
            title,
            first_data_row,
            rows: Vec::new(),
        });
    };

    let width = end_col as usize + 1;
    if width < expected_columns.len() {
        bail!(
            "sheet '{}' has {} columns, expected {} ({})",
            name,
            width,
            expected_columns.len(),
            expected_columns.join(", ")
        );
    }

    for (col, expected) in expected_columns.iter().enumerate() {
        let found = cell_at(header_skip_rows, col).display();
        if found.trim() != *expected {
            log::warn!(
                "sheet '{}': column {} header is {:?}, reading it as {:?}",
                name,
                col + 1,
                found.trim(),
                expected
            );
        }
    }

    let mut rows = Vec::new();
    for row in first_data_row..=end_row as usize {
        rows.push(
            (0..expected_columns.len())
                .map(|col| cell_at(row, col))
                .collect(),
        );
    }

    Ok(SheetData {
        name: name.to_string(),
        title,
        first_data_row,
        rows,
    })
}
