//! Reference tables loaded from spreadsheet workbooks.
//!
//! Every sheet becomes a [`MasterTable`]. The first row of a sheet is its header row;
//! headers are trimmed, blank headers are named `Unnamed: {index}` and repeated headers
//! get a `.1`, `.2`, ... suffix so that every column name in a table is unique.

use crate::error::{ProcurementError, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{Duration, NaiveDateTime};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Cursor;
use std::path::Path;

/// Number of data rows shown per table when master data is rendered into a prompt.
pub const PREVIEW_ROWS: usize = 5;

/// Date and datetime cells render as `2024-03-15 00:00:00`.
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MasterTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl MasterTable {
    /// Builds a table from a header row and data rows. Headers are normalised; short rows
    /// are padded with empty cells and long rows truncated to the header width.
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let columns = normalize_headers(headers);
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();

        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    /// The cell at `row` under `column`, if both exist.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| r[idx].as_str())
    }

    /// Plain-text rendering of the header and the first `limit` rows, columns padded to
    /// a common width and each row prefixed with its index.
    pub fn preview(&self, limit: usize) -> String {
        let shown = &self.rows[..self.rows.len().min(limit)];

        let index_width = shown.len().saturating_sub(1).to_string().len();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, header)| {
                shown
                    .iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = String::new();
        out.push_str(&" ".repeat(index_width));
        for (header, width) in self.columns.iter().zip(&widths) {
            out.push_str(&format!("  {:>width$}", header, width = width));
        }

        for (idx, row) in shown.iter().enumerate() {
            out.push('\n');
            out.push_str(&format!("{:<width$}", idx, width = index_width));
            for (value, width) in row.iter().zip(&widths) {
                out.push_str(&format!("  {:>width$}", value, width = width));
            }
        }

        out
    }
}

/// All tables loaded for one request, keyed by derived table name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MasterData {
    tables: BTreeMap<String, MasterTable>,
}

impl MasterData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every workbook, skipping (and logging) any that cannot be parsed.
    pub fn load(workbooks: &BTreeMap<String, Vec<u8>>) -> Self {
        let mut master_data = Self::new();

        for (file_name, bytes) in workbooks {
            match load_workbook(file_name, bytes) {
                Ok(tables) => {
                    for table in tables {
                        master_data.insert(table);
                    }
                }
                Err(e) => error!("Error loading {}: {}", file_name, e),
            }
        }

        info!("Loaded master data keys: {:?}", master_data.keys());
        master_data
    }

    /// Like [`MasterData::load`], but an empty result is an error.
    pub fn load_required(workbooks: &BTreeMap<String, Vec<u8>>) -> Result<Self> {
        let master_data = Self::load(workbooks);
        if master_data.is_empty() {
            return Err(ProcurementError::NoMasterData);
        }
        Ok(master_data)
    }

    pub fn insert(&mut self, table: MasterTable) {
        if let Some(previous) = self.tables.insert(table.name.clone(), table) {
            warn!(
                "Master data key '{}' loaded twice; keeping the later table",
                previous.name
            );
        }
    }

    pub fn get(&self, key: &str) -> Option<&MasterTable> {
        self.tables.get(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    pub fn tables(&self) -> impl Iterator<Item = &MasterTable> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Parses one workbook into tables, one per sheet.
///
/// A single-sheet workbook yields a table named after the file stem; sheets of a
/// multi-sheet workbook are named `{stem}_{sheet}`.
pub fn load_workbook(file_name: &str, bytes: &[u8]) -> Result<Vec<MasterTable>> {
    let load_err = |details: String| ProcurementError::MasterDataLoad {
        file: file_name.to_string(),
        details,
    };

    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| load_err(e.to_string()))?;

    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
        .to_string();

    let sheet_names = workbook.sheet_names();
    let multi_sheet = sheet_names.len() > 1;
    let mut tables = Vec::with_capacity(sheet_names.len());

    for sheet_name in sheet_names {
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| load_err(format!("sheet '{}': {}", sheet_name, e)))?;

        let mut rows = range
            .rows()
            .map(|row| row.iter().map(cell_to_string).collect::<Vec<_>>());
        let headers = rows.next().unwrap_or_default();
        let data: Vec<Vec<String>> = rows
            .filter(|row| row.iter().any(|v| !v.is_empty()))
            .collect();

        let key = if multi_sheet {
            format!("{}_{}", stem, sheet_name)
        } else {
            stem.clone()
        };

        debug!(
            "Sheet '{}' of {} -> '{}' ({} columns, {} rows)",
            sheet_name,
            file_name,
            key,
            headers.len(),
            data.len()
        );

        tables.push(MasterTable::new(key, headers, data));
    }

    Ok(tables)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) if dt.is_duration() => match dt.as_duration() {
            Some(d) => format_duration(d),
            None => dt.to_string(),
        },
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => ndt.format(DATETIME_FORMAT).to_string(),
            None => dt.to_string(),
        },
        Data::DateTimeIso(s) => match NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
            Ok(ndt) => ndt.format(DATETIME_FORMAT).to_string(),
            Err(_) => s.clone(),
        },
        Data::DurationIso(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `H:MM:SS`, with hours unbounded.
fn format_duration(d: Duration) -> String {
    let secs = d.num_seconds();
    let sign = if secs < 0 { "-" } else { "" };
    let secs = secs.abs();
    format!("{}{}:{:02}:{:02}", sign, secs / 3600, secs % 3600 / 60, secs % 60)
}

fn normalize_headers(headers: Vec<String>) -> Vec<String> {
    let bases: Vec<String> = headers
        .into_iter()
        .enumerate()
        .map(|(idx, header)| {
            let trimmed = header.trim();
            if trimmed.is_empty() {
                format!("Unnamed: {}", idx)
            } else {
                trimmed.to_string()
            }
        })
        .collect();

    // Suffixed names skip anything already taken, including later literal headers.
    let mut taken: HashSet<String> = bases.iter().cloned().collect();
    let mut next_suffix: HashMap<String, usize> = HashMap::new();
    let mut used: HashSet<String> = HashSet::new();

    bases
        .into_iter()
        .map(|base| {
            if used.insert(base.clone()) {
                return base;
            }
            let suffix = next_suffix.entry(base.clone()).or_insert(1);
            let mut name = format!("{}.{}", base, suffix);
            while taken.contains(&name) {
                *suffix += 1;
                name = format!("{}.{}", base, suffix);
            }
            *suffix += 1;
            taken.insert(name.clone());
            used.insert(name.clone());
            name
        })
        .collect()
}
