use std::fs;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::Workbook;
use tracing::{info, warn};

use crate::error::PersistenceError;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Number(f64),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Cell {
        Cell::Text(s.into())
    }

    pub fn opt_int(v: Option<i64>) -> Cell {
        v.map(Cell::Int).unwrap_or(Cell::Empty)
    }

    pub fn opt_number(v: Option<f64>) -> Cell {
        match v {
            Some(n) if n.is_finite() => Cell::Number(n),
            _ => Cell::Empty,
        }
    }

    /// Text form as written to CSV.
    pub fn render(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Int(i) => i.to_string(),
            Cell::Number(n) => n.to_string(),
        }
    }

    pub fn as_text(&self) -> String {
        self.render().trim().to_string()
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Empty => None,
            Cell::Int(i) => Some(*i as f64),
            Cell::Number(n) => n.is_finite().then_some(*n),
            Cell::Text(s) => s.trim().replace(',', "").parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    /// Integers may come back from spreadsheets as floats ("12.0").
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(i) => Some(*i),
            other => other.as_f64().map(|n| n.round() as i64),
        }
    }
}

/// A header row plus data rows, the unit every output file is written as.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new<S: AsRef<str>>(headers: &[S]) -> Self {
        Table {
            headers: headers.iter().map(|h| h.as_ref().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }
}

/// How a table ended up on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Written {
    pub primary: PathBuf,
    pub csv_fallback: bool,
}

/// Write `<stem>.xlsx`, falling back to `<stem>.csv` if the spreadsheet write fails.
pub fn write_table(table: &Table, stem: &Path, csv_copy: bool) -> Result<Written, PersistenceError> {
    if let Some(dir) = stem.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|source| PersistenceError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let xlsx = stem.with_extension("xlsx");
    let csv_path = stem.with_extension("csv");
    match write_xlsx(table, &xlsx) {
        Ok(()) => {
            info!("Saved {} rows to {:?}", table.len(), xlsx);
            if csv_copy {
                if let Err(e) = write_csv(table, &csv_path) {
                    warn!("{}", e);
                }
            }
            Ok(Written {
                primary: xlsx,
                csv_fallback: false,
            })
        }
        Err(e) => {
            warn!("{}; saving as CSV instead", e);
            write_csv(table, &csv_path)?;
            info!("Saved {} rows to {:?}", table.len(), csv_path);
            Ok(Written {
                primary: csv_path,
                csv_fallback: true,
            })
        }
    }
}

/// Read `<stem>.xlsx` if present and readable, else `<stem>.csv`.
pub fn read_table(stem: &Path) -> Result<(Table, PathBuf), PersistenceError> {
    let xlsx = stem.with_extension("xlsx");
    let csv_path = stem.with_extension("csv");

    if xlsx.exists() {
        match read_xlsx(&xlsx) {
            Ok(table) => return Ok((table, xlsx)),
            Err(e) if csv_path.exists() => warn!("{}; using CSV copy", e),
            Err(e) => return Err(e),
        }
    }
    if csv_path.exists() {
        return read_csv(&csv_path).map(|t| (t, csv_path));
    }
    Err(PersistenceError::NotFound {
        stem: stem.to_path_buf(),
    })
}

/// Accepts a bare stem or a path with a table extension.
pub fn table_stem(path: &Path) -> PathBuf {
    match path.extension().and_then(|e| e.to_str()) {
        Some("xlsx" | "xls" | "csv") => path.with_extension(""),
        _ => path.to_path_buf(),
    }
}

fn write_xlsx(table: &Table, path: &Path) -> Result<(), PersistenceError> {
    let err = |source| PersistenceError::Xlsx {
        path: path.to_path_buf(),
        source,
    };
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (c, header) in table.headers.iter().enumerate() {
        sheet.write_string(0, c as u16, header).map_err(err)?;
    }
    for (r, row) in table.rows.iter().enumerate() {
        let r = (r + 1) as u32;
        for (c, cell) in row.iter().enumerate() {
            let c = c as u16;
            match cell {
                Cell::Empty => {}
                Cell::Text(s) => {
                    sheet.write_string(r, c, s).map_err(err)?;
                }
                Cell::Int(i) => {
                    sheet.write_number(r, c, *i as f64).map_err(err)?;
                }
                Cell::Number(n) => {
                    sheet.write_number(r, c, *n).map_err(err)?;
                }
            }
        }
    }
    workbook.save(path).map_err(err)
}

fn write_csv(table: &Table, path: &Path) -> Result<(), PersistenceError> {
    let err = |source| PersistenceError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(err)?;
    writer.write_record(&table.headers).map_err(err)?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(Cell::render))
            .map_err(err)?;
    }
    writer
        .flush()
        .map_err(|e| err(csv::Error::from(e)))
}

fn read_csv(path: &Path) -> Result<Table, PersistenceError> {
    let err = |source| PersistenceError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(err)?;
    let headers: Vec<String> = reader.headers().map_err(err)?.iter().map(str::to_string).collect();
    let mut table = Table::new(&headers);
    for record in reader.records() {
        let record = record.map_err(err)?;
        table.push(
            record
                .iter()
                .map(|v| if v.is_empty() { Cell::Empty } else { Cell::text(v) })
                .collect(),
        );
    }
    Ok(table)
}

fn read_xlsx(path: &Path) -> Result<Table, PersistenceError> {
    let err = |message: String| PersistenceError::XlsxRead {
        path: path.to_path_buf(),
        message,
    };
    let mut workbook = open_workbook_auto(path).map_err(|e| err(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| err("workbook has no sheets".into()))?
        .map_err(|e| err(e.to_string()))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .unwrap_or_default();
    let mut table = Table::new(&headers);
    for row in rows {
        table.push(row.iter().map(data_cell).collect());
    }
    Ok(table)
}

fn data_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) if s.is_empty() => Cell::Empty,
        Data::String(s) => Cell::text(s.as_str()),
        other => Cell::text(other.to_string()),
    }
}
