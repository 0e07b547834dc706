//! Spreadsheet-style string grids loaded from header-less CSV.

use std::io::Read;
use std::path::Path;

/// A 1-based grid of string cells.
///
/// Rows may have different lengths; cells past the end of a row read as blank.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Sheet label used in error messages (file stem when loaded from disk).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Trimmed cell text at (row, col), both 1-based; `None` when blank or absent.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        if row == 0 || col == 0 {
            return None;
        }
        self.rows
            .get(row - 1)
            .and_then(|r| r.get(col - 1))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Widest row, in cells.
    pub fn col_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Variable names from row 1, columns 2.. (trailing blanks dropped).
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = (2..=self.col_count())
            .map(|c| self.cell(1, c).unwrap_or(""))
            .collect();
        while names.last().is_some_and(|n| n.is_empty()) {
            names.pop();
        }
        names
    }
}

/// Parse a sheet from any CSV reader.
pub fn parse_sheet_csv<R: Read>(name: &str, reader: R) -> eyre::Result<Sheet> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut rows = Vec::new();
    for (idx, rec) in rdr.records().enumerate() {
        match rec {
            Ok(r) => rows.push(r.iter().map(str::to_string).collect()),
            Err(e) => eyre::bail!("invalid CSV row {} in sheet '{}': {}", idx + 1, name, e),
        }
    }
    Ok(Sheet::from_rows(name, rows))
}

pub fn load_sheet_csv(path: &Path) -> eyre::Result<Sheet> {
    let file =
        std::fs::File::open(path).map_err(|e| eyre::eyre!("open sheet CSV {:?}: {}", path, e))?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    parse_sheet_csv(&name, file)
}
