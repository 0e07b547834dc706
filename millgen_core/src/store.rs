//! CSV-backed table storage and mapping of storage failures.
//!
//! Tables are plain comma-separated files `<dir>/<name>.csv`, one row per
//! line, with blank cells written as empty fields.

use std::fs;
use std::path::{Path, PathBuf};

use millgen_traits::{BoxError, TableStore};

use crate::error::GenError;

// ── Error mapping ────────────────────────────────────────────────────────────

/// Map a trait-boundary storage error to a typed `GenError`.
pub fn map_store_error(op: &str, name: &str, e: &(dyn std::error::Error + 'static)) -> GenError {
    if let Some(io) = e.downcast_ref::<std::io::Error>() {
        return GenError::Storage(format!("{op} '{name}': {io} ({:?})", io.kind()));
    }
    GenError::Storage(format!("{op} '{name}': {e}"))
}

// ── CSV directory store ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CsvDirStore {
    dir: PathBuf,
}

impl CsvDirStore {
    /// Store rooted at `dir`; the directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.csv"))
    }
}

impl TableStore for CsvDirStore {
    fn write(&mut self, name: &str, rows: &[Vec<String>]) -> Result<(), BoxError> {
        fs::create_dir_all(&self.dir)?;
        let mut w = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(self.path_for(name))?;
        for row in rows {
            w.write_record(row)?;
        }
        w.flush()?;
        Ok(())
    }

    fn read(&mut self, name: &str, max_cols: usize) -> Result<Vec<Vec<String>>, BoxError> {
        let mut r = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(self.path_for(name))?;
        let mut rows = Vec::new();
        for rec in r.records() {
            let rec = rec?;
            rows.push(rec.iter().take(max_cols).map(str::to_string).collect());
        }
        Ok(rows)
    }

    fn remove(&mut self, name: &str) -> Result<(), BoxError> {
        fs::remove_file(self.path_for(name))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(cells: &[&[&str]]) -> Vec<Vec<String>> {
        cells
            .iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn writes_reads_and_removes_tables() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = CsvDirStore::new(tmp.path().join("out"));
        let table = rows(&[&["TIME", "MV_A", "MV,B"], &["", "t/h", ""], &["", "1.5", ""]]);
        store.write("data", &table).unwrap();

        let raw = std::fs::read_to_string(store.path_for("data")).unwrap();
        assert_eq!(raw.lines().next(), Some("TIME,MV_A,\"MV,B\""));
        assert_eq!(raw.lines().nth(2), Some(",1.5,"));

        let back = store.read("data", 2).unwrap();
        assert_eq!(back, rows(&[&["TIME", "MV_A"], &["", "t/h"], &["", "1.5"]]));

        store.remove("data").unwrap();
        assert!(!store.path_for("data").exists());
    }

    #[test]
    fn missing_table_maps_to_storage_error() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = CsvDirStore::new(tmp.path());
        let err = store.read("absent", 3).unwrap_err();
        let mapped = map_store_error("read", "absent", err.as_ref());
        match mapped {
            GenError::Storage(msg) => assert!(msg.contains("read 'absent'"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
