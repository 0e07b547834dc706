//! The in-memory output table.
//!
//! Rows use spreadsheet numbering: rows 1 and 2 are the header (names,
//! units), data runs from row 3 to `final_row`. Column 1 is TIME, followed by
//! inputs, state and lab outputs in model order. Value columns may be
//! evicted and later restored from the spill table.

use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::conversions::TIME_FORMAT;
use crate::error::{GenError, Stage};
use crate::model::ModelConfig;
use crate::util::FIRST_DATA_ROW;

/// Which model table a dataset column comes from, with its index there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Input(usize),
    State(usize),
    Lab(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub units: String,
    pub origin: Origin,
}

/// Fixed column order with a name→column map.
#[derive(Debug, Clone)]
pub struct ColumnLayout {
    // cols[0] is dataset column 2
    cols: Vec<ColumnInfo>,
    index: HashMap<String, usize>,
    n_inputs: usize,
    n_state: usize,
}

impl ColumnLayout {
    pub fn from_model(model: &ModelConfig) -> Result<Self, GenError> {
        let width = model.inputs.len() + model.state.len() + model.labs.len();
        let mut cols = Vec::with_capacity(width);
        cols.extend(model.inputs.iter().enumerate().map(|(i, v)| ColumnInfo {
            name: v.name.clone(),
            units: v.units.clone(),
            origin: Origin::Input(i),
        }));
        cols.extend(model.state.iter().enumerate().map(|(i, v)| ColumnInfo {
            name: v.name.clone(),
            units: v.units.clone(),
            origin: Origin::State(i),
        }));
        cols.extend(model.labs.iter().enumerate().map(|(i, v)| ColumnInfo {
            name: v.name.clone(),
            units: v.units.clone(),
            origin: Origin::Lab(i),
        }));

        let mut index = HashMap::with_capacity(cols.len());
        for (i, c) in cols.iter().enumerate() {
            if index.insert(c.name.clone(), i + 2).is_some() {
                return Err(GenError::Config(format!(
                    "column name '{}' is used more than once in the dataset",
                    c.name
                )));
            }
        }
        Ok(Self {
            cols,
            index,
            n_inputs: model.inputs.len(),
            n_state: model.state.len(),
        })
    }

    /// Number of columns including TIME.
    pub fn width(&self) -> usize {
        self.cols.len() + 1
    }

    pub fn info(&self, col: usize) -> Option<&ColumnInfo> {
        col.checked_sub(2).and_then(|i| self.cols.get(i))
    }

    /// Column name, `TIME` for column 1.
    pub fn name(&self, col: usize) -> &str {
        if col == 1 {
            return "TIME";
        }
        self.info(col).map_or("", |c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn require(&self, name: &str, context: &str) -> Result<usize, GenError> {
        self.column(name).ok_or_else(|| GenError::VariableNotFound {
            name: name.to_string(),
            table: "input or state",
            context: context.to_string(),
        })
    }

    pub fn input_col(&self, i: usize) -> usize {
        debug_assert!(i < self.n_inputs);
        i + 2
    }

    pub fn state_col(&self, i: usize) -> usize {
        debug_assert!(i < self.n_state);
        self.first_state_col() + i
    }

    pub fn lab_col(&self, i: usize) -> usize {
        self.first_lab_col() + i
    }

    pub fn first_state_col(&self) -> usize {
        self.n_inputs + 2
    }

    pub fn last_state_col(&self) -> usize {
        self.first_lab_col() - 1
    }

    pub fn first_lab_col(&self) -> usize {
        self.n_inputs + self.n_state + 2
    }
}

type Column = Vec<Option<f64>>;

#[derive(Debug, Clone)]
pub struct Dataset {
    layout: ColumnLayout,
    final_row: usize,
    times: Vec<Option<NaiveDateTime>>,
    // columns[0] is dataset column 2; `None` while evicted
    columns: Vec<Option<Column>>,
}

impl Dataset {
    /// Empty table covering data rows `3..=final_row`.
    pub fn new(layout: ColumnLayout, final_row: usize) -> Self {
        let rows = final_row.saturating_sub(FIRST_DATA_ROW - 1);
        let columns = (2..=layout.width()).map(|_| Some(vec![None; rows])).collect();
        Self {
            layout,
            final_row,
            times: vec![None; rows],
            columns,
        }
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    pub fn final_row(&self) -> usize {
        self.final_row
    }

    fn slot(&self, row: usize) -> Option<usize> {
        (FIRST_DATA_ROW..=self.final_row)
            .contains(&row)
            .then(|| row - FIRST_DATA_ROW)
    }

    fn column_mut(&mut self, col: usize) -> Option<&mut Column> {
        col.checked_sub(2)
            .and_then(|i| self.columns.get_mut(i))
            .and_then(Option::as_mut)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        let slot = self.slot(row)?;
        let column = self.columns.get(col.checked_sub(2)?)?.as_ref()?;
        column.get(slot).copied().flatten()
    }

    /// Write a cell. Writes outside the table or into an evicted column are dropped.
    pub fn set(&mut self, row: usize, col: usize, value: Option<f64>) {
        let Some(slot) = self.slot(row) else {
            debug_assert!(false, "row {row} outside 3..={}", self.final_row);
            return;
        };
        match self.column_mut(col) {
            Some(column) => column[slot] = value,
            None => debug_assert!(false, "column {col} is evicted or out of range"),
        }
    }

    /// Read a cell that must hold a value.
    pub fn value(&self, stage: Stage, row: usize, col: usize) -> Result<f64, GenError> {
        self.get(row, col).ok_or_else(|| GenError::MissingValue {
            stage,
            row,
            variable: self.layout.name(col).to_string(),
        })
    }

    pub fn is_resident(&self, col: usize) -> bool {
        col.checked_sub(2)
            .and_then(|i| self.columns.get(i))
            .is_some_and(Option::is_some)
    }

    /// Drop a column's values from memory.
    pub fn evict(&mut self, col: usize) {
        if let Some(c) = col.checked_sub(2).and_then(|i| self.columns.get_mut(i)) {
            *c = None;
        }
    }

    /// Re-allocate an evicted column as all blank.
    pub fn restore(&mut self, col: usize) {
        let rows = self.times.len();
        if let Some(c) = col.checked_sub(2).and_then(|i| self.columns.get_mut(i))
            && c.is_none()
        {
            *c = Some(vec![None; rows]);
        }
    }

    pub fn time(&self, row: usize) -> Option<NaiveDateTime> {
        self.slot(row).and_then(|s| self.times[s])
    }

    pub fn set_time(&mut self, row: usize, t: NaiveDateTime) {
        if let Some(s) = self.slot(row) {
            self.times[s] = Some(t);
        }
    }

    /// Render rows `1..=final_row`, columns `1..=max_col`, as CSV-ready strings.
    ///
    /// Blank and evicted cells render as empty strings.
    pub fn to_rows(&self, max_col: usize) -> Vec<Vec<String>> {
        let max_col = max_col.min(self.layout.width());
        let mut rows = Vec::with_capacity(self.final_row);
        rows.push((1..=max_col).map(|c| self.layout.name(c).to_string()).collect());
        rows.push(
            (1..=max_col)
                .map(|c| self.layout.info(c).map(|i| i.units.clone()).unwrap_or_default())
                .collect(),
        );
        for row in FIRST_DATA_ROW..=self.final_row {
            let mut cells = Vec::with_capacity(max_col);
            cells.push(
                self.time(row)
                    .map(|t| t.format(TIME_FORMAT).to_string())
                    .unwrap_or_default(),
            );
            for col in 2..=max_col {
                cells.push(self.get(row, col).map(|v| v.to_string()).unwrap_or_default());
            }
            rows.push(cells);
        }
        rows
    }

    /// Load value columns `2..=max_col` back from rows produced by `to_rows`.
    ///
    /// Header rows and the TIME column are ignored. Target columns are
    /// restored first; a non-numeric cell is a parse error against `table`.
    pub fn load_rows(
        &mut self,
        table: &str,
        rows: &[Vec<String>],
        max_col: usize,
    ) -> Result<(), GenError> {
        let max_col = max_col.min(self.layout.width());
        for col in 2..=max_col {
            self.restore(col);
        }
        for (i, cells) in rows.iter().enumerate() {
            let row = i + 1;
            if row < FIRST_DATA_ROW || row > self.final_row {
                continue;
            }
            for (j, cell) in cells.iter().enumerate().take(max_col).skip(1) {
                let col = j + 1;
                let txt = cell.trim();
                let value = if txt.is_empty() {
                    None
                } else {
                    Some(txt.parse::<f64>().map_err(|_| GenError::Parse {
                        sheet: table.to_string(),
                        row,
                        variable: self.layout.name(col).to_string(),
                        value: txt.to_string(),
                    })?)
                };
                self.set(row, col, value);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::tiny_model;

    fn dataset() -> Dataset {
        let model = tiny_model();
        Dataset::new(ColumnLayout::from_model(&model).unwrap(), 6)
    }

    #[test]
    fn layout_orders_inputs_state_labs() {
        let ds = dataset();
        let l = ds.layout();
        assert_eq!(l.name(1), "TIME");
        assert_eq!(l.column("MV_A"), Some(2));
        assert_eq!(l.first_state_col(), 3);
        assert_eq!(l.column("QCS_X"), Some(3));
        assert_eq!(l.first_lab_col(), 4);
        assert_eq!(l.info(4).map(|c| c.origin), Some(Origin::Lab(0)));
        assert!(matches!(
            l.require("nope", "test"),
            Err(GenError::VariableNotFound { .. })
        ));
    }

    #[test]
    fn missing_value_names_stage_row_and_column() {
        let ds = dataset();
        assert_eq!(
            ds.value(Stage::Gain, 4, 2),
            Err(GenError::MissingValue {
                stage: Stage::Gain,
                row: 4,
                variable: "MV_A".into()
            })
        );
    }

    #[test]
    fn evicted_columns_reload_from_rendered_rows() {
        let mut ds = dataset();
        for row in 3..=6 {
            ds.set(row, 2, Some(row as f64 * 0.5));
        }
        let rows = ds.to_rows(2);
        assert_eq!(rows[0], vec!["TIME", "MV_A"]);
        assert_eq!(rows[2], vec!["", "1.5"]);

        ds.evict(2);
        assert!(!ds.is_resident(2));
        assert_eq!(ds.get(3, 2), None);

        ds.load_rows("spill", &rows, 2).unwrap();
        assert!(ds.is_resident(2));
        assert_eq!(ds.get(6, 2), Some(3.0));
    }

    #[test]
    fn reload_rejects_non_numeric_cells() {
        let mut ds = dataset();
        let rows = vec![
            vec!["TIME".into(), "MV_A".into()],
            vec![String::new(), String::new()],
            vec![String::new(), "x".into()],
        ];
        let err = ds.load_rows("spill", &rows, 2).unwrap_err();
        assert!(matches!(err, GenError::Parse { row: 3, .. }));
    }
}
