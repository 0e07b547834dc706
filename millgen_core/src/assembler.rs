//! Final assembly: spill/reload of early input columns, cadence suppression,
//! timestamps and the artifact write.

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta};
use millgen_traits::{Clock, TableStore};
use tracing::{debug, info};

use crate::config::{AssemblyParams, ProcessParams};
use crate::dataset::Dataset;
use crate::error::GenError;
use crate::store::map_store_error;
use crate::util::FIRST_DATA_ROW;

/// Artifact name format: local time with milliseconds.
pub const ARTIFACT_FORMAT: &str = "%m-%d-%Y-%H-%M-%S-%3f";

/// Reference row of every reporting cadence.
const CADENCE_ORIGIN: usize = FIRST_DATA_ROW + 1;

/// Reporting cadence in rows for a column name.
pub fn cadence_for(name: &str, qcs_rows: usize, pulpeye_rows: usize) -> usize {
    if name.contains("QCS") {
        qcs_rows
    } else if name.contains("PulpEye") {
        pulpeye_rows
    } else {
        1
    }
}

/// Whether `row` carries a sample: `(row - 4) % cadence == 0`.
///
/// Row 3 precedes the origin, so it is off cadence for any cadence above 1.
pub fn on_cadence(row: usize, cadence: usize) -> bool {
    cadence <= 1 || (row >= CADENCE_ORIGIN && (row - CADENCE_ORIGIN) % cadence == 0)
}

/// Blank every data row that is off cadence.
pub fn suppress_off_cadence(ds: &mut Dataset, col: usize, cadence: usize) {
    if cadence <= 1 || !ds.is_resident(col) {
        return;
    }
    for row in FIRST_DATA_ROW..=ds.final_row() {
        if !on_cadence(row, cadence) {
            ds.set(row, col, None);
        }
    }
}

/// Apply each column's cadence to columns `from..=to`.
pub fn suppress_range(
    ds: &mut Dataset,
    from: usize,
    to: usize,
    qcs_rows: usize,
    pulpeye_rows: usize,
) {
    for col in from..=to {
        let cadence = cadence_for(ds.layout().name(col), qcs_rows, pulpeye_rows);
        suppress_off_cadence(ds, col, cadence);
    }
}

/// Write columns `1..first_val` to the spill table.
pub fn spill(
    ds: &Dataset,
    store: &mut dyn TableStore,
    name: &str,
    first_val: usize,
) -> Result<(), GenError> {
    let rows = ds.to_rows(first_val.saturating_sub(1));
    store
        .write(name, &rows)
        .map_err(|e| map_store_error("write spill", name, e.as_ref()))?;
    debug!(table = name, cols = first_val.saturating_sub(1), rows = rows.len(), "spilled");
    Ok(())
}

/// Evict value columns `2..first_val` from memory.
pub fn evict_below(ds: &mut Dataset, first_val: usize) {
    for col in 2..first_val {
        ds.evict(col);
    }
}

/// Read columns `1..first_val` back from the spill table, then delete it.
pub fn reload(
    ds: &mut Dataset,
    store: &mut dyn TableStore,
    name: &str,
    first_val: usize,
) -> Result<(), GenError> {
    let max_cols = first_val.saturating_sub(1);
    let rows = store
        .read(name, max_cols)
        .map_err(|e| map_store_error("read spill", name, e.as_ref()))?;
    if rows.len() < ds.final_row() {
        return Err(GenError::Storage(format!(
            "spill '{name}' has {} rows, expected {}",
            rows.len(),
            ds.final_row()
        )));
    }
    ds.load_rows(name, &rows, max_cols)?;
    store
        .remove(name)
        .map_err(|e| map_store_error("remove spill", name, e.as_ref()))?;
    debug!(table = name, cols = max_cols, "reloaded and removed spill");
    Ok(())
}

/// Row 3 gets `start`; each later row adds one base period.
pub fn stamp_times(ds: &mut Dataset, start: NaiveDateTime, base_period_s: u32) {
    let step = TimeDelta::seconds(i64::from(base_period_s));
    let mut t = start;
    for row in FIRST_DATA_ROW..=ds.final_row() {
        ds.set_time(row, t);
        t += step;
    }
}

/// Millisecond-resolution artifact name from the clock's local time.
pub fn artifact_name(clock: &dyn Clock) -> String {
    let now: DateTime<Local> = clock.now().into();
    now.format(ARTIFACT_FORMAT).to_string()
}

/// Everything after the gain stage: cadence on resident columns, reload,
/// cadence on reloaded columns, timestamps, final write. Returns the artifact name.
pub fn finish(
    ds: &mut Dataset,
    store: &mut dyn TableStore,
    clock: &dyn Clock,
    first_val: usize,
    assembly: &AssemblyParams,
    process: &ProcessParams,
) -> Result<String, GenError> {
    let (qcs_rows, pulpeye_rows) = (process.qcs_rows(), process.pulpeye_rows());
    let last_state = ds.layout().last_state_col();
    suppress_range(ds, first_val, last_state, qcs_rows, pulpeye_rows);

    reload(ds, store, &assembly.spill_name, first_val)?;
    suppress_range(ds, 2, first_val.saturating_sub(1), qcs_rows, pulpeye_rows);

    stamp_times(ds, assembly.start, process.base_period_s);

    let name = artifact_name(clock);
    let rows = ds.to_rows(ds.layout().width());
    store
        .write(&name, &rows)
        .map_err(|e| map_store_error("write dataset", &name, e.as_ref()))?;
    info!(artifact = %name, rows = rows.len(), cols = ds.layout().width(), "dataset written");
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversions::parse_start;
    use crate::dataset::ColumnLayout;
    use crate::mocks::{MemoryStore, tiny_model};
    use rstest::rstest;

    fn dataset(rows: usize) -> Dataset {
        let model = tiny_model();
        let mut ds = Dataset::new(ColumnLayout::from_model(&model).unwrap(), rows);
        for row in 3..=rows {
            for col in 2..=4 {
                ds.set(row, col, Some(row as f64));
            }
        }
        ds
    }

    #[rstest]
    #[case("QCS_Caliper", 6)]
    #[case("PulpEye_BlendCrill", 12)]
    #[case("MV_PressLoad", 1)]
    fn cadence_by_name(#[case] name: &str, #[case] expected: usize) {
        assert_eq!(cadence_for(name, 6, 12), expected);
    }

    #[test]
    fn qcs_cadence_of_three_keeps_one_row_in_three() {
        let mut ds = dataset(30);
        suppress_off_cadence(&mut ds, 3, 3);
        assert_eq!(ds.get(3, 3), None);
        for start in (4..=28).step_by(3) {
            assert_eq!(ds.get(start, 3), Some(start as f64), "row {start}");
            assert!(ds.get(start + 1, 3).is_none());
            assert!(ds.get(start + 2, 3).is_none());
        }
    }

    #[test]
    fn no_two_adjacent_rows_both_report() {
        let mut ds = dataset(40);
        suppress_off_cadence(&mut ds, 3, 2);
        for row in 3..40 {
            assert!(
                ds.get(row, 3).is_none() || ds.get(row + 1, 3).is_none(),
                "rows {row} and {} both carry a sample",
                row + 1
            );
        }
    }

    #[rstest]
    #[case(3, 3, false)]
    #[case(4, 3, true)]
    #[case(7, 3, true)]
    #[case(5, 3, false)]
    #[case(3, 1, true)]
    fn cadence_origin_is_row_four(#[case] row: usize, #[case] cadence: usize, #[case] kept: bool) {
        assert_eq!(on_cadence(row, cadence), kept);
    }

    #[test]
    fn spill_then_reload_restores_evicted_columns() {
        let mut ds = dataset(8);
        let mut store = MemoryStore::new();
        spill(&ds, &mut store, "data", 3).unwrap();
        assert_eq!(store.table("data").map(|t| t[0].len()), Some(2));

        evict_below(&mut ds, 3);
        assert!(!ds.is_resident(2));
        reload(&mut ds, &mut store, "data", 3).unwrap();
        assert_eq!(ds.get(8, 2), Some(8.0));
        assert!(store.table("data").is_none());
    }

    #[test]
    fn reload_without_spill_is_a_storage_error() {
        let mut ds = dataset(8);
        let mut store = MemoryStore::new();
        let err = reload(&mut ds, &mut store, "data", 3).unwrap_err();
        assert!(matches!(err, GenError::Storage(_)));
    }

    #[test]
    fn timestamps_step_by_base_period() {
        let mut ds = dataset(5);
        stamp_times(&mut ds, parse_start("12/31/23 23:59:55").unwrap(), 5);
        let rows = ds.to_rows(1);
        assert_eq!(rows[2][0], "12/31/23 23:59:55");
        assert_eq!(rows[3][0], "01/01/24 00:00:00");
        assert_eq!(rows[4][0], "01/01/24 00:00:05");
    }

    #[test]
    fn artifact_names_have_millisecond_resolution() {
        let clock = millgen_traits::FixedClock::at_unix_ms(1_700_000_000_123);
        let name = artifact_name(&clock);
        assert!(name.ends_with("-123"), "{name}");
        assert_eq!(name.split('-').count(), 7);
    }
}
