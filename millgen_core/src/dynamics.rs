//! Deadtime plus two-lag response filter.
//!
//! The bank keeps one slot per filtered dataset column: the last delayed raw
//! value, the last filtered output and the output before that. Slots are
//! advanced strictly in row order; the first filtered row (`dyn_row + 1`)
//! seeds from dataset history instead of the bank.

use std::collections::HashMap;

use crate::dataset::{Dataset, Origin};
use crate::error::{GenError, Stage};
use crate::model::{Dynamics, ModelConfig};
use crate::util::{FIRST_DATA_ROW, SECS_PER_MIN, minutes_to_rows};

/// Discrete coefficient for a lag in minutes: `min(1, 0.63 / (lag·60 / base_s))`, 1 when lag <= 0.
#[inline]
pub fn lag_coefficient(lag_min: f64, base_period_s: u32) -> f64 {
    if lag_min.is_nan() || lag_min <= 0.0 {
        return 1.0;
    }
    (0.63 / (lag_min * SECS_PER_MIN / f64::from(base_period_s))).min(1.0)
}

/// Two first-order stages in series.
///
/// `s1`/`s2` are the last two outputs; the stage-1 state is recovered from them.
#[inline]
pub fn second_order(new: f64, s1: f64, s2: f64, f1: f64, f2: f64) -> f64 {
    let first_prior = (s1 - s2 * (1.0 - f2)) / f2;
    let first_current = new * f1 + first_prior * (1.0 - f1);
    first_current * f2 + s1 * (1.0 - f2)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    pub deadtime_rows: usize,
    pub f1: f64,
    pub f2: f64,
}

impl FilterParams {
    pub fn new(d: &Dynamics, base_period_s: u32) -> Self {
        Self {
            deadtime_rows: minutes_to_rows(d.deadtime_min, base_period_s),
            f1: lag_coefficient(d.lag1_min, base_period_s),
            f2: lag_coefficient(d.lag2_min, base_period_s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSlot {
    pub delayed: f64,
    pub output: f64,
    pub previous: f64,
}

#[derive(Debug)]
pub struct FilterBank {
    dyn_row: usize,
    stage: Stage,
    slots: HashMap<usize, FilterSlot>,
}

impl FilterBank {
    pub fn new(dyn_row: usize, stage: Stage) -> Self {
        Self {
            dyn_row,
            stage,
            slots: HashMap::new(),
        }
    }

    /// Advance the filter for `col` to `row` and return the filtered value.
    ///
    /// `col` must be an input or state column. History rows before the first
    /// data row read row 3.
    pub fn apply(
        &mut self,
        ds: &Dataset,
        model: &ModelConfig,
        row: usize,
        col: usize,
    ) -> Result<f64, GenError> {
        let layout = ds.layout();
        let dynamics = match layout.info(col).map(|c| c.origin) {
            Some(Origin::Input(i)) => model.inputs.at(i).map(|v| v.dynamics),
            Some(Origin::State(i)) => model.state.at(i).map(|v| v.dynamics),
            _ => None,
        }
        .ok_or_else(|| {
            GenError::Config(format!(
                "column {col} ('{}') has no dynamics; only input and state columns can be filtered",
                layout.name(col)
            ))
        })?;
        let fp = FilterParams::new(&dynamics, model.process.base_period_s);

        let history = |back: usize| row.saturating_sub(back).max(FIRST_DATA_ROW);
        let delayed = ds.value(self.stage, history(fp.deadtime_rows), col)?;
        let (s1, s2) = match self.slots.get(&col) {
            Some(slot) if row != self.dyn_row + 1 => (slot.output, slot.previous),
            _ => (
                ds.value(self.stage, history(fp.deadtime_rows + 1), col)?,
                ds.value(self.stage, history(fp.deadtime_rows + 2), col)?,
            ),
        };

        let output = if fp.f2 <= 0.0 {
            delayed * fp.f1 + s1 * (1.0 - fp.f1)
        } else {
            second_order(delayed, s1, s2, fp.f1, fp.f2)
        };
        self.slots.insert(
            col,
            FilterSlot {
                delayed,
                output,
                previous: s1,
            },
        );
        Ok(output)
    }

    /// Last filtered output for `col`, if it has been advanced.
    pub fn output(&self, col: usize) -> Option<f64> {
        self.slots.get(&col).map(|s| s.output)
    }

    pub fn slot(&self, col: usize) -> Option<&FilterSlot> {
        self.slots.get(&col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ColumnLayout;
    use crate::mocks::tiny_model;
    use proptest::prelude::*;

    fn ramp(model: &ModelConfig, rows: usize) -> Dataset {
        let mut ds = Dataset::new(ColumnLayout::from_model(model).unwrap(), rows);
        for row in 3..=rows {
            ds.set(row, 2, Some((row * row) as f64));
        }
        ds
    }

    #[test]
    fn coefficients_clamp_to_one() {
        assert_eq!(lag_coefficient(0.0, 5), 1.0);
        assert_eq!(lag_coefficient(-1.0, 5), 1.0);
        assert_eq!(lag_coefficient(0.01, 5), 1.0);
        assert!((lag_coefficient(1.0, 6) - 0.063).abs() < 1e-12);
    }

    #[test]
    fn zero_lags_pass_the_delayed_value_through() {
        let mut model = tiny_model();
        model.process.base_period_s = 60;
        let a = model.inputs.position("MV_A").unwrap();
        let mut inputs: Vec<_> = model.inputs.iter().cloned().collect();
        inputs[a].dynamics = Dynamics {
            deadtime_min: 2.0,
            lag1_min: 0.0,
            lag2_min: 0.0,
        };
        model.inputs = crate::model::VarTable::new("input", inputs).unwrap();

        let ds = ramp(&model, 20);
        let dyn_row = 6;
        let mut bank = FilterBank::new(dyn_row, Stage::Gain);
        for row in dyn_row + 1..=20 {
            let v = bank.apply(&ds, &model, row, 2).unwrap();
            assert_eq!(v, ds.get(row - 2, 2).unwrap(), "row {row}");
        }
    }

    #[test]
    fn first_order_settles_on_a_step() {
        let mut model = tiny_model();
        model.process.base_period_s = 60;
        let mut inputs: Vec<_> = model.inputs.iter().cloned().collect();
        inputs[0].dynamics.lag1_min = 2.0;
        model.inputs = crate::model::VarTable::new("input", inputs).unwrap();

        let mut ds = Dataset::new(ColumnLayout::from_model(&model).unwrap(), 400);
        for row in 3..=400 {
            ds.set(row, 2, Some(if row < 10 { 0.0 } else { 1.0 }));
        }
        let mut bank = FilterBank::new(5, Stage::Quality);
        let mut last = 0.0;
        for row in 6..=400 {
            let v = bank.apply(&ds, &model, row, 2).unwrap();
            assert!(v >= last - 1e-12 && v <= 1.0 + 1e-12);
            last = v;
        }
        assert!((last - 1.0).abs() < 1e-6);
        assert_eq!(bank.slot(2).map(|s| s.delayed), Some(1.0));
    }

    #[test]
    fn blank_history_is_reported() {
        let model = tiny_model();
        let ds = Dataset::new(ColumnLayout::from_model(&model).unwrap(), 10);
        let mut bank = FilterBank::new(4, Stage::Quality);
        let err = bank.apply(&ds, &model, 5, 2).unwrap_err();
        assert!(matches!(err, GenError::MissingValue { stage: Stage::Quality, .. }));
    }

    proptest! {
        #[test]
        fn second_order_fixed_point(x in -1e3f64..1e3, f1 in 0.01f64..1.0, f2 in 0.01f64..1.0) {
            let y = second_order(x, x, x, f1, f2);
            prop_assert!((y - x).abs() <= 1e-9 * x.abs().max(1.0));
        }
    }
}
