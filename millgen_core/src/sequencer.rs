//! Input move sequencer: the staged input trajectories.
//!
//! Every phase is built from held blocks of `settle_rows` rows. In order:
//! steady state, uncoupled moves, re-settle, isolated moves, re-settle,
//! validation moves. The row cursor starts at row 3 and only moves forward.

use millgen_traits::NoiseSource;
use tracing::debug;

use crate::config::ProcessParams;
use crate::dataset::Dataset;
use crate::error::{GenError, Stage};
use crate::model::{Dynamics, InputVar, ModelConfig};
use crate::noise::{perturb, sine};
use crate::util::{FIRST_DATA_ROW, SECS_PER_MIN};

/// Inputs the quality calculator always reads.
pub const QUALITY_INPUTS: [&str; 4] = [
    "MV_ThinStockFlow",
    "MV_ThinStockConsistency",
    "MV_PressLoad",
    "MV_SteamPressure",
];

/// Row bookkeeping derived from the process parameters alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowPlan {
    /// Settle time plus the largest input deadtime and lags, whole seconds.
    pub max_settle_s: u64,
    pub input_settle_s: u64,
    /// Rows per held block.
    pub settle_rows: usize,
    /// Last row evaluated from raw history instead of filter state.
    pub dyn_row: usize,
    pub steady_rows: usize,
    pub uncoupled_rows: usize,
    pub resettle_rows: usize,
    pub isolated_rows: usize,
    pub validation_rows: usize,
    pub final_row: usize,
}

impl RowPlan {
    /// `max_dynamics` holds the per-field maxima over all inputs, in minutes.
    pub fn from_params(p: &ProcessParams, n_inputs: usize, max_dynamics: Dynamics) -> Self {
        let whole_secs = |minutes: f64| -> u64 {
            let s = (minutes * SECS_PER_MIN).max(0.0);
            if s.is_finite() { s as u64 } else { 0 }
        };
        let base = u64::from(p.base_period_s.max(1));
        let max_settle_s = u64::from(p.settle_s)
            + whole_secs(max_dynamics.deadtime_min)
            + whole_secs(max_dynamics.lag1_min)
            + whole_secs(max_dynamics.lag2_min);
        let input_settle_s = max_settle_s.max(u64::from(p.lab_period_s));
        let settle_rows = (input_settle_s / base) as usize;
        let dyn_row = (max_settle_s / base) as usize + FIRST_DATA_ROW;

        let u = p.uncoupled_moves as usize;
        let i = p.isolated_moves as usize;
        let c = p.coupled_moves as usize;
        let steady_rows = settle_rows;
        let uncoupled_rows = (u + 1) * n_inputs * settle_rows;
        let resettle_rows = settle_rows;
        let isolated_rows = n_inputs * n_inputs * (i + 1) * settle_rows;
        let validation_rows = c * settle_rows;
        let final_row = FIRST_DATA_ROW - 1
            + steady_rows
            + uncoupled_rows
            + resettle_rows
            + isolated_rows
            + resettle_rows
            + validation_rows;

        Self {
            max_settle_s,
            input_settle_s,
            settle_rows,
            dyn_row,
            steady_rows,
            uncoupled_rows,
            resettle_rows,
            isolated_rows,
            validation_rows,
            final_row,
        }
    }

    pub fn from_model(model: &ModelConfig) -> Self {
        let max_dynamics = model.inputs.iter().fold(Dynamics::default(), |acc, v| Dynamics {
            deadtime_min: acc.deadtime_min.max(v.dynamics.deadtime_min),
            lag1_min: acc.lag1_min.max(v.dynamics.lag1_min),
            lag2_min: acc.lag2_min.max(v.dynamics.lag2_min),
        });
        Self::from_params(&model.process, model.inputs.len(), max_dynamics)
    }
}

/// Smoothing coefficient for move targets: `min(1, 0.63 / (lag_s / base_s))`, 1 when lag <= 0.
pub fn move_coefficient(lag_s: f64, base_period_s: u32) -> f64 {
    if lag_s.is_nan() || lag_s <= 0.0 {
        return 1.0;
    }
    (0.63 / (lag_s / f64::from(base_period_s))).min(1.0)
}

fn step_size(v: &InputVar, moves: u32) -> f64 {
    if moves == 0 {
        v.max - v.min
    } else {
        (v.max - v.min) / f64::from(moves)
    }
}

struct Cursor<'a> {
    ds: &'a mut Dataset,
    model: &'a ModelConfig,
    rng: &'a mut dyn NoiseSource,
    settle_rows: usize,
    // next row to write
    row: usize,
}

impl Cursor<'_> {
    fn disturbance(&mut self, v: &InputVar, row: usize) -> f64 {
        perturb(self.rng, v.noise)
            + sine(v.sine_period_s, v.sine_amplitude, row, self.model.process.base_period_s)
    }

    /// One block holding `value(i)` plus noise and disturbance.
    fn hold(&mut self, value: impl Fn(usize, &InputVar) -> f64) {
        let model = self.model;
        for _ in 0..self.settle_rows {
            let row = self.row;
            for (i, v) in model.inputs.iter().enumerate() {
                let x = value(i, v) + self.disturbance(v, row);
                let col = self.ds.layout().input_col(i);
                self.ds.set(row, col, Some(x));
            }
            self.row += 1;
        }
    }

    /// One block smoothing every input towards `target(i)`, clamped before noise.
    fn approach(&mut self, target: impl Fn(usize, &InputVar) -> f64) -> Result<(), GenError> {
        let model = self.model;
        let base = model.process.base_period_s;
        for _ in 0..self.settle_rows {
            let row = self.row;
            for (i, v) in model.inputs.iter().enumerate() {
                let col = self.ds.layout().input_col(i);
                let prior = self.ds.value(Stage::Sequencer, row - 1, col)?;
                let f = move_coefficient(v.move_lag_s, base);
                let smoothed = (prior * (1.0 - f) + target(i, v) * f).clamp(v.min, v.max);
                let x = smoothed + self.disturbance(v, row);
                self.ds.set(row, col, Some(x));
            }
            self.row += 1;
        }
        Ok(())
    }
}

/// Fill every input column for rows `3..=plan.final_row`.
pub fn generate_inputs(
    ds: &mut Dataset,
    model: &ModelConfig,
    plan: &RowPlan,
    rng: &mut dyn NoiseSource,
) -> Result<(), GenError> {
    let p = &model.process;
    let n = model.inputs.len();
    let mut cur = Cursor {
        ds,
        model,
        rng,
        settle_rows: plan.settle_rows,
        row: FIRST_DATA_ROW,
    };

    // Steady state
    cur.hold(|_, v| v.mid());
    debug!(rows = plan.steady_rows, next_row = cur.row, "steady state done");

    // Uncoupled moves: inputs step in move order and keep their new level
    let mut last_target: Vec<f64> = model.inputs.iter().map(|v| v.min).collect();
    if plan.settle_rows > 0 {
        for j in 0..=p.uncoupled_moves {
            for id in 1..=n {
                let levels: Vec<f64> = model
                    .inputs
                    .iter()
                    .enumerate()
                    .map(|(i, v)| {
                        if v.move_order <= id {
                            v.min + step_size(v, p.uncoupled_moves) * f64::from(j)
                        } else {
                            last_target[i]
                        }
                    })
                    .collect();
                cur.approach(|i, _| levels[i])?;
            }
            for (i, v) in model.inputs.iter().enumerate() {
                last_target[i] = v.min + step_size(v, p.uncoupled_moves) * f64::from(j);
            }
        }
    }
    debug!(rows = plan.uncoupled_rows, next_row = cur.row, "uncoupled moves done");

    cur.hold(|_, v| v.mid());

    // Isolated moves: one input stepped, the rest pinned at mid
    if plan.settle_rows > 0 {
        for m in 0..n {
            for _other in 0..n {
                for k in 0..=p.isolated_moves {
                    cur.approach(|i, v| {
                        if i == m {
                            v.min + step_size(v, p.isolated_moves) * f64::from(k)
                        } else {
                            v.mid()
                        }
                    })?;
                }
            }
        }
    }
    debug!(rows = plan.isolated_rows, next_row = cur.row, "isolated moves done");

    cur.hold(|_, v| v.mid());

    // Validation moves: configured value, or the previous block's last stored value
    for c in 0..p.coupled_moves as usize {
        if plan.settle_rows == 0 {
            break;
        }
        let last_row = cur.row - 1;
        let mut held = Vec::with_capacity(n);
        for (i, v) in model.inputs.iter().enumerate() {
            let configured = v.validation.get(c).copied().flatten();
            let value = match configured {
                Some(x) => x,
                None => cur
                    .ds
                    .value(Stage::Sequencer, last_row, cur.ds.layout().input_col(i))?,
            };
            held.push(value);
        }
        cur.hold(|i, _| held[i]);
    }

    debug_assert_eq!(cur.row - 1, plan.final_row);
    Ok(())
}

/// Lowest input column needed at full resolution after the state model.
///
/// That is the smallest column among inputs referenced by a gain spec and
/// the four quality-calculator inputs.
pub fn first_val(ds: &Dataset, model: &ModelConfig) -> Result<usize, GenError> {
    let layout = ds.layout();
    let mut cols = Vec::new();
    for spec in &model.gains {
        for term in &spec.terms {
            if let Some(i) = model.inputs.position(&term.variable) {
                cols.push(layout.input_col(i));
            }
        }
    }
    for name in QUALITY_INPUTS {
        model.inputs.require(name, "quality calculator")?;
        cols.push(layout.require(name, "quality calculator")?);
    }
    cols.sort_unstable();
    cols.dedup();
    cols.first().copied().ok_or_else(|| {
        GenError::Config(
            "no input column is referenced by a gain spec or the quality calculator".into(),
        )
    })
}
