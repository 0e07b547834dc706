//! QCS quality measurements: moisture, bone-dry weight, basis weight, caliper.

use millgen_traits::NoiseSource;
use tracing::debug;

use crate::dataset::{ColumnLayout, Dataset};
use crate::dynamics::FilterBank;
use crate::error::{GenError, Stage};
use crate::model::ModelConfig;
use crate::noise::perturb;
use crate::sequencer::QUALITY_INPUTS;
use crate::util::FIRST_DATA_ROW;

const CALIPER_SLOPE: f64 = 0.02;
const CONTEXT: &str = "quality calculator";

/// State columns written by the quality pass.
pub const QUALITY_OUTPUTS: [&str; 4] = [
    "QCS_Moisture",
    "QCS_BoneDryWeight",
    "QCS_BasisWeight",
    "QCS_Caliper",
];

/// Values the cascade reads, filtered or direct.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityInputs {
    pub thin_stock_flow: f64,
    pub consistency: f64,
    pub press_load: f64,
    pub steam_pressure: f64,
    pub machine_speed: f64,
    pub blend_freeness: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityOutputs {
    pub moisture: f64,
    pub bone_dry_weight: f64,
    pub basis_weight: f64,
    pub caliper: f64,
}

/// The retention/drainage cascade. `caliper_noise` is added to caliper only.
pub fn cascade(
    q: &QualityInputs,
    trim: f64,
    min_machine_speed: f64,
    caliper_max: f64,
    caliper_noise: f64,
) -> QualityOutputs {
    let fiber = q.thin_stock_flow * q.consistency * 8.3 / 100.0;
    let water = q.thin_stock_flow * 8.3 - fiber;
    let wire_drainage = 5.0 + 90.0 * (1.0 - 1.0 / q.blend_freeness.exp());
    let to_press = water * wire_drainage / 100.0;

    let press_drainage = 80.0 * (1.0 - 1.0 / (q.press_load / 200.0).exp());
    let to_dryers = to_press * press_drainage / 100.0;
    let moisture_in = to_dryers / fiber;
    let asymptote = 2.5 + q.machine_speed / 500.0;
    let moisture = asymptote + (moisture_in - asymptote) / (q.steam_pressure / 25.0).exp();

    let bone_dry_weight = if q.machine_speed <= min_machine_speed {
        0.0
    } else {
        fiber * 3300.0 / (q.machine_speed * trim)
    };
    let basis_weight = bone_dry_weight * (1.0 + moisture / 100.0);

    let cap_max = caliper_max * bone_dry_weight / 50.0;
    let cap_min = cap_max / 2.0;
    let press_response = ((q.press_load - 700.0) * CALIPER_SLOPE).exp();
    let caliper = cap_min + (cap_max - cap_min) / press_response + caliper_noise;

    QualityOutputs {
        moisture,
        bone_dry_weight,
        basis_weight,
        caliper,
    }
}

struct Cols {
    // the four quality inputs, then machine speed and blend freeness
    sources: [usize; 6],
    moisture: usize,
    bone_dry_weight: usize,
    basis_weight: usize,
    caliper: usize,
    caliper_max: f64,
    caliper_noise: f64,
}

impl Cols {
    fn resolve(layout: &ColumnLayout, model: &ModelConfig) -> Result<Self, GenError> {
        let mut sources = [0usize; 6];
        for (slot, name) in sources.iter_mut().zip(
            QUALITY_INPUTS
                .iter()
                .copied()
                .chain(["MV_MachineSpeed", "PulpEye_BlendFreeness"]),
        ) {
            *slot = layout.require(name, CONTEXT)?;
        }
        let caliper = model.state.require("QCS_Caliper", CONTEXT)?;
        Ok(Self {
            sources,
            moisture: layout.require(QUALITY_OUTPUTS[0], CONTEXT)?,
            bone_dry_weight: layout.require(QUALITY_OUTPUTS[1], CONTEXT)?,
            basis_weight: layout.require(QUALITY_OUTPUTS[2], CONTEXT)?,
            caliper: layout.require(QUALITY_OUTPUTS[3], CONTEXT)?,
            caliper_max: caliper.max,
            caliper_noise: caliper.noise,
        })
    }
}

/// Resolve every column the quality pass reads or writes.
pub fn check_columns(layout: &ColumnLayout, model: &ModelConfig) -> Result<(), GenError> {
    Cols::resolve(layout, model).map(|_| ())
}

/// Fill the four QCS quality columns.
///
/// Rows past `dyn_row` read their inputs through a fresh filter bank, which
/// is advanced on every such row even inside the skipped range.
pub fn derive_quality(
    ds: &mut Dataset,
    model: &ModelConfig,
    dyn_row: usize,
    rng: &mut dyn NoiseSource,
) -> Result<(), GenError> {
    let Cols {
        sources,
        moisture: moisture_col,
        bone_dry_weight: bdw_col,
        basis_weight: basis_col,
        caliper: caliper_col,
        caliper_max,
        caliper_noise,
    } = Cols::resolve(ds.layout(), model)?;
    let first_written = FIRST_DATA_ROW + model.quality.skip_rows;

    let mut bank = FilterBank::new(dyn_row, Stage::Quality);
    for row in FIRST_DATA_ROW..=ds.final_row() {
        let mut v = [0.0; 6];
        if row > dyn_row {
            for (out, &col) in v.iter_mut().zip(&sources) {
                *out = bank.apply(ds, model, row, col)?;
            }
        } else {
            for (k, (out, &col)) in v.iter_mut().zip(&sources).enumerate() {
                *out = match ds.get(row, col) {
                    Some(x) => x,
                    // blend freeness is zero while total flow is low
                    None if k == 5 => 0.0,
                    None => ds.value(Stage::Quality, row, col)?,
                };
            }
        }
        if row < first_written {
            continue;
        }

        let q = QualityInputs {
            thin_stock_flow: v[0],
            consistency: v[1],
            press_load: v[2],
            steam_pressure: v[3],
            machine_speed: v[4],
            blend_freeness: v[5],
        };
        let noise = perturb(rng, caliper_noise);
        let out = cascade(
            &q,
            model.process.trim,
            model.quality.min_machine_speed,
            caliper_max,
            noise,
        );
        ds.set(row, moisture_col, Some(out.moisture));
        ds.set(row, bdw_col, Some(out.bone_dry_weight));
        ds.set(row, basis_col, Some(out.basis_weight));
        ds.set(row, caliper_col, Some(out.caliper));
    }
    debug!(first_written, final_row = ds.final_row(), "quality columns filled");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> QualityInputs {
        QualityInputs {
            thin_stock_flow: 5000.0,
            consistency: 0.8,
            press_load: 700.0,
            steam_pressure: 50.0,
            machine_speed: 1000.0,
            blend_freeness: 0.0,
        }
    }

    #[test]
    fn press_load_at_reference_gives_caliper_max() {
        let out = cascade(&inputs(), 200.0, 1.0, 10.0, 0.0);
        let fiber = 5000.0 * 0.8 * 8.3 / 100.0;
        let bdw = fiber * 3300.0 / (1000.0 * 200.0);
        assert!((out.bone_dry_weight - bdw).abs() < 1e-9);
        assert!((out.caliper - 10.0 * bdw / 50.0).abs() < 1e-9);
        assert!((out.basis_weight - bdw * (1.0 + out.moisture / 100.0)).abs() < 1e-9);
    }

    #[test]
    fn slow_machine_has_no_bone_dry_weight() {
        let mut q = inputs();
        q.machine_speed = 1.0;
        let out = cascade(&q, 200.0, 1.0, 10.0, 0.25);
        assert_eq!(out.bone_dry_weight, 0.0);
        assert_eq!(out.basis_weight, 0.0);
        assert_eq!(out.caliper, 0.25);

        // threshold is configurable
        let out = cascade(&q, 200.0, 0.5, 10.0, 0.0);
        assert!(out.bone_dry_weight > 0.0);
    }

    #[test]
    fn zero_freeness_drains_five_percent() {
        // wire drainage 5 %, press drainage 80(1 - e^-3.5)
        let q = inputs();
        let out = cascade(&q, 200.0, 1.0, 10.0, 0.0);
        let fiber = 5000.0 * 0.8 * 8.3 / 100.0;
        let water = 5000.0 * 8.3 - fiber;
        let to_dryers = water * 0.05 * (80.0 * (1.0 - (-3.5f64).exp())) / 100.0;
        let asym = 2.5 + 2.0;
        let expected = asym + (to_dryers / fiber - asym) / 2f64.exp();
        assert!((out.moisture - expected).abs() < 1e-9);
    }
}
