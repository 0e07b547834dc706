//! Runtime parameters for the generation engine.
//!
//! These are the values the pipeline reads while running. They are separate
//! from the TOML-deserialized config in `millgen_config`.

use chrono::NaiveDateTime;

/// Scalar process parameters. All periods are in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessParams {
    /// Base sample period; one dataset row per period.
    pub base_period_s: u32,
    /// Lab reporting period (multiple of the base period).
    pub lab_period_s: u32,
    /// QCS reporting period (multiple of the base period).
    pub qcs_period_s: u32,
    /// PulpEye reporting period (multiple of the base period).
    pub pulpeye_period_s: u32,
    pub uncoupled_moves: u32,
    pub coupled_moves: u32,
    pub isolated_moves: u32,
    /// Sheet trim width used by slice opening and bone-dry weight.
    pub trim: f64,
    /// Wire-to-reel draw ratio.
    pub draw: f64,
    /// Base settle time before deadtime and lags are added.
    pub settle_s: u32,
}

impl Default for ProcessParams {
    fn default() -> Self {
        Self {
            base_period_s: 5,
            lab_period_s: 3600,
            qcs_period_s: 30,
            pulpeye_period_s: 60,
            uncoupled_moves: 2,
            coupled_moves: 0,
            isolated_moves: 0,
            trim: 200.0,
            draw: 1.02,
            settle_s: 600,
        }
    }
}

impl ProcessParams {
    pub fn lab_rows(&self) -> usize {
        crate::util::rows_per_period(self.lab_period_s, self.base_period_s)
    }

    pub fn qcs_rows(&self) -> usize {
        crate::util::rows_per_period(self.qcs_period_s, self.base_period_s)
    }

    pub fn pulpeye_rows(&self) -> usize {
        crate::util::rows_per_period(self.pulpeye_period_s, self.base_period_s)
    }
}

/// Quality calculator knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityParams {
    /// Data rows (from row 3) left blank by the quality pass.
    pub skip_rows: usize,
    /// Bone-dry weight is 0 when the machine speed is at or below this.
    pub min_machine_speed: f64,
}

impl Default for QualityParams {
    fn default() -> Self {
        Self {
            skip_rows: 0,
            min_machine_speed: 1.0,
        }
    }
}

/// Final assembly: timestamps and spill naming.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyParams {
    /// Timestamp stamped on the first data row.
    pub start: NaiveDateTime,
    /// Name of the intermediate spill table.
    pub spill_name: String,
}
