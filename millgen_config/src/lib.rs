#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Run configuration and sheet loading for the dataset generator.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Sheets are header-less CSV grids addressed like a spreadsheet: 1-based
//!   rows and columns, column 1 reserved, row 1 holding variable names.
use serde::Deserialize;
use std::path::{Path, PathBuf};

mod sheet;

pub use sheet::{Sheet, load_sheet_csv, parse_sheet_csv};

#[derive(Debug, Deserialize, Clone)]
pub struct ProcessCfg {
    /// Base sample period in seconds. Also accepts alias "process".
    #[serde(alias = "process")]
    pub base_period_s: u32,
    /// Lab reporting period (s); must be a multiple of the base period.
    #[serde(alias = "lab")]
    pub lab_period_s: u32,
    #[serde(alias = "qcs")]
    pub qcs_period_s: u32,
    #[serde(alias = "pulpeye")]
    pub pulpeye_period_s: u32,
    /// Levels stepped per input in the uncoupled phase (levels = moves + 1).
    #[serde(alias = "uncoupled")]
    pub uncoupled_moves: u32,
    /// Validation scenarios taken from input sheet rows 13, 14, ...
    #[serde(default, alias = "coupled")]
    pub coupled_moves: u32,
    #[serde(default, alias = "isolated")]
    pub isolated_moves: u32,
    pub trim: f64,
    pub draw: f64,
    /// Base settle time (s) before deadtime and lags are added.
    #[serde(alias = "settle")]
    pub settle_s: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct QualityCfg {
    /// Data rows left untouched at the start of the quality pass.
    pub skip_rows: usize,
    /// Machine speed at or below which bone-dry weight is forced to 0.
    pub min_machine_speed: f64,
}

impl Default for QualityCfg {
    fn default() -> Self {
        Self {
            skip_rows: 0,
            min_machine_speed: 1.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SheetsCfg {
    pub inputs: PathBuf,
    pub state: PathBuf,
    pub outputs: PathBuf,
    /// Directory holding one `<LabName>.csv` gain sheet per lab output.
    pub lab_dir: PathBuf,
}

impl Default for SheetsCfg {
    fn default() -> Self {
        Self {
            inputs: PathBuf::from("inputs.csv"),
            state: PathBuf::from("state.csv"),
            outputs: PathBuf::from("outputs.csv"),
            lab_dir: PathBuf::from("lab"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputCfg {
    pub dir: PathBuf,
    /// Name of the intermediate spill table (deleted after reload).
    pub spill_name: String,
}

impl Default for OutputCfg {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            spill_name: "data".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Noise seed; a random one is drawn (and logged) when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Dataset start, `MM/dd/yy` (midnight) or `MM/dd/yy HH:mm:ss`.
    pub start: String,
    pub process: ProcessCfg,
    #[serde(default)]
    pub quality: QualityCfg,
    #[serde(default)]
    pub sheets: SheetsCfg,
    #[serde(default)]
    pub output: OutputCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    /// Read, parse and validate a TOML file.
    pub fn from_path(path: &Path) -> eyre::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
        let cfg = load_toml(&raw).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> eyre::Result<()> {
        let p = &self.process;

        // Periods
        if p.base_period_s == 0 {
            eyre::bail!("process.base_period_s must be > 0");
        }
        for (key, v) in [
            ("lab_period_s", p.lab_period_s),
            ("qcs_period_s", p.qcs_period_s),
            ("pulpeye_period_s", p.pulpeye_period_s),
        ] {
            if v == 0 {
                eyre::bail!("process.{key} must be > 0");
            }
            if v % p.base_period_s != 0 {
                eyre::bail!(
                    "process.{key} must be a multiple of process.base_period_s ({} is not a multiple of {})",
                    v,
                    p.base_period_s
                );
            }
        }
        if p.settle_s > 7 * 24 * 60 * 60 {
            eyre::bail!("process.settle_s is unreasonably large (>7 days)");
        }

        // Physical constants
        if !(p.trim.is_finite() && p.trim > 0.0) {
            eyre::bail!("process.trim must be > 0");
        }
        if !(p.draw.is_finite() && p.draw > 0.0) {
            eyre::bail!("process.draw must be > 0");
        }

        // Quality
        if !self.quality.min_machine_speed.is_finite() || self.quality.min_machine_speed < 0.0 {
            eyre::bail!("quality.min_machine_speed must be >= 0");
        }

        if self.start.trim().is_empty() {
            eyre::bail!("start must not be empty");
        }
        if self.output.spill_name.trim().is_empty() {
            eyre::bail!("output.spill_name must not be empty");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {r:?}");
        }

        Ok(())
    }
}

/// All sheets a run needs, loaded from disk.
#[derive(Debug, Clone)]
pub struct SheetSet {
    pub inputs: Sheet,
    pub state: Sheet,
    pub outputs: Sheet,
    /// Gain sheets in lab-output column order, keyed by lab output name.
    pub labs: Vec<(String, Sheet)>,
}

impl SheetSet {
    /// Load every sheet referenced by `cfg`, resolving relative paths against `base`.
    ///
    /// Lab output names come from row 1 of the outputs sheet; each one must
    /// have a gain sheet `<lab_dir>/<name>.csv`.
    pub fn load(cfg: &Config, base: &Path) -> eyre::Result<Self> {
        let resolve = |p: &Path| -> PathBuf {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base.join(p)
            }
        };
        let inputs = load_sheet_csv(&resolve(&cfg.sheets.inputs))?;
        let state = load_sheet_csv(&resolve(&cfg.sheets.state))?;
        let outputs = load_sheet_csv(&resolve(&cfg.sheets.outputs))?;

        let lab_dir = resolve(&cfg.sheets.lab_dir);
        let mut labs = Vec::new();
        for name in outputs.names() {
            let path = lab_dir.join(format!("{name}.csv"));
            if !path.exists() {
                eyre::bail!(
                    "gain sheet for lab output '{}' not found at {:?}",
                    name,
                    path
                );
            }
            let sheet = load_sheet_csv(&path)?;
            labs.push((name.to_string(), sheet));
        }

        Ok(Self {
            inputs,
            state,
            outputs,
            labs,
        })
    }
}
