//! Bridges from `millgen_config` types (TOML structs, raw sheets) to the
//! typed model the engine runs on.
//!
//! Sheet parsing fails fast: a blank required cell or malformed number is a
//! `GenError::Parse` naming the sheet, row and variable.

use chrono::NaiveDateTime;
use millgen_config::{Sheet, SheetSet};

use crate::config::{AssemblyParams, ProcessParams, QualityParams};
use crate::error::GenError;
use crate::model::{
    CurveModel, Dynamics, GainSpec, GainTerm, InputVar, LabVar, ModelConfig, StateVar, VarTable,
};

/// Output timestamp format, also accepted for `start`.
pub const TIME_FORMAT: &str = "%m/%d/%y %H:%M:%S";

// Input sheet rows
const IN_DEADTIME: usize = 3;
const IN_LAG1: usize = 4;
const IN_LAG2: usize = 5;
const IN_NOISE: usize = 6;
const IN_MOVE_LAG: usize = 7;
const IN_MAX: usize = 8;
const IN_MIN: usize = 9;
const IN_SINE_PERIOD: usize = 10;
const IN_SINE_AMP: usize = 11;
const IN_ORDER: usize = 12;
/// First validation scenario row of the input sheet.
pub const IN_FIRST_VALIDATION: usize = 13;

// State sheet rows (deadtime/lags/noise shared with inputs)
const ST_MAX: usize = 7;
const ST_MIN: usize = 8;

// Lab output sheet rows
const LAB_NOISE: usize = 3;
const LAB_MAX: usize = 4;
const LAB_MIN: usize = 5;

// Gain sheet columns
const G_VAR: usize = 1;
const G_WEIGHT: usize = 2;
const G_ASYMPTOTE: usize = 3;
const G_ORDER: usize = 4;
const G_SLOPE: usize = 5;
const G_MODEL: usize = 6;
const G_DIRECTION: usize = 7;
const G_SHAPE: usize = 8;

fn parse_err(sheet: &Sheet, row: usize, variable: &str, value: &str) -> GenError {
    GenError::Parse {
        sheet: sheet.name().to_string(),
        row,
        variable: variable.to_string(),
        value: value.to_string(),
    }
}

fn optional_number(
    sheet: &Sheet,
    row: usize,
    col: usize,
    variable: &str,
) -> Result<Option<f64>, GenError> {
    match sheet.cell(row, col) {
        None => Ok(None),
        Some(txt) => txt
            .parse::<f64>()
            .map(Some)
            .map_err(|_| parse_err(sheet, row, variable, txt)),
    }
}

fn number(sheet: &Sheet, row: usize, col: usize, variable: &str) -> Result<f64, GenError> {
    optional_number(sheet, row, col, variable)?.ok_or_else(|| parse_err(sheet, row, variable, ""))
}

/// `(column, name)` for every variable column of a metadata sheet.
fn variable_columns(sheet: &Sheet) -> Result<Vec<(usize, String)>, GenError> {
    let mut out = Vec::new();
    for (i, name) in sheet.names().into_iter().enumerate() {
        let col = i + 2;
        if name.is_empty() {
            return Err(GenError::Config(format!(
                "sheet '{}' has a blank variable name in column {col}",
                sheet.name()
            )));
        }
        out.push((col, name.to_string()));
    }
    Ok(out)
}

fn dynamics(sheet: &Sheet, col: usize, name: &str) -> Result<Dynamics, GenError> {
    Ok(Dynamics {
        deadtime_min: number(sheet, IN_DEADTIME, col, name)?,
        lag1_min: number(sheet, IN_LAG1, col, name)?,
        lag2_min: number(sheet, IN_LAG2, col, name)?,
    })
}

fn units(sheet: &Sheet, col: usize) -> String {
    sheet.cell(2, col).unwrap_or_default().to_string()
}

impl TryFrom<&Sheet> for VarTable<InputVar> {
    type Error = GenError;

    fn try_from(sheet: &Sheet) -> Result<Self, Self::Error> {
        let mut vars = Vec::new();
        for (col, name) in variable_columns(sheet)? {
            let order = number(sheet, IN_ORDER, col, &name)?;
            if order < 1.0 || order.fract() != 0.0 {
                return Err(parse_err(sheet, IN_ORDER, &name, &order.to_string()));
            }
            let mut validation = Vec::new();
            for row in IN_FIRST_VALIDATION..=sheet.row_count() {
                validation.push(optional_number(sheet, row, col, &name)?);
            }
            vars.push(InputVar {
                units: units(sheet, col),
                dynamics: dynamics(sheet, col, &name)?,
                noise: number(sheet, IN_NOISE, col, &name)?,
                move_lag_s: optional_number(sheet, IN_MOVE_LAG, col, &name)?.unwrap_or(0.0),
                max: number(sheet, IN_MAX, col, &name)?,
                min: number(sheet, IN_MIN, col, &name)?,
                sine_period_s: optional_number(sheet, IN_SINE_PERIOD, col, &name)?.unwrap_or(0.0),
                sine_amplitude: optional_number(sheet, IN_SINE_AMP, col, &name)?.unwrap_or(0.0),
                move_order: order as usize,
                validation,
                name,
            });
        }
        VarTable::new("input", vars)
    }
}

impl TryFrom<&Sheet> for VarTable<StateVar> {
    type Error = GenError;

    fn try_from(sheet: &Sheet) -> Result<Self, Self::Error> {
        let mut vars = Vec::new();
        for (col, name) in variable_columns(sheet)? {
            vars.push(StateVar {
                units: units(sheet, col),
                dynamics: dynamics(sheet, col, &name)?,
                noise: number(sheet, IN_NOISE, col, &name)?,
                max: number(sheet, ST_MAX, col, &name)?,
                min: number(sheet, ST_MIN, col, &name)?,
                name,
            });
        }
        VarTable::new("state", vars)
    }
}

impl TryFrom<&Sheet> for VarTable<LabVar> {
    type Error = GenError;

    fn try_from(sheet: &Sheet) -> Result<Self, Self::Error> {
        let mut vars = Vec::new();
        for (col, name) in variable_columns(sheet)? {
            vars.push(LabVar {
                units: units(sheet, col),
                noise: optional_number(sheet, LAB_NOISE, col, &name)?.unwrap_or(0.0),
                max: number(sheet, LAB_MAX, col, &name)?,
                min: number(sheet, LAB_MIN, col, &name)?,
                name,
            });
        }
        VarTable::new("lab output", vars)
    }
}

/// Parse one gain sheet. Row 1 is a header; rows with a blank variable cell are skipped.
pub fn gain_spec_from_sheet(lab: &str, sheet: &Sheet) -> Result<GainSpec, GenError> {
    let mut terms = Vec::new();
    for row in 2..=sheet.row_count() {
        let Some(variable) = sheet.cell(row, G_VAR) else {
            continue;
        };
        let model_txt = sheet.cell(row, G_MODEL).unwrap_or_default();
        let model =
            CurveModel::parse(model_txt).ok_or_else(|| parse_err(sheet, row, variable, model_txt))?;
        let sigmoid = model == CurveModel::Sigmoid;
        let order = match optional_number(sheet, row, G_ORDER, variable)? {
            Some(o) => o,
            None if sigmoid => 1.0,
            None => return Err(parse_err(sheet, row, variable, "")),
        };
        let shape = match optional_number(sheet, row, G_SHAPE, variable)? {
            Some(s) => s,
            None if sigmoid => 0.0,
            None => return Err(parse_err(sheet, row, variable, "")),
        };
        terms.push(GainTerm {
            variable: variable.to_string(),
            weight: number(sheet, row, G_WEIGHT, variable)?,
            asymptote: optional_number(sheet, row, G_ASYMPTOTE, variable)?,
            order,
            slope: optional_number(sheet, row, G_SLOPE, variable)?.unwrap_or(1.0),
            model,
            direction: number(sheet, row, G_DIRECTION, variable)?,
            shape,
        });
    }
    Ok(GainSpec {
        lab: lab.to_string(),
        terms,
    })
}

impl From<&millgen_config::ProcessCfg> for ProcessParams {
    fn from(c: &millgen_config::ProcessCfg) -> Self {
        Self {
            base_period_s: c.base_period_s,
            lab_period_s: c.lab_period_s,
            qcs_period_s: c.qcs_period_s,
            pulpeye_period_s: c.pulpeye_period_s,
            uncoupled_moves: c.uncoupled_moves,
            coupled_moves: c.coupled_moves,
            isolated_moves: c.isolated_moves,
            trim: c.trim,
            draw: c.draw,
            settle_s: c.settle_s,
        }
    }
}

impl From<&millgen_config::QualityCfg> for QualityParams {
    fn from(c: &millgen_config::QualityCfg) -> Self {
        Self {
            skip_rows: c.skip_rows,
            min_machine_speed: c.min_machine_speed,
        }
    }
}

/// Parse `MM/dd/yy` (midnight) or `MM/dd/yy HH:mm:ss`.
pub fn parse_start(s: &str) -> Result<NaiveDateTime, GenError> {
    let s = s.trim();
    let full = if s.contains(' ') {
        s.to_string()
    } else {
        format!("{s} 00:00:00")
    };
    NaiveDateTime::parse_from_str(&full, TIME_FORMAT)
        .map_err(|e| GenError::Config(format!("start {s:?} is not MM/dd/yy[ HH:mm:ss]: {e}")))
}

impl TryFrom<&millgen_config::Config> for AssemblyParams {
    type Error = GenError;

    fn try_from(c: &millgen_config::Config) -> Result<Self, Self::Error> {
        Ok(Self {
            start: parse_start(&c.start)?,
            spill_name: c.output.spill_name.clone(),
        })
    }
}

/// Build the full model from a validated config and its loaded sheets.
pub fn model_from_sheets(
    cfg: &millgen_config::Config,
    sheets: &SheetSet,
) -> Result<ModelConfig, GenError> {
    let inputs = VarTable::<InputVar>::try_from(&sheets.inputs)?;
    let state = VarTable::<StateVar>::try_from(&sheets.state)?;
    let labs = VarTable::<LabVar>::try_from(&sheets.outputs)?;
    let gains = sheets
        .labs
        .iter()
        .map(|(name, sheet)| gain_spec_from_sheet(name, sheet))
        .collect::<Result<Vec<_>, _>>()?;
    ModelConfig::new(
        inputs,
        state,
        labs,
        gains,
        (&cfg.process).into(),
        (&cfg.quality).into(),
    )
}
