//! Immutable configuration model: variable metadata and gain specifications.

use std::collections::HashMap;

use crate::config::{ProcessParams, QualityParams};
use crate::error::GenError;
use crate::quality::QUALITY_OUTPUTS;

/// Deadtime and lag constants, in minutes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Dynamics {
    pub deadtime_min: f64,
    pub lag1_min: f64,
    pub lag2_min: f64,
}

/// A manipulated (input) variable.
#[derive(Debug, Clone, PartialEq)]
pub struct InputVar {
    pub name: String,
    pub units: String,
    pub dynamics: Dynamics,
    pub noise: f64,
    /// First-order smoothing lag applied to move targets, in seconds.
    pub move_lag_s: f64,
    pub max: f64,
    pub min: f64,
    pub sine_period_s: f64,
    pub sine_amplitude: f64,
    /// 1-based rank at which this input is moved in the uncoupled phase.
    pub move_order: usize,
    /// Validation scenario values; `None` carries the previous value forward.
    pub validation: Vec<Option<f64>>,
}

impl InputVar {
    pub fn mid(&self) -> f64 {
        self.min + (self.max - self.min) / 2.0
    }
}

/// A derived process-state variable.
#[derive(Debug, Clone, PartialEq)]
pub struct StateVar {
    pub name: String,
    pub units: String,
    pub dynamics: Dynamics,
    pub noise: f64,
    pub max: f64,
    pub min: f64,
}

/// A laboratory output produced by the gain model.
#[derive(Debug, Clone, PartialEq)]
pub struct LabVar {
    pub name: String,
    pub units: String,
    pub noise: f64,
    pub max: f64,
    pub min: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveModel {
    Polynomial,
    Exponential,
    Sigmoid,
}

impl CurveModel {
    /// Accepts the numeric tags `0`, `1`, `2` or the family names.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "polynomial" | "poly" => Some(Self::Polynomial),
            "exponential" | "exp" => Some(Self::Exponential),
            "sigmoid" => Some(Self::Sigmoid),
            other => match other.parse::<f64>().ok()? {
                v if v == 0.0 => Some(Self::Polynomial),
                v if v == 1.0 => Some(Self::Exponential),
                _ => Some(Self::Sigmoid),
            },
        }
    }
}

/// One contributing variable of a lab output.
#[derive(Debug, Clone, PartialEq)]
pub struct GainTerm {
    pub variable: String,
    /// Contribution in percent.
    pub weight: f64,
    /// Asymptote in engineering units; `None` means mid-range.
    pub asymptote: Option<f64>,
    pub order: f64,
    pub slope: f64,
    pub model: CurveModel,
    pub direction: f64,
    pub shape: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GainSpec {
    pub lab: String,
    pub terms: Vec<GainTerm>,
}

pub trait Named {
    fn name(&self) -> &str;
}

impl Named for InputVar {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for StateVar {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for LabVar {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Ordered variables with a name→index map built once.
#[derive(Debug, Clone, PartialEq)]
pub struct VarTable<T> {
    label: &'static str,
    vars: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T: Named> VarTable<T> {
    pub fn new(label: &'static str, vars: Vec<T>) -> Result<Self, GenError> {
        let mut index = HashMap::with_capacity(vars.len());
        for (i, v) in vars.iter().enumerate() {
            if index.insert(v.name().to_string(), i).is_some() {
                return Err(GenError::Config(format!(
                    "duplicate variable '{}' in the {label} table",
                    v.name()
                )));
            }
        }
        Ok(Self { label, vars, index })
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.vars.iter()
    }

    pub fn at(&self, idx: usize) -> Option<&T> {
        self.vars.get(idx)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.position(name).and_then(|i| self.vars.get(i))
    }

    /// Like `get`, but a missing name is a `VariableNotFound` naming `context`.
    pub fn require(&self, name: &str, context: &str) -> Result<&T, GenError> {
        self.get(name).ok_or_else(|| GenError::VariableNotFound {
            name: name.to_string(),
            table: self.label,
            context: context.to_string(),
        })
    }
}

/// Everything the pipeline reads; built once and never mutated.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub inputs: VarTable<InputVar>,
    pub state: VarTable<StateVar>,
    pub labs: VarTable<LabVar>,
    /// Gain specs in lab-output order.
    pub gains: Vec<GainSpec>,
    pub process: ProcessParams,
    pub quality: QualityParams,
}

impl ModelConfig {
    /// Assemble and cross-check a model.
    ///
    /// Every lab output needs exactly one gain spec, every gain term must name
    /// an input or state variable, and referenced variables need `max > min`.
    /// Quality rows may only be skipped when no gain term reads a quality output.
    pub fn new(
        inputs: VarTable<InputVar>,
        state: VarTable<StateVar>,
        labs: VarTable<LabVar>,
        gains: Vec<GainSpec>,
        process: ProcessParams,
        quality: QualityParams,
    ) -> Result<Self, GenError> {
        if inputs.is_empty() {
            return Err(GenError::Config("the input table has no variables".into()));
        }
        for name in inputs.index.keys() {
            if state.position(name).is_some() {
                return Err(GenError::Config(format!(
                    "variable '{name}' appears in both the input and state tables"
                )));
            }
        }

        let mut ordered = Vec::with_capacity(labs.len());
        for lab in labs.iter() {
            let spec = gains
                .iter()
                .find(|g| g.lab == lab.name)
                .ok_or_else(|| {
                    GenError::Config(format!("no gain spec for lab output '{}'", lab.name))
                })?;
            for term in &spec.terms {
                let context = format!("gain spec '{}'", spec.lab);
                let (min, max) = match (inputs.get(&term.variable), state.get(&term.variable)) {
                    (Some(v), _) => (v.min, v.max),
                    (None, Some(v)) => (v.min, v.max),
                    (None, None) => {
                        return Err(GenError::VariableNotFound {
                            name: term.variable.clone(),
                            table: "input or state",
                            context,
                        });
                    }
                };
                if max.is_nan() || min.is_nan() || max <= min {
                    return Err(GenError::Config(format!(
                        "'{}' (used by {context}) needs max > min, got min={min} max={max}",
                        term.variable
                    )));
                }
            }
            ordered.push(spec.clone());
        }

        let model = Self {
            inputs,
            state,
            labs,
            gains: ordered,
            process,
            quality,
        };
        model.check_quality_skip()?;
        Ok(model)
    }

    /// The gain stage reads every row from 3, so `skip_rows` must be 0 when a
    /// gain term names one of the quality outputs.
    pub fn check_quality_skip(&self) -> Result<(), GenError> {
        if self.quality.skip_rows == 0 {
            return Ok(());
        }
        let used = self.gains.iter().find_map(|g| {
            g.terms
                .iter()
                .find(|t| QUALITY_OUTPUTS.contains(&t.variable.as_str()))
                .map(|t| (g, t))
        });
        match used {
            Some((spec, term)) => Err(GenError::Config(format!(
                "quality.skip_rows = {} leaves '{}' blank, but gain spec '{}' reads it; \
                 set skip_rows to 0 or drop the term",
                self.quality.skip_rows, term.variable, spec.lab
            ))),
            None => Ok(()),
        }
    }
}
