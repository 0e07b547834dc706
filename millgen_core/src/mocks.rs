//! Test and helper mocks for millgen_core

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use millgen_traits::{BoxError, NoiseSource, TableStore};

use crate::config::{ProcessParams, QualityParams};
use crate::model::{
    CurveModel, Dynamics, GainSpec, GainTerm, InputVar, LabVar, ModelConfig, StateVar, VarTable,
};

/// Noise source returning the same draw forever.
///
/// A draw of 0.5 makes every perturbation exactly zero.
#[derive(Debug, Clone, Copy)]
pub struct ConstNoise(pub f64);

impl ConstNoise {
    pub fn zero() -> Self {
        Self(0.5)
    }
}

impl NoiseSource for ConstNoise {
    fn next_unit(&mut self) -> f64 {
        self.0
    }
}

/// In-memory table store. Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<HashMap<String, Vec<Vec<String>>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a stored table.
    pub fn table(&self, name: &str) -> Option<Vec<Vec<String>>> {
        self.tables.lock().ok()?.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tables
            .lock()
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl TableStore for MemoryStore {
    fn write(&mut self, name: &str, rows: &[Vec<String>]) -> Result<(), BoxError> {
        let mut t = self.tables.lock().map_err(|_| "memory store poisoned")?;
        t.insert(name.to_string(), rows.to_vec());
        Ok(())
    }

    fn read(&mut self, name: &str, max_cols: usize) -> Result<Vec<Vec<String>>, BoxError> {
        let t = self.tables.lock().map_err(|_| "memory store poisoned")?;
        let rows = t.get(name).ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, format!("no table {name}"))
        })?;
        Ok(rows
            .iter()
            .map(|r| r.iter().take(max_cols).cloned().collect())
            .collect())
    }

    fn remove(&mut self, name: &str) -> Result<(), BoxError> {
        let mut t = self.tables.lock().map_err(|_| "memory store poisoned")?;
        t.remove(name);
        Ok(())
    }
}

/// A store whose every operation fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingStore;

impl TableStore for FailingStore {
    fn write(&mut self, _name: &str, _rows: &[Vec<String>]) -> Result<(), BoxError> {
        Err(Box::new(std::io::Error::other("disk full")))
    }

    fn read(&mut self, _name: &str, _max_cols: usize) -> Result<Vec<Vec<String>>, BoxError> {
        Err(Box::new(std::io::Error::other("disk full")))
    }

    fn remove(&mut self, _name: &str) -> Result<(), BoxError> {
        Err(Box::new(std::io::Error::other("disk full")))
    }
}

// ── Fixture models ───────────────────────────────────────────────────────────

fn input(name: &str, min: f64, max: f64, order: usize) -> InputVar {
    InputVar {
        name: name.to_string(),
        units: String::new(),
        dynamics: Dynamics::default(),
        noise: 0.0,
        move_lag_s: 0.0,
        max,
        min,
        sine_period_s: 0.0,
        sine_amplitude: 0.0,
        move_order: order,
        validation: Vec::new(),
    }
}

fn state(name: &str, min: f64, max: f64) -> StateVar {
    StateVar {
        name: name.to_string(),
        units: String::new(),
        dynamics: Dynamics::default(),
        noise: 0.0,
        max,
        min,
    }
}

fn lab(name: &str, min: f64, max: f64) -> LabVar {
    LabVar {
        name: name.to_string(),
        units: String::new(),
        noise: 0.0,
        max,
        min,
    }
}

fn term(variable: &str, weight: f64, model: CurveModel, order: f64) -> GainTerm {
    GainTerm {
        variable: variable.to_string(),
        weight,
        asymptote: None,
        order,
        slope: 1.0,
        model,
        direction: 0.0,
        shape: 0.0,
    }
}

fn build(
    inputs: Vec<InputVar>,
    state: Vec<StateVar>,
    labs: Vec<LabVar>,
    gains: Vec<GainSpec>,
    process: ProcessParams,
) -> ModelConfig {
    let tables = VarTable::new("input", inputs).and_then(|i| {
        Ok((
            i,
            VarTable::new("state", state)?,
            VarTable::new("lab output", labs)?,
        ))
    });
    let quality = QualityParams::default();
    match tables.and_then(|(i, s, l)| ModelConfig::new(i, s, l, gains, process, quality)) {
        Ok(m) => m,
        Err(e) => panic!("fixture model is invalid: {e}"),
    }
}

/// One input `MV_A` in `[0, 10]`, one state `QCS_X`, one lab `Lab_T` driven by `MV_A`.
///
/// Zero noise, zero dynamics. Not a complete mill: the state and quality
/// stages need `mill_model`.
pub fn tiny_model() -> ModelConfig {
    build(
        vec![input("MV_A", 0.0, 10.0, 1)],
        vec![state("QCS_X", 0.0, 1.0)],
        vec![lab("Lab_T", 0.0, 100.0)],
        vec![GainSpec {
            lab: "Lab_T".into(),
            terms: vec![term("MV_A", 100.0, CurveModel::Polynomial, 1.0)],
        }],
        ProcessParams {
            base_period_s: 1,
            lab_period_s: 1,
            qcs_period_s: 1,
            pulpeye_period_s: 1,
            uncoupled_moves: 1,
            coupled_moves: 0,
            isolated_moves: 0,
            settle_s: 4,
            ..ProcessParams::default()
        },
    )
}

/// Every variable the state and quality stages require, with small periods.
///
/// `MV_ThinStockFlow` is the lowest input column any later stage reads, so
/// the eleven inputs before it are spilled.
pub fn mill_model() -> ModelConfig {
    let mut inputs = vec![
        input("MV_SWSpecificEnergy", 0.5, 4.0, 1),
        input("MV_HWSpecificEnergy", 0.5, 4.0, 2),
        input("MV_OCCSpecificEnergy", 0.5, 4.0, 3),
        input("MV_SWFlow", 200.0, 400.0, 4),
        input("MV_HWFlow", 100.0, 300.0, 5),
        input("MV_OCCFlow", 0.0, 200.0, 6),
        input("PulpEye_SWCrill", 10.0, 30.0, 7),
        input("PulpEye_HWCrill", 20.0, 40.0, 8),
        input("PulpEye_OCCCrill", 5.0, 25.0, 9),
        input("MV_WireSpeed", 600.0, 1200.0, 10),
        input("MV_JettoWire", 0.95, 1.05, 11),
        input("MV_ThinStockFlow", 4000.0, 8000.0, 12),
        input("MV_ThinStockConsistency", 0.6, 1.0, 13),
        input("MV_PressLoad", 400.0, 1000.0, 14),
        input("MV_SteamPressure", 20.0, 80.0, 15),
    ];
    for v in &mut inputs {
        v.noise = (v.max - v.min) * 0.01;
    }
    inputs[11].dynamics = Dynamics {
        deadtime_min: 0.25,
        lag1_min: 0.5,
        lag2_min: 0.25,
    };
    inputs[13].dynamics.lag1_min = 0.2;
    inputs[13].move_lag_s = 10.0;
    inputs[14].sine_period_s = 60.0;
    inputs[14].sine_amplitude = 2.0;
    inputs[11].validation = vec![Some(6500.0)];

    let mut freeness = state("MV_SWFreeness", 300.0, 1000.0);
    freeness.noise = 2.0;
    let mut machine_speed = state("MV_MachineSpeed", 0.0, 1500.0);
    machine_speed.dynamics.lag1_min = 0.1;
    let mut caliper = state("QCS_Caliper", 0.0, 12.0);
    caliper.noise = 0.05;
    let states = vec![
        freeness,
        state("MV_HWFreeness", 300.0, 1000.0),
        state("MV_OCCFreeness", 300.0, 1000.0),
        state("MV_HeadboxPressure", 0.0, 10.0),
        state("MV_SliceOpening", 0.0, 2.0),
        machine_speed,
        state("MV_SWPct", 0.0, 100.0),
        state("MV_HWPct", 0.0, 100.0),
        state("MV_OCCPct", 0.0, 100.0),
        state("PulpEye_BlendFreeness", 300.0, 1000.0),
        state("PulpEye_BlendCrill", 0.0, 40.0),
        state("QCS_Moisture", 0.0, 20.0),
        state("QCS_BoneDryWeight", 0.0, 200.0),
        state("QCS_BasisWeight", 0.0, 250.0),
        caliper,
    ];

    let mut freeness_term = term("PulpEye_BlendFreeness", 30.0, CurveModel::Exponential, 1.0);
    freeness_term.slope = 2.0;
    let mut steam_term = term("MV_SteamPressure", 20.0, CurveModel::Sigmoid, 1.0);
    steam_term.direction = 1.0;
    steam_term.slope = 6.0;
    let mut basis_term = term("QCS_BasisWeight", 40.0, CurveModel::Sigmoid, 1.0);
    basis_term.asymptote = Some(120.0);
    let gains = vec![
        GainSpec {
            lab: "Lab_Tensile".into(),
            terms: vec![
                term("MV_PressLoad", 50.0, CurveModel::Polynomial, 2.0),
                freeness_term,
                steam_term,
            ],
        },
        GainSpec {
            lab: "Lab_Brightness".into(),
            terms: vec![
                term("MV_ThinStockConsistency", 60.0, CurveModel::Polynomial, 1.0),
                basis_term,
            ],
        },
    ];

    build(
        inputs,
        states,
        vec![lab("Lab_Tensile", 20.0, 60.0), lab("Lab_Brightness", 70.0, 90.0)],
        gains,
        ProcessParams {
            base_period_s: 5,
            lab_period_s: 30,
            qcs_period_s: 15,
            pulpeye_period_s: 10,
            uncoupled_moves: 1,
            coupled_moves: 1,
            isolated_moves: 0,
            trim: 200.0,
            draw: 1.02,
            settle_s: 20,
        },
    )
}
