#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::float_cmp,
    clippy::many_single_char_names
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Synthetic paper-machine dataset generation engine.
//!
//! A single batch pass builds one row-per-time-step table and writes it
//! through a `millgen_traits::TableStore`. All randomness comes from an
//! injected `NoiseSource`, so a fixed seed reproduces the output exactly.
//!
//! ## Pipeline
//!
//! 1. **Sequencer** (`sequencer`): staged input trajectories in held blocks
//! 2. **Spill** (`assembler::spill`): early input columns go to the store
//! 3. **State** (`state`): freeness, headbox and blend relations per row
//! 4. **Quality** (`quality`): QCS moisture, weights and caliper
//! 5. **Gain** (`gain`): weighted nonlinear curves for each lab output
//! 6. **Assemble** (`assembler::finish`): cadence, reload, timestamps, write
//!
//! Quality and gain read their inputs through the deadtime and two-lag
//! filter in `dynamics` for rows past `dyn_row`.
//!
//! ## Row numbering
//!
//! Rows follow spreadsheet numbering: rows 1-2 are the header and data
//! starts at row 3. See `sequencer::RowPlan` for the derived boundaries.

pub mod assembler;
pub mod builder;
pub mod config;
pub mod conversions;
pub mod dataset;
pub mod dynamics;
pub mod error;
pub mod gain;
pub mod mocks;
pub mod model;
pub mod noise;
pub mod quality;
pub mod runner;
pub mod sequencer;
pub mod state;
pub mod store;
pub mod util;

pub use builder::{Generator, GeneratorBuilder};
pub use config::{AssemblyParams, ProcessParams, QualityParams};
pub use conversions::{model_from_sheets, parse_start};
pub use dataset::{ColumnLayout, Dataset, Origin};
pub use error::{BuildError, GenError, Report, Result, Stage};
pub use model::{CurveModel, GainSpec, GainTerm, InputVar, LabVar, ModelConfig, StateVar, VarTable};
pub use noise::SeededNoise;
pub use runner::{PlanReport, RunSummary};
pub use sequencer::RowPlan;
pub use store::CsvDirStore;
