use eyre::WrapErr;
use tracing::{debug, info, info_span};

use crate::assembler::{evict_below, finish, spill};
use crate::builder::Generator;
use crate::dataset::{ColumnLayout, Dataset};
use crate::error::{Result, Stage};
use crate::gain::evaluate_labs;
use crate::quality::{self, derive_quality};
use crate::sequencer::{RowPlan, first_val, generate_inputs};
use crate::state::{self, derive_state};

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Table name the dataset was written under.
    pub artifact: String,
    pub final_row: usize,
    pub dyn_row: usize,
    pub first_val: usize,
    pub seed: Option<u64>,
}

/// Row plan plus the spill boundary, computed without generating anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanReport {
    pub rows: RowPlan,
    pub first_val: usize,
    /// Name of the `first_val` column.
    pub first_val_name: String,
    pub columns: usize,
}

fn stage_err(stage: Stage) -> String {
    format!("{stage} stage failed")
}

impl Generator {
    /// Compute the row plan and resolve every fixed variable name the
    /// stages need, without generating anything.
    pub fn plan(&self) -> Result<PlanReport> {
        let rows = RowPlan::from_model(&self.model);
        let layout = ColumnLayout::from_model(&self.model)?;
        state::check_columns(&layout, &self.model).wrap_err_with(|| stage_err(Stage::State))?;
        quality::check_columns(&layout, &self.model).wrap_err_with(|| stage_err(Stage::Quality))?;
        let ds = Dataset::new(layout, 0);
        let fv = first_val(&ds, &self.model)?;
        Ok(PlanReport {
            rows,
            first_val: fv,
            first_val_name: ds.layout().name(fv).to_string(),
            columns: ds.layout().width(),
        })
    }

    /// Run the whole pipeline and write the dataset to the store.
    pub fn run(&mut self) -> Result<RunSummary> {
        let plan = RowPlan::from_model(&self.model);
        let _span = info_span!("generate", final_row = plan.final_row, seed = ?self.seed).entered();
        debug!(
            max_settle_s = plan.max_settle_s,
            input_settle_s = plan.input_settle_s,
            settle_rows = plan.settle_rows,
            dyn_row = plan.dyn_row,
            "row plan"
        );

        let layout = ColumnLayout::from_model(&self.model)?;
        let mut ds = Dataset::new(layout, plan.final_row);
        let model = &self.model;
        let noise = &mut *self.noise;
        let store = &mut *self.store;

        generate_inputs(&mut ds, model, &plan, noise)
            .wrap_err_with(|| stage_err(Stage::Sequencer))?;
        let fv = first_val(&ds, model).wrap_err_with(|| stage_err(Stage::Sequencer))?;
        info!(rows = plan.final_row - 2, first_val = fv, "inputs generated");

        spill(&ds, store, &self.assembly.spill_name, fv).wrap_err_with(|| stage_err(Stage::Spill))?;

        derive_state(&mut ds, model, noise).wrap_err_with(|| stage_err(Stage::State))?;
        info!(cols = model.state.len(), "state derived");

        evict_below(&mut ds, fv);
        debug!(evicted = fv.saturating_sub(2), "early input columns evicted");

        derive_quality(&mut ds, model, plan.dyn_row, noise)
            .wrap_err_with(|| stage_err(Stage::Quality))?;
        info!("quality columns derived");

        evaluate_labs(&mut ds, model, plan.dyn_row, noise)
            .wrap_err_with(|| stage_err(Stage::Gain))?;
        info!(
            labs = model.labs.len(),
            lab_rows = model.process.lab_rows(),
            "lab outputs evaluated"
        );

        let artifact = finish(
            &mut ds,
            store,
            &*self.clock,
            fv,
            &self.assembly,
            &model.process,
        )
        .wrap_err_with(|| stage_err(Stage::Assemble))?;

        Ok(RunSummary {
            artifact,
            final_row: plan.final_row,
            dyn_row: plan.dyn_row,
            first_val: fv,
            seed: self.seed,
        })
    }
}
