//! Command bodies: config and sheet loading, generate, check and plan.

use std::path::{Path, PathBuf};

use eyre::WrapErr;
use millgen_config::{Config, SheetSet};
use millgen_core::error::Result as CoreResult;
use millgen_core::{
    AssemblyParams, CsvDirStore, GenError, Generator, GeneratorBuilder, ModelConfig, PlanReport,
    model_from_sheets,
};
use serde_json::json;
use tracing::{info, warn};

use crate::cli::json_mode;

/// Read, parse and validate the run config. Failures are typed as `GenError::Config`.
pub fn load_config(path: &Path) -> CoreResult<Config> {
    Config::from_path(path).map_err(|e| eyre::Report::new(GenError::Config(format!("{e:#}"))))
}

/// Directory sheet and output paths are resolved against.
pub fn config_base(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn resolve(base: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

/// Everything a command needs after loading.
pub struct RunContext {
    pub cfg: Config,
    pub base: PathBuf,
    pub model: ModelConfig,
    pub assembly: AssemblyParams,
}

pub fn load_context(cfg: Config, base: PathBuf) -> CoreResult<RunContext> {
    let sheets = SheetSet::load(&cfg, &base)
        .map_err(|e| eyre::Report::new(GenError::Config(format!("{e:#}"))))?;
    let model = model_from_sheets(&cfg, &sheets)?;
    let assembly = AssemblyParams::try_from(&cfg)?;
    info!(
        inputs = model.inputs.len(),
        state = model.state.len(),
        labs = model.labs.len(),
        "model loaded"
    );
    Ok(RunContext {
        cfg,
        base,
        model,
        assembly,
    })
}

fn builder(ctx: &RunContext, store: CsvDirStore) -> GeneratorBuilder {
    Generator::builder()
        .with_model(ctx.model.clone())
        .with_store(store)
        .with_assembly(ctx.assembly.clone())
}

pub fn run_generate(
    ctx: RunContext,
    seed: Option<u64>,
    out_dir: Option<PathBuf>,
) -> CoreResult<()> {
    let dir = out_dir.unwrap_or_else(|| resolve(&ctx.base, &ctx.cfg.output.dir));
    let store = CsvDirStore::new(&dir);
    let mut b = builder(&ctx, store.clone());
    if let Some(seed) = seed.or(ctx.cfg.seed) {
        b = b.with_seed(seed);
    }
    let mut generator = b.try_build()?;
    let summary = generator
        .run()
        .wrap_err_with(|| format!("generating into {}", dir.display()))?;
    let path = store.path_for(&summary.artifact);

    if json_mode() {
        println!(
            "{}",
            json!({
                "artifact": summary.artifact,
                "path": path.display().to_string(),
                "rows": summary.final_row,
                "dyn_row": summary.dyn_row,
                "first_val": summary.first_val,
                "seed": summary.seed,
            })
        );
    } else {
        if let Some(seed) = summary.seed {
            info!(seed, "run complete");
        }
        println!("{}", path.display());
    }
    Ok(())
}

fn plan_for(ctx: &RunContext) -> CoreResult<PlanReport> {
    let dir = resolve(&ctx.base, &ctx.cfg.output.dir);
    // the seed is irrelevant for planning; a fixed one avoids drawing
    let generator = builder(ctx, CsvDirStore::new(dir)).with_seed(0).try_build()?;
    generator.plan()
}

pub fn run_check(ctx: RunContext) -> CoreResult<()> {
    let plan = plan_for(&ctx)?;
    let seed = ctx.cfg.seed;
    if seed.is_none() {
        warn!("no seed configured; runs will not be reproducible");
    }
    if json_mode() {
        println!(
            "{}",
            json!({
                "status": "ok",
                "inputs": ctx.model.inputs.len(),
                "state": ctx.model.state.len(),
                "labs": ctx.model.labs.len(),
                "columns": plan.columns,
                "seed": seed,
            })
        );
    } else {
        println!(
            "OK: {} inputs, {} state variables, {} lab outputs ({} columns)",
            ctx.model.inputs.len(),
            ctx.model.state.len(),
            ctx.model.labs.len(),
            plan.columns
        );
    }
    Ok(())
}

pub fn run_plan(ctx: RunContext) -> CoreResult<()> {
    let plan = plan_for(&ctx)?;
    let r = &plan.rows;
    if json_mode() {
        println!(
            "{}",
            json!({
                "settle_rows": r.settle_rows,
                "steady_rows": r.steady_rows,
                "uncoupled_rows": r.uncoupled_rows,
                "resettle_rows": r.resettle_rows,
                "isolated_rows": r.isolated_rows,
                "validation_rows": r.validation_rows,
                "final_row": r.final_row,
                "dyn_row": r.dyn_row,
                "first_val": plan.first_val,
                "first_val_name": plan.first_val_name,
                "columns": plan.columns,
            })
        );
    } else {
        println!("settle_rows     {}", r.settle_rows);
        println!("steady          {}", r.steady_rows);
        println!("uncoupled       {}", r.uncoupled_rows);
        println!("re-settle       {}", r.resettle_rows);
        println!("isolated        {}", r.isolated_rows);
        println!("re-settle       {}", r.resettle_rows);
        println!("validation      {}", r.validation_rows);
        println!("final_row       {}", r.final_row);
        println!("dyn_row         {}", r.dyn_row);
        println!("first_val       {} ({})", plan.first_val, plan.first_val_name);
        println!("columns         {}", plan.columns);
    }
    Ok(())
}
