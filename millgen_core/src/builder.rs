//! `Generator` and its builder.
//!
//! The builder collects the model and the three collaborators (table store,
//! noise source, clock). `try_build()` validates the parameters the pipeline
//! relies on and fills in defaults for anything optional.

use chrono::{DateTime, Local, NaiveDateTime, NaiveTime};
use millgen_traits::{Clock, NoiseSource, SystemClock, TableStore};
use tracing::info;

use crate::config::AssemblyParams;
use crate::error::{BuildError, Result};
use crate::model::ModelConfig;
use crate::noise::SeededNoise;

/// Default name of the intermediate spill table.
pub const DEFAULT_SPILL_NAME: &str = "data";

/// One configured generation run.
pub struct Generator {
    pub(crate) model: ModelConfig,
    pub(crate) store: Box<dyn TableStore>,
    pub(crate) noise: Box<dyn NoiseSource>,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) assembly: AssemblyParams,
    pub(crate) seed: Option<u64>,
}

impl core::fmt::Debug for Generator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Generator")
            .field("inputs", &self.model.inputs.len())
            .field("state", &self.model.state.len())
            .field("labs", &self.model.labs.len())
            .field("seed", &self.seed)
            .field("start", &self.assembly.start)
            .field("spill_name", &self.assembly.spill_name)
            .finish_non_exhaustive()
    }
}

impl Generator {
    pub fn builder() -> GeneratorBuilder {
        GeneratorBuilder::default()
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    /// Seed of the built-in noise stream; `None` when a custom source was injected.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn assembly(&self) -> &AssemblyParams {
        &self.assembly
    }
}

#[derive(Default)]
pub struct GeneratorBuilder {
    model: Option<ModelConfig>,
    store: Option<Box<dyn TableStore>>,
    noise: Option<Box<dyn NoiseSource>>,
    seed: Option<u64>,
    clock: Option<Box<dyn Clock>>,
    start: Option<NaiveDateTime>,
    spill_name: Option<String>,
}

impl GeneratorBuilder {
    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_store(mut self, store: impl TableStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Inject a noise source. Takes precedence over `with_seed`.
    pub fn with_noise(mut self, noise: impl NoiseSource + 'static) -> Self {
        self.noise = Some(Box::new(noise));
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Timestamp of the first data row. Defaults to midnight today (clock's local date).
    pub fn with_start(mut self, start: NaiveDateTime) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_spill_name(mut self, name: impl Into<String>) -> Self {
        self.spill_name = Some(name.into());
        self
    }

    /// Start time and spill name from an already loaded config.
    pub fn with_assembly(mut self, assembly: AssemblyParams) -> Self {
        self.start = Some(assembly.start);
        self.spill_name = Some(assembly.spill_name);
        self
    }

    pub fn try_build(self) -> Result<Generator> {
        let model = self
            .model
            .ok_or_else(|| eyre::Report::new(BuildError::MissingModel))?;
        let store = self
            .store
            .ok_or_else(|| eyre::Report::new(BuildError::MissingStore))?;

        // ── Validation ───────────────────────────────────────────────────────
        let p = &model.process;
        if p.base_period_s == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig("base_period_s must be > 0")));
        }
        if [p.lab_period_s, p.qcs_period_s, p.pulpeye_period_s]
            .iter()
            .any(|&v| v == 0 || v % p.base_period_s != 0)
        {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "reporting periods must be positive multiples of base_period_s",
            )));
        }
        if !(p.trim.is_finite() && p.trim > 0.0) {
            return Err(eyre::Report::new(BuildError::InvalidConfig("trim must be > 0")));
        }
        if !(p.draw.is_finite() && p.draw > 0.0) {
            return Err(eyre::Report::new(BuildError::InvalidConfig("draw must be > 0")));
        }
        let q = &model.quality;
        if !q.min_machine_speed.is_finite() || q.min_machine_speed < 0.0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "min_machine_speed must be >= 0",
            )));
        }
        model.check_quality_skip()?;
        let spill_name = self.spill_name.unwrap_or_else(|| DEFAULT_SPILL_NAME.to_string());
        if spill_name.trim().is_empty() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "spill name must not be empty",
            )));
        }

        // ── Defaults ─────────────────────────────────────────────────────────
        let clock: Box<dyn Clock> = self.clock.unwrap_or_else(|| Box::new(SystemClock::new()));
        let start = self.start.unwrap_or_else(|| {
            let today: DateTime<Local> = clock.now().into();
            today.date_naive().and_time(NaiveTime::MIN)
        });
        let (noise, seed): (Box<dyn NoiseSource>, Option<u64>) = match (self.noise, self.seed) {
            (Some(n), _) => (n, None),
            (None, Some(seed)) => (Box::new(SeededNoise::new(seed)), Some(seed)),
            (None, None) => {
                let seed = rand::random::<u64>();
                info!(seed, "no seed configured; drew a random one");
                (Box::new(SeededNoise::new(seed)), Some(seed))
            }
        };

        Ok(Generator {
            model,
            store,
            noise,
            clock,
            assembly: AssemblyParams { start, spill_name },
            seed,
        })
    }
}
