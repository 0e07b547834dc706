use thiserror::Error;

/// Pipeline stage, used to locate failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Sequencer,
    State,
    Spill,
    Quality,
    Gain,
    Assemble,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Sequencer => "input sequencer",
            Stage::State => "state model",
            Stage::Spill => "spill",
            Stage::Quality => "quality calculator",
            Stage::Gain => "gain model",
            Stage::Assemble => "dataset assembler",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenError {
    #[error("variable not found: '{name}' is not in the {table} table (referenced by {context})")]
    VariableNotFound {
        name: String,
        table: &'static str,
        context: String,
    },
    #[error("parse error in sheet '{sheet}' row {row} for '{variable}': expected a number, got {value:?}")]
    Parse {
        sheet: String,
        row: usize,
        variable: String,
        value: String,
    },
    #[error("{stage}: no value at row {row} for '{variable}'")]
    MissingValue {
        stage: Stage,
        row: usize,
        variable: String,
    },
    #[error("storage error: {0}")]
    Storage(String),
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing model configuration")]
    MissingModel,
    #[error("missing table store")]
    MissingStore,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
