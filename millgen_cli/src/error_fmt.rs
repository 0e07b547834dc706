//! Human-readable error descriptions and structured JSON error formatting.

use millgen_core::error::{BuildError, GenError};
use serde_json::json;

const DEBUG_HINT: &str = "Re-run with --log-level=debug or set RUST_LOG for more detail.";

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingModel | BuildError::MissingStore => format!(
                "What happened: The generator was assembled without a {}.\nLikely causes: Internal wiring error in the CLI.\nHow to fix: {DEBUG_HINT}",
                if matches!(be, BuildError::MissingModel) { "model" } else { "table store" }
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the [process] or [quality] section.\nHow to fix: Edit the config file, then rerun `millgen check`."
            ),
        };
    }

    if let Some(ge) = err.downcast_ref::<GenError>() {
        return match ge {
            GenError::VariableNotFound { name, table, context } => format!(
                "What happened: '{name}' is not a column of the {table} table (needed by {context}).\nLikely causes: A misspelled variable name in a sheet, or a required mill variable missing from inputs.csv / state.csv.\nHow to fix: Add the variable to its sheet or correct the name, then rerun `millgen check`."
            ),
            GenError::Parse { sheet, row, variable, value } => format!(
                "What happened: Sheet '{sheet}' row {row} has {value:?} for '{variable}', which is not a number.\nLikely causes: A stray character, a unit suffix, or a decimal comma in the CSV.\nHow to fix: Fix that cell so it holds a plain decimal number or is left blank."
            ),
            GenError::MissingValue { stage, row, variable } => format!(
                "What happened: The {stage} stage found no value for '{variable}' at row {row}.\nLikely causes: A column was not generated before it was read.\nHow to fix: {DEBUG_HINT}"
            ),
            GenError::Storage(msg) => format!(
                "What happened: Reading or writing a table failed ({msg}).\nLikely causes: The output directory is not writable, the disk is full, or a spill file was removed mid-run.\nHow to fix: Check permissions and free space for output.dir or --out-dir."
            ),
            GenError::Config(msg) => format!(
                "What happened: The configuration could not be loaded ({msg}).\nLikely causes: Wrong --config path, invalid TOML, or a value failing validation.\nHow to fix: Edit the config and its sheets, then rerun `millgen check`."
            ),
        };
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.chain().nth(1) {
        cause = format!(" Cause: {src}");
    }
    format!("Something went wrong.{cause}\nHow to fix: {DEBUG_HINT} Original: {msg}")
}

/// Stable reason name for JSON output.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingModel => "MissingModel",
            BuildError::MissingStore => "MissingStore",
            BuildError::InvalidConfig(_) => "InvalidConfig",
        };
    }
    match err.downcast_ref::<GenError>() {
        Some(GenError::VariableNotFound { .. }) => "VariableNotFound",
        Some(GenError::Parse { .. }) => "Parse",
        Some(GenError::MissingValue { .. }) => "MissingValue",
        Some(GenError::Storage(_)) => "Storage",
        Some(GenError::Config(_)) => "Config",
        None => "Error",
    }
}

/// Exit codes: configuration 2, sheet parse 3, storage 4, anything else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(BuildError::InvalidConfig(_)) = err.downcast_ref::<BuildError>() {
        return 2;
    }
    match err.downcast_ref::<GenError>() {
        Some(GenError::Config(_) | GenError::VariableNotFound { .. }) => 2,
        Some(GenError::Parse { .. }) => 3,
        Some(GenError::Storage(_)) => 4,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    let mut obj = json!({
        "reason": reason_name(err),
        "message": humanize(err),
        "exit_code": exit_code_for_error(err),
    });
    match err.downcast_ref::<GenError>() {
        Some(GenError::VariableNotFound { name, table, context }) => {
            obj["details"] = json!({ "name": name, "table": table, "context": context });
        }
        Some(GenError::Parse { sheet, row, variable, value }) => {
            obj["details"] = json!({
                "sheet": sheet,
                "row": row,
                "variable": variable,
                "value": value,
            });
        }
        Some(GenError::MissingValue { stage, row, variable }) => {
            obj["details"] = json!({
                "stage": stage.to_string(),
                "row": row,
                "variable": variable,
            });
        }
        _ => {}
    }
    obj.to_string()
}
