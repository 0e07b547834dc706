use std::path::PathBuf;

use millgen_config::{Config, Sheet, SheetSet};
use millgen_core::mocks::MemoryStore;
use millgen_core::{AssemblyParams, GenError, Generator, model_from_sheets};

fn demo_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../demos/mill")
}

fn load_demo() -> (Config, SheetSet) {
    let dir = demo_dir();
    let cfg = Config::from_path(&dir.join("millgen.toml")).expect("demo config");
    cfg.validate().expect("demo config validates");
    let sheets = SheetSet::load(&cfg, &dir).expect("demo sheets");
    (cfg, sheets)
}

#[test]
fn demo_sheets_build_the_mill_model() {
    let (cfg, sheets) = load_demo();
    let model = model_from_sheets(&cfg, &sheets).unwrap();
    assert_eq!(model.inputs.len(), 15);
    assert_eq!(model.state.len(), 15);
    assert_eq!(model.labs.len(), 2);
    assert_eq!(model.gains.len(), 2);

    let flow = model.inputs.get("MV_ThinStockFlow").unwrap();
    assert_eq!(flow.move_order, 12);
    assert_eq!(flow.validation, vec![Some(6500.0)]);
}

#[test]
fn demo_plan_matches_the_expected_rows() {
    let (cfg, sheets) = load_demo();
    let model = model_from_sheets(&cfg, &sheets).unwrap();
    let assembly = AssemblyParams::try_from(&cfg).unwrap();
    let generator = Generator::builder()
        .with_model(model)
        .with_store(MemoryStore::new())
        .with_assembly(assembly)
        .with_seed(cfg.seed.unwrap_or(0))
        .try_build()
        .unwrap();
    let plan = generator.plan().unwrap();
    assert_eq!(plan.rows.final_row, 4146);
    assert_eq!(plan.first_val_name, "MV_ThinStockFlow");
}

#[test]
fn unknown_gain_variable_is_reported_with_its_lab() {
    let (cfg, mut sheets) = load_demo();
    let (lab, sheet) = sheets.labs.remove(0);
    let mut rows: Vec<Vec<String>> = (1..=sheet.row_count())
        .map(|r| {
            (1..=sheet.col_count())
                .map(|c| sheet.cell(r, c).unwrap_or("").to_string())
                .collect()
        })
        .collect();
    rows[1][0] = "MV_Nonexistent".into();
    sheets.labs.insert(0, (lab.clone(), Sheet::from_rows(lab.as_str(), rows)));

    match model_from_sheets(&cfg, &sheets).unwrap_err() {
        GenError::VariableNotFound { name, context, .. } => {
            assert_eq!(name, "MV_Nonexistent");
            assert!(context.contains(&lab), "{context}");
        }
        other => panic!("expected VariableNotFound, got: {other:?}"),
    }
}
