use millgen_config::load_toml;
use rstest::rstest;

const BASE: &str = r#"
start = "01/15/24"

[process]
base_period_s = 5
lab_period_s = 3600
qcs_period_s = 30
pulpeye_period_s = 60
uncoupled_moves = 2
coupled_moves = 3
isolated_moves = 1
trim = 200.0
draw = 1.02
settle_s = 600
"#;

#[test]
fn accepts_minimal_config_with_defaults() {
    let cfg = load_toml(BASE).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.seed, None);
    assert_eq!(cfg.quality.skip_rows, 0);
    assert!((cfg.quality.min_machine_speed - 1.0).abs() < f64::EPSILON);
    assert_eq!(cfg.output.spill_name, "data");
    assert_eq!(cfg.sheets.lab_dir.to_str(), Some("lab"));
}

#[test]
fn accepts_short_key_aliases() {
    let toml = r#"
start = "01/15/24 06:30:00"
seed = 7

[process]
process = 5
lab = 60
qcs = 15
pulpeye = 10
uncoupled = 1
trim = 150.0
draw = 1.0
settle = 30
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("aliases should validate");
    assert_eq!(cfg.process.base_period_s, 5);
    assert_eq!(cfg.process.coupled_moves, 0);
    assert_eq!(cfg.seed, Some(7));
}

#[rstest]
#[case("base_period_s = 5", "base_period_s = 0", "base_period_s must be > 0")]
#[case("qcs_period_s = 30", "qcs_period_s = 32", "qcs_period_s must be a multiple")]
#[case("lab_period_s = 3600", "lab_period_s = 0", "lab_period_s must be > 0")]
#[case("trim = 200.0", "trim = 0.0", "trim must be > 0")]
#[case("draw = 1.02", "draw = -1.0", "draw must be > 0")]
fn rejects_bad_process_values(#[case] from: &str, #[case] to: &str, #[case] needle: &str) {
    let cfg = load_toml(&BASE.replace(from, to)).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}").contains(needle),
        "unexpected message: {err}"
    );
}

#[test]
fn rejects_unknown_rotation() {
    let toml = format!("{BASE}\n[logging]\nrotation = \"weekly\"\n");
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("weekly is not supported");
    assert!(format!("{err}").contains("logging.rotation"));
}

#[test]
fn missing_process_section_is_a_parse_error() {
    assert!(load_toml("start = \"01/15/24\"\n").is_err());
}
