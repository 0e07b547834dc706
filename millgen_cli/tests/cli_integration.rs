use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

fn demo_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../demos/mill")
}

fn copy_dir(from: &Path, to: &Path) {
    fs::create_dir_all(to).unwrap();
    for entry in fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_dir(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), target).unwrap();
        }
    }
}

// A private copy of the demo mill so tests can edit sheets and write output
fn write_demo(dir: &tempfile::TempDir) -> PathBuf {
    let root = dir.path().join("mill");
    copy_dir(&demo_dir(), &root);
    root.join("millgen.toml")
}

fn millgen(cfg: &Path) -> Command {
    let mut cmd = Command::cargo_bin("millgen").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd.arg("--config").arg(cfg);
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["check"], 0, "OK: 15 inputs, 15 state variables, 2 lab outputs", "stdout")]
#[case(&["plan"], 0, "final_row       4146", "stdout")]
#[case(&["plan"], 0, "first_val       13 (MV_ThinStockFlow)", "stdout")]
#[case(&["generate", "--seed"], 2, "value is required", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_demo(&dir);
    let mut cmd = millgen(&cfg);
    for a in args {
        cmd.arg(a);
    }
    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn generate_writes_one_artifact_and_removes_the_spill() {
    let dir = tempdir().unwrap();
    let cfg = write_demo(&dir);
    let out = dir.path().join("out");

    let output = millgen(&cfg)
        .arg("generate")
        .arg("--out-dir")
        .arg(&out)
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");
    let printed = String::from_utf8(output.stdout).unwrap();
    let path = PathBuf::from(printed.trim());
    assert!(path.exists(), "{path:?}");
    assert!(!out.join("data.csv").exists());
    assert_eq!(fs::read_dir(&out).unwrap().count(), 1);

    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4146);
    assert!(lines[0].starts_with("TIME,MV_SWSpecificEnergy,"));
    assert!(lines[1].starts_with(",kWh/t,"));
    assert!(lines[2].starts_with("01/15/24 00:00:00,"));
}

#[rstest]
fn same_seed_gives_identical_files() {
    let dir = tempdir().unwrap();
    let cfg = write_demo(&dir);
    let mut contents = Vec::new();
    for run in ["a", "b"] {
        let out = dir.path().join(run);
        let output = millgen(&cfg)
            .args(["generate", "--seed", "7", "--out-dir"])
            .arg(&out)
            .output()
            .unwrap();
        assert!(output.status.success(), "{output:?}");
        let path = String::from_utf8(output.stdout).unwrap();
        contents.push(fs::read_to_string(path.trim()).unwrap());
    }
    assert_eq!(contents[0], contents[1]);
}

#[rstest]
fn json_generate_reports_the_run() {
    let dir = tempdir().unwrap();
    let cfg = write_demo(&dir);
    let output = millgen(&cfg)
        .args(["--json", "--log-level", "warn", "generate", "--out-dir"])
        .arg(dir.path().join("out"))
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");
    let v: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(v["rows"], 4146);
    assert_eq!(v["seed"], 42);
    assert_eq!(v["first_val"], 13);
    assert!(v["path"].as_str().unwrap().ends_with(".csv"));
}

#[rstest]
fn bad_number_in_a_sheet_exits_with_parse_code() {
    let dir = tempdir().unwrap();
    let cfg = write_demo(&dir);
    let inputs = cfg.with_file_name("inputs.csv");
    let text = fs::read_to_string(&inputs).unwrap();
    fs::write(&inputs, text.replace(",4,4,4,400,", ",4,4,4,4oo,")).unwrap();

    millgen(&cfg)
        .arg("check")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("\"4oo\" for 'MV_SWFlow'"));
}

#[rstest]
fn unknown_gain_variable_exits_with_config_code() {
    let dir = tempdir().unwrap();
    let cfg = write_demo(&dir);
    let sheet = cfg.with_file_name("lab").join("Lab_Tensile.csv");
    let text = fs::read_to_string(&sheet).unwrap();
    fs::write(&sheet, text.replace("MV_PressLoad,", "MV_PressLode,")).unwrap();

    millgen(&cfg)
        .args(["--json", "check"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("\"reason\":\"VariableNotFound\""))
        .stdout(predicate::str::contains("MV_PressLode"));
}

#[rstest]
fn skipping_quality_rows_a_lab_reads_fails_check() {
    let dir = tempdir().unwrap();
    let cfg = write_demo(&dir);
    let text = fs::read_to_string(&cfg).unwrap();
    fs::write(&cfg, text.replace("skip_rows = 0", "skip_rows = 5")).unwrap();

    millgen(&cfg)
        .arg("check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("QCS_BasisWeight"));
}

#[rstest]
fn missing_config_exits_with_config_code() {
    let dir = tempdir().unwrap();
    millgen(&dir.path().join("nope.toml"))
        .arg("plan")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("What happened: The configuration could not be loaded"));
}

#[rstest]
fn unwritable_output_exits_with_storage_code() {
    let dir = tempdir().unwrap();
    let cfg = write_demo(&dir);
    // a regular file where the output directory should be
    let blocker = dir.path().join("blocked");
    fs::write(&blocker, "x").unwrap();

    millgen(&cfg)
        .arg("generate")
        .arg("--out-dir")
        .arg(&blocker)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("What happened: Reading or writing a table failed"));
}

#[rstest]
fn log_file_is_written_when_configured() {
    let dir = tempdir().unwrap();
    let cfg = write_demo(&dir);
    let text = fs::read_to_string(&cfg).unwrap();
    fs::write(
        &cfg,
        text.replace("[logging]\n", "[logging]\nfile = \"logs/millgen.log\"\n"),
    )
    .unwrap();

    millgen(&cfg).arg("check").assert().success();
    let log = fs::read_to_string(cfg.with_file_name("logs").join("millgen.log")).unwrap();
    assert!(log.contains("model loaded"), "{log}");
}
