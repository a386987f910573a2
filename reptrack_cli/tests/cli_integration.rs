use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

const ONE_REP: [f64; 9] = [178.0, 170.0, 130.0, 95.0, 88.0, 92.0, 130.0, 170.0, 179.0];

fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = format!(
        r#"
[phase]
top_threshold = 150.0
bottom_threshold = 100.0
hysteresis = 5.0
movement_threshold = 3.0
min_dwell_frames = 1

[counter]
min_rep_duration_s = 2.0
max_rep_duration_s = 10.0
min_form_score = 60.0

[gate]
min_confidence = 0.5
min_visible_keypoints = 10

[output]
dir = "{}"
"#,
        dir.path().join("out").display()
    );
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn write_samples(dir: &Path, dt: f64) -> PathBuf {
    let path = dir.join("samples.csv");
    let mut f = fs::File::create(&path).unwrap();
    writeln!(f, "timestamp,angle,confidence,visible_keypoints,form_score").unwrap();
    for (i, a) in ONE_REP.iter().enumerate() {
        writeln!(f, "{:.3},{a},0.9,33,", i as f64 * dt).unwrap();
    }
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["replay", "--samples", "{samples}", "--session-id", "t1"], 0, "Reps: 1 valid / 1 completed", "stdout")]
#[case(&["replay"], 2, "required", "stderr")]
#[case(&["check-config"], 0, "Config OK", "stdout")]
#[case(&["replay", "--samples", "{dir}/missing.csv"], 4, "Could not open the samples file", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let samples = write_samples(dir.path(), 0.3);

    let mut cmd = Command::cargo_bin("reptrack").unwrap();
    // Always include a valid config to avoid relying on defaults
    cmd.arg("--config").arg(&cfg).arg("--log-level").arg("error");
    for a in args {
        let a = a
            .replace("{samples}", &samples.display().to_string())
            .replace("{dir}", &dir.path().display().to_string());
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
fn replay_writes_session_documents() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let samples = write_samples(dir.path(), 0.3);

    Command::cargo_bin("reptrack")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("replay")
        .arg("--samples")
        .arg(&samples)
        .arg("--session-id")
        .arg("docs")
        .assert()
        .success();

    let out = dir.path().join("out");
    for name in ["transitions_docs.json", "attempts_docs.json", "summary_docs.json"] {
        assert!(out.join(name).exists(), "{name} missing");
    }
}

#[rstest]
fn no_export_skips_documents() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let samples = write_samples(dir.path(), 0.3);

    Command::cargo_bin("reptrack")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("replay")
        .arg("--samples")
        .arg(&samples)
        .arg("--no-export")
        .assert()
        .success();
    assert!(!dir.path().join("out").exists());
}

#[rstest]
fn fast_recording_counts_no_valid_reps() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let samples = write_samples(dir.path(), 0.05);

    Command::cargo_bin("reptrack")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("replay")
        .arg("--samples")
        .arg(&samples)
        .arg("--no-export")
        .assert()
        .success()
        .stdout(predicate::str::contains("Reps: 0 valid / 1 completed"));
}

#[rstest]
fn cli_reports_invalid_thresholds() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, "[phase]\ntop_threshold = 90.0\nbottom_threshold = 100.0\n").unwrap();

    Command::cargo_bin("reptrack")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("check-config")
        .assert()
        .code(3)
        .stderr(predicate::str::contains(
            "phase.bottom_threshold must be < phase.top_threshold",
        ));
}

#[rstest]
fn cli_reports_unparseable_config() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, "[phase]\ntop_threshold = \"high\"\n").unwrap();

    Command::cargo_bin("reptrack")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("check-config")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("config file could not be loaded"));
}

#[rstest]
fn cli_reports_bad_samples_header() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let bad_csv = dir.path().join("bad.csv");
    let mut f = fs::File::create(&bad_csv).unwrap();
    writeln!(f, "t,angle").unwrap();
    writeln!(f, "0.0,170").unwrap();

    Command::cargo_bin("reptrack")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("replay")
        .arg("--samples")
        .arg(&bad_csv)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Invalid headers in samples CSV"));
}

#[rstest]
fn log_file_sink_is_created() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("reptrack.log");
    let cfg = dir.path().join("cfg.toml");
    fs::write(
        &cfg,
        format!("[logging]\nfile = \"{}\"\nrotation = \"never\"\n", log.display()),
    )
    .unwrap();

    Command::cargo_bin("reptrack")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("check-config")
        .assert()
        .success();
    assert!(log.exists());
}

#[rstest]
fn shipped_sample_config_is_valid() {
    let cfg = Path::new(env!("CARGO_MANIFEST_DIR")).join("../etc/reptrack.toml");
    Command::cargo_bin("reptrack")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("check-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("top 150° / bottom 100°"));
}

#[rstest]
fn path_like_session_id_is_refused() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let samples = write_samples(dir.path(), 0.3);

    Command::cargo_bin("reptrack")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("replay")
        .arg("--samples")
        .arg(&samples)
        .arg("--session-id")
        .arg("../escape")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("cannot be used in output file names"));

    assert!(!dir.path().join("summary_escape.json").exists());
    assert!(!dir.path().join("out").exists());
}
