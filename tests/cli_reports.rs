use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_onset_silence_cli"))
}

/// Write a mono 16-bit WAV: one second of silence, one of a 440 Hz tone
fn write_fixture(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("onset_silence_{name}.wav"));
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).expect("create fixture");
    for i in 0..32000 {
        let sample = if i < 16000 {
            0.0
        } else {
            (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16000.0).sin() * 0.5
        };
        writer
            .write_sample((sample * i16::MAX as f32) as i16)
            .expect("write sample");
    }
    writer.finalize().expect("finalize fixture");
    path
}

fn run_json(args: &[&str], input: &Path) -> Value {
    let output = cli()
        .args(args)
        .arg("--input")
        .arg(input)
        .output()
        .expect("failed to run onset_silence_cli");
    assert!(
        output.status.success(),
        "CLI exited with {:?}: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    serde_json::from_str(stdout.trim()).expect("feature report JSON payload")
}

#[test]
fn silence_report_lists_transition() {
    let input = write_fixture("silence_report");
    let json = run_json(&["silence"], &input);

    assert_eq!(json["plugin"], "silence");
    assert_eq!(json["plugin_version"], 3);
    let features = json["features"].as_array().expect("features array");
    let levels: Vec<&Value> = features
        .iter()
        .filter(|f| f["output"] == "silence-level")
        .collect();
    assert_eq!(levels.len(), 2);
    let transition = levels[1]["timestamp"].as_f64().unwrap_or_default();
    assert!((transition - 1.0).abs() < 1024.0 / 16000.0);
}

#[test]
fn silence_report_api_version_1() {
    let input = write_fixture("silence_v1");
    let json = run_json(&["silence", "--api-version", "1"], &input);

    assert_eq!(json["plugin_version"], 2);
    let features = json["features"].as_array().expect("features array");
    assert!(features.iter().any(|f| f["output"] == "silence-start"));
    assert!(features.iter().any(|f| f["output"] == "silence-end"));
}

#[test]
fn onset_report_has_detection_function() {
    let input = write_fixture("onset_report");
    let json = run_json(&["onsets", "--function", "hfc", "--step", "512"], &input);

    assert_eq!(json["plugin"], "onset");
    let features = json["features"].as_array().expect("features array");
    let detection = features
        .iter()
        .filter(|f| f["output"] == "detection-function")
        .count();
    assert_eq!(detection, 32000 / 512 + 1);
}

#[test]
fn unknown_function_is_rejected() {
    let input = write_fixture("bad_function");
    let output = cli()
        .args(["onsets", "--function", "flux", "--input"])
        .arg(&input)
        .output()
        .expect("failed to run onset_silence_cli");
    assert!(!output.status.success());
}

#[test]
fn dump_config_prints_defaults() {
    let output = cli()
        .arg("dump-config")
        .output()
        .expect("failed to run dump-config");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let json: Value = serde_json::from_str(stdout.trim()).expect("config JSON");
    assert_eq!(json["onset"]["function"], "mkl");
    assert_eq!(json["silence"]["threshold_db"], -80.0);
}
