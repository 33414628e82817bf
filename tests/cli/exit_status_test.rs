//! The binary's exit status is the CI gate; check it end to end.

use std::path::Path;

use assert_cmd::Command;

use crate::support::serve;

const REAL_TWEET: &str = r#"{"success":true,"tweetId":"1987654321098765432"}"#;
const MOCK_TWEET: &str = r#"{"success":true,"tweetId":"mock-12345"}"#;
const DISABLED: &str = r#"{"success":false,"disabled":true,"error":"keys not configured"}"#;

fn truth_serum(cwd: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_truth-serum"));
    cmd.current_dir(cwd)
        .env_remove("TRUTH_SERUM_CONFIG")
        .env_remove("TRUTH_SERUM_ARTIFACTS_DIR")
        .env_remove("TRUTH_SERUM_REQUEST_TIMEOUT_SECS")
        .env("RUST_LOG", "warn");
    cmd
}

fn probe_twitter(body: &'static str, extra: &[&str]) -> (assert_cmd::assert::Assert, tempfile::TempDir) {
    let server = serve(&[("/twitter", 200, body)]);
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let artifacts = tmp.path().join("artifacts");
    let assert = truth_serum(tmp.path())
        .arg("--base-url")
        .arg(&server.base_url)
        .args(["--platform", "twitter"])
        .arg("--artifacts-dir")
        .arg(&artifacts)
        .args(extra)
        .assert();
    (assert, tmp)
}

#[test]
fn verified_claim_exits_zero() {
    let (assert, tmp) = probe_twitter(REAL_TWEET, &[]);
    let output = assert.code(0).get_output().clone();

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[PASS] twitter"));
    assert!(stdout.contains("# Truth Serum: ALL CLAIMS VERIFIED"));

    let reports = std::fs::read_dir(tmp.path().join("artifacts/reports"))
        .expect("reports dir")
        .count();
    assert_eq!(reports, 2, "json and markdown report");
}

#[test]
fn fabricated_claim_exits_two() {
    let (assert, _tmp) = probe_twitter(MOCK_TWEET, &[]);
    let output = assert.code(2).get_output().clone();
    assert!(String::from_utf8_lossy(&output.stdout).contains("DISHONESTY DETECTED"));
}

#[test]
fn disabled_target_exits_one_unless_allowed() {
    let (strict, _a) = probe_twitter(DISABLED, &[]);
    strict.code(1);

    let (lenient, _b) = probe_twitter(DISABLED, &["--allow-disabled"]);
    lenient.code(0);
}

#[test]
fn json_flag_prints_machine_readable_report() {
    let (assert, _tmp) = probe_twitter(MOCK_TWEET, &["--json"]);
    let output = assert.code(2).get_output().clone();

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be one json document");
    assert_eq!(report["exitCode"], 2);
    assert_eq!(report["verdicts"][0]["verdictKind"], "LIAR_DETECTED");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[LIAR_DETECTED] twitter"));
}

#[test]
fn usage_errors_do_not_look_like_dishonesty() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    truth_serum(tmp.path())
        .args(["--local", "--cloud"])
        .assert()
        .code(1);
}

#[test]
fn missing_explicit_config_fails() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    truth_serum(tmp.path())
        .args(["--config", "does-not-exist.toml", "--local"])
        .assert()
        .code(1);
}

#[test]
fn clean_wipes_cache_before_the_run() {
    let server = serve(&[("/twitter", 200, REAL_TWEET)]);
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let artifacts = tmp.path().join("artifacts");
    let cache = artifacts.join("cache");
    std::fs::create_dir_all(&cache).expect("create cache");
    std::fs::write(cache.join("stale.json"), b"{}").expect("write cache entry");

    truth_serum(tmp.path())
        .arg("--clean")
        .arg("--base-url")
        .arg(&server.base_url)
        .args(["--platform", "twitter"])
        .arg("--artifacts-dir")
        .arg(&artifacts)
        .assert()
        .code(0);

    assert!(!cache.exists());
}
