use assert_cmd::Command;

fn bin() -> Command {
    Command::cargo_bin("fifteen-twenty").unwrap()
}

#[test]
fn rules_flag_prints_rules_without_a_tty() {
    let dir = tempfile::tempdir().unwrap();
    let output = bin()
        .args(["--rules", "-t", "3", "-c"])
        .arg(dir.path().join("config.json"))
        .output()
        .unwrap();

    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("Fifteen-Twenty rules:"));
    assert!(text.contains("until 3 decisive rounds"));
}

#[test]
fn save_config_writes_effective_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    bin()
        .args(["--rules", "--save-config", "--timeout-secs", "9", "-c"])
        .arg(&path)
        .assert()
        .success();

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved["round_timeout_ms"], 9000);
}

#[test]
fn invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"target_valid_rounds": 0}"#).unwrap();

    bin().arg("--rules").arg("-c").arg(&path).assert().failure();
}

#[test]
fn help_lists_flags() {
    let output = bin().arg("--help").output().unwrap();
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("--target-rounds"));
    assert!(text.contains("--rules"));
}
