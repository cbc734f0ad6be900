use std::fs;
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

fn kraken() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_kraken"));
    command.env_remove("RUST_LOG").env_remove("MILK_PROC_DIR");
    command
}

#[test]
fn test_init_writes_settings() {
    let temp_dir = TempDir::new().unwrap();

    let output = kraken()
        .current_dir(temp_dir.path())
        .arg("init")
        .output()
        .expect("Failed to run init command");
    assert!(output.status.success());

    let config_path = temp_dir.path().join(".kraken/settings.toml");
    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("version = 1"));
    assert!(content.contains("[server]"));
    assert!(content.contains("[tracking.process]"));

    // second init without --force fails
    let output = kraken()
        .current_dir(temp_dir.path())
        .arg("init")
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_config_reads_workspace_settings() {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = temp_dir.path().join(".kraken");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("settings.toml"), "[server]\nport = 23456\n").unwrap();

    let output = kraken()
        .current_dir(temp_dir.path())
        .arg("config")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("port = 23456"));
}

#[test]
fn test_digest_prints_both_roots() {
    let proc_dir = TempDir::new().unwrap();
    let share_dir = TempDir::new().unwrap();
    fs::write(proc_dir.path().join("proc.loop.4242.shm"), b"").unwrap();
    fs::create_dir_all(share_dir.path().join("x/y")).unwrap();
    fs::write(share_dir.path().join("x/y/log.run.txt"), b"hi").unwrap();

    let output = kraken()
        .current_dir(proc_dir.path())
        .arg("digest")
        .arg("--proc-dir")
        .arg(proc_dir.path())
        .arg("--share-dir")
        .arg(share_dir.path())
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let digest: Value = serde_json::from_slice(&output.stdout).unwrap();
    let index = digest["process"]["index"].as_array().unwrap();
    assert_eq!(index.len(), 1);
    let key = index[0].as_str().unwrap();
    assert_eq!(digest["process"]["data"][key]["pid"], 4242);
    assert_eq!(digest["process"]["data"][key]["name"], "loop");
    assert_eq!(digest["share"]["logFiles"].as_array().unwrap().len(), 1);
}
