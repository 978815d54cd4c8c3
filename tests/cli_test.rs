// Integration tests for the trainboard binary
//
// Each test runs against its own temp base directory and database, with the
// config file pointed at a path that does not exist.

use anyhow::Result;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn trainboard(base: &Path, args: &[&str]) -> Result<Output> {
    let output = Command::new(env!("CARGO_BIN_EXE_trainboard"))
        .env("TRAINBOARD_CONFIG", base.join("missing.toml"))
        .env("TRAINBOARD_BASE_DIR", base)
        .env_remove("TRAINBOARD_DATABASE")
        .env("RUST_LOG", "warn")
        .args(args)
        .output()?;
    Ok(output)
}

const EXP1: &[&str] = &[
    "--title",
    "exp1",
    "--batch-size",
    "1",
    "--image-size",
    "1",
    "--n-validation",
    "1",
    "--n-test",
    "1",
    "--learning-rate",
    "0.001",
    "--group-size",
    "1",
    "--filters-root",
    "1",
];

fn create_exp1(base: &Path, optimizer: &str) -> Result<Output> {
    let mut args = vec!["run", "create", "--owner", "alice", "--optimizer", optimizer];
    args.extend_from_slice(EXP1);
    trainboard(base, &args)
}

#[test]
fn test_init_creates_layout() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output = trainboard(temp_dir.path(), &["init"])?;

    assert!(output.status.success());
    assert!(temp_dir.path().join("db.sqlite3").exists());
    assert!(temp_dir.path().join("train/train_logs").is_dir());
    assert!(temp_dir.path().join("train/tb_logs").is_dir());
    Ok(())
}

#[test]
fn test_create_and_show_json() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let base = temp_dir.path();

    assert!(trainboard(base, &["user", "add", "alice"])?.status.success());
    let created = create_exp1(base, "adam")?;
    assert!(
        created.status.success(),
        "{}",
        String::from_utf8_lossy(&created.stderr)
    );

    let shown = trainboard(base, &["run", "show", "1", "--json"])?;
    assert!(shown.status.success());
    let view: serde_json::Value = serde_json::from_slice(&shown.stdout)?;

    assert_eq!(view["pending"], true);
    assert_eq!(view["status"], "pending");
    assert_eq!(view["run"]["params"]["optimizer"], "adam");
    assert_eq!(view["run"]["command"], ".");
    assert_eq!(view["url"], "/train/1/");
    assert!(view["log_file"].as_str().unwrap_or_default().ends_with("exp1.log"));
    Ok(())
}

#[test]
fn test_invalid_optimizer_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let base = temp_dir.path();

    assert!(trainboard(base, &["user", "add", "alice"])?.status.success());
    let created = create_exp1(base, "rmsprop")?;

    assert!(!created.status.success());
    let stderr = String::from_utf8_lossy(&created.stderr);
    assert!(stderr.contains("optimizer 'rmsprop' should be either adam or sgd"));

    let listed = trainboard(base, &["run", "list", "--json"])?;
    let runs: serde_json::Value = serde_json::from_slice(&listed.stdout)?;
    assert_eq!(runs.as_array().map(|a| a.len()), Some(0));
    Ok(())
}

#[test]
fn test_record_launch_then_relaunch_fails() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let base = temp_dir.path();

    assert!(trainboard(base, &["user", "add", "alice"])?.status.success());
    assert!(create_exp1(base, "sgd")?.status.success());

    let launch = &["run", "record-launch", "1", "--pid", "4242", "--command", "python train.py"];
    assert!(trainboard(base, launch)?.status.success());

    let again = trainboard(base, launch)?;
    assert!(!again.status.success());
    assert!(String::from_utf8_lossy(&again.stderr).contains("already launched"));
    Ok(())
}

#[test]
fn test_negative_batch_size_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let base = temp_dir.path();

    assert!(trainboard(base, &["user", "add", "alice"])?.status.success());
    assert!(create_exp1(base, "adam")?.status.success());

    let edited = trainboard(base, &["run", "edit", "1", "--batch-size", "-4"])?;
    assert!(!edited.status.success());
    assert!(String::from_utf8_lossy(&edited.stderr).contains("batch_size"));
    Ok(())
}
