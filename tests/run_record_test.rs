// Integration tests: training run records on an on-disk database
//
// Covers the submit → launch → liveness flow and the end-to-end scenarios
// for valid and invalid submissions.

use anyhow::Result;
use std::collections::HashSet;
use tempfile::TempDir;

use trainboard::runs::{LaunchRecord, LogLayout, PathRoutes, RunForm, RunPhase, RunStatus};
use trainboard::{Optimizer, RunStore, StoreError, SystemSupervisor, ValidationError};

fn exp1_form() -> RunForm {
    RunForm {
        title: "exp1".to_string(),
        batch_size: 1,
        image_size: 1,
        n_validation: 1,
        n_test: 1,
        learning_rate: 0.001,
        optimizer: "adam".to_string(),
        group_size: 1,
        filters_root: 1,
        augment: false,
    }
}

#[test]
fn test_valid_submission_is_pending() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = RunStore::open(temp_dir.path().join("db.sqlite3"))?;
    let layout = LogLayout::new(temp_dir.path());
    let owner = store.create_user("alice")?;

    let run = store.create_run(&owner, &exp1_form())?;

    assert!(run.is_pending_run());
    assert_eq!(run.process_id(), 0);
    assert_eq!(run.port, None);
    assert_eq!(run.command, ".");
    assert_eq!(run.params.optimizer, Optimizer::Adam);
    assert!(run.log_file_path(&layout).ends_with("exp1.log"));
    assert_eq!(run.to_string(), "exp1");
    assert_eq!(
        run.canonical_url(&PathRoutes::default()),
        format!("/train/{}/", run.id)
    );
    Ok(())
}

#[test]
fn test_invalid_optimizer_is_not_persisted() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = RunStore::open(temp_dir.path().join("db.sqlite3"))?;
    let owner = store.create_user("alice")?;

    let mut form = exp1_form();
    form.optimizer = "rmsprop".to_string();

    match store.create_run(&owner, &form) {
        Err(StoreError::Validation(ValidationError::InvalidOptimizer(value))) => {
            assert_eq!(value, "rmsprop");
        }
        other => panic!("expected optimizer validation error, got {:?}", other),
    }
    assert!(store.list_runs(None)?.is_empty());
    Ok(())
}

#[test]
fn test_learning_rate_boundaries_on_save() -> Result<()> {
    let store = RunStore::open_in_memory()?;
    let owner = store.create_user("alice")?;

    for (rate, accepted) in [
        (1e-20, true),
        (1.0, true),
        (0.1, true),
        (1e-21, false),
        (1.5, false),
        (-0.001, false),
    ] {
        let mut form = exp1_form();
        form.title = format!("lr-{}", rate);
        form.learning_rate = rate;
        assert_eq!(
            store.create_run(&owner, &form).is_ok(),
            accepted,
            "learning rate {}",
            rate
        );
    }
    assert_eq!(store.list_runs(None)?.len(), 3);
    Ok(())
}

#[test]
fn test_launch_and_liveness() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = RunStore::open(temp_dir.path().join("db.sqlite3"))?;
    let owner = store.create_user("alice")?;
    let run = store.create_run(&owner, &exp1_form())?;

    // Record our own pid so the real supervisor sees a live process
    let me = std::process::id();
    let launched = store.record_launch(
        run.id,
        &LaunchRecord::new(me, "python train.py --title exp1"),
    )?;

    assert_eq!(launched.phase, RunPhase::Launched { pid: me });
    assert!(!launched.is_pending_run());
    assert!(launched.is_process_alive(&SystemSupervisor::new()));
    assert!(!launched.is_tensorboard_process_alive(&SystemSupervisor::new()));
    assert_eq!(launched.status(&SystemSupervisor::new()), RunStatus::Running);

    // Supervisor that knows nothing about 12345
    let alive: HashSet<u32> = HashSet::from([1, 2, 3]);
    let fake = move |pid: u32| alive.contains(&pid);
    let other = store.create_run(&owner, &{
        let mut form = exp1_form();
        form.title = "exp2".to_string();
        form
    })?;
    let other = store.record_launch(other.id, &LaunchRecord::new(12345, "x"))?;
    assert!(!other.is_process_alive(&fake));
    assert_eq!(other.status(&fake), RunStatus::Exited);
    Ok(())
}

#[test]
fn test_records_survive_reopen() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("db.sqlite3");

    let id = {
        let store = RunStore::open(&path)?;
        let owner = store.create_user("alice")?;
        let run = store.create_run(&owner, &exp1_form())?;
        store.record_launch(
            run.id,
            &LaunchRecord::new(4000, "python train.py").with_tensorboard(4001, 6006),
        )?;
        run.id
    };

    let store = RunStore::open(&path)?;
    let run = store.require_run(id)?;
    assert_eq!(run.process_id(), 4000);
    assert_eq!(run.tensorboard_pid, Some(4001));
    assert_eq!(run.port, Some(6006));
    assert_eq!(run.command, "python train.py");
    Ok(())
}

#[test]
fn test_owner_deletion_removes_runs() -> Result<()> {
    let store = RunStore::open_in_memory()?;
    let owner = store.create_user("alice")?;
    let run = store.create_run(&owner, &exp1_form())?;

    assert_eq!(store.delete_user("alice")?, 1);
    assert!(store.get_run(run.id)?.is_none());
    Ok(())
}

#[test]
fn test_tensorboard_directory_follows_owner() -> Result<()> {
    let store = RunStore::open_in_memory()?;
    let layout = LogLayout::new("/srv/app");
    let bob = store.create_user("bob")?;
    let run = store.create_run(&bob, &exp1_form())?;

    assert_eq!(
        run.tensorboard_log_directory(&layout),
        std::path::PathBuf::from("/srv/app/train/tb_logs/bob")
    );
    Ok(())
}
