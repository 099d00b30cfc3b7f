use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

/// Write a config file pointing at a store under `root`.
fn write_config(root: &Path, store_dir: &Path) -> std::path::PathBuf {
    let config_path = root.join("config.json");
    let body = format!(
        r#"{{ "backup_disk": "/", "store_dir": {:?}, "exclude": {{ "default": [], "custom": [] }} }}"#,
        store_dir.to_string_lossy()
    );
    fs::write(&config_path, body).unwrap();
    config_path
}

/// Drop an executable stand-in for an external tool into `dir`.
fn fake_tool(dir: &Path, name: &str, script: &str) {
    let path = dir.join(name);
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

#[test]
fn list_fails_cleanly_when_the_store_is_missing() -> Result<(), Box<dyn std::error::Error>> {
    let root = tempdir()?;
    let config = write_config(root.path(), &root.path().join("no_store_here"));

    let mut cmd = Command::cargo_bin("tarsync")?;
    cmd.arg("list").arg("--config").arg(&config);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("store directory does not exist"));
    Ok(())
}

#[test]
fn list_renders_a_seeded_store() -> Result<(), Box<dyn std::error::Error>> {
    let root = tempdir()?;
    let store = root.path().join("store");
    fs::create_dir(&store)?;
    for name in ["2025_02_27_PM_11_00_00", "2025_02_28_AM_04_36_28"] {
        fs::create_dir(store.join(name))?;
    }
    fs::write(
        store.join("2025_02_28_AM_04_36_28").join("log.md"),
        "pre-upgrade snapshot\n",
    )?;
    let config = write_config(root.path(), &store);

    let mut cmd = Command::cargo_bin("tarsync")?;
    cmd.arg("list").arg("--config").arg(&config);
    cmd.assert()
        .success()
        .stdout(
            predicate::str::contains("2025_02_27_PM_11_00_00")
                .and(predicate::str::contains("2025_02_28_AM_04_36_28"))
                .and(predicate::str::contains("Page 1 / 1 (Total: 2 snapshots)")),
        );
    Ok(())
}

#[test]
fn list_selection_prints_the_snapshot_log() -> Result<(), Box<dyn std::error::Error>> {
    let root = tempdir()?;
    let store = root.path().join("store");
    fs::create_dir(&store)?;
    fs::create_dir(store.join("2025_02_28_AM_04_36_28"))?;
    fs::write(
        store.join("2025_02_28_AM_04_36_28").join("log.md"),
        "replaced the failing disk first\n",
    )?;
    let config = write_config(root.path(), &store);

    let mut cmd = Command::cargo_bin("tarsync")?;
    cmd.arg("list")
        .arg("--select")
        .arg("-1")
        .arg("--config")
        .arg(&config);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("replaced the failing disk first"));
    Ok(())
}

#[test]
fn list_paginates_from_the_back() -> Result<(), Box<dyn std::error::Error>> {
    let root = tempdir()?;
    let store = root.path().join("store");
    fs::create_dir(&store)?;
    for i in 1..=9 {
        fs::create_dir(store.join(format!("snapshot_{i:02}")))?;
    }
    let config = write_config(root.path(), &store);

    let mut cmd = Command::cargo_bin("tarsync")?;
    cmd.arg("list")
        .arg("--page-size")
        .arg("5")
        .arg("--page")
        .arg("-1")
        .arg("--config")
        .arg(&config);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Page 2 / 2 (Total: 9 snapshots)"));
    Ok(())
}

#[test]
fn backup_reports_missing_tools_with_an_install_hint() -> Result<(), Box<dyn std::error::Error>> {
    let root = tempdir()?;
    let store = root.path().join("store");
    fs::create_dir(&store)?;
    let config = write_config(root.path(), &store);

    let mut cmd = Command::cargo_bin("tarsync")?;
    cmd.arg("backup")
        .arg("--no-log")
        .arg("--config")
        .arg(&config)
        .env("PATH", root.path()); // no tools resolvable here
    cmd.assert()
        .failure()
        .stderr(
            predicate::str::contains("is not installed")
                .and(predicate::str::contains("sudo apt install")),
        );
    Ok(())
}

#[test]
fn restore_removes_the_extracted_copy_after_a_successful_sync()
-> Result<(), Box<dyn std::error::Error>> {
    let root = tempdir()?;
    let store = root.path().join("store");
    let snapshot = store.join("2025_02_28_AM_04_36_28");
    fs::create_dir_all(&snapshot)?;
    fs::write(snapshot.join("tarsync.tar.gz"), b"placeholder")?;
    fs::write(
        snapshot.join("meta.json"),
        r#"{ "size_bytes": 0, "exclude": [], "created": "2025_02_28_AM_04_36_28" }"#,
    )?;
    let config = write_config(root.path(), &store);

    let tools = root.path().join("tools");
    fs::create_dir(&tools)?;
    fake_tool(&tools, "pv", "#!/bin/sh\ncat -- \"$1\"\n");
    fake_tool(&tools, "tar", "#!/bin/sh\ncat > /dev/null\nexit 0\n");
    fake_tool(
        &tools,
        "rsync",
        "#!/bin/sh\n\
         echo \"sent 100 bytes  received 20 bytes  80.00 bytes/sec\"\n\
         echo \"total size is 1,000  speedup is 8.33\"\n\
         exit 0\n",
    );

    let target = root.path().join("target");
    let mut cmd = Command::cargo_bin("tarsync")?;
    cmd.arg("restore")
        .arg("2025_02_28_AM_04_36_28")
        .arg("--target")
        .arg(&target)
        .arg("--config")
        .arg(&config)
        // Shadow the real tools; the scripts still need the stock shell utilities.
        .env("PATH", format!("{}:/usr/bin:/bin", tools.display()));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("sync summary"));

    assert!(!snapshot.join("restore").exists());
    assert!(snapshot.join("meta.json").exists());
    assert!(target.join("tarsync-restore.log").exists());
    Ok(())
}

#[test]
fn restore_of_unknown_snapshot_fails_before_touching_anything()
-> Result<(), Box<dyn std::error::Error>> {
    let root = tempdir()?;
    let store = root.path().join("store");
    fs::create_dir(&store)?;
    let config = write_config(root.path(), &store);

    let mut cmd = Command::cargo_bin("tarsync")?;
    cmd.arg("restore")
        .arg("2099_01_01_AM_00_00_00")
        .arg("--target")
        .arg(root.path().join("target"))
        .arg("--config")
        .arg(&config);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("no snapshot named"));
    Ok(())
}
