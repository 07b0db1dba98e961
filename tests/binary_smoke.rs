// use macro form directly; no import needed
use std::fs;
use std::path::Path;
use std::process::Command;

use assert_fs::prelude::*;

fn write_config(dir: &Path, root: &Path) -> std::path::PathBuf {
    let cfg = dir.join("config.xml");
    fs::write(
        &cfg,
        format!(
            "<config>\n  <root_path>{}</root_path>\n  <override_date>20240131</override_date>\n  <scan_interval>false</scan_interval>\n</config>\n",
            root.display()
        ),
    )
    .unwrap();
    cfg
}

#[test]
fn binary_print_config_succeeds() {
    let td = assert_fs::TempDir::new().unwrap();
    let root = td.child("drop");
    root.create_dir_all().unwrap();
    let cfg = write_config(td.path(), root.path());

    let me = assert_cmd::cargo::cargo_bin!("safe_sweep");
    let out = Command::new(me)
        .env("SAFE_SWEEP_CONFIG", &cfg)
        .arg("--print-config")
        .output()
        .expect("spawn binary");
    assert!(out.status.success(), "binary should succeed with --print-config");

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("SAFE_SWEEP_CONFIG"), "{stdout}");
    assert!(stdout.contains("20240131"), "{stdout}");
    assert!(stdout.contains("30000 ms"), "{stdout}");
    assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0, "print-config wrote into the root");
}

#[test]
fn binary_once_sweeps_and_exits() {
    let td = assert_fs::TempDir::new().unwrap();
    let root = td.child("drop");
    root.create_dir_all().unwrap();
    root.child("a.txt").write_str("first").unwrap();
    root.child("b.png").write_str("second").unwrap();
    let cfg = write_config(td.path(), root.path());

    let me = assert_cmd::cargo::cargo_bin!("safe_sweep");
    let out = Command::new(me)
        .env("SAFE_SWEEP_CONFIG", &cfg)
        .arg("--once")
        .output()
        .expect("spawn binary");
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("moved 2 of 2"), "{stdout}");
    assert!(!root.child("a.txt").path().exists());
    assert!(!root.child("b.png").path().exists());

    let dest = root.path().join("20240131");
    let mut exts: Vec<String> = fs::read_dir(&dest)
        .unwrap()
        .map(|e| {
            let p = e.unwrap().path();
            p.extension().unwrap().to_string_lossy().into_owned()
        })
        .collect();
    exts.sort();
    assert_eq!(exts, ["png", "txt"]);

    // Log files live under <root>/log by default.
    assert!(root.path().join("log").join("errors.log").exists());
}

#[test]
fn cli_flags_override_config_file() {
    let td = assert_fs::TempDir::new().unwrap();
    let root = td.child("drop");
    root.create_dir_all().unwrap();
    root.child("c.txt").write_str("third").unwrap();
    let cfg = write_config(td.path(), root.path());

    let me = assert_cmd::cargo::cargo_bin!("safe_sweep");
    let out = Command::new(me)
        .arg("--config")
        .arg(&cfg)
        .args(["--date", "20230704", "--once"])
        .output()
        .expect("spawn binary");
    assert!(out.status.success());
    assert!(root.path().join("20230704").is_dir());
    assert!(!root.path().join("20240131").exists());
}

#[test]
fn unknown_config_field_refuses_to_start() {
    let td = assert_fs::TempDir::new().unwrap();
    let cfg = td.child("bad.xml");
    cfg.write_str("<config><rootpath>/x</rootpath></config>").unwrap();

    let me = assert_cmd::cargo::cargo_bin!("safe_sweep");
    let out = Command::new(me)
        .env("SAFE_SWEEP_CONFIG", cfg.path())
        .arg("--once")
        .output()
        .expect("spawn binary");
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Refusing to start"));
}
