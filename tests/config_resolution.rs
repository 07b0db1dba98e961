use std::time::Duration;

use assert_fs::prelude::*;
use chrono::NaiveDate;
use safe_sweep::config::{preview_with_default_root, resolve_with_default_root, RawSettings};
use safe_sweep::LogLevel;

fn raw(root: Option<&str>) -> RawSettings {
    RawSettings {
        root_path: root.map(str::to_string),
        ..Default::default()
    }
}

#[test]
fn existing_root_is_used_and_defaults_fill_the_rest() {
    let td = assert_fs::TempDir::new().unwrap();
    let fallback = td.child("default");
    let root = td.child("drop");
    root.create_dir_all().unwrap();

    let r = resolve_with_default_root(&raw(root.path().to_str()), fallback.path()).unwrap();

    assert_eq!(
        r.config.root,
        dunce::canonicalize(root.path()).unwrap()
    );
    assert_eq!(r.config.scan_interval, Duration::from_millis(30_000));
    assert_eq!(r.config.log_level, LogLevel::Normal);
    assert!(!fallback.path().exists(), "fallback must not be created when unused");
    assert!(r.notes.is_empty());
}

#[test]
fn missing_root_falls_back_with_a_note() {
    let td = assert_fs::TempDir::new().unwrap();
    let fallback = td.child("default");
    let missing = td.path().join("not-there");

    let r = resolve_with_default_root(&raw(missing.to_str()), fallback.path()).unwrap();

    assert!(fallback.path().is_dir());
    assert_eq!(r.config.root, dunce::canonicalize(fallback.path()).unwrap());
    assert_eq!(r.notes.len(), 1);
    assert!(r.notes[0].contains("not an existing directory"));
}

#[test]
fn false_root_means_default() {
    let td = assert_fs::TempDir::new().unwrap();
    let fallback = td.child("default");
    for value in ["false", "FALSE", "False", ""] {
        let r = resolve_with_default_root(&raw(Some(value)), fallback.path()).unwrap();
        assert_eq!(r.config.root, dunce::canonicalize(fallback.path()).unwrap(), "{value:?}");
        assert!(r.notes.is_empty());
    }
}

#[test]
fn cli_layer_overrides_file_layer() {
    let td = assert_fs::TempDir::new().unwrap();
    let file = RawSettings {
        override_date: Some("20240101".into()),
        scan_interval: Some("5000".into()),
        log_level: Some("quiet".into()),
        ..Default::default()
    };
    let cli = RawSettings {
        override_date: Some("20240229".into()),
        debug: Some("true".into()),
        ..Default::default()
    };

    let r = resolve_with_default_root(&file.merge(cli), td.path()).unwrap();

    assert_eq!(r.config.date_override, NaiveDate::from_ymd_opt(2024, 2, 29));
    // 5000 is below the minimum.
    assert_eq!(r.config.scan_interval, Duration::from_millis(30_000));
    assert_eq!(r.notes.len(), 1);
    // debug=true beats the file's log level.
    assert_eq!(r.config.log_level, LogLevel::Debug);
}

#[test]
fn bad_override_date_uses_today() {
    let td = assert_fs::TempDir::new().unwrap();
    let settings = RawSettings {
        override_date: Some("2024-01-31".into()),
        ..Default::default()
    };
    let r = resolve_with_default_root(&settings, td.path()).unwrap();
    assert!(r.config.date_override.is_none());
    assert!(r.notes.iter().any(|n| n.contains("yyyyMMdd")));
}

#[test]
fn preview_creates_nothing() {
    let td = assert_fs::TempDir::new().unwrap();
    let fallback = td.child("default");

    let r = preview_with_default_root(&raw(None), fallback.path()).unwrap();

    assert_eq!(r.config.root, fallback.path());
    assert!(!fallback.path().exists(), "preview must not create the default root");
    assert!(r.notes.iter().any(|n| n.contains("does not exist yet")), "{:?}", r.notes);
}

#[test]
fn preview_leaves_an_existing_root_untouched() {
    let td = assert_fs::TempDir::new().unwrap();
    let root = td.child("drop");
    root.create_dir_all().unwrap();

    let r = preview_with_default_root(&raw(root.path().to_str()), td.path()).unwrap();

    assert_eq!(r.config.root, dunce::canonicalize(root.path()).unwrap());
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}

#[test]
fn write_probe_is_never_a_sweep_candidate() {
    let td = assert_fs::TempDir::new().unwrap();
    let root = td.child("drop");
    root.create_dir_all().unwrap();

    resolve_with_default_root(&raw(root.path().to_str()), td.path()).unwrap();

    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    assert!(safe_sweep::list_candidates(root.path()).unwrap().is_empty());
}
