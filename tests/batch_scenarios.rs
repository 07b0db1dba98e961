use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use assert_fs::prelude::*;
use safe_sweep::fs_ops::{lock_exclusive, ReadSeek};
use safe_sweep::{list_candidates, BatchJob, ContentHasher, Sha256Hasher};

const T: i64 = 1_718_000_000_000;

fn names_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn sha(path: &Path) -> String {
    Sha256Hasher.digest(&mut fs::File::open(path).unwrap()).unwrap()
}

fn seed_abc(root: &assert_fs::TempDir) -> Vec<PathBuf> {
    root.child("a.txt").write_str("alpha").unwrap();
    root.child("b.txt").write_str("bravo").unwrap();
    root.child("c.txt").write_str("charlie").unwrap();
    list_candidates(root.path()).unwrap()
}

#[test]
fn three_files_land_at_t_plus_index() {
    let root = assert_fs::TempDir::new().unwrap();
    let files = seed_abc(&root);
    let digests: Vec<String> = files.iter().map(|p| sha(p)).collect();
    let dest = root.path().join("20240611");

    let summary = BatchJob::new(&dest, files.clone(), T).run(&Sha256Hasher);

    assert_eq!(summary.listed, 3);
    assert_eq!(summary.moved, 3);
    assert_eq!(summary.failed, 0);
    let expected: Vec<String> = (0..3).map(|i| format!("{}.txt", T + i)).collect();
    assert_eq!(names_in(&dest), expected);
    for (i, src) in files.iter().enumerate() {
        assert!(!src.exists(), "{} should be deleted", src.display());
        assert_eq!(sha(&dest.join(&expected[i])), digests[i]);
    }
}

#[test]
fn file_locked_elsewhere_keeps_its_index_slot() {
    let root = assert_fs::TempDir::new().unwrap();
    let files = seed_abc(&root);
    let dest = root.path().join("20240611");

    let held = lock_exclusive(&files[1]).unwrap();
    let summary = BatchJob::new(&dest, files.clone(), T).run(&Sha256Hasher);
    drop(held);

    assert_eq!(summary.moved, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.tally.lock_failed, 1);
    assert_eq!(names_in(&dest), [format!("{T}.txt"), format!("{}.txt", T + 2)]);
    assert_eq!(fs::read_to_string(&files[1]).unwrap(), "bravo");
    assert!(!files[0].exists());
    assert!(!files[2].exists());
}

#[test]
fn existing_destination_is_not_overwritten() {
    let root = assert_fs::TempDir::new().unwrap();
    let files = seed_abc(&root);
    let dest = root.child("20240611");
    dest.create_dir_all().unwrap();
    dest.child(format!("{T}.txt")).write_str("already here").unwrap();

    let summary = BatchJob::new(dest.path(), files.clone(), T).run(&Sha256Hasher);

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.tally.collisions, 1);
    assert_eq!(summary.moved, 2);
    assert_eq!(
        fs::read_to_string(dest.path().join(format!("{T}.txt"))).unwrap(),
        "already here"
    );
    assert_eq!(fs::read_to_string(&files[0]).unwrap(), "alpha");
    // The kept source is unlocked again.
    assert!(lock_exclusive(&files[0]).is_ok());
    assert!(!files[1].exists());
    assert!(!files[2].exists());
}

#[test]
fn empty_root_touches_nothing() {
    let root = assert_fs::TempDir::new().unwrap();
    let files = list_candidates(root.path()).unwrap();
    assert!(files.is_empty());

    let dest = root.path().join("20240611");
    let summary = BatchJob::new(&dest, files, T).run(&Sha256Hasher);

    assert_eq!((summary.listed, summary.moved, summary.failed), (0, 0, 0));
    assert!(!dest.exists());
    assert!(names_in(root.path()).is_empty());
}

/// Appends a call counter so the copy never matches the source.
struct CorruptingHasher(AtomicUsize);

impl ContentHasher for CorruptingHasher {
    fn algorithm(&self) -> &'static str {
        "corrupting"
    }

    fn digest(&self, stream: &mut dyn ReadSeek) -> io::Result<String> {
        let n = self.0.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{}-{n}", Sha256Hasher.digest(stream)?))
    }
}

#[test]
fn integrity_failure_keeps_every_source() {
    let root = assert_fs::TempDir::new().unwrap();
    let files = seed_abc(&root);
    let dest = root.path().join("20240611");

    let hasher = CorruptingHasher(AtomicUsize::new(0));
    let summary = BatchJob::new(&dest, files.clone(), T).run(&hasher);

    assert_eq!(summary.moved, 0);
    assert_eq!(summary.failed, 3);
    assert_eq!(summary.tally.digest_mismatches, 3);
    assert!(names_in(&dest).is_empty(), "unverified copies must be removed");
    for src in &files {
        assert!(src.exists());
        assert!(lock_exclusive(src).is_ok(), "{} left locked", src.display());
    }
}

#[test]
fn names_are_distinct_and_extensions_kept() {
    let root = assert_fs::TempDir::new().unwrap();
    root.child("scan.PDF").write_str("1").unwrap();
    root.child("scan2.pdf").write_str("2").unwrap();
    root.child("noext").write_str("3").unwrap();
    root.child("archive.tar.gz").write_str("4").unwrap();
    let files = list_candidates(root.path()).unwrap();
    let dest = root.path().join("out");

    let summary = BatchJob::new(&dest, files, 100).run(&Sha256Hasher);

    assert_eq!(summary.moved, 4);
    let names = names_in(&dest);
    let mut deduped = names.clone();
    deduped.dedup();
    assert_eq!(names.len(), deduped.len());
    assert!(names.contains(&"100.gz".to_string()));
    assert!(names.contains(&"101".to_string()));
}

#[cfg(target_os = "linux")]
#[test]
fn file_still_being_written_is_left_alone() {
    use std::io::Write;

    let root = assert_fs::TempDir::new().unwrap();
    let src = root.path().join("scan.pdf");
    let mut writer = fs::File::create(&src).unwrap();
    writer.write_all(b"first half ").unwrap();
    writer.flush().unwrap();
    let files = list_candidates(root.path()).unwrap();
    let dest = root.path().join("20240611");

    let summary = BatchJob::new(&dest, files, T).run(&Sha256Hasher);

    writer.write_all(b"second half").unwrap();
    drop(writer);
    assert_eq!(summary.moved, 0);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.tally.lock_failed, 1);
    assert_eq!(fs::read_to_string(&src).unwrap(), "first half second half");
    assert!(!dest.exists() || names_in(&dest).is_empty());
}

/// Removes the source between the two digests, so deleting it afterwards fails.
struct UnlinkingHasher {
    victim: PathBuf,
    calls: AtomicUsize,
}

impl ContentHasher for UnlinkingHasher {
    fn algorithm(&self) -> &'static str {
        "sha256"
    }

    fn digest(&self, stream: &mut dyn ReadSeek) -> io::Result<String> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 1 {
            fs::remove_file(&self.victim)?;
        }
        Sha256Hasher.digest(stream)
    }
}

#[test]
fn failed_source_delete_counts_and_keeps_the_copy() {
    let root = assert_fs::TempDir::new().unwrap();
    root.child("only.txt").write_str("kept copy").unwrap();
    let files = list_candidates(root.path()).unwrap();
    let dest = root.path().join("20240611");

    let hasher = UnlinkingHasher {
        victim: files[0].clone(),
        calls: AtomicUsize::new(0),
    };
    let summary = BatchJob::new(&dest, files, T).run(&hasher);

    assert_eq!(summary.moved, 0);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.tally.other, 1);
    assert_eq!(
        fs::read_to_string(dest.join(format!("{T}.txt"))).unwrap(),
        "kept copy"
    );
}
