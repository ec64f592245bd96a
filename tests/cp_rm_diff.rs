//! End-to-end smoke tests for the `pcp`, `prm`, and `pdiff` binaries.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn write_tree(root: &std::path::Path) {
    std::fs::create_dir_all(root.join("sub")).unwrap();
    std::fs::write(root.join("a.txt"), b"hello").unwrap();
    std::fs::write(root.join("sub/b.txt"), b"world").unwrap();
}

#[test]
fn pcp_copies_a_tree() {
    let src = TempDir::new().unwrap();
    let dest_parent = TempDir::new().unwrap();
    write_tree(src.path());

    let dest = dest_parent.path().join("out");
    Command::cargo_bin("pcp")
        .unwrap()
        .arg(src.path())
        .arg(&dest)
        .assert()
        .success();

    assert!(dest.join("a.txt").exists());
    assert!(dest.join("sub/b.txt").exists());
    assert_eq!(std::fs::read(dest.join("a.txt")).unwrap(), b"hello");
}

#[test]
fn prm_deletes_a_tree() {
    let root = TempDir::new().unwrap();
    write_tree(root.path());
    let path = root.path().to_path_buf();

    Command::cargo_bin("prm").unwrap().arg(&path).assert().success();

    assert!(!path.exists());
}

#[test]
fn pdiff_reports_content_mismatch() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    std::fs::write(src.path().join("f.txt"), b"aaa").unwrap();
    std::fs::write(dest.path().join("f.txt"), b"bbb").unwrap();

    Command::cargo_bin("pdiff")
        .unwrap()
        .arg(src.path())
        .arg(dest.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("CONTENT CHANGED"));
}

#[test]
fn pdiff_reports_deleted_and_created_entries() {
    let src = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    std::fs::write(src.path().join("only-in-src.txt"), b"x").unwrap();
    std::fs::write(dest.path().join("only-in-dest.txt"), b"y").unwrap();

    Command::cargo_bin("pdiff")
        .unwrap()
        .arg(src.path())
        .arg(dest.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("DELETED File"))
        .stdout(predicate::str::contains("CREATED"));
}

#[test]
fn pcp_rejects_multiple_sources_into_a_non_directory_destination() {
    let src1 = TempDir::new().unwrap();
    let src2 = TempDir::new().unwrap();
    let dest_parent = TempDir::new().unwrap();
    write_tree(src1.path());
    write_tree(src2.path());

    let dest = dest_parent.path().join("nonexistent-dest");
    Command::cargo_bin("pcp")
        .unwrap()
        .arg(src1.path())
        .arg(src2.path())
        .arg(&dest)
        .assert()
        .failure();
}
