//! Recursive diff consumer.
//!
//! Grounded on `original_source/parallel_diff_tree.py` (`diff_dir`/
//! `diff_file`: DELETED/PROPERTY CHANGED/CREATED for directories including
//! the destination-only-children scan, and DELETED/PROPERTY CHANGED/SIZE
//! CHANGED/CONTENT CHANGED — 128 KiB chunked compare — for files). The
//! Python `threading.Lock` print lock is the same `Arc<Mutex<()>>` the
//! progress renderer uses, so diff reports and progress lines never
//! interleave.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::classify::{classify, EntryKind};
use crate::error::Result;
use crate::progress::Stats;
use crate::scheduler::{traverse, Order, TraverseOptions};

const CHUNK_SIZE: usize = 128 * 1024;

fn report(lock: &Arc<Mutex<()>>, message: &str) {
    let _guard = lock.lock().unwrap();
    println!("\r{message}");
}

fn dest_for(path: &Path, src_root: &Path, dest_root: &Path) -> PathBuf {
    if path == src_root {
        dest_root.to_path_buf()
    } else {
        dest_root.join(path.strip_prefix(src_root).unwrap_or(path))
    }
}

/// Recursively diff `source` against `dest`, printing a report line for
/// every entry that differs. Does not modify either tree.
pub fn run_diff(source: &Path, dest: &Path, max_workers: usize, quiet: bool) -> Result<Stats> {
    let lock = Arc::new(Mutex::new(()));
    let dest_dir = dest.to_path_buf();
    let lock_dir = lock.clone();
    let dir_op = move |path: &Path, root: &Path| diff_dir(path, root, &dest_dir, &lock_dir);

    let dest_file = dest.to_path_buf();
    let lock_file = lock.clone();
    let file_op = move |path: &Path, root: &Path| diff_file(path, root, &dest_file, &lock_file);

    traverse(
        &[source.to_path_buf()],
        dir_op,
        file_op,
        TraverseOptions {
            order: Order::PostOrder,
            strict_hierarchical: false,
            max_workers,
            print_lock: Some(lock),
            quiet,
        },
    )
}

fn diff_dir(src: &Path, src_root: &Path, dest_root: &Path, lock: &Arc<Mutex<()>>) -> Result<()> {
    let dest = dest_for(src, src_root, dest_root);
    match classify(&dest) {
        EntryKind::Nonexistent => {
            report(lock, &format!("DELETED Dir: {}", src.display()));
            return Ok(());
        }
        EntryKind::Directory => {}
        _ => {
            report(lock, &format!("PROPERTY CHANGED Dir: {}", src.display()));
            return Ok(());
        }
    }

    let src_children: std::collections::HashSet<PathBuf> = std::fs::read_dir(src)
        .into_iter()
        .flatten()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().into())
        .collect();
    let dest_children = std::fs::read_dir(&dest).into_iter().flatten().filter_map(|e| e.ok());
    for entry in dest_children {
        let name: PathBuf = entry.file_name().into();
        if !src_children.contains(&name) {
            report(lock, &format!("CREATED: {}", dest.join(&name).display()));
        }
    }
    Ok(())
}

fn diff_file(src: &Path, src_root: &Path, dest_root: &Path, lock: &Arc<Mutex<()>>) -> Result<()> {
    let dest = dest_for(src, src_root, dest_root);
    match classify(&dest) {
        EntryKind::Nonexistent => {
            report(lock, &format!("DELETED File: {}", src.display()));
            return Ok(());
        }
        EntryKind::File => {}
        _ => {
            report(lock, &format!("PROPERTY CHANGED File: {}", src.display()));
            return Ok(());
        }
    }

    let src_len = std::fs::metadata(src).map(|m| m.len()).unwrap_or(0);
    let dest_len = std::fs::metadata(&dest).map(|m| m.len()).unwrap_or(0);
    if src_len != dest_len {
        report(lock, &format!("SIZE CHANGED: {}", src.display()));
        return Ok(());
    }

    if !files_match_content(src, &dest)? {
        report(lock, &format!("CONTENT CHANGED: {}", src.display()));
    }
    Ok(())
}

fn files_match_content(a: &Path, b: &Path) -> Result<bool> {
    let mut fa = std::fs::File::open(a).map_err(|e| crate::error::Error::io(a, e))?;
    let mut fb = std::fs::File::open(b).map_err(|e| crate::error::Error::io(b, e))?;
    let mut buf_a = vec![0u8; CHUNK_SIZE];
    let mut buf_b = vec![0u8; CHUNK_SIZE];
    loop {
        let na = fa.read(&mut buf_a).map_err(|e| crate::error::Error::io(a, e))?;
        let nb = fb.read(&mut buf_b).map_err(|e| crate::error::Error::io(b, e))?;
        if na != nb || buf_a[..na] != buf_b[..nb] {
            return Ok(false);
        }
        if na == 0 {
            return Ok(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn identical_trees_produce_no_mismatches() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        std::fs::write(src.path().join("a.txt"), b"same").unwrap();
        std::fs::write(dest.path().join("a.txt"), b"same").unwrap();
        run_diff(src.path(), dest.path(), 2, false).unwrap();
    }

    #[test]
    fn content_mismatch_is_detected() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let fa = a.path().join("f.txt");
        let fb = b.path().join("f.txt");
        std::fs::write(&fa, b"aaaa").unwrap();
        std::fs::write(&fb, b"bbbb").unwrap();
        assert!(!files_match_content(&fa, &fb).unwrap());
    }

    #[test]
    fn content_match_across_chunk_boundary() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let data = vec![7u8; CHUNK_SIZE + 10];
        let fa = a.path().join("f.bin");
        let fb = b.path().join("f.bin");
        std::fs::write(&fa, &data).unwrap();
        std::fs::write(&fb, &data).unwrap();
        assert!(files_match_content(&fa, &fb).unwrap());
    }
}
