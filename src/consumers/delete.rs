//! Recursive delete consumer.
//!
//! Grounded on `original_source/parallel_rm_r.py` (`force_delete_dir`/
//! `force_delete_file`: chmod-0o777-then-retry on `PermissionError`).

use std::path::{Path, PathBuf};

use crate::classify::{classify, EntryKind};
use crate::error::{Error, Result};
use crate::progress::Stats;
use crate::scheduler::{traverse, Order, TraverseOptions};

/// Recursively delete every path in `paths`.
pub fn run_delete(paths: &[PathBuf], max_workers: usize, quiet: bool) -> Result<Stats> {
    traverse(
        paths,
        |path: &Path, _root: &Path| force_delete_dir(path),
        |path: &Path, _root: &Path| force_delete_file(path),
        TraverseOptions {
            order: Order::PostOrder,
            strict_hierarchical: true,
            max_workers,
            print_lock: None,
            quiet,
        },
    )
}

fn force_delete_dir(path: &Path) -> Result<()> {
    match std::fs::remove_dir(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
            chmod_rwx(path)?;
            std::fs::remove_dir(path).map_err(|e| Error::io(path, e))
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(Error::io(path, err)),
    }
}

fn force_delete_file(path: &Path) -> Result<()> {
    if matches!(classify(path), EntryKind::Nonexistent) {
        return Ok(());
    }
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
            chmod_rwx(path)?;
            std::fs::remove_file(path).map_err(|e| Error::io(path, e))
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(Error::io(path, err)),
    }
}

#[cfg(unix)]
fn chmod_rwx(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o777)).map_err(|e| Error::io(path, e))
}

#[cfg(not(unix))]
fn chmod_rwx(path: &Path) -> Result<()> {
    let mut perms = std::fs::metadata(path).map_err(|e| Error::io(path, e))?.permissions();
    perms.set_readonly(false);
    std::fs::set_permissions(path, perms).map_err(|e| Error::io(path, e))
}
