//! Recursive copy consumer.
//!
//! Grounded on `original_source/parallel_cp_r.py` (`copy_dir`/`copy_file`,
//! mount-relative symlink rewriting, chmod-retry) and
//! `jmalicki-arsync/src/hardlink_tracker.rs` (the race-free copier/linker
//! registration shape, reimplemented over `std::sync::Condvar`).

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use crate::classify::{classify, inode_identity, link_count, EntryKind};
use crate::error::{Error, Result};
use crate::scheduler::{traverse, Order, TraverseOptions};
use crate::progress::Stats;

/// rsync-style metadata preservation flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataConfig {
    /// `-a`, archive: shorthand for links+perms+times+group+owner+devices.
    pub archive: bool,
    /// `-l`, preserve symlinks as symlinks (always true in this crate;
    /// kept for CLI parity with the source).
    pub links: bool,
    /// `-p`, preserve permission bits.
    pub perms: bool,
    /// `-t`, preserve modification times.
    pub times: bool,
    /// `-H`, preserve hardlinks between sources as hardlinks in the destination.
    pub hard_links: bool,
}

impl MetadataConfig {
    /// Whether permission bits should be copied onto the destination.
    pub const fn should_preserve_permissions(&self) -> bool {
        self.perms || self.archive
    }

    /// Whether mtimes should be copied onto the destination.
    pub const fn should_preserve_timestamps(&self) -> bool {
        self.times || self.archive
    }

    /// Whether source hardlinks should be recreated as hardlinks in the destination.
    pub const fn should_preserve_hardlinks(&self) -> bool {
        self.hard_links || self.archive
    }
}

struct HardlinkEntry {
    dst_path: PathBuf,
    done: Mutex<bool>,
    cv: std::sync::Condvar,
}

/// Race-free copier/linker registration for hardlinked source files.
///
/// The first task to register a given `(dev, ino)` becomes the "copier" and
/// is responsible for actually copying bytes; every subsequent task for the
/// same inode blocks until the copier signals completion, then hardlinks to
/// the copier's destination path instead of copying again.
pub struct HardlinkTracker {
    entries: DashMap<(u64, u64), Arc<HardlinkEntry>>,
}

impl Default for HardlinkTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl HardlinkTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Register `(dev, ino)` against an intended destination path.
    ///
    /// Returns `true` if the caller is the copier (first registrant) and
    /// should perform the actual copy; `false` if the caller is a linker and
    /// should wait for [`HardlinkTracker::dst_for`] then hardlink to it.
    pub fn register(&self, dev: u64, ino: u64, dst: &Path) -> bool {
        let mut is_copier = false;
        let entry = self
            .entries
            .entry((dev, ino))
            .or_insert_with(|| {
                is_copier = true;
                Arc::new(HardlinkEntry {
                    dst_path: dst.to_path_buf(),
                    done: Mutex::new(false),
                    cv: std::sync::Condvar::new(),
                })
            })
            .clone();
        if is_copier {
            tracing::debug!(dev, ino, dst = %dst.display(), "first sighting of inode, registering as copier");
            return true;
        }
        tracing::debug!(dev, ino, "subsequent sighting of inode, waiting for copier");
        let mut done = entry.done.lock().unwrap();
        while !*done {
            done = entry.cv.wait(done).unwrap();
        }
        false
    }

    /// Signal that the copier for `(dev, ino)` has finished; wakes every linker.
    pub fn signal_done(&self, dev: u64, ino: u64) {
        if let Some(entry) = self.entries.get(&(dev, ino)) {
            let mut done = entry.done.lock().unwrap();
            *done = true;
            entry.cv.notify_all();
        }
    }

    /// The copier's destination path for `(dev, ino)`, once registered.
    pub fn dst_for(&self, dev: u64, ino: u64) -> Option<PathBuf> {
        self.entries.get(&(dev, ino)).map(|e| e.dst_path.clone())
    }
}

/// Run a recursive copy of `sources` into `dest`.
///
/// Mirrors `cp -r`'s destination semantics: if `dest` exists and is a
/// directory, each source is copied *into* it (as a child); otherwise, a
/// single source may be copied or renamed directly to `dest`.
pub fn run_copy(
    sources: &[PathBuf],
    dest: &Path,
    config: MetadataConfig,
    max_workers: usize,
    quiet: bool,
) -> Result<Stats> {
    let as_child = if dest.exists() {
        if classify(dest) != EntryKind::Directory {
            return Err(Error::NotADirectory(dest.to_path_buf()));
        }
        true
    } else {
        false
    };

    if !as_child && sources.len() > 1 {
        return Err(Error::NotADirectory(dest.to_path_buf()));
    }

    let tracker = Arc::new(HardlinkTracker::new());
    let dest = dest.to_path_buf();
    let config = Arc::new(config);

    let dest_dir = dest.clone();
    let config_dir = config.clone();
    let dir_op = move |path: &Path, root: &Path| copy_dir(path, root, &dest_dir, as_child, &config_dir);

    let dest_file = dest.clone();
    let config_file = config.clone();
    let tracker_file = tracker.clone();
    let file_op = move |path: &Path, root: &Path| {
        copy_file(path, root, &dest_file, as_child, &tracker_file, &config_file)
    };

    traverse(
        sources,
        dir_op,
        file_op,
        TraverseOptions {
            order: Order::PreOrder,
            strict_hierarchical: true,
            max_workers,
            print_lock: Some(Arc::new(Mutex::new(()))),
            quiet,
        },
    )
}

fn dest_for(src: &Path, src_root: &Path, dest_root: &Path, as_child: bool) -> PathBuf {
    if src == src_root {
        if as_child {
            let name = src_root.file_name().unwrap_or_default();
            dest_root.join(name)
        } else {
            dest_root.to_path_buf()
        }
    } else {
        let rel = src.strip_prefix(src_root).unwrap_or(src);
        if as_child {
            let name = src_root.file_name().unwrap_or_default();
            dest_root.join(name).join(rel)
        } else {
            dest_root.join(rel)
        }
    }
}

fn copy_dir(src: &Path, src_root: &Path, dest_root: &Path, as_child: bool, config: &MetadataConfig) -> Result<()> {
    let dest = dest_for(src, src_root, dest_root, as_child);
    match std::fs::create_dir(&dest) {
        Ok(()) => {}
        Err(_) if dest.is_dir() => {}
        Err(err) => return Err(Error::io(dest.clone(), err)),
    }
    preserve_metadata(src, &dest, config)
}

fn copy_file(
    src: &Path,
    src_root: &Path,
    dest_root: &Path,
    as_child: bool,
    tracker: &HardlinkTracker,
    config: &MetadataConfig,
) -> Result<()> {
    let dest = dest_for(src, src_root, dest_root, as_child);
    match classify(src) {
        EntryKind::Symlink | EntryKind::Junction | EntryKind::WslSymlink => {
            copy_symlink_like(src, &dest)
        }
        EntryKind::Device | EntryKind::Unknown => {
            tracing::warn!(path = %src.display(), "skipping device or unclassifiable entry");
            Ok(())
        }
        _ => copy_regular(src, &dest, tracker, config),
    }
}

fn copy_symlink_like(src: &Path, dest: &Path) -> Result<()> {
    let target = std::fs::read_link(src).map_err(|e| Error::io(src, e))?;
    let target = rewrite_link_target(src, &target, dest);
    remove_existing(dest)?;
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(&target, dest).map_err(|e| Error::io(dest, e))?;
    }
    #[cfg(windows)]
    {
        if target.is_dir() {
            std::os::windows::fs::symlink_dir(&target, dest).map_err(|e| Error::io(dest, e))?;
        } else {
            std::os::windows::fs::symlink_file(&target, dest).map_err(|e| Error::io(dest, e))?;
        }
    }
    Ok(())
}

/// Finds the nearest ancestor directory whose device id differs from its
/// parent's: the closest idiomatic equivalent of `os.path.ismount`.
#[cfg(unix)]
fn mount_point_of(path: &Path) -> Option<PathBuf> {
    use std::os::unix::fs::MetadataExt;
    let mut current = path.to_path_buf();
    loop {
        let parent = current.parent()?.to_path_buf();
        let current_dev = std::fs::metadata(&current).ok()?.dev();
        let parent_dev = std::fs::metadata(&parent).ok()?.dev();
        if current_dev != parent_dev {
            return Some(current);
        }
        if parent == current {
            return Some(current);
        }
        current = parent;
    }
}

#[cfg(not(unix))]
fn mount_point_of(_path: &Path) -> Option<PathBuf> {
    None
}

/// If `target` is an absolute path that doesn't exist but has a
/// mount-relative equivalent under the destination tree, rewrite the link to
/// point at that equivalent (relative to the link's own directory).
/// `\\?\Volume{...}` targets are left untouched (volume-mount-point
/// symlinks are not followed).
fn rewrite_link_target(src: &Path, target: &Path, dest: &Path) -> PathBuf {
    let target_str = target.to_string_lossy();
    if target_str.starts_with(r"\\?\Volume{") {
        tracing::warn!(target = %target_str, "skipping volume-mount-point symlink target rewrite");
        return target.to_path_buf();
    }
    if !target.is_absolute() || target.exists() {
        return target.to_path_buf();
    }
    let Some(mount) = mount_point_of(src) else {
        return target.to_path_buf();
    };
    let Ok(rel_to_mount) = target.strip_prefix(&mount) else {
        return target.to_path_buf();
    };
    let Some(dest_mount) = mount_point_of(dest.parent().unwrap_or(dest)) else {
        return target.to_path_buf();
    };
    let candidate = dest_mount.join(rel_to_mount);
    if !candidate.exists() {
        return target.to_path_buf();
    }
    let dest_dir = dest.parent().unwrap_or(dest);
    relative_path(&candidate, dest_dir)
}

/// The path to reach `target` when resolved relative to `from`, as a plain
/// `../`-climbing relative path (no filesystem access, both inputs assumed
/// absolute and lexically normalized).
fn relative_path(target: &Path, from: &Path) -> PathBuf {
    let target_components: Vec<_> = target.components().collect();
    let from_components: Vec<_> = from.components().collect();
    let common = target_components
        .iter()
        .zip(from_components.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut result = PathBuf::new();
    for _ in common..from_components.len() {
        result.push("..");
    }
    for component in &target_components[common..] {
        result.push(component.as_os_str());
    }
    if result.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        result
    }
}

fn copy_regular(src: &Path, dest: &Path, tracker: &HardlinkTracker, config: &MetadataConfig) -> Result<()> {
    let meta = std::fs::metadata(src).map_err(|e| Error::io(src, e))?;

    if config.should_preserve_hardlinks() && link_count(&meta) > 1 {
        if let Some((dev, ino)) = inode_identity(&meta) {
            if tracker.register(dev, ino, dest) {
                let result = copy_bytes_and_metadata(src, dest, config);
                tracker.signal_done(dev, ino);
                return result;
            }
            let Some(original_dst) = tracker.dst_for(dev, ino) else {
                return copy_bytes_and_metadata(src, dest, config);
            };
            remove_existing(dest)?;
            return std::fs::hard_link(&original_dst, dest).map_err(|e| Error::io(dest, e));
        }
    }

    copy_bytes_and_metadata(src, dest, config)
}

fn copy_bytes_and_metadata(src: &Path, dest: &Path, config: &MetadataConfig) -> Result<()> {
    let copy_result = std::fs::copy(src, dest);
    if let Err(err) = &copy_result {
        if err.kind() == std::io::ErrorKind::PermissionDenied && dest.exists() {
            chmod_rwx(dest)?;
            std::fs::remove_file(dest).map_err(|e| Error::io(dest, e))?;
            std::fs::copy(src, dest).map_err(|e| Error::io(dest, e))?;
        } else {
            return Err(Error::io(dest, copy_result.unwrap_err()));
        }
    }
    preserve_metadata(src, dest, config)
}

fn preserve_metadata(src: &Path, dest: &Path, config: &MetadataConfig) -> Result<()> {
    if config.should_preserve_timestamps() {
        if let Ok(meta) = std::fs::metadata(src) {
            let mtime = filetime::FileTime::from_last_modification_time(&meta);
            let _ = filetime::set_file_mtime(dest, mtime);
        }
    }
    #[cfg(unix)]
    if config.should_preserve_permissions() {
        if let Ok(meta) = std::fs::metadata(src) {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(dest, std::fs::Permissions::from_mode(meta.permissions().mode()));
        }
    }
    Ok(())
}

fn remove_existing(path: &Path) -> Result<()> {
    match classify(path) {
        EntryKind::Nonexistent => Ok(()),
        EntryKind::Directory => Ok(()),
        _ => std::fs::remove_file(path).map_err(|e| Error::io(path, e)),
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

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn hardlink_tracker_first_registrant_is_copier() {
        let tracker = HardlinkTracker::new();
        assert!(tracker.register(1, 2, Path::new("/dst/a")));
    }

    #[test]
    fn copy_plain_tree() {
        let src_dir = TempDir::new().unwrap();
        let dest_dir = TempDir::new().unwrap();
        std::fs::write(src_dir.path().join("f.txt"), b"hello").unwrap();
        std::fs::create_dir(src_dir.path().join("sub")).unwrap();
        std::fs::write(src_dir.path().join("sub/g.txt"), b"world").unwrap();

        let dest = dest_dir.path().join("copied");
        let stats = run_copy(
            &[src_dir.path().to_path_buf()],
            &dest,
            MetadataConfig::default(),
            2,
            false,
        )
        .unwrap();

        assert_eq!(stats.files, 2);
        assert!(dest.join("f.txt").exists());
        assert!(dest.join("sub/g.txt").exists());
        assert_eq!(std::fs::read(dest.join("f.txt")).unwrap(), b"hello");
    }

    #[cfg(unix)]
    #[test]
    fn copy_preserves_symlinks() {
        let src_dir = TempDir::new().unwrap();
        let dest_dir = TempDir::new().unwrap();
        std::fs::write(src_dir.path().join("target.txt"), b"hi").unwrap();
        std::os::unix::fs::symlink("target.txt", src_dir.path().join("link.txt")).unwrap();

        let dest = dest_dir.path().join("copied");
        run_copy(&[src_dir.path().to_path_buf()], &dest, MetadataConfig::default(), 2, false).unwrap();

        let link = dest.join("link.txt");
        assert_eq!(classify(&link), EntryKind::Symlink);
        assert_eq!(std::fs::read_link(&link).unwrap(), PathBuf::from("target.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn copy_dedups_hardlinks() {
        let src_dir = TempDir::new().unwrap();
        let dest_dir = TempDir::new().unwrap();
        std::fs::write(src_dir.path().join("a.txt"), b"shared").unwrap();
        std::fs::hard_link(src_dir.path().join("a.txt"), src_dir.path().join("b.txt")).unwrap();

        let dest = dest_dir.path().join("copied");
        let mut config = MetadataConfig::default();
        config.hard_links = true;
        run_copy(&[src_dir.path().to_path_buf()], &dest, config, 2, false).unwrap();

        let a = dest.join("a.txt");
        let b = dest.join("b.txt");
        use std::os::unix::fs::MetadataExt;
        assert_eq!(
            std::fs::metadata(&a).unwrap().ino(),
            std::fs::metadata(&b).unwrap().ino()
        );
    }
}
