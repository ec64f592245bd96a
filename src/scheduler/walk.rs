//! Traversal scheduler: builds the pre/post-order task graph over a bounded
//! [`super::pool::WorkerPool`] and drives it to completion.
//!
//! Enumeration (reading directory contents) always happens on the thread
//! that called [`traverse`] — never inside a pool worker — exactly as
//! `original_source/parallel_traversal.py`'s `os.walk`-driven scheduling
//! loop runs on the submitting thread while `dir_func`/`file_func` run in
//! the pool. This is what keeps the scheduler deadlock-free: a task is
//! never enqueued before every task it depends on, and the single shared
//! FIFO queue guarantees a dependency is always handed to some worker
//! before its dependent is.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::classify::{classify, EntryKind};
use crate::error::{Error, Result};
use crate::progress::{SharedStats, Stats};

use super::pool::WorkerPool;
use super::task::TaskHandle;
use super::wrapper::{EntryOp, OpWrapper};

/// Traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Parent directories are processed before their children.
    PreOrder,
    /// Children are processed before their parent directory.
    PostOrder,
}

/// Options controlling a [`traverse`] call.
pub struct TraverseOptions {
    /// Pre- or post-order scheduling.
    pub order: Order,
    /// When `true`, a task waits for its hierarchical dependency (parent for
    /// pre-order, children for post-order) before running. When `false`,
    /// every dependency is dropped — tasks may run in any order — though
    /// enumeration itself always stays top-down.
    pub strict_hierarchical: bool,
    /// Number of worker threads in the bounded pool.
    pub max_workers: usize,
    /// Optional lock shared with any other writer (progress line, diff
    /// reports, fatal-abort messages) so output never interleaves.
    pub print_lock: Option<Arc<Mutex<()>>>,
    /// Suppress the in-place progress line entirely.
    pub quiet: bool,
}

struct Ctx {
    dir_op: EntryOp,
    file_op: EntryOp,
    wrapper: Arc<OpWrapper>,
}

/// Drive-letter roots (`C:`) are rewritten to `C:/` before enumeration so
/// `read_dir` resolves the drive's root directory rather than the current
/// directory on that drive.
fn normalize_root(path: &Path) -> PathBuf {
    #[cfg(windows)]
    {
        let s = path.as_os_str().to_string_lossy();
        if s.len() == 2 && s.ends_with(':') {
            return PathBuf::from(format!("{s}/"));
        }
    }
    path.to_path_buf()
}

fn entry_size_hint(path: &Path) -> u64 {
    std::fs::symlink_metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn read_dir_sorted(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();
    Ok(entries)
}

fn submit_entry_task(
    pool: &WorkerPool,
    path: PathBuf,
    root: PathBuf,
    is_dir: bool,
    deps: Vec<TaskHandle>,
    ctx: Arc<Ctx>,
) -> TaskHandle {
    let handle = TaskHandle::new();
    let returned = handle.clone();
    pool.submit(move || {
        for dep in &deps {
            dep.wait();
        }
        let size_hint = entry_size_hint(&path);
        let op = if is_dir { &ctx.dir_op } else { &ctx.file_op };
        ctx.wrapper.run(&path, &root, is_dir, size_hint, op);
        handle.signal_done();
    });
    returned
}

fn schedule_pre_order(pool: &WorkerPool, root_dir: PathBuf, root: PathBuf, strict: bool, ctx: Arc<Ctx>) {
    let root_handle = submit_entry_task(pool, root_dir.clone(), root.clone(), true, Vec::new(), ctx.clone());

    let mut pending_handle: HashMap<PathBuf, TaskHandle> = HashMap::new();
    pending_handle.insert(root_dir.clone(), root_handle);
    let mut stack = vec![root_dir];

    while let Some(parent) = stack.pop() {
        let Some(parent_handle) = pending_handle.remove(&parent) else {
            continue;
        };
        let entries = match read_dir_sorted(&parent) {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(path = %parent.display(), %err, "failed to enumerate directory, skipping its subtree");
                continue;
            }
        };
        for child in entries {
            // A child that disappeared between discovery and task creation
            // is silently skipped, per spec.
            let kind = classify(&child);
            if matches!(kind, EntryKind::Nonexistent) {
                continue;
            }
            let deps = if strict { vec![parent_handle.clone()] } else { Vec::new() };
            if matches!(kind, EntryKind::Directory) {
                let handle = submit_entry_task(pool, child.clone(), root.clone(), true, deps, ctx.clone());
                pending_handle.insert(child.clone(), handle);
                stack.push(child);
            } else {
                submit_entry_task(pool, child, root.clone(), false, deps, ctx.clone());
            }
        }
    }
}

fn schedule_post_order(pool: &WorkerPool, dir: PathBuf, root: PathBuf, strict: bool, ctx: Arc<Ctx>) -> TaskHandle {
    let entries = match read_dir_sorted(&dir) {
        Ok(e) => e,
        Err(err) => {
            tracing::warn!(path = %dir.display(), %err, "failed to enumerate directory, treating as empty");
            Vec::new()
        }
    };

    let mut child_handles = Vec::with_capacity(entries.len());
    for child in entries {
        let kind = classify(&child);
        if matches!(kind, EntryKind::Nonexistent) {
            continue;
        }
        let handle = if matches!(kind, EntryKind::Directory) {
            schedule_post_order(pool, child, root.clone(), strict, ctx.clone())
        } else {
            // Files (and symlinks/junctions/devices/unknowns) have no
            // descendants of their own; conservatively included in the
            // parent's dependency set anyway (see DESIGN.md Open Question 1).
            submit_entry_task(pool, child, root.clone(), false, Vec::new(), ctx.clone())
        };
        child_handles.push(handle);
    }

    let deps = if strict { child_handles } else { Vec::new() };
    submit_entry_task(pool, dir, root, true, deps, ctx)
}

/// Walk `roots` with `dir_op`/`file_op`, scheduling tasks over a bounded
/// worker pool according to `options`.
///
/// A non-directory root is dispatched as a single `file_op` task. A root
/// that does not exist is reported as [`Error::NotFound`] before any work
/// is scheduled.
pub fn traverse(
    roots: &[PathBuf],
    dir_op: impl Fn(&Path, &Path) -> Result<()> + Send + Sync + 'static,
    file_op: impl Fn(&Path, &Path) -> Result<()> + Send + Sync + 'static,
    options: TraverseOptions,
) -> Result<Stats> {
    let normalized_roots: Vec<PathBuf> = roots.iter().map(|r| normalize_root(r)).collect();
    for root in &normalized_roots {
        if matches!(classify(root), EntryKind::Nonexistent) {
            return Err(Error::NotFound(root.clone()));
        }
    }

    let stats = Arc::new(SharedStats::new());
    let wrapper = Arc::new(OpWrapper::new(stats.clone(), options.print_lock.clone(), options.quiet));
    let ctx = Arc::new(Ctx {
        dir_op: Arc::new(dir_op),
        file_op: Arc::new(file_op),
        wrapper: wrapper.clone(),
    });

    let pool = WorkerPool::new(options.max_workers);

    for root in normalized_roots {
        match classify(&root) {
            EntryKind::Directory => match options.order {
                Order::PreOrder => {
                    schedule_pre_order(&pool, root.clone(), root, options.strict_hierarchical, ctx.clone());
                }
                Order::PostOrder => {
                    schedule_post_order(&pool, root.clone(), root, options.strict_hierarchical, ctx.clone());
                }
            },
            _ => {
                submit_entry_task(&pool, root.clone(), root, false, Vec::new(), ctx.clone());
            }
        }
    }

    pool.shutdown();
    if !options.quiet {
        wrapper.renderer().render(&stats, None, true);
    }

    Ok(stats.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn noop(_p: &Path, _r: &Path) -> Result<()> {
        Ok(())
    }

    #[test]
    fn missing_root_is_reported_before_scheduling() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let err = traverse(
            &[missing],
            noop,
            noop,
            TraverseOptions {
                order: Order::PreOrder,
                strict_hierarchical: true,
                max_workers: 2,
                print_lock: None,
                quiet: false,
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn pre_order_visits_parent_before_children() {
        let dir = TempDir::new().unwrap();
        let child = dir.path().join("child");
        std::fs::create_dir(&child).unwrap();
        std::fs::write(child.join("f.txt"), b"x").unwrap();

        let order: Arc<Mutex<Vec<PathBuf>>> = Arc::new(Mutex::new(Vec::new()));
        let order_dir = order.clone();
        let dir_op = move |p: &Path, _r: &Path| {
            order_dir.lock().unwrap().push(p.to_path_buf());
            Ok(())
        };
        let order_file = order.clone();
        let file_op = move |p: &Path, _r: &Path| {
            order_file.lock().unwrap().push(p.to_path_buf());
            Ok(())
        };

        let stats = traverse(
            &[dir.path().to_path_buf()],
            dir_op,
            file_op,
            TraverseOptions {
                order: Order::PreOrder,
                strict_hierarchical: true,
                max_workers: 4,
                print_lock: None,
                quiet: false,
            },
        )
        .unwrap();

        assert_eq!(stats.dirs, 2);
        assert_eq!(stats.files, 1);
        let seen = order.lock().unwrap();
        let root_pos = seen.iter().position(|p| p == dir.path()).unwrap();
        let child_pos = seen.iter().position(|p| p == &child).unwrap();
        assert!(root_pos < child_pos, "root must be visited before its child directory");
    }

    #[test]
    fn post_order_visits_children_before_parent() {
        let dir = TempDir::new().unwrap();
        let child = dir.path().join("child");
        std::fs::create_dir(&child).unwrap();
        let grandchild = child.join("g.txt");
        std::fs::write(&grandchild, b"x").unwrap();

        let order: Arc<Mutex<Vec<PathBuf>>> = Arc::new(Mutex::new(Vec::new()));
        let order_dir = order.clone();
        let dir_op = move |p: &Path, _r: &Path| {
            order_dir.lock().unwrap().push(p.to_path_buf());
            Ok(())
        };
        let order_file = order.clone();
        let file_op = move |p: &Path, _r: &Path| {
            order_file.lock().unwrap().push(p.to_path_buf());
            Ok(())
        };

        traverse(
            &[dir.path().to_path_buf()],
            dir_op,
            file_op,
            TraverseOptions {
                order: Order::PostOrder,
                strict_hierarchical: true,
                max_workers: 4,
                print_lock: None,
                quiet: false,
            },
        )
        .unwrap();

        let seen = order.lock().unwrap();
        let root_pos = seen.iter().position(|p| p == dir.path()).unwrap();
        let child_pos = seen.iter().position(|p| p == &child).unwrap();
        let grandchild_pos = seen.iter().position(|p| p == &grandchild).unwrap();
        assert!(grandchild_pos < child_pos, "file must be visited before its parent directory");
        assert!(child_pos < root_pos, "child directory must be visited before the root");
    }

    #[test]
    fn non_directory_root_runs_as_single_file_task() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("lone.txt");
        std::fs::write(&file, b"hello").unwrap();

        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        let file_op = move |_p: &Path, _r: &Path| {
            count2.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };

        let stats = traverse(
            &[file],
            noop,
            file_op,
            TraverseOptions {
                order: Order::PreOrder,
                strict_hierarchical: true,
                max_workers: 2,
                print_lock: None,
                quiet: false,
            },
        )
        .unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(stats.files, 1);
        assert_eq!(stats.dirs, 0);
    }
}
