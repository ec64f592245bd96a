//! One-shot completion signal used to wire up parent/child task dependencies.

use std::sync::{Arc, Condvar, Mutex};

struct Inner {
    done: Mutex<bool>,
    cv: Condvar,
}

/// A handle to a scheduled task's completion.
///
/// Cloning shares the same underlying signal: every clone observes the same
/// completion event. There is no "failed" state — a failing dir_op/file_op
/// terminates the whole process (see `scheduler::wrapper`), so any other
/// task still waiting on a handle simply never gets to matter.
#[derive(Clone)]
pub struct TaskHandle(Arc<Inner>);

impl TaskHandle {
    /// Create a new, not-yet-complete handle.
    pub fn new() -> Self {
        Self(Arc::new(Inner {
            done: Mutex::new(false),
            cv: Condvar::new(),
        }))
    }

    /// Mark this task done and wake every waiter.
    ///
    /// This is the in-worker blocking primitive spec.md's concurrency model
    /// calls for: a worker thread calling [`TaskHandle::wait`] blocks on this
    /// condvar using the thread's own stack, occupying a pool slot for as
    /// long as the wait lasts, rather than yielding to a cooperative
    /// scheduler.
    pub fn signal_done(&self) {
        let mut done = self.0.done.lock().unwrap();
        *done = true;
        self.0.cv.notify_all();
    }

    /// Block the calling thread until [`TaskHandle::signal_done`] has been called.
    pub fn wait(&self) {
        let mut done = self.0.done.lock().unwrap();
        while !*done {
            done = self.0.cv.wait(done).unwrap();
        }
    }
}

impl Default for TaskHandle {
    fn default() -> Self {
        Self::new()
    }
}
