//! Progress accounting: lock-free counters and a throttled, width-aware
//! in-place progress line.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const PRINT_INTERVAL: Duration = Duration::from_millis(100);

/// Shared, lock-free traversal counters.
///
/// Every field is an independent `AtomicU64` under `Ordering::Relaxed`:
/// counters only need to be eventually-consistent with each other, never
/// atomically consistent as a group, matching the teacher's `stats.rs`.
#[derive(Debug)]
pub struct SharedStats {
    files: AtomicU64,
    dirs: AtomicU64,
    bytes: AtomicU64,
    start: Instant,
    last_print_nanos: AtomicU64,
}

/// A point-in-time snapshot of [`SharedStats`], returned by `traverse`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Number of files processed.
    pub files: u64,
    /// Number of directories processed.
    pub dirs: u64,
    /// Total bytes processed (as reported by the operation wrapper).
    pub bytes: u64,
}

impl Default for SharedStats {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedStats {
    /// Build a fresh, zeroed counter set with the clock starting now.
    pub fn new() -> Self {
        Self {
            files: AtomicU64::new(0),
            dirs: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            start: Instant::now(),
            last_print_nanos: AtomicU64::new(0),
        }
    }

    /// Bump the file counter by one.
    pub fn increment_files(&self) {
        self.files.fetch_add(1, Ordering::Relaxed);
    }

    /// Bump the directory counter by one.
    pub fn increment_dirs(&self) {
        self.dirs.fetch_add(1, Ordering::Relaxed);
    }

    /// Bump the byte counter by `n`.
    pub fn add_bytes(&self, n: u64) {
        self.bytes.fetch_add(n, Ordering::Relaxed);
    }

    /// Current counter values.
    pub fn snapshot(&self) -> Stats {
        Stats {
            files: self.files.load(Ordering::Relaxed),
            dirs: self.dirs.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }

    /// Time elapsed since this counter set was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Whether a render should actually happen now: at most once per
    /// [`PRINT_INTERVAL`], unless `force` is set (used for the final line).
    fn should_print(&self, force: bool) -> bool {
        if force {
            self.last_print_nanos
                .store(self.start.elapsed().as_nanos() as u64, Ordering::Relaxed);
            return true;
        }
        let now = self.start.elapsed().as_nanos() as u64;
        let last = self.last_print_nanos.load(Ordering::Relaxed);
        if now.saturating_sub(last) < PRINT_INTERVAL.as_nanos() as u64 {
            return false;
        }
        // Losing this race just means a sibling thread's render wins instead
        // of ours; either is an equally valid "latest" line.
        self.last_print_nanos
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }
}

/// Binary-IEC humanization of a byte count (B / KiB / MiB / GiB, two
/// decimals above 1 KiB).
pub fn humanize_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;
    let b = bytes as f64;
    if b < KIB {
        format!("{bytes} B")
    } else if b < MIB {
        format!("{:.2} KiB", b / KIB)
    } else if b < GIB {
        format!("{:.2} MiB", b / MIB)
    } else {
        format!("{:.2} GiB", b / GIB)
    }
}

/// Humanize an elapsed duration as `SS.ss s` below a minute, `MM:SS` below
/// an hour, or `HH:MM:SS` otherwise.
pub fn humanize_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    if total_secs < 60 {
        format!("{:.2} s", d.as_secs_f64())
    } else if total_secs < 3600 {
        format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
    } else {
        let hrs = total_secs / 3600;
        let mins = (total_secs % 3600) / 60;
        let secs = total_secs % 60;
        format!("{hrs:02}:{mins:02}:{secs:02}")
    }
}

fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(80)
}

fn take_width(s: &str, budget: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for ch in s.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > budget {
            break;
        }
        out.push(ch);
        used += w;
    }
    out
}

fn take_width_from_end(s: &str, budget: usize) -> String {
    let rev: String = s.chars().rev().collect();
    let taken = take_width(&rev, budget);
    taken.chars().rev().collect()
}

/// Truncate `s` to fit within `max_width` display columns, cutting from the
/// end (never splitting a wide character in half).
fn end_truncate(s: &str, max_width: usize) -> String {
    take_width(s, max_width)
}

/// Middle-truncate `s` (`head…tail`) to fit within `max_width` columns.
fn middle_truncate(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    if max_width == 1 {
        return "…".to_string();
    }
    let remaining = max_width - 1;
    let head_budget = remaining / 2;
    let tail_budget = remaining - head_budget;
    let head = take_width(s, head_budget);
    let tail = take_width_from_end(s, tail_budget);
    format!("{head}…{tail}")
}

/// Throttled, width-aware in-place progress line renderer.
pub struct Renderer {
    print_lock: Option<Arc<Mutex<()>>>,
}

impl Renderer {
    /// Build a renderer, optionally sharing a print lock with other writers
    /// (diff reports, fatal-abort messages) so lines never interleave.
    pub fn new(print_lock: Option<Arc<Mutex<()>>>) -> Self {
        Self { print_lock }
    }

    /// Render the current line if the throttle allows it (or `force` is set).
    ///
    /// `current` is the path most recently completed; `None` omits the
    /// trailing `current: ...` segment entirely.
    pub fn render(&self, stats: &SharedStats, current: Option<&Path>, force: bool) {
        if !stats.should_print(force) {
            return;
        }
        let snap = stats.snapshot();
        let elapsed = stats.elapsed();
        let elapsed_secs = elapsed.as_secs_f64().max(1e-6);
        let total_items = (snap.files + snap.dirs) as f64;
        let rate = total_items / elapsed_secs;
        let byte_rate = snap.bytes as f64 / elapsed_secs;

        let mut prefix = format!(
            "{} files, {} dirs, total size: {}, {:.2} items/s, {}/s, elapsed: {}",
            snap.files,
            snap.dirs,
            humanize_bytes(snap.bytes),
            rate,
            humanize_bytes(byte_rate as u64),
            humanize_duration(elapsed),
        );
        if current.is_some() {
            prefix.push_str(", current: ");
        }

        let width = terminal_width();
        let prefix_width = UnicodeWidthStr::width(prefix.as_str());

        let line = if prefix_width >= width {
            end_truncate(&prefix, width)
        } else if let Some(path) = current {
            let path_text = path.display().to_string();
            let available = width - prefix_width;
            let shown = if UnicodeWidthStr::width(path_text.as_str()) <= available {
                path_text
            } else {
                middle_truncate(&path_text, available)
            };
            format!("{prefix}{shown}")
        } else {
            prefix
        };

        let padded_width = UnicodeWidthStr::width(line.as_str());
        let padding = " ".repeat(width.saturating_sub(padded_width));

        let _guard = self.print_lock.as_ref().map(|l| l.lock().unwrap());
        print!("\r{line}{padding}");
        let _ = std::io::Write::flush(&mut std::io::stdout());
    }
}
