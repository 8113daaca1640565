//! Terminal output: `[module]` prefixed lines, the watch-mode status block
//! and the one-shot build progress line.
//!
//! ```text
//! [build] html(3/3) css(1/1) images(12/40) fonts(4/4)
//! [12:04:31] ✓ css: 2 files
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    io::{Write, stdout},
    sync::LazyLock,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

/// Global verbose flag (set by --verbose CLI argument)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set verbose mode globally
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

/// Active progress bar count (for log coordination)
static BAR_COUNT: AtomicUsize = AtomicUsize::new(0);

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a colored module prefix
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when --verbose is enabled)
///
/// # Usage
/// ```ignore
/// debug!("module"; "debug info: {}", value);
/// ```
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix
#[inline]
#[allow(clippy::cast_possible_truncation)] // Safe: bars count is always small
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower);

    let mut stdout = stdout().lock();

    let bar_count = BAR_COUNT.load(Ordering::SeqCst);
    if bar_count > 0 {
        execute!(stdout, cursor::MoveUp(bar_count as u16)).ok();
        execute!(stdout, Clear(ClearType::FromCursorDown)).ok();
    } else {
        execute!(stdout, Clear(ClearType::UntilNewLine)).ok();
    }

    writeln!(stdout, "{prefix} {message}").ok();

    if bar_count > 0 {
        for _ in 0..bar_count {
            writeln!(stdout).ok();
        }
    }

    stdout.flush().ok();
}

/// Apply color to a module prefix based on module type
#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> String {
    let prefix = format!("[{module}]");
    match module_lower {
        "serve" | "ws" => prefix.bright_blue().bold().to_string(),
        "watch" => prefix.bright_green().bold().to_string(),
        "error" => prefix.bright_red().bold().to_string(),
        "html" | "css" | "images" | "fonts" => prefix.bright_magenta().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Watch Status (single-line status with overwrite)
// ============================================================================

/// Get current time (UTC) formatted as HH:MM:SS
fn now() -> String {
    use std::time::SystemTime;
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    clock(secs)
}

fn clock(secs: u64) -> String {
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Single-line status display for watch mode
///
/// Displays status messages that overwrite the previous output,
/// keeping the terminal clean. Supports timestamps and different
/// status types (success, error)
///
/// # Example
///
/// ```ignore
/// let mut status = WatchStatus::new();
/// status.success("css: 2 files");
/// status.error("css failed: src/assets/scss/main.scss", "expected \";\"");
/// ```
pub struct WatchStatus {
    /// Lines of previous output to clear
    last_lines: usize,
}

/// Global watch status display shared across the role actors.
///
/// Lets consecutive role runs overwrite each other's status block instead
/// of leaving stale error blocks in the terminal.
static WATCH_STATUS: LazyLock<Mutex<WatchStatus>> =
    LazyLock::new(|| Mutex::new(WatchStatus::new()));

impl WatchStatus {
    /// Create a new watch status display.
    pub const fn new() -> Self {
        Self { last_lines: 0 }
    }

    /// Display success message (✓ prefix, green).
    pub fn success(&mut self, message: &str) {
        self.display(format!("{}", "✓".green()), message);
    }

    /// Display error message (✗ prefix, red) with optional detail.
    pub fn error(&mut self, summary: &str, detail: &str) {
        let message = if detail.is_empty() {
            summary.to_string()
        } else {
            format!("{summary}\n{detail}")
        };
        self.display(format!("{}", "✗".red()), &message);
    }

    /// Replace the previous block with `[HH:MM:SS] symbol message`.
    fn display(&mut self, symbol: String, message: &str) {
        let mut stdout = stdout().lock();

        if self.last_lines > 0 {
            #[allow(clippy::cast_possible_truncation)]
            let lines = self.last_lines as u16;
            execute!(stdout, cursor::MoveUp(lines), Clear(ClearType::FromCursorDown)).ok();
        }

        let timestamp = format!("[{}]", now()).dimmed().to_string();
        writeln!(stdout, "{timestamp} {symbol} {message}").ok();
        stdout.flush().ok();

        self.last_lines = message.matches('\n').count() + 1;
    }
}

/// Global watch status: success
pub fn status_success(message: &str) {
    WATCH_STATUS.lock().success(message);
}

/// Global watch status: error
pub fn status_error(summary: &str, detail: &str) {
    WATCH_STATUS.lock().error(summary, detail);
}

// ============================================================================
// Progress Line (single-line counters)
// ============================================================================

/// Single-line counters for the one-shot build, one per enabled role.
///
/// Updates use `try_lock` so rayon workers never wait on the terminal.
pub struct ProgressLine {
    counters: Vec<Counter>,
    lock: Mutex<()>,
    finished: bool,
}

struct Counter {
    name: &'static str,
    total: usize,
    current: AtomicUsize,
}

impl ProgressLine {
    /// Create a new build progress display.
    ///
    /// Only includes counters with total > 0.
    pub fn new(items: &[(&'static str, usize)]) -> Self {
        let counters: Vec<_> = items
            .iter()
            .filter(|(_, total)| *total > 0)
            .map(|(name, total)| Counter {
                name,
                total: *total,
                current: AtomicUsize::new(0),
            })
            .collect();

        BAR_COUNT.store(1, Ordering::SeqCst);

        let progress = Self {
            counters,
            lock: Mutex::new(()),
            finished: false,
        };
        progress.display();
        progress
    }

    /// Increment the counter with the given name.
    ///
    /// Non-blocking: if display lock is held, skips refresh.
    #[inline]
    pub fn inc(&self, name: &str) {
        for counter in &self.counters {
            if counter.name == name {
                counter.current.fetch_add(1, Ordering::Relaxed);
                // Non-blocking: skip display if lock is held
                if self.lock.try_lock().is_some() {
                    self.display();
                }
                return;
            }
        }
    }

    fn line(&self) -> String {
        let parts: Vec<_> = self
            .counters
            .iter()
            .map(|c| format!("{}({}/{})", c.name, c.current.load(Ordering::Relaxed), c.total))
            .collect();
        format!("{} {}", colorize_prefix("build", "build"), parts.join(" "))
    }

    /// Redraw in place, `newline` keeps the line for good.
    fn render(&self, newline: bool) {
        let line = self.line();
        let mut stdout = stdout().lock();
        execute!(
            stdout,
            cursor::MoveToColumn(0),
            Clear(ClearType::CurrentLine)
        )
        .ok();
        if newline {
            writeln!(stdout, "{line}").ok();
        } else {
            write!(stdout, "{line}").ok();
        }
        stdout.flush().ok();
    }

    fn display(&self) {
        self.render(false);
    }

    /// Print the final counts and leave the line in place.
    pub fn finish(mut self) {
        BAR_COUNT.store(0, Ordering::SeqCst);
        {
            let _guard = self.lock.lock();
            self.render(true);
        }
        self.finished = true;
    }
}

impl Drop for ProgressLine {
    fn drop(&mut self) {
        BAR_COUNT.store(0, Ordering::SeqCst);
        if self.finished {
            return;
        }

        // Dropped mid-build (a step panicked): erase the partial line
        let mut stdout = stdout().lock();
        execute!(
            stdout,
            cursor::MoveToColumn(0),
            Clear(ClearType::CurrentLine)
        )
        .ok();
        stdout.flush().ok();
    }
}

// ============================================================================
// Tests
// ============================================================================
