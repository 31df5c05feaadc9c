// Leveled, colored log output for the installer.
//
// Log lines go to stderr. The only stdout output is the installed binary path
// printed by the install command.
// Debug lines are only printed once `init(true)` has been called.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// Progress and status lines.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => (eprintln!("{} {}", ::colored::Colorize::bright_green("[INFO]"), format!($($arg)*)));
}

/// Conditions worth noticing that do not stop the install (e.g. switching to the fallback).
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => (eprintln!("{} {}", ::colored::Colorize::bright_yellow("[WARN]"), format!($($arg)*)));
}

/// The clearly marked failure line.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => (eprintln!("{} {}", ::colored::Colorize::bright_red("[ERROR]"), format!($($arg)*)));
}

/// Final confirmation once a binary is in place.
#[macro_export]
macro_rules! log_success {
    ($($arg:tt)*) => (eprintln!("{} {}", ::colored::Colorize::bold(::colored::Colorize::bright_cyan("[DONE]")), format!($($arg)*)));
}

// Only printed when debug mode is on.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if $crate::logger::is_debug_enabled() {
           eprintln!("{} {}", ::colored::Colorize::dimmed("[DEBUG]"), format!($($arg)*));
        }
    };
}

static DEBUG_ENABLED: OnceLock<AtomicBool> = OnceLock::new();

/// Sets the process-wide debug flag. Call once at startup.
pub fn init(debug: bool) {
    DEBUG_ENABLED
        .get_or_init(|| AtomicBool::new(debug))
        .store(debug, Ordering::Relaxed);

    log_debug!("Logger initialized in DEBUG mode");
}

/// Checks if debug logging is currently enabled.
/// Used by the `log_debug!` macro; `false` until `init` runs.
pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED
        .get()
        .map(|f| f.load(Ordering::Relaxed))
        .unwrap_or(false)
}
