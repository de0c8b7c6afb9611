//! Status lines for CLI commands
//!
//! Written to stderr so stdout carries nothing but data.

use console::style;

/// Display a success step
pub fn step_ok(message: &str) {
    eprintln!("  {} {}", style("[OK]").green(), message);
}

/// Display a success step with detail
pub fn step_ok_detail(message: &str, detail: &str) {
    eprintln!("  {} {} ({})", style("[OK]").green(), message, style(detail).dim());
}

/// Display a warning step
pub fn step_warn(message: &str) {
    eprintln!("  {} {}", style("[WARN]").yellow(), message);
}

/// Display a warning step with hint
pub fn step_warn_hint(message: &str, hint: &str) {
    eprintln!("  {} {} - {}", style("[WARN]").yellow(), message, style(hint).dim());
}

/// Display an info step
pub fn step_info(message: &str) {
    eprintln!("  {} {}", style("[INFO]").cyan(), message);
}
