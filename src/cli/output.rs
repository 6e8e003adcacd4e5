//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use std::fmt::Display;

use colored::Colorize;

use crate::domain::{Mutation, Validation};

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print warning (yellow "Warning:" prefix) to stderr
pub fn warning(msg: &(impl Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

/// Print success status (green checkmark)
pub fn success(msg: &(impl Display + ?Sized)) {
    println!("{} {}", "✓".green(), msg);
}

/// Print an applied mutation, marked by kind
pub fn mutation(m: &Mutation) {
    let marker = match m {
        Mutation::Added { .. } => "+".green(),
        Mutation::Removed { .. } => "-".red(),
        Mutation::Moved { .. } => "~".cyan(),
    };
    println!("{} {}", marker, m);
}

/// Print a validation verdict: one checkmark, or a header plus one line per violation
pub fn validation(v: &Validation) {
    if v.is_valid() {
        success(v);
        return;
    }
    println!("{}", "Tree is not valid".red().bold());
    for violation in &v.violations {
        println!("  {} {}", "✗".red(), violation);
    }
}

/// Print plain output (no color, for data)
pub fn info(msg: &(impl Display + ?Sized)) {
    println!("{}", msg);
}
