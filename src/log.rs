//! Console output helpers
//!
//! User-facing output goes through the `log_*!` macros. `log_verbose!` only prints when the
//! verbose switch is on. Internal diagnostics use the `log` facade instead.

use colored::Colorize;
use std::sync::atomic::{AtomicBool, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Turn verbose output on or off
pub fn set_verbose(verbose: bool) {
	VERBOSE.store(verbose, Ordering::Relaxed);
}

/// Whether verbose output is enabled
pub fn is_verbose() -> bool {
	VERBOSE.load(Ordering::Relaxed)
}

#[doc(hidden)]
pub fn print_line(args: std::fmt::Arguments) {
	println!("{}", args);
}

#[doc(hidden)]
pub fn print_verbose(args: std::fmt::Arguments) {
	if is_verbose() {
		println!("{}", args.to_string().dimmed());
	}
}

#[doc(hidden)]
pub fn print_info(args: std::fmt::Arguments) {
	println!("{} {}", "ℹ️".bright_blue(), args);
}

#[doc(hidden)]
pub fn print_success(args: std::fmt::Arguments) {
	println!("{}", args.to_string().bright_green());
}

#[doc(hidden)]
pub fn print_warn(args: std::fmt::Arguments) {
	eprintln!("{} {}", "Warning:".bright_yellow().bold(), args);
}

#[doc(hidden)]
pub fn print_error(args: std::fmt::Arguments) {
	eprintln!("{} {}", "Error:".bright_red().bold(), args);
}

#[macro_export]
macro_rules! log_print {
	($($arg:tt)*) => { $crate::log::print_line(format_args!($($arg)*)) };
}

#[macro_export]
macro_rules! log_verbose {
	($($arg:tt)*) => { $crate::log::print_verbose(format_args!($($arg)*)) };
}

#[macro_export]
macro_rules! log_info {
	($($arg:tt)*) => { $crate::log::print_info(format_args!($($arg)*)) };
}

#[macro_export]
macro_rules! log_success {
	($($arg:tt)*) => { $crate::log::print_success(format_args!($($arg)*)) };
}

#[macro_export]
macro_rules! log_warn {
	($($arg:tt)*) => { $crate::log::print_warn(format_args!($($arg)*)) };
}

#[macro_export]
macro_rules! log_error {
	($($arg:tt)*) => { $crate::log::print_error(format_args!($($arg)*)) };
}
