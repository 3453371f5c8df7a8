//! Small colored-output helpers shared by every subcommand.

use colored::Colorize;

pub fn print_info(msg: &str) {
    println!("{} {msg}", "info:".blue().bold());
}

pub fn print_success(msg: &str) {
    println!("{} {msg}", "ok:".green().bold());
}

pub fn print_warning(msg: &str) {
    println!("{} {msg}", "warn:".yellow().bold());
}

pub fn print_error(msg: &str) {
    eprintln!("{} {msg}", "error:".red().bold());
}
