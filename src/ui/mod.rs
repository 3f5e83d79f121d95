use colored::*;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::patterns::Severity;

static VERBOSE: AtomicBool = AtomicBool::new(false);

pub fn init(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);

    // Enable colored output on Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();
}

pub fn info(message: &str) {
    println!("{} {}", style("ℹ").blue(), message);
}

pub fn success(message: &str) {
    println!("{} {}", style("✓").green(), message.green());
}

pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red(), message.red());
}

pub fn warn(message: &str) {
    println!("{} {}", style("⚠").yellow(), message.yellow());
}

pub fn hint(message: &str) {
    println!("{} {}", style("💡").cyan(), message.dimmed());
}

/// Printed only with --verbose.
pub fn debug(message: &str) {
    if VERBOSE.load(Ordering::Relaxed) {
        println!("{} {}", style("·").dim(), message.dimmed());
    }
}

pub fn section(title: &str) {
    println!("\n{}", title.bold().underline());
}

/// Severity rendered with the urgency colors used across scan output.
pub fn severity_label(severity: Severity) -> String {
    match severity {
        Severity::Low => "low".dimmed().to_string(),
        Severity::Medium => "medium".yellow().to_string(),
        Severity::High => "high".red().to_string(),
        Severity::Critical => "critical".red().bold().to_string(),
    }
}

pub fn progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("Invalid progress bar template")
            .progress_chars("#>-"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn prompt_confirm(message: &str, default: bool) -> bool {
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(default)
        .interact()
        .unwrap_or(default)
}

pub fn prompt_text(message: &str, default: Option<&str>) -> String {
    let mut prompt = dialoguer::Input::new();
    prompt = prompt.with_prompt(message);

    if let Some(default_value) = default {
        prompt = prompt.default(default_value.to_string());
    }

    prompt.interact_text().unwrap_or_default()
}

pub fn prompt_password(message: &str) -> String {
    dialoguer::Password::new()
        .with_prompt(message)
        .interact()
        .unwrap_or_default()
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    // Column widths from the widest cell, ignoring ANSI color codes.
    let mut widths = headers.iter().map(|h| h.len()).collect::<Vec<_>>();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(console::measure_text_width(cell));
            }
        }
    }

    for (i, header) in headers.iter().enumerate() {
        print!("{:width$} ", header.bold(), width = widths[i]);
    }
    println!();

    for width in &widths {
        print!("{} ", "-".repeat(*width).dimmed());
    }
    println!();

    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                let pad = widths[i].saturating_sub(console::measure_text_width(cell));
                print!("{}{} ", cell, " ".repeat(pad));
            }
        }
        println!();
    }
}
