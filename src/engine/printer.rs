use colored::{Color, Colorize};

use super::models::{Execution, RunSummary};

pub fn print_run_header(collection: &str) {
    println!("{}", "colrun".bold());
    println!();
    println!("{}", collection.bold());
}

pub fn print_execution(execution: &Execution) {
    println!();
    for line in execution_lines(execution) {
        println!("{line}");
    }
}

pub fn print_summary(summary: &RunSummary) {
    println!();
    for line in summary_lines(summary) {
        println!("{line}");
    }
}

fn execution_lines(execution: &Execution) -> Vec<String> {
    let mut lines = vec![format!("{} {}", "→".dimmed(), execution.item.bold())];

    lines.push(match execution.status {
        Some(status) => format!(
            "  {} {} [{} {}]",
            execution.method.bold(),
            execution.url.cyan(),
            format!("{status}").color(status_color(status)),
            format!("{:.0}ms", execution.duration_ms).dimmed()
        ),
        None => format!("  {} {}", execution.method.bold(), execution.url.cyan()),
    });

    if let Some(error) = &execution.error {
        lines.push(format!("  {} {}", "✗".red(), error.red()));
    }

    for assertion in &execution.assertions {
        if assertion.passed {
            lines.push(format!("  {} {}", "✓".green(), assertion.name.dimmed()));
        } else {
            lines.push(format!("  {} {}", "✗".red(), assertion.name.red()));
        }
    }
    lines
}

fn summary_lines(summary: &RunSummary) -> Vec<String> {
    let stats = &summary.run.stats;
    let mut lines = vec![
        format!(
            "{:<14}{:>10}{:>10}",
            "".bold(),
            "executed".bold(),
            "failed".bold()
        ),
        format!(
            "{:<14}{:>10}{:>10}",
            "requests",
            stats.requests.total,
            failed_count(stats.requests.failed)
        ),
        format!(
            "{:<14}{:>10}{:>10}",
            "assertions",
            stats.assertions.total,
            failed_count(stats.assertions.failed)
        ),
    ];
    if let Some(ms) = summary.duration_ms() {
        lines.push(format!("total run duration: {ms}ms").dimmed().to_string());
    }

    if summary.run.failures.is_empty() {
        return lines;
    }

    lines.push(String::new());
    lines.push("  #  failure            detail".bold().to_string());
    for (index, failure) in summary.run.failures.iter().enumerate() {
        lines.push(format!(
            "{:>3}. {:<18} {}",
            index + 1,
            failure.error.name.red(),
            failure.source.bold()
        ));
        if let Some(test) = &failure.error.test {
            lines.push(format!("     {test}"));
        }
        if !failure.error.message.is_empty() {
            lines.push(format!("     {}", failure.error.message.dimmed()));
        }
    }
    lines
}

fn status_color(status: u16) -> Color {
    if status >= 400 {
        Color::Red
    } else if status >= 300 {
        Color::Yellow
    } else {
        Color::Green
    }
}

fn failed_count(count: usize) -> String {
    if count > 0 {
        format!("{count}").red().to_string()
    } else {
        format!("{count}")
    }
}
