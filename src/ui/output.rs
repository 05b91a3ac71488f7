use crate::import::ImportReport;
use crate::storage::TableStats;
use crate::ui::{rejected_table, stats_table, theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().header.clone()));
}

pub fn banner(title: &str, subtitle: &str) {
    println!();
    println!("  {}", title);
    println!("  {}", subtitle.style(theme().dim.clone()));
    println!();
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn info(icon: &str, label: &str, value: &str) {
    println!(
        "{} {}: {}",
        icon.style(theme().info.clone()),
        label.style(theme().dim.clone()),
        value
    );
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

/// Print the outcome of a load
pub fn report(report: &ImportReport) {
    let inserted = report.rows_inserted.to_string();
    let read = report.rows_read.to_string();
    let rejected = report.rows_rejected().to_string();

    section("Import");
    println!(
        "{}",
        stats_table(&[
            ("Table", report.table.as_str()),
            ("Rows read", read.as_str()),
            ("Rows inserted", inserted.as_str()),
            ("Rows rejected", rejected.as_str()),
        ])
    );

    if !report.rejected.is_empty() {
        warn(&format!("{} rows skipped", report.rows_rejected()));
        println!("{}", rejected_table(&report.rejected));
    }
}

/// Print row statistics for a table
pub fn stats(stats: &TableStats) {
    let rows = stats.rows.to_string();
    let exists = if stats.exists { "yes" } else { "no" };

    section("Statistics");
    println!(
        "{}",
        stats_table(&[
            ("Table", stats.table.as_str()),
            ("Exists", exists),
            ("Rows", rows.as_str()),
        ])
    );
}
