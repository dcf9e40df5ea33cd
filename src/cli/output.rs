//! Terminal output for solver runs.
//!
//! Results and status go to stdout, problems with individual lines go to
//! stderr. `colored` drops the colours under NO_COLOR.

use std::fmt::Display;
use std::path::Path;
use std::time::Duration;

use colored::Colorize;

use crate::domain::TalentTree;

pub fn error(msg: &(impl Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// A structure or filter line that was left out of the run.
pub fn line_skipped(line: usize, reason: &(impl Display + ?Sized)) {
    eprintln!("{} line {}: {}", "skipped".yellow(), line, reason);
}

pub fn partial_results() {
    eprintln!("{}: search stopped early, results are partial", "Warning".yellow());
}

pub fn tree_heading(name: &str, line: usize, positions: usize) {
    println!("{}", format!("{name} (line {line}, {positions} positions)").cyan().bold());
}

/// One point count of a search. `filtered` is set for post-hoc filtered tables.
pub fn point_count(points: usize, combinations: usize, weighted: u64, filtered: Option<usize>) {
    let mut line = format!("{points} points: {combinations} combinations, {weighted} with switch variants");
    if let Some(filtered) = filtered {
        line.push_str(&format!(", {filtered} pass the filter"));
    }
    println!("  {} {}", "✓".green(), line);
}

pub fn guard_hit(visits: u64) {
    println!("  {} safety guard triggered after {} visits", "✗".red(), visits);
}

pub fn search_stats(visits: u64, elapsed: Duration) {
    println!("  {visits} visits in {elapsed:?}");
}

pub fn tree_valid(line: usize, tree: &TalentTree) {
    println!(
        "  {} line {}: {} ({} talents, {} points, depth {})",
        "✓".green(),
        line,
        tree.name,
        tree.node_count(),
        tree.max_talent_points(),
        tree.depth()
    );
}

pub fn tree_invalid(line: usize, reason: &(impl Display + ?Sized)) {
    println!("  {} line {}: {}", "✗".red(), line, reason);
}

pub fn decoded_heading(name: &str, points: u32) {
    println!("{}", format!("{name}: {points} points").cyan().bold());
}

/// `label` is the verb, e.g. "Written" or "Created".
pub fn file_done(label: &str, path: &Path) {
    println!("{}: {}", label.green(), path.display());
}

pub fn config_location(scope: &str, path: &Path) {
    println!("  {:<7} {}", format!("{scope}:"), path.display());
}

/// Plain data (tree diagrams, skillset lines, TOML), uncoloured.
pub fn data(text: &(impl Display + ?Sized)) {
    println!("{}", text);
}

pub fn detail(text: &(impl Display + ?Sized)) {
    println!("  {}", text);
}
