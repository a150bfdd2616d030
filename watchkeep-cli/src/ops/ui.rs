//! Terminal output helpers.

use crossterm::style::Stylize;

/// Print a section header.
pub fn print_header(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", "─".repeat(title.chars().count().max(20)).dark_grey());
}

pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    println!("  {} {}", "✗".red(), msg);
}

/// Print a key-value pair.
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<14} {}", format!("{}:", key).dark_grey(), value);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Ok,
    Inactive,
    Pending,
    Failed,
}

const OK_LABELS: &[&str] = &["Running", "Accessible", "Online with all services", "Status ok"];
const INACTIVE_LABELS: &[&str] = &["Not monitored", "Initializing", "Waiting"];

/// Classifies a status label as printed by the daemon.
pub fn status_tone(label: &str) -> Tone {
    let label = label.trim();
    if label.ends_with(" pending") {
        return Tone::Pending;
    }
    if OK_LABELS.contains(&label) {
        Tone::Ok
    } else if INACTIVE_LABELS.contains(&label) {
        Tone::Inactive
    } else {
        Tone::Failed
    }
}

/// Colours a status label.
pub fn format_status(label: &str) -> String {
    match status_tone(label) {
        Tone::Ok => label.green().to_string(),
        Tone::Inactive => label.dark_grey().to_string(),
        Tone::Pending => label.yellow().to_string(),
        Tone::Failed => label.red().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tones() {
        assert_eq!(status_tone("Running"), Tone::Ok);
        assert_eq!(status_tone("Not monitored"), Tone::Inactive);
        assert_eq!(status_tone("Running - restart pending"), Tone::Pending);
        assert_eq!(status_tone("Checksum failed"), Tone::Failed);
    }
}
