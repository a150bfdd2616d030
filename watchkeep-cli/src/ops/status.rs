use crate::client::Endpoint;
use crate::ops::output::OutputFormat;
use crate::ops::ui::format_status;

/// Summary lines pad the service column to this width.
const SUMMARY_WIDTH: usize = 35;
const FIELD_WIDTH: usize = 33;

fn split(line: &str, at: usize) -> Option<(&str, &str)> {
    Some((line.get(..at)?, line.get(at..)?))
}

/// Colours the status part of a text status document.
pub fn colorize(document: &str) -> String {
    let mut out = String::new();
    for line in document.lines() {
        let styled = if let Some(rest) = line.strip_prefix("  ") {
            match split(rest, FIELD_WIDTH) {
                Some((key, value)) if key.trim_end() == "status" => {
                    format!("  {key}{}", format_status(value))
                }
                _ => line.to_string(),
            }
        } else if line.contains(" '") {
            match split(line, SUMMARY_WIDTH) {
                Some((head, tail)) if !tail.trim().is_empty() => {
                    format!("{head}{}", format_status(tail))
                }
                _ => line.to_string(),
            }
        } else {
            line.to_string()
        };
        out.push_str(&styled);
        out.push('\n');
    }
    out
}

pub async fn show_status(
    endpoint: &Endpoint,
    format: OutputFormat,
    summary: bool,
) -> anyhow::Result<()> {
    let level = if summary { "summary" } else { "full" };
    let resp = endpoint
        .get("/_status", &[("format", format.as_param()), ("level", level)])
        .await?;
    let document = resp.text().await?;
    match format {
        OutputFormat::Xml => println!("{document}"),
        OutputFormat::Text => print!("{}", colorize(&document)),
    }
    Ok(())
}
