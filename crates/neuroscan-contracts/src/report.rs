use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};

use crate::analysis::HistoryItem;

pub const REPORT_TITLE: &str = "NeuroScan AI - Medical Analysis Report";
pub const REPORT_DISCLAIMER: &str =
    "This is a computer-generated report. Please consult with a qualified healthcare professional.";
pub const REPORT_COPYRIGHT: &str = "© 2025 NeuroScan Medical Systems. Research Prototype.";

/// Renders the downloadable plain-text report for one stored record.
pub fn render_report(item: &HistoryItem) -> String {
    let result = &item.result;
    let patient_id = if result.id.is_empty() {
        "N/A"
    } else {
        result.id.as_str()
    };

    let mut lines = vec![
        REPORT_TITLE.to_string(),
        underline(REPORT_TITLE, '='),
        String::new(),
        format!("Date: {}", local_date(&result.date)),
        format!("Patient ID: {patient_id}"),
        String::new(),
    ];
    section(&mut lines, "DIAGNOSIS", result.diagnosis.as_str());
    section(&mut lines, "CONFIDENCE", &format!("{}%", result.confidence));
    section(&mut lines, "SEVERITY", result.severity.as_str());
    section(&mut lines, "FINDINGS", &result.findings.join("\n"));
    section(&mut lines, "RECOMMENDATION", &result.recommendation);
    lines.push("---".to_string());
    lines.push(REPORT_DISCLAIMER.to_string());
    lines.push(REPORT_COPYRIGHT.to_string());
    lines.join("\n")
}

/// Records without an id fall back to the current epoch milliseconds.
pub fn report_file_name(item: &HistoryItem) -> String {
    if item.result.id.is_empty() {
        return format!("neuroscan-report-{}.txt", Utc::now().timestamp_millis());
    }
    format!("neuroscan-report-{}.txt", item.result.id)
}

pub fn write_report(dir: &Path, item: &HistoryItem) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(report_file_name(item));
    std::fs::write(&path, render_report(item))?;
    Ok(path)
}

/// `date` rendered in the local timezone, or "Unknown" when it does not parse.
pub fn local_date(date: &str) -> String {
    DateTime::parse_from_rfc3339(date)
        .map(|parsed| {
            parsed
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|_| "Unknown".to_string())
}

fn section(lines: &mut Vec<String>, header: &str, body: &str) {
    lines.push(header.to_string());
    lines.push(underline(header, '-'));
    lines.push(body.to_string());
    lines.push(String::new());
}

fn underline(text: &str, ch: char) -> String {
    std::iter::repeat(ch).take(text.chars().count()).collect()
}
