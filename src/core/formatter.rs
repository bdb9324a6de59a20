use chrono::{DateTime, Local, NaiveDateTime};

use crate::core::filter::{EvaluationFilter, FilterCounts, FilterState};
use crate::core::job::JobRecord;

pub const DESCRIPTION_PREVIEW_CHARS: usize = 200;

pub fn format_created_at(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "-".to_string();
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return parsed.with_timezone(&Local).format("%d %b %Y, %H:%M").to_string();
    }

    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, pattern) {
            return naive.format("%d %b %Y, %H:%M").to_string();
        }
    }

    trimmed.to_string()
}

pub fn format_last_updated(at: DateTime<Local>) -> String {
    at.format("%H:%M:%S").to_string()
}

/// Description text for a card, and whether it was cut short.
pub fn collapse_description(text: &str, expanded: bool) -> (String, bool) {
    let text = text.trim();
    let long = text.chars().count() > DESCRIPTION_PREVIEW_CHARS;
    if expanded || !long {
        return (text.to_string(), long);
    }

    let mut preview: String = text.chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
    preview.truncate(preview.trim_end().len());
    preview.push('…');
    (preview, long)
}

pub fn format_filter_chip(key: EvaluationFilter, filters: &FilterState, counts: &FilterCounts) -> String {
    let marker = if filters.is_enabled(key) { "●" } else { "○" };
    format!("{marker} {} ({})", key.label(), counts.get(key))
}

pub fn format_showing_line(visible: usize, total: usize) -> String {
    format!("Showing {visible} of {total}")
}

pub fn format_card_header(job: &JobRecord) -> String {
    let evaluation = match job.evaluation.label() {
        "" => "unrated",
        label => label,
    };
    let company = if job.company.is_empty() {
        "Unknown company"
    } else {
        job.company.as_str()
    };
    format!(
        "[{evaluation}] {company} · Found {}",
        format_created_at(&job.created_at)
    )
}

pub fn format_note_line(job: &JobRecord) -> Option<String> {
    job.note()
        .map(|note| format!("{}: {note}", job.note_label()))
}

/// Plain-text card for non-interactive output.
pub fn format_card(job: &JobRecord, is_new: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let badge = if is_new { "NEW " } else { "" };
    lines.push(format!("{badge}{}", format_card_header(job)));
    lines.push(format!("  {}", job.title));
    lines.push(format!("  {}", job.link));
    if let Some(note) = format_note_line(job) {
        lines.push(format!("  {note}"));
    }
    let (description, _) = collapse_description(&job.description, false);
    if !description.is_empty() {
        lines.push(format!("  {description}"));
    }
    lines
}
