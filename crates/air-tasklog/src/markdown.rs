//! Markdown section parsing/rendering for task log files.

use air_errors::{AirError, AirResult};
use air_types::{Outcome, TaskRecord};
use std::collections::BTreeMap;

const SECTIONS: &[&str] = &["Date", "Prompt", "Actions Taken", "Files Changed", "Outcome", "Notes"];

/// Splits a task file body into its `## <Header>` sections, keyed by header
/// text with leading/trailing blank lines trimmed from each body.
fn split_sections(body: &str) -> BTreeMap<String, String> {
    let mut sections = BTreeMap::new();
    let mut current: Option<String> = None;
    let mut buf = String::new();
    for line in body.lines() {
        if let Some(header) = line.strip_prefix("## ") {
            if let Some(name) = current.take() {
                sections.insert(name, buf.trim().to_string());
                buf.clear();
            }
            current = Some(header.trim().to_string());
        } else if current.is_some() {
            buf.push_str(line);
            buf.push('\n');
        }
    }
    if let Some(name) = current {
        sections.insert(name, buf.trim().to_string());
    }
    sections
}

/// Extracts `- ` / `* ` bulleted lines from a section body, in order.
fn bullet_lines(section: &str) -> Vec<String> {
    section
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            trimmed
                .strip_prefix("- ")
                .or_else(|| trimmed.strip_prefix("* "))
                .map(|rest| rest.trim().to_string())
        })
        .filter(|line| !line.is_empty())
        .collect()
}

fn render_bullets(items: &[String]) -> String {
    if items.is_empty() {
        "- (none)".to_string()
    } else {
        items.iter().map(|item| format!("- {item}")).collect::<Vec<_>>().join("\n")
    }
}

/// Parses a full task markdown document (the `# Title` line plus `##`
/// sections) into a `TaskRecord`. `id` is the filename stem, supplied by the
/// caller since it is not reliably recoverable from the body alone.
pub fn parse(id: &str, contents: &str) -> AirResult<TaskRecord> {
    let sections = split_sections(contents);
    let date = sections.get("Date").cloned().unwrap_or_default();
    let prompt = sections.get("Prompt").cloned().unwrap_or_default();
    let actions = sections.get("Actions Taken").map(|s| bullet_lines(s)).unwrap_or_default();
    let files = sections.get("Files Changed").map(|s| bullet_lines(s)).unwrap_or_default();
    let notes = sections.get("Notes").map(|s| bullet_lines(s)).unwrap_or_default();
    let outcome_text = sections.get("Outcome").ok_or_else(|| {
        AirError::Validation(format!("task '{id}' is missing an '## Outcome' section"))
    })?;
    let outcome = Outcome::from_leading_glyph(outcome_text);
    Ok(TaskRecord {
        id: id.to_string(),
        date,
        prompt,
        actions,
        files,
        outcome,
        notes,
        archived: false,
    })
}

/// Renders a `TaskRecord` to its canonical markdown form. Round-trips with
/// [`parse`] for every section `create` can populate.
pub fn render(record: &TaskRecord, title: &str) -> String {
    let outcome_line = format!("{} {}", record.outcome.glyph(), outcome_label(record.outcome));
    format!(
        "# {title}\n\n## Date\n\n{date}\n\n## Prompt\n\n{prompt}\n\n## Actions Taken\n\n{actions}\n\n## Files Changed\n\n{files}\n\n## Outcome\n\n{outcome}\n\n## Notes\n\n{notes}\n",
        title = title,
        date = record.date,
        prompt = record.prompt,
        actions = render_bullets(&record.actions),
        files = render_bullets(&record.files),
        outcome = outcome_line,
        notes = render_bullets(&record.notes),
    )
}

fn outcome_label(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Success => "Success",
        Outcome::InProgress => "In progress",
        Outcome::Partial => "Partial",
        Outcome::Blocked => "Blocked",
    }
}

/// Appends one bullet to a named section of an existing document, creating
/// the section (in canonical order) if it does not already exist.
pub fn append_bullet(contents: &str, section: &str, item: &str) -> String {
    let mut sections = split_sections(contents);
    let existing = sections.entry(section.to_string()).or_default();
    if existing.trim().is_empty() {
        *existing = format!("- {item}");
    } else {
        existing.push('\n');
        existing.push_str(&format!("- {item}"));
    }
    rebuild(contents, &sections)
}

/// Replaces the body of the `## Outcome` section.
pub fn set_outcome_text(contents: &str, outcome: Outcome) -> String {
    let mut sections = split_sections(contents);
    sections.insert(
        "Outcome".to_string(),
        format!("{} {}", outcome.glyph(), outcome_label(outcome)),
    );
    rebuild(contents, &sections)
}

/// Rewrites a document preserving the original title line and canonical
/// section order, with `sections`' contents substituted in.
fn rebuild(original: &str, sections: &BTreeMap<String, String>) -> String {
    let title = original
        .lines()
        .find(|line| line.starts_with("# "))
        .unwrap_or("# Task")
        .to_string();
    let mut out = String::new();
    out.push_str(&title);
    out.push_str("\n\n");
    for name in SECTIONS {
        let body = sections.get(*name).cloned().unwrap_or_default();
        out.push_str(&format!("## {name}\n\n{body}\n\n"));
    }
    out.trim_end().to_string() + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> String {
        "# Add cache layer\n\n## Date\n\n2026-07-29\n\n## Prompt\n\nAdd a cache layer\n\n## Actions Taken\n\n- wrote the cache module\n- wired it into the registry\n\n## Files Changed\n\n- src/cache.rs\n\n## Outcome\n\n\u{2705} Success\n\n## Notes\n\n- none\n".to_string()
    }

    #[test]
    fn parses_all_sections() {
        let record = parse("20260729-001-0931-add-cache-layer", &sample()).unwrap();
        assert_eq!(record.date, "2026-07-29");
        assert_eq!(record.prompt, "Add a cache layer");
        assert_eq!(record.actions, vec!["wrote the cache module", "wired it into the registry"]);
        assert_eq!(record.files, vec!["src/cache.rs"]);
        assert_eq!(record.outcome, Outcome::Success);
        assert_eq!(record.notes, vec!["none"]);
    }

    #[test]
    fn missing_outcome_section_is_an_error() {
        let body = "# Title\n\n## Date\n\n2026-07-29\n";
        assert!(parse("x", body).is_err());
    }

    #[test]
    fn render_then_parse_round_trips() {
        let record = parse("20260729-001-0931-add-cache-layer", &sample()).unwrap();
        let rendered = render(&record, "Add cache layer");
        let reparsed = parse(&record.id, &rendered).unwrap();
        assert_eq!(record, reparsed);
    }

    #[test]
    fn append_bullet_adds_to_existing_section() {
        let updated = append_bullet(&sample(), "Files Changed", "src/lib.rs");
        let record = parse("id", &updated).unwrap();
        assert_eq!(record.files, vec!["src/cache.rs", "src/lib.rs"]);
    }

    #[test]
    fn set_outcome_text_replaces_glyph_and_label() {
        let updated = set_outcome_text(&sample(), Outcome::Blocked);
        let record = parse("id", &updated).unwrap();
        assert_eq!(record.outcome, Outcome::Blocked);
    }
}
