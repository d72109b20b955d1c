//! Task filename parsing and generation.

use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;

static ORDINAL_FORMAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{8})-(\d{3})-(\d{4})-(.+)$").expect("static regex compiles"));
static LEGACY_FORMAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{8})-(\d{4})-(.+)$").expect("static regex compiles"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub date: String,
    pub ordinal: Option<u32>,
    pub time: String,
    pub slug: String,
}

/// Parses a filename stem (no `.md`) in either the current ordinal form or
/// the legacy form, which is still accepted on read.
pub fn parse(stem: &str) -> Option<ParsedName> {
    if let Some(caps) = ORDINAL_FORMAT.captures(stem) {
        return Some(ParsedName {
            date: caps[1].to_string(),
            ordinal: caps[2].parse().ok(),
            time: caps[3].to_string(),
            slug: caps[4].to_string(),
        });
    }
    if let Some(caps) = LEGACY_FORMAT.captures(stem) {
        return Some(ParsedName {
            date: caps[1].to_string(),
            ordinal: None,
            time: caps[2].to_string(),
            slug: caps[3].to_string(),
        });
    }
    None
}

pub fn build_stem(date: &str, ordinal: u32, time: &str, slug: &str) -> String {
    format!("{date}-{ordinal:03}-{time}-{slug}")
}

/// Lowercases, keeps alphanumerics, collapses everything else to single
/// dashes, trims trailing dashes.
pub fn slugify(title: &str) -> String {
    let mut slug = String::new();
    let mut last_was_dash = true;
    for ch in title.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    let trimmed = slug.trim_end_matches('-');
    if trimmed.is_empty() { "task".to_string() } else { trimmed.to_string() }
}

/// Turns a slug back into a readable title for archive listings:
/// `add-cache-layer` -> `Add Cache Layer`.
pub fn title_from_slug(slug: &str) -> String {
    slug.split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn today_yyyymmdd() -> String {
    Local::now().format("%Y%m%d").to_string()
}

pub fn now_hhmm() -> String {
    Local::now().format("%H%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ordinal_form() {
        let parsed = parse("20260729-001-0931-add-cache-layer").unwrap();
        assert_eq!(parsed.date, "20260729");
        assert_eq!(parsed.ordinal, Some(1));
        assert_eq!(parsed.time, "0931");
        assert_eq!(parsed.slug, "add-cache-layer");
    }

    #[test]
    fn parses_legacy_form_without_ordinal() {
        let parsed = parse("20250103-1420-fix-bug").unwrap();
        assert_eq!(parsed.date, "20250103");
        assert_eq!(parsed.ordinal, None);
        assert_eq!(parsed.time, "1420");
        assert_eq!(parsed.slug, "fix-bug");
    }

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Add Cache Layer!!"), "add-cache-layer");
        assert_eq!(slugify("  ---  "), "task");
    }

    #[test]
    fn title_from_slug_title_cases_words() {
        assert_eq!(title_from_slug("add-cache-layer"), "Add Cache Layer");
    }
}
