use serde::{Deserialize, Serialize};

/// One markdown task-log file. The struct holds the parsed view; the
/// markdown itself remains the source of truth on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskRecord {
    /// Filename stem, e.g. `20260729-001-0931-add-cache-layer`.
    pub id: String,
    pub date: String,
    pub prompt: String,
    pub actions: Vec<String>,
    pub files: Vec<String>,
    pub outcome: Outcome,
    pub notes: Vec<String>,
    pub archived: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    InProgress,
    Success,
    Partial,
    Blocked,
}

impl Outcome {
    /// Classifies the leading glyph of an outcome section.
    pub fn from_leading_glyph(text: &str) -> Self {
        let trimmed = text.trim_start();
        if trimmed.starts_with('\u{2705}') {
            Outcome::Success
        } else if trimmed.starts_with('\u{23F3}') {
            Outcome::InProgress
        } else if trimmed.starts_with('\u{26A0}') {
            Outcome::Partial
        } else if trimmed.starts_with('\u{274C}') || trimmed.starts_with('\u{1F6AB}') {
            Outcome::Blocked
        } else {
            Outcome::InProgress
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            Outcome::Success => "\u{2705}",
            Outcome::InProgress => "\u{23F3}",
            Outcome::Partial => "\u{26A0}\u{FE0F}",
            Outcome::Blocked => "\u{274C}",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_glyphs() {
        assert_eq!(Outcome::from_leading_glyph("\u{2705} done"), Outcome::Success);
        assert_eq!(Outcome::from_leading_glyph("\u{23F3} working"), Outcome::InProgress);
        assert_eq!(Outcome::from_leading_glyph("\u{26A0}\u{FE0F} half done"), Outcome::Partial);
        assert_eq!(Outcome::from_leading_glyph("\u{274C} stuck"), Outcome::Blocked);
        assert_eq!(Outcome::from_leading_glyph("\u{1F6AB} stuck"), Outcome::Blocked);
    }

    #[test]
    fn absence_of_glyph_defaults_to_in_progress() {
        assert_eq!(Outcome::from_leading_glyph("no glyph here"), Outcome::InProgress);
    }
}
