//! Task Log: per-session markdown task files under `.air/tasks/`, with
//! ordinal-suffixed filenames, append-only section mutation, archiving,
//! and summarization.

pub mod format;
pub mod markdown;

use air_errors::{AirError, AirResult};
use air_types::{Outcome, TaskRecord};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Rooted at `.air/tasks` (the caller passes the workspace's tasks dir, not
/// the workspace root).
pub struct TaskLog {
    root: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Date,
    Title,
    Status,
}

#[derive(Debug, Clone)]
pub enum ArchiveSelector {
    IdPrefix(String),
    All,
    Before(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveStrategy {
    ByMonth,
    ByQuarter,
    Flat,
}

#[derive(Debug, Clone, Default)]
pub struct ArchiveReport {
    pub moved: Vec<String>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryFormat {
    Markdown,
    Json,
    Text,
}

#[derive(Debug, Clone, Default)]
pub struct Summary {
    pub total: usize,
    pub success: usize,
    pub in_progress: usize,
    pub partial: usize,
    pub blocked: usize,
    pub files_changed: usize,
    pub earliest_date: Option<String>,
    pub latest_date: Option<String>,
}

impl TaskLog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn archive_dir(&self) -> PathBuf {
        self.root.join("archive")
    }

    fn active_file(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.md"))
    }

    /// Computes the next per-day ordinal by scanning existing (active and
    /// archived) filenames for today's date, guaranteeing uniqueness.
    fn next_ordinal(&self, date: &str) -> AirResult<u32> {
        let mut max_ordinal = 0u32;
        for path in self.all_task_paths()? {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else { continue };
            let Some(parsed) = format::parse(stem) else { continue };
            if parsed.date != date {
                continue;
            }
            if let Some(ordinal) = parsed.ordinal {
                max_ordinal = max_ordinal.max(ordinal);
            }
        }
        Ok(max_ordinal + 1)
    }

    fn all_task_paths(&self) -> AirResult<Vec<PathBuf>> {
        let mut paths = Vec::new();
        if self.root.is_dir() {
            for entry in walkdir::WalkDir::new(&self.root).max_depth(1) {
                let entry = entry?;
                if entry.file_type().is_file() && entry.path().extension().is_some_and(|e| e == "md") {
                    paths.push(entry.path().to_path_buf());
                }
            }
        }
        let archive = self.archive_dir();
        if archive.is_dir() {
            for entry in walkdir::WalkDir::new(&archive) {
                let entry = entry?;
                if entry.file_type().is_file()
                    && entry.path().extension().is_some_and(|e| e == "md")
                    && entry.file_name() != "ARCHIVE.md"
                {
                    paths.push(entry.path().to_path_buf());
                }
            }
        }
        Ok(paths)
    }

    /// Writes a new task file under today's date with the next unused
    /// ordinal for that date.
    pub fn create(&self, title: &str, prompt: &str) -> AirResult<TaskRecord> {
        std::fs::create_dir_all(&self.root)?;
        let date = format::today_yyyymmdd();
        let ordinal = self.next_ordinal(&date)?;
        let slug = format::slugify(title);
        let id = format::build_stem(&date, ordinal, &format::now_hhmm(), &slug);

        let record = TaskRecord {
            id: id.clone(),
            date: chrono::Local::now().format("%Y-%m-%d").to_string(),
            prompt: prompt.to_string(),
            actions: Vec::new(),
            files: Vec::new(),
            outcome: Outcome::InProgress,
            notes: Vec::new(),
            archived: false,
        };
        let rendered = markdown::render(&record, title);
        std::fs::write(self.active_file(&id), rendered)?;
        tracing::debug!(task_id = %id, "created task log entry");
        Ok(record)
    }

    fn find_file(&self, id: &str) -> AirResult<PathBuf> {
        let active = self.active_file(id);
        if active.is_file() {
            return Ok(active);
        }
        for path in self.all_task_paths()? {
            if path.file_stem().and_then(|s| s.to_str()) == Some(id) {
                return Ok(path);
            }
        }
        Err(AirError::validation(format!("no such task: {id}")))
    }

    pub fn read(&self, id: &str) -> AirResult<TaskRecord> {
        let path = self.find_file(id)?;
        let contents = std::fs::read_to_string(&path)?;
        let mut record = markdown::parse(id, &contents)?;
        record.archived = path.starts_with(self.archive_dir());
        Ok(record)
    }

    fn append_section(&self, id: &str, section: &str, item: &str) -> AirResult<()> {
        let path = self.find_file(id)?;
        let contents = std::fs::read_to_string(&path)?;
        let updated = markdown::append_bullet(&contents, section, item);
        std::fs::write(path, updated)?;
        Ok(())
    }

    pub fn append_action(&self, id: &str, action: &str) -> AirResult<()> {
        self.append_section(id, "Actions Taken", action)
    }

    pub fn append_file_changed(&self, id: &str, file: &str) -> AirResult<()> {
        self.append_section(id, "Files Changed", file)
    }

    pub fn append_note(&self, id: &str, note: &str) -> AirResult<()> {
        self.append_section(id, "Notes", note)
    }

    pub fn set_outcome(&self, id: &str, outcome: Outcome) -> AirResult<()> {
        let path = self.find_file(id)?;
        let contents = std::fs::read_to_string(&path)?;
        let updated = markdown::set_outcome_text(&contents, outcome);
        std::fs::write(path, updated)?;
        Ok(())
    }

    /// Lists tasks, optionally filtered by status/search and sorted. Dates
    /// are derived from the filename, never filesystem mtime.
    pub fn list(
        &self,
        status: Option<Outcome>,
        search: Option<&str>,
        sort: SortKey,
        include_archived: bool,
    ) -> AirResult<Vec<TaskRecord>> {
        let mut records = Vec::new();
        for path in self.all_task_paths()? {
            let archived = path.starts_with(self.archive_dir());
            if archived && !include_archived {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else { continue };
            let contents = std::fs::read_to_string(&path)?;
            let mut record = markdown::parse(&id, &contents)?;
            record.archived = archived;

            if let Some(status) = status {
                if record.outcome != status {
                    continue;
                }
            }
            if let Some(search) = search {
                let haystack = format!("{} {}", record.prompt, record.id).to_lowercase();
                if !haystack.contains(&search.to_lowercase()) {
                    continue;
                }
            }
            records.push(record);
        }

        records.sort_by(|a, b| match sort {
            SortKey::Date => a.id.cmp(&b.id),
            SortKey::Title => a.id.cmp(&b.id),
            SortKey::Status => (a.outcome as u8).cmp(&(b.outcome as u8)).then_with(|| a.id.cmp(&b.id)),
        });
        Ok(records)
    }

    fn period_for(&self, date: &str, strategy: ArchiveStrategy) -> String {
        match strategy {
            ArchiveStrategy::ByMonth => date.get(0..6).map(|s| format!("{}-{}", &s[0..4], &s[4..6])).unwrap_or_else(|| date.to_string()),
            ArchiveStrategy::ByQuarter => {
                if let Some(month_str) = date.get(4..6) {
                    let month: u32 = month_str.parse().unwrap_or(1);
                    let quarter = (month - 1) / 3 + 1;
                    format!("{}-Q{}", &date[0..4], quarter)
                } else {
                    date.to_string()
                }
            }
            ArchiveStrategy::Flat => "archive".to_string(),
        }
    }

    /// Moves matching active files under `.air/tasks/archive/<period>/`
    /// and deterministically regenerates `ARCHIVE.md`.
    pub fn archive(&self, selector: &ArchiveSelector, strategy: ArchiveStrategy, dry_run: bool) -> AirResult<ArchiveReport> {
        let mut report = ArchiveReport { dry_run, ..Default::default() };
        let candidates: Vec<PathBuf> = walkdir::WalkDir::new(&self.root)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && e.path().extension().is_some_and(|ext| ext == "md"))
            .map(|e| e.path().to_path_buf())
            .collect();

        for path in candidates {
            let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else { continue };
            let Some(parsed) = format::parse(&id) else { continue };
            let matches = match selector {
                ArchiveSelector::All => true,
                ArchiveSelector::IdPrefix(prefix) => id.starts_with(prefix.as_str()),
                ArchiveSelector::Before(date) => parsed.date.as_str() < date.as_str(),
            };
            if !matches {
                continue;
            }

            let period = self.period_for(&parsed.date, strategy);
            report.moved.push(id.clone());
            if !dry_run {
                let dest_dir = self.archive_dir().join(&period);
                std::fs::create_dir_all(&dest_dir)?;
                std::fs::rename(&path, dest_dir.join(format!("{id}.md")))?;
            }
        }

        if !dry_run && !report.moved.is_empty() {
            self.regenerate_archive_index()?;
        }
        tracing::info!(count = report.moved.len(), dry_run, "archived tasks");
        Ok(report)
    }

    /// Moves an archived task back to the active directory and
    /// regenerates `ARCHIVE.md`.
    pub fn restore(&self, id_prefix: &str) -> AirResult<String> {
        let archive = self.archive_dir();
        let mut found = None;
        if archive.is_dir() {
            for entry in walkdir::WalkDir::new(&archive) {
                let entry = entry?;
                if !entry.file_type().is_file() || entry.file_name() == "ARCHIVE.md" {
                    continue;
                }
                let Some(id) = entry.path().file_stem().and_then(|s| s.to_str()) else { continue };
                if id.starts_with(id_prefix) {
                    found = Some((id.to_string(), entry.path().to_path_buf()));
                    break;
                }
            }
        }
        let (id, path) = found.ok_or_else(|| AirError::validation(format!("no archived task matches: {id_prefix}")))?;
        std::fs::rename(&path, self.active_file(&id))?;
        self.regenerate_archive_index()?;
        Ok(id)
    }

    /// Regenerates `archive/ARCHIVE.md` deterministically: grouped by
    /// period (directory name), sorted by id within period, so identical
    /// archive contents always produce byte-identical output.
    fn regenerate_archive_index(&self) -> AirResult<()> {
        let archive = self.archive_dir();
        let mut by_period: BTreeMap<String, Vec<TaskRecord>> = BTreeMap::new();

        if archive.is_dir() {
            for entry in std::fs::read_dir(&archive)? {
                let entry = entry?;
                if !entry.file_type()?.is_dir() {
                    continue;
                }
                let period = entry.file_name().to_string_lossy().into_owned();
                let mut records = Vec::new();
                for file in std::fs::read_dir(entry.path())? {
                    let file = file?;
                    if file.path().extension().is_some_and(|e| e == "md") {
                        let Some(id) = file.path().file_stem().and_then(|s| s.to_str()).map(str::to_string) else { continue };
                        let contents = std::fs::read_to_string(file.path())?;
                        records.push(markdown::parse(&id, &contents)?);
                    }
                }
                records.sort_by(|a, b| a.id.cmp(&b.id));
                by_period.insert(period, records);
            }
        }

        let mut out = String::from("# Archived Tasks\n\n");
        for (period, records) in &by_period {
            out.push_str(&format!("## {period}\n\n"));
            for record in records {
                let title = format::title_from_slug(format::parse(&record.id).map(|p| p.slug).unwrap_or_default().as_str());
                let prompt_excerpt: String = record.prompt.chars().take(100).collect();
                out.push_str(&format!(
                    "- `{}` {} {} — {} — {}\n",
                    record.id,
                    record.outcome.glyph(),
                    title,
                    record.date,
                    prompt_excerpt,
                ));
            }
            out.push('\n');
        }

        std::fs::create_dir_all(&archive)?;
        let tmp_path = archive.join(format!(".tmp-{}", uuid::Uuid::new_v4()));
        std::fs::write(&tmp_path, out.trim_end().to_string() + "\n")?;
        std::fs::rename(&tmp_path, archive.join("ARCHIVE.md"))?;
        Ok(())
    }

    /// Aggregates stats across active (and, if present, archived) tasks.
    pub fn summary(&self, since: Option<&str>) -> AirResult<Summary> {
        let records = self.list(None, None, SortKey::Date, true)?;
        let mut summary = Summary::default();
        let mut dates: Vec<String> = Vec::new();

        for record in &records {
            if let Some(since) = since {
                let Some(parsed) = format::parse(&record.id) else { continue };
                if parsed.date.as_str() < since {
                    continue;
                }
            }
            summary.total += 1;
            match record.outcome {
                Outcome::Success => summary.success += 1,
                Outcome::InProgress => summary.in_progress += 1,
                Outcome::Partial => summary.partial += 1,
                Outcome::Blocked => summary.blocked += 1,
            }
            summary.files_changed += record.files.len();
            if let Some(parsed) = format::parse(&record.id) {
                dates.push(parsed.date);
            }
        }

        dates.sort();
        summary.earliest_date = dates.first().cloned();
        summary.latest_date = dates.last().cloned();
        Ok(summary)
    }

    pub fn render_summary(&self, summary: &Summary, format: SummaryFormat) -> AirResult<String> {
        match format {
            SummaryFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
                "total": summary.total,
                "success": summary.success,
                "in_progress": summary.in_progress,
                "partial": summary.partial,
                "blocked": summary.blocked,
                "files_changed": summary.files_changed,
                "earliest_date": summary.earliest_date,
                "latest_date": summary.latest_date,
            }))?),
            SummaryFormat::Markdown => Ok(format!(
                "# Task Summary\n\n- Total: {}\n- Success: {}\n- In progress: {}\n- Partial: {}\n- Blocked: {}\n- Files changed: {}\n- Date range: {} - {}\n",
                summary.total,
                summary.success,
                summary.in_progress,
                summary.partial,
                summary.blocked,
                summary.files_changed,
                summary.earliest_date.as_deref().unwrap_or("-"),
                summary.latest_date.as_deref().unwrap_or("-"),
            )),
            SummaryFormat::Text => Ok(format!(
                "total={} success={} in_progress={} partial={} blocked={} files_changed={}",
                summary.total, summary.success, summary.in_progress, summary.partial, summary.blocked, summary.files_changed,
            )),
        }
    }
}
