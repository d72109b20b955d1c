//! Version-constraint comparison for cross-repo gap analysis. Heuristic
//! by necessity: it understands the shape of
//! PEP 440 specifiers (`==`, `>=`, `~=`, ...) and npm-style ranges (`^`,
//! `~`) well enough to flag a version mismatch, not to fully resolve one.

use air_types::{Finding, Severity};
use semver::Version;

/// Parses a version string that may be missing components (`"18"`,
/// `"18.0"`) or carry a leading `v` (`"v1.9.1"`), both common outside Cargo.
pub fn normalize_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim().trim_start_matches('v');
    if let Ok(version) = Version::parse(trimmed) {
        return Some(version);
    }
    let mut parts: Vec<&str> = trimmed.split('.').collect();
    while parts.len() < 3 {
        parts.push("0");
    }
    Version::parse(&parts.join(".")).ok()
}

/// Whether `produced` satisfies every comma-separated piece of `constraint`.
/// Unparsable pieces are skipped rather than treated as a gap, since a
/// heuristic miss should not manufacture a false-positive finding.
pub fn constraint_satisfied(constraint: &str, produced: &Version) -> bool {
    constraint
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .all(|piece| check_piece(piece, produced).unwrap_or(true))
}

fn check_piece(piece: &str, produced: &Version) -> Option<bool> {
    let (op, rest) = split_operator(piece);
    let required = normalize_version(rest)?;
    Some(match op {
        "==" | "" => *produced == required,
        ">=" => *produced >= required,
        "<=" => *produced <= required,
        ">" => *produced > required,
        "<" => *produced < required,
        "~=" => *produced >= required && produced.major == required.major && produced.minor == required.minor,
        "^" if required.major > 0 => produced.major == required.major && *produced >= required,
        "^" => produced.major == required.major && produced.minor == required.minor && *produced >= required,
        "~" => produced.major == required.major && produced.minor == required.minor && *produced >= required,
        _ => *produced >= required,
    })
}

fn split_operator(piece: &str) -> (&str, &str) {
    for op in ["==", ">=", "<=", "~=", "^", "~", ">", "<"] {
        if let Some(rest) = piece.strip_prefix(op) {
            return (op, rest.trim());
        }
    }
    ("", piece)
}

/// Builds a gap `Finding` when `produced_version` fails to satisfy
/// `constraint`; `None` when satisfied or when either version string is
/// unparsable: a gap is only reported when it can be shown to exist.
pub fn gap_finding(
    dependent_name: &str,
    dependent_manifest: &str,
    package_name: &str,
    constraint: &str,
    produced_version: &str,
) -> Option<Finding> {
    let produced = normalize_version(produced_version)?;
    if constraint_satisfied(constraint, &produced) {
        return None;
    }
    Some(Finding::new(
        "architecture",
        Severity::Medium,
        "Cross-repo dependency version gap",
        format!(
            "`{dependent_name}` requires `{package_name}{constraint}` but `{package_name}` currently produces `{produced_version}`."
        ),
        dependent_manifest.to_string(),
    ))
}
