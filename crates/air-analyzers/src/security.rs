//! `SecurityAnalyzer`: fourteen pattern families, each a
//! `(file-type-predicate, regex) -> (Finding template, severity)` mapping.

use crate::{analyze_per_file, Analyzer};
use air_cache::Cache;
use air_pathfilter::PathFilter;
use air_types::{AnalyzerResult, Finding, Severity};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

struct PatternFamily {
    title: &'static str,
    description: &'static str,
    severity: Severity,
    /// Only scan files whose extension is in this list; empty = any text file.
    extensions: &'static [&'static str],
    pattern: Lazy<Regex>,
}

macro_rules! family {
    ($title:expr, $description:expr, $severity:expr, $extensions:expr, $pattern:expr) => {
        PatternFamily {
            title: $title,
            description: $description,
            severity: $severity,
            extensions: $extensions,
            pattern: Lazy::new(|| Regex::new($pattern).expect("static pattern compiles")),
        }
    };
}

static FAMILIES: &[PatternFamily] = &[
    family!(
        "Hardcoded secret",
        "A string literal looks like an API key, AWS key, bearer token, or SSH private key header.",
        Severity::Critical,
        &[],
        r#"(?i)(AKIA[0-9A-Z]{16}|-----BEGIN (?:RSA |OPENSSH |EC )?PRIVATE KEY-----|bearer\s+[a-z0-9\-_.=]{20,}|(?:api|secret)[_-]?key\s*[:=]\s*['"][A-Za-z0-9\-_]{16,}['"])"#
    ),
    family!(
        "Weak cryptography",
        "Use of a cryptographically broken primitive (MD5, SHA1, DES, RC4).",
        Severity::High,
        &[],
        r"(?i)\b(md5|sha1|des|rc4)\s*\("
    ),
    family!(
        "SQL injection risk",
        "String concatenation adjacent to an `execute(`/`query(` call.",
        Severity::High,
        &[],
        r#"(?:execute|query)\s*\(\s*(?:f['"]|['"][^'"]*['"]\s*(?:\+|%|\.format)|['"].*\{)"#
    ),
    family!(
        "Insecure deserialization",
        "`pickle.loads` or `yaml.load` without a safe loader.",
        Severity::High,
        &[],
        r"pickle\.loads?\(|yaml\.load\((?!.*Loader\s*=\s*(?:yaml\.)?SafeLoader)"
    ),
    family!(
        "Shell-injection risk",
        "`os.system` or `subprocess` invoked with `shell=True`.",
        Severity::High,
        &[],
        r"os\.system\(|subprocess\.[A-Za-z_]+\([^)]*shell\s*=\s*True"
    ),
    family!(
        "eval/exec use",
        "Use of `eval`/`exec` on potentially untrusted input.",
        Severity::High,
        &[],
        r"\b(?:eval|exec)\s*\("
    ),
    family!(
        "Debug mode enabled",
        "`DEBUG = True` or `debug: true` left enabled.",
        Severity::Medium,
        &[],
        r"(?i)\bdebug\s*[:=]\s*true\b"
    ),
    family!(
        "Missing security headers",
        "Web configuration lacking expected security headers.",
        Severity::Medium,
        &["conf", "cfg", "ini", "yaml", "yml"],
        r"(?i)server\s*\{|listen\s+\d+"
    ),
    family!(
        "Path traversal",
        "Unsanitized user input joined to a filesystem path.",
        Severity::High,
        &[],
        r"os\.path\.join\([^)]*request\.|path\.join\([^)]*req\.(?:query|params|body)"
    ),
    family!(
        "Command injection",
        "A shell command string built from untrusted input.",
        Severity::High,
        &[],
        r#"subprocess\.[A-Za-z_]+\(\s*['"][^'"]*\{|exec\.Command\([^)]*\+"#
    ),
    family!(
        "XXE",
        "XML parser constructed without disabling external entities.",
        Severity::High,
        &[],
        r"(?:etree\.parse|etree\.fromstring|XMLParser)\((?!.*resolve_entities\s*=\s*False)"
    ),
    family!(
        "CSRF missing on POST endpoints",
        "A POST route defined without a CSRF-protection decorator nearby.",
        Severity::Medium,
        &["py"],
        r#"@app\.route\([^)]*methods\s*=\s*\[[^]]*['"]POST['"]"#
    ),
    family!(
        "LDAP injection",
        "Unsanitized input interpolated into an LDAP filter string.",
        Severity::Medium,
        &[],
        r#"ldap\.search(?:_s)?\([^)]*%s|ldap_filter\s*=\s*f['"]"#
    ),
    family!(
        "ReDoS-prone regex / weak random",
        "A catastrophic-backtracking-shaped regex, or a non-crypto RNG used where a cryptographic one is required.",
        Severity::Medium,
        &[],
        r"\([^()]*[+*]\)[+*]|random\.random\(\)|Math\.random\(\)"
    ),
];

pub struct SecurityAnalyzer;

impl SecurityAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SecurityAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for SecurityAnalyzer {
    fn name(&self) -> &'static str {
        "security"
    }

    fn analyze(
        &self,
        repo_path: &Path,
        include_external: bool,
        filter: &PathFilter,
        cache: Option<&Cache>,
    ) -> AnalyzerResult {
        analyze_per_file("security", repo_path, include_external, filter, cache, |path, relative| {
            scan_file(path, relative)
        })
    }
}

fn scan_file(path: &Path, relative: &str) -> Vec<Finding> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let mut findings = Vec::new();

    for family in FAMILIES {
        if !family.extensions.is_empty() && !family.extensions.contains(&ext) {
            continue;
        }
        for (line_idx, line) in content.lines().enumerate() {
            if family.pattern.is_match(line) {
                findings.push(
                    Finding::new("security", family.severity, family.title, family.description, relative)
                        .with_line((line_idx + 1) as u32),
                );
            }
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use air_pathfilter::PathFilter;

    #[test]
    fn finds_hardcoded_password_literal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("settings.py"), "password = \"hunter2\"\napi_key = \"sk-AAAAAAAAAAAAAAAAAAAA\"\n").unwrap();
        let filter = PathFilter::new();
        let analyzer = SecurityAnalyzer::new();
        let result = analyzer.analyze(dir.path(), false, &filter, None);
        assert!(result
            .findings
            .iter()
            .any(|f| f.category == "security" && f.severity >= Severity::High));
    }

    #[test]
    fn finds_weak_crypto_and_eval() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x.py"), "h = md5(data)\nresult = eval(user_input)\n").unwrap();
        let filter = PathFilter::new();
        let analyzer = SecurityAnalyzer::new();
        let result = analyzer.analyze(dir.path(), false, &filter, None);
        assert!(result.findings.iter().any(|f| f.title == "Weak cryptography"));
        assert!(result.findings.iter().any(|f| f.title == "eval/exec use"));
    }

    #[test]
    fn clean_file_has_no_findings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clean.py"), "def add(a, b):\n    return a + b\n").unwrap();
        let filter = PathFilter::new();
        let analyzer = SecurityAnalyzer::new();
        let result = analyzer.analyze(dir.path(), false, &filter, None);
        assert!(result.findings.is_empty());
    }

    #[test]
    fn caches_per_file_results() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        std::fs::create_dir_all(&repo).unwrap();
        std::fs::write(repo.join("x.py"), "password = \"hunter2\"\n").unwrap();
        let cache = Cache::new(dir.path().join("cache"), "1.0.0");
        let filter = PathFilter::new();
        let analyzer = SecurityAnalyzer::new();

        let first = analyzer.analyze(&repo, false, &filter, Some(&cache));
        assert_eq!(cache.stats().misses, 1);
        let second = analyzer.analyze(&repo, false, &filter, Some(&cache));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(first.findings.len(), second.findings.len());
    }
}
