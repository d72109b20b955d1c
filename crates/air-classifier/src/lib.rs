//! Classifier: infers a repo's primary language, framework, and resource
//! type deterministically from its file tree and manifests.

use air_pathfilter::PathFilter;
use air_types::ResourceType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub primary_language: Option<String>,
    pub primary_framework: Option<String>,
    pub technology_stack: Option<String>,
    pub confidence: f64,
}

/// Known frameworks in fixed priority order: first match wins.
const FRAMEWORK_PRIORITY: &[(&str, &str)] = &[
    ("manage.py", "Django"),
    ("next.config.js", "Next.js"),
    ("next.config.ts", "Next.js"),
    ("next.config.mjs", "Next.js"),
    ("angular.json", "Angular"),
    ("nuxt.config.js", "Nuxt"),
    ("nuxt.config.ts", "Nuxt"),
    ("Gemfile", "Rails"),
    ("artisan", "Laravel"),
    ("pom.xml", "Spring"),
];

const DEPLOYMENT_MARKERS: &[&str] = &["Dockerfile", "docker-compose.yml", "docker-compose.yaml"];
const K8S_DIR_MARKERS: &[&str] = &["k8s", "kubernetes", "charts"];

fn extension_language(ext: &str) -> Option<&'static str> {
    Some(match ext {
        "py" => "Python",
        "js" | "jsx" | "mjs" | "cjs" => "JavaScript",
        "ts" | "tsx" => "TypeScript",
        "go" => "Go",
        "rs" => "Rust",
        "java" => "Java",
        "rb" => "Ruby",
        "php" => "PHP",
        "cs" => "C#",
        "swift" => "Swift",
        "kt" | "kts" => "Kotlin",
        _ => return None,
    })
}

const DOC_EXTENSIONS: &[&str] = &["md", "rst"];

pub struct Classifier {
    filter: PathFilter,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    pub fn new() -> Self {
        Self {
            filter: PathFilter::new(),
        }
    }

    /// Deterministic four-step classification: language tally, framework
    /// match, resource-type inference, then confidence scoring.
    pub fn classify(&self, repo_path: &Path) -> ClassificationResult {
        let mut language_counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        let mut doc_files = 0usize;
        let mut total_non_binary = 0usize;
        let mut any_code = false;

        for entry in self.filter.walk_first_party(repo_path, false) {
            let Some(ext) = entry.path().extension().and_then(|e| e.to_str()) else {
                continue;
            };
            let ext_lower = ext.to_lowercase();
            if DOC_EXTENSIONS.contains(&ext_lower.as_str()) {
                doc_files += 1;
                total_non_binary += 1;
                continue;
            }
            if let Some(lang) = extension_language(&ext_lower) {
                *language_counts.entry(lang).or_insert(0) += 1;
                total_non_binary += 1;
                any_code = true;
            }
        }

        if total_non_binary == 0 {
            return ClassificationResult {
                resource_type: ResourceType::Library,
                primary_language: None,
                primary_framework: None,
                technology_stack: None,
                confidence: 0.0,
            };
        }

        // Step 1: primary language, ties broken alphabetically.
        let max_count = language_counts.values().copied().max().unwrap_or(0);
        let primary_language = language_counts
            .iter()
            .filter(|(_, &count)| count == max_count)
            .map(|(lang, _)| *lang)
            .min(); // BTreeMap iteration is already sorted; `min` picks first alphabetically.

        let language_share = primary_language
            .map(|lang| *language_counts.get(lang).unwrap_or(&0) as f64 / total_non_binary as f64)
            .unwrap_or(0.0);

        // Step 2: framework inference by fixed priority list.
        let primary_framework = FRAMEWORK_PRIORITY
            .iter()
            .find(|(marker, _)| repo_path.join(marker).exists())
            .map(|(_, framework)| *framework);

        // Step 3: type decision.
        let documentation_ratio = doc_files as f64 / total_non_binary as f64;
        let resource_type = if documentation_ratio > 0.70 {
            ResourceType::Documentation
        } else if any_code && has_deployment_artifacts(repo_path) {
            ResourceType::Service
        } else if any_code {
            ResourceType::Library
        } else {
            ResourceType::Documentation
        };

        // Step 4: technology stack string.
        let technology_stack = match (primary_language, primary_framework) {
            (Some(lang), Some(fw)) => Some(format!("{lang}/{fw}")),
            (Some(lang), None) => Some(lang.to_string()),
            (None, Some(fw)) => Some(fw.to_string()),
            (None, None) => None,
        };

        // Step 5: confidence.
        let confidence = if resource_type == ResourceType::Documentation && primary_framework.is_none() {
            language_share.max(documentation_ratio)
        } else if primary_framework.is_some() {
            1.0
        } else {
            language_share.max(0.7)
        };

        ClassificationResult {
            resource_type,
            primary_language: primary_language.map(str::to_string),
            primary_framework: primary_framework.map(str::to_string),
            technology_stack,
            confidence,
        }
    }
}

fn has_deployment_artifacts(repo_path: &Path) -> bool {
    DEPLOYMENT_MARKERS.iter().any(|m| repo_path.join(m).is_file())
        || K8S_DIR_MARKERS.iter().any(|d| repo_path.join(d).is_dir())
}
