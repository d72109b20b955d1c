//! Shared data model for the air assessment engine.
//!
//! Every component crate depends on this one for the types that cross
//! component boundaries — `Resource`/`WorkspaceConfig` flow from the
//! Workspace Store into the Classifier and Dependency Graph, `Finding`/
//! `AnalyzerResult` flow from Analyzers through the Worker Pool into the
//! Orchestrator and Findings Aggregator, and so on. Keeping them in one leaf
//! crate avoids a cyclic dependency between the component crates.

pub mod agent;
pub mod config;
pub mod dependency;
pub mod finding;
pub mod resource;
pub mod task;
pub mod thresholds;

pub use agent::{AgentHandle, AgentStatus};
pub use config::{Mode, WorkspaceConfig};
pub use dependency::{DependencyResult, DependencyType};
pub use finding::{AnalyzerResult, AnalyzerSummary, Finding, Severity};
pub use resource::{Contribution, ContributionStatus, Relationship, Resource, ResourceStatus, ResourceType};
pub use task::{Outcome, TaskRecord};
pub use thresholds::ThresholdsConfig;

/// Software version string stamped into cache entries and findings
/// artifacts so that stale entries from a prior release are treated as a
/// miss.
pub const SOFTWARE_VERSION: &str = env!("CARGO_PKG_VERSION");
