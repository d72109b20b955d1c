use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for one background analysis process, persisted at
/// `.air/agents/<id>/metadata.json` with companion `stdout.log`,
/// `stderr.log`, `findings.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentHandle {
    pub id: String,
    pub status: AgentStatus,
    pub started: DateTime<Utc>,
    pub pid: Option<u32>,
    pub command: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Running,
    Complete,
    Failed,
}
