use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
pub enum ContainerStatus {
    #[serde(rename = "PENDING")]
    #[strum(serialize = "PENDING")]
    Pending,
    #[serde(rename = "STARTING")]
    #[strum(serialize = "STARTING")]
    Starting,
    #[serde(rename = "RUNNING")]
    #[strum(serialize = "RUNNING")]
    Running,
    #[serde(rename = "STOPPING")]
    #[strum(serialize = "STOPPING")]
    Stopping,
    #[serde(rename = "STOPPED")]
    #[strum(serialize = "STOPPED")]
    Stopped,
    #[serde(rename = "FAILED")]
    #[strum(serialize = "FAILED")]
    Failed,
    #[serde(rename = "REMOVED")]
    #[strum(serialize = "REMOVED")]
    Removed,
}

impl ContainerStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ContainerStatus::Stopped | ContainerStatus::Failed | ContainerStatus::Removed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString, Default)]
pub enum RestartPolicy {
    #[serde(rename = "no")]
    #[strum(serialize = "no")]
    #[default]
    No,
    #[serde(rename = "on-failure")]
    #[strum(serialize = "on-failure")]
    OnFailure,
    #[serde(rename = "always")]
    #[strum(serialize = "always")]
    Always,
}

/// Command name + parameter bag + iteration limit, stored as JSON
/// (`config_json` column) and interpreted by container_runtime::commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub command: String,
    pub params: Value,
    #[serde(default)]
    pub iteration_limit: Option<u32>,
    #[serde(default)]
    pub iteration_interval_seconds: u64,
    #[serde(default)]
    pub autostart: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    pub container_id: String,
    pub player_id: i64,
    pub kind: String,
    pub status: ContainerStatus,
    pub iteration: u32,
    pub restart_count: u32,
    pub restart_policy: RestartPolicy,
    pub spec: ContainerSpec,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
pub enum LogLevel {
    #[serde(rename = "DEBUG")]
    #[strum(serialize = "DEBUG")]
    Debug,
    #[serde(rename = "INFO")]
    #[strum(serialize = "INFO")]
    Info,
    #[serde(rename = "WARNING")]
    #[strum(serialize = "WARNING")]
    Warning,
    #[serde(rename = "ERROR")]
    #[strum(serialize = "ERROR")]
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerLogEntry {
    pub container_id: String,
    pub player_id: i64,
    pub sequence: i64,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(ContainerStatus::Stopped.is_terminal());
        assert!(ContainerStatus::Failed.is_terminal());
        assert!(ContainerStatus::Removed.is_terminal());
        assert!(!ContainerStatus::Running.is_terminal());
        assert!(!ContainerStatus::Pending.is_terminal());
    }
}
