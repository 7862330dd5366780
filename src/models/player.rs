use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The daemon's local row for an operator's agent. Distinct from `Agent`
/// (models::Agent), which is the remote API's wire representation of the
/// same concept — see SPEC_FULL §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: i64,
    pub agent_symbol: String,
    pub token: String,
    pub credits: i64,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub metadata: Value,
}
