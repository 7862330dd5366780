use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum AssignmentStatus {
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "released")]
    Released,
}

/// (player_id, ship_symbol, container_id, kind, status) — at most one
/// Active row per (player_id, ship_symbol), enforced by the persistence
/// layer's unique index (spec.md §3, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipAssignment {
    pub id: i64,
    pub player_id: i64,
    pub ship_symbol: String,
    pub container_id: String,
    pub kind: String,
    pub status: AssignmentStatus,
    pub acquired_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
    pub release_reason: Option<String>,
}
