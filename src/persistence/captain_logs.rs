//! Captain's log repository (spec.md §4.3, §6). Narrative generation is out
//! of scope — this is a thin append/list repo over `captain_logs`; whatever
//! writes the narrative text and tags is somebody else's concern.

use crate::error::PersistenceError;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::Row;

use super::ids::next_id;
use super::pool::{get_i64, get_opt_str, get_str};
use super::Db;

#[derive(Debug, Clone)]
pub struct CaptainLogEntry {
    pub log_id: i64,
    pub player_id: i64,
    pub timestamp: DateTime<Utc>,
    pub entry_type: String,
    pub narrative: String,
    pub event_data: Option<Value>,
    pub tags: Option<Vec<String>>,
    pub fleet_snapshot: Option<Value>,
}

pub async fn append(
    db: &Db,
    player_id: i64,
    entry_type: &str,
    narrative: &str,
    event_data: Option<&Value>,
    tags: Option<&[String]>,
    fleet_snapshot: Option<&Value>,
) -> Result<i64, PersistenceError> {
    let mut tx = db.pool().begin().await?;
    let log_id = next_id(&mut tx, db, "captain_logs").await?;
    let insert = db.sql(
        "INSERT INTO captain_logs (log_id, player_id, timestamp, entry_type, narrative, event_data, tags, fleet_snapshot)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    );
    sqlx::query(&insert)
        .bind(log_id)
        .bind(player_id)
        .bind(Utc::now().to_rfc3339())
        .bind(entry_type)
        .bind(narrative)
        .bind(event_data.map(|v| v.to_string()))
        .bind(tags.map(|t| serde_json::to_string(t).unwrap_or_default()))
        .bind(fleet_snapshot.map(|v| v.to_string()))
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(log_id)
}

/// Most recent `limit` entries for `player_id`, newest first.
pub async fn recent(db: &Db, player_id: i64, limit: i64) -> Result<Vec<CaptainLogEntry>, PersistenceError> {
    let select = db.sql(
        "SELECT log_id, player_id, timestamp, entry_type, narrative, event_data, tags, fleet_snapshot
         FROM captain_logs WHERE player_id = ? ORDER BY log_id DESC LIMIT ?",
    );
    let rows = sqlx::query(&select)
        .bind(player_id)
        .bind(limit)
        .fetch_all(db.pool())
        .await?;
    rows.into_iter().map(from_row).collect()
}

fn from_row(row: sqlx::any::AnyRow) -> Result<CaptainLogEntry, PersistenceError> {
    let event_data = get_opt_str(&row, "event_data")?
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e: serde_json::Error| PersistenceError::Query(e.to_string()))?;
    let tags = get_opt_str(&row, "tags")?
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e: serde_json::Error| PersistenceError::Query(e.to_string()))?;
    let fleet_snapshot = get_opt_str(&row, "fleet_snapshot")?
        .map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e: serde_json::Error| PersistenceError::Query(e.to_string()))?;
    Ok(CaptainLogEntry {
        log_id: get_i64(&row, "log_id")?,
        player_id: get_i64(&row, "player_id")?,
        timestamp: get_str(&row, "timestamp")?
            .parse()
            .map_err(|_| PersistenceError::Query("invalid timestamp".to_string()))?,
        entry_type: get_str(&row, "entry_type")?,
        narrative: get_str(&row, "narrative")?,
        event_data,
        tags,
        fleet_snapshot,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn append_then_recent_round_trips_and_orders_newest_first() {
        let db = Db::connect("sqlite::memory:").await.unwrap();
        db.apply_schema().await.unwrap();
        append(&db, 1, "ARRIVAL", "Docked at X1-TZ26-A1", None, None, None).await.unwrap();
        append(
            &db,
            1,
            "TRADE",
            "Sold 40 units of IRON_ORE",
            Some(&json!({"units": 40})),
            Some(&["trade".to_string()]),
            None,
        )
        .await
        .unwrap();

        let entries = recent(&db, 1, 10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].entry_type, "TRADE");
        assert_eq!(entries[0].tags.as_deref(), Some(&["trade".to_string()][..]));
        assert_eq!(entries[1].entry_type, "ARRIVAL");
    }
}
