//! Append-only per-container log (spec.md §4.1, §4.3). Sequence numbers are
//! monotonic per container so a `container.inspect --logs` caller can page
//! through without gaps or reordering even across daemon restarts.

use crate::error::PersistenceError;
use crate::models::container::{ContainerLogEntry, LogLevel};
use sqlx::Row;
use std::str::FromStr;

use super::pool::{get_i64, get_str};
use super::Db;

/// Returns the next sequence number to use for `container_id` (1 if none
/// logged yet). Callers append with this value in the same write.
pub async fn next_sequence(db: &Db, container_id: &str) -> Result<i64, PersistenceError> {
    let select = db.sql(
        "SELECT MAX(sequence) AS max_seq FROM container_logs WHERE container_id = ?",
    );
    let row = sqlx::query(&select).bind(container_id).fetch_one(db.pool()).await?;
    let max_seq: Option<i64> = row.try_get("max_seq").map_err(|e| PersistenceError::Query(e.to_string()))?;
    Ok(max_seq.unwrap_or(0) + 1)
}

pub async fn append(db: &Db, entry: &ContainerLogEntry) -> Result<(), PersistenceError> {
    let insert = db.sql(
        "INSERT INTO container_logs (container_id, player_id, sequence, timestamp, level, message)
         VALUES (?, ?, ?, ?, ?, ?)",
    );
    sqlx::query(&insert)
        .bind(&entry.container_id)
        .bind(entry.player_id)
        .bind(entry.sequence)
        .bind(entry.timestamp.to_rfc3339())
        .bind(entry.level.to_string())
        .bind(&entry.message)
        .execute(db.pool())
        .await?;
    Ok(())
}

/// Entries for `container_id` with `sequence > since`, oldest first —
/// the pagination contract for `container.inspect`'s log tail.
pub async fn list_since(
    db: &Db,
    container_id: &str,
    since: i64,
    limit: i64,
) -> Result<Vec<ContainerLogEntry>, PersistenceError> {
    let select = db.sql(
        "SELECT container_id, player_id, sequence, timestamp, level, message
         FROM container_logs
         WHERE container_id = ? AND sequence > ?
         ORDER BY sequence ASC
         LIMIT ?",
    );
    let rows = sqlx::query(&select)
        .bind(container_id)
        .bind(since)
        .bind(limit)
        .fetch_all(db.pool())
        .await?;
    rows.into_iter().map(from_row).collect()
}

pub async fn delete_for_container(db: &Db, container_id: &str) -> Result<(), PersistenceError> {
    let delete = db.sql("DELETE FROM container_logs WHERE container_id = ?");
    sqlx::query(&delete).bind(container_id).execute(db.pool()).await?;
    Ok(())
}

fn from_row(row: sqlx::any::AnyRow) -> Result<ContainerLogEntry, PersistenceError> {
    let level_str = get_str(&row, "level")?;
    Ok(ContainerLogEntry {
        container_id: get_str(&row, "container_id")?,
        player_id: get_i64(&row, "player_id")?,
        sequence: get_i64(&row, "sequence")?,
        timestamp: get_str(&row, "timestamp")?
            .parse()
            .map_err(|_| PersistenceError::Query("invalid timestamp".to_string()))?,
        level: LogLevel::from_str(&level_str)
            .map_err(|_| PersistenceError::Query(format!("invalid log level {}", level_str)))?,
        message: get_str(&row, "message")?,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Utc;

    fn entry(container_id: &str, sequence: i64, message: &str) -> ContainerLogEntry {
        ContainerLogEntry {
            container_id: container_id.to_string(),
            player_id: 1,
            sequence,
            timestamp: Utc::now(),
            level: LogLevel::Info,
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn sequence_numbers_are_monotonic_per_container() {
        let db = Db::connect("sqlite::memory:").await.unwrap();
        db.apply_schema().await.unwrap();
        let seq1 = next_sequence(&db, "c1").await.unwrap();
        assert_eq!(seq1, 1);
        append(&db, &entry("c1", seq1, "started")).await.unwrap();
        let seq2 = next_sequence(&db, "c1").await.unwrap();
        assert_eq!(seq2, 2);
        append(&db, &entry("c1", seq2, "running")).await.unwrap();

        let entries = list_since(&db, "c1", 0, 100).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "started");
        assert_eq!(entries[1].message, "running");
    }

    #[tokio::test]
    async fn list_since_excludes_already_seen_entries() {
        let db = Db::connect("sqlite::memory:").await.unwrap();
        db.apply_schema().await.unwrap();
        append(&db, &entry("c1", 1, "a")).await.unwrap();
        append(&db, &entry("c1", 2, "b")).await.unwrap();
        let tail = list_since(&db, "c1", 1, 100).await.unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].message, "b");
    }
}
