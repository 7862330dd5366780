//! Ship-assignment lock (SAL) — spec.md §4.4.
//!
//! `assign` is one upsert-or-conflict statement: the partial unique index
//! `ship_assignments_active_unique` (migrations/0001) does the
//! serialisation, so two concurrent `assign` calls for the same (player,
//! ship) can't both succeed — the database rejects the second INSERT, and
//! this layer turns that into `Ok(false)` rather than an error.

use crate::error::PersistenceError;
use crate::models::ship_assignment::{AssignmentStatus, ShipAssignment};
use chrono::Utc;
use sqlx::Row;

use super::ids::next_id;
use super::pool::{get_i64, get_opt_str, get_str};
use super::Db;

/// Atomically inserts an active row iff no active row exists for
/// (player, ship). Returns `Ok(true)` on success, `Ok(false)` if another
/// assignment is already active — never an error for the losing caller.
pub async fn assign(
    db: &Db,
    player_id: i64,
    ship_symbol: &str,
    container_id: &str,
    kind: &str,
) -> Result<bool, PersistenceError> {
    let mut tx = db.pool().begin().await?;
    let id = next_id(&mut tx, db, "ship_assignments").await?;
    let insert = db.sql(
        "INSERT INTO ship_assignments
            (id, player_id, ship_symbol, container_id, kind, status, acquired_at, released_at, release_reason)
         VALUES (?, ?, ?, ?, ?, 'active', ?, NULL, NULL)",
    );
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(&insert)
        .bind(id)
        .bind(player_id)
        .bind(ship_symbol)
        .bind(container_id)
        .bind(kind)
        .bind(&now)
        .execute(&mut *tx)
        .await;

    match result {
        Ok(_) => {
            tx.commit().await?;
            Ok(true)
        }
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            tx.rollback().await.ok();
            Ok(false)
        }
        Err(other) => Err(other.into()),
    }
}

/// Marks the active row released. Idempotent: a no-op (not an error) if no
/// active row exists or it was already released — spec.md §8 round-trip.
pub async fn release(
    db: &Db,
    player_id: i64,
    ship_symbol: &str,
    reason: &str,
) -> Result<(), PersistenceError> {
    let update = db.sql(
        "UPDATE ship_assignments
         SET status = 'released', released_at = ?, release_reason = ?
         WHERE player_id = ? AND ship_symbol = ? AND status = 'active'",
    );
    sqlx::query(&update)
        .bind(Utc::now().to_rfc3339())
        .bind(reason)
        .bind(player_id)
        .bind(ship_symbol)
        .execute(db.pool())
        .await?;
    Ok(())
}

pub async fn check_available(db: &Db, player_id: i64, ship_symbol: &str) -> Result<bool, PersistenceError> {
    let select = db.sql(
        "SELECT 1 AS present FROM ship_assignments WHERE player_id = ? AND ship_symbol = ? AND status = 'active'",
    );
    let row = sqlx::query(&select)
        .bind(player_id)
        .bind(ship_symbol)
        .fetch_optional(db.pool())
        .await?;
    Ok(row.is_none())
}

pub async fn get_assignment_info(
    db: &Db,
    player_id: i64,
    ship_symbol: &str,
) -> Result<Option<ShipAssignment>, PersistenceError> {
    let select = db.sql(
        "SELECT id, player_id, ship_symbol, container_id, kind, status, acquired_at, released_at, release_reason
         FROM ship_assignments
         WHERE player_id = ? AND ship_symbol = ?
         ORDER BY id DESC LIMIT 1",
    );
    let row = sqlx::query(&select)
        .bind(player_id)
        .bind(ship_symbol)
        .fetch_optional(db.pool())
        .await?;
    let Some(row) = row else { return Ok(None) };
    let status_str = get_str(&row, "status")?;
    Ok(Some(ShipAssignment {
        id: get_i64(&row, "id")?,
        player_id: get_i64(&row, "player_id")?,
        ship_symbol: get_str(&row, "ship_symbol")?,
        container_id: get_str(&row, "container_id")?,
        kind: get_str(&row, "kind")?,
        status: if status_str == "active" {
            AssignmentStatus::Active
        } else {
            AssignmentStatus::Released
        },
        acquired_at: get_str(&row, "acquired_at")?.parse().map_err(|_| {
            PersistenceError::Query("invalid acquired_at timestamp".to_string())
        })?,
        released_at: get_opt_str(&row, "released_at")?
            .map(|s| s.parse())
            .transpose()
            .map_err(|_| PersistenceError::Query("invalid released_at timestamp".to_string()))?,
        release_reason: get_opt_str(&row, "release_reason")?,
    }))
}

#[cfg(test)]
mod test {
    use super::*;

    // Exercises spec.md §8 invariant 7: assign/release/assign succeeds.
    #[tokio::test]
    async fn second_concurrent_assign_fails_first_succeeds() {
        let db = Db::connect("sqlite::memory:").await.unwrap();
        let create = db.sql(
            "CREATE TABLE id_sequences (name TEXT PRIMARY KEY, value INTEGER NOT NULL)",
        );
        sqlx::query(&create).execute(db.pool()).await.unwrap();
        let create_tbl = db.sql(
            "CREATE TABLE ship_assignments (
                id INTEGER PRIMARY KEY, player_id INTEGER NOT NULL, ship_symbol TEXT NOT NULL,
                container_id TEXT NOT NULL, kind TEXT NOT NULL, status TEXT NOT NULL,
                acquired_at TEXT NOT NULL, released_at TEXT, release_reason TEXT)",
        );
        sqlx::query(&create_tbl).execute(db.pool()).await.unwrap();
        let index = db.sql(
            "CREATE UNIQUE INDEX ship_assignments_active_unique ON ship_assignments (player_id, ship_symbol) WHERE status = 'active'",
        );
        sqlx::query(&index).execute(db.pool()).await.unwrap();

        assert!(assign(&db, 1, "S1", "c1", "navigate").await.unwrap());
        assert!(!assign(&db, 1, "S1", "c2", "navigate").await.unwrap());
        release(&db, 1, "S1", "stop").await.unwrap();
        assert!(assign(&db, 1, "S1", "c2", "navigate").await.unwrap());
    }
}
