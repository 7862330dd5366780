//! Portable integer id allocation.
//!
//! Neither backend's native identity column (SQLite `AUTOINCREMENT`,
//! Postgres `SERIAL`) is expressible in one schema file, so integer primary
//! keys are minted from a tiny `id_sequences` table instead — one atomic
//! upsert-and-increment per allocation, inside the same transaction as the
//! insert it's for.

use crate::error::PersistenceError;
use sqlx::{Any, Row, Transaction};

/// Allocates the next value for `name`, atomically. A read-then-write of
/// separate `SELECT`/`INSERT-or-UPDATE` statements races under concurrent
/// callers on the same sequence name: both transactions can read the same
/// `current` before either commits and compute the same `next`, so the
/// second caller's write doesn't rederive anything — it just repeats the
/// first caller's id, producing a duplicate-key insert failure downstream
/// for a legitimately distinct caller (e.g. two different ships' assign
/// calls racing on the `"ship_assignments"` sequence). The single
/// `INSERT ... ON CONFLICT DO UPDATE ... RETURNING` statement below is the
/// whole read-increment-write in one round trip, so the row's own lock
/// (held by the backend for the statement's duration) serializes it.
pub async fn next_id(tx: &mut Transaction<'_, Any>, db: &super::Db, name: &str) -> Result<i64, PersistenceError> {
    let upsert = db.sql(
        "INSERT INTO id_sequences (name, value) VALUES (?, 1) \
         ON CONFLICT (name) DO UPDATE SET value = id_sequences.value + 1 \
         RETURNING value",
    );
    let row = sqlx::query(&upsert).bind(name).fetch_one(&mut **tx).await?;
    row.try_get::<i64, _>("value").map_err(|e| PersistenceError::Query(e.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;
    use super::super::Db;

    #[tokio::test]
    async fn first_allocation_is_one() {
        let db = Db::connect("sqlite::memory:").await.unwrap();
        db.apply_schema().await.unwrap();
        let mut tx = db.pool().begin().await.unwrap();
        let id = next_id(&mut tx, &db, "widgets").await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(id, 1);
    }

    #[tokio::test]
    async fn sequential_allocations_are_strictly_increasing_and_unique() {
        let db = Db::connect("sqlite::memory:").await.unwrap();
        db.apply_schema().await.unwrap();
        let mut ids = Vec::new();
        for _ in 0..5 {
            let mut tx = db.pool().begin().await.unwrap();
            let id = next_id(&mut tx, &db, "widgets").await.unwrap();
            tx.commit().await.unwrap();
            ids.push(id);
        }
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn distinct_sequence_names_allocate_independently() {
        let db = Db::connect("sqlite::memory:").await.unwrap();
        db.apply_schema().await.unwrap();
        let mut tx_a = db.pool().begin().await.unwrap();
        let a1 = next_id(&mut tx_a, &db, "ships").await.unwrap();
        tx_a.commit().await.unwrap();
        let mut tx_b = db.pool().begin().await.unwrap();
        let b1 = next_id(&mut tx_b, &db, "routes").await.unwrap();
        tx_b.commit().await.unwrap();
        assert_eq!(a1, 1);
        assert_eq!(b1, 1);
    }
}
