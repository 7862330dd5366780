//! Player repository (spec.md §3, §4.3). Created once at registration,
//! mutated by credit/last-active updates, never deleted.

use crate::error::PersistenceError;
use crate::models::player::Player;
use chrono::Utc;
use serde_json::Value;
use sqlx::Row;

use super::ids::next_id;
use super::pool::{get_i64, get_str};
use super::Db;

pub async fn create(
    db: &Db,
    agent_symbol: &str,
    token: &str,
    metadata: Value,
) -> Result<Player, PersistenceError> {
    let mut tx = db.pool().begin().await?;
    let id = next_id(&mut tx, db, "players").await?;
    let now = Utc::now();
    let insert = db.sql(
        "INSERT INTO players (id, agent_symbol, token, credits, created_at, last_active, metadata_json)
         VALUES (?, ?, ?, 0, ?, ?, ?)",
    );
    let result = sqlx::query(&insert)
        .bind(id)
        .bind(agent_symbol)
        .bind(token)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .bind(metadata.to_string())
        .execute(&mut *tx)
        .await;
    match result {
        Ok(_) => tx.commit().await?,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(PersistenceError::Duplicate(format!("agent {} already registered", agent_symbol)));
        }
        Err(other) => return Err(other.into()),
    }
    Ok(Player {
        id,
        agent_symbol: agent_symbol.to_string(),
        token: token.to_string(),
        credits: 0,
        created_at: now,
        last_active: now,
        metadata,
    })
}

pub async fn find_by_id(db: &Db, id: i64) -> Result<Option<Player>, PersistenceError> {
    let select = db.sql(
        "SELECT id, agent_symbol, token, credits, created_at, last_active, metadata_json FROM players WHERE id = ?",
    );
    let row = sqlx::query(&select).bind(id).fetch_optional(db.pool()).await?;
    row.map(from_row).transpose()
}

pub async fn find_by_agent_symbol(db: &Db, agent_symbol: &str) -> Result<Option<Player>, PersistenceError> {
    let select = db.sql(
        "SELECT id, agent_symbol, token, credits, created_at, last_active, metadata_json FROM players WHERE agent_symbol = ?",
    );
    let row = sqlx::query(&select).bind(agent_symbol).fetch_optional(db.pool()).await?;
    row.map(from_row).transpose()
}

pub async fn update_credits(db: &Db, id: i64, credits: i64) -> Result<(), PersistenceError> {
    let update = db.sql("UPDATE players SET credits = ? WHERE id = ?");
    sqlx::query(&update).bind(credits).bind(id).execute(db.pool()).await?;
    Ok(())
}

pub async fn touch_last_active(db: &Db, id: i64) -> Result<(), PersistenceError> {
    let update = db.sql("UPDATE players SET last_active = ? WHERE id = ?");
    sqlx::query(&update)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(db.pool())
        .await?;
    Ok(())
}

fn from_row(row: sqlx::any::AnyRow) -> Result<Player, PersistenceError> {
    let metadata_json = get_str(&row, "metadata_json")?;
    Ok(Player {
        id: get_i64(&row, "id")?,
        agent_symbol: get_str(&row, "agent_symbol")?,
        token: get_str(&row, "token")?,
        credits: get_i64(&row, "credits")?,
        created_at: get_str(&row, "created_at")?
            .parse()
            .map_err(|_| PersistenceError::Query("invalid created_at".to_string()))?,
        last_active: get_str(&row, "last_active")?
            .parse()
            .map_err(|_| PersistenceError::Query("invalid last_active".to_string()))?,
        metadata: serde_json::from_str(&metadata_json).unwrap_or(Value::Null),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn create_then_find_round_trips() {
        let db = Db::connect("sqlite::memory:").await.unwrap();
        db.apply_schema().await.unwrap();
        let player = create(&db, "EMBER_QUEEN", "tok", serde_json::json!({})).await.unwrap();
        let found = find_by_agent_symbol(&db, "EMBER_QUEEN").await.unwrap().unwrap();
        assert_eq!(found.id, player.id);
        assert_eq!(found.credits, 0);
    }

    #[tokio::test]
    async fn duplicate_agent_symbol_is_rejected() {
        let db = Db::connect("sqlite::memory:").await.unwrap();
        db.apply_schema().await.unwrap();
        create(&db, "DUP", "tok1", serde_json::json!({})).await.unwrap();
        let err = create(&db, "DUP", "tok2", serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Duplicate(_)));
    }
}
