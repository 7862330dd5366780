//! Container record repository (spec.md §4.1, §4.3). `containers` is the
//! crash-safe source of truth for container_runtime's registry — on daemon
//! restart, every row in a non-terminal status is a container the runtime
//! must reconcile (spec.md §4.1 "crash-safe recovery").

use crate::error::PersistenceError;
use crate::models::container::{Container, ContainerSpec, ContainerStatus, RestartPolicy};
use chrono::Utc;
use sqlx::Row;
use std::str::FromStr;

use super::pool::{get_i64, get_str};
use super::Db;

pub async fn create(db: &Db, container: &Container) -> Result<(), PersistenceError> {
    let insert = db.sql(
        "INSERT INTO containers
            (container_id, player_id, type, status, iteration, restart_count, restart_policy, config_json, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    );
    sqlx::query(&insert)
        .bind(&container.container_id)
        .bind(container.player_id)
        .bind(&container.kind)
        .bind(container.status.to_string())
        .bind(container.iteration as i64)
        .bind(container.restart_count as i64)
        .bind(container.restart_policy.to_string())
        .bind(serde_json::to_string(&container.spec).map_err(|e| PersistenceError::Query(e.to_string()))?)
        .bind(container.created_at.to_rfc3339())
        .bind(container.updated_at.to_rfc3339())
        .execute(db.pool())
        .await?;
    Ok(())
}

pub async fn find_by_id(db: &Db, container_id: &str) -> Result<Option<Container>, PersistenceError> {
    let select = db.sql(
        "SELECT container_id, player_id, type, status, iteration, restart_count, restart_policy, config_json, created_at, updated_at
         FROM containers WHERE container_id = ?",
    );
    let row = sqlx::query(&select).bind(container_id).fetch_optional(db.pool()).await?;
    row.map(from_row).transpose()
}

pub async fn list_for_player(db: &Db, player_id: i64) -> Result<Vec<Container>, PersistenceError> {
    let select = db.sql(
        "SELECT container_id, player_id, type, status, iteration, restart_count, restart_policy, config_json, created_at, updated_at
         FROM containers WHERE player_id = ? ORDER BY created_at",
    );
    let rows = sqlx::query(&select).bind(player_id).fetch_all(db.pool()).await?;
    rows.into_iter().map(from_row).collect()
}

/// Every row whose status isn't terminal — what a restarting daemon must
/// reconcile (spec.md §4.1).
pub async fn list_non_terminal(db: &Db) -> Result<Vec<Container>, PersistenceError> {
    let select = db.sql(
        "SELECT container_id, player_id, type, status, iteration, restart_count, restart_policy, config_json, created_at, updated_at
         FROM containers WHERE status NOT IN ('STOPPED', 'FAILED', 'REMOVED')",
    );
    let rows = sqlx::query(&select).fetch_all(db.pool()).await?;
    rows.into_iter().map(from_row).collect()
}

/// All rows across every player, REMOVED included — `container.list` with no
/// `player_id` filter (spec.md §6). Callers that need the default listing
/// behaviour (REMOVED hidden) filter the result themselves.
pub async fn list_all(db: &Db) -> Result<Vec<Container>, PersistenceError> {
    let select = db.sql(
        "SELECT container_id, player_id, type, status, iteration, restart_count, restart_policy, config_json, created_at, updated_at
         FROM containers ORDER BY created_at",
    );
    let rows = sqlx::query(&select).fetch_all(db.pool()).await?;
    rows.into_iter().map(from_row).collect()
}

pub async fn update_status(
    db: &Db,
    container_id: &str,
    status: ContainerStatus,
    iteration: u32,
    restart_count: u32,
) -> Result<(), PersistenceError> {
    let update = db.sql(
        "UPDATE containers SET status = ?, iteration = ?, restart_count = ?, updated_at = ? WHERE container_id = ?",
    );
    sqlx::query(&update)
        .bind(status.to_string())
        .bind(iteration as i64)
        .bind(restart_count as i64)
        .bind(Utc::now().to_rfc3339())
        .bind(container_id)
        .execute(db.pool())
        .await?;
    Ok(())
}

pub async fn delete(db: &Db, container_id: &str) -> Result<(), PersistenceError> {
    let delete = db.sql("DELETE FROM containers WHERE container_id = ?");
    sqlx::query(&delete).bind(container_id).execute(db.pool()).await?;
    Ok(())
}

fn from_row(row: sqlx::any::AnyRow) -> Result<Container, PersistenceError> {
    let config_json = get_str(&row, "config_json")?;
    let status_str = get_str(&row, "status")?;
    let policy_str = get_str(&row, "restart_policy")?;
    Ok(Container {
        container_id: get_str(&row, "container_id")?,
        player_id: get_i64(&row, "player_id")?,
        kind: get_str(&row, "type")?,
        status: ContainerStatus::from_str(&status_str)
            .map_err(|_| PersistenceError::Query(format!("invalid container status {}", status_str)))?,
        iteration: get_i64(&row, "iteration")? as u32,
        restart_count: get_i64(&row, "restart_count")? as u32,
        restart_policy: RestartPolicy::from_str(&policy_str)
            .map_err(|_| PersistenceError::Query(format!("invalid restart policy {}", policy_str)))?,
        spec: serde_json::from_str::<ContainerSpec>(&config_json)
            .map_err(|e| PersistenceError::Query(e.to_string()))?,
        created_at: get_str(&row, "created_at")?
            .parse()
            .map_err(|_| PersistenceError::Query("invalid created_at".to_string()))?,
        updated_at: get_str(&row, "updated_at")?
            .parse()
            .map_err(|_| PersistenceError::Query("invalid updated_at".to_string()))?,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn sample(id: &str) -> Container {
        let now = Utc::now();
        Container {
            container_id: id.to_string(),
            player_id: 1,
            kind: "navigate".to_string(),
            status: ContainerStatus::Pending,
            iteration: 0,
            restart_count: 0,
            restart_policy: RestartPolicy::No,
            spec: ContainerSpec {
                command: "navigate".to_string(),
                params: json!({"shipSymbol": "S1-1"}),
                iteration_limit: None,
                iteration_interval_seconds: 0,
                autostart: false,
            },
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn create_then_find_round_trips() {
        let db = Db::connect("sqlite::memory:").await.unwrap();
        db.apply_schema().await.unwrap();
        create(&db, &sample("c1")).await.unwrap();
        let found = find_by_id(&db, "c1").await.unwrap().unwrap();
        assert_eq!(found.kind, "navigate");
        assert_eq!(found.status, ContainerStatus::Pending);
    }

    #[tokio::test]
    async fn non_terminal_filter_excludes_stopped() {
        let db = Db::connect("sqlite::memory:").await.unwrap();
        db.apply_schema().await.unwrap();
        create(&db, &sample("running")).await.unwrap();
        update_status(&db, "running", ContainerStatus::Running, 1, 0).await.unwrap();
        let mut stopped = sample("stopped");
        stopped.status = ContainerStatus::Stopped;
        create(&db, &stopped).await.unwrap();

        let pending = list_non_terminal(&db).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].container_id, "running");
    }
}
