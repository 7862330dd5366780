//! Structural graph + trait-bearing waypoint cache (spec.md §3, §4.3).
//!
//! `system_graphs` holds one row per charted system and is cached
//! indefinitely — coordinates, orbitals and connectivity never change once a
//! system is known. `waypoints` holds the trait-bearing view (traits,
//! market/shipyard/fuel flags) keyed solely on symbol and is subject to the
//! TTL in `Config::waypoint_cache_ttl_secs`; callers pass that TTL in rather
//! than this module reading `CONFIG` directly, so tests can use their own.

use crate::error::PersistenceError;
use crate::models::graph::SystemGraph;
use crate::models::waypoint::Waypoint;
use crate::models::{SystemSymbol, WaypointSymbol};
use chrono::{DateTime, Utc};
use sqlx::Row;

use super::pool::get_str;
use super::Db;

pub async fn save_graph(db: &Db, graph: &SystemGraph) -> Result<(), PersistenceError> {
    let upsert = db.sql(
        "INSERT INTO system_graphs (system_symbol, graph_json, updated_at) VALUES (?, ?, ?)
         ON CONFLICT (system_symbol) DO UPDATE SET graph_json = excluded.graph_json, updated_at = excluded.updated_at",
    );
    sqlx::query(&upsert)
        .bind(graph.system_symbol.to_string())
        .bind(serde_json::to_string(graph).map_err(|e| PersistenceError::Query(e.to_string()))?)
        .bind(Utc::now().to_rfc3339())
        .execute(db.pool())
        .await?;
    Ok(())
}

pub async fn find_graph(db: &Db, system_symbol: &SystemSymbol) -> Result<Option<SystemGraph>, PersistenceError> {
    let select = db.sql("SELECT graph_json FROM system_graphs WHERE system_symbol = ?");
    let row = sqlx::query(&select)
        .bind(system_symbol.to_string())
        .fetch_optional(db.pool())
        .await?;
    let Some(row) = row else { return Ok(None) };
    let graph_json = get_str(&row, "graph_json")?;
    Ok(Some(
        serde_json::from_str(&graph_json).map_err(|e| PersistenceError::Query(e.to_string()))?,
    ))
}

pub async fn upsert_waypoint(db: &Db, player_id: i64, waypoint: &Waypoint) -> Result<(), PersistenceError> {
    let upsert = db.sql(
        "INSERT INTO waypoints (player_id, system_symbol, symbol, type, traits_json, has_fuel, orbitals_json, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT (symbol) DO UPDATE SET
            type = excluded.type, traits_json = excluded.traits_json,
            has_fuel = excluded.has_fuel, orbitals_json = excluded.orbitals_json,
            updated_at = excluded.updated_at",
    );
    sqlx::query(&upsert)
        .bind(player_id)
        .bind(waypoint.system_symbol.to_string())
        .bind(waypoint.symbol.to_string())
        .bind(&waypoint.waypoint_type)
        .bind(serde_json::to_string(&waypoint.traits).map_err(|e| PersistenceError::Query(e.to_string()))?)
        .bind(waypoint.has_fuel() as i64)
        .bind(
            serde_json::to_string(&waypoint.orbitals)
                .map_err(|e| PersistenceError::Query(e.to_string()))?,
        )
        .bind(Utc::now().to_rfc3339())
        .execute(db.pool())
        .await?;
    Ok(())
}

/// Returns the cached waypoint iff it's younger than `ttl_secs`. A stale or
/// missing entry is `None` — the caller re-fetches from the remote API and
/// calls `upsert_waypoint` again (spec.md §3 cache-miss path).
pub async fn find_waypoint(
    db: &Db,
    symbol: &WaypointSymbol,
    ttl_secs: u64,
) -> Result<Option<Waypoint>, PersistenceError> {
    let select =
        db.sql("SELECT system_symbol, symbol, type, traits_json, orbitals_json, updated_at FROM waypoints WHERE symbol = ?");
    let row = sqlx::query(&select)
        .bind(symbol.to_string())
        .fetch_optional(db.pool())
        .await?;
    let Some(row) = row else { return Ok(None) };
    let updated_at: DateTime<Utc> = get_str(&row, "updated_at")?
        .parse()
        .map_err(|_| PersistenceError::Query("invalid updated_at".to_string()))?;
    if Utc::now().signed_duration_since(updated_at).num_seconds() > ttl_secs as i64 {
        return Ok(None);
    }
    Ok(Some(waypoint_from_row(&row)?))
}

pub async fn list_waypoints_for_system(
    db: &Db,
    system_symbol: &SystemSymbol,
    ttl_secs: u64,
) -> Result<Vec<Waypoint>, PersistenceError> {
    let select = db.sql(
        "SELECT system_symbol, symbol, type, traits_json, orbitals_json, updated_at FROM waypoints WHERE system_symbol = ?",
    );
    let rows = sqlx::query(&select)
        .bind(system_symbol.to_string())
        .fetch_all(db.pool())
        .await?;
    let now = Utc::now();
    rows.into_iter()
        .filter_map(|row| {
            let updated_at: DateTime<Utc> = match get_str(&row, "updated_at") {
                Ok(s) => s.parse().ok()?,
                Err(_) => return None,
            };
            if now.signed_duration_since(updated_at).num_seconds() > ttl_secs as i64 {
                return None;
            }
            Some(waypoint_from_row(&row))
        })
        .collect()
}

fn waypoint_from_row(row: &sqlx::any::AnyRow) -> Result<Waypoint, PersistenceError> {
    let traits_json = get_str(row, "traits_json")?;
    let orbitals_json = get_str(row, "orbitals_json")?;
    Ok(Waypoint {
        symbol: WaypointSymbol::new(&get_str(row, "symbol")?),
        system_symbol: SystemSymbol(get_str(row, "system_symbol")?),
        x: 0,
        y: 0,
        waypoint_type: get_str(row, "type")?,
        traits: serde_json::from_str(&traits_json).map_err(|e| PersistenceError::Query(e.to_string()))?,
        orbitals: serde_json::from_str(&orbitals_json).map_err(|e| PersistenceError::Query(e.to_string()))?,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::models::graph::GraphNode;

    fn sample_waypoint(symbol: &str) -> Waypoint {
        Waypoint {
            symbol: WaypointSymbol::new(symbol),
            system_symbol: SystemSymbol("X1-TZ26".to_string()),
            x: 12,
            y: -4,
            waypoint_type: "PLANET".to_string(),
            traits: vec!["MARKETPLACE".to_string()],
            orbitals: vec![],
        }
    }

    #[tokio::test]
    async fn graph_round_trips() {
        let db = Db::connect("sqlite::memory:").await.unwrap();
        db.apply_schema().await.unwrap();
        let graph = SystemGraph::build(vec![GraphNode {
            symbol: WaypointSymbol::new("X1-TZ26-A1"),
            x: 0,
            y: 0,
            waypoint_type: "PLANET".to_string(),
            orbitals: vec![],
        }]);
        save_graph(&db, &graph).await.unwrap();
        let found = find_graph(&db, &SystemSymbol("X1-TZ26".to_string())).await.unwrap().unwrap();
        assert_eq!(found.nodes.len(), 1);
    }

    #[tokio::test]
    async fn fresh_waypoint_is_returned_within_ttl() {
        let db = Db::connect("sqlite::memory:").await.unwrap();
        db.apply_schema().await.unwrap();
        upsert_waypoint(&db, 1, &sample_waypoint("X1-TZ26-A1")).await.unwrap();
        let found = find_waypoint(&db, &WaypointSymbol::new("X1-TZ26-A1"), 7200).await.unwrap();
        assert!(found.is_some());
        assert!(found.unwrap().has_fuel());
    }

    #[tokio::test]
    async fn zero_ttl_treats_every_entry_as_stale() {
        let db = Db::connect("sqlite::memory:").await.unwrap();
        db.apply_schema().await.unwrap();
        upsert_waypoint(&db, 1, &sample_waypoint("X1-TZ26-A1")).await.unwrap();
        let found = find_waypoint(&db, &WaypointSymbol::new("X1-TZ26-A1"), 0).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn missing_waypoint_is_none() {
        let db = Db::connect("sqlite::memory:").await.unwrap();
        db.apply_schema().await.unwrap();
        let found = find_waypoint(&db, &WaypointSymbol::new("X1-TZ26-A9"), 7200).await.unwrap();
        assert!(found.is_none());
    }
}
