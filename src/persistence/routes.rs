//! Route aggregate persistence (spec.md §4.3, §4.5). A `Route` is stored as
//! one JSON blob — `segments`, `status` and `current_segment_index` all move
//! together under navigation::Executor's control, so there's no benefit to
//! normalising segments into their own table.

use crate::error::PersistenceError;
use crate::models::route::{Route, RouteStatus};
use chrono::Utc;
use sqlx::Row;
use std::str::FromStr;

use super::ids::next_id;
use super::pool::get_str;
use super::Db;

#[derive(serde::Serialize, serde::Deserialize)]
struct StoredRoute {
    id: uuid::Uuid,
    ship_symbol: String,
    player_id: i64,
    segments: Vec<crate::models::route::Segment>,
    ship_fuel_capacity: i64,
    status: RouteStatus,
    current_segment_index: usize,
    pre_departure_refuel: bool,
}

impl From<&Route> for StoredRoute {
    fn from(r: &Route) -> Self {
        StoredRoute {
            id: r.id,
            ship_symbol: r.ship_symbol.clone(),
            player_id: r.player_id,
            segments: r.segments.clone(),
            ship_fuel_capacity: r.ship_fuel_capacity,
            status: r.status,
            current_segment_index: r.current_segment_index,
            pre_departure_refuel: r.pre_departure_refuel,
        }
    }
}

impl From<StoredRoute> for Route {
    fn from(s: StoredRoute) -> Self {
        Route {
            id: s.id,
            ship_symbol: s.ship_symbol,
            player_id: s.player_id,
            segments: s.segments,
            ship_fuel_capacity: s.ship_fuel_capacity,
            status: s.status,
            current_segment_index: s.current_segment_index,
            pre_departure_refuel: s.pre_departure_refuel,
        }
    }
}

pub async fn save(db: &Db, route: &Route) -> Result<(), PersistenceError> {
    let mut tx = db.pool().begin().await?;
    let id = next_id(&mut tx, db, "routes").await?;
    let insert = db.sql(
        "INSERT INTO routes (id, route_id, player_id, ship_symbol, segments_json, status, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    );
    let stored = StoredRoute::from(route);
    sqlx::query(&insert)
        .bind(id)
        .bind(route.id.to_string())
        .bind(route.player_id)
        .bind(&route.ship_symbol)
        .bind(serde_json::to_string(&stored).map_err(|e| PersistenceError::Query(e.to_string()))?)
        .bind(route.status.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

/// Persists the route's current segments/status/index after an
/// Executor step — spec.md §4.5 "Route status persisted after each segment".
pub async fn update(db: &Db, route: &Route) -> Result<(), PersistenceError> {
    let update = db.sql("UPDATE routes SET segments_json = ?, status = ? WHERE route_id = ?");
    let stored = StoredRoute::from(route);
    sqlx::query(&update)
        .bind(serde_json::to_string(&stored).map_err(|e| PersistenceError::Query(e.to_string()))?)
        .bind(route.status.to_string())
        .bind(route.id.to_string())
        .execute(db.pool())
        .await?;
    Ok(())
}

pub async fn find_by_id(db: &Db, route_id: uuid::Uuid) -> Result<Option<Route>, PersistenceError> {
    let select = db.sql("SELECT segments_json FROM routes WHERE route_id = ?");
    let row = sqlx::query(&select)
        .bind(route_id.to_string())
        .fetch_optional(db.pool())
        .await?;
    let Some(row) = row else { return Ok(None) };
    let segments_json = get_str(&row, "segments_json")?;
    let stored: StoredRoute =
        serde_json::from_str(&segments_json).map_err(|e| PersistenceError::Query(e.to_string()))?;
    Ok(Some(stored.into()))
}

/// Every route for `ship_symbol` still EXECUTING — what a restarting daemon
/// must resume or fail, per spec.md §4.1 crash-safe recovery.
pub async fn find_executing_for_ship(
    db: &Db,
    player_id: i64,
    ship_symbol: &str,
) -> Result<Vec<Route>, PersistenceError> {
    let select = db.sql(
        "SELECT segments_json FROM routes WHERE player_id = ? AND ship_symbol = ? AND status = 'EXECUTING'",
    );
    let rows = sqlx::query(&select)
        .bind(player_id)
        .bind(ship_symbol)
        .fetch_all(db.pool())
        .await?;
    rows.into_iter()
        .map(|row| {
            let segments_json = get_str(&row, "segments_json")?;
            let stored: StoredRoute =
                serde_json::from_str(&segments_json).map_err(|e| PersistenceError::Query(e.to_string()))?;
            Ok(stored.into())
        })
        .collect()
}

// Kept for symmetry with other repos' `from_row`-style helpers even though
// routes are stored whole; parses a bare status string for callers that only
// need it (container_runtime reconciliation).
pub fn parse_status(s: &str) -> Result<RouteStatus, PersistenceError> {
    RouteStatus::from_str(s).map_err(|_| PersistenceError::Query(format!("invalid route status {}", s)))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::models::route::{FlightMode, Segment};
    use crate::models::WaypointSymbol;

    fn route() -> Route {
        Route::new(
            1,
            "S1-1".to_string(),
            vec![Segment {
                from: WaypointSymbol::new("X1-TZ26-A1"),
                to: WaypointSymbol::new("X1-TZ26-A2"),
                distance: 10,
                fuel_required: 10,
                travel_time_seconds: 15,
                flight_mode: FlightMode::Cruise,
                requires_refuel: false,
            }],
            400,
            false,
        )
    }

    #[tokio::test]
    async fn save_then_find_round_trips() {
        let db = Db::connect("sqlite::memory:").await.unwrap();
        db.apply_schema().await.unwrap();
        let mut r = route();
        save(&db, &r).await.unwrap();
        r.start().unwrap();
        update(&db, &r).await.unwrap();

        let found = find_by_id(&db, r.id).await.unwrap().unwrap();
        assert_eq!(found.status, RouteStatus::Executing);
        assert_eq!(found.segments.len(), 1);
    }

    #[tokio::test]
    async fn find_executing_for_ship_only_returns_executing_routes() {
        let db = Db::connect("sqlite::memory:").await.unwrap();
        db.apply_schema().await.unwrap();
        let mut executing = route();
        save(&db, &executing).await.unwrap();
        executing.start().unwrap();
        update(&db, &executing).await.unwrap();

        let planned = route();
        save(&db, &planned).await.unwrap();

        let found = find_executing_for_ship(&db, 1, "S1-1").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, executing.id);
    }
}
