//! Drives a ship along a planned route, segment by segment: docking,
//! orbiting, refueling and flight-mode changes, polled against the live ship
//! nav-status rather than assumed local state. Cancellation is cooperative —
//! observed at every suspension point via `tokio_util::sync::CancellationToken`.

mod executor;
mod graph;

pub use executor::execute_route;
pub use graph::load_system_waypoints;

use crate::api_client::ApiClient;
use crate::error::RoutePlanError;
use crate::models::route::Route;
use crate::models::WaypointSymbol;
use crate::persistence::{routes, Db};
use crate::route_planner::shortest_path::PlanError;
use crate::route_planner::{find_optimal_path, DEFAULT_SAFETY_MARGIN};
use tokio_util::sync::CancellationToken;

/// Plans a route from `ship_symbol`'s current waypoint to `destination` and
/// drives it to completion, failure or cancellation. Returns the terminal
/// `Route` — callers read `route.status` for the outcome.
pub async fn navigate(
    api: &ApiClient,
    token: &str,
    db: &Db,
    player_id: i64,
    ship_symbol: &str,
    destination: &WaypointSymbol,
    cancel: &CancellationToken,
) -> Result<Route, RoutePlanError> {
    let ship = api.get_ship_checked(token, ship_symbol).await?;
    let system = ship.nav.waypoint_symbol.system();
    let waypoints = load_system_waypoints(
        api,
        token,
        db,
        player_id,
        &system,
        crate::config::CONFIG.waypoint_cache_ttl_secs,
    )
    .await?;

    let planned = find_optimal_path(
        &waypoints,
        &ship.nav.waypoint_symbol,
        destination,
        ship.fuel.current,
        ship.fuel.capacity,
        ship.engine.speed,
        true,
        DEFAULT_SAFETY_MARGIN,
    )
    .map_err(|e| match e {
        PlanError::NoPath => RoutePlanError::NoPath {
            from: ship.nav.waypoint_symbol.to_string(),
            to: destination.to_string(),
        },
        PlanError::UnknownStart(s) | PlanError::UnknownGoal(s) => RoutePlanError::UnknownWaypoint(s),
    })?;

    let mut route = Route::new(
        player_id,
        ship_symbol.to_string(),
        planned.segments,
        ship.fuel.capacity,
        planned.pre_departure_refuel,
    );
    routes::save(db, &route).await?;

    execute_route(api, token, db, &mut route, cancel).await?;
    Ok(route)
}
