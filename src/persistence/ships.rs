//! Ship "repository". Ship state is authoritative at the remote API, not in
//! the local store — there is no `ships` table. This module's job is purely
//! to reconstruct a located view of a ship by pairing a live API read with
//! the cached waypoint the ship currently sits at.

use crate::api_client::ApiClient;
use crate::error::GameApiError;
use crate::models::waypoint::Waypoint;
use crate::models::Ship;

use super::waypoints;
use super::Db;

/// A ship as read from the remote API, with its current waypoint resolved
/// from the cache (falling back to `None` on a cache miss — callers that
/// need the waypoint are expected to have warmed the cache via the route
/// planner or navigation executor already).
pub struct LocatedShip {
    pub ship: Ship,
    pub current_waypoint: Option<Waypoint>,
}

pub async fn get(
    api: &ApiClient,
    token: &str,
    db: &Db,
    ship_symbol: &str,
    waypoint_cache_ttl_secs: u64,
) -> Result<LocatedShip, GameApiError> {
    let ship = api.get_ship_checked(token, ship_symbol).await?;
    let current_waypoint = waypoints::find_waypoint(
        db,
        &ship.nav.waypoint_symbol,
        waypoint_cache_ttl_secs,
    )
    .await
    .ok()
    .flatten();
    Ok(LocatedShip { ship, current_waypoint })
}

pub async fn get_all(
    api: &ApiClient,
    token: &str,
    db: &Db,
    waypoint_cache_ttl_secs: u64,
) -> Result<Vec<LocatedShip>, GameApiError> {
    let ships = api.get_all_ships_checked(token).await?;
    let mut out = Vec::with_capacity(ships.len());
    for ship in ships {
        let current_waypoint = waypoints::find_waypoint(
            db,
            &ship.nav.waypoint_symbol,
            waypoint_cache_ttl_secs,
        )
        .await
        .ok()
        .flatten();
        out.push(LocatedShip { ship, current_waypoint });
    }
    Ok(out)
}
