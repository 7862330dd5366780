//! `scout-tour` command (spec.md §4.6, §4.1 tour optimization): visits every
//! waypoint in a ship's home system in optimized order, refreshing the
//! market snapshot at each stop that carries one.
//!
//! Simplification noted in DESIGN.md: the tour solver gives a visit order
//! and optimistic per-leg timings, but each leg is actually driven through
//! the navigation executor (full fuel/refuel/cancellation handling) rather
//! than executing the solver's own leg estimates directly.

use std::time::Duration;

use serde::Deserialize;

use crate::container_runtime::context::ContainerContext;
use crate::error::ContainerError;
use crate::models::route::RouteStatus;
use crate::navigation;
use crate::route_planner::optimize_tour;

const TOUR_COMPUTE_BUDGET: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Params {
    pub ship_symbol: String,
    #[serde(default)]
    pub return_to_start: bool,
}

pub async fn run(ctx: &ContainerContext, params: &serde_json::Value) -> Result<(), ContainerError> {
    let params: Params = serde_json::from_value(params.clone())
        .map_err(|e| ContainerError::InvalidState(format!("invalid scout-tour params: {}", e)))?;

    let ship = ctx.api.get_ship_checked(&ctx.token, &params.ship_symbol).await?;
    let system = ship.nav.waypoint_symbol.system();
    let waypoints = navigation::load_system_waypoints(
        &ctx.api,
        &ctx.token,
        &ctx.db,
        ctx.player_id,
        &system,
        crate::config::CONFIG.waypoint_cache_ttl_secs,
    )
    .await?;
    let stops: Vec<_> = waypoints.keys().cloned().collect();

    let Some(tour) = optimize_tour(
        &waypoints,
        &stops,
        &ship.nav.waypoint_symbol,
        params.return_to_start,
        ship.fuel.capacity,
        ship.engine.speed,
        TOUR_COMPUTE_BUDGET,
    ) else {
        ctx.warn("no feasible tour over the current system").await;
        return Ok(());
    };

    ctx.info(format!("scouting {} waypoints in {}", tour.order.len(), system)).await;
    for stop in tour.order.iter().skip(1) {
        if ctx.cancel.is_cancelled() {
            ctx.warn("scout tour cancelled between legs").await;
            return Ok(());
        }
        let route = navigation::navigate(&ctx.api, &ctx.token, &ctx.db, ctx.player_id, &params.ship_symbol, stop, &ctx.cancel).await?;
        match route.status {
            RouteStatus::Completed => {
                if let Ok(market) = ctx.api.get_market_checked(&ctx.token, stop).await {
                    if let Err(e) = crate::persistence::markets::save_snapshot(&ctx.db, ctx.player_id, &market).await {
                        ctx.warn(format!("failed to persist market snapshot for {}: {}", stop, e)).await;
                    }
                }
            }
            RouteStatus::Aborted => {
                ctx.warn("scout tour cancelled mid-route").await;
                return Ok(());
            }
            other => {
                return Err(ContainerError::InvalidState(format!("leg to {} ended in {}", stop, other)));
            }
        }
    }
    ctx.info("scout tour complete").await;
    Ok(())
}
