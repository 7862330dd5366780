//! `market-scout-worker` command (spec.md §4.6): the one *worker container*
//! kind in scope — long-lived, internally loops until stopped rather than
//! running a bounded iteration count.
//!
//! Simplification noted in DESIGN.md: spec.md describes a worker dequeuing
//! from "a persistent queue (e.g. market pairs)"; this schema has no queue
//! table, so the work list here is derived each pass from every
//! MARKETPLACE-trait waypoint in the ship's home system — a perpetually
//! refreshing queue rather than a draining one, since market data never
//! stops being useful to refresh.

use std::time::Duration;

use serde::Deserialize;
use tokio::time::sleep;

use crate::container_runtime::context::ContainerContext;
use crate::error::ContainerError;
use crate::models::route::RouteStatus;
use crate::navigation;

const PASS_REST: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Params {
    pub ship_symbol: String,
}

pub async fn run(ctx: &ContainerContext, params: &serde_json::Value) -> Result<(), ContainerError> {
    let params: Params = serde_json::from_value(params.clone())
        .map_err(|e| ContainerError::InvalidState(format!("invalid market-scout-worker params: {}", e)))?;

    ctx.info(format!("market scout worker starting for {}", params.ship_symbol)).await;
    while !ctx.cancel.is_cancelled() {
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
        let queue: Vec<_> = waypoints
            .values()
            .filter(|w| w.traits.iter().any(|t| t == "MARKETPLACE"))
            .map(|w| w.symbol.clone())
            .collect();

        if queue.is_empty() {
            ctx.warn(format!("no marketplaces found in {}, ending pass", system)).await;
        }

        for waypoint in &queue {
            if ctx.cancel.is_cancelled() {
                break;
            }
            let route = navigation::navigate(&ctx.api, &ctx.token, &ctx.db, ctx.player_id, &params.ship_symbol, waypoint, &ctx.cancel).await?;
            match route.status {
                RouteStatus::Completed => match ctx.api.get_market_checked(&ctx.token, waypoint).await {
                    Ok(market) => {
                        if let Err(e) = crate::persistence::markets::save_snapshot(&ctx.db, ctx.player_id, &market).await {
                            ctx.warn(format!("failed to persist market snapshot for {}: {}", waypoint, e)).await;
                        } else {
                            ctx.debug(format!("refreshed market at {}", waypoint)).await;
                        }
                    }
                    Err(e) => ctx.warn(format!("failed to fetch market at {}: {}", waypoint, e)).await,
                },
                RouteStatus::Aborted => {
                    ctx.warn("market scout worker cancelled mid-route").await;
                    return Ok(());
                }
                other => ctx.warn(format!("leg to {} ended in {}, skipping", waypoint, other)).await,
            }
        }

        tokio::select! {
            _ = sleep(PASS_REST) => {}
            _ = ctx.cancel.cancelled() => break,
        }
    }
    ctx.info("market scout worker stopped").await;
    Ok(())
}
