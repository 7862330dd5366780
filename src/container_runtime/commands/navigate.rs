//! `navigate` command (spec.md §4.6): plans and drives one ship to a
//! destination via the navigation executor, one container iteration == one
//! `navigate()` call.

use serde::Deserialize;

use crate::container_runtime::context::ContainerContext;
use crate::error::ContainerError;
use crate::models::route::RouteStatus;
use crate::models::WaypointSymbol;
use crate::navigation;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Params {
    pub ship_symbol: String,
    pub destination: WaypointSymbol,
}

pub async fn run(ctx: &ContainerContext, params: &serde_json::Value) -> Result<(), ContainerError> {
    let params: Params = serde_json::from_value(params.clone())
        .map_err(|e| ContainerError::InvalidState(format!("invalid navigate params: {}", e)))?;

    ctx.info(format!("navigating {} to {}", params.ship_symbol, params.destination)).await;
    let route = navigation::navigate(
        &ctx.api,
        &ctx.token,
        &ctx.db,
        ctx.player_id,
        &params.ship_symbol,
        &params.destination,
        &ctx.cancel,
    )
    .await?;

    match route.status {
        RouteStatus::Completed => {
            ctx.info(format!("{} arrived at {}", params.ship_symbol, params.destination)).await;
            Ok(())
        }
        RouteStatus::Aborted => {
            ctx.warn("navigate cancelled mid-route").await;
            Ok(())
        }
        other => {
            ctx.error(format!("route ended in {}", other)).await;
            Err(ContainerError::InvalidState(format!("route ended in {}", other)))
        }
    }
}
