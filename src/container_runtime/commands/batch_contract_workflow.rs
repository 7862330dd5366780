//! `batch-contract-workflow` command (spec.md §4.6, §7 "user-visible
//! behaviour"): negotiate/accept/deliver/fulfill a run of contracts for one
//! ship, accumulating an aggregate report rather than failing the whole
//! container on the first contract's business error — grounded in
//! `original_source`'s batch-workflow error reporting rules.

use serde::{Deserialize, Serialize};

use crate::container_runtime::context::ContainerContext;
use crate::error::{ContainerError, GameApiError};
use crate::models::Contract;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Params {
    pub ship_symbol: String,
    #[serde(default = "default_max_contracts")]
    pub max_contracts: u32,
}

fn default_max_contracts() -> u32 {
    1
}

#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub negotiated: u32,
    pub accepted: u32,
    pub fulfilled: u32,
    pub failed: u32,
    pub errors: Vec<String>,
}

pub async fn run(ctx: &ContainerContext, params: &serde_json::Value) -> Result<(), ContainerError> {
    let params: Params = serde_json::from_value(params.clone())
        .map_err(|e| ContainerError::InvalidState(format!("invalid batch-contract-workflow params: {}", e)))?;

    let mut report = BatchReport::default();
    for round in 0..params.max_contracts {
        if ctx.cancel.is_cancelled() {
            ctx.warn("batch contract workflow cancelled between contracts").await;
            break;
        }
        match run_one_contract(ctx, &params.ship_symbol, &mut report).await {
            Ok(()) => {}
            Err(e) => {
                report.failed += 1;
                let message = format!("contract round {}: {}", round, e);
                report.errors.push(message.clone());
                ctx.error(message).await;
            }
        }
    }

    ctx.info(format!(
        "batch contract workflow done: negotiated={} accepted={} fulfilled={} failed={}",
        report.negotiated, report.accepted, report.fulfilled, report.failed
    ))
    .await;
    Ok(())
}

/// One contract's full negotiate -> accept -> deliver -> fulfill cycle.
/// A `ContractNegotiation`-class business error (spec.md §7) stops this one
/// contract's progress but is recorded, not propagated — the caller's
/// `report.errors` list is the spec's required surface for it.
async fn run_one_contract(
    ctx: &ContainerContext,
    ship_symbol: &str,
    report: &mut BatchReport,
) -> Result<(), GameApiError> {
    let contract = ctx.api.negotiate_contract_checked(&ctx.token, ship_symbol).await?;
    report.negotiated += 1;
    ctx.debug(format!("negotiated contract {}", contract.id)).await;

    let contract = ctx.api.accept_contract_checked(&ctx.token, &contract.id).await?;
    report.accepted += 1;
    ctx.debug(format!("accepted contract {}", contract.id)).await;

    deliver_all(ctx, &contract, ship_symbol).await?;

    let contract = ctx.api.fulfill_contract_checked(&ctx.token, &contract.id).await?;
    if contract.fulfilled {
        report.fulfilled += 1;
        ctx.info(format!("fulfilled contract {}", contract.id)).await;
    }
    Ok(())
}

/// Delivers every `terms.deliver` line still short of `units_required`. Cargo
/// acquisition (buying the trade good) is out of scope here — this command
/// assumes the ship already carries what the contract demands, matching
/// `original_source`'s narrow batch-workflow contract (it composes with a
/// separate purchasing container rather than doing both itself).
async fn deliver_all(ctx: &ContainerContext, contract: &Contract, ship_symbol: &str) -> Result<(), GameApiError> {
    for line in &contract.terms.deliver {
        if line.units_fulfilled >= line.units_required {
            continue;
        }
        let remaining = line.units_required - line.units_fulfilled;
        ctx.api
            .deliver_contract_checked(&ctx.token, &contract.id, ship_symbol, &line.trade_symbol, remaining)
            .await?;
    }
    Ok(())
}
