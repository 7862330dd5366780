//! Command registry: one file per named ship behaviour, dispatched by name
//! from `ContainerSpec::command` rather than hardcoded per-ship assignment.

mod batch_contract_workflow;
mod market_scout_worker;
mod navigate;
mod scout_tour;

use crate::container_runtime::context::ContainerContext;
use crate::error::ContainerError;

/// `market-scout-worker` is the one worker-kind container in scope
/// (spec.md §4.6): it runs until stopped instead of a bounded iteration
/// count, so the outer task loop dispatches it differently.
pub fn is_worker(command: &str) -> bool {
    command == "market-scout-worker"
}

pub async fn execute(ctx: &ContainerContext, command: &str, params: &serde_json::Value) -> Result<(), ContainerError> {
    match command {
        "navigate" => navigate::run(ctx, params).await,
        "scout-tour" => scout_tour::run(ctx, params).await,
        "batch-contract-workflow" => batch_contract_workflow::run(ctx, params).await,
        "market-scout-worker" => market_scout_worker::run(ctx, params).await,
        other => Err(ContainerError::UnknownCommand(other.to_string())),
    }
}
