//! The supervised task loop: one per running container (spec.md §4.6
//! "restart policy", §4.1/§4.4 "ship assignment acquire/release are
//! serialisable per (player, ship)"). The ship lock is held for the whole
//! active duration of the container, not reacquired per iteration.

use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::api_client::ApiClient;
use crate::config::CONFIG;
use crate::container_runtime::commands;
use crate::container_runtime::context::ContainerContext;
use crate::error::ContainerError;
use crate::models::container::{Container, ContainerStatus, RestartPolicy};
use crate::persistence::{containers, players, ship_assignments, Db};

/// How one pass through a container's task body ended.
enum RunOutcome {
    /// Cancellation observed — an operator `stop`, never retried regardless
    /// of restart policy.
    Cancelled,
    /// Ran to completion (bounded command exhausted its iterations, or a
    /// worker command returned after its own internal exit).
    Finished,
    Failed(String),
}

fn backoff_for(restart_count: u32) -> Duration {
    let base = CONFIG.container_restart_backoff_base_ms;
    let max = CONFIG.container_restart_backoff_max_ms;
    let scaled = base.saturating_mul(1u64 << restart_count.min(20));
    Duration::from_millis(scaled.min(max))
}

/// Drives `container_id` through restart policy until it reaches a terminal
/// state or the daemon asks it to stop. Reloads the container row on every
/// pass so an operator-issued `stop` (which flips status to STOPPING and
/// cancels the token) is observed even mid-backoff.
pub async fn run_supervised(db: Db, api: ApiClient, container_id: String, cancel: CancellationToken) {
    loop {
        if db.is_closed() {
            log::info!("[{}] database closed, exiting quietly", container_id);
            return;
        }
        let container = match containers::find_by_id(&db, &container_id).await {
            Ok(Some(c)) => c,
            Ok(None) => {
                log::warn!("[{}] container row vanished, stopping supervision", container_id);
                return;
            }
            Err(e) => {
                if e.is_closed() {
                    log::info!("[{}] database closed, exiting quietly", container_id);
                    return;
                }
                log::error!("[{}] failed to reload container row: {}", container_id, e);
                return;
            }
        };

        if let Err(e) = containers::update_status(
            &db,
            &container_id,
            ContainerStatus::Running,
            container.iteration,
            container.restart_count,
        )
        .await
        {
            log::error!("[{}] failed to persist RUNNING: {}", container_id, e);
        }

        let outcome = run_once(&db, &api, &container, &cancel).await;

        match outcome {
            RunOutcome::Cancelled => {
                persist_terminal(&db, &container_id, ContainerStatus::Stopped, container.iteration, container.restart_count).await;
                return;
            }
            RunOutcome::Finished => {
                if container.restart_policy == RestartPolicy::Always {
                    let restart_count = container.restart_count + 1;
                    persist_restarting(&db, &container_id, container.iteration, restart_count).await;
                    if sleep_or_cancel(backoff_for(restart_count), &cancel).await {
                        persist_terminal(&db, &container_id, ContainerStatus::Stopped, container.iteration, restart_count).await;
                        return;
                    }
                } else {
                    persist_terminal(&db, &container_id, ContainerStatus::Stopped, container.iteration, container.restart_count).await;
                    return;
                }
            }
            RunOutcome::Failed(message) => {
                log::error!("[{}] container task failed: {}", container_id, message);
                if container.restart_policy != RestartPolicy::No {
                    let restart_count = container.restart_count + 1;
                    persist_restarting(&db, &container_id, container.iteration, restart_count).await;
                    if sleep_or_cancel(backoff_for(restart_count), &cancel).await {
                        persist_terminal(&db, &container_id, ContainerStatus::Stopped, container.iteration, restart_count).await;
                        return;
                    }
                } else {
                    persist_terminal(&db, &container_id, ContainerStatus::Failed, container.iteration, container.restart_count).await;
                    return;
                }
            }
        }
    }
}

/// Sleeps `duration` unless cancelled first. Returns `true` if cancellation
/// won the race (caller should stop rather than restart).
async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = sleep(duration) => false,
        _ = cancel.cancelled() => true,
    }
}

async fn persist_terminal(db: &Db, container_id: &str, status: ContainerStatus, iteration: u32, restart_count: u32) {
    if let Err(e) = containers::update_status(db, container_id, status, iteration, restart_count).await {
        log::error!("[{}] failed to persist terminal status {}: {}", container_id, status, e);
    }
}

async fn persist_restarting(db: &Db, container_id: &str, iteration: u32, restart_count: u32) {
    if let Err(e) = containers::update_status(db, container_id, ContainerStatus::Starting, iteration, restart_count).await {
        log::error!("[{}] failed to persist STARTING before restart: {}", container_id, e);
    }
}

fn extract_ship_symbol(container: &Container) -> Option<String> {
    container.spec.params.get("shipSymbol")?.as_str().map(str::to_string)
}

/// One execution of the container's command against its current ship lock.
/// The lock, if any, is acquired once here and released exactly once before
/// returning, regardless of outcome.
async fn run_once(db: &Db, api: &ApiClient, container: &Container, cancel: &CancellationToken) -> RunOutcome {
    let ship_symbol = extract_ship_symbol(container);

    if let Some(ship_symbol) = &ship_symbol {
        match ship_assignments::assign(db, container.player_id, ship_symbol, &container.container_id, &container.kind).await {
            Ok(true) => {}
            Ok(false) => {
                return RunOutcome::Failed(format!("ship {} is already assigned to another container", ship_symbol));
            }
            Err(e) => return RunOutcome::Failed(format!("failed to acquire ship assignment: {}", e)),
        }
    }

    let token = match players::find_by_id(db, container.player_id).await {
        Ok(Some(player)) => player.token,
        Ok(None) => {
            if let Some(ship_symbol) = &ship_symbol {
                let _ = ship_assignments::release(db, container.player_id, ship_symbol, "player not found").await;
            }
            return RunOutcome::Failed(format!("player {} not found", container.player_id));
        }
        Err(e) => {
            if let Some(ship_symbol) = &ship_symbol {
                let _ = ship_assignments::release(db, container.player_id, ship_symbol, "player lookup failed").await;
            }
            return RunOutcome::Failed(format!("failed to load player {}: {}", container.player_id, e));
        }
    };

    let ctx = ContainerContext::new(db.clone(), api.clone(), container.container_id.clone(), container.player_id, token, cancel.clone());
    let outcome = if commands::is_worker(&container.spec.command) {
        run_single(&ctx, container, cancel).await
    } else {
        run_bounded_iterations(&ctx, container, cancel).await
    };

    if let Some(ship_symbol) = &ship_symbol {
        let reason = match &outcome {
            RunOutcome::Cancelled => "container stopped",
            RunOutcome::Finished => "container finished",
            RunOutcome::Failed(_) => "container failed",
        };
        if let Err(e) = ship_assignments::release(db, container.player_id, ship_symbol, reason).await {
            log::error!("[{}] failed to release ship assignment for {}: {}", container.container_id, ship_symbol, e);
        }
    }

    outcome
}

async fn run_single(ctx: &ContainerContext, container: &Container, cancel: &CancellationToken) -> RunOutcome {
    if cancel.is_cancelled() {
        return RunOutcome::Cancelled;
    }
    match commands::execute(ctx, &container.spec.command, &container.spec.params).await {
        Ok(()) => RunOutcome::Finished,
        Err(ContainerError::Cancelled) => RunOutcome::Cancelled,
        Err(e) => RunOutcome::Failed(e.to_string()),
    }
}

async fn run_bounded_iterations(ctx: &ContainerContext, container: &Container, cancel: &CancellationToken) -> RunOutcome {
    let mut iteration = container.iteration;
    loop {
        if cancel.is_cancelled() {
            return RunOutcome::Cancelled;
        }
        match commands::execute(ctx, &container.spec.command, &container.spec.params).await {
            Ok(()) => {}
            Err(ContainerError::Cancelled) => return RunOutcome::Cancelled,
            Err(e) => return RunOutcome::Failed(e.to_string()),
        }
        iteration += 1;
        if let Err(e) = containers::update_status(&ctx.db, &container.container_id, ContainerStatus::Running, iteration, container.restart_count).await {
            log::error!("[{}] failed to persist iteration count: {}", container.container_id, e);
        }
        if let Some(limit) = container.spec.iteration_limit {
            if iteration >= limit {
                return RunOutcome::Finished;
            }
        }
        if container.spec.iteration_interval_seconds > 0 {
            if sleep_or_cancel(Duration::from_secs(container.spec.iteration_interval_seconds), cancel).await {
                return RunOutcome::Cancelled;
            }
        }
    }
}
