//! Container runtime (spec.md §4.6): the supervised scheduler of
//! independent container tasks. `Runtime` owns the in-memory registry of
//! running task handles (spec.md §5 "Container registry ... protected by
//! the runtime's lock; mutated only by create/start/stop/remove") and is
//! the only thing that calls into `task::run_supervised`.

pub mod commands;
pub mod context;
mod task;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api_client::ApiClient;
use crate::error::ContainerError;
use crate::models::container::{Container, ContainerLogEntry, ContainerSpec, ContainerStatus, RestartPolicy};
use crate::persistence::{container_logs, containers, routes, Db};

/// Grace period `stop` waits for a task to reach a suspension point and
/// exit before escalating to FAILED (spec.md §5).
const STOP_GRACE_PERIOD: Duration = Duration::from_secs(5);

struct Handle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

#[derive(Clone)]
pub struct Runtime {
    db: Db,
    api: ApiClient,
    registry: Arc<DashMap<String, Handle>>,
}

/// Read-model returned by `inspect` — the container record plus whatever
/// log tail the caller asked for.
pub struct Inspection {
    pub container: Container,
    pub logs: Option<Vec<ContainerLogEntry>>,
}

impl Runtime {
    pub fn new(db: Db, api: ApiClient) -> Self {
        Runtime { db, api, registry: Arc::new(DashMap::new()) }
    }

    /// Exposes the persistence handle for daemon-level shutdown
    /// (`Db::close`) — not for repository calls, which go through the
    /// `persistence` module's own functions.
    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Allocates and persists a new container row. If `spec.autostart`, it
    /// is started immediately as part of this call (spec.md §4.6 `create`).
    pub async fn create(
        &self,
        container_id: String,
        player_id: i64,
        kind: String,
        spec: ContainerSpec,
        restart_policy: RestartPolicy,
    ) -> Result<Container, ContainerError> {
        if containers::find_by_id(&self.db, &container_id).await?.is_some() {
            return Err(ContainerError::AlreadyExists(container_id));
        }
        let now = chrono::Utc::now();
        let autostart = spec.autostart;
        let container = Container {
            container_id: container_id.clone(),
            player_id,
            kind,
            status: ContainerStatus::Pending,
            iteration: 0,
            restart_count: 0,
            restart_policy,
            spec,
            created_at: now,
            updated_at: now,
        };
        containers::create(&self.db, &container).await?;
        if autostart {
            self.start(&container_id).await?;
            return Ok(containers::find_by_id(&self.db, &container_id).await?.ok_or(ContainerError::NotFound(container_id))?);
        }
        Ok(container)
    }

    /// PENDING/STOPPED → STARTING → RUNNING (spec.md §4.6 `start`).
    pub async fn start(&self, container_id: &str) -> Result<ContainerStatus, ContainerError> {
        if self.registry.contains_key(container_id) {
            return Err(ContainerError::InvalidState(format!("{} is already running", container_id)));
        }
        let container = containers::find_by_id(&self.db, container_id)
            .await?
            .ok_or_else(|| ContainerError::NotFound(container_id.to_string()))?;
        match container.status {
            ContainerStatus::Pending | ContainerStatus::Stopped | ContainerStatus::Failed => {}
            other => return Err(ContainerError::InvalidState(format!("cannot start container in status {}", other))),
        }
        containers::update_status(&self.db, container_id, ContainerStatus::Starting, container.iteration, container.restart_count).await?;
        self.spawn(container_id.to_string());
        Ok(ContainerStatus::Starting)
    }

    /// Schedules the supervised task. Used by both `start` (after precondition
    /// checks) and `recover` (crash-safe reboot, bypassing them — spec.md
    /// §4.6 "reboots each through the normal start path" for *scheduling*,
    /// but recovery must not re-run start's PENDING/STOPPED precondition
    /// since the persisted status is already RUNNING/STARTING).
    fn spawn(&self, container_id: String) {
        let cancel = CancellationToken::new();
        let db = self.db.clone();
        let api = self.api.clone();
        let task_cancel = cancel.clone();
        let task_container_id = container_id.clone();
        let join = tokio::spawn(async move {
            task::run_supervised(db, api, task_container_id, task_cancel).await;
        });
        self.registry.insert(container_id, Handle { cancel, join });
    }

    /// RUNNING → STOPPING → STOPPED, cancelling the task and waiting up to
    /// the grace period (spec.md §4.6, §5).
    pub async fn stop(&self, container_id: &str) -> Result<ContainerStatus, ContainerError> {
        let container = containers::find_by_id(&self.db, container_id)
            .await?
            .ok_or_else(|| ContainerError::NotFound(container_id.to_string()))?;
        let Some((_, handle)) = self.registry.remove(container_id) else {
            return Err(ContainerError::InvalidState(format!("{} is not running", container_id)));
        };
        containers::update_status(&self.db, container_id, ContainerStatus::Stopping, container.iteration, container.restart_count).await?;
        handle.cancel.cancel();

        match tokio::time::timeout(STOP_GRACE_PERIOD, handle.join).await {
            Ok(_) => {
                // `task::run_supervised` persists the terminal status itself.
                let refreshed = containers::find_by_id(&self.db, container_id).await?;
                Ok(refreshed.map(|c| c.status).unwrap_or(ContainerStatus::Stopped))
            }
            Err(_) => {
                log::warn!("[{}] did not exit within the grace period, escalating to FAILED", container_id);
                containers::update_status(&self.db, container_id, ContainerStatus::Failed, container.iteration, container.restart_count).await?;
                Ok(ContainerStatus::Failed)
            }
        }
    }

    /// Only from a terminal status — deletes the spec and logs (spec.md
    /// §4.6 `remove`).
    pub async fn remove(&self, container_id: &str) -> Result<(), ContainerError> {
        let container = containers::find_by_id(&self.db, container_id)
            .await?
            .ok_or_else(|| ContainerError::NotFound(container_id.to_string()))?;
        if !container.status.is_terminal() {
            return Err(ContainerError::InvalidState(format!("cannot remove container in status {}", container.status)));
        }
        container_logs::delete_for_container(&self.db, container_id).await?;
        containers::delete(&self.db, container_id).await?;
        Ok(())
    }

    /// REMOVED is hidden from default listings (spec.md §4.6).
    pub async fn list(&self, player_id: Option<i64>) -> Result<Vec<Container>, ContainerError> {
        let all = match player_id {
            Some(id) => containers::list_for_player(&self.db, id).await?,
            None => containers::list_all(&self.db).await?,
        };
        Ok(all.into_iter().filter(|c| c.status != ContainerStatus::Removed).collect())
    }

    pub async fn inspect(&self, container_id: &str, include_logs: bool, log_limit: Option<i64>) -> Result<Inspection, ContainerError> {
        let container = containers::find_by_id(&self.db, container_id)
            .await?
            .ok_or_else(|| ContainerError::NotFound(container_id.to_string()))?;
        let logs = if include_logs {
            Some(container_logs::list_since(&self.db, container_id, 0, log_limit.unwrap_or(200)).await?)
        } else {
            None
        };
        Ok(Inspection { container, logs })
    }

    /// Crash-safe recovery (spec.md §4.1, §4.6): every row persisted as
    /// RUNNING or STARTING at daemon start is rebooted directly through
    /// `spawn`, without incrementing `restart_count` (that only happens on
    /// in-process restarts inside `task::run_supervised`). The respawned
    /// task replans and drives its ship fresh from its live position, so
    /// any `Route` row left EXECUTING by the crashed run is stale — it is
    /// marked ABORTED first so it doesn't linger in the `routes` table
    /// forever, never to be resumed or reported on.
    pub async fn recover(&self) -> Result<usize, ContainerError> {
        let pending = containers::list_non_terminal(&self.db).await?;
        let mut recovered = 0;
        for container in pending {
            if matches!(container.status, ContainerStatus::Running | ContainerStatus::Starting) {
                log::info!("recovering container {} (was {})", container.container_id, container.status);
                if let Some(ship_symbol) = container.spec.params.get("shipSymbol").and_then(|v| v.as_str()) {
                    self.abort_stale_routes(container.player_id, ship_symbol).await;
                }
                self.spawn(container.container_id);
                recovered += 1;
            }
        }
        Ok(recovered)
    }

    /// Marks every route left EXECUTING for `ship_symbol` as ABORTED —
    /// called only during recovery, before the container that owned it is
    /// respawned. Errors here are logged, not propagated: a stale route row
    /// is a reporting nuisance, not a reason to abort the recovery of a
    /// still-viable container.
    async fn abort_stale_routes(&self, player_id: i64, ship_symbol: &str) {
        let stale = match routes::find_executing_for_ship(&self.db, player_id, ship_symbol).await {
            Ok(routes) => routes,
            Err(e) => {
                log::warn!("failed to look up stale routes for {}: {}", ship_symbol, e);
                return;
            }
        };
        for mut route in stale {
            route.abort();
            if let Err(e) = routes::update(&self.db, &route).await {
                log::warn!("failed to abort stale route {} for {}: {}", route.id, ship_symbol, e);
            }
        }
    }

    /// Graceful shutdown (spec.md §6 "SIGINT/SIGTERM trigger graceful
    /// shutdown"): cancels every running task and waits up to the grace
    /// period each, then returns once all are accounted for.
    pub async fn shutdown_all(&self) {
        let ids: Vec<String> = self.registry.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            if let Err(e) = self.stop(&id).await {
                log::warn!("error stopping {} during shutdown: {}", id, e);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::models::route::{FlightMode, Segment};
    use crate::models::route::{Route, RouteStatus};
    use crate::persistence::routes;

    async fn runtime() -> Runtime {
        let db = Db::connect("sqlite::memory:").await.unwrap();
        db.apply_schema().await.unwrap();
        Runtime::new(db, ApiClient::new())
    }

    fn route(ship_symbol: &str) -> Route {
        Route::new(
            1,
            ship_symbol.to_string(),
            vec![Segment {
                from: crate::models::WaypointSymbol::new("X1-A"),
                to: crate::models::WaypointSymbol::new("X1-B"),
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
    async fn recovery_aborts_stale_executing_routes_for_the_recovered_ship() {
        let rt = runtime().await;

        let mut executing = route("S1-1");
        routes::save(&rt.db, &executing).await.unwrap();
        executing.start().unwrap();
        routes::update(&rt.db, &executing).await.unwrap();

        // A planned-but-not-started route for the same ship must be left alone.
        let planned = route("S1-1");
        routes::save(&rt.db, &planned).await.unwrap();

        rt.abort_stale_routes(1, "S1-1").await;

        let found_executing = routes::find_by_id(&rt.db, executing.id).await.unwrap().unwrap();
        assert_eq!(found_executing.status, RouteStatus::Aborted);
        let found_planned = routes::find_by_id(&rt.db, planned.id).await.unwrap().unwrap();
        assert_eq!(found_planned.status, RouteStatus::Planned);
    }

    #[tokio::test]
    async fn recovery_leaves_other_ships_routes_untouched() {
        let rt = runtime().await;
        let mut other_ship = route("S1-2");
        routes::save(&rt.db, &other_ship).await.unwrap();
        other_ship.start().unwrap();
        routes::update(&rt.db, &other_ship).await.unwrap();

        rt.abort_stale_routes(1, "S1-1").await;

        let found = routes::find_by_id(&rt.db, other_ship.id).await.unwrap().unwrap();
        assert_eq!(found.status, RouteStatus::Executing);
    }
}
