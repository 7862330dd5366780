//! Fuel-aware route planning: point-to-point pathfinding, single-ship tour
//! optimization and multi-ship fleet partitioning, all over the same
//! Euclidean/fuel-mode cost model.
//!
//! Generalizes a market-graph Dijkstra limited to two flight modes into the
//! full BURN/CRUISE/DRIFT model with an explicit safety margin and
//! opportunistic/pre-departure refueling.

pub mod fleet;
pub mod shortest_path;
pub mod tour;

pub use shortest_path::{find_optimal_path, PlanError, PlannedPath};
pub use tour::optimize_tour;
pub use fleet::optimize_fleet_tour;

/// Absolute minimum fuel that must remain after any leg. spec.md §4.1 default.
pub const DEFAULT_SAFETY_MARGIN: i64 = 4;

/// Fixed time cost of a REFUEL action (docking, buying fuel, undocking).
pub const REFUEL_TIME_SECONDS: i64 = 60;

/// Below this fraction of capacity, arriving at a fuel-capable waypoint
/// triggers an opportunistic refuel.
pub const OPPORTUNISTIC_REFUEL_THRESHOLD: f64 = 0.9;

use crate::models::route::FlightMode;

/// Base travel time for a leg of `distance` at `speed`, rounded up to
/// seconds with a 1s floor.
pub fn base_time_seconds(distance: i64, speed: i64) -> i64 {
    let speed = speed.max(1);
    let secs = (distance as f64 / speed as f64).ceil() as i64;
    secs.max(1)
}

/// One feasible mode choice for a leg: fuel burned and wall-clock time.
#[derive(Debug, Clone, Copy)]
pub struct ModeChoice {
    pub mode: FlightMode,
    pub fuel_cost: i64,
    pub time_seconds: i64,
}

/// Chooses the fastest flight mode for a leg of `distance` at `speed` that
/// leaves at least `margin` fuel remaining out of `fuel_available`, demoting
/// BURN to CRUISE when `prefer_cruise` and CRUISE is itself feasible.
/// Returns `None` if no mode (including DRIFT) satisfies the margin.
pub fn choose_mode(
    distance: i64,
    speed: i64,
    fuel_available: i64,
    margin: i64,
    prefer_cruise: bool,
) -> Option<ModeChoice> {
    let base = base_time_seconds(distance, speed);
    let burn_fuel = (2 * distance).max(0);
    let cruise_fuel = distance.max(0);
    let drift_fuel = 1;

    let burn = (burn_fuel, (base as f64 * 0.5).ceil().max(1.0) as i64, FlightMode::Burn);
    let cruise = (cruise_fuel, base, FlightMode::Cruise);
    let drift = (drift_fuel, base * 10, FlightMode::Drift);

    let feasible = |fuel_cost: i64| fuel_available - fuel_cost >= margin;

    let mut chosen = if feasible(burn.0) {
        Some(burn)
    } else if feasible(cruise.0) {
        Some(cruise)
    } else if feasible(drift.0) {
        Some(drift)
    } else {
        None
    }?;

    if prefer_cruise && chosen.2 == FlightMode::Burn && feasible(cruise.0) {
        chosen = cruise;
    }

    Some(ModeChoice {
        mode: chosen.2,
        fuel_cost: chosen.0,
        time_seconds: chosen.1,
    })
}
