//! `optimizeFleetTour` — multi-ship VRP partitioning a market set across a
//! fleet, reusing the same `vrp-core` builder pattern as `tour.rs`, but with
//! one vehicle per ship and one job per market instead of per cargo task.

use crate::models::waypoint::Waypoint;
use crate::models::WaypointSymbol;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use vrp_core::models::common::*;
use vrp_core::models::problem::*;
use vrp_core::prelude::*;

use super::choose_mode;

#[derive(Debug, Clone)]
pub struct ShipLocation {
    pub ship_symbol: String,
    pub waypoint: WaypointSymbol,
}

fn distance_between(a: &Waypoint, b: &Waypoint) -> i64 {
    let dx = (a.x - b.x) as f64;
    let dy = (a.y - b.y) as f64;
    (dx * dx + dy * dy).sqrt().round().max(1.0) as i64
}

/// Assigns every market in `markets` to exactly one ship, minimizing total
/// fleet travel time. Returns `None` on solver failure or if any ship
/// location / market is outside `waypoints`.
pub fn optimize_fleet_tour(
    waypoints: &BTreeMap<WaypointSymbol, Waypoint>,
    markets: &[WaypointSymbol],
    ship_locations: &[ShipLocation],
    capacity: i64,
    speed: i64,
    max_compute_time: Duration,
) -> Option<BTreeMap<String, Vec<WaypointSymbol>>> {
    if ship_locations.is_empty() {
        return Some(BTreeMap::new());
    }

    let mut locations: Vec<WaypointSymbol> =
        ship_locations.iter().map(|s| s.waypoint.clone()).collect();
    for m in markets {
        if !locations.contains(m) {
            locations.push(m.clone());
        }
    }
    for l in &locations {
        waypoints.get(l)?;
    }

    let index_of = |sym: &WaypointSymbol| locations.iter().position(|l| l == sym).unwrap();
    let n = locations.len();

    let mut duration_matrix = vec![0.0f64; n * n];
    let mut distance_matrix = vec![0.0f64; n * n];
    for (i, a_sym) in locations.iter().enumerate() {
        for (j, b_sym) in locations.iter().enumerate() {
            if i == j {
                continue;
            }
            let a = &waypoints[a_sym];
            let b = &waypoints[b_sym];
            let distance = distance_between(a, b);
            let choice = choose_mode(distance, speed, capacity, 0, true);
            duration_matrix[i * n + j] =
                choice.map(|c| c.time_seconds as f64).unwrap_or(f64::MAX / 2.0);
            distance_matrix[i * n + j] = distance as f64;
        }
    }

    let jobs: Vec<Job> = markets
        .iter()
        .map(|sym| {
            SingleBuilder::default()
                .id(&format!("market-{}", sym))
                .location(index_of(sym))
                .unwrap()
                .build_as_job()
                .unwrap()
        })
        .collect();

    let routing_matrix = Arc::new(SimpleTransportCost::new(duration_matrix, distance_matrix).ok()?);

    let vehicles: Vec<Vehicle> = ship_locations
        .iter()
        .map(|ship| {
            VehicleBuilder::default()
                .id(&ship.ship_symbol)
                .add_detail(
                    VehicleDetailBuilder::default()
                        .set_start_location(index_of(&ship.waypoint))
                        .set_start_time(0.0)
                        .build()
                        .unwrap(),
                )
                .build()
                .unwrap()
        })
        .collect();

    let transport_feature = TransportFeatureBuilder::new("min-duration")
        .set_transport_cost(routing_matrix.clone())
        .build_minimize_duration()
        .ok()?;
    let minimize_unassigned = MinimizeUnassignedBuilder::new("min-unassigned").build().ok()?;
    let goal = GoalContextBuilder::with_features(&[minimize_unassigned, transport_feature])
        .ok()?
        .build()
        .ok()?;

    let problem = Arc::new(
        ProblemBuilder::default()
            .add_jobs(jobs.into_iter())
            .add_vehicles(vehicles.into_iter())
            .with_goal(goal)
            .with_transport_cost(routing_matrix)
            .build()
            .ok()?,
    );

    let config = VrpConfigBuilder::new(problem.clone())
        .prebuild()
        .ok()?
        .with_max_time(Some(max_compute_time.as_secs().max(1) as usize))
        .with_max_generations(Some(3000))
        .build()
        .ok()?;

    let solution = Solver::new(problem.clone(), config).solve().ok()?;

    let mut assignment: BTreeMap<String, Vec<WaypointSymbol>> = BTreeMap::new();
    for ship in ship_locations {
        assignment.insert(ship.ship_symbol.clone(), vec![]);
    }
    for route in &solution.routes {
        let ship_symbol = route.actor.vehicle.dimens.get_vehicle_id()?.clone();
        let stops = assignment.entry(ship_symbol).or_default();
        for activity in route.tour.all_activities() {
            if activity.job.is_some() {
                stops.push(locations[activity.place.location].clone());
            }
        }
    }

    Some(assignment)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::models::SystemSymbol;

    fn wp(symbol: &str, x: i64, y: i64) -> Waypoint {
        Waypoint {
            symbol: WaypointSymbol::new(symbol),
            system_symbol: SystemSymbol("X1-TEST".to_string()),
            x,
            y,
            waypoint_type: "PLANET".to_string(),
            traits: vec![],
            orbitals: vec![],
        }
    }

    #[test]
    fn no_ships_yields_empty_assignment() {
        let waypoints: BTreeMap<_, _> = vec![(WaypointSymbol::new("A"), wp("A", 0, 0))]
            .into_iter()
            .collect();
        let assignment = optimize_fleet_tour(
            &waypoints,
            &[],
            &[],
            400,
            30,
            Duration::from_secs(1),
        )
        .unwrap();
        assert!(assignment.is_empty());
    }
}
