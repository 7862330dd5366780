//! `optimizeTour` — single-ship TSP over a waypoint set (spec.md §4.1).
//!
//! Built on the same `vrp-core` `Problem`/`Job`/`Solver` construction used
//! for cargo-task scheduling; here every job is a bare visit with no
//! pickup/delivery demand, and there is exactly one vehicle.

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
pub struct TourLeg {
    pub to: WaypointSymbol,
    pub distance: i64,
    pub travel_time_seconds: i64,
}

#[derive(Debug, Clone)]
pub struct Tour {
    pub order: Vec<WaypointSymbol>,
    pub legs: Vec<TourLeg>,
}

fn distance_between(a: &Waypoint, b: &Waypoint) -> i64 {
    let dx = (a.x - b.x) as f64;
    let dy = (a.y - b.y) as f64;
    (dx * dx + dy * dy).sqrt().round().max(1.0) as i64
}

/// Solves a TSP over `stops` starting from `start`, optionally returning to
/// it, minimizing total travel time under the BURN/CRUISE/DRIFT cost model.
/// Timeout-bounded; returns the best feasible tour found, or `None` if the
/// solver can't place `start` or finds nothing at all within the budget.
pub fn optimize_tour(
    waypoints: &BTreeMap<WaypointSymbol, Waypoint>,
    stops: &[WaypointSymbol],
    start: &WaypointSymbol,
    return_to_start: bool,
    capacity: i64,
    speed: i64,
    max_compute_time: Duration,
) -> Option<Tour> {
    let mut locations: Vec<WaypointSymbol> = vec![start.clone()];
    for s in stops {
        if s != start && !locations.contains(s) {
            locations.push(s.clone());
        }
    }
    if locations.len() < 2 {
        return Some(Tour { order: vec![start.clone()], legs: vec![] });
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
            let time = choice.map(|c| c.time_seconds as f64).unwrap_or(f64::MAX / 2.0);
            duration_matrix[i * n + j] = time;
            distance_matrix[i * n + j] = distance as f64;
        }
    }

    let jobs: Vec<Job> = locations
        .iter()
        .skip(1)
        .map(|sym| {
            SingleBuilder::default()
                .id(&sym.to_string())
                .location(index_of(sym))
                .unwrap()
                .build_as_job()
                .unwrap()
        })
        .collect();

    let routing_matrix = Arc::new(SimpleTransportCost::new(duration_matrix, distance_matrix).ok()?);

    let vehicle = VehicleBuilder::default()
        .id("tour-ship")
        .add_detail(
            VehicleDetailBuilder::default()
                .set_start_location(0)
                .set_start_time(0.0)
                .set_end_location(if return_to_start { Some(0) } else { None })
                .build()
                .ok()?,
        )
        .build()
        .ok()?;

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
            .add_vehicles(vec![vehicle].into_iter())
            .with_goal(goal)
            .with_transport_cost(routing_matrix)
            .build()
            .ok()?,
    );

    let config = VrpConfigBuilder::new(problem.clone())
        .prebuild()
        .ok()?
        .with_max_time(Some(max_compute_time.as_secs().max(1) as usize))
        .with_max_generations(Some(2000))
        .build()
        .ok()?;

    let solution = Solver::new(problem.clone(), config).solve().ok()?;
    let route = solution.routes.first()?;

    let mut order = vec![start.clone()];
    let mut legs = vec![];
    let mut prev = start.clone();
    for activity in route.tour.all_activities() {
        let symbol = &locations[activity.place.location];
        if symbol == &prev {
            continue;
        }
        let a = &waypoints[&prev];
        let b = &waypoints[symbol];
        let distance = distance_between(a, b);
        let choice = choose_mode(distance, speed, capacity, 0, true)?;
        legs.push(TourLeg {
            to: symbol.clone(),
            distance,
            travel_time_seconds: choice.time_seconds,
        });
        order.push(symbol.clone());
        prev = symbol.clone();
    }

    Some(Tour { order, legs })
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
    fn single_stop_tour_is_trivial() {
        let waypoints: BTreeMap<_, _> = vec![(WaypointSymbol::new("A"), wp("A", 0, 0))]
            .into_iter()
            .collect();
        let tour = optimize_tour(
            &waypoints,
            &[],
            &WaypointSymbol::new("A"),
            false,
            400,
            30,
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(tour.order, vec![WaypointSymbol::new("A")]);
        assert!(tour.legs.is_empty());
    }
}
