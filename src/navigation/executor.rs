//! Per-segment execution state machine (spec.md §4.5). Drives one `Route`
//! to COMPLETED/FAILED/ABORTED by polling live ship nav status rather than
//! trusting local state — the remote API is authoritative (SPEC_FULL §3).
//!
//! Every suspension point (status poll, travel wait, refuel wait, retry
//! backoff) is raced against the caller's `CancellationToken` via `guarded`,
//! so `stop(container)` reaches a waiting executor within one poll interval
//! instead of only at the next HTTP round-trip.

use std::future::Future;

use chrono::Utc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::api_client::ApiClient;
use crate::error::{Cancelled, GameApiError, RoutePlanError};
use crate::models::route::{FlightMode, Route, RouteStatus, Segment};
use crate::models::ship::{ShipFlightMode, ShipFuel, ShipNav, ShipNavStatus};
use crate::persistence::{routes, waypoints, Db};
use crate::route_planner::{DEFAULT_SAFETY_MARGIN, OPPORTUNISTIC_REFUEL_THRESHOLD, REFUEL_TIME_SECONDS};

/// Outcome of a single segment attempt — distinct from `RoutePlanError`
/// because a cancelled segment isn't a route-planning failure, just an
/// early exit the caller turns into `Route::abort`.
enum SegmentOutcome {
    Cancelled,
    Failed(RoutePlanError),
}

impl From<Cancelled> for SegmentOutcome {
    fn from(_: Cancelled) -> Self {
        SegmentOutcome::Cancelled
    }
}

impl From<GameApiError> for SegmentOutcome {
    fn from(e: GameApiError) -> Self {
        SegmentOutcome::Failed(RoutePlanError::Api(e))
    }
}

/// Races `fut` against cancellation. A fired token wins immediately,
/// dropping `fut` in place — this is what lets a container's `stop` land
/// mid-HTTP-call instead of waiting for it to finish.
async fn guarded<F: Future>(fut: F, cancel: &CancellationToken) -> Result<F::Output, Cancelled> {
    tokio::select! {
        res = fut => Ok(res),
        _ = cancel.cancelled() => Err(Cancelled),
    }
}

async fn cancellable_sleep(duration: Duration, cancel: &CancellationToken) -> Result<(), Cancelled> {
    guarded(tokio::time::sleep(duration), cancel).await
}

fn to_api_mode(mode: FlightMode) -> ShipFlightMode {
    match mode {
        FlightMode::Burn => ShipFlightMode::Burn,
        FlightMode::Cruise => ShipFlightMode::Cruise,
        FlightMode::Drift => ShipFlightMode::Drift,
    }
}

async fn fetch_ship_state(
    api: &ApiClient,
    token: &str,
    ship_symbol: &str,
    cancel: &CancellationToken,
) -> Result<(ShipNav, ShipFuel), SegmentOutcome> {
    let ship = guarded(api.get_ship_checked(token, ship_symbol), cancel).await??;
    Ok((ship.nav, ship.fuel))
}

/// One retry on a 429/5xx, per spec.md §4.5 "API transient errors" and §7.
async fn with_retry<T, F, Fut>(mut make: F, cancel: &CancellationToken) -> Result<T, SegmentOutcome>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GameApiError>>,
{
    match guarded(make(), cancel).await? {
        Ok(v) => Ok(v),
        Err(e) if e.is_retryable() => {
            cancellable_sleep(Duration::from_millis(500), cancel).await?;
            Ok(guarded(make(), cancel).await??)
        }
        Err(e) => Err(e.into()),
    }
}

/// Docks if not already docked. On `InvalidState` (precondition violated —
/// e.g. status changed under us) re-reads nav once and retries, escalating
/// to a failed segment on the second failure (spec.md §4.5).
async fn ensure_docked(api: &ApiClient, token: &str, ship_symbol: &str, cancel: &CancellationToken) -> Result<(), SegmentOutcome> {
    let (nav, _) = fetch_ship_state(api, token, ship_symbol, cancel).await?;
    if nav.status == ShipNavStatus::Docked {
        return Ok(());
    }
    match guarded(api.dock_ship_checked(token, ship_symbol), cancel).await? {
        Ok(_) => Ok(()),
        Err(GameApiError::InvalidState(_)) => {
            fetch_ship_state(api, token, ship_symbol, cancel).await?;
            guarded(api.dock_ship_checked(token, ship_symbol), cancel)
                .await?
                .map(|_| ())
                .map_err(SegmentOutcome::from)
        }
        Err(e) => Err(e.into()),
    }
}

async fn ensure_orbit(api: &ApiClient, token: &str, ship_symbol: &str, cancel: &CancellationToken) -> Result<(), SegmentOutcome> {
    let (nav, _) = fetch_ship_state(api, token, ship_symbol, cancel).await?;
    if nav.status == ShipNavStatus::InOrbit {
        return Ok(());
    }
    match guarded(api.orbit_ship_checked(token, ship_symbol), cancel).await? {
        Ok(_) => Ok(()),
        Err(GameApiError::InvalidState(_)) => {
            fetch_ship_state(api, token, ship_symbol, cancel).await?;
            guarded(api.orbit_ship_checked(token, ship_symbol), cancel)
                .await?
                .map(|_| ())
                .map_err(SegmentOutcome::from)
        }
        Err(e) => Err(e.into()),
    }
}

/// Dock, buy fuel to capacity, wait the fixed refuel time, return to orbit.
async fn do_refuel(api: &ApiClient, token: &str, ship_symbol: &str, cancel: &CancellationToken) -> Result<(), SegmentOutcome> {
    ensure_docked(api, token, ship_symbol, cancel).await?;
    with_retry(|| api.refuel_ship_checked(token, ship_symbol, None), cancel).await?;
    cancellable_sleep(Duration::from_secs(REFUEL_TIME_SECONDS as u64), cancel).await?;
    ensure_orbit(api, token, ship_symbol, cancel).await?;
    Ok(())
}

/// Drives one segment to completion: in-transit wait, pre-departure refuel,
/// orbit, flight-mode set, navigate, travel wait, arrival refuel — the nine
/// steps of spec.md §4.5.
async fn run_segment(
    api: &ApiClient,
    token: &str,
    db: &Db,
    ship_symbol: &str,
    segment: &Segment,
    cancel: &CancellationToken,
) -> Result<(), SegmentOutcome> {
    // Steps 1-2: poll nav status; never issue a follow-on action while
    // IN_TRANSIT — wait out the remaining arrival time instead (S10).
    let (nav, mut fuel) = loop {
        let (nav, fuel) = fetch_ship_state(api, token, ship_symbol, cancel).await?;
        if nav.status != ShipNavStatus::InTransit {
            break (nav, fuel);
        }
        let remaining = (nav.route.arrival - Utc::now()).num_seconds().max(1) as u64;
        cancellable_sleep(Duration::from_secs(remaining), cancel).await?;
    };

    // Step 3: pre-departure refuel.
    let here = waypoints::find_waypoint(db, &nav.waypoint_symbol, crate::config::CONFIG.waypoint_cache_ttl_secs)
        .await
        .ok()
        .flatten();
    if let Some(wp) = here {
        let below_threshold = (fuel.current as f64) < fuel.capacity as f64 * OPPORTUNISTIC_REFUEL_THRESHOLD;
        let insufficient_margin = fuel.current - segment.fuel_required < DEFAULT_SAFETY_MARGIN;
        if wp.has_fuel() && below_threshold && insufficient_margin {
            do_refuel(api, token, ship_symbol, cancel).await?;
            let (_, refreshed) = fetch_ship_state(api, token, ship_symbol, cancel).await?;
            fuel = refreshed;
        }
    }

    if fuel.current < segment.fuel_required {
        return Err(SegmentOutcome::Failed(RoutePlanError::InsufficientFuel {
            required: segment.fuel_required,
            available: fuel.current,
        }));
    }

    // Step 4: enter orbit.
    ensure_orbit(api, token, ship_symbol, cancel).await?;

    // Step 5: set the segment's flight mode.
    with_retry(
        || api.set_flight_mode_checked(token, ship_symbol, to_api_mode(segment.flight_mode)),
        cancel,
    )
    .await?;

    // Step 6: issue the navigate command.
    with_retry(|| api.navigate_ship_checked(token, ship_symbol, &segment.to), cancel).await?;

    // Step 7: wait the segment's scheduled travel time.
    cancellable_sleep(Duration::from_secs(segment.travel_time_seconds.max(1) as u64), cancel).await?;

    // Step 8: arrival refuel — explicitly permitted even on the route's
    // final segment (spec.md §4.1 source bug #1).
    let (_, arrival_fuel) = fetch_ship_state(api, token, ship_symbol, cancel).await?;
    let destination = waypoints::find_waypoint(db, &segment.to, crate::config::CONFIG.waypoint_cache_ttl_secs)
        .await
        .ok()
        .flatten();
    let opportunistic = destination.map(|w| w.has_fuel()).unwrap_or(false)
        && (arrival_fuel.current as f64) < arrival_fuel.capacity as f64 * OPPORTUNISTIC_REFUEL_THRESHOLD;
    if segment.requires_refuel || opportunistic {
        do_refuel(api, token, ship_symbol, cancel).await?;
    }

    // Step 9: the caller advances route.current_segment_index.
    Ok(())
}

/// Drives `route` from PLANNED to a terminal status, persisting the
/// transition after every segment so a crash mid-route resumes cleanly
/// (spec.md §4.1 crash-safe recovery covers containers; routes persist
/// their own progress the same way via `routes::update`).
pub async fn execute_route(
    api: &ApiClient,
    token: &str,
    db: &Db,
    route: &mut Route,
    cancel: &CancellationToken,
) -> Result<(), RoutePlanError> {
    if route.status == RouteStatus::Planned {
        route.start()?;
        routes::update(db, route).await?;
    }
    // Ship already at destination (S1): the planner returned zero segments
    // and `Route::new` already marked the route COMPLETED — no ship actions.
    if route.status != RouteStatus::Executing {
        return Ok(());
    }

    let ship_symbol = route.ship_symbol.clone();
    while route.status == RouteStatus::Executing {
        let segment = route
            .current_segment()
            .expect("status Executing implies a current segment")
            .clone();
        match run_segment(api, token, db, &ship_symbol, &segment, cancel).await {
            Ok(()) => {
                route.complete_segment()?;
                routes::update(db, route).await?;
            }
            Err(SegmentOutcome::Cancelled) => {
                route.abort();
                routes::update(db, route).await?;
                return Ok(());
            }
            Err(SegmentOutcome::Failed(_)) => {
                route.fail();
                routes::update(db, route).await?;
                return Ok(());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::models::WaypointSymbol;

    fn seg(from: &str, to: &str) -> Segment {
        Segment {
            from: WaypointSymbol::new(from),
            to: WaypointSymbol::new(to),
            distance: 100,
            fuel_required: 100,
            travel_time_seconds: 4,
            flight_mode: FlightMode::Cruise,
            requires_refuel: false,
        }
    }

    #[tokio::test]
    async fn empty_route_completes_with_no_ship_actions() {
        // Exercises S1: Route::new([]) is already COMPLETED; execute_route
        // must not try to dial out to the (nonexistent, in this test) API.
        let mut route = Route::new(1, "S1-1".to_string(), vec![], 400, false);
        assert_eq!(route.status, RouteStatus::Completed);
        let db = Db::connect("sqlite::memory:").await.unwrap();
        db.apply_schema().await.unwrap();
        routes::save(&db, &route).await.unwrap();
        let api = ApiClient::new();
        let cancel = CancellationToken::new();
        let result = execute_route(&api, "tok", &db, &mut route, &cancel).await;
        assert!(result.is_ok());
        assert_eq!(route.status, RouteStatus::Completed);
    }

    #[test]
    fn flight_mode_maps_onto_the_wire_enum() {
        assert_eq!(to_api_mode(FlightMode::Burn), ShipFlightMode::Burn);
        assert_eq!(to_api_mode(FlightMode::Cruise), ShipFlightMode::Cruise);
        assert_eq!(to_api_mode(FlightMode::Drift), ShipFlightMode::Drift);
    }

    #[test]
    fn segment_helper_builds_a_connected_pair() {
        let route = Route::new(1, "S1-1".to_string(), vec![seg("A", "B")], 400, false);
        assert!(route.is_connected());
    }
}
