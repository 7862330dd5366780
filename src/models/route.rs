use super::WaypointSymbol;
use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum FlightMode {
    #[serde(rename = "BURN")]
    Burn,
    #[serde(rename = "CRUISE")]
    Cruise,
    #[serde(rename = "DRIFT")]
    Drift,
}

/// One TRAVEL step of a Route aggregate. Refuels are attributes of a
/// segment (`requires_refuel`), not separate segments — spec.md GLOSSARY.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub from: WaypointSymbol,
    pub to: WaypointSymbol,
    pub distance: i64,
    pub fuel_required: i64,
    pub travel_time_seconds: i64,
    pub flight_mode: FlightMode,
    pub requires_refuel: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, strum::EnumString)]
pub enum RouteStatus {
    #[serde(rename = "PLANNED")]
    #[strum(serialize = "PLANNED")]
    Planned,
    #[serde(rename = "EXECUTING")]
    #[strum(serialize = "EXECUTING")]
    Executing,
    #[serde(rename = "COMPLETED")]
    #[strum(serialize = "COMPLETED")]
    Completed,
    #[serde(rename = "FAILED")]
    #[strum(serialize = "FAILED")]
    Failed,
    #[serde(rename = "ABORTED")]
    #[strum(serialize = "ABORTED")]
    Aborted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: uuid::Uuid,
    pub ship_symbol: String,
    pub player_id: i64,
    pub segments: Vec<Segment>,
    pub ship_fuel_capacity: i64,
    pub status: RouteStatus,
    pub current_segment_index: usize,
    pub pre_departure_refuel: bool,
}

impl Route {
    pub fn new(
        player_id: i64,
        ship_symbol: String,
        segments: Vec<Segment>,
        ship_fuel_capacity: i64,
        pre_departure_refuel: bool,
    ) -> Route {
        let status = if segments.is_empty() {
            RouteStatus::Completed
        } else {
            RouteStatus::Planned
        };
        Route {
            id: uuid::Uuid::new_v4(),
            ship_symbol,
            player_id,
            segments,
            ship_fuel_capacity,
            status,
            current_segment_index: 0,
            pre_departure_refuel,
        }
    }

    /// segment chain must be connected: seg[i].to == seg[i+1].from
    pub fn is_connected(&self) -> bool {
        self.segments
            .windows(2)
            .all(|w| w[0].to == w[1].from)
    }

    pub fn fits_capacity(&self) -> bool {
        self.segments
            .iter()
            .all(|s| s.fuel_required <= self.ship_fuel_capacity)
    }

    pub fn start(&mut self) -> Result<(), RouteError> {
        if self.status != RouteStatus::Planned {
            return Err(RouteError::InvalidTransition {
                from: self.status,
                action: "start",
            });
        }
        if self.segments.is_empty() {
            self.status = RouteStatus::Completed;
        } else {
            self.status = RouteStatus::Executing;
        }
        Ok(())
    }

    pub fn complete_segment(&mut self) -> Result<(), RouteError> {
        if self.status != RouteStatus::Executing {
            return Err(RouteError::InvalidTransition {
                from: self.status,
                action: "complete_segment",
            });
        }
        self.current_segment_index += 1;
        if self.current_segment_index == self.segments.len() {
            self.status = RouteStatus::Completed;
        }
        Ok(())
    }

    pub fn fail(&mut self) {
        if self.status == RouteStatus::Executing || self.status == RouteStatus::Planned {
            self.status = RouteStatus::Failed;
        }
    }

    pub fn abort(&mut self) {
        if self.status == RouteStatus::Executing || self.status == RouteStatus::Planned {
            self.status = RouteStatus::Aborted;
        }
    }

    pub fn current_segment(&self) -> Option<&Segment> {
        self.segments.get(self.current_segment_index)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("cannot {action} a route in status {from}")]
    InvalidTransition { from: RouteStatus, action: &'static str },
}

#[cfg(test)]
mod test {
    use super::*;

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

    #[test]
    fn empty_route_is_already_completed() {
        let route = Route::new(1, "S1".to_string(), vec![], 400, false);
        assert_eq!(route.status, RouteStatus::Completed);
    }

    #[test]
    fn start_moves_planned_to_executing() {
        let mut route = Route::new(1, "S1".to_string(), vec![seg("A", "B")], 400, false);
        route.start().unwrap();
        assert_eq!(route.status, RouteStatus::Executing);
    }

    #[test]
    fn completing_last_segment_marks_route_completed() {
        let mut route = Route::new(1, "S1".to_string(), vec![seg("A", "B")], 400, false);
        route.start().unwrap();
        route.complete_segment().unwrap();
        assert_eq!(route.status, RouteStatus::Completed);
        assert_eq!(route.current_segment_index, 1);
    }

    #[test]
    fn complete_segment_outside_executing_is_rejected() {
        let mut route = Route::new(1, "S1".to_string(), vec![seg("A", "B")], 400, false);
        assert!(route.complete_segment().is_err());
    }

    #[test]
    fn disconnected_segments_fail_the_chain_invariant() {
        let route = Route::new(1, "S1".to_string(), vec![seg("A", "B"), seg("C", "D")], 400, false);
        assert!(!route.is_connected());
    }

    #[test]
    fn oversized_fuel_requirement_fails_capacity_invariant() {
        let mut route = Route::new(1, "S1".to_string(), vec![seg("A", "B")], 400, false);
        route.segments[0].fuel_required = 500;
        assert!(!route.fits_capacity());
    }
}
