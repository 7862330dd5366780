use crate::api_client::api_models;
use crate::models::{SystemSymbol, WaypointSymbol};
use serde::{Deserialize, Serialize};

///
/// Wire-format waypoint as returned inline on a /systems/{system} response.
/// Simplified: output from systems.json, and for uncharted systems
/// Detailed: output from /systems/:system_symbol}/waypoints
///
/// Main difference is traits. Converted into the canonical
/// `models::waypoint::Waypoint` value object by the waypoint repository
/// before anything outside api_client touches it.
///
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RemoteWaypoint {
    Simplified(api_models::WaypointSimplified),
    Detailed(api_models::WaypointDetailed),
}

impl RemoteWaypoint {
    pub fn symbol(&self) -> &WaypointSymbol {
        match self {
            RemoteWaypoint::Simplified(w) => &w.symbol,
            RemoteWaypoint::Detailed(w) => &w.symbol,
        }
    }

    pub fn waypoint_type(&self) -> &str {
        match self {
            RemoteWaypoint::Simplified(w) => &w.waypoint_type,
            RemoteWaypoint::Detailed(w) => &w.waypoint_type,
        }
    }

    pub fn x(&self) -> i64 {
        match self {
            RemoteWaypoint::Simplified(w) => w.x,
            RemoteWaypoint::Detailed(w) => w.x,
        }
    }

    pub fn y(&self) -> i64 {
        match self {
            RemoteWaypoint::Simplified(w) => w.y,
            RemoteWaypoint::Detailed(w) => w.y,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct System {
    pub symbol: SystemSymbol,
    #[serde(rename = "type")]
    pub system_type: String,
    pub x: i64,
    pub y: i64,
    pub waypoints: Vec<RemoteWaypoint>,
}

impl System {
    pub fn is_starter_system(&self) -> bool {
        self.waypoints
            .iter()
            .any(|w| w.waypoint_type() == "ENGINEERED_ASTEROID")
    }
}
