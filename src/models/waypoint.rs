use super::{SystemSymbol, WaypointSymbol};
use serde::{Deserialize, Serialize};

/// Traits that make a waypoint refuelable. Real marketplaces almost always
/// sell FUEL; a small number of waypoints carry a dedicated station trait.
const FUEL_TRAITS: &[&str] = &["MARKETPLACE", "FUEL_STATION"];

/// Immutable waypoint value object — the single representation shared by the
/// structural graph and the trait-bearing cache (see SPEC_FULL §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub symbol: WaypointSymbol,
    pub system_symbol: SystemSymbol,
    pub x: i64,
    pub y: i64,
    #[serde(rename = "type")]
    pub waypoint_type: String,
    pub traits: Vec<String>,
    pub orbitals: Vec<WaypointSymbol>,
}

impl Waypoint {
    pub fn has_fuel(&self) -> bool {
        self.traits.iter().any(|t| FUEL_TRAITS.contains(&t.as_str()))
    }

    pub fn is_orbital_of(&self, other: &Waypoint) -> bool {
        other.orbitals.iter().any(|o| o == &self.symbol)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn wp(symbol: &str, traits: &[&str]) -> Waypoint {
        Waypoint {
            symbol: WaypointSymbol::new(symbol),
            system_symbol: SystemSymbol("X1-TZ26".to_string()),
            x: 0,
            y: 0,
            waypoint_type: "PLANET".to_string(),
            traits: traits.iter().map(|s| s.to_string()).collect(),
            orbitals: vec![],
        }
    }

    #[test]
    fn has_fuel_requires_a_fuel_trait() {
        assert!(wp("X1-TZ26-A1", &["MARKETPLACE"]).has_fuel());
        assert!(!wp("X1-TZ26-A1", &["UNCHARTED"]).has_fuel());
    }

    #[test]
    fn orbital_relationship_is_name_based() {
        let parent = Waypoint {
            orbitals: vec![WaypointSymbol::new("X1-TZ26-A2")],
            ..wp("X1-TZ26-A1", &[])
        };
        let child = wp("X1-TZ26-A2", &[]);
        assert!(child.is_orbital_of(&parent));
    }
}
