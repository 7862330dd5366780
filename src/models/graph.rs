use super::{SystemSymbol, WaypointSymbol};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Structure-only entry: symbol, coordinates, type, orbitals. No trait data —
/// traits live in the TTL'd `WaypointCache` instead (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub symbol: WaypointSymbol,
    pub x: i64,
    pub y: i64,
    #[serde(rename = "type")]
    pub waypoint_type: String,
    pub orbitals: Vec<WaypointSymbol>,
}

/// Per-system structural map plus a precomputed bidirectional edge set.
/// Cached indefinitely (structure never changes once a system is charted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemGraph {
    pub system_symbol: SystemSymbol,
    pub nodes: BTreeMap<WaypointSymbol, GraphNode>,
    /// precomputed: every non-orbital pair, Euclidean distance
    pub edges: BTreeMap<WaypointSymbol, BTreeMap<WaypointSymbol, i64>>,
}

impl SystemGraph {
    pub fn build(nodes: Vec<GraphNode>) -> SystemGraph {
        let system_symbol = nodes
            .first()
            .map(|n| n.symbol.system())
            .unwrap_or_else(|| SystemSymbol(String::new()));
        let node_map: BTreeMap<WaypointSymbol, GraphNode> =
            nodes.iter().cloned().map(|n| (n.symbol.clone(), n)).collect();

        let mut edges: BTreeMap<WaypointSymbol, BTreeMap<WaypointSymbol, i64>> = BTreeMap::new();
        for a in &nodes {
            let mut row = BTreeMap::new();
            for b in &nodes {
                if a.symbol == b.symbol {
                    continue;
                }
                row.insert(b.symbol.clone(), euclidean_distance(a, b));
            }
            edges.insert(a.symbol.clone(), row);
        }

        SystemGraph {
            system_symbol,
            nodes: node_map,
            edges,
        }
    }

    pub fn contains(&self, symbol: &WaypointSymbol) -> bool {
        self.nodes.contains_key(symbol)
    }

    pub fn distance(&self, a: &WaypointSymbol, b: &WaypointSymbol) -> Option<i64> {
        if a == b {
            return Some(0);
        }
        if self.is_orbital_pair(a, b) {
            return Some(0);
        }
        self.edges.get(a)?.get(b).copied()
    }

    pub fn is_orbital_pair(&self, a: &WaypointSymbol, b: &WaypointSymbol) -> bool {
        let a_orbits_b = self.nodes.get(b).map(|n| n.orbitals.contains(a)).unwrap_or(false);
        let b_orbits_a = self.nodes.get(a).map(|n| n.orbitals.contains(b)).unwrap_or(false);
        a_orbits_b || b_orbits_a
    }

    pub fn symbols(&self) -> impl Iterator<Item = &WaypointSymbol> {
        self.nodes.keys()
    }
}

pub fn euclidean_distance(a: &GraphNode, b: &GraphNode) -> i64 {
    let dx = (a.x - b.x) as f64;
    let dy = (a.y - b.y) as f64;
    (dx * dx + dy * dy).sqrt().round() as i64
}

#[cfg(test)]
mod test {
    use super::*;

    fn node(symbol: &str, x: i64, y: i64) -> GraphNode {
        GraphNode {
            symbol: WaypointSymbol::new(symbol),
            x,
            y,
            waypoint_type: "PLANET".to_string(),
            orbitals: vec![],
        }
    }

    #[test]
    fn orbital_edges_are_zero_distance() {
        let mut parent = node("X1-TZ26-A1", 0, 0);
        parent.orbitals.push(WaypointSymbol::new("X1-TZ26-A2"));
        let child = node("X1-TZ26-A2", 50, 50);
        let graph = SystemGraph::build(vec![parent, child]);
        assert_eq!(
            graph.distance(&WaypointSymbol::new("X1-TZ26-A1"), &WaypointSymbol::new("X1-TZ26-A2")),
            Some(0)
        );
    }

    #[test]
    fn non_orbital_distance_is_euclidean() {
        let a = node("A", 0, 0);
        let b = node("B", 100, 0);
        let graph = SystemGraph::build(vec![a, b]);
        assert_eq!(
            graph.distance(&WaypointSymbol::new("A"), &WaypointSymbol::new("B")),
            Some(100)
        );
    }
}
