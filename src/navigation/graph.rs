//! Assembles the structural-plus-trait waypoint view route planning needs.
//!
//! The persisted graph (`system_graphs`) carries coordinates and orbitals,
//! never expiring once a system is charted; the waypoint cache carries
//! traits (fuel/market/shipyard) under its own TTL. A single live fetch
//! refreshes both when either is missing or incomplete for the system.

use std::collections::BTreeMap;

use crate::api_client::ApiClient;
use crate::error::GameApiError;
use crate::models::graph::{GraphNode, SystemGraph};
use crate::models::waypoint::Waypoint;
use crate::models::{SystemSymbol, WaypointSymbol};
use crate::persistence::{waypoints, Db};

pub async fn load_system_waypoints(
    api: &ApiClient,
    token: &str,
    db: &Db,
    player_id: i64,
    system: &SystemSymbol,
    waypoint_cache_ttl_secs: u64,
) -> Result<BTreeMap<WaypointSymbol, Waypoint>, GameApiError> {
    let graph = waypoints::find_graph(db, system).await.ok().flatten();
    let cached = waypoints::list_waypoints_for_system(db, system, waypoint_cache_ttl_secs)
        .await
        .unwrap_or_default();

    if let Some(graph) = &graph {
        if graph.nodes.len() == cached.len() && !cached.is_empty() {
            return Ok(merge(graph, &cached));
        }
    }

    let detailed = api.list_waypoints_checked(token, system).await?;
    let nodes: Vec<GraphNode> = detailed
        .iter()
        .map(|w| GraphNode {
            symbol: w.symbol.clone(),
            x: w.x,
            y: w.y,
            waypoint_type: w.waypoint_type.clone(),
            orbitals: w.orbitals.iter().map(|o| o.symbol.clone()).collect(),
        })
        .collect();
    let graph = SystemGraph::build(nodes);
    let _ = waypoints::save_graph(db, &graph).await;

    let mut out = BTreeMap::new();
    for w in detailed {
        let waypoint = Waypoint {
            symbol: w.symbol.clone(),
            system_symbol: w.system_symbol.clone(),
            x: w.x,
            y: w.y,
            waypoint_type: w.waypoint_type.clone(),
            traits: w.traits.iter().map(|t| t.symbol.clone()).collect(),
            orbitals: w.orbitals.iter().map(|o| o.symbol.clone()).collect(),
        };
        let _ = waypoints::upsert_waypoint(db, player_id, &waypoint).await;
        out.insert(waypoint.symbol.clone(), waypoint);
    }
    Ok(out)
}

fn merge(graph: &SystemGraph, cached: &[Waypoint]) -> BTreeMap<WaypointSymbol, Waypoint> {
    let traits_by_symbol: BTreeMap<&WaypointSymbol, &Waypoint> =
        cached.iter().map(|w| (&w.symbol, w)).collect();
    graph
        .nodes
        .iter()
        .map(|(symbol, node)| {
            let traits = traits_by_symbol
                .get(symbol)
                .map(|w| w.traits.clone())
                .unwrap_or_default();
            (
                symbol.clone(),
                Waypoint {
                    symbol: symbol.clone(),
                    system_symbol: graph.system_symbol.clone(),
                    x: node.x,
                    y: node.y,
                    waypoint_type: node.waypoint_type.clone(),
                    traits,
                    orbitals: node.orbitals.clone(),
                },
            )
        })
        .collect()
}
