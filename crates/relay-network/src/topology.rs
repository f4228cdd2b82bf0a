//! Visibility Topology
//!
//! Snapshot of who can reach whom at one epoch:
//!
//! - Vertices are the active connectors
//! - Directed edges follow the access rules, so links may be one-way
//! - Edge weights are one-way light-time in whole milliseconds
//!
//! A topology is rebuilt for every routing request and never outlives the
//! world state it was built from.

use orbital_mechanics::{Epoch, World};
use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::access::{can_access, direct_access};
use crate::connector::{Connector, NodeId};
use crate::Result;

/// Speed of light in vacuum, m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// One-way light-time over `distance_m`, rounded to whole milliseconds.
pub fn light_time_ms(distance_m: f64) -> u64 {
    (distance_m / SPEED_OF_LIGHT * 1_000.0).round() as u64
}

pub fn light_time(distance_m: f64) -> Duration {
    Duration::from_millis(light_time_ms(distance_m))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub distance_m: f64,
    pub light_time_ms: u64,
    /// Only reachable once the sender's carrier is turned.
    pub via_carrier: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub nodes: Vec<NodeId>,
    pub light_time_ms: u64,
}

impl Route {
    pub fn hops(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }
}

pub struct Topology {
    graph: DiGraph<NodeId, Link>,
    node_index: HashMap<NodeId, NodeIndex>,
    epoch: Epoch,
}

impl Topology {
    /// Evaluate every ordered pair of active connectors against `world`.
    pub fn build(world: &World, nodes: &[Arc<Connector>]) -> Result<Self> {
        let mut graph = DiGraph::new();
        let mut node_index = HashMap::new();
        let active: Vec<&Arc<Connector>> = nodes.iter().filter(|n| n.is_active()).collect();

        for node in &active {
            node_index.insert(node.id(), graph.add_node(node.id()));
        }

        for from in &active {
            for to in &active {
                if from.id() == to.id() || !can_access(world, from, to)? {
                    continue;
                }
                let distance_m = world.distance(from.antenna(), to.antenna())?;
                let link = Link {
                    distance_m,
                    light_time_ms: light_time_ms(distance_m),
                    via_carrier: !direct_access(world, from, to)?,
                };
                graph.add_edge(node_index[&from.id()], node_index[&to.id()], link);
            }
        }

        debug!(
            epoch = %world.epoch(),
            nodes = graph.node_count(),
            links = graph.edge_count(),
            "built topology"
        );
        Ok(Self {
            graph,
            node_index,
            epoch: world.epoch(),
        })
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node_index.contains_key(&id)
    }

    pub fn link(&self, from: NodeId, to: NodeId) -> Option<&Link> {
        let edge = self.graph.find_edge(*self.node_index.get(&from)?, *self.node_index.get(&to)?)?;
        self.graph.edge_weight(edge)
    }

    pub fn has_link(&self, from: NodeId, to: NodeId) -> bool {
        self.link(from, to).is_some()
    }

    pub fn links(&self) -> impl Iterator<Item = (NodeId, NodeId, &Link)> {
        self.graph
            .edge_references()
            .map(move |e| (self.graph[e.source()], self.graph[e.target()], e.weight()))
    }

    /// Minimum total light-time route, or `None` when either end is missing
    /// from the topology or no directed path exists.
    pub fn shortest_path(&self, from: NodeId, to: NodeId) -> Option<Route> {
        let from_idx = *self.node_index.get(&from)?;
        let to_idx = *self.node_index.get(&to)?;

        // A zero heuristic makes A* a Dijkstra search that also returns the path
        let (light_time_ms, path) = astar(
            &self.graph,
            from_idx,
            |n| n == to_idx,
            |e| e.weight().light_time_ms,
            |_| 0,
        )?;

        Some(Route {
            nodes: path.iter().map(|idx| self.graph[*idx]).collect(),
            light_time_ms,
        })
    }

    pub fn stats(&self) -> TopologyStats {
        let carrier_links = self.links().filter(|(_, _, link)| link.via_carrier).count();
        let longest_link_ms = self.links().map(|(_, _, link)| link.light_time_ms).max().unwrap_or(0);
        let isolated_nodes = self
            .graph
            .node_indices()
            .filter(|idx| self.graph.neighbors_undirected(*idx).next().is_none())
            .count();

        TopologyStats {
            nodes: self.graph.node_count(),
            links: self.graph.edge_count(),
            carrier_links,
            isolated_nodes,
            longest_link_ms,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyStats {
    pub nodes: usize,
    /// Directed links.
    pub links: usize,
    pub carrier_links: usize,
    pub isolated_nodes: usize,
    pub longest_link_ms: u64,
}
