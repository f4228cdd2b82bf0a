//! Relay Network
//!
//! Routing and message relay across a simulated space communication network:
//!
//! - Connectors (ground stations, main spacecraft, repeaters) bound to bodies
//! - Conic and pyramidal sensor views with occlusion-aware access rules
//! - Per-request visibility topology with light-time shortest paths
//! - Store-and-forward relay with slew delay, busy-drop and acknowledgements

use thiserror::Error;
use uuid::Uuid;

pub mod access;
pub mod config;
pub mod connector;
pub mod message;
pub mod relay;
pub mod topology;
pub mod view;

pub use config::RelayConfig;
pub use connector::{Connector, Mount, NodeId, NodeRole, NodeSpec};
pub use message::{Message, MessageKind};
pub use relay::{DropReason, RelayEvent, RelayNetwork, RelayNetworkBuilder};
pub use topology::{light_time, light_time_ms, Link, Route, Topology, TopologyStats, SPEED_OF_LIGHT};
pub use view::{View, ViewShape};

use orbital_mechanics::OrbitalError;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error(transparent)]
    Orbital(#[from] OrbitalError),
    #[error("Invalid view: {0}")]
    InvalidView(String),
    #[error("Node not found: {0}")]
    NodeNotFound(String),
    #[error("Duplicate node: {0}")]
    DuplicateNode(String),
    #[error("Message path is empty")]
    EmptyPath,
    #[error("{node} is not on the path of message {message}")]
    NotOnPath { node: NodeId, message: Uuid },
    #[error("{0} has no next hop")]
    NoNextHop(NodeId),
}

pub type Result<T> = std::result::Result<T, NetworkError>;
