//! Network nodes
//!
//! A connector is a communication endpoint attached to a body. Surface and
//! carried connectors get their own antenna body as a child of the site or
//! carrier, so pointing the antenna never turns the body it is mounted on.

use orbital_mechanics::{BodyId, Vector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::view::View;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    GroundStation,
    MainSpacecraft,
    Repeater,
}

/// How a connector is attached to the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mount", rename_all = "snake_case")]
pub enum Mount {
    /// The connector is the body itself.
    FreeFlying { body: BodyId },
    /// Fixed to a surface site; the site cannot be turned.
    Surface { site: BodyId },
    /// Mounted on a spacecraft that can be turned to help the antenna.
    Carried { carrier: BodyId },
}

impl Mount {
    /// The body the connector hangs off, if it is not the body itself.
    pub fn host(&self) -> Option<BodyId> {
        match *self {
            Mount::FreeFlying { .. } => None,
            Mount::Surface { site } => Some(site),
            Mount::Carried { carrier } => Some(carrier),
        }
    }

    /// The carrier that may be reoriented to extend the connector's access.
    pub fn steerable_carrier(&self) -> Option<BodyId> {
        match *self {
            Mount::Carried { carrier } => Some(carrier),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub name: String,
    pub role: NodeRole,
    pub mount: Mount,
    pub view: View,
    /// Antenna position in the host frame.
    pub offset: Vector,
    pub analysis_time: Duration,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>, role: NodeRole, mount: Mount, view: View) -> Self {
        Self {
            name: name.into(),
            role,
            mount,
            view,
            offset: Vector::zeros(),
            analysis_time: Duration::ZERO,
        }
    }

    pub fn ground_station(name: impl Into<String>, site: BodyId, view: View) -> Self {
        Self::new(name, NodeRole::GroundStation, Mount::Surface { site }, view)
    }

    pub fn main_spacecraft(name: impl Into<String>, carrier: BodyId, view: View) -> Self {
        Self::new(name, NodeRole::MainSpacecraft, Mount::Carried { carrier }, view)
    }

    pub fn repeater(name: impl Into<String>, carrier: BodyId, view: View) -> Self {
        Self::new(name, NodeRole::Repeater, Mount::Carried { carrier }, view)
    }

    pub fn mounted_at(mut self, offset: Vector) -> Self {
        self.offset = offset;
        self
    }

    pub fn analysis_time(mut self, analysis_time: Duration) -> Self {
        self.analysis_time = analysis_time;
        self
    }
}

#[derive(Debug)]
pub struct Connector {
    id: NodeId,
    name: String,
    role: NodeRole,
    mount: Mount,
    antenna: BodyId,
    view: View,
    analysis_time: Duration,
    busy: AtomicBool,
    active: AtomicBool,
}

impl Connector {
    pub(crate) fn new(id: NodeId, spec: NodeSpec, antenna: BodyId) -> Self {
        Self {
            id,
            name: spec.name,
            role: spec.role,
            mount: spec.mount,
            antenna,
            view: spec.view,
            analysis_time: spec.analysis_time,
            busy: AtomicBool::new(false),
            active: AtomicBool::new(true),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn mount(&self) -> Mount {
        self.mount
    }

    /// The body whose frame the view is expressed in.
    pub fn antenna(&self) -> BodyId {
        self.antenna
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn analysis_time(&self) -> Duration {
        self.analysis_time
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Inactive nodes are left out of new topologies and drop what reaches them.
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    /// Claim the node for one inbound message. Fails while another message
    /// is being analyzed.
    pub(crate) fn try_acquire(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn release(&self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbital_mechanics::{BodySpec, World};

    fn bodies() -> (BodyId, BodyId) {
        let mut world = World::default();
        let carrier = world.add_body(BodySpec::new("carrier")).unwrap();
        let antenna = world.add_body(BodySpec::new("antenna").parent(carrier)).unwrap();
        (carrier, antenna)
    }

    fn connector() -> Connector {
        let (carrier, antenna) = bodies();
        let view = View::conic(1e6, 0.5).unwrap();
        let spec = NodeSpec::repeater("relay", carrier, view).analysis_time(Duration::from_millis(250));
        Connector::new(NodeId(3), spec, antenna)
    }

    #[test]
    fn test_spec_helpers_set_role_and_mount() {
        let (site, other) = bodies();
        let view = View::conic(1e6, 0.5).unwrap();
        let gs = NodeSpec::ground_station("gs", site, view);
        assert_eq!(gs.role, NodeRole::GroundStation);
        assert_eq!(gs.mount.steerable_carrier(), None);
        assert_eq!(gs.mount.host(), Some(site));
        let main = NodeSpec::main_spacecraft("main", other, view);
        assert_eq!(main.mount.steerable_carrier(), Some(other));
        assert_eq!(Mount::FreeFlying { body: other }.host(), None);
    }

    #[test]
    fn test_busy_flag_is_exclusive() {
        let node = connector();
        assert!(!node.is_busy());
        assert!(node.try_acquire());
        assert!(node.is_busy());
        assert!(!node.try_acquire());
        node.release();
        assert!(!node.is_busy());
        assert!(node.try_acquire());
    }

    #[test]
    fn test_activation() {
        let node = connector();
        assert!(node.is_active());
        node.set_active(false);
        assert!(!node.is_active());
        assert_eq!(node.analysis_time(), Duration::from_millis(250));
        assert_eq!(node.id().to_string(), "node-3");
    }
}
