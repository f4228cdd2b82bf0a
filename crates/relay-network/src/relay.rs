//! Store-and-forward relay protocol
//!
//! Every hop runs the same procedure:
//!
//! 1. The holder turns towards the next hop (its carrier first, when only
//!    the carrier rule grants access) and waits out the fixed slew time.
//! 2. A delivery task sleeps for the light-time between the two antennas.
//! 3. The receiver claims its busy flag, analyzes the message and either
//!    forwards it along the path or takes delivery.
//!
//! A message that reaches a busy or inactive node is dropped; the sender is
//! not told. Protocol steps are published as [`RelayEvent`]s.

use futures::future::{BoxFuture, FutureExt};
use orbital_mechanics::{BodySpec, Epoch, World};
use parking_lot::{RwLock, RwLockWriteGuard};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::access::direct_access;
use crate::config::RelayConfig;
use crate::connector::{Connector, Mount, NodeId, NodeRole, NodeSpec};
use crate::message::{Message, MessageKind};
use crate::topology::{light_time_ms, Route, Topology};
use crate::{NetworkError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    Busy,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RelayEvent {
    Sent {
        message: Uuid,
        from: NodeId,
        to: NodeId,
        light_time_ms: u64,
    },
    Received {
        message: Uuid,
        node: NodeId,
    },
    Dropped {
        message: Uuid,
        node: NodeId,
        reason: DropReason,
    },
    Forwarded {
        message: Uuid,
        node: NodeId,
        next: NodeId,
    },
    Delivered {
        message: Uuid,
        node: NodeId,
        kind: MessageKind,
    },
    /// An acknowledgement for `message` reached the message's origin.
    Acknowledged {
        message: Uuid,
        ack: Uuid,
    },
    Unreachable {
        origin: NodeId,
        destination: NodeId,
    },
}

impl RelayEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RelayEvent::Sent { .. } => "sent",
            RelayEvent::Received { .. } => "received",
            RelayEvent::Dropped { .. } => "dropped",
            RelayEvent::Forwarded { .. } => "forwarded",
            RelayEvent::Delivered { .. } => "delivered",
            RelayEvent::Acknowledged { .. } => "acknowledged",
            RelayEvent::Unreachable { .. } => "unreachable",
        }
    }
}

pub struct RelayNetworkBuilder {
    world: World,
    config: RelayConfig,
    nodes: Vec<Arc<Connector>>,
}

impl RelayNetworkBuilder {
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Register a connector. Surface and carried connectors get an antenna
    /// body of their own, placed at the spec's offset from the host.
    pub fn add_node(&mut self, spec: NodeSpec) -> Result<NodeId> {
        if self.nodes.iter().any(|n| n.name() == spec.name) {
            return Err(NetworkError::DuplicateNode(spec.name));
        }
        let antenna = match spec.mount {
            Mount::FreeFlying { body } => self.world.body(body)?.id(),
            Mount::Surface { site: host } | Mount::Carried { carrier: host } => self.world.add_body(
                BodySpec::new(format!("{} antenna", spec.name))
                    .parent(host)
                    .at(spec.offset),
            )?,
        };

        let id = NodeId(self.nodes.len());
        debug!(node = %spec.name, %id, role = ?spec.role, "registered connector");
        self.nodes.push(Arc::new(Connector::new(id, spec, antenna)));
        Ok(id)
    }

    pub fn build(self) -> Arc<RelayNetwork> {
        let (events, _) = broadcast::channel(self.config.event_capacity.max(1));
        Arc::new(RelayNetwork {
            world: Arc::new(RwLock::new(self.world)),
            nodes: self.nodes,
            config: self.config,
            events,
            in_flight: AtomicUsize::new(0),
            idle: Notify::new(),
        })
    }
}

pub struct RelayNetwork {
    world: Arc<RwLock<World>>,
    nodes: Vec<Arc<Connector>>,
    config: RelayConfig,
    events: broadcast::Sender<RelayEvent>,
    /// Sends not yet settled; see [`InFlight`].
    in_flight: AtomicUsize,
    idle: Notify,
}

impl RelayNetwork {
    pub fn builder(world: World, config: RelayConfig) -> RelayNetworkBuilder {
        RelayNetworkBuilder {
            world,
            config,
            nodes: Vec::new(),
        }
    }

    pub fn world(&self) -> &Arc<RwLock<World>> {
        &self.world
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn nodes(&self) -> &[Arc<Connector>] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Result<&Arc<Connector>> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| NetworkError::NodeNotFound(id.to_string()))
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Arc<Connector>> {
        self.nodes.iter().find(|n| n.name() == name)
    }

    pub fn set_active(&self, id: NodeId, active: bool) -> Result<()> {
        let node = self.node(id)?;
        info!(node = node.name(), active, "node activity changed");
        node.set_active(active);
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.events.subscribe()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn epoch(&self) -> Epoch {
        self.world.read().epoch()
    }

    pub fn propagate_all(&self, epoch: Epoch) -> Result<()> {
        self.world.write().propagate_all(epoch)?;
        Ok(())
    }

    /// Visibility graph of the current world state.
    pub fn topology(&self) -> Result<Topology> {
        let world = self.world.read();
        Topology::build(&world, &self.nodes)
    }

    pub fn compute_route(&self, origin: NodeId, destination: NodeId) -> Result<Option<Route>> {
        self.node(origin)?;
        self.node(destination)?;
        Ok(self.topology()?.shortest_path(origin, destination))
    }

    /// Propagate to `epoch` and route against that state without letting
    /// another writer in between.
    pub fn compute_route_at(&self, origin: NodeId, destination: NodeId, epoch: Epoch) -> Result<Option<Route>> {
        self.node(origin)?;
        self.node(destination)?;
        let mut world = self.world.write();
        world.propagate_all(epoch)?;
        let world = RwLockWriteGuard::downgrade(world);
        Ok(Topology::build(&world, &self.nodes)?.shortest_path(origin, destination))
    }

    /// Route a new message and send its first hop. Returns `None` when the
    /// destination cannot be reached right now.
    pub async fn originate(
        self: &Arc<Self>,
        kind: MessageKind,
        origin: NodeId,
        destination: NodeId,
    ) -> Result<Option<Message>> {
        if origin == destination {
            return Err(NetworkError::NoNextHop(origin));
        }
        let Some(route) = self.compute_route(origin, destination)? else {
            info!(%origin, %destination, "destination unreachable");
            self.emit(RelayEvent::Unreachable { origin, destination });
            return Ok(None);
        };

        let message = Message::new(kind, route.nodes)?;
        info!(
            message = %message.id(),
            ?kind,
            hops = message.path().len() - 1,
            light_time_ms = route.light_time_ms,
            "originating message"
        );
        self.send(message.clone(), origin).await?;
        Ok(Some(message))
    }

    /// Hand `message` from `holder` to the next node on its path.
    ///
    /// Returns once the sender has slewed and delivery is scheduled; the
    /// value is the scheduled light-time delay.
    pub async fn send(self: &Arc<Self>, message: Message, holder: NodeId) -> Result<Duration> {
        if !message.contains(holder) {
            return Err(NetworkError::NotOnPath {
                node: holder,
                message: message.id(),
            });
        }
        let next = message.next_after(holder).ok_or(NetworkError::NoNextHop(holder))?;
        let from = Arc::clone(self.node(holder)?);
        let to = Arc::clone(self.node(next)?);

        let guard = InFlight::enter(self);
        self.hand_off(message, &from, to, guard).await
    }

    async fn hand_off(
        self: &Arc<Self>,
        message: Message,
        from: &Connector,
        to: Arc<Connector>,
        guard: InFlight,
    ) -> Result<Duration> {
        self.orient(from, &to)?;
        tokio::time::sleep(self.config.slew_time()).await;

        let distance = self.world.read().distance(from.antenna(), to.antenna())?;
        let delay_ms = light_time_ms(distance);
        let delay = Duration::from_millis(delay_ms);
        debug!(message = %message.id(), from = from.name(), to = to.name(), delay_ms, "delivery scheduled");
        self.emit(RelayEvent::Sent {
            message: message.id(),
            from: from.id(),
            to: to.id(),
            light_time_ms: delay_ms,
        });

        let network = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            network.receive(to, message).await;
            drop(guard);
        });
        Ok(delay)
    }

    /// Point the sender at the next hop, turning its carrier first when the
    /// antenna alone cannot reach.
    fn orient(&self, from: &Connector, to: &Connector) -> Result<()> {
        let mut world = self.world.write();
        let target = world.position(to.antenna())?;
        if !direct_access(&world, from, to)? {
            if let Some(carrier) = from.mount().steerable_carrier() {
                debug!(node = from.name(), target = to.name(), "turning carrier");
                world.point_at(carrier, &target)?;
            }
        }
        world.point_at(from.antenna(), &target)?;
        Ok(())
    }

    // Boxed: delivery tasks spawn further deliveries.
    fn receive(self: Arc<Self>, node: Arc<Connector>, message: Message) -> BoxFuture<'static, ()> {
        async move { self.process(&node, message).await }.boxed()
    }

    async fn process(self: &Arc<Self>, node: &Connector, message: Message) {
        if !node.is_active() {
            debug!(node = node.name(), message = %message.id(), "inactive, dropping message");
            self.emit(RelayEvent::Dropped {
                message: message.id(),
                node: node.id(),
                reason: DropReason::Inactive,
            });
            return;
        }
        if !node.try_acquire() {
            info!(node = node.name(), message = %message.id(), "busy, dropping message");
            self.emit(RelayEvent::Dropped {
                message: message.id(),
                node: node.id(),
                reason: DropReason::Busy,
            });
            return;
        }

        self.emit(RelayEvent::Received {
            message: message.id(),
            node: node.id(),
        });
        tokio::time::sleep(node.analysis_time()).await;
        if let Err(err) = self.analyze(node, &message).await {
            warn!(node = node.name(), message = %message.id(), error = %err, "analysis failed");
        }
        node.release();
    }

    async fn analyze(self: &Arc<Self>, node: &Connector, message: &Message) -> Result<()> {
        if message.destination() != node.id() {
            let next = message.next_after(node.id()).ok_or(NetworkError::NoNextHop(node.id()))?;
            debug!(node = node.name(), message = %message.id(), %next, "forwarding");
            self.emit(RelayEvent::Forwarded {
                message: message.id(),
                node: node.id(),
                next,
            });
            self.send(message.clone(), node.id()).await?;
            return Ok(());
        }

        info!(node = node.name(), message = %message.id(), kind = ?message.kind(), "delivered");
        self.emit(RelayEvent::Delivered {
            message: message.id(),
            node: node.id(),
            kind: message.kind(),
        });
        if let (MessageKind::Ack, Some(original)) = (message.kind(), message.in_reply_to()) {
            self.emit(RelayEvent::Acknowledged {
                message: original,
                ack: message.id(),
            });
        }

        if node.role() == NodeRole::MainSpacecraft
            && self.config.auto_acknowledge
            && message.kind().expects_ack()
            && message.origin() != node.id()
        {
            self.acknowledge(node, message).await?;
        }
        Ok(())
    }

    async fn acknowledge(self: &Arc<Self>, node: &Connector, message: &Message) -> Result<()> {
        let origin = message.origin();
        let Some(route) = self.compute_route(node.id(), origin)? else {
            warn!(node = node.name(), %origin, "no route back for acknowledgement");
            self.emit(RelayEvent::Unreachable {
                origin: node.id(),
                destination: origin,
            });
            return Ok(());
        };
        let ack = message.reply(MessageKind::Ack, route.nodes)?;
        debug!(node = node.name(), ack = %ack.id(), original = %message.id(), "acknowledging");
        self.send(ack, node.id()).await?;
        Ok(())
    }

    fn settle(&self) {
        if self.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }

    /// Resolve once no delivery or analysis is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.in_flight.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    fn emit(&self, event: RelayEvent) {
        // Sending only fails when nobody is subscribed.
        let _ = self.events.send(event);
    }
}

/// Counts one send from its first slew step until the receiver is done with
/// the message. Settles on drop, including when a send is abandoned mid-slew
/// or its hand-off fails.
struct InFlight(Arc<RelayNetwork>);

impl InFlight {
    fn enter(network: &Arc<RelayNetwork>) -> Self {
        network.in_flight.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(network))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.settle();
    }
}
