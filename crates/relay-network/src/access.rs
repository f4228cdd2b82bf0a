//! Pairwise reachability between connectors
//!
//! A connector reaches another when the line between their antennas is clear
//! and the target sits inside its view. A carried connector may also count
//! its carrier's line of sight: the carrier can be turned towards the target
//! before sending, so only the view range applies.

use orbital_mechanics::{BodyId, World};
use tracing::trace;

use crate::connector::Connector;
use crate::Result;

/// Bodies sitting at a connector's end of a line of sight.
fn endpoint_bodies(node: &Connector) -> impl Iterator<Item = BodyId> {
    std::iter::once(node.antenna()).chain(node.mount().steerable_carrier())
}

/// Reachability using only the antenna's current orientation.
pub fn direct_access(world: &World, from: &Connector, to: &Connector) -> Result<bool> {
    let origin = world.position(from.antenna())?;
    let target = world.position(to.antenna())?;

    // The sender's own carrier still blocks: turning it is what the carrier
    // rule is for.
    let exclude: Vec<BodyId> = std::iter::once(from.antenna()).chain(endpoint_bodies(to)).collect();
    if world.is_segment_occluded(&origin, &target, &exclude)? {
        return Ok(false);
    }

    let local = world.frames().from_root(world.frame_of(from.antenna())?, &target)?;
    Ok(from.view().contains(&local))
}

/// Reachability after turning the sender's carrier towards the target.
pub fn carrier_access(world: &World, from: &Connector, to: &Connector) -> Result<bool> {
    let Some(carrier) = from.mount().steerable_carrier() else {
        return Ok(false);
    };
    let carrier_position = world.position(carrier)?;
    let target = world.position(to.antenna())?;

    let exclude: Vec<BodyId> = endpoint_bodies(from).chain(endpoint_bodies(to)).collect();
    if world.is_segment_occluded(&carrier_position, &target, &exclude)? {
        return Ok(false);
    }

    let range = world.distance(from.antenna(), to.antenna())?;
    Ok(from.view().within_range(range))
}

pub fn can_access(world: &World, from: &Connector, to: &Connector) -> Result<bool> {
    if direct_access(world, from, to)? {
        return Ok(true);
    }
    let via_carrier = carrier_access(world, from, to)?;
    if via_carrier {
        trace!(from = from.name(), to = to.name(), "reachable through carrier orientation");
    }
    Ok(via_carrier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::{NodeId, NodeSpec};
    use crate::view::View;
    use orbital_mechanics::{BodySpec, Ellipsoid, Vector};

    struct Fixture {
        world: World,
        ground: Connector,
        craft: Connector,
        far: Connector,
    }

    /// A ground antenna at the origin looking along +X, a carried antenna
    /// 1000 m out looking back along +X (away from the ground), and a free
    /// target beyond a blocking ball.
    fn fixture() -> Fixture {
        let mut world = World::default();
        let site = world.add_body(BodySpec::new("site")).unwrap();
        let ground_antenna = world.add_body(BodySpec::new("site antenna").parent(site)).unwrap();
        let carrier = world
            .add_body(BodySpec::new("carrier").at(Vector::new(1_000.0, 0.0, 0.0)))
            .unwrap();
        let craft_antenna = world.add_body(BodySpec::new("carrier antenna").parent(carrier)).unwrap();
        world
            .add_body(
                BodySpec::new("ball")
                    .at(Vector::new(0.0, 500.0, 0.0))
                    .shape(Ellipsoid::sphere(50.0).unwrap()),
            )
            .unwrap();
        let far_body = world.add_body(BodySpec::new("far").at(Vector::new(0.0, 1_000.0, 0.0))).unwrap();

        let cone = View::conic(5_000.0, 0.5).unwrap();
        let ground = Connector::new(NodeId(0), NodeSpec::ground_station("ground", site, cone), ground_antenna);
        let craft = Connector::new(NodeId(1), NodeSpec::repeater("craft", carrier, cone), craft_antenna);
        let far = Connector::new(
            NodeId(2),
            NodeSpec::new("far", crate::NodeRole::Repeater, crate::Mount::FreeFlying { body: far_body }, cone),
            far_body,
        );
        Fixture {
            world,
            ground,
            craft,
            far,
        }
    }

    #[test]
    fn test_direct_access_uses_own_view() {
        let f = fixture();
        assert!(direct_access(&f.world, &f.ground, &f.craft).unwrap());
        // the craft looks away from the ground station
        assert!(!direct_access(&f.world, &f.craft, &f.ground).unwrap());
    }

    #[test]
    fn test_carrier_relaxes_view_but_not_range() {
        let f = fixture();
        assert!(carrier_access(&f.world, &f.craft, &f.ground).unwrap());
        assert!(can_access(&f.world, &f.craft, &f.ground).unwrap());
        // surface sites cannot be turned
        assert!(!carrier_access(&f.world, &f.ground, &f.far).unwrap());
    }

    #[test]
    fn test_occluded_line_blocks_access() {
        let mut f = fixture();
        let far_antenna = f.far.antenna();
        // aim the ground antenna straight at the far target, behind the ball
        let target = f.world.position(far_antenna).unwrap();
        f.world.point_at(f.ground.antenna(), &target).unwrap();
        assert!(!direct_access(&f.world, &f.ground, &f.far).unwrap());
        assert!(!can_access(&f.world, &f.ground, &f.far).unwrap());
    }

    #[test]
    fn test_carrier_rule_respects_range() {
        let mut world = World::default();
        let carrier = world.add_body(BodySpec::new("carrier")).unwrap();
        let antenna = world.add_body(BodySpec::new("antenna").parent(carrier)).unwrap();
        let target = world.add_body(BodySpec::new("target").at(Vector::new(-200.0, 0.0, 0.0))).unwrap();
        let short = View::conic(100.0, 0.2).unwrap();
        let craft = Connector::new(NodeId(0), NodeSpec::repeater("craft", carrier, short), antenna);
        let other = Connector::new(
            NodeId(1),
            NodeSpec::new("target", crate::NodeRole::Repeater, crate::Mount::FreeFlying { body: target }, short),
            target,
        );
        assert!(!can_access(&world, &craft, &other).unwrap());
    }

    #[test]
    fn test_max_range_is_inside_for_both_rules() {
        let mut world = World::default();
        let carrier = world.add_body(BodySpec::new("carrier")).unwrap();
        let antenna = world.add_body(BodySpec::new("antenna").parent(carrier)).unwrap();
        let ahead = world.add_body(BodySpec::new("ahead").at(Vector::new(100.0, 0.0, 0.0))).unwrap();
        let behind = world.add_body(BodySpec::new("behind").at(Vector::new(-100.0, 0.0, 0.0))).unwrap();
        let beyond = world.add_body(BodySpec::new("beyond").at(Vector::new(-100.5, 0.0, 0.0))).unwrap();
        let view = View::conic(100.0, 0.2).unwrap();
        let craft = Connector::new(NodeId(0), NodeSpec::repeater("craft", carrier, view), antenna);
        let free = |index, name: &str, body| {
            let mount = crate::Mount::FreeFlying { body };
            Connector::new(NodeId(index), NodeSpec::new(name, crate::NodeRole::Repeater, mount, view), body)
        };

        assert!(direct_access(&world, &craft, &free(1, "ahead", ahead)).unwrap());
        assert!(carrier_access(&world, &craft, &free(2, "behind", behind)).unwrap());
        assert!(!carrier_access(&world, &craft, &free(3, "beyond", beyond)).unwrap());
    }
}
