//! Simulation context
//!
//! `World` owns every frame and body of a run. Bodies reference frames and
//! parents by index, so the parent chain never forms an ownership cycle.

use tracing::{debug, trace};

use crate::body::{Body, BodyId, BodySpec};
use crate::epoch::Epoch;
use crate::frame::{FrameId, FrameTree};
use crate::linalg::Vector;
use crate::{OrbitalError, Result};

#[derive(Debug, Clone)]
pub struct World {
    frames: FrameTree,
    bodies: Vec<Body>,
    epoch: Epoch,
}

impl World {
    pub fn new(epoch: Epoch) -> Self {
        Self {
            frames: FrameTree::new(),
            bodies: Vec::new(),
            epoch,
        }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn frames(&self) -> &FrameTree {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut FrameTree {
        &mut self.frames
    }

    /// Register a body. Its frame hangs off the parent body's frame, or off
    /// the absolute frame when no parent is given.
    pub fn add_body(&mut self, spec: BodySpec) -> Result<BodyId> {
        if let Some(mass) = spec.mass {
            if !(mass.is_finite() && mass > 0.0) {
                return Err(OrbitalError::InvalidBody(format!(
                    "{}: mass must be positive, got {mass}",
                    spec.name
                )));
            }
        }
        if self.body_by_name(&spec.name).is_some() {
            return Err(OrbitalError::InvalidBody(format!("duplicate body name {}", spec.name)));
        }
        let parent_frame = match spec.parent {
            Some(parent) => Some(self.body(parent)?.frame),
            None => None,
        };

        let frame = self.frames.add(spec.name.clone(), parent_frame, spec.offset, spec.basis)?;
        self.frames.get_mut(frame)?.velocity = spec.velocity;

        let id = BodyId(self.bodies.len());
        debug!(body = %spec.name, id = id.0, parent = ?spec.parent, "registered body");
        self.bodies.push(Body {
            id,
            name: spec.name,
            frame,
            parent: spec.parent,
            mass: spec.mass,
            shape: spec.shape,
            ephemeris: spec.ephemeris,
        });
        Ok(id)
    }

    pub fn body(&self, id: BodyId) -> Result<&Body> {
        self.bodies
            .get(id.0)
            .ok_or_else(|| OrbitalError::BodyNotFound(format!("#{}", id.0)))
    }

    pub fn body_by_name(&self, name: &str) -> Option<&Body> {
        self.bodies.iter().find(|b| b.name == name)
    }

    pub fn bodies(&self) -> impl Iterator<Item = &Body> {
        self.bodies.iter()
    }

    pub fn frame_of(&self, id: BodyId) -> Result<FrameId> {
        Ok(self.body(id)?.frame)
    }

    /// Absolute position of a body.
    pub fn position(&self, id: BodyId) -> Result<Vector> {
        self.frames.position(self.frame_of(id)?)
    }

    /// Absolute velocity of a body.
    pub fn velocity(&self, id: BodyId) -> Result<Vector> {
        self.frames.velocity(self.frame_of(id)?)
    }

    pub fn distance(&self, a: BodyId, b: BodyId) -> Result<f64> {
        Ok((self.position(b)? - self.position(a)?).norm())
    }

    /// Convert a point from one body's frame into another's.
    pub fn convert(&self, point: &Vector, from: BodyId, to: BodyId) -> Result<Vector> {
        self.frames.convert(point, self.frame_of(from)?, self.frame_of(to)?)
    }

    /// Turn a body's I axis towards an absolute point.
    pub fn point_at(&mut self, id: BodyId, target: &Vector) -> Result<()> {
        let frame = self.frame_of(id)?;
        self.frames.point_at(frame, target, &mut [])
    }

    /// Advance every body with a bound ephemeris to `epoch`.
    ///
    /// All states are evaluated before any frame is written, so a failing
    /// provider leaves the world at its previous epoch.
    pub fn propagate_all(&mut self, epoch: Epoch) -> Result<()> {
        let mut updates = Vec::new();
        for body in &self.bodies {
            if let Some(ephemeris) = &body.ephemeris {
                updates.push((body.frame, ephemeris.state_at(epoch)?));
            }
        }

        for (frame_id, state) in updates.iter() {
            let frame = self.frames.get_mut(*frame_id)?;
            frame.offset = state.position;
            frame.velocity = state.velocity;
            if let Some(basis) = state.basis {
                frame.basis = basis;
            }
        }

        debug!(%epoch, updated = updates.len(), "propagated bodies");
        self.epoch = epoch;
        Ok(())
    }

    /// Whether the segment between two absolute points passes through any
    /// shaped body not listed in `exclude`.
    pub fn is_segment_occluded(&self, p1: &Vector, p2: &Vector, exclude: &[BodyId]) -> Result<bool> {
        for body in &self.bodies {
            let Some(shape) = &body.shape else { continue };
            if exclude.contains(&body.id) {
                continue;
            }
            let local1 = self.frames.from_root(body.frame, p1)?;
            let local2 = self.frames.from_root(body.frame, p2)?;
            if shape.crosses(&local1, &local2) {
                trace!(body = %body.name, "segment occluded");
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(Epoch::j2000())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Ellipsoid;
    use crate::ephemeris::{Ephemeris, EphemerisState, FixedState};
    use crate::kepler::{Elements, Orbit, Size};
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn create_test_world() -> (World, BodyId, BodyId) {
        let mut world = World::new(Epoch::j2000());
        let sun = world
            .add_body(BodySpec::new("Sun").mass(1.9885e30).shape(Ellipsoid::new(6.955e8, 6.9551e8).unwrap()))
            .unwrap();
        let planet = world
            .add_body(
                BodySpec::new("Planet")
                    .parent(sun)
                    .at(Vector::new(1.496e11, 0.0, 0.0))
                    .mass(5.9722e24)
                    .shape(Ellipsoid::new(6.3568e6, 6.3781e6).unwrap()),
            )
            .unwrap();
        (world, sun, planet)
    }

    #[test]
    fn test_add_body_validation() {
        let (mut world, sun, _) = create_test_world();
        assert!(world.add_body(BodySpec::new("Dust").mass(-1.0)).is_err());
        assert!(world.add_body(BodySpec::new("Sun")).is_err());
        assert!(world.add_body(BodySpec::new("Orphan").parent(BodyId(99))).is_err());
        assert!(world.add_body(BodySpec::new("Probe").parent(sun)).is_ok());
    }

    #[test]
    fn test_occlusion_through_center() {
        let mut world = World::new(Epoch::j2000());
        let ball = world
            .add_body(BodySpec::new("Ball").at(Vector::new(50.0, 0.0, 0.0)).shape(Ellipsoid::sphere(10.0).unwrap()))
            .unwrap();
        let a = Vector::zeros();
        let b = Vector::new(100.0, 0.0, 0.0);
        assert!(world.is_segment_occluded(&a, &b, &[]).unwrap());
        // the body at an endpoint never blocks its own line
        assert!(!world.is_segment_occluded(&a, &b, &[ball]).unwrap());

        let frame = world.frame_of(ball).unwrap();
        world.frames_mut().get_mut(frame).unwrap().offset = Vector::new(50.0, 10.5, 0.0);
        assert!(!world.is_segment_occluded(&a, &b, &[]).unwrap());
    }

    #[test]
    fn test_occlusion_respects_body_orientation() {
        let mut world = World::new(Epoch::j2000());
        // flattened body tipped on its side: polar axis along world X
        let basis = crate::linalg::Basis::identity()
            .rotate_about_world_axis(&Vector::y(), std::f64::consts::FRAC_PI_2)
            .unwrap();
        world
            .add_body(BodySpec::new("Disk").basis(basis).shape(Ellipsoid::new(1.0, 10.0).unwrap()))
            .unwrap();
        // passes 5 units off-center along world X, outside the thin polar extent
        assert!(!world
            .is_segment_occluded(&Vector::new(5.0, -50.0, 0.0), &Vector::new(5.0, 50.0, 0.0), &[])
            .unwrap());
        // same offset along world Z lies inside the wide equatorial extent
        assert!(world
            .is_segment_occluded(&Vector::new(0.0, -50.0, 5.0), &Vector::new(0.0, 50.0, 5.0), &[])
            .unwrap());
    }

    #[test]
    fn test_planet_blocks_far_side() {
        let (world, sun, planet) = create_test_world();
        let planet_pos = world.position(planet).unwrap();
        let near = planet_pos + Vector::new(-1.0e7, 0.0, 0.0);
        let far = planet_pos + Vector::new(1.0e7, 0.0, 0.0);
        assert!(world.is_segment_occluded(&near, &far, &[sun]).unwrap());
        let beside = planet_pos + Vector::new(-1.0e7, 2.0e7, 0.0);
        assert!(!world.is_segment_occluded(&near, &beside, &[sun]).unwrap());
    }

    #[test]
    fn test_propagate_all_moves_orbiting_body() {
        let (mut world, _, planet) = create_test_world();
        let elements = Elements {
            epoch: Epoch::j2000(),
            eccentricity: 0.0,
            size: Size::SemimajorAxis(4.2e7),
            inclination: 0.0,
            ascending_node: 0.0,
            periapsis_argument: 0.0,
            true_anomaly: 0.0,
        };
        let orbit = Orbit::new(elements, world.body(planet).unwrap()).unwrap();
        let period = orbit.period().unwrap();
        let sat = world
            .add_body(BodySpec::new("Sat").parent(planet).ephemeris(Arc::new(orbit)))
            .unwrap();

        let quarter = Epoch::j2000().add_seconds(period / 4.0);
        world.propagate_all(quarter).unwrap();
        assert_eq!(world.epoch(), quarter);
        let relative = world.position(sat).unwrap() - world.position(planet).unwrap();
        assert_relative_eq!(relative, Vector::new(0.0, 4.2e7, 0.0), epsilon = 1e-2);
        assert_relative_eq!(world.distance(planet, sat).unwrap(), 4.2e7, epsilon = 1e-2);
    }

    #[derive(Debug)]
    struct Broken;

    impl Ephemeris for Broken {
        fn state_at(&self, epoch: Epoch) -> Result<EphemerisState> {
            Err(OrbitalError::InvalidEpoch(epoch.to_string()))
        }
    }

    #[test]
    fn test_failed_propagation_leaves_world_untouched() {
        let (mut world, sun, _) = create_test_world();
        let probe = world
            .add_body(BodySpec::new("Probe").parent(sun).ephemeris(Arc::new(FixedState::at(Vector::new(1.0, 0.0, 0.0)))))
            .unwrap();
        world.add_body(BodySpec::new("Broken").ephemeris(Arc::new(Broken))).unwrap();
        assert!(world.propagate_all(Epoch::j2000().add_days(1.0)).is_err());
        assert_eq!(world.epoch(), Epoch::j2000());
        assert_eq!(world.position(probe).unwrap(), Vector::zeros());
    }

    #[test]
    fn test_convert_between_bodies() {
        let (world, sun, planet) = create_test_world();
        let p = world.convert(&Vector::zeros(), sun, planet).unwrap();
        assert_relative_eq!(p, Vector::new(-1.496e11, 0.0, 0.0));
    }
}
