//! Bodies and their occluding shapes

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::ephemeris::Ephemeris;
use crate::frame::FrameId;
use crate::linalg::{Basis, Vector};
use crate::{OrbitalError, Result};

/// Index of a body inside a [`World`](crate::World).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub(crate) usize);

impl BodyId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Oblate spheroid: equatorial radius on X/Y, polar radius on Z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipsoid {
    min_radius: f64,
    max_radius: f64,
}

impl Ellipsoid {
    pub fn new(min_radius: f64, max_radius: f64) -> Result<Self> {
        if !(min_radius.is_finite() && min_radius > 0.0) {
            return Err(OrbitalError::InvalidShape(format!("min radius must be positive, got {min_radius}")));
        }
        if !(max_radius.is_finite() && max_radius >= min_radius) {
            return Err(OrbitalError::InvalidShape(format!(
                "max radius {max_radius} must be at least the min radius {min_radius}"
            )));
        }
        Ok(Self { min_radius, max_radius })
    }

    pub fn sphere(radius: f64) -> Result<Self> {
        Self::new(radius, radius)
    }

    pub fn min_radius(&self) -> f64 {
        self.min_radius
    }

    pub fn max_radius(&self) -> f64 {
        self.max_radius
    }

    /// Strict interior test for a point in the body's own frame.
    pub fn contains(&self, p: &Vector) -> bool {
        let eq = self.max_radius * self.max_radius;
        let pol = self.min_radius * self.min_radius;
        p.x * p.x / eq + p.y * p.y / eq + p.z * p.z / pol < 1.0
    }

    /// Whether the segment p1..p2 (body frame) passes through the body.
    ///
    /// The body center is projected onto the line; the segment is blocked
    /// when that closest point is inside the ellipsoid and strictly between
    /// the endpoints along the axis with the largest extent.
    pub fn crosses(&self, p1: &Vector, p2: &Vector) -> bool {
        let delta = p2 - p1;
        let length = delta.norm();
        if length == 0.0 || !length.is_finite() {
            return false;
        }
        let direction = delta / length;
        let closest = p1 - direction * p1.dot(&direction);
        if !self.contains(&closest) {
            return false;
        }

        let axis = delta.iamax();
        let (lo, hi) = if p1[axis] < p2[axis] {
            (p1[axis], p2[axis])
        } else {
            (p2[axis], p1[axis])
        };
        lo < closest[axis] && closest[axis] < hi
    }
}

/// A frame with identity, optional mass and optional shape.
#[derive(Debug, Clone)]
pub struct Body {
    pub(crate) id: BodyId,
    pub(crate) name: String,
    pub(crate) frame: FrameId,
    pub(crate) parent: Option<BodyId>,
    pub(crate) mass: Option<f64>,
    pub(crate) shape: Option<Ellipsoid>,
    pub(crate) ephemeris: Option<Arc<dyn Ephemeris>>,
}

impl Body {
    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frame(&self) -> FrameId {
        self.frame
    }

    pub fn parent(&self) -> Option<BodyId> {
        self.parent
    }

    pub fn mass(&self) -> Option<f64> {
        self.mass
    }

    pub fn shape(&self) -> Option<&Ellipsoid> {
        self.shape.as_ref()
    }

    pub fn ephemeris(&self) -> Option<&Arc<dyn Ephemeris>> {
        self.ephemeris.as_ref()
    }
}

/// Builder for registering a body with a [`World`](crate::World).
#[derive(Debug, Clone)]
pub struct BodySpec {
    pub(crate) name: String,
    pub(crate) parent: Option<BodyId>,
    pub(crate) offset: Vector,
    pub(crate) velocity: Vector,
    pub(crate) basis: Basis,
    pub(crate) mass: Option<f64>,
    pub(crate) shape: Option<Ellipsoid>,
    pub(crate) ephemeris: Option<Arc<dyn Ephemeris>>,
}

impl BodySpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            offset: Vector::zeros(),
            velocity: Vector::zeros(),
            basis: Basis::identity(),
            mass: None,
            shape: None,
            ephemeris: None,
        }
    }

    pub fn parent(mut self, parent: BodyId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn at(mut self, offset: Vector) -> Self {
        self.offset = offset;
        self
    }

    pub fn velocity(mut self, velocity: Vector) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn basis(mut self, basis: Basis) -> Self {
        self.basis = basis;
        self
    }

    pub fn mass(mut self, mass: f64) -> Self {
        self.mass = Some(mass);
        self
    }

    pub fn shape(mut self, shape: Ellipsoid) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Bind a provider that rewrites the body's pose on every propagation.
    /// Its output is taken relative to the parent body.
    pub fn ephemeris(mut self, ephemeris: Arc<dyn Ephemeris>) -> Self {
        self.ephemeris = Some(ephemeris);
        self
    }
}
