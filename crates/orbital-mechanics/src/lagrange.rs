//! Lagrange points of a two-body system
//!
//! Collinear points use the first-order Hill-radius approximation; the
//! triangular points lead and trail the secondary by 60° in its orbit plane.
//! The output is relative to the primary, so the bound body should be a child
//! of the primary.

use nalgebra::Rotation3;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_3;
use std::sync::Arc;

use crate::ephemeris::{Ephemeris, EphemerisState};
use crate::epoch::Epoch;
use crate::linalg::unit;
use crate::{OrbitalError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LagrangePoint {
    L1,
    L2,
    L3,
    L4,
    L5,
}

#[derive(Debug, Clone)]
pub struct LagrangeEphemeris {
    point: LagrangePoint,
    secondary: Arc<dyn Ephemeris>,
    /// m2 / (m1 + m2)
    mass_ratio: f64,
}

impl LagrangeEphemeris {
    /// `secondary` gives the secondary's state relative to the primary.
    pub fn new(
        point: LagrangePoint,
        secondary: Arc<dyn Ephemeris>,
        primary_mass: f64,
        secondary_mass: f64,
    ) -> Result<Self> {
        if !(primary_mass > 0.0 && secondary_mass > 0.0) {
            return Err(OrbitalError::InvalidBody(format!(
                "Lagrange point masses must be positive ({primary_mass}, {secondary_mass})"
            )));
        }
        Ok(Self {
            point,
            secondary,
            mass_ratio: secondary_mass / (primary_mass + secondary_mass),
        })
    }

    pub fn point(&self) -> LagrangePoint {
        self.point
    }

    pub fn mass_ratio(&self) -> f64 {
        self.mass_ratio
    }
}

impl Ephemeris for LagrangeEphemeris {
    fn state_at(&self, epoch: Epoch) -> Result<EphemerisState> {
        let secondary = self.secondary.state_at(epoch)?;
        let (r, v) = (secondary.position, secondary.velocity);
        let hill = (self.mass_ratio / 3.0).cbrt();

        let (position, velocity) = match self.point {
            LagrangePoint::L1 => (r * (1.0 - hill), v * (1.0 - hill)),
            LagrangePoint::L2 => (r * (1.0 + hill), v * (1.0 + hill)),
            LagrangePoint::L3 => {
                let k = -(1.0 + 5.0 * self.mass_ratio / 12.0);
                (r * k, v * k)
            }
            LagrangePoint::L4 | LagrangePoint::L5 => {
                let normal = unit(&r.cross(&v))?;
                let angle = if self.point == LagrangePoint::L4 { FRAC_PI_3 } else { -FRAC_PI_3 };
                let rotation = Rotation3::from_axis_angle(&normal, angle);
                (rotation * r, rotation * v)
            }
        };

        Ok(EphemerisState {
            position,
            velocity,
            basis: None,
        })
    }
}
