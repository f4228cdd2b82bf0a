//! Ephemeris providers
//!
//! A provider maps an epoch to a body's state relative to its parent body.
//! Providers are bound to bodies at registration and evaluated by
//! [`World::propagate_all`](crate::World::propagate_all).

use nalgebra::Rotation3;
use std::f64::consts::TAU;
use std::fmt::Debug;

use crate::epoch::{Epoch, SECONDS_PER_DAY};
use crate::linalg::{Basis, Vector};
use crate::Result;

/// Mean obliquity of the ecliptic at J2000 (84381.406 arcsec).
pub const J2000_OBLIQUITY: f64 = 84_381.406 / 3_600.0 * std::f64::consts::PI / 180.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EphemerisState {
    pub position: Vector,
    pub velocity: Vector,
    /// New orientation, when the provider drives it.
    pub basis: Option<Basis>,
}

pub trait Ephemeris: Debug + Send + Sync {
    fn state_at(&self, epoch: Epoch) -> Result<EphemerisState>;
}

/// A state that never changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedState(pub EphemerisState);

impl FixedState {
    pub fn at(position: Vector) -> Self {
        Self(EphemerisState {
            position,
            velocity: Vector::zeros(),
            basis: None,
        })
    }
}

impl Ephemeris for FixedState {
    fn state_at(&self, _epoch: Epoch) -> Result<EphemerisState> {
        Ok(self.0)
    }
}

/// Earth Rotation Angle in [0, 2π).
pub fn earth_rotation_angle(epoch: Epoch) -> f64 {
    let days = epoch.seconds_since_j2000() / SECONDS_PER_DAY;
    (TAU * (0.779_057_273_264_0 + 1.002_737_811_911_354_48 * days)).rem_euclid(TAU)
}

/// Surface-fixed planet frame: tilted by the obliquity and spun by the
/// Earth Rotation Angle. Precession and nutation are ignored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarthRotation {
    pub obliquity: f64,
}

impl Default for EarthRotation {
    fn default() -> Self {
        Self {
            obliquity: J2000_OBLIQUITY,
        }
    }
}

impl Ephemeris for EarthRotation {
    fn state_at(&self, epoch: Epoch) -> Result<EphemerisState> {
        let rotation = Rotation3::from_axis_angle(&Vector::x_axis(), -self.obliquity)
            * Rotation3::from_axis_angle(&Vector::z_axis(), earth_rotation_angle(epoch));
        Ok(EphemerisState {
            position: Vector::zeros(),
            velocity: Vector::zeros(),
            basis: Some(Basis::from_rotation(&rotation)),
        })
    }
}
