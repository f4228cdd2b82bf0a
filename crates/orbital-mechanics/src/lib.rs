//! Orbital Mechanics Library
//!
//! Geometry and propagation core for the relay network simulator:
//!
//! - Vector/basis algebra over `nalgebra`
//! - Arena-backed reference frame hierarchy
//! - Keplerian propagation for elliptic, parabolic and hyperbolic orbits
//! - Pluggable ephemeris providers (fixed, orbital, Earth rotation, Lagrange points)
//! - The `World` simulation context with body catalogue and occlusion queries

use thiserror::Error;

pub mod body;
pub mod ephemeris;
pub mod epoch;
pub mod frame;
pub mod kepler;
pub mod lagrange;
pub mod linalg;
pub mod world;

pub use body::{Body, BodyId, BodySpec, Ellipsoid};
pub use ephemeris::{EarthRotation, Ephemeris, EphemerisState, FixedState};
pub use epoch::Epoch;
pub use frame::{Frame, FrameId, FrameTree};
pub use kepler::{Elements, Orbit, OrbitClass, Size};
pub use lagrange::{LagrangeEphemeris, LagrangePoint};
pub use linalg::{Basis, Matrix, UnitVector, Vector};
pub use world::World;

#[derive(Error, Debug)]
pub enum OrbitalError {
    #[error("Invalid orbital element {name} = {value}: {reason}")]
    InvalidElement {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
    #[error("True anomaly {0} rad is unreachable on this orbit")]
    UnreachableAnomaly(f64),
    #[error("Invalid shape: {0}")]
    InvalidShape(String),
    #[error("Invalid body: {0}")]
    InvalidBody(String),
    #[error("Invalid vector: {0}")]
    InvalidVector(String),
    #[error("Frame not found: {0}")]
    FrameNotFound(usize),
    #[error("Frame {0} has a cyclic parent chain")]
    CyclicFrameChain(usize),
    #[error("Body not found: {0}")]
    BodyNotFound(String),
    #[error("Body {0} has no mass")]
    MissingMass(String),
    #[error("Singular transform (determinant {0})")]
    SingularTransform(f64),
    #[error("Invalid epoch: {0}")]
    InvalidEpoch(String),
}

pub type Result<T> = std::result::Result<T, OrbitalError>;

pub mod transforms {
    use super::*;

    /// Position of a surface site in the planet-fixed frame of an ellipsoid.
    ///
    /// Latitude and longitude are geodetic degrees, altitude is meters above
    /// the ellipsoid surface.
    pub fn geodetic_to_cartesian(
        latitude_deg: f64,
        longitude_deg: f64,
        altitude_m: f64,
        shape: &Ellipsoid,
    ) -> Vector {
        let lat = latitude_deg.to_radians();
        let lon = longitude_deg.to_radians();
        let a = shape.max_radius();
        let b = shape.min_radius();
        let e2 = 1.0 - (b * b) / (a * a);

        let n = a / (1.0 - e2 * lat.sin().powi(2)).sqrt();

        Vector::new(
            (n + altitude_m) * lat.cos() * lon.cos(),
            (n + altitude_m) * lat.cos() * lon.sin(),
            (n * (1.0 - e2) + altitude_m) * lat.sin(),
        )
    }

    /// Local horizon basis at a site: I = up, J = east, K = north.
    pub fn horizon_basis(latitude_deg: f64, longitude_deg: f64) -> Basis {
        let lat = latitude_deg.to_radians();
        let lon = longitude_deg.to_radians();
        let rotation = nalgebra::Rotation3::from_axis_angle(&Vector::z_axis(), lon)
            * nalgebra::Rotation3::from_axis_angle(&Vector::y_axis(), -lat);
        Basis::from_rotation(&rotation)
    }

}
