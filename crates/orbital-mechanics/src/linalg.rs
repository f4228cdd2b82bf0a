//! Vector and basis algebra
//!
//! Vectors are plain `nalgebra` column vectors. Unit vectors use
//! `nalgebra::Unit`, so the magnitude-one invariant is carried by the type.
//! Rotations are active (they move the vector, not the axes).

use nalgebra::{Matrix3, Rotation3, Unit, Vector3};

use crate::{OrbitalError, Result};

pub type Vector = Vector3<f64>;
pub type UnitVector = Unit<Vector3<f64>>;
pub type Matrix = Matrix3<f64>;

const ORTHONORMAL_TOLERANCE: f64 = 1e-9;
const SINGULAR_DETERMINANT: f64 = 1e-12;

/// Normalize a vector, rejecting zero and non-finite input.
pub fn unit(v: &Vector) -> Result<UnitVector> {
    if !v.iter().all(|c| c.is_finite()) {
        return Err(OrbitalError::InvalidVector(format!("non-finite vector {:?}", v)));
    }
    Unit::try_new(*v, f64::MIN_POSITIVE)
        .ok_or_else(|| OrbitalError::InvalidVector("cannot normalize a zero vector".into()))
}

/// Angle between two vectors in [0, π].
pub fn angle_between(a: &Vector, b: &Vector) -> f64 {
    a.cross(b).norm().atan2(a.dot(b))
}

/// Polar angle measured from +Z.
pub fn zenith(v: &Vector) -> f64 {
    v.xy().norm().atan2(v.z)
}

/// Azimuth in the XY plane measured from +X towards +Y.
pub fn azimuth(v: &Vector) -> f64 {
    v.y.atan2(v.x)
}

pub fn from_spherical(radius: f64, zenith: f64, azimuth: f64) -> Vector {
    Vector::new(
        radius * zenith.sin() * azimuth.cos(),
        radius * zenith.sin() * azimuth.sin(),
        radius * zenith.cos(),
    )
}

pub fn rotate_x(v: &Vector, angle: f64) -> Vector {
    Rotation3::from_axis_angle(&Vector::x_axis(), angle) * v
}

pub fn rotate_y(v: &Vector, angle: f64) -> Vector {
    Rotation3::from_axis_angle(&Vector::y_axis(), angle) * v
}

pub fn rotate_z(v: &Vector, angle: f64) -> Vector {
    Rotation3::from_axis_angle(&Vector::z_axis(), angle) * v
}

pub fn rotate_about(v: &Vector, axis: &Vector, angle: f64) -> Result<Vector> {
    Ok(Rotation3::from_axis_angle(&unit(axis)?, angle) * v)
}

/// Z-X-Z Euler rotation: rotation about Z, then nutation about X, then
/// precession about Z.
pub fn euler_rotation(precession: f64, nutation: f64, rotation: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector::z_axis(), precession)
        * Rotation3::from_axis_angle(&Vector::x_axis(), nutation)
        * Rotation3::from_axis_angle(&Vector::z_axis(), rotation)
}

pub fn rotate_euler(v: &Vector, precession: f64, nutation: f64, rotation: f64) -> Vector {
    euler_rotation(precession, nutation, rotation) * v
}

/// Checked matrix inverse.
pub fn invert(m: &Matrix) -> Result<Matrix> {
    let det = m.determinant();
    if !det.is_finite() || det.abs() < SINGULAR_DETERMINANT {
        return Err(OrbitalError::SingularTransform(det));
    }
    m.try_inverse().ok_or(OrbitalError::SingularTransform(det))
}

/// Right-handed orthonormal triple (I, J, K) expressed in a parent frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Basis {
    i: UnitVector,
    j: UnitVector,
    k: UnitVector,
}

impl Basis {
    pub fn identity() -> Self {
        Self {
            i: Vector::x_axis(),
            j: Vector::y_axis(),
            k: Vector::z_axis(),
        }
    }

    /// Build a basis from three vectors, which must already be orthonormal
    /// and right-handed.
    pub fn new(i: Vector, j: Vector, k: Vector) -> Result<Self> {
        let unit_len = |v: &Vector| (v.norm() - 1.0).abs() < ORTHONORMAL_TOLERANCE;
        if !(unit_len(&i) && unit_len(&j) && unit_len(&k)) {
            return Err(OrbitalError::InvalidVector("basis vectors must be unit length".into()));
        }
        if i.dot(&j).abs() > ORTHONORMAL_TOLERANCE
            || j.dot(&k).abs() > ORTHONORMAL_TOLERANCE
            || k.dot(&i).abs() > ORTHONORMAL_TOLERANCE
        {
            return Err(OrbitalError::InvalidVector("basis vectors must be orthogonal".into()));
        }
        if (i.cross(&j) - k).norm() > ORTHONORMAL_TOLERANCE {
            return Err(OrbitalError::InvalidVector("basis must be right-handed".into()));
        }
        Ok(Self {
            i: Unit::new_normalize(i),
            j: Unit::new_normalize(j),
            k: Unit::new_normalize(k),
        })
    }

    pub fn from_rotation(rotation: &Rotation3<f64>) -> Self {
        Self::identity().rotated(rotation)
    }

    pub fn i(&self) -> UnitVector {
        self.i
    }

    pub fn j(&self) -> UnitVector {
        self.j
    }

    pub fn k(&self) -> UnitVector {
        self.k
    }

    /// Matrix whose columns are I, J, K. Maps local coordinates to parent
    /// coordinates.
    pub fn matrix(&self) -> Matrix {
        Matrix::from_columns(&[self.i.into_inner(), self.j.into_inner(), self.k.into_inner()])
    }

    pub fn rotation(&self) -> Rotation3<f64> {
        Rotation3::from_matrix_unchecked(self.matrix())
    }

    /// Apply a rotation to every basis vector. Vectors are renormalized so
    /// repeated slews do not drift off the unit sphere.
    pub fn rotated(&self, rotation: &Rotation3<f64>) -> Self {
        Self {
            i: Unit::new_normalize(rotation * self.i.into_inner()),
            j: Unit::new_normalize(rotation * self.j.into_inner()),
            k: Unit::new_normalize(rotation * self.k.into_inner()),
        }
    }

    /// Rotate about an axis given in parent coordinates.
    pub fn rotate_about_world_axis(&self, axis: &Vector, angle: f64) -> Result<Self> {
        Ok(self.rotated(&Rotation3::from_axis_angle(&unit(axis)?, angle)))
    }

    /// Rotate about an axis given in this basis' own coordinates.
    pub fn rotate_about_own_axis(&self, axis: &Vector, angle: f64) -> Result<Self> {
        self.rotate_about_world_axis(&(self.matrix() * axis), angle)
    }

    pub fn rotate_euler(&self, precession: f64, nutation: f64, rotation: f64) -> Self {
        self.rotated(&euler_rotation(precession, nutation, rotation))
    }
}

impl Default for Basis {
    fn default() -> Self {
        Self::identity()
    }
}
