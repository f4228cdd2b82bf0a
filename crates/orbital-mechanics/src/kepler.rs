//! Keplerian propagation
//!
//! An [`Orbit`] holds one element set and answers two questions: where on the
//! orbit the body is at an epoch (`true_anomaly_at`) and when it reaches a
//! given true anomaly (`epoch_at`). Positions and velocities are expressed in
//! the central body's frame.
//!
//! The orbit class is chosen by eccentricity:
//!
//! - `Elliptic`, 0 <= e < 1: Kepler's equation solved by fixed-point iteration
//! - `Parabolic`, e = 1: Barker's equation solved in closed form
//! - `Hyperbolic`, e > 1: hyperbolic Kepler equation, fixed-point iteration

use nalgebra::Rotation3;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

use crate::body::{Body, BodyId};
use crate::ephemeris::{Ephemeris, EphemerisState};
use crate::epoch::Epoch;
use crate::linalg::Vector;
use crate::{OrbitalError, Result};

/// Newtonian constant of gravitation, m³ kg⁻¹ s⁻².
pub const GRAVITATIONAL_CONSTANT: f64 = 6.6743e-11;

/// Fixed number of fixed-point steps for the elliptic and hyperbolic Kepler
/// equations. Not adaptive: cost is bounded and precision degrades as e → 1.
pub const KEPLER_ITERATIONS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrbitClass {
    Elliptic,
    Parabolic,
    Hyperbolic,
}

impl OrbitClass {
    pub fn from_eccentricity(eccentricity: f64) -> Result<Self> {
        if !eccentricity.is_finite() || eccentricity < 0.0 {
            return Err(invalid("eccentricity", eccentricity, "must be finite and non-negative"));
        }
        Ok(if eccentricity < 1.0 {
            OrbitClass::Elliptic
        } else if eccentricity == 1.0 {
            OrbitClass::Parabolic
        } else {
            OrbitClass::Hyperbolic
        })
    }
}

/// Size parameter of an orbit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Size {
    /// Semimajor axis in meters; negative for hyperbolic orbits.
    SemimajorAxis(f64),
    /// Periapsis distance in meters.
    Perifocus(f64),
}

/// Classical element set. Angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Elements {
    pub epoch: Epoch,
    pub eccentricity: f64,
    pub size: Size,
    pub inclination: f64,
    pub ascending_node: f64,
    pub periapsis_argument: f64,
    /// True anomaly at `epoch`.
    pub true_anomaly: f64,
}

#[derive(Debug, Clone)]
pub struct Orbit {
    class: OrbitClass,
    elements: Elements,
    perifocus: f64,
    central: BodyId,
    mu: f64,
}

fn invalid(name: &'static str, value: f64, reason: &'static str) -> OrbitalError {
    OrbitalError::InvalidElement { name, value, reason }
}

/// Wrap an angle into (-π, π].
fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped == -PI {
        PI
    } else {
        wrapped
    }
}

/// Validate an element set and return its class and perifocus distance.
fn check(elements: &Elements) -> Result<(OrbitClass, f64)> {
    let e = elements.eccentricity;
    let class = OrbitClass::from_eccentricity(e)?;

    let perifocus = match (class, elements.size) {
        (OrbitClass::Parabolic, Size::SemimajorAxis(a)) => {
            return Err(invalid("semimajor_axis", a, "parabolic orbits are sized by perifocus"));
        }
        (_, Size::SemimajorAxis(a)) => {
            let q = a * (1.0 - e);
            if !(q.is_finite() && q > 0.0) {
                return Err(invalid("semimajor_axis", a, "sign inconsistent with orbit class"));
            }
            q
        }
        (_, Size::Perifocus(q)) => {
            if !(q.is_finite() && q > 0.0) {
                return Err(invalid("perifocus", q, "must be positive"));
            }
            q
        }
    };

    if !(0.0..=PI).contains(&elements.inclination) {
        return Err(invalid("inclination", elements.inclination, "must lie in [0, π]"));
    }
    if !(0.0..=TAU).contains(&elements.ascending_node) {
        return Err(invalid("ascending_node", elements.ascending_node, "must lie in [0, 2π]"));
    }
    if !(0.0..=TAU).contains(&elements.periapsis_argument) {
        return Err(invalid("periapsis_argument", elements.periapsis_argument, "must lie in [0, 2π]"));
    }

    let nu = elements.true_anomaly;
    let reachable = match class {
        OrbitClass::Elliptic => (-PI..=PI).contains(&nu),
        OrbitClass::Parabolic => nu.abs() < PI,
        OrbitClass::Hyperbolic => nu.abs() <= PI && 1.0 + e * nu.cos() > 0.0,
    };
    if !reachable {
        return Err(invalid("true_anomaly", nu, "outside the range valid for the orbit class"));
    }

    Ok((class, perifocus))
}

impl Orbit {
    /// Build an orbit around `central`, which must carry a mass.
    pub fn new(elements: Elements, central: &Body) -> Result<Self> {
        let mass = central
            .mass()
            .ok_or_else(|| OrbitalError::MissingMass(central.name().to_string()))?;
        let (class, perifocus) = check(&elements)?;
        Ok(Self {
            class,
            elements,
            perifocus,
            central: central.id(),
            mu: GRAVITATIONAL_CONSTANT * mass,
        })
    }

    pub fn class(&self) -> OrbitClass {
        self.class
    }

    pub fn elements(&self) -> &Elements {
        &self.elements
    }

    pub fn central(&self) -> BodyId {
        self.central
    }

    /// Gravitational parameter μ = G·M of the central body.
    pub fn gravitational_parameter(&self) -> f64 {
        self.mu
    }

    pub fn eccentricity(&self) -> f64 {
        self.elements.eccentricity
    }

    pub fn perifocus(&self) -> f64 {
        self.perifocus
    }

    /// `None` for parabolic orbits.
    pub fn semimajor_axis(&self) -> Option<f64> {
        match self.class {
            OrbitClass::Parabolic => None,
            _ => Some(self.perifocus / (1.0 - self.elements.eccentricity)),
        }
    }

    pub fn semi_latus_rectum(&self) -> f64 {
        self.perifocus * (1.0 + self.elements.eccentricity)
    }

    /// Mean motion in rad/s.
    pub fn mean_motion(&self) -> f64 {
        let q = self.perifocus;
        match self.semimajor_axis() {
            Some(a) => (self.mu / a.abs().powi(3)).sqrt(),
            None => (self.mu / (2.0 * q.powi(3))).sqrt(),
        }
    }

    /// Orbital period in seconds, elliptic orbits only.
    pub fn period(&self) -> Option<f64> {
        match self.class {
            OrbitClass::Elliptic => Some(TAU / self.mean_motion()),
            _ => None,
        }
    }

    /// Replace the true anomaly at the element epoch.
    pub fn set_true_anomaly(&mut self, true_anomaly: f64) -> Result<()> {
        self.update(|el| el.true_anomaly = true_anomaly)
    }

    /// Change eccentricity within the current orbit class. The perifocus
    /// distance is held fixed.
    pub fn set_eccentricity(&mut self, eccentricity: f64) -> Result<()> {
        if OrbitClass::from_eccentricity(eccentricity)? != self.class {
            return Err(invalid("eccentricity", eccentricity, "would change the orbit class"));
        }
        let q = self.perifocus;
        self.update(|el| {
            el.eccentricity = eccentricity;
            el.size = Size::Perifocus(q);
        })
    }

    pub fn set_size(&mut self, size: Size) -> Result<()> {
        self.update(|el| el.size = size)
    }

    /// Move the element epoch, carrying the true anomaly along the orbit.
    pub fn advance_to(&mut self, epoch: Epoch) -> Result<()> {
        let true_anomaly = self.true_anomaly_at(epoch)?;
        self.update(|el| {
            el.epoch = epoch;
            el.true_anomaly = true_anomaly;
        })
    }

    fn update(&mut self, change: impl FnOnce(&mut Elements)) -> Result<()> {
        let mut elements = self.elements;
        change(&mut elements);
        let (class, perifocus) = check(&elements)?;
        self.class = class;
        self.elements = elements;
        self.perifocus = perifocus;
        Ok(())
    }

    /// True anomaly at `epoch`, wrapped into (-π, π].
    pub fn true_anomaly_at(&self, epoch: Epoch) -> Result<f64> {
        let e = self.elements.eccentricity;
        let nu0 = self.elements.true_anomaly;
        let dt = epoch.seconds_since(self.elements.epoch);
        let n = self.mean_motion();

        match self.class {
            OrbitClass::Elliptic => {
                let mean = elliptic::mean_anomaly(e, nu0) + n * dt;
                Ok(elliptic::true_anomaly(e, mean))
            }
            OrbitClass::Hyperbolic => {
                let mean = hyperbolic::mean_anomaly(e, nu0)? + n * dt;
                Ok(hyperbolic::true_anomaly(e, mean))
            }
            OrbitClass::Parabolic => {
                // measured from periapsis passage
                let passage = self.epoch_at(0.0)?;
                parabolic::true_anomaly(n * epoch.seconds_since(passage))
            }
        }
    }

    /// Epoch at which the body reaches `true_anomaly`. Elliptic orbits
    /// return the first passage at or after the element epoch.
    pub fn epoch_at(&self, true_anomaly: f64) -> Result<Epoch> {
        let e = self.elements.eccentricity;
        let nu0 = self.elements.true_anomaly;
        let n = self.mean_motion();

        let dt = match self.class {
            OrbitClass::Elliptic => {
                let nu = wrap_angle(true_anomaly);
                let mut dt = (elliptic::mean_anomaly(e, nu) - elliptic::mean_anomaly(e, nu0)) / n;
                if dt < 0.0 {
                    dt += TAU / n;
                }
                dt
            }
            OrbitClass::Hyperbolic => {
                (hyperbolic::mean_anomaly(e, true_anomaly)? - hyperbolic::mean_anomaly(e, nu0)?) / n
            }
            OrbitClass::Parabolic => {
                (parabolic::mean_anomaly(true_anomaly)? - parabolic::mean_anomaly(nu0)?) / n
            }
        };
        Ok(self.elements.epoch.add_seconds(dt))
    }

    /// Orbital radius at a true anomaly.
    pub fn radius_at(&self, true_anomaly: f64) -> f64 {
        self.semi_latus_rectum() / (1.0 + self.elements.eccentricity * true_anomaly.cos())
    }

    pub fn radius(&self, epoch: Epoch) -> Result<f64> {
        Ok(self.radius_at(self.true_anomaly_at(epoch)?))
    }

    /// Perifocal to central-frame rotation: argument of periapsis about Z,
    /// inclination about X, then ascending node about Z.
    fn perifocal_rotation(&self) -> Rotation3<f64> {
        Rotation3::from_axis_angle(&Vector::z_axis(), self.elements.ascending_node)
            * Rotation3::from_axis_angle(&Vector::x_axis(), self.elements.inclination)
            * Rotation3::from_axis_angle(&Vector::z_axis(), self.elements.periapsis_argument)
    }

    pub fn position_at(&self, true_anomaly: f64) -> Vector {
        let r = self.radius_at(true_anomaly);
        self.perifocal_rotation() * Vector::new(r * true_anomaly.cos(), r * true_anomaly.sin(), 0.0)
    }

    pub fn velocity_at(&self, true_anomaly: f64) -> Vector {
        let e = self.elements.eccentricity;
        let scale = (self.mu / self.semi_latus_rectum()).sqrt();
        self.perifocal_rotation()
            * Vector::new(-scale * true_anomaly.sin(), scale * (e + true_anomaly.cos()), 0.0)
    }

    pub fn position(&self, epoch: Epoch) -> Result<Vector> {
        Ok(self.position_at(self.true_anomaly_at(epoch)?))
    }

    pub fn velocity(&self, epoch: Epoch) -> Result<Vector> {
        Ok(self.velocity_at(self.true_anomaly_at(epoch)?))
    }

    /// Vis-viva speed at `epoch`.
    pub fn speed(&self, epoch: Epoch) -> Result<f64> {
        let r = self.radius(epoch)?;
        Ok(match self.semimajor_axis() {
            Some(a) => (self.mu * (2.0 / r - 1.0 / a)).sqrt(),
            None => (2.0 * self.mu / r).sqrt(),
        })
    }
}

impl Ephemeris for Orbit {
    fn state_at(&self, epoch: Epoch) -> Result<EphemerisState> {
        let nu = self.true_anomaly_at(epoch)?;
        Ok(EphemerisState {
            position: self.position_at(nu),
            velocity: self.velocity_at(nu),
            basis: None,
        })
    }
}

mod elliptic {
    use super::*;

    pub fn eccentric_anomaly(e: f64, nu: f64) -> f64 {
        if e == 0.0 {
            return nu;
        }
        let half = nu / 2.0;
        2.0 * ((1.0 - e).sqrt() * half.sin()).atan2((1.0 + e).sqrt() * half.cos())
    }

    pub fn mean_anomaly(e: f64, nu: f64) -> f64 {
        let ea = eccentric_anomaly(e, nu);
        ea - e * ea.sin()
    }

    pub fn true_anomaly(e: f64, mean: f64) -> f64 {
        let mean = wrap_angle(mean);
        let mut ea = mean;
        for _ in 0..KEPLER_ITERATIONS {
            ea = e * ea.sin() + mean;
        }
        // half-angle identity; the sign follows sin(E/2), i.e. sin E on (-π, π]
        let half = ea / 2.0;
        2.0 * ((1.0 + e).sqrt() * half.sin()).atan2((1.0 - e).sqrt() * half.cos())
    }
}

mod hyperbolic {
    use super::*;

    fn check_branch(e: f64, nu: f64) -> Result<()> {
        if nu.abs() >= PI || 1.0 + e * nu.cos() <= 0.0 {
            return Err(OrbitalError::UnreachableAnomaly(nu));
        }
        Ok(())
    }

    pub fn mean_anomaly(e: f64, nu: f64) -> Result<f64> {
        check_branch(e, nu)?;
        let h = 2.0 * ((nu / 2.0).tan() * ((e - 1.0) / (e + 1.0)).sqrt()).atanh();
        if !h.is_finite() {
            return Err(OrbitalError::UnreachableAnomaly(nu));
        }
        Ok(e * h.sinh() - h)
    }

    pub fn true_anomaly(e: f64, mean: f64) -> f64 {
        let mut h = mean;
        for _ in 0..KEPLER_ITERATIONS {
            h = ((h + mean) / e).asinh();
        }
        2.0 * ((h / 2.0).tanh() * ((e + 1.0) / (e - 1.0)).sqrt()).atan()
    }
}

mod parabolic {
    use super::*;

    /// Barker's mean anomaly D + D³/3 with D = tan(ν/2).
    pub fn mean_anomaly(nu: f64) -> Result<f64> {
        if !(nu.abs() < PI) {
            return Err(OrbitalError::UnreachableAnomaly(nu));
        }
        let d = (nu / 2.0).tan();
        Ok(d + d.powi(3) / 3.0)
    }

    /// Cardano solution of D³ + 3D - 3M = 0. Solved on |M| and mirrored to
    /// avoid cancellation for negative M.
    pub fn true_anomaly(mean: f64) -> Result<f64> {
        let m = mean.abs();
        let x = 0.5 * (12.0 * m + 4.0 * (9.0 * m * m + 4.0).sqrt()).cbrt();
        let d = (x - 1.0 / x).copysign(mean);
        let nu = 2.0 * d.atan();
        if !nu.is_finite() || nu.abs() >= PI {
            return Err(OrbitalError::UnreachableAnomaly(nu));
        }
        Ok(nu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodySpec;
    use crate::World;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use std::f64::consts::FRAC_PI_2;

    const EARTH_MASS: f64 = 5.9722e24;

    fn earth() -> Body {
        let mut world = World::new(Epoch::j2000());
        let id = world.add_body(BodySpec::new("Earth").mass(EARTH_MASS)).unwrap();
        world.body(id).unwrap().clone()
    }

    fn elements(e: f64, size: Size, nu: f64) -> Elements {
        Elements {
            epoch: Epoch::j2000(),
            eccentricity: e,
            size,
            inclination: 0.4,
            ascending_node: 1.2,
            periapsis_argument: 2.5,
            true_anomaly: nu,
        }
    }

    fn angle_diff(a: f64, b: f64) -> f64 {
        wrap_angle(a - b).abs()
    }

    #[test]
    fn test_class_from_eccentricity() {
        assert_eq!(OrbitClass::from_eccentricity(0.0).unwrap(), OrbitClass::Elliptic);
        assert_eq!(OrbitClass::from_eccentricity(1.0).unwrap(), OrbitClass::Parabolic);
        assert_eq!(OrbitClass::from_eccentricity(1.2).unwrap(), OrbitClass::Hyperbolic);
        assert!(OrbitClass::from_eccentricity(-0.1).is_err());
        assert!(OrbitClass::from_eccentricity(f64::NAN).is_err());
    }

    #[test]
    fn test_invalid_elements_rejected() {
        let body = earth();
        let bad = [
            elements(0.5, Size::SemimajorAxis(-7.0e6), 0.0),
            elements(1.5, Size::SemimajorAxis(7.0e6), 0.0),
            elements(1.0, Size::SemimajorAxis(7.0e6), 0.0),
            elements(0.5, Size::Perifocus(0.0), 0.0),
            elements(1.0, Size::Perifocus(7.0e6), PI),
            elements(2.0, Size::SemimajorAxis(-7.0e6), 2.5),
            elements(0.1, Size::SemimajorAxis(7.0e6), 3.5),
            Elements { inclination: 3.5, ..elements(0.1, Size::SemimajorAxis(7.0e6), 0.0) },
            Elements { ascending_node: -0.1, ..elements(0.1, Size::SemimajorAxis(7.0e6), 0.0) },
            Elements { periapsis_argument: 6.5, ..elements(0.1, Size::SemimajorAxis(7.0e6), 0.0) },
        ];
        for el in bad {
            assert!(
                matches!(Orbit::new(el, &body), Err(OrbitalError::InvalidElement { .. })),
                "accepted {el:?}"
            );
        }
    }

    #[test]
    fn test_central_body_needs_mass() {
        let mut world = World::new(Epoch::j2000());
        let id = world.add_body(BodySpec::new("Probe")).unwrap();
        let probe = world.body(id).unwrap();
        assert!(matches!(
            Orbit::new(elements(0.1, Size::SemimajorAxis(7.0e6), 0.0), probe),
            Err(OrbitalError::MissingMass(_))
        ));
    }

    #[test]
    fn test_geostationary_period() {
        let orbit = Orbit::new(elements(0.0, Size::SemimajorAxis(42_164_170.0), 0.0), &earth()).unwrap();
        assert_relative_eq!(orbit.period().unwrap(), 86_164.1, epsilon = 1.0);
    }

    #[test]
    fn test_perifocus_sizing_matches_semimajor_axis() {
        let body = earth();
        let by_axis = Orbit::new(elements(0.3, Size::SemimajorAxis(1.0e7), 0.7), &body).unwrap();
        let by_q = Orbit::new(elements(0.3, Size::Perifocus(7.0e6), 0.7), &body).unwrap();
        assert_relative_eq!(by_q.semimajor_axis().unwrap(), 1.0e7, epsilon = 1e-6);
        assert_relative_eq!(by_axis.position_at(0.7), by_q.position_at(0.7), epsilon = 1e-6);
    }

    #[test]
    fn test_rotation_order() {
        let el = Elements {
            inclination: FRAC_PI_2,
            ascending_node: FRAC_PI_2,
            periapsis_argument: 0.0,
            ..elements(0.0, Size::SemimajorAxis(1.0e7), 0.0)
        };
        let orbit = Orbit::new(el, &earth()).unwrap();
        // periapsis lies on the node line, rotated to +Y
        assert_relative_eq!(orbit.position_at(0.0), Vector::new(0.0, 1.0e7, 0.0), epsilon = 1e-6);
        // a quarter orbit later the body is over the pole
        assert_relative_eq!(orbit.position_at(FRAC_PI_2), Vector::new(0.0, 0.0, 1.0e7), epsilon = 1e-6);
    }

    #[test]
    fn test_elliptic_inverse_law() {
        let body = earth();
        for (e, tol) in [(0.0, 1e-9), (0.3, 1e-9), (0.9, 1e-3)] {
            let orbit = Orbit::new(elements(e, Size::SemimajorAxis(2.0e7), -0.4), &body).unwrap();
            for k in 1..=40 {
                let nu = -PI + TAU * k as f64 / 40.0;
                let epoch = orbit.epoch_at(nu).unwrap();
                let back = orbit.true_anomaly_at(epoch).unwrap();
                assert!(angle_diff(back, nu) < tol, "e = {e}, nu = {nu}, back = {back}");
            }
        }
    }

    #[test]
    fn test_elliptic_epoch_wraps_forward() {
        let orbit = Orbit::new(elements(0.2, Size::SemimajorAxis(2.0e7), 1.0), &earth()).unwrap();
        let epoch = orbit.epoch_at(0.5).unwrap();
        let dt = epoch.seconds_since(Epoch::j2000());
        assert!(dt > 0.0 && dt < orbit.period().unwrap());
    }

    #[test]
    fn test_hyperbolic_inverse_law() {
        let body = earth();
        for e in [1.5, 3.0] {
            let orbit = Orbit::new(elements(e, Size::SemimajorAxis(-1.0e7), 0.2), &body).unwrap();
            let limit = (-1.0 / e).acos() - 0.05;
            for k in 0..=20 {
                let nu = -limit + 2.0 * limit * k as f64 / 20.0;
                let epoch = orbit.epoch_at(nu).unwrap();
                let back = orbit.true_anomaly_at(epoch).unwrap();
                assert_relative_eq!(back, nu, epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn test_hyperbolic_unreachable_anomaly() {
        let orbit = Orbit::new(elements(2.0, Size::SemimajorAxis(-1.0e7), 0.0), &earth()).unwrap();
        // asymptote at acos(-1/2) = 2π/3
        assert!(matches!(orbit.epoch_at(2.2), Err(OrbitalError::UnreachableAnomaly(_))));
        assert!(orbit.epoch_at(2.0).is_ok());
    }

    #[test]
    fn test_parabolic_periapsis_passage() {
        let body = earth();
        let at_periapsis = Orbit::new(elements(1.0, Size::Perifocus(7.0e6), 0.0), &body).unwrap();
        assert_eq!(at_periapsis.epoch_at(0.0).unwrap(), Epoch::j2000());

        let inbound = Orbit::new(elements(1.0, Size::Perifocus(7.0e6), -1.0), &body).unwrap();
        let passage = inbound.epoch_at(0.0).unwrap();
        assert!(passage > Epoch::j2000());
        assert!(inbound.true_anomaly_at(passage).unwrap().abs() < 1e-9);
    }

    #[test]
    fn test_parabolic_monotonic_near_periapsis() {
        let orbit = Orbit::new(elements(1.0, Size::Perifocus(7.0e6), -0.5), &earth()).unwrap();
        let passage = orbit.epoch_at(0.0).unwrap();
        let mut previous = f64::NEG_INFINITY;
        for k in -60..=60 {
            let nu = orbit.true_anomaly_at(passage.add_seconds(k as f64 * 60.0)).unwrap();
            assert!(nu > previous);
            previous = nu;
        }
    }

    #[test]
    fn test_parabolic_inverse_law_and_asymptote() {
        let orbit = Orbit::new(elements(1.0, Size::Perifocus(7.0e6), 0.3), &earth()).unwrap();
        for nu in [-2.5, -1.0, 0.0, 0.3, 1.7, 3.0] {
            let back = orbit.true_anomaly_at(orbit.epoch_at(nu).unwrap()).unwrap();
            assert_relative_eq!(back, nu, epsilon = 1e-9);
        }
        assert!(matches!(orbit.epoch_at(PI), Err(OrbitalError::UnreachableAnomaly(_))));
    }

    #[test]
    fn test_velocity_matches_vis_viva() {
        let body = earth();
        let orbits = [
            Orbit::new(elements(0.4, Size::SemimajorAxis(2.0e7), 0.0), &body).unwrap(),
            Orbit::new(elements(1.0, Size::Perifocus(7.0e6), 0.0), &body).unwrap(),
            Orbit::new(elements(1.8, Size::SemimajorAxis(-1.0e7), 0.0), &body).unwrap(),
        ];
        let epoch = Epoch::j2000().add_seconds(1_800.0);
        for orbit in orbits {
            let v = orbit.velocity(epoch).unwrap();
            assert_relative_eq!(v.norm(), orbit.speed(epoch).unwrap(), max_relative = 1e-9);
        }
    }

    #[test]
    fn test_mutators_revalidate() {
        let mut orbit = Orbit::new(elements(0.3, Size::SemimajorAxis(2.0e7), 0.0), &earth()).unwrap();
        assert!(orbit.set_eccentricity(1.2).is_err());
        assert!(orbit.set_true_anomaly(4.0).is_err());
        assert!(orbit.set_size(Size::SemimajorAxis(-1.0)).is_err());
        assert_eq!(orbit.eccentricity(), 0.3);

        orbit.set_eccentricity(0.5).unwrap();
        assert_relative_eq!(orbit.perifocus(), 1.4e7, epsilon = 1e-6);
        orbit.set_true_anomaly(-2.0).unwrap();
        assert_eq!(orbit.elements().true_anomaly, -2.0);
    }

    #[test]
    fn test_advance_to_preserves_trajectory() {
        let mut orbit = Orbit::new(elements(0.3, Size::SemimajorAxis(2.0e7), 0.1), &earth()).unwrap();
        let later = Epoch::j2000().add_seconds(5_000.0);
        let expected = orbit.position(later.add_seconds(300.0)).unwrap();
        orbit.advance_to(later).unwrap();
        assert_relative_eq!(orbit.position(later.add_seconds(300.0)).unwrap(), expected, epsilon = 1e-3);
    }

    proptest! {
        #[test]
        fn prop_elliptic_inverse_law(e in 0.0f64..0.6, nu in -3.1f64..3.1, nu0 in -3.1f64..3.1) {
            let orbit = Orbit::new(elements(e, Size::SemimajorAxis(3.0e7), nu0), &earth()).unwrap();
            let back = orbit.true_anomaly_at(orbit.epoch_at(nu).unwrap()).unwrap();
            prop_assert!(angle_diff(back, nu) < 1e-7);
        }
    }
}
