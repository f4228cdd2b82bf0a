//! Sensor fields of view
//!
//! A view is expressed in the owning antenna's frame with the boresight on
//! the +I axis. Points are tested after conversion into that frame.

use orbital_mechanics::linalg::angle_between;
use orbital_mechanics::Vector;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

use crate::{NetworkError, Result};

/// Slack on angular bounds so points placed exactly on the boundary stay
/// inside despite rounding.
pub const ANGLE_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ViewShape {
    /// Circular cone around the boresight.
    Conic { half_angle: f64 },
    /// Rectangular pyramid; each half-angle bounds one lateral axis.
    Pyramidal { half_angle_y: f64, half_angle_z: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawView", into = "RawView")]
pub struct View {
    max_range: f64,
    shape: ViewShape,
}

#[derive(Serialize, Deserialize)]
struct RawView {
    max_range: f64,
    #[serde(flatten)]
    shape: ViewShape,
}

impl TryFrom<RawView> for View {
    type Error = NetworkError;

    fn try_from(raw: RawView) -> Result<Self> {
        View::new(raw.max_range, raw.shape)
    }
}

impl From<View> for RawView {
    fn from(view: View) -> Self {
        RawView {
            max_range: view.max_range,
            shape: view.shape,
        }
    }
}

impl View {
    pub fn new(max_range: f64, shape: ViewShape) -> Result<Self> {
        if !(max_range.is_finite() && max_range > 0.0) {
            return Err(NetworkError::InvalidView(format!("range must be positive, got {max_range}")));
        }
        match shape {
            ViewShape::Conic { half_angle } => check_half_angle("half_angle", half_angle)?,
            ViewShape::Pyramidal {
                half_angle_y,
                half_angle_z,
            } => {
                check_half_angle("half_angle_y", half_angle_y)?;
                check_half_angle("half_angle_z", half_angle_z)?;
            }
        }
        Ok(Self { max_range, shape })
    }

    pub fn conic(max_range: f64, half_angle: f64) -> Result<Self> {
        Self::new(max_range, ViewShape::Conic { half_angle })
    }

    pub fn pyramidal(max_range: f64, half_angle_y: f64, half_angle_z: f64) -> Result<Self> {
        Self::new(
            max_range,
            ViewShape::Pyramidal {
                half_angle_y,
                half_angle_z,
            },
        )
    }

    pub fn max_range(&self) -> f64 {
        self.max_range
    }

    pub fn shape(&self) -> ViewShape {
        self.shape
    }

    /// Range check shared by the view and the carrier rule; the maximum
    /// range itself is inside.
    pub fn within_range(&self, range: f64) -> bool {
        range <= self.max_range
    }

    /// Whether a point given in the antenna frame lies inside the view.
    pub fn contains(&self, point: &Vector) -> bool {
        let range = point.norm();
        if !self.within_range(range) {
            return false;
        }
        if range == 0.0 {
            return true;
        }
        match self.shape {
            ViewShape::Conic { half_angle } => {
                angle_between(point, &Vector::x()) <= half_angle + ANGLE_TOLERANCE
            }
            ViewShape::Pyramidal {
                half_angle_y,
                half_angle_z,
            } => {
                point.y.abs().atan2(point.x) <= half_angle_y + ANGLE_TOLERANCE
                    && point.z.abs().atan2(point.x) <= half_angle_z + ANGLE_TOLERANCE
            }
        }
    }
}

fn check_half_angle(name: &str, angle: f64) -> Result<()> {
    if angle > 0.0 && angle <= FRAC_PI_2 {
        Ok(())
    } else {
        Err(NetworkError::InvalidView(format!("{name} must be in (0, π/2], got {angle}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn on_cone(range: f64, angle: f64) -> Vector {
        Vector::new(range * angle.cos(), range * angle.sin(), 0.0)
    }

    #[test]
    fn test_conic_boundary() {
        let view = View::conic(1_000.0, 0.3).unwrap();
        assert!(view.contains(&on_cone(100.0, 0.3)));
        assert!(view.contains(&on_cone(100.0, 0.3 - 1e-6)));
        assert!(!view.contains(&on_cone(100.0, 0.3 + 1e-6)));
    }

    #[test]
    fn test_conic_is_single_sided() {
        let view = View::conic(1_000.0, 0.3).unwrap();
        assert!(view.contains(&Vector::new(100.0, 0.0, 0.0)));
        assert!(!view.contains(&Vector::new(-100.0, 0.0, 0.0)));
    }

    #[test]
    fn test_range_limit() {
        let view = View::conic(1_000.0, 0.3).unwrap();
        assert!(view.contains(&Vector::new(1_000.0, 0.0, 0.0)));
        assert!(!view.contains(&Vector::new(1_000.001, 0.0, 0.0)));
        assert!(view.contains(&Vector::zeros()));
    }

    #[test]
    fn test_pyramidal_axes_are_independent() {
        let view = View::pyramidal(1_000.0, 0.2, 0.5).unwrap();
        // 0.3 rad off-axis fits the wide Z bound but not the narrow Y bound
        let along_z = Vector::new(100.0 * 0.3_f64.cos(), 0.0, 100.0 * 0.3_f64.sin());
        let along_y = Vector::new(100.0 * 0.3_f64.cos(), 100.0 * 0.3_f64.sin(), 0.0);
        assert!(view.contains(&along_z));
        assert!(!view.contains(&along_y));
        // corners: both lateral bounds at once
        let corner = Vector::new(100.0, 100.0 * 0.19_f64.tan(), 100.0 * 0.49_f64.tan());
        assert!(view.contains(&corner));
        assert!(!view.contains(&Vector::new(-100.0, 0.0, 0.0)));
    }

    #[test]
    fn test_invalid_views_rejected() {
        assert!(View::conic(0.0, 0.3).is_err());
        assert!(View::conic(-5.0, 0.3).is_err());
        assert!(View::conic(f64::INFINITY, 0.3).is_err());
        assert!(View::conic(10.0, 0.0).is_err());
        assert!(View::conic(10.0, FRAC_PI_2 + 0.01).is_err());
        assert!(View::conic(10.0, FRAC_PI_2).is_ok());
        assert!(View::pyramidal(10.0, 0.1, 2.0).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let view: View =
            serde_json::from_str(r#"{"max_range": 5e8, "shape": "conic", "half_angle": 0.5}"#).unwrap();
        assert_eq!(view, View::conic(5e8, 0.5).unwrap());
        assert!(serde_json::from_str::<View>(r#"{"max_range": -1, "shape": "conic", "half_angle": 0.5}"#).is_err());
    }

    proptest! {
        #[test]
        fn prop_hemisphere_contains_forward_points(
            x in 0.1f64..100.0,
            y in -100.0f64..100.0,
            z in -100.0f64..100.0,
        ) {
            let view = View::conic(1_000.0, FRAC_PI_2).unwrap();
            prop_assert!(view.contains(&Vector::new(x, y, z)));
            prop_assert!(!view.contains(&Vector::new(-x, y, z)));
        }
    }
}
