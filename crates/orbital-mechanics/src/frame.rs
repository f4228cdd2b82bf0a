//! Reference Frame Hierarchy
//!
//! Frames live in an arena and point at their parent by index. A frame's
//! offset, velocity and basis are expressed in its parent's coordinates; a
//! frame without a parent is expressed in the absolute inertial frame.

use nalgebra::Rotation3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::linalg::{invert, unit, Basis, Matrix, Vector};
use crate::{OrbitalError, Result};

/// Index of a frame inside a [`FrameTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameId(pub(crate) usize);

impl FrameId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub name: String,
    pub offset: Vector,
    pub velocity: Vector,
    pub basis: Basis,
    parent: Option<FrameId>,
}

impl Frame {
    pub fn parent(&self) -> Option<FrameId> {
        self.parent
    }

    fn to_parent(&self, point: &Vector) -> Vector {
        self.basis.matrix() * point + self.offset
    }

    fn from_parent(&self, point: &Vector) -> Result<Vector> {
        Ok(invert(&self.basis.matrix())? * (point - self.offset))
    }
}

#[derive(Debug, Clone, Default)]
pub struct FrameTree {
    frames: Vec<Frame>,
}

impl FrameTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Add a frame. Without a parent it hangs off the absolute frame.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        parent: Option<FrameId>,
        offset: Vector,
        basis: Basis,
    ) -> Result<FrameId> {
        if let Some(parent) = parent {
            self.get(parent)?;
        }
        let id = FrameId(self.frames.len());
        self.frames.push(Frame {
            name: name.into(),
            offset,
            velocity: Vector::zeros(),
            basis,
            parent,
        });
        Ok(id)
    }

    pub fn get(&self, id: FrameId) -> Result<&Frame> {
        self.frames.get(id.0).ok_or(OrbitalError::FrameNotFound(id.0))
    }

    pub fn get_mut(&mut self, id: FrameId) -> Result<&mut Frame> {
        self.frames.get_mut(id.0).ok_or(OrbitalError::FrameNotFound(id.0))
    }

    /// Re-parent a frame. Rejects a parent that would close a cycle.
    pub fn set_parent(&mut self, id: FrameId, parent: Option<FrameId>) -> Result<()> {
        self.get(id)?;
        if let Some(parent) = parent {
            if self.chain(parent)?.contains(&id) {
                return Err(OrbitalError::CyclicFrameChain(id.0));
            }
        }
        self.get_mut(id)?.parent = parent;
        Ok(())
    }

    /// Frame ids from `id` up to its top-most ancestor.
    fn chain(&self, id: FrameId) -> Result<Vec<FrameId>> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(frame_id) = current {
            if chain.len() > self.frames.len() {
                return Err(OrbitalError::CyclicFrameChain(id.0));
            }
            current = self.get(frame_id)?.parent;
            chain.push(frame_id);
        }
        Ok(chain)
    }

    /// Express a point given in `id`'s coordinates in the absolute frame.
    pub fn to_root(&self, id: FrameId, point: &Vector) -> Result<Vector> {
        let mut p = *point;
        for frame_id in self.chain(id)? {
            p = self.frames[frame_id.0].to_parent(&p);
        }
        Ok(p)
    }

    /// Express an absolute point in `id`'s coordinates.
    pub fn from_root(&self, id: FrameId, point: &Vector) -> Result<Vector> {
        let mut p = *point;
        for frame_id in self.chain(id)?.into_iter().rev() {
            p = self.frames[frame_id.0].from_parent(&p)?;
        }
        Ok(p)
    }

    pub fn convert(&self, point: &Vector, from: FrameId, to: FrameId) -> Result<Vector> {
        let absolute = self.to_root(from, point)?;
        self.from_root(to, &absolute)
    }

    /// Rotation taking `id`'s coordinates to absolute coordinates.
    pub fn rotation_to_root(&self, id: FrameId) -> Result<Matrix> {
        let mut m = Matrix::identity();
        for frame_id in self.chain(id)? {
            m = self.frames[frame_id.0].basis.matrix() * m;
        }
        Ok(m)
    }

    /// Absolute position of the frame origin.
    pub fn position(&self, id: FrameId) -> Result<Vector> {
        self.to_root(id, &Vector::zeros())
    }

    /// Absolute velocity of the frame origin. Frame rotation rates are not
    /// modeled, so this is the rotated sum of the chain's linear velocities.
    pub fn velocity(&self, id: FrameId) -> Result<Vector> {
        let chain = self.chain(id)?;
        let mut v = self.frames[id.0].velocity;
        for frame_id in chain.into_iter().skip(1) {
            let frame = &self.frames[frame_id.0];
            v = frame.basis.matrix() * v + frame.velocity;
        }
        Ok(v)
    }

    /// Rotate the frame so its I axis points along `direction`, given in the
    /// parent's coordinates. Auxiliary points (in the same coordinates) move
    /// with the frame.
    pub fn turn_towards(
        &mut self,
        id: FrameId,
        direction: &Vector,
        auxiliary: &mut [Vector],
    ) -> Result<()> {
        let target = unit(direction)?;
        let frame = self.get_mut(id)?;
        let i = frame.basis.i().into_inner();
        let rotation = Rotation3::rotation_between(&i, &target.into_inner())
            .unwrap_or_else(|| Rotation3::from_axis_angle(&frame.basis.j(), PI));

        frame.basis = frame.basis.rotated(&rotation);
        for point in auxiliary.iter_mut() {
            *point = rotation * *point;
        }
        Ok(())
    }

    /// Turn the frame so its I axis points at an absolute target point.
    pub fn point_at(&mut self, id: FrameId, target: &Vector, auxiliary: &mut [Vector]) -> Result<()> {
        let line_of_sight = target - self.position(id)?;
        let direction = match self.get(id)?.parent {
            Some(parent) => invert(&self.rotation_to_root(parent)?)? * line_of_sight,
            None => line_of_sight,
        };
        self.turn_towards(id, &direction, auxiliary)
    }
}
