//! Placement of a drawable in the world.

use std::{fmt::Debug, rc::Rc};

use cgmath::{Matrix4, Quaternion, SquareMatrix, Vector3};

use crate::render::Drawable;

/// A drawable together with its world transform.
///
/// The same drawable can back any number of instances; its device resources
/// are shared and only the transform differs. The instance transform is the
/// only world placement a drawable gets.
#[derive(Clone)]
pub struct Instance {
    pub drawable: Rc<dyn Drawable>,
    pub transform: Matrix4<f32>,
}

impl Instance {
    pub fn new(drawable: Rc<dyn Drawable>, transform: Matrix4<f32>) -> Self {
        Self {
            drawable,
            transform,
        }
    }

    /// Untransformed, at the origin.
    pub fn identity(drawable: Rc<dyn Drawable>) -> Self {
        Self::new(drawable, Matrix4::identity())
    }

    pub fn at(drawable: Rc<dyn Drawable>, position: Vector3<f32>) -> Self {
        Self::new(drawable, Matrix4::from_translation(position))
    }

    /// Translation, then rotation, then non-uniform scale.
    pub fn from_parts(
        drawable: Rc<dyn Drawable>,
        position: Vector3<f32>,
        rotation: Quaternion<f32>,
        scale: Vector3<f32>,
    ) -> Self {
        let transform = Matrix4::from_translation(position)
            * Matrix4::from(rotation)
            * Matrix4::from_nonuniform_scale(scale.x, scale.y, scale.z);
        Self::new(drawable, transform)
    }
}

impl Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("transform", &self.transform)
            .finish_non_exhaustive()
    }
}
