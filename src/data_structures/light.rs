//! Light sources. Lights are not drawable; the renderer turns them into uniforms.

use std::fmt::Debug;

use cgmath::Vector3;

/// Something that emits light into the scene.
///
/// The renderer only knows how to bind point lights; other kinds are skipped
/// when [`as_point`](Light::as_point) returns `None`.
pub trait Light: Debug {
    fn color(&self) -> Vector3<f32>;

    fn as_point(&self) -> Option<&PointLight> {
        None
    }

    fn as_point_mut(&mut self) -> Option<&mut PointLight> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vector3<f32>,
    pub color: Vector3<f32>,
}

impl PointLight {
    pub fn new(position: Vector3<f32>, color: Vector3<f32>) -> Self {
        Self { position, color }
    }

    pub fn white(position: Vector3<f32>) -> Self {
        Self::new(position, Vector3::new(1.0, 1.0, 1.0))
    }
}

impl Light for PointLight {
    fn color(&self) -> Vector3<f32> {
        self.color
    }

    fn as_point(&self) -> Option<&PointLight> {
        Some(self)
    }

    fn as_point_mut(&mut self) -> Option<&mut PointLight> {
        Some(self)
    }
}
