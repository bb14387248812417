//! CPU-side aggregation of what to draw and how it is lit.

use std::rc::Rc;

use cgmath::Matrix4;

use crate::{
    data_structures::{instance::Instance, light::Light},
    render::Drawable,
};

/// Instances in draw order plus the lights of the scene.
///
/// The scene owns no device resources itself. Instances keep the order they
/// were added in, which is the order they are drawn in. Lights are owned by
/// the scene.
#[derive(Debug, Default)]
pub struct Scene {
    instances: Vec<Instance>,
    lights: Vec<Box<dyn Light>>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_instance(&mut self, instance: Instance) {
        self.instances.push(instance);
    }

    pub fn add(&mut self, drawable: Rc<dyn Drawable>, transform: Matrix4<f32>) {
        self.add_instance(Instance::new(drawable, transform));
    }

    /// Adds a light and returns its index in [`lights`](Self::lights).
    pub fn add_light(&mut self, light: impl Light + 'static) -> usize {
        self.lights.push(Box::new(light));
        self.lights.len() - 1
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn lights(&self) -> &[Box<dyn Light>] {
        &self.lights
    }

    pub fn lights_mut(&mut self) -> &mut [Box<dyn Light>] {
        &mut self.lights
    }

    /// Number of instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn clear(&mut self) {
        self.instances.clear();
        self.lights.clear();
    }
}
