//! Multi-mesh models loaded from files.

use std::{cell::Cell, path::Path};

use cgmath::{Matrix4, SquareMatrix};

use crate::{
    context::Context,
    data_structures::mesh::Mesh,
    error::ResourceError,
    render::{DrawContext, Drawable},
    resources::ModelLoader,
};

/// An ordered list of meshes plus a transform applied on top of the instance's.
///
/// A model whose file contained nothing loadable is still a valid model; it
/// simply draws nothing.
#[derive(Debug)]
pub struct Model {
    meshes: Vec<Mesh>,
    local_transform: Cell<Matrix4<f32>>,
}

impl Model {
    /// Loads a model file with the default importers, see [`ModelLoader`].
    pub fn create(ctx: &Context, path: impl AsRef<Path>) -> Result<Self, ResourceError> {
        ModelLoader::default().load(ctx, path)
    }

    pub fn from_meshes(meshes: Vec<Mesh>) -> Self {
        Self {
            meshes,
            local_transform: Cell::new(Matrix4::identity()),
        }
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn local_transform(&self) -> Matrix4<f32> {
        self.local_transform.get()
    }

    pub fn set_local_transform(&self, transform: Matrix4<f32>) {
        self.local_transform.set(transform);
    }
}

impl Drawable for Model {
    fn draw(&self, ctx: &mut DrawContext<'_>) {
        let model = ctx.transform() * self.local_transform.get();
        ctx.set_uniform(|program| program.set_mat4("model", &model));
        for mesh in &self.meshes {
            mesh.draw(ctx);
        }
    }
}
