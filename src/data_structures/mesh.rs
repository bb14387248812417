//! Indexed triangle geometry with its material.

use std::{
    cell::{Ref, RefCell, RefMut},
    mem,
    rc::Rc,
};

use crate::{
    context::Context,
    data_structures::{buffer::GpuBuffer, material::Material, texture::Texture},
    device::{AttributeFormat, BufferKind, VertexAttributeDesc, VertexLayoutDesc},
    error::ResourceError,
    render::{DrawContext, Drawable},
};

/// One vertex as the device sees it: tightly packed, 32 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }

    /// Attribute 0 is the position, 1 the normal, 2 the uv.
    pub fn layout() -> VertexLayoutDesc {
        VertexLayoutDesc {
            stride: mem::size_of::<Vertex>() as u64,
            attributes: vec![
                VertexAttributeDesc {
                    location: 0,
                    format: AttributeFormat::Float32x3,
                    offset: mem::offset_of!(Vertex, position) as u64,
                },
                VertexAttributeDesc {
                    location: 1,
                    format: AttributeFormat::Float32x3,
                    offset: mem::offset_of!(Vertex, normal) as u64,
                },
                VertexAttributeDesc {
                    location: 2,
                    format: AttributeFormat::Float32x2,
                    offset: mem::offset_of!(Vertex, uv) as u64,
                },
            ],
        }
    }
}

/// A vertex buffer, an index buffer and the material they are drawn with.
///
/// Meshes are usually shared through `Rc` (by instances, or inside a model),
/// so the material sits behind a `RefCell` and can still be edited.
#[derive(Debug)]
pub struct Mesh {
    vertex_buffer: GpuBuffer,
    index_buffer: GpuBuffer,
    index_count: u32,
    material: RefCell<Material>,
}

impl Mesh {
    pub fn create(ctx: &Context, vertices: &[Vertex], indices: &[u32]) -> Result<Self, ResourceError> {
        Self::with_material(ctx, vertices, indices, Material::default())
    }

    pub fn with_textures(
        ctx: &Context,
        vertices: &[Vertex],
        indices: &[u32],
        textures: Vec<Rc<Texture>>,
    ) -> Result<Self, ResourceError> {
        Self::with_material(ctx, vertices, indices, Material::with_textures(textures))
    }

    pub fn with_material(
        ctx: &Context,
        vertices: &[Vertex],
        indices: &[u32],
        material: Material,
    ) -> Result<Self, ResourceError> {
        validate(vertices, indices)?;
        let index_count = u32::try_from(indices.len())
            .map_err(|_| ResourceError::InvalidMesh(format!("{} indices do not fit a draw", indices.len())))?;

        let vertex_buffer = GpuBuffer::from_slice(ctx, BufferKind::Vertex, vertices)?;
        // If this fails the vertex buffer above is dropped, and released, on the way out.
        let index_buffer = GpuBuffer::from_slice(ctx, BufferKind::Index, indices)?;

        Ok(Self {
            vertex_buffer,
            index_buffer,
            index_count,
            material: RefCell::new(material),
        })
    }

    pub fn add_texture(&self, texture: Rc<Texture>) {
        self.material.borrow_mut().textures.push(texture);
    }

    pub fn material(&self) -> Ref<'_, Material> {
        self.material.borrow()
    }

    pub fn material_mut(&self) -> RefMut<'_, Material> {
        self.material.borrow_mut()
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn vertex_buffer(&self) -> &GpuBuffer {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &GpuBuffer {
        &self.index_buffer
    }
}

fn validate(vertices: &[Vertex], indices: &[u32]) -> Result<(), ResourceError> {
    if vertices.is_empty() {
        return Err(ResourceError::InvalidMesh("mesh has no vertices".to_string()));
    }
    if indices.is_empty() {
        return Err(ResourceError::InvalidMesh("mesh has no indices".to_string()));
    }
    if indices.len() % 3 != 0 {
        return Err(ResourceError::InvalidMesh(format!(
            "{} indices do not form whole triangles",
            indices.len()
        )));
    }
    if let Some(index) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
        return Err(ResourceError::InvalidMesh(format!(
            "index {} is out of range for {} vertices",
            index,
            vertices.len()
        )));
    }
    Ok(())
}

impl Drawable for Mesh {
    fn draw(&self, ctx: &mut DrawContext<'_>) {
        ctx.bind_buffers(&self.vertex_buffer, &self.index_buffer);

        let material = self.material.borrow();
        ctx.clear_textures();
        for (unit, (texture, name)) in material
            .textures
            .iter()
            .zip(material.texture_uniforms())
            .enumerate()
        {
            let unit = unit as u32;
            ctx.bind_texture(unit, texture);
            ctx.set_uniform(|program| program.set_1i(&name, unit as i32));
        }

        ctx.set_uniform(|program| program.set_vec3("material.ambient_color", material.ambient_color));
        ctx.set_uniform(|program| program.set_vec3("material.emission_color", material.emission_color));
        ctx.set_uniform(|program| program.set_vec3("material.diffuse_color", material.diffuse_color));
        ctx.set_uniform(|program| program.set_vec3("material.specular_color", material.specular_color));
        ctx.set_uniform(|program| program.set_1f("material.shininess", material.shininess));

        ctx.draw_indexed(self.index_count);
    }
}
