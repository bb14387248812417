//! The graphics device boundary.
//!
//! Everything the engine needs from a GPU goes through [`GraphicsDevice`]:
//! creating and releasing buffers, textures, programs and vertex layouts,
//! switching the globally bound program and layout, and submitting indexed
//! draws. Two implementations ship with the crate:
//!
//! - [`gpu::WgpuDevice`] records the frame's draws and encodes them into a
//!   single wgpu render pass on [`gpu::WgpuDevice::submit_frame`]
//! - [`headless::HeadlessDevice`] talks to no GPU at all and records every
//!   call, which is what the test-suite renders against
//!
//! Handles are plain ids; ownership lives one level up in the resource
//! wrappers (`GpuBuffer`, `Texture`, `ShaderProgram`, `Renderer`) which
//! release them exactly once on drop.

pub mod headless;
pub mod gpu;

use crate::{data_structures::texture::ImageData, error::DeviceError};

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

handle!(
    /// Device buffer (vertex or index data).
    BufferId
);
handle!(
    /// Device image.
    TextureId
);
handle!(
    /// Linked shader program.
    ProgramId
);
handle!(
    /// Vertex-array layout object.
    VertexLayoutId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
}

/// A `@group(g) @binding(b)` slot of a shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingPoint {
    pub group: u32,
    pub binding: u32,
}

impl BindingPoint {
    pub const fn new(group: u32, binding: u32) -> Self {
        Self { group, binding }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeFormat {
    Float32x2,
    Float32x3,
    Float32x4,
}

impl AttributeFormat {
    pub const fn size(self) -> u64 {
        match self {
            AttributeFormat::Float32x2 => 8,
            AttributeFormat::Float32x3 => 12,
            AttributeFormat::Float32x4 => 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttributeDesc {
    pub location: u32,
    pub format: AttributeFormat,
    pub offset: u64,
}

/// How raw vertex bytes map onto shader inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexLayoutDesc {
    pub stride: u64,
    pub attributes: Vec<VertexAttributeDesc>,
}

/// Everything a device needs to build a program whose sources already
/// compiled and linked.
#[derive(Debug, Clone)]
pub struct ProgramSource {
    pub label: String,
    pub vertex_source: String,
    pub vertex_entry: String,
    pub fragment_source: String,
    pub fragment_entry: String,
    /// Sampler globals; devices bind their default sampler to each.
    pub samplers: Vec<BindingPoint>,
}

/// Current bytes of one `var<uniform>` block.
#[derive(Debug, Clone, Copy)]
pub struct UniformBlock<'a> {
    pub binding: BindingPoint,
    pub bytes: &'a [u8],
}

/// A texture global of the program, the unit it samples from and the
/// texture bound to that unit (if any).
#[derive(Debug, Clone, Copy)]
pub struct TextureBinding<'a> {
    pub binding: BindingPoint,
    pub name: &'a str,
    pub unit: u32,
    pub texture: Option<TextureId>,
}

/// One indexed triangle-list draw with the currently bound program and layout.
#[derive(Debug, Clone)]
pub struct DrawCall<'a> {
    pub vertex_buffer: BufferId,
    pub index_buffer: BufferId,
    pub index_count: u32,
    pub uniforms: Vec<UniformBlock<'a>>,
    pub textures: Vec<TextureBinding<'a>>,
}

/// The graphics device/context. All methods take `&self`: a device is used
/// from the single rendering thread and keeps its own interior state.
pub trait GraphicsDevice {
    fn create_buffer(&self, kind: BufferKind, contents: &[u8]) -> Result<BufferId, DeviceError>;
    fn destroy_buffer(&self, id: BufferId);

    fn create_texture(&self, image: &ImageData) -> Result<TextureId, DeviceError>;
    fn destroy_texture(&self, id: TextureId);

    fn create_program(&self, source: &ProgramSource) -> Result<ProgramId, DeviceError>;
    fn destroy_program(&self, id: ProgramId);

    fn create_vertex_layout(&self, layout: &VertexLayoutDesc) -> Result<VertexLayoutId, DeviceError>;
    fn destroy_vertex_layout(&self, id: VertexLayoutId);

    /// Makes `program` the active program; `None` resets to neutral.
    fn use_program(&self, program: Option<ProgramId>);
    /// Makes `layout` the active vertex-array layout; `None` resets to neutral.
    fn bind_vertex_layout(&self, layout: Option<VertexLayoutId>);

    fn draw_indexed(&self, call: &DrawCall<'_>);
}
