//! Scene rendering.
//!
//! This module defines the [`Drawable`] capability shared by everything that
//! can issue draw calls, the [`DrawContext`] that carries the bound draw state
//! into a drawable, and the [`Renderer`] that walks a [`Scene`] once per frame.
//!
//! # Frame sequence
//!
//! [`Renderer::render_scene`] goes through these steps:
//!
//! 1. activate the program and set `projection` and `view`
//! 2. bind the renderer's shared vertex layout
//! 3. per instance, in scene order: set `model` to the instance transform and
//!    let the drawable draw itself
//! 4. per light, up to [`RendererConfig::max_point_lights`]: write point light
//!    positions (and colours) to dense slots of `point_light_positions[k]`
//! 5. reset program and layout to neutral
//!
//! A failure to set `projection`, `view` or `model` aborts the frame. Step 5
//! runs on every exit path, aborts included. Every other uniform is best
//! effort: unresolved names are logged once and otherwise ignored.

use cgmath::{Matrix4, SquareMatrix};

use crate::{
    context::Context,
    data_structures::{buffer::GpuBuffer, mesh::Vertex, scene::Scene, texture::Texture},
    device::{BufferId, DrawCall, GraphicsDevice, TextureId, VertexLayoutDesc, VertexLayoutId},
    error::{DeviceError, RenderError, UniformError},
    shader::ShaderProgram,
};

/// Anything that knows how to draw itself with a bound program and layout.
///
/// Implemented by [`Mesh`](crate::data_structures::mesh::Mesh) and
/// [`Model`](crate::data_structures::model::Model). Draws report no failure;
/// uniform problems inside a draw are logged through the context.
pub trait Drawable {
    fn draw(&self, ctx: &mut DrawContext<'_>);
}

/// The draw state bound while a scene is rendered.
///
/// Everything a drawable may rely on is in here instead of in ambient device
/// state: the active program, the shared vertex layout, the transform of the
/// instance being drawn and the buffers and textures bound so far.
pub struct DrawContext<'a> {
    device: &'a dyn GraphicsDevice,
    program: &'a mut ShaderProgram,
    layout: VertexLayoutId,
    transform: Matrix4<f32>,
    vertex_buffer: Option<BufferId>,
    index_buffer: Option<BufferId>,
    texture_units: Vec<Option<TextureId>>,
    draw_calls: usize,
}

impl<'a> DrawContext<'a> {
    pub(crate) fn new(
        device: &'a dyn GraphicsDevice,
        program: &'a mut ShaderProgram,
        layout: VertexLayoutId,
    ) -> Self {
        Self {
            device,
            program,
            layout,
            transform: Matrix4::identity(),
            vertex_buffer: None,
            index_buffer: None,
            texture_units: Vec::new(),
            draw_calls: 0,
        }
    }

    pub fn program(&mut self) -> &mut ShaderProgram {
        self.program
    }

    pub fn layout(&self) -> VertexLayoutId {
        self.layout
    }

    /// World transform of the instance being drawn.
    pub fn transform(&self) -> Matrix4<f32> {
        self.transform
    }

    pub(crate) fn set_transform(&mut self, transform: Matrix4<f32>) {
        self.transform = transform;
    }

    /// Runs a uniform write and logs its failure instead of returning it.
    pub fn set_uniform(&mut self, set: impl FnOnce(&mut ShaderProgram) -> Result<(), UniformError>) {
        if let Err(e) = set(&mut *self.program) {
            self.program.report_unresolved(&e);
        }
    }

    /// Attaches vertex and index data to the shared layout for the next draws.
    pub fn bind_buffers(&mut self, vertex: &GpuBuffer, index: &GpuBuffer) {
        self.vertex_buffer = Some(vertex.id());
        self.index_buffer = Some(index.id());
    }

    pub fn bind_texture(&mut self, unit: u32, texture: &Texture) {
        let unit = unit as usize;
        if self.texture_units.len() <= unit {
            self.texture_units.resize(unit + 1, None);
        }
        self.texture_units[unit] = Some(texture.id());
    }

    /// Unbinds every texture unit and forgets the units texture uniforms were assigned.
    pub fn clear_textures(&mut self) {
        self.texture_units.clear();
        self.program.reset_texture_units();
    }

    /// Issues one indexed triangle draw with the current uniforms and bindings.
    pub fn draw_indexed(&mut self, index_count: u32) {
        let (Some(vertex_buffer), Some(index_buffer)) = (self.vertex_buffer, self.index_buffer)
        else {
            log::warn!("draw without bound buffers skipped");
            return;
        };
        log::trace!(
            "draw {} indices from {} / {} with {}",
            index_count,
            vertex_buffer,
            index_buffer,
            self.program.id()
        );
        self.device.draw_indexed(&DrawCall {
            vertex_buffer,
            index_buffer,
            index_count,
            uniforms: self.program.blocks(),
            textures: self.program.texture_bindings(&self.texture_units),
        });
        self.draw_calls += 1;
    }

    pub fn draw_calls(&self) -> usize {
        self.draw_calls
    }
}

#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Lights past this count are dropped each frame.
    pub max_point_lights: usize,
    pub vertex_layout: VertexLayoutDesc,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_point_lights: 100,
            vertex_layout: Vertex::layout(),
        }
    }
}

/// What a call to [`Renderer::render_scene`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub instances_drawn: usize,
    pub draw_calls: usize,
    pub point_lights_bound: usize,
    pub lights_dropped: usize,
}

/// Resets program and layout to neutral when a frame ends, however it ends.
struct BindingGuard<'a> {
    device: &'a dyn GraphicsDevice,
}

impl<'a> BindingGuard<'a> {
    fn bind(device: &'a dyn GraphicsDevice, program: &ShaderProgram) -> Self {
        device.use_program(Some(program.id()));
        Self { device }
    }
}

impl Drop for BindingGuard<'_> {
    fn drop(&mut self) {
        self.device.bind_vertex_layout(None);
        self.device.use_program(None);
    }
}

/// Owns the shared vertex layout and draws scenes with it.
pub struct Renderer {
    ctx: Context,
    layout: VertexLayoutId,
    config: RendererConfig,
}

impl Renderer {
    pub fn create(ctx: &Context) -> Result<Self, DeviceError> {
        Self::with_config(ctx, RendererConfig::default())
    }

    pub fn with_config(ctx: &Context, config: RendererConfig) -> Result<Self, DeviceError> {
        let layout = ctx.create_vertex_layout(&config.vertex_layout)?;
        log::debug!("created {} (stride {})", layout, config.vertex_layout.stride);
        Ok(Self {
            ctx: ctx.clone(),
            layout,
            config,
        })
    }

    pub fn layout(&self) -> VertexLayoutId {
        self.layout
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Draws every instance of `scene` in order, then binds its lights.
    pub fn render_scene(
        &self,
        scene: &Scene,
        program: &mut ShaderProgram,
        projection: &Matrix4<f32>,
        view: &Matrix4<f32>,
    ) -> Result<FrameStats, RenderError> {
        let device = self.ctx.device();
        let _guard = BindingGuard::bind(device, program);

        program
            .set_mat4("projection", projection)
            .map_err(|source| RenderError::Uniform {
                stage: "projection",
                source,
            })?;
        program
            .set_mat4("view", view)
            .map_err(|source| RenderError::Uniform {
                stage: "view",
                source,
            })?;

        device.bind_vertex_layout(Some(self.layout));

        let mut stats = FrameStats::default();
        let mut draw = DrawContext::new(device, program, self.layout);
        for instance in scene.instances() {
            draw.program()
                .set_mat4("model", &instance.transform)
                .map_err(|source| RenderError::Uniform {
                    stage: "model",
                    source,
                })?;
            draw.set_transform(instance.transform);
            instance.drawable.draw(&mut draw);
            stats.instances_drawn += 1;
        }
        stats.draw_calls = draw.draw_calls();

        let lights = scene.lights();
        let cap = self.config.max_point_lights;
        if lights.len() > cap {
            stats.lights_dropped = lights.len() - cap;
            log::warn!(
                "scene has {} lights, only the first {} are bound",
                lights.len(),
                cap
            );
        }
        let mut k = 0;
        for light in lights.iter().take(cap) {
            let Some(point) = light.as_point() else {
                continue;
            };
            let position = format!("point_light_positions[{k}]");
            let color = format!("point_light_colors[{k}]");
            draw.set_uniform(|program| program.set_vec3(&position, point.position));
            draw.set_uniform(|program| program.set_vec3(&color, point.color));
            k += 1;
        }
        draw.set_uniform(|program| program.set_1i("point_light_count", k as i32));
        stats.point_lights_bound = k;

        Ok(stats)
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        log::debug!("releasing {}", self.layout);
        self.ctx.destroy_vertex_layout(self.layout);
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("layout", &self.layout)
            .field("config", &self.config)
            .finish()
    }
}
