//! The wgpu backend.
//!
//! wgpu records work into command buffers instead of drawing immediately, so
//! [`WgpuDevice`] collects the draws issued during a frame and encodes them,
//! in issue order, into one depth-tested render pass when the application
//! calls [`WgpuDevice::submit_frame`]. Each draw keeps a snapshot of the
//! uniform values that were current when it was issued; the snapshots of a
//! frame are packed into a single uniform buffer at aligned offsets.

pub mod offscreen;
mod pipeline;
mod texture;

use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
    iter,
    num::NonZeroU64,
};

use wgpu::util::DeviceExt;

use crate::{
    data_structures::texture::ImageData,
    device::{
        BindingPoint, BufferId, BufferKind, DrawCall, GraphicsDevice, ProgramId, ProgramSource,
        TextureId, VertexLayoutDesc, VertexLayoutId,
    },
    error::DeviceError,
};

use self::texture::GpuTexture;

/// Requests an adapter and a device, compatible with `surface` when given.
pub async fn request_device(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'_>>,
) -> Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue), DeviceError> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: surface,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|e| DeviceError::Backend(format!("no suitable adapter: {e}")))?;
    log::info!("using adapter {:?}", adapter.get_info().name);

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("scene-ngin device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            ..Default::default()
        })
        .await
        .map_err(|e| DeviceError::Backend(format!("could not create device: {e}")))?;

    Ok((adapter, device, queue))
}

struct Program {
    label: String,
    vertex: wgpu::ShaderModule,
    vertex_entry: String,
    fragment: wgpu::ShaderModule,
    fragment_entry: String,
    samplers: Vec<BindingPoint>,
}

struct PendingDraw {
    pipeline: wgpu::RenderPipeline,
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
    uniforms: Vec<(BindingPoint, Vec<u8>)>,
    textures: Vec<(BindingPoint, wgpu::TextureView)>,
    samplers: Vec<BindingPoint>,
}

#[derive(Default)]
struct State {
    next_id: u64,
    buffers: HashMap<u64, wgpu::Buffer>,
    textures: HashMap<u64, GpuTexture>,
    programs: HashMap<u64, Program>,
    layouts: HashMap<u64, VertexLayoutDesc>,
    pipelines: HashMap<(u64, u64), wgpu::RenderPipeline>,
    program: Option<ProgramId>,
    layout: Option<VertexLayoutId>,
    pending: Vec<PendingDraw>,
    depth: Option<((u32, u32), GpuTexture)>,
}

impl State {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    color_format: wgpu::TextureFormat,
    sampler: wgpu::Sampler,
    fallback: GpuTexture,
    state: RefCell<State>,
}

impl std::fmt::Debug for WgpuDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuDevice")
            .field("color_format", &self.color_format)
            .finish_non_exhaustive()
    }
}

impl WgpuDevice {
    /// Wraps a device whose frames are rendered into targets of `color_format`.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, color_format: wgpu::TextureFormat) -> Self {
        let sampler = texture::create_default_sampler(&device);
        let fallback = texture::create_fallback_texture(&device, &queue);
        Self {
            device,
            queue,
            color_format,
            sampler,
            fallback,
            state: RefCell::new(State::default()),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.color_format
    }

    /// Number of draws recorded since the last submission.
    pub fn pending_draws(&self) -> usize {
        self.state.borrow().pending.len()
    }

    fn pipeline_for(
        &self,
        state: &mut State,
        program: ProgramId,
        layout: VertexLayoutId,
    ) -> Option<wgpu::RenderPipeline> {
        let key = (program.raw(), layout.raw());
        if let Some(pipeline) = state.pipelines.get(&key) {
            return Some(pipeline.clone());
        }
        let compiled = state.programs.get(&program.raw())?;
        let desc = state.layouts.get(&layout.raw())?;
        log::debug!("building pipeline for {} with {}", program, layout);
        let pipeline = pipeline::mk_render_pipeline(
            &self.device,
            &compiled.label,
            (&compiled.vertex, &compiled.vertex_entry),
            (&compiled.fragment, &compiled.fragment_entry),
            self.color_format,
            desc,
        );
        state.pipelines.insert(key, pipeline.clone());
        Some(pipeline)
    }

    /// Encodes every draw recorded since the previous submission into one
    /// render pass targeting `target` and submits it. The target is cleared to
    /// `clear` first, also when no draw was recorded.
    pub fn submit_frame(&self, target: &wgpu::TextureView, size: (u32, u32), clear: wgpu::Color) {
        let mut state = self.state.borrow_mut();
        let pending = std::mem::take(&mut state.pending);

        if !matches!(&state.depth, Some((depth_size, _)) if *depth_size == size) {
            state.depth = Some((size, texture::create_depth_texture(&self.device, size)));
        }
        let Some((_, depth)) = &state.depth else {
            return;
        };
        let depth_view = depth.view.clone();
        drop(state);

        // Pack every uniform snapshot of the frame into one buffer.
        let alignment = u64::from(self.device.limits().min_uniform_buffer_offset_alignment);
        let mut uniform_data: Vec<u8> = Vec::new();
        let mut ranges: Vec<Vec<(u64, u64)>> = Vec::with_capacity(pending.len());
        for draw in &pending {
            let mut draw_ranges = Vec::with_capacity(draw.uniforms.len());
            for (_, bytes) in &draw.uniforms {
                let offset = (uniform_data.len() as u64).next_multiple_of(alignment);
                uniform_data.resize(offset as usize, 0);
                uniform_data.extend_from_slice(bytes);
                let len = (bytes.len() as u64).next_multiple_of(16);
                uniform_data.resize((offset + len) as usize, 0);
                draw_ranges.push((offset, len));
            }
            ranges.push(draw_ranges);
        }
        let uniform_buffer = (!uniform_data.is_empty()).then(|| {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("frame uniforms"),
                contents: &uniform_data,
                usage: wgpu::BufferUsages::UNIFORM,
            })
        });

        let bind_groups: Vec<Vec<(u32, wgpu::BindGroup)>> = pending
            .iter()
            .zip(&ranges)
            .map(|(draw, draw_ranges)| {
                let mut groups: BTreeMap<u32, Vec<wgpu::BindGroupEntry<'_>>> = BTreeMap::new();
                if let Some(buffer) = &uniform_buffer {
                    for ((binding, _), (offset, len)) in draw.uniforms.iter().zip(draw_ranges) {
                        groups.entry(binding.group).or_default().push(wgpu::BindGroupEntry {
                            binding: binding.binding,
                            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                                buffer,
                                offset: *offset,
                                size: NonZeroU64::new(*len),
                            }),
                        });
                    }
                }
                for (binding, view) in &draw.textures {
                    groups.entry(binding.group).or_default().push(wgpu::BindGroupEntry {
                        binding: binding.binding,
                        resource: wgpu::BindingResource::TextureView(view),
                    });
                }
                for binding in &draw.samplers {
                    groups.entry(binding.group).or_default().push(wgpu::BindGroupEntry {
                        binding: binding.binding,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    });
                }
                let max_group = groups.keys().next_back().copied();
                let Some(max_group) = max_group else {
                    return Vec::new();
                };
                (0..=max_group)
                    .map(|group| {
                        let entries = groups.remove(&group).unwrap_or_default();
                        let layout = draw.pipeline.get_bind_group_layout(group);
                        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                            label: Some("draw bind group"),
                            layout: &layout,
                            entries: &entries,
                        });
                        (group, bind_group)
                    })
                    .collect()
            })
            .collect();

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            for (draw, groups) in pending.iter().zip(&bind_groups) {
                render_pass.set_pipeline(&draw.pipeline);
                for (index, group) in groups {
                    render_pass.set_bind_group(*index, group, &[]);
                }
                render_pass.set_vertex_buffer(0, draw.vertex.slice(..));
                render_pass.set_index_buffer(draw.index.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..draw.index_count, 0, 0..1);
            }
        }

        self.queue.submit(iter::once(encoder.finish()));
        log::trace!("submitted {} draws", pending.len());
    }
}

impl GraphicsDevice for WgpuDevice {
    fn create_buffer(&self, kind: BufferKind, contents: &[u8]) -> Result<BufferId, DeviceError> {
        let (label, usage) = match kind {
            BufferKind::Vertex => ("Vertex Buffer", wgpu::BufferUsages::VERTEX),
            BufferKind::Index => ("Index Buffer", wgpu::BufferUsages::INDEX),
        };
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage,
        });
        let mut state = self.state.borrow_mut();
        let id = state.next();
        state.buffers.insert(id, buffer);
        Ok(BufferId::new(id))
    }

    fn destroy_buffer(&self, id: BufferId) {
        // Draws still pending hold their own reference until the frame is submitted.
        if self.state.borrow_mut().buffers.remove(&id.raw()).is_none() {
            log::warn!("{} released twice", id);
        }
    }

    fn create_texture(&self, image: &ImageData) -> Result<TextureId, DeviceError> {
        // A short pixel buffer would overrun in `write_texture`.
        image.validate()?;
        let texture = texture::upload_image(&self.device, &self.queue, image);
        let mut state = self.state.borrow_mut();
        let id = state.next();
        state.textures.insert(id, texture);
        Ok(TextureId::new(id))
    }

    fn destroy_texture(&self, id: TextureId) {
        if self.state.borrow_mut().textures.remove(&id.raw()).is_none() {
            log::warn!("{} released twice", id);
        }
    }

    fn create_program(&self, source: &ProgramSource) -> Result<ProgramId, DeviceError> {
        let vertex = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{} (vertex)", source.label)),
            source: wgpu::ShaderSource::Wgsl(source.vertex_source.as_str().into()),
        });
        let fragment = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{} (fragment)", source.label)),
            source: wgpu::ShaderSource::Wgsl(source.fragment_source.as_str().into()),
        });
        let mut state = self.state.borrow_mut();
        let id = state.next();
        state.programs.insert(
            id,
            Program {
                label: source.label.clone(),
                vertex,
                vertex_entry: source.vertex_entry.clone(),
                fragment,
                fragment_entry: source.fragment_entry.clone(),
                samplers: source.samplers.clone(),
            },
        );
        Ok(ProgramId::new(id))
    }

    fn destroy_program(&self, id: ProgramId) {
        let mut state = self.state.borrow_mut();
        if state.programs.remove(&id.raw()).is_none() {
            log::warn!("{} released twice", id);
        }
        state.pipelines.retain(|(program, _), _| *program != id.raw());
        if state.program == Some(id) {
            state.program = None;
        }
    }

    fn create_vertex_layout(&self, layout: &VertexLayoutDesc) -> Result<VertexLayoutId, DeviceError> {
        if layout.attributes.is_empty() || layout.stride == 0 {
            return Err(DeviceError::Allocation {
                what: "vertex array",
                reason: "layout has no attributes".to_string(),
            });
        }
        let mut state = self.state.borrow_mut();
        let id = state.next();
        state.layouts.insert(id, layout.clone());
        Ok(VertexLayoutId::new(id))
    }

    fn destroy_vertex_layout(&self, id: VertexLayoutId) {
        let mut state = self.state.borrow_mut();
        if state.layouts.remove(&id.raw()).is_none() {
            log::warn!("{} released twice", id);
        }
        state.pipelines.retain(|(_, layout), _| *layout != id.raw());
        if state.layout == Some(id) {
            state.layout = None;
        }
    }

    fn use_program(&self, program: Option<ProgramId>) {
        self.state.borrow_mut().program = program;
    }

    fn bind_vertex_layout(&self, layout: Option<VertexLayoutId>) {
        self.state.borrow_mut().layout = layout;
    }

    fn draw_indexed(&self, call: &DrawCall<'_>) {
        if call.index_count == 0 {
            return;
        }
        let mut state = self.state.borrow_mut();
        let (Some(program), Some(layout)) = (state.program, state.layout) else {
            log::warn!("draw issued without a bound program and vertex array, skipped");
            return;
        };
        let Some(pipeline) = self.pipeline_for(&mut state, program, layout) else {
            log::warn!("draw issued with released {} or {}, skipped", program, layout);
            return;
        };
        let (Some(vertex), Some(index)) = (
            state.buffers.get(&call.vertex_buffer.raw()).cloned(),
            state.buffers.get(&call.index_buffer.raw()).cloned(),
        ) else {
            log::warn!("draw issued with released buffers, skipped");
            return;
        };
        let textures = call
            .textures
            .iter()
            .map(|binding| {
                let view = binding
                    .texture
                    .and_then(|id| state.textures.get(&id.raw()))
                    .map(|t| t.view.clone())
                    .unwrap_or_else(|| self.fallback.view.clone());
                (binding.binding, view)
            })
            .collect();
        let samplers = state
            .programs
            .get(&program.raw())
            .map(|p| p.samplers.clone())
            .unwrap_or_default();

        state.pending.push(PendingDraw {
            pipeline,
            vertex,
            index,
            index_count: call.index_count,
            uniforms: call
                .uniforms
                .iter()
                .map(|block| (block.binding, block.bytes.to_vec()))
                .collect(),
            textures,
            samplers,
        });
    }
}
