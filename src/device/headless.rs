//! A device without a GPU.
//!
//! [`HeadlessDevice`] hands out ids, keeps the bound program/layout state and
//! appends every call to a log. It is what the test-suite renders against and
//! is handy for checking draw order or resource lifetimes in downstream code.

use std::{cell::RefCell, collections::BTreeSet};

use crate::{
    data_structures::texture::ImageData,
    device::{
        BindingPoint, BufferId, BufferKind, DrawCall, GraphicsDevice, ProgramId, ProgramSource,
        TextureId, VertexLayoutDesc, VertexLayoutId,
    },
    error::DeviceError,
};

/// The kind of object behind a live handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    Buffer,
    Texture,
    Program,
    VertexLayout,
}

/// Texture binding as seen by one draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedTexture {
    pub name: String,
    pub unit: u32,
    pub texture: Option<TextureId>,
}

/// A draw as the device received it, with the bindings that were active.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub program: Option<ProgramId>,
    pub layout: Option<VertexLayoutId>,
    pub vertex_buffer: BufferId,
    pub index_buffer: BufferId,
    pub index_count: u32,
    pub uniforms: Vec<(BindingPoint, Vec<u8>)>,
    pub textures: Vec<RecordedTexture>,
}

impl DrawRecord {
    /// Reads `count` floats at `offset` of the uniform block at `binding`.
    pub fn read_f32s(&self, binding: BindingPoint, offset: u32, count: usize) -> Option<Vec<f32>> {
        let (_, bytes) = self.uniforms.iter().find(|(b, _)| *b == binding)?;
        let start = offset as usize;
        let end = start + count * 4;
        let slice = bytes.get(start..end)?;
        Some(
            slice
                .chunks_exact(4)
                .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    CreateBuffer { id: BufferId, kind: BufferKind, len: usize },
    DestroyBuffer(BufferId),
    CreateTexture { id: TextureId, width: u32, height: u32 },
    DestroyTexture(TextureId),
    CreateProgram { id: ProgramId, label: String },
    DestroyProgram(ProgramId),
    CreateVertexLayout { id: VertexLayoutId, stride: u64 },
    DestroyVertexLayout(VertexLayoutId),
    UseProgram(Option<ProgramId>),
    BindVertexLayout(Option<VertexLayoutId>),
    Draw(DrawRecord),
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    calls: Vec<DeviceCall>,
    live: BTreeSet<(ObjectKind, u64)>,
    released_unknown: Vec<(ObjectKind, u64)>,
    program: Option<ProgramId>,
    layout: Option<VertexLayoutId>,
    allocations_before_failure: usize,
    fail_allocations: usize,
}

impl State {
    fn allocate(&mut self, kind: ObjectKind, what: &'static str) -> Result<u64, DeviceError> {
        if self.allocations_before_failure > 0 {
            self.allocations_before_failure -= 1;
        } else if self.fail_allocations > 0 {
            self.fail_allocations -= 1;
            return Err(DeviceError::Allocation {
                what,
                reason: "allocation failure injected by HeadlessDevice".to_string(),
            });
        }
        self.next_id += 1;
        self.live.insert((kind, self.next_id));
        Ok(self.next_id)
    }

    fn release(&mut self, kind: ObjectKind, id: u64) {
        if !self.live.remove(&(kind, id)) {
            log::error!("{:?} {} released but not alive", kind, id);
            self.released_unknown.push((kind, id));
        }
    }
}

#[derive(Debug, Default)]
pub struct HeadlessDevice {
    state: RefCell<State>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` allocations fail with [`DeviceError::Allocation`].
    pub fn fail_next_allocations(&self, count: usize) {
        self.fail_allocations_after(0, count);
    }

    /// Lets `successes` allocations through, then fails the `count` after them.
    pub fn fail_allocations_after(&self, successes: usize, count: usize) {
        let mut state = self.state.borrow_mut();
        state.allocations_before_failure = successes;
        state.fail_allocations = count;
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.state.borrow().calls.clone()
    }

    pub fn draws(&self) -> Vec<DrawRecord> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                DeviceCall::Draw(record) => Some(record.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn live_count(&self, kind: ObjectKind) -> usize {
        self.state.borrow().live.iter().filter(|(k, _)| *k == kind).count()
    }

    pub fn is_live(&self, kind: ObjectKind, id: u64) -> bool {
        self.state.borrow().live.contains(&(kind, id))
    }

    /// Handles that were released while not alive: double frees or never-created ids.
    pub fn bad_releases(&self) -> Vec<(ObjectKind, u64)> {
        self.state.borrow().released_unknown.clone()
    }

    pub fn bound_program(&self) -> Option<ProgramId> {
        self.state.borrow().program
    }

    pub fn bound_vertex_layout(&self) -> Option<VertexLayoutId> {
        self.state.borrow().layout
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_buffer(&self, kind: BufferKind, contents: &[u8]) -> Result<BufferId, DeviceError> {
        let mut state = self.state.borrow_mut();
        let id = BufferId::new(state.allocate(ObjectKind::Buffer, "buffer")?);
        state.calls.push(DeviceCall::CreateBuffer {
            id,
            kind,
            len: contents.len(),
        });
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) {
        let mut state = self.state.borrow_mut();
        state.release(ObjectKind::Buffer, id.raw());
        state.calls.push(DeviceCall::DestroyBuffer(id));
    }

    fn create_texture(&self, image: &ImageData) -> Result<TextureId, DeviceError> {
        let mut state = self.state.borrow_mut();
        let id = TextureId::new(state.allocate(ObjectKind::Texture, "texture")?);
        state.calls.push(DeviceCall::CreateTexture {
            id,
            width: image.width,
            height: image.height,
        });
        Ok(id)
    }

    fn destroy_texture(&self, id: TextureId) {
        let mut state = self.state.borrow_mut();
        state.release(ObjectKind::Texture, id.raw());
        state.calls.push(DeviceCall::DestroyTexture(id));
    }

    fn create_program(&self, source: &ProgramSource) -> Result<ProgramId, DeviceError> {
        let mut state = self.state.borrow_mut();
        let id = ProgramId::new(state.allocate(ObjectKind::Program, "program")?);
        state.calls.push(DeviceCall::CreateProgram {
            id,
            label: source.label.clone(),
        });
        Ok(id)
    }

    fn destroy_program(&self, id: ProgramId) {
        let mut state = self.state.borrow_mut();
        state.release(ObjectKind::Program, id.raw());
        if state.program == Some(id) {
            state.program = None;
        }
        state.calls.push(DeviceCall::DestroyProgram(id));
    }

    fn create_vertex_layout(&self, layout: &VertexLayoutDesc) -> Result<VertexLayoutId, DeviceError> {
        let mut state = self.state.borrow_mut();
        let id = VertexLayoutId::new(state.allocate(ObjectKind::VertexLayout, "vertex array")?);
        state.calls.push(DeviceCall::CreateVertexLayout {
            id,
            stride: layout.stride,
        });
        Ok(id)
    }

    fn destroy_vertex_layout(&self, id: VertexLayoutId) {
        let mut state = self.state.borrow_mut();
        state.release(ObjectKind::VertexLayout, id.raw());
        if state.layout == Some(id) {
            state.layout = None;
        }
        state.calls.push(DeviceCall::DestroyVertexLayout(id));
    }

    fn use_program(&self, program: Option<ProgramId>) {
        let mut state = self.state.borrow_mut();
        state.program = program;
        state.calls.push(DeviceCall::UseProgram(program));
    }

    fn bind_vertex_layout(&self, layout: Option<VertexLayoutId>) {
        let mut state = self.state.borrow_mut();
        state.layout = layout;
        state.calls.push(DeviceCall::BindVertexLayout(layout));
    }

    fn draw_indexed(&self, call: &DrawCall<'_>) {
        let mut state = self.state.borrow_mut();
        let record = DrawRecord {
            program: state.program,
            layout: state.layout,
            vertex_buffer: call.vertex_buffer,
            index_buffer: call.index_buffer,
            index_count: call.index_count,
            uniforms: call
                .uniforms
                .iter()
                .map(|block| (block.binding, block.bytes.to_vec()))
                .collect(),
            textures: call
                .textures
                .iter()
                .map(|t| RecordedTexture {
                    name: t.name.to_string(),
                    unit: t.unit,
                    texture: t.texture,
                })
                .collect(),
        };
        state.calls.push(DeviceCall::Draw(record));
    }
}
